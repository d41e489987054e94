//! # wifi-spi-proto
//!
//! Wire types spoken between a host MCU and an SPI-attached Wi-Fi
//! coprocessor. Extracted as a separate crate to allow bus analyzers and
//! simulators to share the protocol definitions with the `wifi-spi` driver.
//!
//! Everything in here is pure encoding and decoding: no I/O, no allocation.
//!
//! A transfer on the bus always has the same shape:
//!
//! 1. a 4-byte [`CommandHeader`] (`CB1..CB4`), acknowledged by the device
//!    with a [`TransferStatus`] byte,
//! 2. for reads, a [`START_TOKEN`] byte from the device,
//! 3. the data phase, whose length is rounded up to a multiple of four
//!    (see [`round_up4`]).
//!
//! Management commands and socket traffic are carried as *frames*: a 16-byte
//! [`FrameDescriptor`] followed by frame data.
#![cfg_attr(not(any(test, feature = "use-std")), no_std)]

mod descriptor;
mod error;
mod header;
pub mod opcode;
pub mod request;
pub mod response;
mod send;

pub use self::descriptor::{CommandTemplate, FrameDescriptor, FrameType};
pub use self::error::Error;
pub use self::header::{
    Addressing, Cb1, CommandHeader, Direction, OpClass, TransferStatus, TransferWidth,
    START_TOKEN,
};
pub use self::send::{Protocol, SendHeader, SocketDescriptor};

/// Maximum socket payload carried by a single send frame.
pub const MAX_PAYLOAD_SIZE: usize = 1400;

/// Length of the buffer needed to hold the largest frame the device emits:
/// a command response frame plus a full socket payload.
pub const MAX_FRAME_LEN: usize = FRAME_CMD_RSP_LEN + MAX_PAYLOAD_SIZE;

/// Fixed part of the largest command response frame.
pub const FRAME_CMD_RSP_LEN: usize = 56;

/// Maximum number of access points returned by a single scan.
pub const AP_SCANNED_MAX: usize = 15;

/// Maximum number of sockets the device keeps open at once.
pub const MAX_SOCKETS: usize = 8;

pub const SSID_LEN: usize = 32;
pub const PSK_LEN: usize = 32;
pub const MAX_DOMAIN_NAME_LEN: usize = 42;
pub const MAX_DNS_REPLY: usize = 10;

////////////////////////////////////////////////////////////////////////////////
// Registers
////////////////////////////////////////////////////////////////////////////////

/// Interrupt status register, read with a register-class transfer.
pub const INT_STATUS_REG: u8 = 0x08;

/// Interrupt mask register. A set bit masks the matching interrupt source.
pub const INT_MASK_REG: u32 = 0x2200_0004;

/// Interrupt clear register. Writing a set bit acknowledges that source.
pub const INT_CLEAR_REG: u32 = 0x2200_0008;

/// Rounds `len` up to the next multiple of four.
///
/// Every data phase on the bus is a whole number of 32-bit words, even when
/// the bus is driven 8 bits at a time.
#[inline]
#[must_use]
pub const fn round_up4(len: usize) -> usize {
    (len + 3) & !3
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::{prop_assert, prop_assert_eq, proptest};

    #[test]
    fn round_up4_small_values() {
        assert_eq!(round_up4(0), 0);
        assert_eq!(round_up4(1), 4);
        assert_eq!(round_up4(4), 4);
        assert_eq!(round_up4(45), 48);
        assert_eq!(round_up4(MAX_FRAME_LEN), MAX_FRAME_LEN);
    }

    proptest! {
        #[test]
        fn round_up4_is_idempotent(len in 0usize..(usize::MAX - 3)) {
            let rounded = round_up4(len);
            prop_assert_eq!(rounded % 4, 0);
            prop_assert!(rounded >= len);
            prop_assert!(rounded - len < 4);
            prop_assert_eq!(round_up4(rounded), rounded);
        }
    }
}
