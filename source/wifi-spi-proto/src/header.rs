//! The 4-byte command header that opens every bus transaction.
// Unusual groupings are used in binary literals in this file in order to
// separate the bits by which field they represent, rather than by their byte.
#![allow(clippy::unusual_byte_groupings)]

use mycelium_bitfield::{bitfield, enum_from_bits};

use crate::{Error, FrameType};

/// Sent by the device before the data phase of every read.
pub const START_TOKEN: u8 = 0x55;

enum_from_bits! {
    /// Width of each bus access during the data phase.
    #[derive(Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
    #[cfg_attr(test, derive(proptest_derive::Arbitrary))]
    pub enum TransferWidth<u8> {
        /// One byte per bus access.
        Bits8 = 0b0,
        /// Four bytes per bus access.
        Bits32 = 0b1,
    }
}

enum_from_bits! {
    #[derive(Debug, Eq, PartialEq)]
    #[cfg_attr(test, derive(proptest_derive::Arbitrary))]
    pub enum Addressing<u8> {
        /// Accesses a 32-bit device memory address, sent after `CB4`.
        Memory = 0b0,
        /// Accesses the device's frame FIFO.
        Frame = 0b1,
    }
}

enum_from_bits! {
    #[derive(Debug, Eq, PartialEq)]
    #[cfg_attr(test, derive(proptest_derive::Arbitrary))]
    pub enum Direction<u8> {
        Read = 0b0,
        Write = 0b1,
    }
}

enum_from_bits! {
    #[derive(Debug, Eq, PartialEq)]
    #[cfg_attr(test, derive(proptest_derive::Arbitrary))]
    pub enum OpClass<u8> {
        /// Bus interface initialization handshake.
        Init = 0b00,
        /// Single-byte access to an SPI interface register named by `CB2`.
        Register = 0b01,
        /// Memory or frame transfer with a data phase.
        Transfer = 0b10,
    }
}

bitfield! {
    /// The first byte of a [`CommandHeader`].
    #[derive(Eq, PartialEq)]
    pub struct Cb1<u8> {
        /// Bus width used for the data phase.
        pub const WIDTH: TransferWidth;
        const _RESERVED_0 = 1;
        /// Set when `CB3`/`CB4` carry a data phase length.
        pub const LONG_LENGTH: bool;
        pub const ADDRESSING: Addressing;
        pub const DIRECTION: Direction;
        pub const CLASS: OpClass;
        const _RESERVED_1 = 1;
    }
}

/// Status byte the device answers a command header with.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum TransferStatus {
    Success = 0x58,
    Busy = 0x54,
    Fail = 0x52,
}

/// `[CB1, CB2, CB3, CB4]`.
///
/// `CB2` is the frame-type tag for frame writes, the register address for
/// register accesses, and zero otherwise. `CB3`/`CB4` hold the little-endian
/// data phase length, which callers round up to a multiple of four.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CommandHeader {
    pub cb1: Cb1,
    pub cb2: u8,
    pub length: u16,
}

// === impl Cb1 ===

impl Cb1 {
    const RESERVED_MASK: u8 = 0b1_00_0_0_0_1_0;

    fn transfer(width: TransferWidth, addressing: Addressing, direction: Direction) -> Self {
        Self::new()
            .with(Self::WIDTH, width)
            .with(Self::LONG_LENGTH, true)
            .with(Self::ADDRESSING, addressing)
            .with(Self::DIRECTION, direction)
            .with(Self::CLASS, OpClass::Transfer)
    }

    fn validate(bits: u8) -> Result<Self, Error> {
        let cb1 = Self::from_bits(bits);
        let valid = bits & Self::RESERVED_MASK == 0
            && cb1.try_get(Self::WIDTH).is_ok()
            && cb1.try_get(Self::ADDRESSING).is_ok()
            && cb1.try_get(Self::DIRECTION).is_ok()
            && cb1.try_get(Self::CLASS).is_ok();
        if valid {
            Ok(cb1)
        } else {
            Err(Error::InvalidHeader(bits))
        }
    }
}

// === impl TransferStatus ===

impl TransferStatus {
    /// Interprets a status byte. Anything unrecognized is reported as
    /// `None`; the driver treats that like [`TransferStatus::Fail`].
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x58 => Some(Self::Success),
            0x54 => Some(Self::Busy),
            0x52 => Some(Self::Fail),
            _ => None,
        }
    }
}

// === impl CommandHeader ===

impl CommandHeader {
    pub const LEN: usize = 4;

    /// Header for writing `len` bytes into the frame FIFO.
    #[must_use]
    pub fn frame_write(width: TransferWidth, frame_type: FrameType, len: u16) -> Self {
        Self {
            cb1: Cb1::transfer(width, Addressing::Frame, Direction::Write),
            cb2: frame_type.cb2(),
            length: len,
        }
    }

    /// Header for reading `len` bytes out of the frame FIFO.
    #[must_use]
    pub fn frame_read(width: TransferWidth, len: u16) -> Self {
        Self {
            cb1: Cb1::transfer(width, Addressing::Frame, Direction::Read),
            cb2: 0,
            length: len,
        }
    }

    /// Header for writing `len` bytes to device memory. The 4-byte address
    /// follows the header.
    #[must_use]
    pub fn memory_write(width: TransferWidth, len: u16) -> Self {
        Self {
            cb1: Cb1::transfer(width, Addressing::Memory, Direction::Write),
            cb2: 0,
            length: len,
        }
    }

    /// Header for reading `len` bytes from device memory.
    #[must_use]
    pub fn memory_read(width: TransferWidth, len: u16) -> Self {
        Self {
            cb1: Cb1::transfer(width, Addressing::Memory, Direction::Read),
            cb2: 0,
            length: len,
        }
    }

    /// Header for reading the single-byte interface register at `addr`.
    #[must_use]
    pub fn register_read(addr: u8) -> Self {
        Self::register(addr, Direction::Read)
    }

    /// Header for writing the single-byte interface register at `addr`.
    #[must_use]
    pub fn register_write(addr: u8) -> Self {
        Self::register(addr, Direction::Write)
    }

    /// The bus interface initialization handshake.
    #[must_use]
    pub fn interface_init() -> Self {
        Self {
            cb1: Cb1::new()
                .with(Cb1::WIDTH, TransferWidth::Bits8)
                .with(Cb1::CLASS, OpClass::Init),
            cb2: 0,
            length: 0,
        }
    }

    fn register(addr: u8, direction: Direction) -> Self {
        Self {
            cb1: Cb1::new()
                .with(Cb1::WIDTH, TransferWidth::Bits8)
                .with(Cb1::ADDRESSING, Addressing::Memory)
                .with(Cb1::DIRECTION, direction)
                .with(Cb1::CLASS, OpClass::Register),
            cb2: addr,
            length: 0,
        }
    }

    /// Returns true if `CB3`/`CB4` must be sent after the acknowledged
    /// `CB1`/`CB2` pair.
    #[must_use]
    pub fn has_length(&self) -> bool {
        self.cb1.get(Cb1::LONG_LENGTH)
    }

    #[must_use]
    pub fn encode(&self) -> [u8; Self::LEN] {
        let [lo, hi] = self.length.to_le_bytes();
        [self.cb1.bits(), self.cb2, lo, hi]
    }

    pub fn decode(bytes: [u8; Self::LEN]) -> Result<Self, Error> {
        let [cb1, cb2, lo, hi] = bytes;
        Ok(Self {
            cb1: Cb1::validate(cb1)?,
            cb2,
            length: u16::from_le_bytes([lo, hi]),
        })
    }
}
