//! # wifi-spi
//!
//! Host-side driver for a Wi-Fi coprocessor attached over SPI.
//!
//! The driver speaks the coprocessor's bus protocol: command headers with
//! busy/fail handshaking, frame descriptors and frame data through the frame
//! FIFO, the interrupt status register and the power-save handshake. On top
//! of that it provides one method per management and data-control command,
//! socket framing, and typed decoding of the frames the device sends back.
//! The wire types themselves live in [`wifi_spi_proto`], re-exported as
//! [`proto`].
//!
//! ## Capabilities
//!
//! The driver owns no hardware. A platform hands it a [`Transport`], a
//! [`Clock`] and an [`IrqLine`] when creating the [`Driver`]; module power
//! sequencing uses a [`PinControl`] through [`power_cycle`]. Every wait is
//! bounded by a timeout measured on the [`Clock`].
//!
//! ## Bring-up
//!
//! 1. [`power_cycle`] the module,
//! 2. create the [`Driver`] with the platform's [`Settings`],
//! 3. [`Driver::init_interface`], then wait for the card-ready frame,
//! 4. send [`Driver::init`], [`Driver::band`] and friends.
//!
//! ## Interrupts
//!
//! With [`IrqMode::Interrupt`], the platform calls [`Driver::on_interrupt`]
//! from the device's interrupt handler, typically through a
//! [`SharedDriver`]. With [`IrqMode::Polled`], status checks read the status
//! register themselves.
#![cfg_attr(not(any(test, feature = "use-std")), no_std)]

extern crate alloc;

mod bus;
mod command;
mod driver;
mod error;
mod frame;
pub mod hal;
mod irq;
mod power;
mod response;
pub mod settings;
mod shared;
mod socket;
mod time;

#[cfg(test)]
pub(crate) mod test_util;

pub use self::bus::Bus;
pub use self::driver::Driver;
pub use self::error::Error;
pub use self::hal::{Clock, Completion, IrqLine, PinControl, Transport};
pub use self::irq::IrqStatus;
pub use self::power::{power_cycle, PowerSaveState};
pub use self::response::Response;
pub use self::settings::{IrqMode, Settings};
pub use self::shared::SharedDriver;
pub use self::socket::SendContinuation;
pub use wifi_spi_proto as proto;
