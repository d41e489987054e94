//! Runtime driver configuration.
use core::time::Duration;

use serde::{Deserialize, Serialize};
use wifi_spi_proto::{request::PowerMode, TransferWidth};

/// How the driver learns about changes to the device's status register.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum IrqMode {
    /// The platform calls [`Driver::on_interrupt`](crate::Driver::on_interrupt)
    /// from the device's interrupt handler.
    #[default]
    Interrupt,
    /// Every status check reads the status register first.
    Polled,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Bus width used for data phases.
    pub transfer_width: TransferWidth,
    pub irq_mode: IrqMode,
    /// Power-save mode the device starts in.
    pub power_mode: PowerMode,
    /// Index of the device's chip select.
    pub slave: u8,
    /// How long a command header may be answered with `Busy`.
    pub busy_timeout: Duration,
    /// How long to wait for the start token of a read.
    pub start_token_timeout: Duration,
    /// How long the reset line is held during power-up.
    pub reset_pulse: Duration,
    /// How long to wait after releasing reset.
    pub reset_settle: Duration,
}

#[derive(Debug, PartialEq)]
pub enum Error {
    Postcard(postcard::Error),
}

// === impl Settings ===

impl Settings {
    pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(1);
    pub const DEFAULT_START_TOKEN_TIMEOUT: Duration = Duration::from_secs(10);

    /// Loads settings serialized with `postcard`, for instance by a platform
    /// crate's build script.
    pub fn from_postcard(bytes: &[u8]) -> Result<Self, Error> {
        postcard::from_bytes(bytes).map_err(Error::Postcard)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            transfer_width: TransferWidth::Bits8,
            irq_mode: IrqMode::Interrupt,
            power_mode: PowerMode::Mode0,
            slave: 0,
            busy_timeout: Self::DEFAULT_BUSY_TIMEOUT,
            start_token_timeout: Self::DEFAULT_START_TOKEN_TIMEOUT,
            reset_pulse: Duration::from_millis(10),
            reset_settle: Duration::from_millis(20),
        }
    }
}

// === impl Error ===

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Postcard(error) => write!(f, "invalid settings: {error}"),
        }
    }
}
