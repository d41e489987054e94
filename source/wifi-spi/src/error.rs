use core::fmt;

use embedded_hal::spi::{Error as _, ErrorKind};
use wifi_spi_proto as proto;

/// Errors returned by the driver.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The bus transceiver reported an error.
    Transport(ErrorKind),
    /// The device answered a command header with `Busy` for longer than the
    /// configured busy timeout.
    BusTimeout,
    /// The device answered a command header with `Fail`, or with a status
    /// byte that is not a valid transfer status.
    BusFail,
    /// The device did not send a start token before the data phase of a read
    /// within the configured timeout.
    StartTokenTimeout,
    /// No packet became pending within a command's response timeout.
    ResponseTimeout,
    /// The device's transmit buffer is full.
    BufferFull,
    /// The device is in power-save mode 1 and has not signalled that it is
    /// awake.
    DeviceAsleep,
    /// A non-blocking send is already in flight.
    SendInFlight,
    /// A payload or frame does not fit in a single transfer.
    PayloadTooLarge,
    /// A command template was paired with a payload it does not describe.
    ProtocolMismatch,
    /// The device answered a command with a non-zero status.
    CommandFailed(u32),
    /// The device answered a command with a response of the wrong kind.
    UnexpectedResponse,
    /// Encoding a request or decoding a response failed.
    Proto(proto::Error),
}

impl Error {
    pub(crate) fn transport(error: impl embedded_hal::spi::Error) -> Self {
        Self::Transport(error.kind())
    }
}

impl From<proto::Error> for Error {
    fn from(error: proto::Error) -> Self {
        match error {
            proto::Error::ProtocolMismatch => Self::ProtocolMismatch,
            error => Self::Proto(error),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(kind) => write!(f, "bus transport error: {kind}"),
            Self::BusTimeout => f.write_str("device stayed busy past the bus timeout"),
            Self::BusFail => f.write_str("device failed the transfer"),
            Self::StartTokenTimeout => f.write_str("timed out waiting for a start token"),
            Self::ResponseTimeout => f.write_str("timed out waiting for a response"),
            Self::BufferFull => f.write_str("device transmit buffer is full"),
            Self::DeviceAsleep => f.write_str("device is asleep"),
            Self::SendInFlight => f.write_str("a non-blocking send is already in flight"),
            Self::PayloadTooLarge => f.write_str("payload does not fit in a single transfer"),
            Self::ProtocolMismatch => f.write_str("command template does not match its payload"),
            Self::CommandFailed(status) => write!(f, "device rejected the command (status {status:#x})"),
            Self::UnexpectedResponse => f.write_str("device sent an unexpected response"),
            Self::Proto(error) => fmt::Display::fmt(error, f),
        }
    }
}
