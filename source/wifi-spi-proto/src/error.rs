use core::fmt;

/// Errors returned while encoding or decoding wire types.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[non_exhaustive]
pub enum Error {
    /// The provided buffer is not large enough for the encoded value.
    InsufficientSize { needed: usize, actual: usize },
    /// A variable-length field (SSID, PSK, host name...) does not fit in its
    /// fixed-size slot on the wire.
    FieldTooLong { max: usize, actual: usize },
    /// A command template does not agree with the payload it was paired with,
    /// or names an opcode that cannot be sent in its frame type.
    ProtocolMismatch,
    /// A frame descriptor carried a frame-type tag other than management or
    /// data.
    InvalidFrameType(u16),
    /// A `CB1` byte did not decode to a valid command header.
    InvalidHeader(u8),
    /// A response body was shorter than its fixed layout requires.
    MalformedResponse,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InsufficientSize { needed, actual } => write!(
                f,
                "buffer too small: needed {needed} bytes, but only {actual} were provided"
            ),
            Error::FieldTooLong { max, actual } => write!(
                f,
                "field is {actual} bytes long, but at most {max} bytes fit on the wire"
            ),
            Error::ProtocolMismatch => f.write_str("command template does not match its payload"),
            Error::InvalidFrameType(tag) => write!(f, "invalid frame type tag {tag:#06x}"),
            Error::InvalidHeader(cb1) => write!(f, "invalid command header byte {cb1:#04x}"),
            Error::MalformedResponse => f.write_str("response body is truncated"),
        }
    }
}
