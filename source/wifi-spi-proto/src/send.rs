//! The local header that precedes socket payload in a send frame.
use crate::{opcode::DataCmd, request::Encoder, Error};

/// Handle of an open socket on the device.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SocketDescriptor(pub u16);

/// Transport protocol of the socket being sent on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Protocol {
    Udp,
    Tcp,
    /// Connectionless UDP, addressed per send.
    LightUdp {
        remote_port: u16,
        remote_addr: [u8; 4],
    },
}

/// `[cmd:2][socket:2][payload length:4][data offset:2]`, then (for light UDP
/// only) `[remote port:2][remote address:4]`, then `data offset` reserved
/// bytes the device fills in with its own protocol headers.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SendHeader {
    pub socket: SocketDescriptor,
    pub protocol: Protocol,
    pub payload_len: u32,
}

// === impl Protocol ===

impl Protocol {
    const PREFIX_LEN: usize = 10;
    const REMOTE_LEN: usize = 6;

    /// Bytes reserved for the device's protocol headers.
    #[must_use]
    pub const fn data_offset(&self) -> u16 {
        match self {
            Self::Udp => 32,
            Self::Tcp => 44,
            Self::LightUdp { .. } => 26,
        }
    }

    /// Total length of the local header for this protocol.
    ///
    /// Always two bytes short of a word boundary, so that the header plus the
    /// first two payload bytes can be written as whole words.
    #[must_use]
    pub const fn header_len(&self) -> usize {
        let remote = match self {
            Self::LightUdp { .. } => Self::REMOTE_LEN,
            _ => 0,
        };
        Self::PREFIX_LEN + remote + self.data_offset() as usize
    }
}

// === impl SendHeader ===

impl SendHeader {
    /// Longest local header of any protocol.
    pub const MAX_LEN: usize = Protocol::Tcp.header_len();

    #[must_use]
    pub fn header_len(&self) -> usize {
        self.protocol.header_len()
    }

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut enc = Encoder::new(buf);
        enc.u16(DataCmd::SendRecv.code())?
            .u16(self.socket.0)?
            .u32(self.payload_len)?
            .u16(self.protocol.data_offset())?;
        if let Protocol::LightUdp {
            remote_port,
            remote_addr,
        } = self.protocol
        {
            enc.u16(remote_port)?.bytes(&remote_addr)?;
        }
        enc.zeros(usize::from(self.protocol.data_offset()))?;
        Ok(enc.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LUDP: Protocol = Protocol::LightUdp {
        remote_port: 53,
        remote_addr: [8, 8, 8, 8],
    };

    #[test]
    fn header_lengths() {
        assert_eq!(Protocol::Udp.header_len(), 42);
        assert_eq!(Protocol::Tcp.header_len(), 54);
        assert_eq!(LUDP.header_len(), 42);
        assert_eq!(SendHeader::MAX_LEN, 54);
        for proto in [Protocol::Udp, Protocol::Tcp, LUDP] {
            assert_eq!((proto.header_len() + 2) % 4, 0, "{proto:?}");
        }
    }

    #[test]
    fn encode_udp() {
        let header = SendHeader {
            socket: SocketDescriptor(1),
            protocol: Protocol::Udp,
            payload_len: 3,
        };
        let mut buf = [0xAA; SendHeader::MAX_LEN];
        assert_eq!(header.encode(&mut buf), Ok(42));
        assert_eq!(buf[..10], [3, 0, 1, 0, 3, 0, 0, 0, 32, 0]);
        assert!(buf[10..42].iter().all(|&b| b == 0));
        assert!(buf[42..].iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn encode_light_udp() {
        let header = SendHeader {
            socket: SocketDescriptor(2),
            protocol: LUDP,
            payload_len: 10,
        };
        let mut buf = [0; SendHeader::MAX_LEN];
        assert_eq!(header.encode(&mut buf), Ok(42));
        assert_eq!(buf[8..16], [26, 0, 53, 0, 8, 8, 8, 8]);
    }
}
