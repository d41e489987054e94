//! Frame descriptors and the compact command templates they are built from.
use crate::Error;

/// Kind of frame carried through the frame FIFO.
///
/// The tag appears in bytes 14-15 of every [`FrameDescriptor`] and in `CB2`
/// of every frame write.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u16)]
pub enum FrameType {
    /// Socket traffic and data-control commands.
    Data = 0x0002,
    /// Management commands and their responses.
    Management = 0x0004,
}

/// The 16-byte record preceding every frame.
///
/// Management frames carry the body length in byte 0 (or `0xFF` and the
/// real length in bytes 8-9), the opcode in byte 1 and, in responses, a
/// status byte in byte 3. Data frames carry a 12-bit body length in bytes
/// 0-1.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FrameDescriptor([u8; FrameDescriptor::LEN]);

/// The 3-byte command code `{body length hint, opcode, frame type tag}`
/// from which a command's [`FrameDescriptor`] is built.
///
/// A zero length hint means the payload length varies; otherwise the payload
/// must be exactly that long. Data-control templates have no opcode: their
/// command code is the first two bytes of the payload.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CommandTemplate {
    pub body_len_hint: u8,
    pub opcode: u8,
    pub frame_type: FrameType,
}

// === impl FrameType ===

impl FrameType {
    #[must_use]
    pub const fn tag(self) -> u16 {
        self as u16
    }

    pub(crate) const fn cb2(self) -> u8 {
        self as u16 as u8
    }

    pub fn from_tag(tag: u16) -> Result<Self, Error> {
        match tag {
            0x0002 => Ok(Self::Data),
            0x0004 => Ok(Self::Management),
            tag => Err(Error::InvalidFrameType(tag)),
        }
    }
}

// === impl FrameDescriptor ===

impl FrameDescriptor {
    pub const LEN: usize = 16;

    /// Largest body a data frame can describe.
    pub const MAX_DATA_LEN: usize = 0x0FFF;

    const EXTENDED_LEN: u8 = 0xFF;

    #[must_use]
    pub const fn zeroed() -> Self {
        Self([0; Self::LEN])
    }

    #[must_use]
    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn management(opcode: u8, body_len: u16) -> Self {
        let mut bytes = [0; Self::LEN];
        match u8::try_from(body_len) {
            Ok(len) if len < Self::EXTENDED_LEN => bytes[0] = len,
            _ => {
                bytes[0] = Self::EXTENDED_LEN;
                bytes[8..10].copy_from_slice(&body_len.to_le_bytes());
            }
        }
        bytes[1] = opcode;
        bytes[14..16].copy_from_slice(&FrameType::Management.tag().to_le_bytes());
        Self(bytes)
    }

    pub fn data(body_len: usize) -> Result<Self, Error> {
        if body_len > Self::MAX_DATA_LEN {
            return Err(Error::ProtocolMismatch);
        }
        let mut bytes = [0; Self::LEN];
        bytes[0..2].copy_from_slice(&(body_len as u16).to_le_bytes());
        bytes[14..16].copy_from_slice(&FrameType::Data.tag().to_le_bytes());
        Ok(Self(bytes))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    pub fn frame_type(&self) -> Result<FrameType, Error> {
        FrameType::from_tag(u16::from_le_bytes([self.0[14], self.0[15]]))
    }

    #[must_use]
    pub fn opcode(&self) -> u8 {
        self.0[1]
    }

    /// Per-entry status of a management response. Zero is success.
    #[must_use]
    pub fn status(&self) -> u8 {
        self.0[3]
    }

    /// Logical (unrounded) length of the frame body.
    pub fn body_len(&self) -> Result<usize, Error> {
        let len = match self.frame_type()? {
            FrameType::Management if self.0[0] == Self::EXTENDED_LEN => {
                u16::from_le_bytes([self.0[8], self.0[9]])
            }
            FrameType::Management => u16::from(self.0[0]),
            FrameType::Data => u16::from_le_bytes([self.0[0], self.0[1]]) & 0x0FFF,
        };
        Ok(usize::from(len))
    }
}

// === impl CommandTemplate ===

impl CommandTemplate {
    pub const LEN: usize = 3;

    #[must_use]
    pub const fn management(opcode: u8, body_len_hint: u8) -> Self {
        Self {
            body_len_hint,
            opcode,
            frame_type: FrameType::Management,
        }
    }

    #[must_use]
    pub const fn data(body_len_hint: u8) -> Self {
        Self {
            body_len_hint,
            opcode: 0,
            frame_type: FrameType::Data,
        }
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        [self.body_len_hint, self.opcode, self.frame_type.cb2()]
    }

    pub fn from_bytes([body_len_hint, opcode, tag]: [u8; Self::LEN]) -> Result<Self, Error> {
        Ok(Self {
            body_len_hint,
            opcode,
            frame_type: FrameType::from_tag(u16::from(tag))?,
        })
    }

    /// Builds the descriptor announcing a `payload_len`-byte body.
    pub fn descriptor(&self, payload_len: usize) -> Result<FrameDescriptor, Error> {
        if self.body_len_hint != 0 && usize::from(self.body_len_hint) != payload_len {
            return Err(Error::ProtocolMismatch);
        }
        match self.frame_type {
            FrameType::Management => {
                if self.opcode == 0 {
                    return Err(Error::ProtocolMismatch);
                }
                let len = u16::try_from(payload_len).map_err(|_| Error::ProtocolMismatch)?;
                Ok(FrameDescriptor::management(self.opcode, len))
            }
            FrameType::Data if self.opcode != 0 => Err(Error::ProtocolMismatch),
            FrameType::Data => FrameDescriptor::data(payload_len),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::{prop_assert_eq, proptest};

    use super::*;

    #[test]
    fn short_management_length_is_inline() {
        let desc = FrameDescriptor::management(0x10, 4);
        assert_eq!(desc.as_bytes()[0], 4);
        assert_eq!(desc.as_bytes()[1], 0x10);
        assert_eq!(desc.as_bytes()[8..10], [0, 0]);
        assert_eq!(desc.as_bytes()[14..16], [0x04, 0x00]);
    }

    #[test]
    fn long_management_length_is_extended() {
        let desc = FrameDescriptor::management(0x13, 0x1234);
        assert_eq!(desc.as_bytes()[0], 0xFF);
        assert_eq!(desc.as_bytes()[8..10], [0x34, 0x12]);
        assert_eq!(desc.body_len(), Ok(0x1234));

        // exactly 0xFF must also use the extended form
        let desc = FrameDescriptor::management(0x13, 0xFF);
        assert_eq!(desc.as_bytes()[0], 0xFF);
        assert_eq!(desc.body_len(), Ok(0xFF));
    }

    #[test]
    fn data_length_is_twelve_bits() {
        let desc = FrameDescriptor::data(45).unwrap();
        assert_eq!(desc.as_bytes()[0..2], [45, 0]);
        assert_eq!(desc.frame_type(), Ok(FrameType::Data));
        assert_eq!(
            FrameDescriptor::data(FrameDescriptor::MAX_DATA_LEN + 1),
            Err(Error::ProtocolMismatch)
        );
    }

    #[test]
    fn unknown_frame_type() {
        let mut bytes = [0; FrameDescriptor::LEN];
        bytes[14] = 0x07;
        let desc = FrameDescriptor::from_bytes(bytes);
        assert_eq!(desc.frame_type(), Err(Error::InvalidFrameType(0x0007)));
        assert_eq!(desc.body_len(), Err(Error::InvalidFrameType(0x0007)));
    }

    #[test]
    fn template_mismatches() {
        // hint disagrees with payload
        let join = CommandTemplate::management(0x12, 72);
        assert_eq!(join.descriptor(70), Err(Error::ProtocolMismatch));
        assert!(join.descriptor(72).is_ok());

        // management frames need an opcode
        let bad = CommandTemplate::management(0, 0);
        assert_eq!(bad.descriptor(4), Err(Error::ProtocolMismatch));

        // data frames must not carry one
        let bad = CommandTemplate {
            opcode: 0x11,
            ..CommandTemplate::data(0)
        };
        assert_eq!(bad.descriptor(4), Err(Error::ProtocolMismatch));
    }

    #[test]
    fn template_bytes() {
        let init = CommandTemplate::management(0x10, 4);
        assert_eq!(init.to_bytes(), [4, 0x10, 0x04]);
        assert_eq!(CommandTemplate::from_bytes([4, 0x10, 0x04]), Ok(init));
        assert_eq!(
            CommandTemplate::from_bytes([4, 0x10, 0x09]),
            Err(Error::InvalidFrameType(0x09))
        );
    }

    proptest! {
        #[test]
        fn management_body_len(opcode in 1u8.., len: u16) {
            let desc = CommandTemplate::management(opcode, 0).descriptor(usize::from(len)).unwrap();
            prop_assert_eq!(desc.frame_type(), Ok(FrameType::Management));
            prop_assert_eq!(desc.opcode(), opcode);
            prop_assert_eq!(desc.body_len(), Ok(usize::from(len)));
        }

        #[test]
        fn data_body_len(len in 0usize..=FrameDescriptor::MAX_DATA_LEN) {
            let desc = CommandTemplate::data(0).descriptor(len).unwrap();
            prop_assert_eq!(desc.frame_type(), Ok(FrameType::Data));
            prop_assert_eq!(desc.body_len(), Ok(len));
        }
    }
}
