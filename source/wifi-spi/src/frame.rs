//! Frame transport: descriptors and frame data through the frame FIFO.
use wifi_spi_proto::{round_up4, CommandHeader, FrameDescriptor, FrameType};

use crate::{
    bus::Bus,
    hal::{Clock, Transport},
    Error,
};

impl<T, C> Bus<T, C>
where
    T: Transport,
    C: Clock,
{
    pub fn read_frame_descriptor(&mut self) -> Result<FrameDescriptor, Error> {
        self.send_command_header(CommandHeader::frame_read(
            self.width(),
            FrameDescriptor::LEN as u16,
        ))?;
        self.wait_for_start_token()?;
        let mut bytes = [0; FrameDescriptor::LEN];
        self.recv_bytes(&mut bytes)?;
        let desc = FrameDescriptor::from_bytes(bytes);
        tracing::trace!(?desc, "read frame descriptor");
        Ok(desc)
    }

    pub fn write_frame_descriptor(
        &mut self,
        desc: &FrameDescriptor,
        frame_type: FrameType,
    ) -> Result<(), Error> {
        tracing::trace!(?desc, ?frame_type, "write frame descriptor");
        self.send_command_header(CommandHeader::frame_write(
            self.width(),
            frame_type,
            FrameDescriptor::LEN as u16,
        ))?;
        self.send_bytes(desc.as_bytes())
    }

    /// Writes `primary` then `secondary` as one frame data phase, zero-padded
    /// to a whole number of words.
    pub fn write_frame_data(
        &mut self,
        primary: &[u8],
        secondary: &[u8],
        frame_type: FrameType,
    ) -> Result<(), Error> {
        let pad = self.begin_frame_write(primary.len() + secondary.len(), frame_type)?;
        if secondary.is_empty() {
            return self.send_padded(primary, pad);
        }
        if !primary.is_empty() {
            self.send_bytes(primary)?;
        }
        self.send_padded(secondary, pad)
    }

    /// Sends the header of a `len`-byte frame data write, returning the
    /// number of padding bytes the data phase must end with.
    pub(crate) fn begin_frame_write(
        &mut self,
        len: usize,
        frame_type: FrameType,
    ) -> Result<usize, Error> {
        let padded = round_up4(len);
        let header_len = u16::try_from(padded).map_err(|_| Error::PayloadTooLarge)?;
        self.send_command_header(CommandHeader::frame_write(
            self.width(),
            frame_type,
            header_len,
        ))?;
        Ok(padded - len)
    }

    /// Reads `len` bytes of frame data into the front of `buf`.
    pub fn read_frame_data(&mut self, buf: &mut [u8], len: usize) -> Result<(), Error> {
        let dst = buf.get_mut(..len).ok_or(Error::PayloadTooLarge)?;
        let header_len = u16::try_from(round_up4(len)).map_err(|_| Error::PayloadTooLarge)?;
        self.send_command_header(CommandHeader::frame_read(self.width(), header_len))?;
        self.wait_for_start_token()?;
        self.recv_bytes(dst)
    }
}
