//! Transaction primitives.
//!
//! Every bus transaction starts with a command header. `CB1`/`CB2` are
//! acknowledged by the device with a [`TransferStatus`]; `Busy` is retried
//! until the busy timeout elapses. Reads then wait for a start token before
//! the data phase.
use core::time::Duration;

use wifi_spi_proto::{
    round_up4, Cb1, CommandHeader, TransferStatus, TransferWidth, START_TOKEN,
};

use crate::{
    hal::{Clock, Completion, Transport},
    time::Deadline,
    Error, Settings,
};

/// A [`Transport`] and [`Clock`] pair speaking the header protocol.
#[derive(Debug)]
pub struct Bus<T, C> {
    transport: T,
    clock: C,
    width: TransferWidth,
    busy_timeout: Duration,
    start_token_timeout: Duration,
}

impl<T, C> Bus<T, C>
where
    T: Transport,
    C: Clock,
{
    pub fn new(transport: T, clock: C, settings: &Settings) -> Self {
        Self {
            transport,
            clock,
            width: settings.transfer_width,
            busy_timeout: settings.busy_timeout,
            start_token_timeout: settings.start_token_timeout,
        }
    }

    pub fn free(self) -> (T, C) {
        (self.transport, self.clock)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn width(&self) -> TransferWidth {
        self.width
    }

    /// Sends `CB1`/`CB2` until the device stops answering `Busy`.
    pub fn send_header(&mut self, cb1: Cb1, cb2: u8) -> Result<(), Error> {
        let deadline = Deadline::after(&self.clock, self.busy_timeout);
        let mut retries: usize = 0;
        loop {
            self.send_bytes(&[cb1.bits(), cb2])?;
            let mut status = [0];
            self.recv_bytes(&mut status)?;

            match TransferStatus::from_byte(status[0]) {
                Some(TransferStatus::Success) => {
                    if retries > 0 {
                        tracing::trace!(retries, "device no longer busy");
                    }
                    return Ok(());
                }
                Some(TransferStatus::Busy) => {
                    if deadline.expired(&self.clock) {
                        tracing::warn!(retries, cb1 = cb1.bits(), cb2, "device stayed busy");
                        return Err(Error::BusTimeout);
                    }
                    retries += 1;
                }
                Some(TransferStatus::Fail) => {
                    tracing::debug!(cb1 = cb1.bits(), cb2, "device failed transfer");
                    return Err(Error::BusFail);
                }
                None => {
                    tracing::warn!(status = status[0], "unexpected transfer status");
                    return Err(Error::BusFail);
                }
            }
        }
    }

    /// Sends `CB3`/`CB4`. The device does not acknowledge these.
    pub fn send_length(&mut self, len: u16) -> Result<(), Error> {
        self.send_bytes(&len.to_le_bytes())
    }

    pub fn send_command_header(&mut self, header: CommandHeader) -> Result<(), Error> {
        tracing::trace!(?header, "command header");
        self.send_header(header.cb1, header.cb2)?;
        if header.has_length() {
            self.send_length(header.length)?;
        }
        Ok(())
    }

    /// Reads single bytes until the device sends the start token.
    pub fn wait_for_start_token(&mut self) -> Result<(), Error> {
        let deadline = Deadline::after(&self.clock, self.start_token_timeout);
        loop {
            let mut byte = [0];
            self.recv_bytes(&mut byte)?;
            if byte[0] == START_TOKEN {
                return Ok(());
            }
            if deadline.expired(&self.clock) {
                tracing::warn!(last = byte[0], "no start token");
                return Err(Error::StartTokenTimeout);
            }
        }
    }

    pub fn send_bytes(&mut self, buf: &[u8]) -> Result<(), Error> {
        self.transport.send_bytes(buf).map_err(Error::transport)
    }

    pub fn recv_bytes(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        self.transport.recv_bytes(buf).map_err(Error::transport)
    }

    pub(crate) fn start_send(&mut self, buf: &[u8]) -> Result<Completion, Error> {
        self.transport.start_send(buf).map_err(Error::transport)
    }

    pub fn set_slave_select(&mut self, which: Option<u8>) -> Result<(), Error> {
        self.transport
            .set_slave_select(which)
            .map_err(Error::transport)
    }

    /// Bus interface initialization handshake, sent once after reset.
    pub fn init_interface(&mut self) -> Result<(), Error> {
        self.send_command_header(CommandHeader::interface_init())
    }

    /// Reads a single-byte interface register.
    pub fn read_register(&mut self, addr: u8) -> Result<u8, Error> {
        self.send_command_header(CommandHeader::register_read(addr))?;
        self.wait_for_start_token()?;
        let mut val = [0];
        self.recv_bytes(&mut val)?;
        Ok(val[0])
    }

    /// Writes one little-endian word to device memory.
    pub fn write_word(&mut self, addr: u32, val: u32) -> Result<(), Error> {
        self.write_memory(addr, &val.to_le_bytes())
    }

    /// Writes `data` to device memory at `addr`, zero-padded to a whole
    /// number of words.
    pub fn write_memory(&mut self, addr: u32, data: &[u8]) -> Result<(), Error> {
        let len = u16::try_from(round_up4(data.len())).map_err(|_| Error::PayloadTooLarge)?;
        self.send_command_header(CommandHeader::memory_write(self.width, len))?;
        self.send_bytes(&addr.to_le_bytes())?;
        self.send_padded(data, usize::from(len) - data.len())
    }

    /// Sends `buf` followed by `pad` zero bytes (`pad < 4`), folding the
    /// padding into the final word instead of a separate transfer.
    pub(crate) fn send_padded(&mut self, buf: &[u8], pad: usize) -> Result<(), Error> {
        debug_assert!(pad < 4, "padding must be less than one word");
        if pad == 0 {
            return self.send_bytes(buf);
        }

        let tail_len = (4 - pad).min(buf.len());
        let (body, tail) = buf.split_at(buf.len() - tail_len);
        if !body.is_empty() {
            self.send_bytes(body)?;
        }
        let mut word = [0; 4];
        word[..tail_len].copy_from_slice(tail);
        self.send_bytes(&word[..tail_len + pad])
    }
}
