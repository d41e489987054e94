//! Socket framing: opening and closing sockets, and sending payloads with
//! the per-protocol send header in front of them.
//!
//! A send frame is one data frame: a [`SendHeader`], then the payload, the
//! whole zero-padded to a word boundary. Send headers are always two bytes
//! short of a word boundary, so the header and the first two payload bytes
//! go out as one aligned burst. A blocking send writes the rest straight from
//! the caller's buffer; a non-blocking send copies it into the driver, since
//! the transfer outlives the call.
use alloc::boxed::Box;
use core::fmt;

use wifi_spi_proto::{
    request::{Command, SocketClose, SocketOpen},
    response::DataResponse,
    round_up4, FrameDescriptor, FrameType, Protocol, SendHeader, SocketDescriptor,
    MAX_PAYLOAD_SIZE,
};

use crate::{
    hal::{Clock, Completion, IrqLine, Transport},
    time::Deadline,
    Driver, Error,
};

/// Payload bytes that share the aligned burst with the send header.
const HEADER_TAIL: usize = 2;

/// Called once a non-blocking send has left the host.
pub type SendContinuation = Box<dyn FnOnce(Result<(), Error>) + Send>;

/// The single non-blocking send the driver can have in flight.
pub(crate) struct PendingSend {
    header: SendHeader,
    /// The part of the frame still owned by the transport, padding included.
    remainder: heapless::Vec<u8, MAX_PAYLOAD_SIZE>,
    continuation: SendContinuation,
}

impl fmt::Debug for PendingSend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingSend")
            .field("header", &self.header)
            .field("remainder", &self.remainder.len())
            .finish_non_exhaustive()
    }
}

impl<T, C, I> Driver<T, C, I>
where
    T: Transport,
    C: Clock,
    I: IrqLine,
{
    /// Opens a socket and waits for the device to assign it a descriptor.
    ///
    /// Frames other than the open response that arrive in the meantime are
    /// discarded.
    #[tracing::instrument(level = tracing::Level::DEBUG, skip(self))]
    pub fn socket_open(&mut self, open: &SocketOpen) -> Result<SocketDescriptor, Error> {
        self.send_command(open)?;
        let deadline = Deadline::after(self.bus.clock(), SocketOpen::RESPONSE_TIMEOUT);
        loop {
            if deadline.expired(self.bus.clock()) {
                return Err(Error::ResponseTimeout);
            }
            self.wait_for_packet(SocketOpen::RESPONSE_TIMEOUT)?;
            self.clear_packet_pending();

            match self.read_packet()?.data() {
                Ok(DataResponse::SocketOpened {
                    status: 0, socket, ..
                }) => {
                    tracing::debug!(socket = socket.0, "socket opened");
                    return Ok(socket);
                }
                Ok(DataResponse::SocketOpened { status, .. }) => {
                    return Err(Error::CommandFailed(status));
                }
                Ok(rsp) => tracing::debug!(?rsp, "discarding frame while opening socket"),
                Err(error) => tracing::debug!(%error, "discarding frame while opening socket"),
            }
        }
    }

    pub fn socket_close(&mut self, socket: SocketDescriptor) -> Result<(), Error> {
        tracing::debug!(socket = socket.0, "closing socket");
        self.send_command(&SocketClose { socket })
    }

    /// Sends `payload` on `socket`, returning once the whole frame has been
    /// written.
    pub fn send(
        &mut self,
        socket: SocketDescriptor,
        protocol: Protocol,
        payload: &[u8],
    ) -> Result<(), Error> {
        if self.pending_send.is_some() {
            return Err(Error::SendInFlight);
        }
        let (header, buf, header_len) = self.begin_send(socket, protocol, payload)?;
        let split = payload.len().min(HEADER_TAIL);
        let mut first = [0; SendHeader::MAX_LEN + HEADER_TAIL];
        first[..header_len].copy_from_slice(&buf[..header_len]);
        first[header_len..header_len + split].copy_from_slice(&payload[..split]);

        tracing::trace!(?header, "send");
        self.bus.write_frame_data(
            &first[..header_len + split],
            &payload[split..],
            FrameType::Data,
        )
    }

    /// Starts sending `payload` on `socket` and returns without waiting for
    /// the end of the transfer.
    ///
    /// `on_complete` runs once the frame has left the host, either before
    /// this returns or from [`Driver::on_send_complete`]. Only one
    /// non-blocking send may be in flight; the driver must stay in place
    /// until it completes.
    ///
    /// If starting the transfer fails, the error is returned and
    /// `on_complete` is dropped without being called.
    pub fn send_nonblocking<F>(
        &mut self,
        socket: SocketDescriptor,
        protocol: Protocol,
        payload: &[u8],
        on_complete: F,
    ) -> Result<(), Error>
    where
        F: FnOnce(Result<(), Error>) + Send + 'static,
    {
        if self.pending_send.is_some() {
            tracing::debug!("non-blocking send already in flight");
            return Err(Error::SendInFlight);
        }
        let (header, buf, header_len) = self.begin_send(socket, protocol, payload)?;

        let total = header_len + payload.len();
        let pad = self.bus.begin_frame_write(total, FrameType::Data)?;
        let split = payload.len().min(HEADER_TAIL);
        let (tail, rest) = payload.split_at(split);

        let mut first = [0; SendHeader::MAX_LEN + HEADER_TAIL];
        first[..header_len].copy_from_slice(&buf[..header_len]);
        first[header_len..header_len + split].copy_from_slice(tail);
        if rest.is_empty() {
            self.bus.send_padded(&first[..header_len + split], pad)?;
            on_complete(Ok(()));
            return Ok(());
        }
        self.bus.send_bytes(&first[..header_len + split])?;

        let mut remainder = heapless::Vec::<u8, MAX_PAYLOAD_SIZE>::new();
        remainder
            .extend_from_slice(rest)
            .and_then(|()| remainder.resize(round_up4(total) - header_len - split, 0))
            .map_err(|()| Error::PayloadTooLarge)?;

        let pending = self.pending_send.insert(PendingSend {
            header,
            remainder,
            continuation: Box::new(on_complete),
        });
        match self.bus.start_send(&pending.remainder) {
            Ok(Completion::Done) => {
                self.on_send_complete();
                Ok(())
            }
            Ok(Completion::Pending) => {
                tracing::trace!(?header, "send in flight");
                Ok(())
            }
            Err(error) => {
                tracing::warn!(%error, "failed to start send");
                self.pending_send = None;
                Err(error)
            }
        }
    }

    /// Completes the pending non-blocking send, running its continuation.
    ///
    /// Platforms whose [`Transport::start_send`] returns
    /// [`Completion::Pending`] call this once the transfer has finished.
    /// Returns false if no send was in flight.
    pub fn on_send_complete(&mut self) -> bool {
        match self.pending_send.take() {
            Some(PendingSend {
                header,
                continuation,
                ..
            }) => {
                tracing::trace!(?header, "send complete");
                continuation(Ok(()));
                true
            }
            None => false,
        }
    }

    /// True if a non-blocking send has not completed yet.
    pub fn send_in_flight(&self) -> bool {
        self.pending_send.is_some()
    }

    /// Checks that the device can take a send frame, then writes its
    /// descriptor. Returns the send header, encoded.
    fn begin_send(
        &mut self,
        socket: SocketDescriptor,
        protocol: Protocol,
        payload: &[u8],
    ) -> Result<(SendHeader, [u8; SendHeader::MAX_LEN], usize), Error> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(Error::PayloadTooLarge);
        }
        if self.check_buffer_full()? {
            tracing::debug!("device buffer full");
            return Err(Error::BufferFull);
        }
        if self.is_asleep() {
            tracing::debug!("device asleep");
            return Err(Error::DeviceAsleep);
        }

        let header = SendHeader {
            socket,
            protocol,
            payload_len: payload.len() as u32,
        };
        let mut buf = [0; SendHeader::MAX_LEN];
        let header_len = header.encode(&mut buf)?;
        let desc = FrameDescriptor::data(header_len + payload.len())?;
        self.bus.write_frame_descriptor(&desc, FrameType::Data)?;
        Ok((header, buf, header_len))
    }
}
