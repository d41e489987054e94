//! Reading and dispatching frames sent by the device.
use core::time::Duration;

use wifi_spi_proto::{
    opcode::response as rsp,
    request::Command,
    response::{BssidResults, ConfigRecord, DataResponse, MgmtResponse, ScanResults},
    FrameType,
};

use crate::{
    hal::{Clock, IrqLine, Transport},
    settings::IrqMode,
    time::Deadline,
    Driver, Error,
};

/// A frame read from the device, classified by its descriptor.
///
/// Bodies borrow the driver's receive buffer and are valid until the next
/// read.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Response<'a> {
    Scan(ScanResults<'a>),
    BssidNwType(BssidResults<'a>),
    CfgGet { status: u8, body: &'a [u8] },
    /// Any other management response. Its body, if any, is not read.
    Generic(MgmtResponse),
    /// A data frame: socket traffic or a data-control response.
    Data(&'a [u8]),
}

impl<'a> Response<'a> {
    /// Decodes a data frame.
    pub fn data(&self) -> Result<DataResponse<'a>, Error> {
        match self {
            Self::Data(body) => Ok(DataResponse::parse(body)?),
            _ => Err(Error::UnexpectedResponse),
        }
    }

    /// Decodes the body of a config get response.
    pub fn config(&self) -> Result<ConfigRecord<'a>, Error> {
        match *self {
            Self::CfgGet { status: 0, body } => Ok(ConfigRecord::parse(body)?),
            Self::CfgGet { status, .. } => Err(Error::CommandFailed(u32::from(status))),
            _ => Err(Error::UnexpectedResponse),
        }
    }

    /// The management status byte, or `None` for data frames.
    #[must_use]
    pub fn status(&self) -> Option<u8> {
        match self {
            Self::Scan(scan) => Some(scan.status),
            Self::BssidNwType(bssid) => Some(bssid.status),
            Self::CfgGet { status, .. } => Some(*status),
            Self::Generic(rsp) => Some(rsp.status),
            Self::Data(_) => None,
        }
    }
}

impl<T, C, I> Driver<T, C, I>
where
    T: Transport,
    C: Clock,
    I: IrqLine,
{
    /// Reads the pending frame: its descriptor, then as much of its body as
    /// the frame kind calls for.
    pub fn read_packet(&mut self) -> Result<Response<'_>, Error> {
        let desc = self.bus.read_frame_descriptor()?;
        let len = desc.body_len()?;
        if len > self.rx_buf.len() {
            tracing::warn!(len, "frame body exceeds receive buffer");
            return Err(Error::PayloadTooLarge);
        }

        match desc.frame_type()? {
            FrameType::Data => {
                if len > 0 {
                    self.bus.read_frame_data(&mut self.rx_buf, len)?;
                }
                tracing::debug!(len, "data frame");
                Ok(Response::Data(&self.rx_buf[..len]))
            }
            FrameType::Management => {
                let opcode = desc.opcode();
                let status = desc.status();
                tracing::debug!(opcode, status, len, "management frame");
                match opcode {
                    rsp::SCAN | rsp::BSSID_NW_TYPE => {
                        let len = if status == 0 { len } else { 0 };
                        if len > 0 {
                            self.bus.read_frame_data(&mut self.rx_buf, len)?;
                        }
                        let body = &self.rx_buf[..len];
                        Ok(if opcode == rsp::SCAN {
                            Response::Scan(ScanResults::new(status, body))
                        } else {
                            Response::BssidNwType(BssidResults::new(status, body))
                        })
                    }
                    rsp::CFG_GET => {
                        if len > 0 {
                            self.bus.read_frame_data(&mut self.rx_buf, len)?;
                        }
                        Ok(Response::CfgGet {
                            status,
                            body: &self.rx_buf[..len],
                        })
                    }
                    opcode => Ok(Response::Generic(MgmtResponse { opcode, status })),
                }
            }
        }
    }

    /// Waits until a frame is pending or `timeout` elapses.
    ///
    /// The status register is read once per poll while waiting: a
    /// foreground that holds the driver keeps the interrupt path from
    /// reaching it.
    pub fn wait_for_packet(&mut self, timeout: Duration) -> Result<(), Error> {
        let deadline = Deadline::after(self.bus.clock(), timeout);
        loop {
            if self.check_packet_pending()? {
                return Ok(());
            }
            if deadline.expired(self.bus.clock()) {
                tracing::debug!(?timeout, "no response");
                return Err(Error::ResponseTimeout);
            }
            // in polled mode, the check above already read the register
            if self.irq_mode == IrqMode::Interrupt {
                self.with_irq_masked(Self::on_interrupt)?;
            }
        }
    }

    /// Sends `cmd` and reads the next frame the device sends.
    #[tracing::instrument(level = tracing::Level::DEBUG, skip_all)]
    pub fn request<Cmd: Command>(&mut self, cmd: &Cmd) -> Result<Response<'_>, Error> {
        self.send_command(cmd)?;
        self.wait_for_packet(Cmd::RESPONSE_TIMEOUT)?;
        self.clear_packet_pending();
        self.read_packet()
    }
}
