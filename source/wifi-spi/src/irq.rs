//! Interrupt/status demultiplexing.
//!
//! The device raises a single interrupt for every change of its status
//! register. [`Driver::on_interrupt`] reads the register and folds it into a
//! set of sticky flags that the foreground consumes through the `check_*`
//! accessors.
use mycelium_bitfield::bitfield;
use wifi_spi_proto::{request::PowerMode, INT_STATUS_REG};

use crate::{
    hal::{Clock, IrqLine, Transport},
    settings::IrqMode,
    Driver, Error,
};

bitfield! {
    /// The device's interrupt status register, and the sticky flags derived
    /// from it.
    #[derive(Eq, PartialEq)]
    pub struct IrqStatus<u8> {
        /// The device cannot accept another data frame.
        pub const BUFFER_FULL: bool;
        pub const BUFFER_EMPTY: bool;
        /// A management frame is waiting to be read.
        pub const MGMT_PENDING: bool;
        /// A data frame is waiting to be read.
        pub const DATA_PENDING: bool;
        /// The device wants to enter power save and waits for the host to
        /// let it.
        pub const POWER_MODE: bool;
        const _RESERVED = 3;
    }
}

impl<T, C, I> Driver<T, C, I>
where
    T: Transport,
    C: Clock,
    I: IrqLine,
{
    /// Services the device interrupt.
    ///
    /// In interrupt mode, the platform calls this from the handler of the
    /// device's interrupt line; in polled mode, the `check_*` accessors call
    /// it themselves. Returns the updated sticky flags.
    ///
    /// A power-save request is acknowledged right away unless the foreground
    /// is [holding](Driver::hold) the device awake, in which case it stays
    /// latched and further power-save interrupts are masked.
    pub fn on_interrupt(&mut self) -> Result<IrqStatus, Error> {
        let raw = IrqStatus::from_bits(self.bus.read_register(INT_STATUS_REG)?);
        self.irq.clear_pending();

        let power_request =
            raw.get(IrqStatus::POWER_MODE) && self.power.mode == PowerMode::Mode1;

        let prev = self.status;
        let next = prev
            .with(IrqStatus::BUFFER_FULL, raw.get(IrqStatus::BUFFER_FULL))
            .with(IrqStatus::BUFFER_EMPTY, raw.get(IrqStatus::BUFFER_EMPTY))
            .with(
                IrqStatus::MGMT_PENDING,
                prev.get(IrqStatus::MGMT_PENDING) || raw.get(IrqStatus::MGMT_PENDING),
            )
            .with(
                IrqStatus::DATA_PENDING,
                prev.get(IrqStatus::DATA_PENDING) || raw.get(IrqStatus::DATA_PENDING),
            )
            .with(
                IrqStatus::POWER_MODE,
                prev.get(IrqStatus::POWER_MODE) || power_request,
            );
        self.raw_status = raw;
        self.status = next;
        tracing::trace!(%raw, %next, "device interrupt");

        if power_request {
            if self.power.hold {
                tracing::debug!("power save requested while held");
                self.mask_power_request()?;
            } else {
                self.acknowledge_power_request()?;
            }
        }

        Ok(self.status)
    }

    /// Returns the status register as last read, reading it first in polled
    /// mode.
    pub fn check_irq_status(&mut self) -> Result<IrqStatus, Error> {
        self.refresh()?;
        Ok(self.raw_status)
    }

    /// Returns true if a management or data frame is waiting to be read.
    pub fn check_packet_pending(&mut self) -> Result<bool, Error> {
        let status = self.refresh()?;
        Ok(status.get(IrqStatus::MGMT_PENDING) || status.get(IrqStatus::DATA_PENDING))
    }

    pub fn check_buffer_full(&mut self) -> Result<bool, Error> {
        Ok(self.refresh()?.get(IrqStatus::BUFFER_FULL))
    }

    /// Returns true if a power-save request is latched and not yet
    /// acknowledged.
    pub fn check_power_mode_request(&mut self) -> Result<bool, Error> {
        Ok(self.refresh()?.get(IrqStatus::POWER_MODE))
    }

    /// Consumes the packet-pending flags, typically right before reading the
    /// pending packet.
    pub fn clear_packet_pending(&mut self) {
        self.with_irq_masked(|driver| {
            driver.status = driver
                .status
                .with(IrqStatus::MGMT_PENDING, false)
                .with(IrqStatus::DATA_PENDING, false);
        });
    }

    fn refresh(&mut self) -> Result<IrqStatus, Error> {
        match self.irq_mode {
            IrqMode::Interrupt => Ok(self.status),
            IrqMode::Polled => self.with_irq_masked(Self::on_interrupt),
        }
    }
}
