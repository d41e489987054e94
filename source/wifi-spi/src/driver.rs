use wifi_spi_proto::MAX_FRAME_LEN;

use crate::{
    bus::Bus,
    hal::{Clock, IrqLine, Transport},
    irq::IrqStatus,
    power::PowerSaveState,
    settings::IrqMode,
    socket::PendingSend,
    Error, Settings,
};

/// The driver for one coprocessor.
///
/// All state the interrupt path and the foreground share lives here: the
/// sticky interrupt status, the power-save state and the pending
/// non-blocking send. Platforms that service the device from an interrupt
/// handler should keep the driver in a [`SharedDriver`](crate::SharedDriver).
pub struct Driver<T, C, I> {
    pub(crate) bus: Bus<T, C>,
    pub(crate) irq: I,
    pub(crate) irq_mode: IrqMode,
    /// Sticky status flags, replaced as a whole on every refresh.
    pub(crate) status: IrqStatus,
    /// The status register as last read.
    pub(crate) raw_status: IrqStatus,
    /// Contents of the interrupt mask register.
    pub(crate) int_mask: IrqStatus,
    pub(crate) power: PowerSaveState,
    pub(crate) pending_send: Option<PendingSend>,
    pub(crate) rx_buf: [u8; MAX_FRAME_LEN],
}

impl<T, C, I> Driver<T, C, I>
where
    T: Transport,
    C: Clock,
    I: IrqLine,
{
    /// Selects the device on the bus and returns a driver for it.
    pub fn new(transport: T, clock: C, irq: I, settings: &Settings) -> Result<Self, Error> {
        let mut bus = Bus::new(transport, clock, settings);
        bus.set_slave_select(Some(settings.slave))?;
        tracing::debug!(?settings, "driver created");
        Ok(Self {
            bus,
            irq,
            irq_mode: settings.irq_mode,
            status: IrqStatus::new(),
            raw_status: IrqStatus::new(),
            int_mask: IrqStatus::new(),
            power: PowerSaveState::new(settings.power_mode),
            pending_send: None,
            rx_buf: [0; MAX_FRAME_LEN],
        })
    }

    /// Deselects the device and returns the capabilities the driver was
    /// created with. A pending non-blocking send is dropped without running
    /// its continuation.
    pub fn release(mut self) -> Result<(T, C, I), Error> {
        self.bus.set_slave_select(None)?;
        let (transport, clock) = self.bus.free();
        Ok((transport, clock, self.irq))
    }

    /// Bus interface initialization handshake, sent once after the module
    /// comes out of reset.
    pub fn init_interface(&mut self) -> Result<(), Error> {
        tracing::debug!("initializing bus interface");
        self.bus.init_interface()
    }

    pub fn bus(&self) -> &Bus<T, C> {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus<T, C> {
        &mut self.bus
    }

    pub fn irq_line(&self) -> &I {
        &self.irq
    }

    /// Runs `f` with the device interrupt disabled, so that the interrupt
    /// path cannot observe a half-updated state.
    pub(crate) fn with_irq_masked<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.irq.disable();
        let ret = f(self);
        self.irq.enable();
        ret
    }
}
