//! Capabilities the driver consumes from the platform.
//!
//! The driver never touches hardware directly. A platform provides a
//! [`Transport`] (the bus transceiver), a [`Clock`], an [`IrqLine`] for the
//! device's interrupt pin and, for module bring-up, a [`PinControl`].
//! Adapters for `embedded-hal` SPI buses and GPIO pins are provided as
//! [`SpiTransport`] and [`GpioPins`].
use core::{fmt, time::Duration};

use embedded_hal::{
    digital::{self, Error as _, OutputPin},
    spi::{self, Error as _, SpiBus},
};

use crate::time::Deadline;

/// A half-duplex byte transceiver connected to the device.
pub trait Transport {
    type Error: spi::Error;

    fn send_bytes(&mut self, buf: &[u8]) -> Result<(), Self::Error>;

    fn recv_bytes(&mut self, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Asserts the chip select of slave `which`, or deasserts all chip
    /// selects if `None`.
    fn set_slave_select(&mut self, which: Option<u8>) -> Result<(), Self::Error>;

    /// Starts writing `buf` without waiting for the last FIFO burst to drain.
    ///
    /// If this returns [`Completion::Pending`], the platform must call
    /// [`Driver::on_send_complete`](crate::Driver::on_send_complete) once the
    /// transfer has finished. The default implementation writes `buf`
    /// synchronously.
    fn start_send(&mut self, buf: &[u8]) -> Result<Completion, Self::Error> {
        self.send_bytes(buf)?;
        Ok(Completion::Done)
    }
}

/// Outcome of [`Transport::start_send`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Completion {
    /// The transfer finished before `start_send` returned.
    Done,
    /// The transfer is still running.
    Pending,
}

/// A free-running tick counter.
///
/// Only differences between two readings are meaningful; the counter may
/// wrap.
pub trait Clock {
    fn now_ticks(&self) -> u32;

    fn ticks_per_second(&self) -> u32;

    /// Busy-waits for `ms` milliseconds.
    fn delay_ms(&self, ms: u32) {
        let deadline = Deadline::after(self, Duration::from_millis(u64::from(ms)));
        while !deadline.expired(self) {
            core::hint::spin_loop();
        }
    }
}

/// The interrupt line the device raises when its status register changes.
pub trait IrqLine {
    fn enable(&mut self);

    fn disable(&mut self);

    fn clear_pending(&mut self);
}

/// The module's reset and power-enable pins.
pub trait PinControl {
    type Error: fmt::Debug;

    fn set_reset(&mut self, asserted: bool) -> Result<(), Self::Error>;

    fn set_power(&mut self, on: bool) -> Result<(), Self::Error>;
}

/// An [`IrqLine`] for platforms that only ever poll the device.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoIrq;

/// A [`Transport`] over an `embedded-hal` SPI bus and a single active-low
/// chip select.
#[derive(Debug)]
pub struct SpiTransport<B, CS> {
    bus: B,
    cs: CS,
}

/// [`PinControl`] over an active-low reset pin and an active-high power
/// enable pin.
#[derive(Debug)]
pub struct GpioPins<R, P> {
    reset: R,
    power: P,
}

// === impl NoIrq ===

impl IrqLine for NoIrq {
    fn enable(&mut self) {}

    fn disable(&mut self) {}

    fn clear_pending(&mut self) {}
}

// === impl SpiTransport ===

impl<B, CS> SpiTransport<B, CS>
where
    B: SpiBus,
    CS: OutputPin,
{
    pub fn new(bus: B, cs: CS) -> Self {
        Self { bus, cs }
    }

    pub fn free(self) -> (B, CS) {
        (self.bus, self.cs)
    }
}

impl<B, CS> Transport for SpiTransport<B, CS>
where
    B: SpiBus,
    CS: OutputPin,
{
    type Error = spi::ErrorKind;

    fn send_bytes(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        self.bus.write(buf).map_err(|e| e.kind())?;
        self.bus.flush().map_err(|e| e.kind())
    }

    fn recv_bytes(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.bus.read(buf).map_err(|e| e.kind())
    }

    fn set_slave_select(&mut self, which: Option<u8>) -> Result<(), Self::Error> {
        match which {
            Some(_) => self.cs.set_low(),
            None => self.cs.set_high(),
        }
        .map_err(|_| spi::ErrorKind::ChipSelectFault)
    }
}

// === impl GpioPins ===

impl<R, P> GpioPins<R, P>
where
    R: OutputPin,
    P: OutputPin,
{
    pub fn new(reset: R, power: P) -> Self {
        Self { reset, power }
    }

    pub fn free(self) -> (R, P) {
        (self.reset, self.power)
    }
}

impl<R, P> PinControl for GpioPins<R, P>
where
    R: OutputPin,
    P: OutputPin,
{
    type Error = digital::ErrorKind;

    fn set_reset(&mut self, asserted: bool) -> Result<(), Self::Error> {
        self.reset
            .set_state((!asserted).into())
            .map_err(|e| e.kind())
    }

    fn set_power(&mut self, on: bool) -> Result<(), Self::Error> {
        self.power.set_state(on.into()).map_err(|e| e.kind())
    }
}
