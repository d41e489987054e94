//! Sharing one driver between the foreground and interrupt handlers.
use core::cell::RefCell;

use critical_section::Mutex;

use crate::{
    hal::{Clock, IrqLine, Transport},
    irq::IrqStatus,
    Driver, Error,
};

/// A [`Driver`] that can live in a `static` and be reached from interrupt
/// handlers.
///
/// Every access runs inside a critical section, so the interrupt path and
/// the foreground never touch the driver at the same time.
///
/// ```ignore
/// static WIFI: SharedDriver<Spi, Timer, WifiIrq> = SharedDriver::new();
///
/// #[interrupt]
/// fn GPIO4() {
///     WIFI.handle_interrupt();
/// }
/// ```
pub struct SharedDriver<T, C, I> {
    inner: Mutex<RefCell<Option<Driver<T, C, I>>>>,
}

impl<T, C, I> SharedDriver<T, C, I> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }
}

impl<T, C, I> Default for SharedDriver<T, C, I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C, I> SharedDriver<T, C, I>
where
    T: Transport,
    C: Clock,
    I: IrqLine,
{
    /// Installs `driver`, returning the one it replaces.
    pub fn install(&self, driver: Driver<T, C, I>) -> Option<Driver<T, C, I>> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).replace(driver))
    }

    pub fn take(&self) -> Option<Driver<T, C, I>> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).take())
    }

    /// Runs `f` on the installed driver, or returns `None` if there is none.
    pub fn with<R>(&self, f: impl FnOnce(&mut Driver<T, C, I>) -> R) -> Option<R> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).as_mut().map(f))
    }

    /// Services the device interrupt. Call this from the handler of the
    /// device's interrupt line.
    pub fn handle_interrupt(&self) -> Option<Result<IrqStatus, Error>> {
        let res = self.with(Driver::on_interrupt);
        if let Some(Err(error)) = res {
            tracing::warn!(%error, "failed to service device interrupt");
        }
        res
    }

    /// Completes a pending non-blocking send. Call this from the handler
    /// that signals the end of a [`Transport::start_send`] transfer.
    pub fn handle_send_complete(&self) -> bool {
        self.with(Driver::on_send_complete).unwrap_or(false)
    }
}
