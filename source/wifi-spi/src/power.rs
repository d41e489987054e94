//! Power-save handshake and module power sequencing.
//!
//! In power-save mode 1 the device asks for permission before it sleeps by
//! raising [`IrqStatus::POWER_MODE`]. While that request is latched and not
//! yet acknowledged, the device stays awake. Acknowledging it (clear, then
//! unmask) lets the device go back to sleep.
//!
//! The foreground keeps the device awake across a burst of traffic with
//! [`Driver::hold`], and lets it sleep again with
//! [`Driver::continue_to_sleep`]. Neither has any effect in modes 0 and 2.
use core::time::Duration;

use wifi_spi_proto::{
    request::{PowerMode, SetPowerMode},
    INT_CLEAR_REG, INT_MASK_REG,
};

use crate::{
    hal::{Clock, IrqLine, PinControl, Transport},
    irq::IrqStatus,
    Driver, Error, Settings,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PowerSaveState {
    pub mode: PowerMode,
    /// Set while the foreground keeps the device from sleeping.
    pub hold: bool,
}

impl PowerSaveState {
    pub(crate) const fn new(mode: PowerMode) -> Self {
        Self { mode, hold: false }
    }
}

impl<T, C, I> Driver<T, C, I>
where
    T: Transport,
    C: Clock,
    I: IrqLine,
{
    pub fn power_state(&self) -> PowerSaveState {
        self.power
    }

    /// Switches the device to power-save `mode`.
    #[tracing::instrument(level = tracing::Level::DEBUG, skip(self))]
    pub fn set_power_mode(&mut self, mode: PowerMode) -> Result<(), Error> {
        self.send_command(&SetPowerMode { mode })?;
        self.with_irq_masked(|driver| {
            driver.power.mode = mode;
            if mode != PowerMode::Mode1 {
                driver.power.hold = false;
            }
        });
        Ok(())
    }

    /// Keeps the device from sleeping until [`Driver::continue_to_sleep`].
    ///
    /// The next power-save request is latched instead of acknowledged, which
    /// keeps the device awake.
    pub fn hold(&mut self) {
        if self.power.mode != PowerMode::Mode1 {
            return;
        }
        tracing::trace!("holding device awake");
        self.with_irq_masked(|driver| driver.power.hold = true);
    }

    /// Lets the device sleep again, acknowledging a power-save request that
    /// arrived while it was held.
    pub fn continue_to_sleep(&mut self) -> Result<(), Error> {
        if self.power.mode != PowerMode::Mode1 {
            return Ok(());
        }
        tracing::trace!("releasing device");
        self.with_irq_masked(|driver| {
            driver.power.hold = false;
            if driver.status.get(IrqStatus::POWER_MODE) {
                driver.acknowledge_power_request()
            } else {
                Ok(())
            }
        })
    }

    /// True if the device sleeps and will not accept traffic.
    pub(crate) fn is_asleep(&self) -> bool {
        self.power.mode == PowerMode::Mode1 && !self.status.get(IrqStatus::POWER_MODE)
    }

    /// Lets the device enter power save: clears the request, then unmasks
    /// further requests.
    pub(crate) fn acknowledge_power_request(&mut self) -> Result<(), Error> {
        let power = IrqStatus::new().with(IrqStatus::POWER_MODE, true);
        self.bus
            .write_word(INT_CLEAR_REG, u32::from(power.bits()))
            .inspect_err(|error| tracing::warn!(%error, "failed to clear power request"))?;

        let mask = self.int_mask.with(IrqStatus::POWER_MODE, false);
        self.bus.write_word(INT_MASK_REG, u32::from(mask.bits()))?;
        self.int_mask = mask;
        self.status = self.status.with(IrqStatus::POWER_MODE, false);
        tracing::debug!("power request acknowledged");
        Ok(())
    }

    /// Masks further power-save interrupts while a request stays latched.
    pub(crate) fn mask_power_request(&mut self) -> Result<(), Error> {
        let mask = self.int_mask.with(IrqStatus::POWER_MODE, true);
        self.bus.write_word(INT_MASK_REG, u32::from(mask.bits()))?;
        self.int_mask = mask;
        Ok(())
    }
}

/// Powers the module up and resets it twice.
///
/// The reset line is pulsed for `settings.reset_pulse` and released for
/// `settings.reset_settle` after each pulse.
pub fn power_cycle<P, C>(pins: &mut P, clock: &C, settings: &Settings) -> Result<(), P::Error>
where
    P: PinControl,
    C: Clock + ?Sized,
{
    let pulse = millis(settings.reset_pulse);
    let settle = millis(settings.reset_settle);

    tracing::debug!(pulse_ms = pulse, settle_ms = settle, "power cycling module");
    pins.set_power(true)?;
    for _ in 0..2 {
        pins.set_reset(true)?;
        clock.delay_ms(pulse);
        pins.set_reset(false)?;
        clock.delay_ms(settle);
    }
    Ok(())
}

/// Whole milliseconds in `d`, saturating at `u32::MAX`.
fn millis(d: Duration) -> u32 {
    u32::try_from(d.as_millis()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{driver, script_register_read, PinEvent, SimClock, SimPins};
    use wifi_spi_proto::CommandHeader;

    fn mode1() -> Settings {
        Settings {
            power_mode: PowerMode::Mode1,
            ..Settings::default()
        }
    }

    /// Extracts the `(register, value)` pairs of every memory write in a
    /// wire trace.
    fn memory_writes(sent: &[Vec<u8>]) -> Vec<(u32, u32)> {
        let header = CommandHeader::memory_write(wifi_spi_proto::TransferWidth::Bits8, 4)
            .encode();
        sent.windows(4)
            .filter(|w| w[0][..] == header[..2] && w[1][..] == header[2..])
            .map(|w| {
                let reg = u32::from_le_bytes(w[2][..].try_into().unwrap());
                let val = u32::from_le_bytes(w[3][..].try_into().unwrap());
                (reg, val)
            })
            .collect()
    }

    #[test]
    fn unheld_request_is_acknowledged() {
        let mut driver = driver(mode1());
        script_register_read(&mut driver, 0x10);
        let status = driver.on_interrupt().unwrap();

        assert!(!status.get(IrqStatus::POWER_MODE));
        assert_eq!(
            memory_writes(&driver.bus().transport().sent),
            vec![(INT_CLEAR_REG, 0x10), (INT_MASK_REG, 0x00)]
        );
        assert!(driver.is_asleep());
    }

    #[test]
    fn held_request_is_masked_not_acknowledged() {
        let mut driver = driver(mode1());
        driver.hold();
        script_register_read(&mut driver, 0x10);
        driver.on_interrupt().unwrap();

        assert_eq!(
            memory_writes(&driver.bus().transport().sent),
            vec![(INT_MASK_REG, 0x10)]
        );
        assert_eq!(driver.check_power_mode_request(), Ok(true));
        assert!(!driver.is_asleep());

        driver.bus_mut().transport_mut().sent.clear();
        driver.continue_to_sleep().unwrap();
        assert_eq!(
            memory_writes(&driver.bus().transport().sent),
            vec![(INT_CLEAR_REG, 0x10), (INT_MASK_REG, 0x00)]
        );
        assert_eq!(driver.check_power_mode_request(), Ok(false));
        assert!(!driver.power_state().hold);
    }

    #[test]
    fn continue_without_request_writes_nothing() {
        let mut driver = driver(mode1());
        driver.hold();
        driver.continue_to_sleep().unwrap();
        assert!(driver.bus().transport().sent.is_empty());
    }

    #[test]
    fn hold_is_a_no_op_outside_mode1() {
        for mode in [PowerMode::Mode0, PowerMode::Mode2] {
            let mut driver = driver(Settings {
                power_mode: mode,
                ..Settings::default()
            });
            driver.hold();
            assert!(!driver.power_state().hold);
            driver.continue_to_sleep().unwrap();
            assert!(driver.bus().transport().sent.is_empty());
            assert!(!driver.is_asleep());
        }
    }

    #[test]
    fn set_power_mode_updates_state() {
        let mut driver = driver(Settings::default());
        driver.set_power_mode(PowerMode::Mode1).unwrap();
        assert_eq!(driver.power_state().mode, PowerMode::Mode1);
        assert!(driver.is_asleep());

        driver.hold();
        driver.set_power_mode(PowerMode::Mode0).unwrap();
        assert_eq!(
            driver.power_state(),
            PowerSaveState {
                mode: PowerMode::Mode0,
                hold: false
            }
        );
    }

    #[test]
    fn power_cycle_sequence() {
        let mut pins = SimPins::default();
        let clock = SimClock::new();
        power_cycle(&mut pins, &clock, &Settings::default()).unwrap();

        assert_eq!(
            pins.events,
            vec![
                PinEvent::Power(true),
                PinEvent::Reset(true),
                PinEvent::Reset(false),
                PinEvent::Reset(true),
                PinEvent::Reset(false),
            ]
        );
        // two pulses of 10ms and two settling periods of 20ms
        assert!(clock.peek() >= 60);
    }

    #[test]
    fn long_reset_timings_saturate() {
        /// Records delays instead of waiting them out.
        #[derive(Default)]
        struct DelayLog(core::cell::RefCell<Vec<u32>>);

        impl Clock for DelayLog {
            fn now_ticks(&self) -> u32 {
                0
            }

            fn ticks_per_second(&self) -> u32 {
                1_000
            }

            fn delay_ms(&self, ms: u32) {
                self.0.borrow_mut().push(ms);
            }
        }

        let settings = Settings {
            reset_pulse: Duration::from_millis(u64::from(u32::MAX) + 5),
            reset_settle: Duration::from_secs(2),
            ..Settings::default()
        };
        let clock = DelayLog::default();
        power_cycle(&mut SimPins::default(), &clock, &settings).unwrap();
        assert_eq!(
            *clock.0.borrow(),
            vec![u32::MAX, 2_000, u32::MAX, 2_000]
        );
    }
}
