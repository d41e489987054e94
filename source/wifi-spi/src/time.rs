use core::time::Duration;

use crate::hal::Clock;

/// A tick budget measured from the moment it was created.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct Deadline {
    start: u32,
    budget: u32,
}

impl Deadline {
    pub(crate) fn after<C: Clock + ?Sized>(clock: &C, timeout: Duration) -> Self {
        Self {
            start: clock.now_ticks(),
            budget: ticks(timeout, clock.ticks_per_second()),
        }
    }

    pub(crate) fn expired<C: Clock + ?Sized>(&self, clock: &C) -> bool {
        clock.now_ticks().wrapping_sub(self.start) > self.budget
    }
}

fn ticks(timeout: Duration, ticks_per_second: u32) -> u32 {
    let ticks = timeout.as_micros() * u128::from(ticks_per_second) / 1_000_000;
    u32::try_from(ticks).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::SimClock;

    #[test]
    fn tick_conversion() {
        assert_eq!(ticks(Duration::from_secs(1), 1_000), 1_000);
        assert_eq!(ticks(Duration::from_millis(10), 32_768), 327);
        assert_eq!(ticks(Duration::from_secs(10_000), 1_000_000), u32::MAX);
    }

    #[test]
    fn deadline_survives_wraparound() {
        let clock = SimClock::manual(u32::MAX - 10);
        let deadline = Deadline::after(&clock, Duration::from_millis(20));
        clock.advance(15);
        assert!(!deadline.expired(&clock));
        clock.advance(10);
        assert!(deadline.expired(&clock));
    }
}
