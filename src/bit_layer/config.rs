use std::time::Duration;

pub const DEFAULT_DELAY: Duration = Duration::from_micros(10);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);

const MIN_PERIOD_US: u64 = 2;
const MAX_PERIOD_US: u64 = 2 * 255;

/// Lines and timing of one bus.
///
/// `sda` and `scl` are BCM GPIO numbers. Changing either one only takes
/// effect on the next `SoftWire::begin`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusConfig {
    pub sda: u8,
    pub scl: u8,
    pub pullups: bool,
    /// Half of one SCL period.
    pub delay: Duration,
    /// Budget for every operation that waits on the bus.
    pub timeout: Duration,
}

impl BusConfig {
    pub fn new(sda: u8, scl: u8) -> Self {
        BusConfig {
            sda,
            scl,
            pullups: false,
            delay: DEFAULT_DELAY,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Half-period delay approximating `frequency` Hz on SCL.
    pub fn delay_for_clock(frequency: u32) -> Duration {
        let period_us = if frequency == 0 {
            MAX_PERIOD_US
        } else {
            (1_000_000 / frequency as u64).max(MIN_PERIOD_US).min(MAX_PERIOD_US)
        };

        Duration::from_micros(period_us / 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BusConfig::new(2, 3);
        assert_eq!(config.sda, 2);
        assert_eq!(config.scl, 3);
        assert!(!config.pullups);
        assert_eq!(config.delay, Duration::from_micros(10));
        assert_eq!(config.timeout, Duration::from_millis(100));
    }

    #[test]
    fn clock_to_delay() {
        assert_eq!(BusConfig::delay_for_clock(100_000), Duration::from_micros(5));
        assert_eq!(BusConfig::delay_for_clock(50_000), Duration::from_micros(10));
        // clamped at both ends
        assert_eq!(BusConfig::delay_for_clock(10_000_000), Duration::from_micros(1));
        assert_eq!(BusConfig::delay_for_clock(100), Duration::from_micros(255));
        assert_eq!(BusConfig::delay_for_clock(0), Duration::from_micros(255));
    }
}
