mod config;
mod error;
mod rw_bit;
mod status;
mod timeout;

pub use self::config::{BusConfig, DEFAULT_DELAY, DEFAULT_TIMEOUT};
pub use self::error::Error;
pub use self::rw_bit::Mode;
pub use self::status::Status;
pub use self::timeout::{delay, Timeout};

use std::time::Duration;

use address;
use lines::LineInterface;
use lines::gpio::GpioLines;
use transaction::Transaction;

/// Bit-banged I2C master on two open-drain lines.
///
/// SCL is left driven low between bytes. Every wait on the bus is bounded by
/// the configured timeout; when it runs out the driver issues a STOP and
/// reports `Status::TimedOut`.
pub struct SoftWire<L = GpioLines> {
    pub(crate) lines: L,
    pub(crate) config: BusConfig,
    pub(crate) initialized: bool,
    pub(crate) transaction: Transaction,
}

impl SoftWire<GpioLines> {
    /// Driver on the Raspberry Pi GPIO pins `sda` and `scl` (BCM numbering).
    pub fn new(sda: u8, scl: u8) -> Self {
        SoftWire::with_lines(sda, scl, GpioLines::new())
    }
}

impl<L> SoftWire<L> where L: LineInterface {
    pub fn with_lines(sda: u8, scl: u8, lines: L) -> Self {
        SoftWire {
            lines,
            config: BusConfig::new(sda, scl),
            initialized: false,
            transaction: Transaction::new(),
        }
    }

    pub fn lines(&self) -> &L {
        &self.lines
    }

    pub fn lines_mut(&mut self) -> &mut L {
        &mut self.lines
    }

    pub fn into_lines(self) -> L {
        self.lines
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    pub fn sda(&self) -> u8 {
        self.config.sda
    }

    pub fn scl(&self) -> u8 {
        self.config.scl
    }

    pub fn pullups(&self) -> bool {
        self.config.pullups
    }

    pub fn delay(&self) -> Duration {
        self.config.delay
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Takes effect on the next `begin`.
    pub fn set_sda(&mut self, sda: u8) {
        self.config.sda = sda;
        self.initialized = false;
    }

    /// Takes effect on the next `begin`.
    pub fn set_scl(&mut self, scl: u8) {
        self.config.scl = scl;
        self.initialized = false;
    }

    /// Takes effect on the next `begin`.
    pub fn enable_pullups(&mut self, enable: bool) {
        self.config.pullups = enable;
        self.initialized = false;
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.config.delay = delay;
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.config.timeout = timeout;
    }

    /// Approximates an SCL frequency of `frequency` Hz.
    pub fn set_clock(&mut self, frequency: u32) {
        self.config.delay = BusConfig::delay_for_clock(frequency);
        debug!("Clock set to ~{} Hz, delay {:?}", frequency, self.config.delay);
    }

    /// Takes hold of the lines and releases both to idle high.
    ///
    /// Must be called before use, and again after the lines or the pull-up
    /// setting change.
    pub fn begin(&mut self) -> Result<(), Error> {
        self.lines.attach(&self.config)?;
        self.initialized = true;
        self.transaction = Transaction::with_capacities(
            self.transaction.tx_capacity(), self.transaction.rx_capacity());

        if self.stop(true) == Status::TimedOut {
            warn!("SCL on GPIO {} stays low, bus is not idle", self.config.scl);
        } else {
            info!("Bus on sda {} / scl {} ready", self.config.sda, self.config.scl);
        }
        Ok(())
    }

    /// Releases both lines back to inputs.
    pub fn end(&mut self) {
        trace!("Releasing bus");
        self.lines.detach();
        self.initialized = false;
    }

    /// STOP condition: leaves both lines released.
    ///
    /// With `allow_clock_stretch` the driver waits for SCL to actually rise
    /// before releasing SDA. Without it, SCL is assumed high after one delay,
    /// which is what recovery after a timeout needs.
    pub fn stop(&mut self, allow_clock_stretch: bool) -> Status {
        trace!("Stop");
        let timeout = Timeout::start(self.config.timeout);

        self.lines.scl_low();
        self.wait();

        self.lines.sda_low();
        self.wait();

        if allow_clock_stretch {
            if !self.scl_high_and_stretch(&timeout) {
                return Status::TimedOut;
            }
        } else {
            self.lines.scl_high();
        }
        self.wait();

        self.lines.sda_high();
        self.wait();

        Status::Ack
    }

    /// START condition followed by `raw_addr`, which already carries the
    /// direction bit.
    pub fn ll_start(&mut self, raw_addr: u8) -> Status {
        self.check_initialized();
        trace!("Start {:#04x}", raw_addr);

        self.lines.sda_low();
        self.wait();

        self.lines.scl_low();
        self.wait();

        self.ll_write(raw_addr)
    }

    /// START without a STOP first, for chaining transfers.
    pub fn ll_repeated_start(&mut self, raw_addr: u8) -> Status {
        self.check_initialized();
        trace!("Repeated start {:#04x}", raw_addr);

        self.lines.scl_low();
        self.wait();

        self.lines.sda_high();
        self.wait();

        self.lines.scl_high();
        self.wait();

        self.lines.sda_low();
        self.wait();

        self.ll_write(raw_addr)
    }

    /// Keeps issuing START until the slave acknowledges `raw_addr`.
    ///
    /// A NACK is retried after a STOP, until the timeout runs out. Any other
    /// failure ends the attempt. The bus is always stopped before
    /// `TimedOut` is returned.
    pub fn ll_start_wait(&mut self, raw_addr: u8) -> Status {
        let timeout = Timeout::start(self.config.timeout);
        let mut attempts = 0u32;

        while !timeout.is_expired() {
            attempts += 1;
            match self.ll_start(raw_addr) {
                Status::Ack => {
                    debug!("{:#04x} acknowledged after {} attempt(s)", raw_addr, attempts);
                    return Status::Ack;
                }
                Status::Nack => {
                    if self.stop(true) == Status::TimedOut {
                        return Status::TimedOut;
                    }
                }
                // ll_write already reset the bus
                Status::TimedOut => return Status::TimedOut,
            }
        }

        warn!("{:#04x} not acknowledged after {} attempt(s)", raw_addr, attempts);
        let _ = self.stop(false);
        Status::TimedOut
    }

    pub fn start(&mut self, address: u8, mode: Mode) -> Status {
        self.ll_start(address::raw_address(address, mode))
    }

    pub fn repeated_start(&mut self, address: u8, mode: Mode) -> Status {
        self.ll_repeated_start(address::raw_address(address, mode))
    }

    pub fn start_wait(&mut self, address: u8, mode: Mode) -> Status {
        self.ll_start_wait(address::raw_address(address, mode))
    }

    pub fn start_read(&mut self, address: u8) -> Status {
        self.start(address, Mode::Read)
    }

    pub fn start_write(&mut self, address: u8) -> Status {
        self.start(address, Mode::Write)
    }

    pub fn repeated_start_read(&mut self, address: u8) -> Status {
        self.repeated_start(address, Mode::Read)
    }

    pub fn repeated_start_write(&mut self, address: u8) -> Status {
        self.repeated_start(address, Mode::Write)
    }

    pub fn start_read_wait(&mut self, address: u8) -> Status {
        self.start_wait(address, Mode::Read)
    }

    pub fn start_write_wait(&mut self, address: u8) -> Status {
        self.start_wait(address, Mode::Write)
    }

    /// Shifts out `data` MSB first and returns the slave's acknowledge.
    pub fn ll_write(&mut self, data: u8) -> Status {
        let timeout = Timeout::start(self.config.timeout);

        for bit in (0..8).rev() {
            self.lines.scl_low();
            if (data >> bit) & 0x1 == 1 {
                self.lines.sda_high();
            } else {
                self.lines.sda_low();
            }
            self.wait();

            self.lines.scl_high();
            self.wait();

            if timeout.is_expired() {
                warn!("Timed out writing {:#04x}, resetting bus", data);
                let _ = self.stop(false);
                return Status::TimedOut;
            }
        }

        // let the slave drive the acknowledge bit
        self.lines.scl_low();
        self.lines.sda_high();
        self.wait();

        if !self.scl_high_and_stretch(&timeout) {
            warn!("Timed out waiting for ack of {:#04x}", data);
            return Status::TimedOut;
        }

        let status = if self.lines.read_sda() { Status::Nack } else { Status::Ack };
        self.wait();

        self.lines.scl_low();

        trace!("Wrote {:#04x}: {}", data, status);
        status
    }

    /// Shifts in one byte MSB first, then acknowledges it if `send_ack`.
    ///
    /// The last byte of a read must be NACKed so that the slave releases SDA.
    pub fn ll_read(&mut self, data: &mut u8, send_ack: bool) -> Status {
        let timeout = Timeout::start(self.config.timeout);
        let mut byte = 0u8;

        for _ in 0..8 {
            self.lines.scl_low();
            self.lines.sda_high();
            self.wait();

            if !self.scl_high_and_stretch(&timeout) {
                warn!("Timed out reading byte, resetting bus");
                return Status::TimedOut;
            }
            self.wait();

            byte = (byte << 1) | self.lines.read_sda() as u8;
        }
        *data = byte;

        self.lines.scl_low();
        if send_ack {
            self.lines.sda_low();
        } else {
            self.lines.sda_high();
        }
        self.wait();

        if !self.scl_high_and_stretch(&timeout) {
            warn!("Timed out sending {} for {:#04x}", if send_ack { "ack" } else { "nack" }, byte);
            return Status::TimedOut;
        }
        self.wait();

        self.lines.scl_low();

        trace!("Read {:#04x}, sent {}", byte, if send_ack { "ack" } else { "nack" });
        Status::Ack
    }

    pub fn read_then_ack(&mut self, data: &mut u8) -> Status {
        self.ll_read(data, true)
    }

    pub fn read_then_nack(&mut self, data: &mut u8) -> Status {
        self.ll_read(data, false)
    }

    /// Releases SCL and waits for it to actually rise, since a slave may
    /// hold it low. On timeout the bus is reset and `false` returned.
    fn scl_high_and_stretch(&mut self, timeout: &Timeout) -> bool {
        self.lines.scl_high();

        let lines = &mut self.lines;
        if timeout.poll_until(|| lines.read_scl()) {
            return true;
        }

        let _ = self.stop(false);
        false
    }

    fn wait(&self) {
        delay(self.config.delay);
    }

    fn check_initialized(&self) {
        if !self.initialized {
            warn!("Bus used before begin() on sda {} / scl {}", self.config.sda, self.config.scl);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lines::sim::{LineAction, SimDevice, SimulatedBus};

    fn wire(device: SimDevice) -> SoftWire<SimulatedBus> {
        let mut wire = SoftWire::with_lines(2, 3, SimulatedBus::new(device));
        wire.set_delay(Duration::from_secs(0));
        wire.set_timeout(Duration::from_millis(20));
        wire.begin().unwrap();
        wire.lines_mut().clear();
        wire
    }

    #[test]
    fn stop_sequence() {
        let mut wire = wire(SimDevice::absent());
        assert_eq!(wire.stop(true), Status::Ack);

        assert_eq!(wire.lines().actions(), &[
            LineAction::SclLow,
            LineAction::SdaLow,
            LineAction::SclHigh,
            LineAction::SdaHigh,
        ]);
    }

    #[test]
    fn begin_attaches_configuration() {
        let mut wire = SoftWire::with_lines(17, 27, SimulatedBus::new(SimDevice::absent()));
        wire.enable_pullups(true);
        wire.begin().unwrap();

        let attached = wire.lines().attached().unwrap();
        assert_eq!((attached.sda, attached.scl, attached.pullups), (17, 27, true));
    }

    #[test]
    fn set_line_requires_begin() {
        let mut wire = wire(SimDevice::absent());
        assert!(wire.initialized);

        wire.set_scl(4);
        assert!(!wire.initialized);
        assert_eq!(wire.scl(), 4);
    }

    #[test]
    fn write_leaves_clock_low() {
        let mut wire = wire(SimDevice::new(0x20));
        assert_eq!(wire.start_write(0x20), Status::Ack);
        assert_eq!(wire.lines().actions().last(), Some(&LineAction::SclLow));

        assert_eq!(wire.ll_write(0x55), Status::Ack);
        assert_eq!(wire.lines().actions().last(), Some(&LineAction::SclLow));
        assert!(!wire.lines().scl());
    }

    #[test]
    fn write_to_absent_device_is_nack_with_clock_low() {
        let mut wire = wire(SimDevice::absent());
        assert_eq!(wire.start_write(0x20), Status::Nack);
        assert_eq!(wire.lines().actions().last(), Some(&LineAction::SclLow));
    }

    #[test]
    fn end_releases_lines() {
        let mut wire = wire(SimDevice::absent());
        wire.end();
        assert!(wire.lines().attached().is_none());
        assert!(wire.lines().sda());
        assert!(wire.lines().scl());
    }
}
