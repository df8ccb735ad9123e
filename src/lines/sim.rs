//! A two-line bus simulated in memory, with one scriptable slave on it.
//!
//! Both lines are the wired-AND of what the master (the driver under test)
//! and the slave drive. Every master action is recorded, and the line levels
//! are decoded into START, STOP and byte events the way a logic analyzer
//! would see them.

use super::LineInterface;
use address;
use bit_layer::{BusConfig, Error, Mode};

/// One call the driver made on the line interface.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LineAction {
    SdaLow,
    SdaHigh,
    SclLow,
    SclHigh,
}

/// What happened on the bus, decoded from the line levels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BusEvent {
    /// SDA fell while SCL was high. `repeated` when no STOP came before it.
    Start { repeated: bool },
    /// SDA rose while SCL was high.
    Stop,
    /// Address byte sent by the master and whether the slave acknowledged it.
    Address { raw: u8, acked: bool },
    /// Data byte sent by the master and whether the slave acknowledged it.
    Written { byte: u8, acked: bool },
    /// Data byte sent by the slave and whether the master acknowledged it.
    Read { byte: u8, acked: bool },
}

/// Behavior of the simulated slave.
#[derive(Clone, Debug)]
pub struct SimDevice {
    /// 7-bit address the slave answers to. `None` leaves the bus empty.
    pub address: Option<u8>,
    /// Bytes served on reads, repeated cyclically.
    pub read_data: Vec<u8>,
    /// Index of the written data byte (counted over the whole simulation)
    /// that gets NACKed.
    pub nack_write_at: Option<usize>,
    /// The address is NACKed this many times before it is acknowledged.
    pub busy_for: usize,
    /// Polls of SCL during which the slave holds the clock low on every
    /// pulse the master is expected to wait for.
    pub stretch_polls: usize,
    /// The slave holds SCL low forever.
    pub scl_stuck_low: bool,
}

impl SimDevice {
    pub fn new(address: u8) -> Self {
        SimDevice {
            address: Some(address),
            read_data: vec![0xff],
            nack_write_at: None,
            busy_for: 0,
            stretch_polls: 0,
            scl_stuck_low: false,
        }
    }

    /// A bus without any slave on it.
    pub fn absent() -> Self {
        SimDevice {
            address: None,
            ..SimDevice::new(0)
        }
    }

    pub fn with_read_data(mut self, data: &[u8]) -> Self {
        self.read_data = data.to_vec();
        self
    }

    pub fn nack_write_at(mut self, index: usize) -> Self {
        self.nack_write_at = Some(index);
        self
    }

    pub fn busy_for(mut self, attempts: usize) -> Self {
        self.busy_for = attempts;
        self
    }

    pub fn stretch(mut self, polls: usize) -> Self {
        self.stretch_polls = polls;
        self
    }

    pub fn stuck_low(mut self) -> Self {
        self.scl_stuck_low = true;
        self
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Address,
    Receive,
    Transmit,
    /// Not addressed, or done transmitting; waits for START or STOP.
    Ignore,
}

#[derive(Debug)]
pub struct SimulatedBus {
    device: SimDevice,
    config: Option<BusConfig>,

    master_sda: bool,
    master_scl: bool,
    slave_sda: bool,
    /// Remaining polls the slave keeps holding SCL low.
    hold: usize,

    phase: Phase,
    in_transfer: bool,
    /// Clock pulses seen in the current byte, 9th is the acknowledge.
    pulse: u8,
    shift: u8,
    ack: bool,
    next_phase: Phase,
    read_index: usize,

    actions: Vec<LineAction>,
    events: Vec<BusEvent>,
    written: Vec<u8>,
    scl_reads: usize,
}

impl SimulatedBus {
    pub fn new(device: SimDevice) -> Self {
        SimulatedBus {
            device,
            config: None,
            master_sda: true,
            master_scl: true,
            slave_sda: true,
            hold: 0,
            phase: Phase::Idle,
            in_transfer: false,
            pulse: 0,
            shift: 0,
            ack: false,
            next_phase: Phase::Ignore,
            read_index: 0,
            actions: Vec::new(),
            events: Vec::new(),
            written: Vec::new(),
            scl_reads: 0,
        }
    }

    pub fn device(&self) -> &SimDevice {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut SimDevice {
        &mut self.device
    }

    /// Configuration passed to the last `attach`, if any.
    pub fn attached(&self) -> Option<&BusConfig> {
        self.config.as_ref()
    }

    pub fn actions(&self) -> &[LineAction] {
        &self.actions
    }

    pub fn events(&self) -> &[BusEvent] {
        &self.events
    }

    /// Data bytes the slave received, acknowledged or not.
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    pub fn scl_reads(&self) -> usize {
        self.scl_reads
    }

    pub fn clear(&mut self) {
        self.actions.clear();
        self.events.clear();
        self.written.clear();
        self.scl_reads = 0;
    }

    pub fn sda(&self) -> bool {
        self.master_sda && self.slave_sda
    }

    pub fn scl(&self) -> bool {
        self.master_scl && self.hold == 0 && !self.device.scl_stuck_low
    }

    fn set_sda(&mut self, value: bool) {
        let before = self.sda();
        self.master_sda = value;
        let after = self.sda();

        if self.scl() && before != after {
            if after {
                self.on_stop();
            } else {
                self.on_start();
            }
        }
    }

    fn set_scl(&mut self, value: bool) {
        if !value && self.hold > 0 && self.master_scl {
            // the master did not wait for the stretched clock
            self.hold = 0;
            self.on_scl_rise();
        }

        let before = self.scl();
        let stretch = value && !self.master_scl && self.stretching();
        self.master_scl = value;
        if stretch {
            self.hold = self.device.stretch_polls;
        }

        let after = self.scl();
        if before != after {
            if after {
                self.on_scl_rise();
            } else {
                self.on_scl_fall();
            }
        }
    }

    fn stretching(&self) -> bool {
        let waited_on = match self.phase {
            Phase::Transmit => true,
            Phase::Address | Phase::Receive => self.pulse == 8,
            Phase::Idle | Phase::Ignore => false,
        };

        waited_on && self.device.stretch_polls > 0
    }

    fn on_start(&mut self) {
        let repeated = self.in_transfer;
        self.events.push(BusEvent::Start { repeated });
        self.in_transfer = true;
        self.phase = Phase::Address;
        self.pulse = 0;
        self.shift = 0;
        self.slave_sda = true;
    }

    fn on_stop(&mut self) {
        self.events.push(BusEvent::Stop);
        self.in_transfer = false;
        self.phase = Phase::Idle;
        self.pulse = 0;
        self.slave_sda = true;
    }

    fn on_scl_rise(&mut self) {
        match self.phase {
            Phase::Address | Phase::Receive => {
                self.pulse += 1;
                if self.pulse <= 8 {
                    self.shift = (self.shift << 1) | self.sda() as u8;
                }
                if self.pulse == 8 {
                    self.byte_received();
                }
            }
            Phase::Transmit => {
                self.pulse += 1;
                if self.pulse == 9 {
                    let acked = !self.sda();
                    let byte = self.current_read_byte();
                    self.events.push(BusEvent::Read { byte, acked });
                    self.read_index += 1;
                    self.ack = acked;
                }
            }
            Phase::Idle | Phase::Ignore => {}
        }
    }

    fn on_scl_fall(&mut self) {
        match self.phase {
            Phase::Address | Phase::Receive => {
                if self.pulse == 8 {
                    self.slave_sda = !self.ack;
                } else if self.pulse == 9 {
                    self.slave_sda = true;
                    self.pulse = 0;
                    self.shift = 0;
                    self.phase = self.next_phase;
                    if self.phase == Phase::Transmit {
                        self.drive_read_bit();
                    }
                }
            }
            Phase::Transmit => {
                if self.pulse < 8 {
                    self.drive_read_bit();
                } else if self.pulse == 8 {
                    self.slave_sda = true;
                } else {
                    self.pulse = 0;
                    if self.ack {
                        self.drive_read_bit();
                    } else {
                        self.phase = Phase::Ignore;
                        self.slave_sda = true;
                    }
                }
            }
            Phase::Idle | Phase::Ignore => {}
        }
    }

    fn byte_received(&mut self) {
        let byte = self.shift;

        if self.phase == Phase::Address {
            let (address, mode) = address::split_address_and_rw(byte);
            let matched = self.device.address == Some(address);
            self.ack = matched && self.device.busy_for == 0;
            if matched && self.device.busy_for > 0 {
                self.device.busy_for -= 1;
            }
            self.next_phase = match (self.ack, mode) {
                (false, _) => Phase::Ignore,
                (true, Mode::Write) => Phase::Receive,
                (true, Mode::Read) => Phase::Transmit,
            };
            self.events.push(BusEvent::Address { raw: byte, acked: self.ack });
        } else {
            self.ack = self.device.nack_write_at != Some(self.written.len());
            self.next_phase = if self.ack { Phase::Receive } else { Phase::Ignore };
            self.written.push(byte);
            self.events.push(BusEvent::Written { byte, acked: self.ack });
        }
    }

    fn current_read_byte(&self) -> u8 {
        if self.device.read_data.is_empty() {
            0xff
        } else {
            self.device.read_data[self.read_index % self.device.read_data.len()]
        }
    }

    /// Puts the next outgoing bit on SDA while SCL is low.
    fn drive_read_bit(&mut self) {
        let bit = 7 - self.pulse;
        self.slave_sda = (self.current_read_byte() >> bit) & 0x1 == 1;
    }
}

impl LineInterface for SimulatedBus {
    fn attach(&mut self, config: &BusConfig) -> Result<(), Error> {
        self.config = Some(config.clone());
        Ok(())
    }

    fn detach(&mut self) {
        self.set_sda(true);
        self.set_scl(true);
        self.config = None;
    }

    fn sda_low(&mut self) {
        self.actions.push(LineAction::SdaLow);
        self.set_sda(false);
    }

    fn sda_high(&mut self) {
        self.actions.push(LineAction::SdaHigh);
        self.set_sda(true);
    }

    fn scl_low(&mut self) {
        self.actions.push(LineAction::SclLow);
        self.set_scl(false);
    }

    fn scl_high(&mut self) {
        self.actions.push(LineAction::SclHigh);
        self.set_scl(true);
    }

    fn read_sda(&mut self) -> bool {
        self.sda()
    }

    fn read_scl(&mut self) -> bool {
        self.scl_reads += 1;
        if self.hold > 0 && self.master_scl {
            self.hold -= 1;
            if self.hold == 0 {
                self.on_scl_rise();
            }
        }
        self.scl()
    }
}
