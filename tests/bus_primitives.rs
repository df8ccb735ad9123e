extern crate softwire;

use std::time::{Duration, Instant};

use softwire::{BusEvent, LineAction, Mode, SimDevice, SimulatedBus, SoftWire, Status};

const TIMEOUT: Duration = Duration::from_millis(25);

fn wire(device: SimDevice) -> SoftWire<SimulatedBus> {
    let mut wire = SoftWire::with_lines(2, 3, SimulatedBus::new(device));
    wire.set_delay(Duration::from_secs(0));
    wire.set_timeout(TIMEOUT);
    wire.begin().unwrap();
    wire.lines_mut().clear();
    wire
}

fn ends_with_stop(actions: &[LineAction]) -> bool {
    actions.ends_with(&[
        LineAction::SclLow,
        LineAction::SdaLow,
        LineAction::SclHigh,
        LineAction::SdaHigh,
    ])
}

#[test]
fn begin_idles_the_bus() {
    let mut wire = SoftWire::with_lines(2, 3, SimulatedBus::new(SimDevice::absent()));
    wire.begin().unwrap();

    assert!(wire.lines().sda());
    assert!(wire.lines().scl());
    assert!(ends_with_stop(wire.lines().actions()));
}

#[test]
fn begin_on_stuck_bus_still_succeeds() {
    let mut wire = SoftWire::with_lines(2, 3, SimulatedBus::new(SimDevice::new(0x3c).stuck_low()));
    wire.set_delay(Duration::from_secs(0));
    wire.set_timeout(TIMEOUT);

    let started = Instant::now();
    assert!(wire.begin().is_ok());
    assert!(started.elapsed() < TIMEOUT + TIMEOUT / 2);
    assert!(ends_with_stop(wire.lines().actions()));
    assert!(wire.lines().sda());
}

#[test]
fn start_sends_address_and_direction() {
    let mut wire = wire(SimDevice::new(0x3c));
    assert_eq!(wire.start(0x3c, Mode::Read), Status::Ack);

    assert_eq!(wire.lines().events(), &[
        BusEvent::Start { repeated: false },
        BusEvent::Address { raw: 0x79, acked: true },
    ]);
    assert_eq!(&wire.lines().actions()[..2], &[LineAction::SdaLow, LineAction::SclLow]);
}

#[test]
fn start_to_missing_device_is_nack() {
    let mut wire = wire(SimDevice::new(0x3c));
    assert_eq!(wire.start_write(0x3d), Status::Nack);
    assert_eq!(wire.stop(true), Status::Ack);

    assert_eq!(wire.lines().events(), &[
        BusEvent::Start { repeated: false },
        BusEvent::Address { raw: 0x7a, acked: false },
        BusEvent::Stop,
    ]);
}

#[test]
fn write_is_msb_first() {
    let mut wire = wire(SimDevice::new(0x3c));
    assert_eq!(wire.start_write(0x3c), Status::Ack);
    wire.lines_mut().clear();

    assert_eq!(wire.ll_write(0b1000_0001), Status::Ack);

    let data: Vec<LineAction> = wire.lines().actions().iter()
        .cloned()
        .filter(|action| *action == LineAction::SdaLow || *action == LineAction::SdaHigh)
        .collect();
    assert_eq!(&data[..8], &[
        LineAction::SdaHigh,
        LineAction::SdaLow,
        LineAction::SdaLow,
        LineAction::SdaLow,
        LineAction::SdaLow,
        LineAction::SdaLow,
        LineAction::SdaLow,
        LineAction::SdaHigh,
    ]);
    // SDA released for the acknowledge
    assert_eq!(data[8], LineAction::SdaHigh);
    assert_eq!(wire.lines().written(), &[0b1000_0001]);
}

#[test]
fn write_leaves_clock_low_on_nack() {
    let mut wire = wire(SimDevice::new(0x3c).nack_write_at(0));
    assert_eq!(wire.start_write(0x3c), Status::Ack);

    assert_eq!(wire.ll_write(0x12), Status::Nack);
    assert_eq!(wire.lines().actions().last(), Some(&LineAction::SclLow));
    assert!(!wire.lines().scl());
}

#[test]
fn read_acknowledges_as_asked() {
    let mut wire = wire(SimDevice::new(0x3c).with_read_data(&[0xa5, 0x0f]));
    assert_eq!(wire.start_read(0x3c), Status::Ack);

    let mut first = 0;
    let mut second = 0;
    assert_eq!(wire.read_then_ack(&mut first), Status::Ack);
    assert_eq!(wire.read_then_nack(&mut second), Status::Ack);
    assert_eq!(wire.lines().actions().last(), Some(&LineAction::SclLow));
    assert_eq!(wire.stop(true), Status::Ack);

    assert_eq!((first, second), (0xa5, 0x0f));
    assert_eq!(&wire.lines().events()[2..], &[
        BusEvent::Read { byte: 0xa5, acked: true },
        BusEvent::Read { byte: 0x0f, acked: false },
        BusEvent::Stop,
    ]);
}

#[test]
fn clock_stretching_is_waited_for() {
    let mut wire = wire(SimDevice::new(0x3c).stretch(50).with_read_data(&[0x81]));
    assert_eq!(wire.start_read(0x3c), Status::Ack);

    let mut byte = 0;
    assert_eq!(wire.read_then_nack(&mut byte), Status::Ack);
    assert_eq!(wire.stop(true), Status::Ack);

    assert_eq!(byte, 0x81);
    // address ack pulse plus 9 pulses of the read, each held for 50 polls
    assert!(wire.lines().scl_reads() >= 10 * 50);
}

#[test]
fn stuck_clock_times_out_and_stops() {
    let mut wire = wire(SimDevice::new(0x3c).stuck_low());

    let started = Instant::now();
    assert_eq!(wire.start_write(0x3c), Status::TimedOut);
    let elapsed = started.elapsed();

    assert!(elapsed >= TIMEOUT);
    assert!(elapsed < TIMEOUT + TIMEOUT / 2);
    assert!(ends_with_stop(wire.lines().actions()));
}

#[test]
fn stuck_clock_times_out_reads() {
    let mut wire = wire(SimDevice::new(0x3c));
    assert_eq!(wire.start_read(0x3c), Status::Ack);
    wire.lines_mut().device_mut().scl_stuck_low = true;

    let mut byte = 0;
    let started = Instant::now();
    assert_eq!(wire.read_then_ack(&mut byte), Status::TimedOut);

    assert!(started.elapsed() < TIMEOUT + TIMEOUT / 2);
    assert!(ends_with_stop(wire.lines().actions()));
}

#[test]
fn stop_times_out_on_stuck_clock() {
    let mut wire = wire(SimDevice::new(0x3c).stuck_low());
    assert_eq!(wire.stop(true), Status::TimedOut);
    assert!(ends_with_stop(wire.lines().actions()));

    wire.lines_mut().clear();
    assert_eq!(wire.stop(false), Status::Ack);
}

#[test]
fn repeated_start_has_no_stop_in_between() {
    let mut wire = wire(SimDevice::new(0x50).with_read_data(&[0x42]));
    assert_eq!(wire.start_write(0x50), Status::Ack);
    assert_eq!(wire.ll_write(0x10), Status::Ack);
    assert_eq!(wire.repeated_start_read(0x50), Status::Ack);

    let mut byte = 0;
    assert_eq!(wire.read_then_nack(&mut byte), Status::Ack);
    assert_eq!(wire.stop(true), Status::Ack);

    assert_eq!(byte, 0x42);
    assert_eq!(wire.lines().events(), &[
        BusEvent::Start { repeated: false },
        BusEvent::Address { raw: 0xa0, acked: true },
        BusEvent::Written { byte: 0x10, acked: true },
        BusEvent::Start { repeated: true },
        BusEvent::Address { raw: 0xa1, acked: true },
        BusEvent::Read { byte: 0x42, acked: false },
        BusEvent::Stop,
    ]);
}

#[test]
fn start_wait_polls_busy_device() {
    let mut wire = wire(SimDevice::new(0x50).busy_for(3));
    assert_eq!(wire.start_write_wait(0x50), Status::Ack);
    assert_eq!(wire.stop(true), Status::Ack);

    let events = wire.lines().events();
    let attempts = events.iter()
        .filter(|event| match **event {
            BusEvent::Address { .. } => true,
            _ => false,
        })
        .count();
    assert_eq!(attempts, 4);
    assert_eq!(events.iter().filter(|event| **event == BusEvent::Stop).count(), 4);
    assert_eq!(events[events.len() - 2], BusEvent::Address { raw: 0xa0, acked: true });
}

#[test]
fn start_wait_gives_up() {
    let mut wire = wire(SimDevice::absent());

    let started = Instant::now();
    assert_eq!(wire.start_wait(0x50, Mode::Read), Status::TimedOut);
    let elapsed = started.elapsed();

    assert!(elapsed >= TIMEOUT);
    assert!(elapsed < TIMEOUT + TIMEOUT / 2);
    assert_eq!(wire.lines().events().last(), Some(&BusEvent::Stop));
}

#[test]
fn start_wait_stops_on_stuck_clock() {
    let mut wire = wire(SimDevice::new(0x50).stuck_low());

    let started = Instant::now();
    assert_eq!(wire.start_write_wait(0x50), Status::TimedOut);
    let elapsed = started.elapsed();

    // one timed-out wait, not a second one for the recovery STOP
    assert!(elapsed >= TIMEOUT);
    assert!(elapsed < TIMEOUT + TIMEOUT / 2);
    assert!(ends_with_stop(wire.lines().actions()));
}

#[test]
fn start_wait_with_zero_timeout_still_stops() {
    let mut wire = wire(SimDevice::new(0x50));
    wire.set_timeout(Duration::from_secs(0));

    assert_eq!(wire.start_write_wait(0x50), Status::TimedOut);
    assert!(ends_with_stop(wire.lines().actions()));
    assert!(wire.lines().sda());
    assert!(wire.lines().scl());
}
