//! Bit-banged I2C/SMBus master.
//!
//! Drives an open-drain clock line and data line through a pluggable
//! [`LineInterface`](lines/trait.LineInterface.html) to talk to slave devices
//! without a hardware I2C peripheral. The low-level primitives live on
//! [`SoftWire`](bit_layer/struct.SoftWire.html); the buffered
//! `begin_transmission`/`end_transmission`/`request_from` API sits on top of
//! them in the `transaction` module.

#[macro_use]
extern crate log;
extern crate critical_section;
extern crate rppal;

pub mod address;
pub mod bit_layer;
pub mod lines;
pub mod pec;
pub mod transaction;

pub use bit_layer::{BusConfig, Error, Mode, SoftWire, Status, Timeout};
pub use lines::LineInterface;
pub use lines::gpio::GpioLines;
pub use lines::sim::{BusEvent, LineAction, SimDevice, SimulatedBus};
pub use transaction::TransmissionStatus;
