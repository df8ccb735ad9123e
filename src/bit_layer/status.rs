use std::fmt;

/// Outcome of every bus primitive.
///
/// `Ack` means the receiving side pulled SDA low during the acknowledge
/// clock pulse. `TimedOut` is only reported after the driver has issued a
/// STOP to bring the bus back to idle.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Ack = 0,
    Nack = 1,
    TimedOut = 2,
}

impl Status {
    pub fn is_ack(self) -> bool {
        self == Status::Ack
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Status::Ack => "ack",
            Status::Nack => "nack",
            Status::TimedOut => "timed out",
        })
    }
}
