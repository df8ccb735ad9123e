use std::convert;
use std::fmt;

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            &Mode::Write => f.write_str("write"),
            &Mode::Read => f.write_str("read"),
        }
    }
}

/// Direction bit sent in bit 0 of the address byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Write = 0,
    Read = 1,
}

impl convert::From<u8> for Mode {
    fn from(value: u8) -> Self {
        match value {
            0 => Mode::Write,
            1 => Mode::Read,
            _ => {
                warn!("Unexpected value {:b} for rw bit, using bit 0", value);
                Mode::from(value & 0x1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Mode;

    #[test]
    fn rw_bit_values() {
        assert_eq!(Mode::Write as u8, 0);
        assert_eq!(Mode::Read as u8, 1);
        assert_eq!(Mode::from(0), Mode::Write);
        assert_eq!(Mode::from(1), Mode::Read);
        assert_eq!(Mode::from(0b11), Mode::Read);
    }
}
