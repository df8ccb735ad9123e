use std::{error, fmt, convert};
use rppal::gpio;

#[derive(Debug)]
pub enum Error {
    Gpio(gpio::Error),
    InvalidAddress(u8),
    Generic(String),
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Gpio(ref e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Gpio(ref e) => write!(f, "PinError: {}", e),
            Error::InvalidAddress(address) => {
                write!(f, "Invalid 7-bit I²C address: {:#04x}", address)
            }
            Error::Generic(ref descr) => f.write_str(descr),
        }
    }
}

impl convert::From<gpio::Error> for Error {
    fn from(prev: gpio::Error) -> Self {
        Error::Gpio(prev)
    }
}
