use bit_layer::Mode;

/// First and last address of the 7-bit range that is not reserved.
pub const FIRST_ADDRESS: u8 = 0b0000_1000;
pub const LAST_ADDRESS: u8 = 0b0111_0111;

/// Address byte sent after START: the 7-bit address with the rw bit in bit 0.
pub fn raw_address(address: u8, mode: Mode) -> u8 {
    (address << 1) | mode as u8
}

/// Splits a raw address byte back into address and rw bit.
pub fn split_address_and_rw(address_and_rw: u8) -> (u8, Mode) {
    (address_and_rw >> 1, Mode::from(address_and_rw & 0x1))
}

/// Whether `address` is a 7-bit address a regular device may use.
///
/// 0x00-0x07 (general call, CBUS, HS-mode and friends) and 0x78-0x7f
/// (10-bit addressing, device id) are reserved.
pub fn validate_address_7b(address: u8) -> bool {
    match address {
        FIRST_ADDRESS..=LAST_ADDRESS => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_address_for_every_address() {
        for address in 0..0x80u8 {
            assert_eq!(raw_address(address, Mode::Write), address << 1);
            assert_eq!(raw_address(address, Mode::Read), (address << 1) | 1);
        }
    }

    #[test]
    fn raw_address_splits_back() {
        assert_eq!(split_address_and_rw(0xa1), (0x50, Mode::Read));
        assert_eq!(split_address_and_rw(0xa0), (0x50, Mode::Write));
    }

    #[test]
    fn reserved_addresses() {
        assert!(!validate_address_7b(0x00));
        assert!(!validate_address_7b(0x07));
        assert!(validate_address_7b(0x08));
        assert!(validate_address_7b(0x55));
        assert!(validate_address_7b(0x77));
        assert!(!validate_address_7b(0x78));
        assert!(!validate_address_7b(0x80));
    }
}
