//! SMBus packet error code: CRC-8 with polynomial x^8 + x^2 + x + 1.

const POLYNOMIAL: u16 = 0x107;

/// Folds `data` into the running `crc`.
pub fn crc8_update(crc: u8, data: u8) -> u8 {
    let mut crc = (crc ^ data) as u16;
    for _ in 0..8 {
        crc = if crc & 0x80 != 0 { (crc << 1) ^ POLYNOMIAL } else { crc << 1 };
    }

    crc as u8
}

/// CRC-8 of `data`, starting from 0 as SMBus does.
///
/// For a PEC, `data` covers every byte of the transfer including the raw
/// address bytes.
pub fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(0, |crc, &byte| crc8_update(crc, byte))
}
