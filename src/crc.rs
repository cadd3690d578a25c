//! 8-bit frame checksum, polynomial 0x07, MSB first.

/// Feeds one byte into a running CRC-8 accumulator.
///
/// The frame checksum is the fold of this function over LENGTH, TYPE,
/// MESSAGE_ID and each payload byte in order, starting from 0. The fold is
/// order-sensitive, so swapped bytes are detected as well as flipped bits.
pub fn crc8_update(crc: u8, data: u8) -> u8 {
    let mut crc = crc ^ data;
    for _ in 0..8 {
        crc = if crc & 0x80 != 0 {
            (crc << 1) ^ 0x07
        } else {
            crc << 1
        };
    }
    crc
}
