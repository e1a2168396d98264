/// CRC-8 with polynomial 0x31 and initial value 0xFF, as used by the
/// Aosong/Sensirion family of humidity sensors.
pub fn crc8(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0xFF, |crc, &byte| {
        (0..8).fold(crc ^ byte, |crc, _| {
            if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            }
        })
    })
}

/// Pads or truncates `text` to exactly `width` characters.
pub fn fit(text: &str, width: usize) -> String {
    format!("{:<width$.width$}", text, width = width)
}

/// Centers `text` in `width` characters, truncating when it doesn't fit.
pub fn center(text: &str, width: usize) -> String {
    format!("{:^width$.width$}", text, width = width)
}
