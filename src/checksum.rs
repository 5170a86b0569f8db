/// Internet checksum (RFC 1071) over `data`.
///
/// Words are read in network byte order. An odd trailing byte is treated as
/// the high-order byte of a final word whose low-order byte is zero. Writing
/// the result into a zeroed checksum field makes a second pass over the same
/// buffer return zero.
pub fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut words = data.chunks_exact(2);
    for word in &mut words {
        // folding per word keeps the sum within 17 bits for any length
        sum = fold(sum + u32::from(u16::from_be_bytes([word[0], word[1]])));
    }
    if let [last] = words.remainder() {
        sum += u32::from(u16::from_be_bytes([*last, 0]));
    }
    while sum >> 16 != 0 {
        sum = fold(sum);
    }
    #[allow(clippy::cast_possible_truncation)] // folded into 16 bits above
    let folded = sum as u16;
    !folded
}

fn fold(sum: u32) -> u32 {
    (sum & 0xFFFF) + (sum >> 16)
}
