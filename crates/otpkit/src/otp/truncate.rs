//! Dynamic truncation per RFC 4226 §5.3, and reduction to decimal digits.

/// Extract a 31-bit value from an HMAC digest.
///
/// The offset is the low nibble of the last byte, so it lies in `[0, 15]`.
/// The four-byte window is read modulo the digest length. RFC 4226 was
/// written against SHA-1's 20-byte output, where the window always fits;
/// the wrap-around is an intentional compatibility extension that keeps
/// any digest of at least one byte well-defined, and must be kept as is.
///
/// Returns `None` for an empty digest.
pub fn dynamic_truncate(digest: &[u8]) -> Option<u32> {
    let len = digest.len();
    let offset = (digest.last()? & 0x0f) as usize;
    let mut value = u32::from(digest[offset % len] & 0x7f);
    for k in 1..4 {
        value = (value << 8) | u32::from(digest[(offset + k) % len]);
    }
    Some(value)
}

/// Reduce a truncated value to `digits` decimal digits (`digits <= 9`).
///
/// The result is numeric; leading zeros are a presentation concern.
pub fn decimal_code(value: u32, digits: u32) -> u32 {
    value % 10u32.pow(digits)
}
