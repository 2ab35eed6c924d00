//! RFC 4648 base32 for OTP secrets.
//!
//! Decoding is deliberately forgiving about how humans transcribe secrets:
//! whitespace, `-` and `=` are skipped, lowercase is accepted, and the
//! look-alike digits `0`, `1` and `8` are read as `O`, `L` and `B`.
//! Encoding is strict, unpadded RFC 4648.

use crate::otp::types::{OtpError, OtpErrorKind};
use thiserror::Error;

/// Why a base32 string could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid base32 character {character:?} at position {position}")]
    InvalidCharacter { character: char, position: usize },
}

impl From<DecodeError> for OtpError {
    fn from(e: DecodeError) -> Self {
        OtpError::new(OtpErrorKind::SecretDecode, "base32 decoding of secret failed")
            .with_detail(e.to_string())
    }
}

/// Number of whole bytes carried by `n_symbols` base32 symbols.
pub fn decoded_len(n_symbols: usize) -> usize {
    n_symbols * 5 / 8
}

/// Decode a base32 secret into raw bytes.
///
/// Bits are packed most-significant first; trailing bits that do not
/// complete a byte are dropped.
pub fn decode(text: &str) -> Result<Vec<u8>, DecodeError> {
    // sized from the raw length; skipped characters only leave slack
    let mut out = Vec::with_capacity(decoded_len(text.len()));
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for (position, ch) in text.chars().enumerate() {
        if is_skipped(ch) {
            continue;
        }
        let value = symbol_value(ch).ok_or(DecodeError::InvalidCharacter {
            character: ch,
            position,
        })?;

        buffer = (buffer << 5) | u32::from(value);
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }
    Ok(out)
}

/// Encode raw bytes to base32 (uppercase, no padding).
pub fn encode(bytes: &[u8]) -> String {
    ::base32::encode(::base32::Alphabet::Rfc4648 { padding: false }, bytes)
}

/// Check if a string decodes to at least one byte.
pub fn is_valid(text: &str) -> bool {
    matches!(decode(text), Ok(bytes) if !bytes.is_empty())
}

fn is_skipped(ch: char) -> bool {
    ch.is_ascii_whitespace() || ch == '-' || ch == '='
}

fn symbol_value(ch: char) -> Option<u8> {
    // commonly mistyped characters
    let ch = match ch {
        '0' => 'O',
        '1' => 'L',
        '8' => 'B',
        other => other,
    };
    match ch {
        'A'..='Z' => Some(ch as u8 - b'A'),
        'a'..='z' => Some(ch as u8 - b'a'),
        '2'..='7' => Some(ch as u8 - b'2' + 26),
        _ => None,
    }
}
