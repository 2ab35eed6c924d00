//! Core OTP generation — RFC 4226 (HOTP) and RFC 6238 (TOTP).
//!
//! One parameterised engine serves every algorithm. Each call decodes the
//! secret afresh, prepares a key of the algorithm's canonical size, hashes
//! the big-endian counter and truncates the digest. Nothing is cached
//! between calls.

use crate::otp::base32;
use crate::otp::diagnostics::{Diagnostic, DiagnosticSink, LogSink};
use crate::otp::keyed_hash;
use crate::otp::truncate::{decimal_code, dynamic_truncate};
use crate::otp::types::*;
use crate::otp::uri::OtpAuthUri;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Engine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// HOTP/TOTP generator reporting warnings to an injected sink.
#[derive(Clone, Copy)]
pub struct OtpEngine<'a> {
    sink: &'a dyn DiagnosticSink,
}

impl Default for OtpEngine<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl OtpEngine<'static> {
    /// Engine that reports through [`LogSink`].
    pub fn new() -> Self {
        Self { sink: &LogSink }
    }
}

impl<'a> OtpEngine<'a> {
    pub fn with_sink(sink: &'a dyn DiagnosticSink) -> Self {
        Self { sink }
    }

    /// Generate an HOTP code for `counter`.
    pub fn hotp(
        &self,
        secret_b32: &str,
        digits: u32,
        counter: u64,
        algorithm: Algorithm,
    ) -> Result<u32, OtpError> {
        check_digits(digits)?;
        keyed_hash::init()?;

        let spec = keyed_hash::spec(algorithm);
        let key = self.prepare_key(base32::decode(secret_b32)?, spec);
        let digest = spec.hmac(&key, &counter.to_be_bytes())?;
        let value = dynamic_truncate(&digest).ok_or_else(|| {
            OtpError::new(OtpErrorKind::HashInit, "HMAC produced an empty digest")
        })?;
        Ok(decimal_code(value, digits))
    }

    /// Generate a TOTP code.
    pub fn totp(
        &self,
        secret_b32: &str,
        params: &TotpParams,
        time: TimeSource,
    ) -> Result<u32, OtpError> {
        check_period(params.period)?;
        let counter = match time {
            TimeSource::Now => time_step_at(current_unix_time(), params.t0, params.period)?,
            TimeSource::At(unix_seconds) => time_step_at(unix_seconds, params.t0, params.period)?,
            TimeSource::Counter(counter) => counter,
        };
        log::debug!("TOTP counter {} ({:?})", counter, time);
        self.hotp(secret_b32, params.digits, counter, params.algorithm)
    }

    /// Zero-pad or truncate the decoded secret to the algorithm's key size.
    fn prepare_key(&self, mut key: Vec<u8>, spec: &keyed_hash::HashSpec) -> Vec<u8> {
        let (actual, expected) = (key.len(), spec.key_len);
        if actual < expected {
            self.sink.report(&Diagnostic::ShortKey {
                algorithm: spec.algorithm,
                actual,
                expected,
            });
        } else if actual > expected {
            self.sink.report(&Diagnostic::LongKey {
                algorithm: spec.algorithm,
                actual,
                expected,
            });
        }
        key.resize(expected, 0);
        key
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Free functions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Generate an HOTP code from a base-32 secret.
pub fn generate_hotp(
    secret_b32: &str,
    digits: u32,
    counter: u64,
    algorithm: Algorithm,
) -> Result<u32, OtpError> {
    OtpEngine::new().hotp(secret_b32, digits, counter, algorithm)
}

/// Generate a TOTP code from a base-32 secret.
pub fn generate_totp(
    secret_b32: &str,
    digits: u32,
    period: u32,
    t0: i64,
    algorithm: Algorithm,
    time: TimeSource,
) -> Result<u32, OtpError> {
    let params = TotpParams {
        digits,
        period,
        t0,
        algorithm,
    };
    OtpEngine::new().totp(secret_b32, &params, time)
}

/// TOTP counter for a unix timestamp: `floor((unix_seconds + t0) / period)`.
pub fn time_step_at(unix_seconds: i64, t0: i64, period: u32) -> Result<u64, OtpError> {
    check_period(period)?;
    let shifted = i128::from(unix_seconds) + i128::from(t0);
    if shifted < 0 {
        return Err(OtpError::new(
            OtpErrorKind::NegativeTimestamp,
            "invalid shift value - would result in a negative timestamp",
        )
        .with_detail(format!("{} + {}", unix_seconds, t0)));
    }
    // the sum of two i64 values always fits in u64 once known to be non-negative
    Ok((shifted / i128::from(period)) as u64)
}

/// Current unix timestamp in seconds (UTC).
fn current_unix_time() -> i64 {
    chrono::Utc::now().timestamp()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Authentication & secrets
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Check `code` against the configuration in an otpauth URI.
///
/// For HOTP, `moment` is the counter and is required. For TOTP it is a
/// unix timestamp; `None` means now.
pub fn authenticate(uri: &str, code: u32, moment: Option<i64>) -> Result<bool, OtpError> {
    let config = OtpAuthUri::parse(uri)?;
    let time = match config.otp_type() {
        OtpType::Hotp => {
            let counter = moment
                .and_then(|c| u64::try_from(c).ok())
                .ok_or_else(|| {
                    OtpError::new(
                        OtpErrorKind::InvalidCounter,
                        "HOTP authentication needs a non-negative counter",
                    )
                })?;
            TimeSource::Counter(counter)
        }
        OtpType::Totp => moment.map_or(TimeSource::Now, TimeSource::At),
    };
    let expected = config.generate(time)?;
    let digits = config.digits();
    Ok(constant_time_eq(
        format_code(expected, digits).as_bytes(),
        format_code(code, digits).as_bytes(),
    ))
}

/// Generate a cryptographically-random base-32 secret of `byte_length` bytes.
pub fn generate_secret(byte_length: usize) -> String {
    use rand::RngCore;
    let mut buf = vec![0u8; byte_length];
    rand::thread_rng().fill_bytes(&mut buf);
    base32::encode(&buf)
}

/// Render a code left-padded with zeros to `digits` characters.
pub fn format_code(code: u32, digits: u32) -> String {
    format!("{:0>width$}", code, width = digits as usize)
}

/// Constant-time comparison (to prevent timing attacks on code verification).
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::otp::diagnostics::MemorySink;

    // Secret: "12345678901234567890" (ASCII)
    const RFC4226_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    // ── HOTP ─────────────────────────────────────────────────────

    #[test]
    fn rfc4226_hotp_vectors() {
        let expected = [
            755224, 287082, 359152, 969429, 338314, 254676, 287922, 162583, 399871, 520489,
        ];
        for (counter, exp) in expected.iter().enumerate() {
            let code = generate_hotp(RFC4226_SECRET, 6, counter as u64, Algorithm::Sha1).unwrap();
            assert_eq!(code, *exp, "HOTP mismatch at counter {}", counter);
        }
    }

    #[test]
    fn hotp_is_unpadded_numeric() {
        let code = generate_hotp(RFC4226_SECRET, 9, 0, Algorithm::Sha1).unwrap();
        assert_eq!(code, 284755224);
    }

    #[test]
    fn hotp_rejects_ten_digits() {
        let err = generate_hotp(RFC4226_SECRET, 10, 0, Algorithm::Sha1).unwrap_err();
        assert_eq!(err.kind, OtpErrorKind::InvalidDigits);
    }

    #[test]
    fn hotp_propagates_decode_error() {
        let err = generate_hotp("!!!INVALID!!!", 6, 0, Algorithm::Sha256).unwrap_err();
        assert_eq!(err.kind, OtpErrorKind::SecretDecode);
    }

    #[test]
    fn hotp_digits_checked_before_secret() {
        let err = generate_hotp("!!!", 12, 0, Algorithm::Sha256).unwrap_err();
        assert_eq!(err.kind, OtpErrorKind::InvalidDigits);
    }

    // ── Key preparation ──────────────────────────────────────────

    #[test]
    fn short_key_is_reported_and_padded() {
        let sink = MemorySink::new();
        let engine = OtpEngine::with_sink(&sink);
        // 20-byte secret under SHA-256 (32-byte key)
        let code = engine.hotp(RFC4226_SECRET, 6, 0, Algorithm::Sha256).unwrap();
        assert_eq!(
            sink.take(),
            vec![Diagnostic::ShortKey {
                algorithm: Algorithm::Sha256,
                actual: 20,
                expected: 32
            }]
        );
        // zero padding below the block size leaves the HMAC unchanged
        let padded = base32::encode(&[b"12345678901234567890".as_slice(), &[0u8; 12]].concat());
        assert_eq!(engine.hotp(&padded, 6, 0, Algorithm::Sha256).unwrap(), code);
        assert!(sink.is_empty());
    }

    #[test]
    fn long_key_is_reported_and_truncated() {
        let sink = MemorySink::new();
        let engine = OtpEngine::with_sink(&sink);
        let long = base32::encode(&[7u8; 40]);
        let exact = base32::encode(&[7u8; 20]);
        let a = engine.hotp(&long, 6, 3, Algorithm::Sha1).unwrap();
        assert_eq!(
            sink.take(),
            vec![Diagnostic::LongKey {
                algorithm: Algorithm::Sha1,
                actual: 40,
                expected: 20
            }]
        );
        let b = engine.hotp(&exact, 6, 3, Algorithm::Sha1).unwrap();
        assert_eq!(a, b);
        assert!(sink.is_empty());
    }

    #[test]
    fn exact_key_reports_nothing() {
        let sink = MemorySink::new();
        OtpEngine::with_sink(&sink)
            .hotp(RFC4226_SECRET, 6, 1, Algorithm::Sha1)
            .unwrap();
        assert!(sink.is_empty());
    }

    // ── TOTP ─────────────────────────────────────────────────────

    #[test]
    fn totp_at_59_equals_hotp_counter_1() {
        for algo in Algorithm::ALL {
            let totp =
                generate_totp(RFC4226_SECRET, 6, 30, 0, algo, TimeSource::At(59)).unwrap();
            let hotp = generate_hotp(RFC4226_SECRET, 6, 1, algo).unwrap();
            assert_eq!(totp, hotp, "{}", algo);
        }
    }

    #[test]
    fn totp_counter_override_used_verbatim() {
        let totp =
            generate_totp(RFC4226_SECRET, 6, 30, 0, Algorithm::Sha1, TimeSource::Counter(59))
                .unwrap();
        let hotp = generate_hotp(RFC4226_SECRET, 6, 59, Algorithm::Sha1).unwrap();
        assert_eq!(totp, hotp);
    }

    #[test]
    fn totp_t0_shifts_the_clock() {
        let shifted =
            generate_totp(RFC4226_SECRET, 6, 30, 30, Algorithm::Sha1, TimeSource::At(29)).unwrap();
        assert_eq!(shifted, 287082); // (29 + 30) / 30 = 1
    }

    #[test]
    fn totp_rejects_zero_period() {
        let err = generate_totp(RFC4226_SECRET, 6, 0, 0, Algorithm::Sha1, TimeSource::Now)
            .unwrap_err();
        assert_eq!(err.kind, OtpErrorKind::InvalidPeriod);
    }

    #[test]
    fn totp_rejects_negative_shifted_clock() {
        let err = generate_totp(
            RFC4226_SECRET,
            6,
            30,
            -1_000_000_000_000,
            Algorithm::Sha256,
            TimeSource::Now,
        )
        .unwrap_err();
        assert_eq!(err.kind, OtpErrorKind::NegativeTimestamp);
    }

    #[test]
    fn totp_now_matches_explicit_timestamp_window() {
        let params = TotpParams::default();
        let engine = OtpEngine::new();
        let before = current_unix_time();
        let now = engine.totp(RFC4226_SECRET, &params, TimeSource::Now).unwrap();
        let after = current_unix_time();
        let a = engine.totp(RFC4226_SECRET, &params, TimeSource::At(before)).unwrap();
        let b = engine.totp(RFC4226_SECRET, &params, TimeSource::At(after)).unwrap();
        assert!(now == a || now == b);
    }

    // ── Time-step ────────────────────────────────────────────────

    #[test]
    fn time_step_calculation() {
        assert_eq!(time_step_at(0, 0, 30).unwrap(), 0);
        assert_eq!(time_step_at(29, 0, 30).unwrap(), 0);
        assert_eq!(time_step_at(30, 0, 30).unwrap(), 1);
        assert_eq!(time_step_at(59, 0, 30).unwrap(), 1);
        assert_eq!(time_step_at(60, 0, 30).unwrap(), 2);
        assert_eq!(time_step_at(100, -40, 30).unwrap(), 2);
    }

    #[test]
    fn time_step_extremes() {
        assert_eq!(time_step_at(i64::MAX, i64::MAX, 1).unwrap(), u64::MAX - 1);
        assert_eq!(
            time_step_at(0, -1, 30).unwrap_err().kind,
            OtpErrorKind::NegativeTimestamp
        );
        assert_eq!(time_step_at(5, 0, 0).unwrap_err().kind, OtpErrorKind::InvalidPeriod);
    }

    // ── Authentication ───────────────────────────────────────────

    #[test]
    fn authenticate_hotp() {
        let uri = format!("otpauth://hotp/acme:bob?secret={}&algorithm=SHA1", RFC4226_SECRET);
        assert!(authenticate(&uri, 287082, Some(1)).unwrap());
        assert!(!authenticate(&uri, 287082, Some(2)).unwrap());
    }

    #[test]
    fn authenticate_hotp_needs_counter() {
        let uri = format!("otpauth://hotp/bob?secret={}", RFC4226_SECRET);
        assert_eq!(
            authenticate(&uri, 1, None).unwrap_err().kind,
            OtpErrorKind::InvalidCounter
        );
        assert_eq!(
            authenticate(&uri, 1, Some(-1)).unwrap_err().kind,
            OtpErrorKind::InvalidCounter
        );
    }

    #[test]
    fn authenticate_totp_at_timestamp() {
        let uri = format!(
            "otpauth://totp/bob?secret={}&algorithm=SHA1&digits=8",
            RFC4226_SECRET
        );
        assert!(authenticate(&uri, 94287082, Some(59)).unwrap());
        assert!(!authenticate(&uri, 94287083, Some(59)).unwrap());
    }

    #[test]
    fn authenticate_leading_zero_code() {
        // RFC 6238: T = 1111111109, SHA-1, 8 digits → 07081804
        let uri = format!(
            "otpauth://totp/bob?secret={}&algorithm=SHA1&digits=8",
            RFC4226_SECRET
        );
        assert!(authenticate(&uri, 7081804, Some(1111111109)).unwrap());
    }

    #[test]
    fn authenticate_bad_uri() {
        let err = authenticate("http://example.com", 0, None).unwrap_err();
        assert_eq!(err.kind, OtpErrorKind::MalformedUri);
    }

    // ── Secrets & formatting ─────────────────────────────────────

    #[test]
    fn generate_secret_length() {
        let s = generate_secret(20);
        assert_eq!(s.len(), 32);
        assert_eq!(base32::decode(&s).unwrap().len(), 20);
        assert_ne!(generate_secret(20), s);
    }

    #[test]
    fn format_code_pads() {
        assert_eq!(format_code(7081804, 8), "07081804");
        assert_eq!(format_code(755224, 6), "755224");
        assert_eq!(format_code(42, 6), "000042");
    }

    #[test]
    fn constant_time_eq_works() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
