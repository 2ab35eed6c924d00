//! Keyed-hash collaborator: HMAC-SHA-1/256/512 behind one lookup table.
//!
//! [`spec`] maps each [`Algorithm`] to its canonical key size, digest size
//! and HMAC function. [`init`] is the single initialisation point; it runs
//! known-answer tests once per process and caches the outcome.

use crate::otp::types::{Algorithm, OtpError, OtpErrorKind};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use std::sync::OnceLock;

/// HMAC over `message` with `key`.
pub type MacFn = fn(key: &[u8], message: &[u8]) -> Result<Vec<u8>, OtpError>;

/// One row of the algorithm table.
#[derive(Debug, Clone, Copy)]
pub struct HashSpec {
    pub algorithm: Algorithm,
    /// Key size the secret is padded or truncated to.
    pub key_len: usize,
    /// Length of the HMAC output.
    pub digest_len: usize,
    pub compute: MacFn,
}

static TABLE: [HashSpec; 3] = [
    HashSpec {
        algorithm: Algorithm::Sha1,
        key_len: 20,
        digest_len: 20,
        compute: mac::<Hmac<Sha1>>,
    },
    HashSpec {
        algorithm: Algorithm::Sha256,
        key_len: 32,
        digest_len: 32,
        compute: mac::<Hmac<Sha256>>,
    },
    HashSpec {
        algorithm: Algorithm::Sha512,
        key_len: 64,
        digest_len: 64,
        compute: mac::<Hmac<Sha512>>,
    },
];

/// Table row for `algorithm`.
pub fn spec(algorithm: Algorithm) -> &'static HashSpec {
    match algorithm {
        Algorithm::Sha1 => &TABLE[0],
        Algorithm::Sha256 => &TABLE[1],
        Algorithm::Sha512 => &TABLE[2],
    }
}

impl HashSpec {
    /// Compute the HMAC of `message`.
    pub fn hmac(&self, key: &[u8], message: &[u8]) -> Result<Vec<u8>, OtpError> {
        (self.compute)(key, message)
    }
}

/// `hmac(algorithm, key, message)`. Calls [`init`] first.
pub fn hmac(algorithm: Algorithm, key: &[u8], message: &[u8]) -> Result<Vec<u8>, OtpError> {
    init()?;
    spec(algorithm).hmac(key, message)
}

fn mac<M: Mac + KeyInit>(key: &[u8], message: &[u8]) -> Result<Vec<u8>, OtpError> {
    let mut mac = <M as KeyInit>::new_from_slice(key).map_err(|e| {
        OtpError::new(OtpErrorKind::HashInit, "HMAC rejected the key").with_detail(e.to_string())
    })?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Initialisation (known-answer tests)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

static INIT: OnceLock<Result<(), String>> = OnceLock::new();

struct KnownAnswer {
    algorithm: Algorithm,
    key: &'static [u8],
    message: &'static [u8],
    expected_hex: &'static str,
}

const KNOWN_ANSWERS: [KnownAnswer; 3] = [
    // RFC 2202 test case 2
    KnownAnswer {
        algorithm: Algorithm::Sha1,
        key: b"Jefe",
        message: b"what do ya want for nothing?",
        expected_hex: "effcdf6ae5eb2fa2d27416d5f184df9c259a7c79",
    },
    // RFC 4231 test case 2
    KnownAnswer {
        algorithm: Algorithm::Sha256,
        key: b"Jefe",
        message: b"what do ya want for nothing?",
        expected_hex: "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843",
    },
    KnownAnswer {
        algorithm: Algorithm::Sha512,
        key: b"Jefe",
        message: b"what do ya want for nothing?",
        expected_hex: "164b7a7bfcf819e2e395fbe73b56e0a387bd64222e831fd610270cd7ea250554\
                       9758bf75c05a994a6d034f65f8f0e6fdcaeab1a34d4a6b4b636e070a38bce737",
    },
];

/// Initialise the keyed-hash subsystem. Idempotent; later calls return the
/// cached outcome of the first.
pub fn init() -> Result<(), OtpError> {
    INIT.get_or_init(|| {
        let outcome = run_known_answers();
        match &outcome {
            Ok(()) => log::debug!("HMAC self-tests passed"),
            Err(e) => log::error!("HMAC self-tests failed: {}", e),
        }
        outcome
    })
    .clone()
    .map_err(|detail| {
        OtpError::new(OtpErrorKind::HashInit, "keyed-hash subsystem unavailable").with_detail(detail)
    })
}

fn run_known_answers() -> Result<(), String> {
    for kat in &KNOWN_ANSWERS {
        let row = spec(kat.algorithm);
        let expected = hex::decode(kat.expected_hex).map_err(|e| e.to_string())?;
        let got = row.hmac(kat.key, kat.message).map_err(|e| e.to_string())?;
        if got.len() != row.digest_len || got != expected {
            return Err(format!("HMAC-{} known-answer test failed", kat.algorithm));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_rows_match_algorithms() {
        for algo in Algorithm::ALL {
            assert_eq!(spec(algo).algorithm, algo);
        }
        assert_eq!(spec(Algorithm::Sha1).key_len, 20);
        assert_eq!(spec(Algorithm::Sha256).key_len, 32);
        assert_eq!(spec(Algorithm::Sha512).key_len, 64);
    }

    #[test]
    fn digest_lengths() {
        for algo in Algorithm::ALL {
            let out = hmac(algo, b"key", b"message").unwrap();
            assert_eq!(out.len(), spec(algo).digest_len);
        }
    }

    #[test]
    fn init_is_idempotent() {
        assert!(init().is_ok());
        assert!(init().is_ok());
    }

    #[test]
    fn known_answers_pass() {
        assert_eq!(run_known_answers(), Ok(()));
    }

    #[test]
    fn rfc4226_hmac_counter_zero() {
        // RFC 4226 Appendix D, count 0
        let out = hmac(Algorithm::Sha1, b"12345678901234567890", &0u64.to_be_bytes()).unwrap();
        assert_eq!(hex::encode(out), "cc93cf18508d94934c64b65d8ba7667fb7cde4b0");
    }

    #[test]
    fn empty_key_is_accepted() {
        assert!(hmac(Algorithm::Sha256, b"", b"message").is_ok());
    }
}
