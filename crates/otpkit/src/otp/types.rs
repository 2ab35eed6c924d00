//! Core types for the HOTP/TOTP engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default number of digits of a generated code.
pub const DEFAULT_DIGITS: u32 = 6;
/// Default TOTP time-step in seconds.
pub const DEFAULT_PERIOD: u32 = 30;
/// Upper digit bound: `floor(log10(2^31)) = 9`.
pub const MAX_DIGITS: u32 = 9;
/// Lower digit bound accepted in otpauth URIs.
pub const MIN_URI_DIGITS: u32 = 6;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Algorithm
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Hash algorithm used for HMAC-based OTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Algorithm {
    #[serde(rename = "SHA1")]
    Sha1,
    #[default]
    #[serde(rename = "SHA256")]
    Sha256,
    #[serde(rename = "SHA512")]
    Sha512,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Self::Sha1, Self::Sha256, Self::Sha512];

    /// Canonical uppercase name, as written in `otpauth://` URIs.
    pub fn uri_name(&self) -> &'static str {
        match self {
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri_name())
    }
}

impl FromStr for Algorithm {
    type Err = OtpError;

    /// Case-insensitive `SHA1 | SHA256 | SHA512`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.uri_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                OtpError::new(
                    OtpErrorKind::InvalidAlgorithm,
                    "invalid HMAC algorithm; expecting SHA1, SHA256 or SHA512",
                )
                .with_detail(s)
            })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  OTP type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Whether a configuration is counter-based or time-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpType {
    Hotp,
    #[default]
    Totp,
}

impl fmt::Display for OtpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hotp => write!(f, "hotp"),
            Self::Totp => write!(f, "totp"),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TOTP parameters
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parameters of a time-based code, minus the secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TotpParams {
    /// Number of digits in the generated code.
    pub digits: u32,
    /// Time-step in seconds.
    pub period: u32,
    /// Shift in seconds added to the clock before dividing by `period`.
    pub t0: i64,
    /// Hash algorithm.
    pub algorithm: Algorithm,
}

impl Default for TotpParams {
    fn default() -> Self {
        Self {
            digits: DEFAULT_DIGITS,
            period: DEFAULT_PERIOD,
            t0: 0,
            algorithm: Algorithm::default(),
        }
    }
}

impl TotpParams {
    /// Load parameters from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, OtpError> {
        let params: Self = serde_json::from_str(json).map_err(|e| {
            OtpError::new(OtpErrorKind::InvalidInput, "invalid TOTP parameters")
                .with_detail(e.to_string())
        })?;
        params.validate()?;
        Ok(params)
    }

    /// Check the digit and period rules the engine enforces.
    pub fn validate(&self) -> Result<(), OtpError> {
        check_digits(self.digits)?;
        check_period(self.period)
    }
}

pub(crate) fn check_digits(digits: u32) -> Result<(), OtpError> {
    if digits > MAX_DIGITS {
        return Err(OtpError::new(
            OtpErrorKind::InvalidDigits,
            "digits must not exceed the value 9",
        )
        .with_detail(digits.to_string()));
    }
    Ok(())
}

pub(crate) fn check_period(period: u32) -> Result<(), OtpError> {
    if period == 0 {
        return Err(OtpError::new(OtpErrorKind::InvalidPeriod, "period must be non-zero"));
    }
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Time source
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where a TOTP counter comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeSource {
    /// The system clock, in UTC seconds since the epoch.
    #[default]
    Now,
    /// A fixed unix timestamp; shifted by `t0` and divided by the period.
    At(i64),
    /// An already computed counter, used verbatim.
    Counter(u64),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Errors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OtpErrorKind {
    SecretDecode,
    InvalidDigits,
    InvalidPeriod,
    NegativeTimestamp,
    HashInit,
    MalformedUri,
    UnknownType,
    MalformedParameter,
    InvalidAlgorithm,
    MissingSecret,
    InvalidCounter,
    InvalidInput,
}

/// Crate-level error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpError {
    pub kind: OtpErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

impl fmt::Display for OtpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)?;
        if let Some(d) = &self.detail {
            write!(f, " ({})", d)?;
        }
        Ok(())
    }
}

impl std::error::Error for OtpError {}

impl OtpError {
    pub fn new(kind: OtpErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl From<OtpError> for String {
    fn from(e: OtpError) -> String {
        e.to_string()
    }
}
