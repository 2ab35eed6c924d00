//! `otpauth://` URI parsing and generation.
//!
//! Grammar: `otpauth://{hotp|totp}/{label}?{key=value}&{key=value}...`
//! where the label is `issuer:account` (or `issuer%3Aaccount`) or just
//! `account`. Recognised keys are `secret`, `algorithm`, `digits` and
//! `period`; anything else is reported and dropped.
//!
//! Serialisation always writes all four keys. It is not byte-exact for
//! labels separated by `%3A` or for URIs carrying unknown keys.

use crate::otp::core::OtpEngine;
use crate::otp::diagnostics::{Diagnostic, DiagnosticSink, LogSink};
use crate::otp::types::*;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

const SCHEME: &str = "otpauth://";

/// A parsed OTP configuration.
///
/// Invariants: `secret` is non-empty, `digits` is in `6..=9`, `period >= 1`.
/// Records built through [`OtpAuthUri::new`] and its builders always
/// serialise to a URI that parses back to an equal record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OtpAuthUri {
    otp_type: OtpType,
    algorithm: Algorithm,
    digits: u32,
    period: u32,
    account: String,
    issuer: Option<String>,
    secret: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Construction
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl OtpAuthUri {
    /// Create a configuration with SHA-256, 6 digits and a 30 s period.
    ///
    /// The account must be non-empty and free of `?`, `&`, `:` and `%3A`;
    /// the secret must be non-empty and free of `&`.
    pub fn new(
        otp_type: OtpType,
        account: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Self, OtpError> {
        let account = account.into();
        let secret = secret.into();
        if account.is_empty() {
            return Err(OtpError::new(
                OtpErrorKind::MalformedUri,
                "account name must not be empty",
            ));
        }
        check_label_part("account", &account)?;
        if has_separator(&account) {
            return Err(OtpError::new(
                OtpErrorKind::MalformedUri,
                "account name must not contain an issuer separator",
            )
            .with_detail(account));
        }
        if secret.is_empty() {
            return Err(missing_secret());
        }
        if secret.contains('&') {
            return Err(OtpError::new(
                OtpErrorKind::MalformedParameter,
                "secret must not contain '&'",
            ));
        }
        Ok(Self {
            otp_type,
            algorithm: Algorithm::default(),
            digits: DEFAULT_DIGITS,
            period: DEFAULT_PERIOD,
            account,
            issuer: None,
            secret,
        })
    }

    /// Builder: set issuer. An empty issuer clears it; one containing
    /// `:`, `?` or `&` is rejected.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Result<Self, OtpError> {
        let issuer = issuer.into();
        check_label_part("issuer", &issuer)?;
        if issuer.contains(':') {
            return Err(OtpError::new(
                OtpErrorKind::MalformedUri,
                "issuer must not contain ':'",
            )
            .with_detail(issuer));
        }
        self.issuer = (!issuer.is_empty()).then_some(issuer);
        Ok(self)
    }

    /// Builder: set algorithm.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Builder: set digit count (6 to 9).
    pub fn with_digits(mut self, digits: u32) -> Result<Self, OtpError> {
        self.digits = uri_digits(digits)?;
        Ok(self)
    }

    /// Builder: set time period (at least 1 second).
    pub fn with_period(mut self, period: u32) -> Result<Self, OtpError> {
        check_period(period)?;
        self.period = period;
        Ok(self)
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn otp_type(&self) -> OtpType {
        self.otp_type
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    /// Base-32 secret exactly as written in the URI.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// TOTP parameters of this configuration (no clock shift).
    pub fn totp_params(&self) -> TotpParams {
        TotpParams {
            digits: self.digits,
            period: self.period,
            t0: 0,
            algorithm: self.algorithm,
        }
    }

    // ── Generation ───────────────────────────────────────────────

    /// Generate the code this configuration yields at `time`.
    ///
    /// HOTP configurations accept only [`TimeSource::Counter`].
    pub fn generate(&self, time: TimeSource) -> Result<u32, OtpError> {
        self.generate_with(&LogSink, time)
    }

    pub fn generate_with(
        &self,
        sink: &dyn DiagnosticSink,
        time: TimeSource,
    ) -> Result<u32, OtpError> {
        let engine = OtpEngine::with_sink(sink);
        match (self.otp_type, time) {
            (OtpType::Hotp, TimeSource::Counter(counter)) => {
                engine.hotp(&self.secret, self.digits, counter, self.algorithm)
            }
            (OtpType::Hotp, _) => Err(OtpError::new(
                OtpErrorKind::InvalidCounter,
                "HOTP codes need an explicit counter",
            )),
            (OtpType::Totp, time) => engine.totp(&self.secret, &self.totp_params(), time),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Parse
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl OtpAuthUri {
    /// Parse an `otpauth://` URI; unknown keys are reported to the log.
    pub fn parse(uri: &str) -> Result<Self, OtpError> {
        Self::parse_with(uri, &LogSink)
    }

    /// Parse an `otpauth://` URI, reporting unknown keys to `sink`.
    pub fn parse_with(uri: &str, sink: &dyn DiagnosticSink) -> Result<Self, OtpError> {
        let rest = uri.strip_prefix(SCHEME).ok_or_else(|| {
            OtpError::new(OtpErrorKind::MalformedUri, "URI does not start with otpauth://")
        })?;

        let (otp_type, rest) = if let Some(rest) = rest.strip_prefix("hotp/") {
            (OtpType::Hotp, rest)
        } else if let Some(rest) = rest.strip_prefix("totp/") {
            (OtpType::Totp, rest)
        } else {
            let found = rest.split('/').next().unwrap_or_default();
            return Err(
                OtpError::new(OtpErrorKind::UnknownType, "URI uses unknown type").with_detail(found),
            );
        };

        let (label, params) = rest.split_once('?').ok_or_else(|| {
            OtpError::new(OtpErrorKind::MalformedUri, "URI lacks obligatory parameters")
        })?;
        if label.is_empty() {
            return Err(OtpError::new(
                OtpErrorKind::MalformedUri,
                "URI lacks an account name / issuer",
            ));
        }
        let (issuer, account) = split_label(label);

        let mut parsed = Self {
            otp_type,
            algorithm: Algorithm::default(),
            digits: DEFAULT_DIGITS,
            period: DEFAULT_PERIOD,
            account: account.to_string(),
            issuer: (!issuer.is_empty()).then(|| issuer.to_string()),
            secret: String::new(),
        };

        let mut remaining = params;
        while !remaining.is_empty() {
            let pair = match remaining.split_once('&') {
                Some((pair, tail)) => {
                    remaining = tail;
                    pair
                }
                None => std::mem::take(&mut remaining),
            };
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                OtpError::new(
                    OtpErrorKind::MalformedParameter,
                    "error parsing parameter - missing '='",
                )
                .with_detail(pair)
            })?;
            log::trace!("otpauth parameter {}={}", key, value);
            parsed.apply(key, value, sink)?;
        }

        if parsed.secret.is_empty() {
            return Err(missing_secret());
        }
        Ok(parsed)
    }

    fn apply(&mut self, key: &str, value: &str, sink: &dyn DiagnosticSink) -> Result<(), OtpError> {
        match key {
            "algorithm" => self.algorithm = value.parse()?,
            "secret" => self.secret = value.to_string(),
            "digits" => {
                let digits = value.parse::<u32>().map_err(|_| invalid_digits(value))?;
                self.digits = uri_digits(digits)?;
            }
            "period" => {
                self.period = value
                    .parse::<u32>()
                    .ok()
                    .filter(|p| *p >= 1)
                    .ok_or_else(|| {
                        OtpError::new(
                            OtpErrorKind::InvalidPeriod,
                            "invalid value for 'period'; expecting a value >=1",
                        )
                        .with_detail(value)
                    })?;
            }
            _ => sink.report(&Diagnostic::UnknownParameter {
                key: key.to_string(),
            }),
        }
        Ok(())
    }
}

impl FromStr for OtpAuthUri {
    type Err = OtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Split a label into `(issuer, account)` on the first `:`, else the
/// first `%3A`. Without a separator the issuer is empty.
fn split_label(label: &str) -> (&str, &str) {
    if let Some((issuer, account)) = label.split_once(':') {
        return (issuer, account);
    }
    let upper = label.to_ascii_uppercase();
    match upper.find("%3A") {
        Some(pos) => (&label[..pos], &label[pos + 3..]),
        None => ("", label),
    }
}

/// A label part may not end the label early or open a parameter.
fn check_label_part(what: &str, value: &str) -> Result<(), OtpError> {
    if value.contains(['?', '&']) {
        return Err(OtpError::new(
            OtpErrorKind::MalformedUri,
            format!("{} must not contain '?' or '&'", what),
        )
        .with_detail(value));
    }
    Ok(())
}

fn has_separator(label: &str) -> bool {
    label.contains(':') || label.to_ascii_uppercase().contains("%3A")
}

fn uri_digits(digits: u32) -> Result<u32, OtpError> {
    if (MIN_URI_DIGITS..=MAX_DIGITS).contains(&digits) {
        Ok(digits)
    } else {
        Err(invalid_digits(&digits.to_string()))
    }
}

fn invalid_digits(value: &str) -> OtpError {
    OtpError::new(
        OtpErrorKind::InvalidDigits,
        "invalid value for 'digits'; expecting (6|7|8|9)",
    )
    .with_detail(value)
}

fn missing_secret() -> OtpError {
    OtpError::new(OtpErrorKind::MissingSecret, "parameter 'secret' is missing")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Generate
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl OtpAuthUri {
    /// Serialise back to an `otpauth://` URI.
    pub fn to_uri(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for OtpAuthUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/", SCHEME, self.otp_type)?;
        if let Some(issuer) = &self.issuer {
            write!(f, "{}:", issuer)?;
        }
        write!(
            f,
            "{}?secret={}&algorithm={}&digits={}&period={}",
            self.account,
            self.secret,
            self.algorithm.uri_name(),
            self.digits,
            self.period
        )
    }
}
