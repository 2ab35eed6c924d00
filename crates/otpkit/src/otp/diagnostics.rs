//! Non-fatal diagnostics and the sinks that receive them.
//!
//! A diagnostic never changes a return value. Engines and the URI parser
//! report through a [`DiagnosticSink`]; the default [`LogSink`] forwards
//! to the `log` facade.

use crate::otp::types::Algorithm;
use std::fmt;
use std::sync::Mutex;

/// A warning raised while generating a code or parsing a URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The decoded secret is shorter than the algorithm's key size; it is zero-padded.
    ShortKey {
        algorithm: Algorithm,
        actual: usize,
        expected: usize,
    },
    /// The decoded secret is longer than the algorithm's key size; it is truncated.
    LongKey {
        algorithm: Algorithm,
        actual: usize,
        expected: usize,
    },
    /// An otpauth parameter that is not understood and was dropped.
    UnknownParameter { key: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortKey { algorithm, actual, expected } => write!(
                f,
                "secret key is too short for {} ({} bytes) - it should have exactly {} bytes",
                algorithm, actual, expected
            ),
            Self::LongKey { algorithm, actual, expected } => write!(
                f,
                "secret key is too long for {} ({} bytes) - it should have exactly {} bytes",
                algorithm, actual, expected
            ),
            Self::UnknownParameter { key } => write!(f, "ignoring otpauth parameter '{}'", key),
        }
    }
}

/// Write-only channel for [`Diagnostic`]s.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: &Diagnostic);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&Diagnostic) + Send + Sync,
{
    fn report(&self, diagnostic: &Diagnostic) {
        self(diagnostic)
    }
}

/// Forwards every diagnostic to `log::warn!`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&self, diagnostic: &Diagnostic) {
        log::warn!("{}", diagnostic);
    }
}

/// Collects diagnostics in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Remove and return everything reported so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        match self.entries.lock() {
            Ok(mut entries) => std::mem::take(&mut *entries),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics().is_empty()
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, diagnostic: &Diagnostic) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(diagnostic.clone()),
            Err(poisoned) => poisoned.into_inner().push(diagnostic.clone()),
        }
    }
}
