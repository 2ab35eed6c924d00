//! OTP crate: sub-modules.

pub mod types;
pub mod diagnostics;
pub mod base32;
pub mod keyed_hash;
pub mod truncate;
pub mod core;
pub mod uri;

// Re-export top-level items for convenience.
pub use types::*;
pub use diagnostics::{Diagnostic, DiagnosticSink, LogSink, MemorySink};
pub use self::core::{
    authenticate, format_code, generate_hotp, generate_secret, generate_totp, OtpEngine,
};
pub use uri::OtpAuthUri;
