//! # otpkit – HOTP / TOTP one-time passwords
//!
//! Self-contained one-time password engine:
//!
//! - **RFC 4226 / 6238** – HOTP & TOTP generation with SHA-1, SHA-256, SHA-512
//! - **Base32 secrets** – Tolerant RFC 4648 decoding (separators, padding,
//!   common transcription typos)
//! - **otpauth:// URIs** – Parsing & serialisation of authenticator provisioning URIs
//! - **Diagnostics** – Non-fatal warnings routed through an injectable sink

pub mod otp;
