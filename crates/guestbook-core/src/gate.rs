//! Shared-secret access gate.
//!
//! Two static secrets guard the guestbook: one for writing entries and one
//! for reading them. The gate holds no state beyond those secrets and has
//! no side effects.
//!
//! Security properties:
//! - Comparison is byte-exact (no trimming, no case folding) and runs in
//!   constant time over the secret via `subtle::ConstantTimeEq`. Only a
//!   length mismatch returns early.
//! - Secrets live in `Zeroizing` buffers and are redacted from `Debug`.
//! - A missing secret is an error, never a silent "no match", and the error
//!   text does not reveal which secret is missing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::GateError;

/// Which side of the guestbook a password unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessKind {
    Write,
    Read,
}

impl AccessKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Write => "write",
            Self::Read => "read",
        }
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessKind {
    type Err = GateError;

    /// Exact, case-sensitive match on `write` or `read`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "write" => Ok(Self::Write),
            "read" => Ok(Self::Read),
            other => Err(GateError::UnknownKind {
                kind: other.to_owned(),
            }),
        }
    }
}

/// Compares submitted passwords against the configured secrets.
#[derive(Clone)]
pub struct AccessGate {
    write_secret: Option<Zeroizing<String>>,
    read_secret: Option<Zeroizing<String>>,
}

impl fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGate")
            .field("write_secret", &"[redacted]")
            .field("read_secret", &"[redacted]")
            .finish()
    }
}

impl AccessGate {
    /// Build a gate. An empty string counts as not configured.
    #[must_use]
    pub fn new(write_secret: Option<String>, read_secret: Option<String>) -> Self {
        let keep = |s: String| (!s.is_empty()).then(|| Zeroizing::new(s));
        Self {
            write_secret: write_secret.and_then(keep),
            read_secret: read_secret.and_then(keep),
        }
    }

    fn secret(&self, kind: AccessKind) -> Option<&str> {
        match kind {
            AccessKind::Write => self.write_secret.as_deref().map(String::as_str),
            AccessKind::Read => self.read_secret.as_deref().map(String::as_str),
        }
    }

    /// Whether `submitted` equals the secret for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::NotConfigured`] if no secret is held for `kind`.
    pub fn verify(&self, submitted: &str, kind: AccessKind) -> Result<bool, GateError> {
        let secret = self
            .secret(kind)
            .ok_or(GateError::NotConfigured { kind })?;
        Ok(bool::from(submitted.as_bytes().ct_eq(secret.as_bytes())))
    }

    /// Like [`verify`](Self::verify) but treats a mismatch as an error.
    ///
    /// # Errors
    ///
    /// - [`GateError::NotConfigured`] if no secret is held for `kind`.
    /// - [`GateError::Denied`] if the password does not match.
    pub fn require(&self, submitted: &str, kind: AccessKind) -> Result<(), GateError> {
        if self.verify(submitted, kind)? {
            Ok(())
        } else {
            Err(GateError::Denied)
        }
    }
}
