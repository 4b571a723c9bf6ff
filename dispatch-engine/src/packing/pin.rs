//! Supervisor PIN policy for quantity edits
//!
//! PINs are never stored or logged in clear; `HashedPinPolicy` keeps an
//! argon2 PHC string and verifies against it.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PinError {
    #[error("Invalid PIN hash: {0}")]
    InvalidHash(String),

    #[error("PIN hashing failed: {0}")]
    Hashing(String),
}

/// Decides whether a PIN is needed and whether a given one is correct
pub trait PinPolicy: Send + Sync {
    fn is_pin_required(&self) -> bool;
    fn verify_pin(&self, pin: &str) -> bool;
}

/// No PIN needed
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPinPolicy;

impl PinPolicy for NoPinPolicy {
    fn is_pin_required(&self) -> bool {
        false
    }

    fn verify_pin(&self, _pin: &str) -> bool {
        true
    }
}

/// PIN required, verified against an argon2 hash
#[derive(Clone)]
pub struct HashedPinPolicy {
    phc: String,
}

impl std::fmt::Debug for HashedPinPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashedPinPolicy").finish_non_exhaustive()
    }
}

impl HashedPinPolicy {
    /// From an existing PHC string (e.g. `PACKING_PIN_HASH`)
    pub fn new(phc: impl Into<String>) -> Result<Self, PinError> {
        let phc = phc.into();
        PasswordHash::new(&phc).map_err(|e| PinError::InvalidHash(e.to_string()))?;
        Ok(Self { phc })
    }

    /// Hash a clear PIN with a fresh salt
    pub fn from_pin(pin: &str) -> Result<Self, PinError> {
        Ok(Self { phc: hash_pin(pin)? })
    }
}

impl PinPolicy for HashedPinPolicy {
    fn is_pin_required(&self) -> bool {
        true
    }

    fn verify_pin(&self, pin: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(&self.phc) else {
            return false;
        };
        Argon2::default()
            .verify_password(pin.as_bytes(), &parsed)
            .is_ok()
    }
}

/// argon2 PHC string for a PIN
pub fn hash_pin(pin: &str) -> Result<String, PinError> {
    use argon2::PasswordHasher;
    use argon2::password_hash::SaltString;
    use argon2::password_hash::rand_core::OsRng;

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map_err(|e| PinError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

/// Outcome of checking a command's PIN against the policy
///
/// Evaluated before the write transaction is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinCheck {
    NotRequired,
    Verified,
    Missing,
    Rejected,
}

impl PinCheck {
    pub fn evaluate(policy: &dyn PinPolicy, pin: Option<&str>) -> Self {
        if !policy.is_pin_required() {
            return PinCheck::NotRequired;
        }
        match pin {
            None | Some("") => PinCheck::Missing,
            Some(pin) if policy.verify_pin(pin) => PinCheck::Verified,
            Some(_) => PinCheck::Rejected,
        }
    }

    pub fn is_accepted(self) -> bool {
        matches!(self, PinCheck::NotRequired | PinCheck::Verified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_pin_policy_accepts_anything() {
        assert_eq!(PinCheck::evaluate(&NoPinPolicy, None), PinCheck::NotRequired);
        assert!(PinCheck::evaluate(&NoPinPolicy, Some("x")).is_accepted());
    }

    #[test]
    fn test_hashed_policy() {
        let policy = HashedPinPolicy::from_pin("4321").unwrap();

        assert!(policy.is_pin_required());
        assert_eq!(PinCheck::evaluate(&policy, Some("4321")), PinCheck::Verified);
        assert_eq!(PinCheck::evaluate(&policy, Some("1234")), PinCheck::Rejected);
        assert_eq!(PinCheck::evaluate(&policy, None), PinCheck::Missing);
        assert!(!PinCheck::evaluate(&policy, Some("")).is_accepted());
    }

    #[test]
    fn test_policy_from_existing_hash() {
        let phc = hash_pin("0000").unwrap();
        let policy = HashedPinPolicy::new(phc).unwrap();
        assert!(policy.verify_pin("0000"));
    }

    #[test]
    fn test_garbage_hash_is_rejected() {
        assert!(matches!(
            HashedPinPolicy::new("not-a-phc-string"),
            Err(PinError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_debug_hides_hash() {
        let policy = HashedPinPolicy::from_pin("4321").unwrap();
        assert!(!format!("{policy:?}").contains("argon2"));
    }
}
