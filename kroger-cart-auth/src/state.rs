//! Per-attempt authorization request state.

use std::fmt::Write;

use crate::error::AuthError;

/// Random `state` nonce for one authorization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationState(String);

impl AuthorizationState {
    /// Generate a fresh nonce (32 random bytes, hex encoded).
    pub fn generate() -> Result<Self, AuthError> {
        let mut bytes = [0u8; 32];
        getrandom::getrandom(&mut bytes).map_err(AuthError::Random)?;
        let mut s = String::with_capacity(bytes.len() * 2);
        for b in bytes {
            let _ = write!(s, "{:02x}", b);
        }
        Ok(Self(s))
    }

    /// The nonce as sent in the authorization URL.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `candidate` is the value this session sent.
    pub fn matches(&self, candidate: &str) -> bool {
        // constant-time over equal lengths
        self.0.len() == candidate.len()
            && self
                .0
                .bytes()
                .zip(candidate.bytes())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }
}

impl From<&str> for AuthorizationState {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_hex_and_unique() {
        let a = AuthorizationState::generate().unwrap();
        let b = AuthorizationState::generate().unwrap();

        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_matches() {
        let state = AuthorizationState::from("S");
        assert!(state.matches("S"));
        assert!(!state.matches("T"));
        assert!(!state.matches(""));
        assert!(!state.matches("SS"));
    }
}
