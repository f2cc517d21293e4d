//! PKCE (Proof Key for Code Exchange), RFC 7636.
//!
//! S256 only; the "plain" method is rejected outright. Public clients
//! must send a challenge with every authorization request.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};

/// Errors from PKCE parsing and verification.
#[derive(Debug, thiserror::Error)]
pub enum PkceError {
    /// Verifier length is outside the RFC 7636 range.
    #[error("invalid verifier length: must be 43-128 characters, got {0}")]
    InvalidVerifierLength(usize),

    /// Verifier contains characters outside the unreserved set.
    #[error("invalid verifier characters: must be [A-Za-z0-9-._~]")]
    InvalidVerifierCharacters,

    /// Challenge is not 43 characters of base64url.
    #[error("invalid challenge format: must be 43 base64url characters")]
    InvalidChallengeFormat,

    /// Challenge method other than S256.
    #[error("unsupported challenge method: {0}, only S256 is supported")]
    UnsupportedMethod(String),

    /// The verifier does not match the stored challenge.
    #[error("verification failed")]
    VerificationFailed,
}

/// A PKCE code verifier, as presented at token exchange.
#[derive(Debug, Clone)]
pub struct PkceVerifier(String);

impl PkceVerifier {
    /// Parses and validates a verifier per RFC 7636 §4.1.
    pub fn new(value: impl Into<String>) -> Result<Self, PkceError> {
        let value = value.into();
        if value.len() < 43 || value.len() > 128 {
            return Err(PkceError::InvalidVerifierLength(value.len()));
        }
        let valid = value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~'));
        if !valid {
            return Err(PkceError::InvalidVerifierCharacters);
        }
        Ok(Self(value))
    }

    /// Generates a fresh 43-character verifier. Used in tests and by
    /// native-client helpers.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Returns the verifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A PKCE code challenge, as stored with the authorization code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge(String);

impl PkceChallenge {
    /// Parses and validates a stored challenge.
    pub fn new(value: impl Into<String>) -> Result<Self, PkceError> {
        let value = value.into();
        // SHA-256 output in base64url is always 43 characters.
        if value.len() != 43 {
            return Err(PkceError::InvalidChallengeFormat);
        }
        if URL_SAFE_NO_PAD.decode(value.as_bytes()).is_err() {
            return Err(PkceError::InvalidChallengeFormat);
        }
        Ok(Self(value))
    }

    /// Derives the S256 challenge from a verifier.
    #[must_use]
    pub fn from_verifier(verifier: &PkceVerifier) -> Self {
        let digest = Sha256::digest(verifier.as_str().as_bytes());
        Self(URL_SAFE_NO_PAD.encode(digest))
    }

    /// Verifies a presented verifier against this challenge.
    ///
    /// Comparison is constant-time over the full challenge length.
    pub fn verify(&self, verifier: &PkceVerifier) -> Result<(), PkceError> {
        let computed = Self::from_verifier(verifier);
        let mut diff = 0u8;
        for (a, b) in self.0.bytes().zip(computed.0.bytes()) {
            diff |= a ^ b;
        }
        if diff == 0 && self.0.len() == computed.0.len() {
            Ok(())
        } else {
            Err(PkceError::VerificationFailed)
        }
    }

    /// Returns the challenge string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let verifier = PkceVerifier::generate();
        let challenge = PkceChallenge::from_verifier(&verifier);
        assert!(challenge.verify(&verifier).is_ok());
    }

    #[test]
    fn test_wrong_verifier_fails() {
        let challenge = PkceChallenge::from_verifier(&PkceVerifier::generate());
        let other = PkceVerifier::generate();
        assert!(matches!(
            challenge.verify(&other),
            Err(PkceError::VerificationFailed)
        ));
    }

    #[test]
    fn test_verifier_length_bounds() {
        assert!(matches!(
            PkceVerifier::new("a".repeat(42)),
            Err(PkceError::InvalidVerifierLength(42))
        ));
        assert!(PkceVerifier::new("a".repeat(43)).is_ok());
        assert!(PkceVerifier::new("a".repeat(128)).is_ok());
        assert!(matches!(
            PkceVerifier::new("a".repeat(129)),
            Err(PkceError::InvalidVerifierLength(129))
        ));
    }

    #[test]
    fn test_verifier_character_set() {
        assert!(matches!(
            PkceVerifier::new(format!("{}!", "a".repeat(42))),
            Err(PkceError::InvalidVerifierCharacters)
        ));
        assert!(PkceVerifier::new(format!("{}-._~", "a".repeat(39))).is_ok());
    }

    #[test]
    fn test_known_vector() {
        // RFC 7636 Appendix B.
        let verifier = PkceVerifier::new("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk").unwrap();
        let challenge = PkceChallenge::from_verifier(&verifier);
        assert_eq!(challenge.as_str(), "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn test_challenge_format_rejected() {
        assert!(PkceChallenge::new("short").is_err());
        assert!(PkceChallenge::new("!".repeat(43)).is_err());
    }
}
