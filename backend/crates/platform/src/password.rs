//! Password Policy, Hashing and Generation
//!
//! - Policy: 6..=64 characters with at least one uppercase letter, one
//!   lowercase letter and one digit. Each failing rule has its own error.
//! - Argon2id hashing in PHC string format, with optional pepper
//! - Zeroization of clear text on drop
//! - Generation of strong random passwords for the reset flow
//!
//! Letter classes are Unicode-aware, so Polish diacritics (`Ą`, `ż`, ...)
//! count as uppercase/lowercase letters.

use std::fmt;
use std::sync::LazyLock;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::Rng;
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ============================================================================
// Constants
// ============================================================================

pub const MIN_PASSWORD_LENGTH: usize = 6;

pub const MAX_PASSWORD_LENGTH: usize = 64;

const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";

// ============================================================================
// Error Types
// ============================================================================

/// Password policy violation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },

    #[error("Password must be at most {max} characters (got {actual})")]
    TooLong { max: usize, actual: usize },

    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,

    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,

    #[error("Password must contain at least one digit")]
    MissingDigit,

    #[error("Password contains invalid control characters")]
    InvalidCharacter,
}

/// Password hashing/verification errors
#[derive(Debug, Error)]
pub enum PasswordHashError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

// ============================================================================
// Clear Text Password (Zeroized on drop)
// ============================================================================

/// Clear text password with automatic memory zeroization
///
/// Not `Clone`, and `Debug` output is redacted.
///
/// ## Examples
/// ```rust
/// use platform::password::ClearTextPassword;
///
/// let password = ClearTextPassword::new("Secret123".to_string()).unwrap();
/// let hashed = password.hash(None).unwrap();
/// assert!(hashed.verify(&password, None));
/// ```
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    /// Create a new clear text password, enforcing the policy
    ///
    /// Unicode is normalized using NFKC before validation. Rules are checked
    /// in order: control characters, length, uppercase, lowercase, digit.
    pub fn new(raw: String) -> Result<Self, PasswordPolicyError> {
        let password = Self::unvalidated(raw);
        password.check_policy()?;
        Ok(password)
    }

    /// Normalize without enforcing the policy
    ///
    /// Used for login attempts: a password that no longer satisfies the
    /// current policy must still be verifiable against its stored hash.
    pub fn unvalidated(raw: String) -> Self {
        let mut raw = raw;
        let normalized: String = raw.nfkc().collect();
        raw.zeroize();
        Self(normalized)
    }

    fn check_policy(&self) -> Result<(), PasswordPolicyError> {
        let value = &self.0;

        if value.chars().any(|ch| ch.is_control()) {
            return Err(PasswordPolicyError::InvalidCharacter);
        }

        // Count Unicode code points, not bytes
        let char_count = value.chars().count();
        if char_count < MIN_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooShort {
                min: MIN_PASSWORD_LENGTH,
                actual: char_count,
            });
        }
        if char_count > MAX_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooLong {
                max: MAX_PASSWORD_LENGTH,
                actual: char_count,
            });
        }

        if !value.chars().any(char::is_uppercase) {
            return Err(PasswordPolicyError::MissingUppercase);
        }
        if !value.chars().any(char::is_lowercase) {
            return Err(PasswordPolicyError::MissingLowercase);
        }
        if !value.chars().any(|ch| ch.is_ascii_digit()) {
            return Err(PasswordPolicyError::MissingDigit);
        }

        Ok(())
    }

    /// Plain text, for the one place that must deliver it (the reset email)
    pub fn expose(&self) -> &str {
        &self.0
    }

    fn peppered(&self, pepper: Option<&[u8]>) -> Vec<u8> {
        let mut bytes = self.0.as_bytes().to_vec();
        if let Some(p) = pepper {
            bytes.extend_from_slice(p);
        }
        bytes
    }

    /// Hash the password using Argon2id
    ///
    /// ## Arguments
    /// * `pepper` - Optional application-wide secret appended before hashing
    pub fn hash(&self, pepper: Option<&[u8]>) -> Result<HashedPassword, PasswordHashError> {
        let mut password_bytes = self.peppered(pepper);
        let salt = SaltString::generate(OsRng);

        // OWASP recommended Argon2id parameters: m=19456 (19 MiB), t=2, p=1
        let result = Argon2::default()
            .hash_password(&password_bytes, &salt)
            .map(|hash| HashedPassword {
                hash: hash.to_string(),
            })
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()));

        password_bytes.zeroize();
        result
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Hashed Password (Safe to store)
// ============================================================================

/// Hashed password in PHC string format
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    hash: String,
}

/// Hash that matches no user; verified against when a login is unknown so
/// both failure paths spend the same Argon2 work.
static DUMMY_HASH: LazyLock<Option<HashedPassword>> = LazyLock::new(|| {
    ClearTextPassword::unvalidated("dummy-password-for-timing".to_string())
        .hash(None)
        .ok()
});

impl HashedPassword {
    /// Create from PHC string (e.g., from database)
    pub fn from_phc_string(s: impl Into<String>) -> Result<Self, PasswordHashError> {
        let hash = s.into();
        PasswordHash::new(&hash).map_err(|_| PasswordHashError::InvalidHashFormat)?;
        Ok(Self { hash })
    }

    pub fn as_phc_string(&self) -> &str {
        &self.hash
    }

    /// Verify a password against this hash
    ///
    /// Argon2 compares in constant time internally.
    pub fn verify(&self, password: &ClearTextPassword, pepper: Option<&[u8]>) -> bool {
        let parsed_hash = match PasswordHash::new(&self.hash) {
            Ok(h) => h,
            Err(_) => return false,
        };

        let mut password_bytes = password.peppered(pepper);
        let verified = Argon2::default()
            .verify_password(&password_bytes, &parsed_hash)
            .is_ok();
        password_bytes.zeroize();
        verified
    }

    /// Spend one verification on a hash nobody owns. Always `false`.
    pub fn verify_dummy(password: &ClearTextPassword, pepper: Option<&[u8]>) -> bool {
        if let Some(dummy) = DUMMY_HASH.as_ref() {
            let _ = dummy.verify(password, pepper);
        }
        false
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

// ============================================================================
// Password Generation
// ============================================================================

/// Shape of a generated password
///
/// Only ASCII letters and digits are used so the password survives any
/// mail client and keyboard layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordRecipe {
    pub length: usize,
    pub min_uppercase: usize,
    pub min_digits: usize,
}

impl Default for PasswordRecipe {
    fn default() -> Self {
        Self {
            length: 32,
            min_uppercase: 6,
            min_digits: 6,
        }
    }
}

/// Generate a random password following `recipe`, using the OS RNG
///
/// Positions not claimed by the uppercase/digit minimums are lowercase, so
/// the result always satisfies the policy when `length` leaves room for
/// one lowercase letter.
pub fn generate_password(recipe: PasswordRecipe) -> ClearTextPassword {
    let mut rng = OsRng;
    let upper = recipe.min_uppercase.min(recipe.length);
    let digits = recipe.min_digits.min(recipe.length - upper);
    let lower = recipe.length - upper - digits;

    let mut chars: Vec<u8> = Vec::with_capacity(recipe.length);
    let mut pick = |alphabet: &[u8], count: usize, out: &mut Vec<u8>| {
        for _ in 0..count {
            out.push(alphabet[rng.gen_range(0..alphabet.len())]);
        }
    };
    pick(UPPERCASE, upper, &mut chars);
    pick(DIGITS, digits, &mut chars);
    pick(LOWERCASE, lower, &mut chars);

    chars.shuffle(&mut OsRng);

    let password: String = chars.iter().map(|&b| b as char).collect();
    chars.zeroize();
    ClearTextPassword(password)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_too_short() {
        let result = ClearTextPassword::new("Ab1".to_string());
        assert_eq!(
            result.unwrap_err(),
            PasswordPolicyError::TooShort { min: 6, actual: 3 }
        );
    }

    #[test]
    fn test_password_too_long() {
        let long_password = format!("Ab1{}", "a".repeat(MAX_PASSWORD_LENGTH));
        let result = ClearTextPassword::new(long_password);
        assert!(matches!(result, Err(PasswordPolicyError::TooLong { .. })));
    }

    #[test]
    fn test_length_boundaries() {
        assert!(ClearTextPassword::new("Abcde1".to_string()).is_ok());
        let max = format!("Ab1{}", "c".repeat(MAX_PASSWORD_LENGTH - 3));
        assert!(ClearTextPassword::new(max).is_ok());
    }

    #[test]
    fn test_specific_rule_is_reported() {
        assert_eq!(
            ClearTextPassword::new("password1".to_string()).unwrap_err(),
            PasswordPolicyError::MissingUppercase
        );
        assert_eq!(
            ClearTextPassword::new("PASSWORD1".to_string()).unwrap_err(),
            PasswordPolicyError::MissingLowercase
        );
        assert_eq!(
            ClearTextPassword::new("Password".to_string()).unwrap_err(),
            PasswordPolicyError::MissingDigit
        );
    }

    #[test]
    fn test_polish_letters_count() {
        // "Ż" is the only uppercase letter here
        assert!(ClearTextPassword::new("żółwŻ12".to_string()).is_ok());
        assert_eq!(
            ClearTextPassword::new("żółwie12".to_string()).unwrap_err(),
            PasswordPolicyError::MissingUppercase
        );
    }

    #[test]
    fn test_control_characters_rejected() {
        let result = ClearTextPassword::new("Pass\u{0007}word1".to_string());
        assert_eq!(result.unwrap_err(), PasswordPolicyError::InvalidCharacter);
    }

    #[test]
    fn test_unvalidated_skips_policy() {
        let password = ClearTextPassword::unvalidated("x".to_string());
        assert_eq!(password.expose(), "x");
    }

    #[test]
    fn test_hash_and_verify() {
        let password = ClearTextPassword::new("TestPassword123".to_string()).unwrap();
        let hashed = password.hash(None).unwrap();

        assert!(hashed.verify(&password, None));

        let wrong_password = ClearTextPassword::unvalidated("WrongPassword123".to_string());
        assert!(!hashed.verify(&wrong_password, None));
    }

    #[test]
    fn test_hash_with_pepper() {
        let password = ClearTextPassword::unvalidated("TestPassword123".to_string());
        let pepper = b"my_secret_pepper";
        let hashed = password.hash(Some(pepper)).unwrap();

        assert!(hashed.verify(&password, Some(pepper)));
        assert!(!hashed.verify(&password, None));
        assert!(!hashed.verify(&password, Some(b"wrong_pepper")));
    }

    #[test]
    fn test_phc_string_roundtrip() {
        let password = ClearTextPassword::unvalidated("TestPassword123".to_string());
        let hashed = password.hash(None).unwrap();

        let restored = HashedPassword::from_phc_string(hashed.as_phc_string()).unwrap();
        assert!(restored.verify(&password, None));
    }

    #[test]
    fn test_invalid_phc_string() {
        assert!(HashedPassword::from_phc_string("not_a_valid_hash").is_err());
    }

    #[test]
    fn test_verify_dummy_never_matches() {
        let password = ClearTextPassword::unvalidated("dummy-password-for-timing".to_string());
        assert!(!HashedPassword::verify_dummy(&password, None));
    }

    #[test]
    fn test_debug_redaction() {
        let password = ClearTextPassword::unvalidated("secret".to_string());
        let debug_output = format!("{:?}", password);
        assert!(debug_output.contains("REDACTED"));
        assert!(!debug_output.contains("secret"));
    }

    #[test]
    fn test_generated_password_shape() {
        for _ in 0..20 {
            let password = generate_password(PasswordRecipe::default());
            let value = password.expose();

            assert_eq!(value.len(), 32);
            assert!(value.chars().all(|c| c.is_ascii_alphanumeric()));
            assert!(value.chars().filter(|c| c.is_ascii_uppercase()).count() >= 6);
            assert!(value.chars().filter(|c| c.is_ascii_digit()).count() >= 6);
            assert!(ClearTextPassword::new(value.to_string()).is_ok());
        }
    }

    #[test]
    fn test_generated_passwords_differ() {
        let a = generate_password(PasswordRecipe::default());
        let b = generate_password(PasswordRecipe::default());
        assert_ne!(a.expose(), b.expose());
    }
}
