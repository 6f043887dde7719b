use bcrypt::{hash, verify, DEFAULT_COST};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Password must be at least 8 characters long")]
    TooShort,
    #[error("Password must be no more than 128 characters long")]
    TooLong,
    #[error("Password must contain at least one uppercase letter")]
    NoUppercase,
    #[error("Password must contain at least one lowercase letter")]
    NoLowercase,
    #[error("Password must contain at least one number")]
    NoNumber,
    #[error("Password must contain at least one special character")]
    NoSpecialChar,
    #[error("Failed to hash password")]
    HashingFailed,
    #[error("Failed to verify password")]
    VerificationFailed,
}

impl PasswordError {
    /// True when the caller supplied a password that breaks the policy
    pub fn is_policy_violation(&self) -> bool {
        !matches!(self, PasswordError::HashingFailed | PasswordError::VerificationFailed)
    }
}

/// Password strength requirements
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_number: bool,
    pub require_special_char: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            require_uppercase: true,
            require_lowercase: true,
            require_number: true,
            require_special_char: true,
        }
    }
}

fn special_chars() -> &'static Regex {
    static SPECIAL: OnceLock<Regex> = OnceLock::new();
    SPECIAL.get_or_init(|| Regex::new(r"[^a-zA-Z0-9]").expect("static pattern compiles"))
}

/// Validate password strength according to policy
pub fn validate_password_strength(password: &str, policy: &PasswordPolicy) -> Result<(), PasswordError> {
    if password.len() < policy.min_length {
        return Err(PasswordError::TooShort);
    }

    if password.len() > policy.max_length {
        return Err(PasswordError::TooLong);
    }

    if policy.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
        return Err(PasswordError::NoUppercase);
    }

    if policy.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
        return Err(PasswordError::NoLowercase);
    }

    if policy.require_number && !password.chars().any(|c| c.is_numeric()) {
        return Err(PasswordError::NoNumber);
    }

    if policy.require_special_char && !special_chars().is_match(password) {
        return Err(PasswordError::NoSpecialChar);
    }

    Ok(())
}

/// Hash a password using bcrypt
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    validate_password_strength(password, &PasswordPolicy::default())?;

    hash(password, DEFAULT_COST)
        .map_err(|_| PasswordError::HashingFailed)
}

/// Verify a password against its hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    verify(password, hash)
        .map_err(|_| PasswordError::VerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_password_validation() {
        let policy = PasswordPolicy::default();

        assert_matches!(validate_password_strength("short", &policy), Err(PasswordError::TooShort));
        assert_matches!(
            validate_password_strength("lowercase123!", &policy),
            Err(PasswordError::NoUppercase)
        );
        assert_matches!(
            validate_password_strength("UPPERCASE123!", &policy),
            Err(PasswordError::NoLowercase)
        );
        assert_matches!(
            validate_password_strength("Password!", &policy),
            Err(PasswordError::NoNumber)
        );
        assert_matches!(
            validate_password_strength("Password123", &policy),
            Err(PasswordError::NoSpecialChar)
        );
        assert!(validate_password_strength("Password123!", &policy).is_ok());
    }

    #[test]
    fn test_password_hashing() {
        let password = "TestPassword123!";
        let hash = hash_password(password).unwrap();

        assert!(verify_password(password, &hash).unwrap());
        assert!(!verify_password("WrongPassword", &hash).unwrap());
    }

    #[test]
    fn test_weak_password_is_not_hashed() {
        assert_matches!(hash_password("weak"), Err(PasswordError::TooShort));
        assert!(PasswordError::TooShort.is_policy_violation());
        assert!(!PasswordError::HashingFailed.is_policy_violation());
    }
}
