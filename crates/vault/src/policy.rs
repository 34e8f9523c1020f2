//! Master passphrase policy.

/// Minimum passphrase length, in characters.
pub const MIN_LEN: usize = 12;

/// Maximum passphrase length, in characters.
pub const MAX_LEN: usize = 128;

/// Characters that satisfy the symbol requirement.
pub const SYMBOLS: &str = r#"!@#$%^&*()_+-=[]{};':"\|,.<>/?"#;

/// The first rule a proposed passphrase breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PolicyViolation {
    #[error("Master password must be at least {MIN_LEN} characters long")]
    TooShort,
    #[error("Master password must be at most {MAX_LEN} characters long")]
    TooLong,
    #[error("Master password must contain at least one uppercase letter")]
    MissingUppercase,
    #[error("Master password must contain at least one lowercase letter")]
    MissingLowercase,
    #[error("Master password must contain at least one digit")]
    MissingDigit,
    #[error("Master password must contain at least one special character")]
    MissingSymbol,
}

/// Check a proposed master passphrase. Only applied at initialization.
pub fn validate(passphrase: &str) -> Result<(), PolicyViolation> {
    let len = passphrase.chars().count();
    if len < MIN_LEN {
        return Err(PolicyViolation::TooShort);
    }
    if len > MAX_LEN {
        return Err(PolicyViolation::TooLong);
    }
    if !passphrase.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PolicyViolation::MissingUppercase);
    }
    if !passphrase.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(PolicyViolation::MissingLowercase);
    }
    if !passphrase.chars().any(|c| c.is_ascii_digit()) {
        return Err(PolicyViolation::MissingDigit);
    }
    if !passphrase.chars().any(|c| SYMBOLS.contains(c)) {
        return Err(PolicyViolation::MissingSymbol);
    }
    Ok(())
}
