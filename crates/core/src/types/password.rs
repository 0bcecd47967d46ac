//! Password type with the store's registration policy.

use core::fmt;

use secrecy::{ExposeSecret, SecretString};

/// A single rule of the registration password policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PasswordRule {
    /// At least [`Password::MIN_LENGTH`] characters.
    MinLength,
    /// At least one uppercase letter.
    Uppercase,
    /// At least one lowercase letter.
    Lowercase,
    /// At least one digit.
    Digit,
}

impl fmt::Display for PasswordRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinLength => write!(
                f,
                "Password must be at least {} characters",
                Password::MIN_LENGTH
            ),
            Self::Uppercase => f.write_str("Password must contain at least one uppercase letter"),
            Self::Lowercase => f.write_str("Password must contain at least one lowercase letter"),
            Self::Digit => f.write_str("Password must contain at least one number"),
        }
    }
}

/// Error returned when a password violates one or more policy rules.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", format_violations(.violations))]
pub struct PasswordError {
    /// Every rule the candidate failed, in policy order.
    pub violations: Vec<PasswordRule>,
}

fn format_violations(violations: &[PasswordRule]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A password that satisfies the registration policy.
///
/// ## Constraints
///
/// - At least 8 characters
/// - At least one uppercase letter, one lowercase letter and one digit
///
/// ## Examples
///
/// ```
/// use lm_store_core::Password;
///
/// assert!(Password::parse("Secret123").is_ok());
/// assert!(Password::parse("short1A").is_err());
/// assert!(Password::parse("alllowercase1").is_err());
/// ```
#[derive(Clone)]
pub struct Password(SecretString);

impl Password {
    /// Minimum number of characters.
    pub const MIN_LENGTH: usize = 8;

    /// Validate a candidate password against the policy.
    ///
    /// # Errors
    ///
    /// Returns every violated rule, not just the first.
    pub fn parse(candidate: &str) -> Result<Self, PasswordError> {
        let mut violations = Vec::new();

        if candidate.chars().count() < Self::MIN_LENGTH {
            violations.push(PasswordRule::MinLength);
        }
        if !candidate.chars().any(char::is_uppercase) {
            violations.push(PasswordRule::Uppercase);
        }
        if !candidate.chars().any(char::is_lowercase) {
            violations.push(PasswordRule::Lowercase);
        }
        if !candidate.chars().any(|c| c.is_ascii_digit()) {
            violations.push(PasswordRule::Digit);
        }

        if violations.is_empty() {
            Ok(Self(SecretString::from(candidate.to_owned())))
        } else {
            Err(PasswordError { violations })
        }
    }

    /// Expose the raw password for the request body.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}
