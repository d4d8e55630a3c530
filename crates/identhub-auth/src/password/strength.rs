//! Strength requirements for newly chosen passwords.

use identhub_core::config::PasswordPolicyConfig;
use identhub_core::error::AppError;
use identhub_core::AppResult;

/// Validates new-password strength against the configured policy.
#[derive(Debug, Clone)]
pub struct PasswordStrength {
    min_length: usize,
}

impl PasswordStrength {
    pub fn new(config: &PasswordPolicyConfig) -> Self {
        Self {
            min_length: config.min_length,
        }
    }

    /// Checks a candidate password against all requirements, reporting the
    /// first violation found.
    pub fn validate(&self, password: &str) -> AppResult<()> {
        if password.chars().count() < self.min_length {
            return Err(AppError::validation(format!(
                "Password must be at least {} characters long",
                self.min_length
            )));
        }

        if !password.chars().any(|c| c.is_uppercase()) {
            return Err(AppError::validation(
                "Password must contain at least one uppercase letter",
            ));
        }

        if !password.chars().any(|c| c.is_lowercase()) {
            return Err(AppError::validation(
                "Password must contain at least one lowercase letter",
            ));
        }

        if !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(AppError::validation(
                "Password must contain at least one digit",
            ));
        }

        if !password.chars().any(|c| !c.is_alphanumeric()) {
            return Err(AppError::validation(
                "Password must contain at least one special character",
            ));
        }

        let estimate = zxcvbn::zxcvbn(password, &[]);
        if estimate.score() < zxcvbn::Score::Three {
            return Err(AppError::validation(
                "Password is too weak. Please use a stronger password with more entropy.",
            ));
        }

        Ok(())
    }
}
