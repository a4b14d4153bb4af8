use bcrypt::{hash, verify, DEFAULT_COST};

#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordError(#[from] bcrypt::BcryptError);

/// Minimum accepted password length for new or changed passwords.
pub const MIN_PASSWORD_LEN: usize = 6;

pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    Ok(hash(plain, DEFAULT_COST)?)
}

/// A malformed stored hash counts as a mismatch rather than an error.
pub fn verify_password(plain: &str, hashed: &str) -> bool {
    verify(plain, hashed).unwrap_or(false)
}
