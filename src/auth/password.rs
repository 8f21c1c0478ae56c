//! Argon2id password hashing in PHC string format.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::errors::ServiceError;

pub fn hash(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::HashError(e.to_string()))
}

/// `Ok(false)` on a wrong password; `Err` only when the stored hash is unusable.
pub fn verify(password: &str, stored: &str) -> Result<bool, ServiceError> {
    let parsed = PasswordHash::new(stored).map_err(|e| ServiceError::HashError(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(ServiceError::HashError(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let stored = hash("walk-in-cooler").unwrap();
        assert!(stored.starts_with("$argon2"));
        assert!(verify("walk-in-cooler", &stored).unwrap());
        assert!(!verify("walk-in-freezer", &stored).unwrap());
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(hash("same").unwrap(), hash("same").unwrap());
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(matches!(
            verify("x", "not-a-phc-string"),
            Err(ServiceError::HashError(_))
        ));
    }
}
