// Credentials and access tokens.
//
// password — bcrypt hashing on the blocking pool
// token    — stateless HMAC-signed bearer tokens
// cipher   — AES-GCM encryption for emails at rest

pub mod cipher;
pub mod password;
pub mod token;

use serde::{Deserialize, Serialize};

pub use cipher::EmailCipher;
pub use password::PasswordHasher;
pub use token::{Claims, TokenError, TokenSigner};

/// The authenticated caller, as carried in an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub username: String,
    pub email: String,
    pub is_superuser: bool,
}

/// Raised when a regular user hits a superuser-only action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Not authorized to perform this action")]
pub struct Forbidden;

impl Principal {
    /// Gate for superuser-only operations.
    pub fn require_superuser(&self) -> Result<(), Forbidden> {
        if self.is_superuser {
            Ok(())
        } else {
            Err(Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_superuser() {
        let mut principal = Principal {
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            is_superuser: false,
        };
        assert_eq!(principal.require_superuser(), Err(Forbidden));
        principal.is_superuser = true;
        assert!(principal.require_superuser().is_ok());
    }
}
