// User directory — account CRUD, login, and role changes over the Database trait.
//
// Emails pass through the optional EmailCipher on the way in and out, so the
// rest of the app only ever sees plaintext addresses. Mutations return the
// full user list, which is what the account-management UI re-renders from.

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use tracing::{info, warn};

use crate::auth::{EmailCipher, PasswordHasher, Principal, TokenSigner};
use crate::db::models::{NewUser, UserRecord, UserView};
use crate::db::Database;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("User not found")]
    NotFound,
    #[error("No user found with the username {0}")]
    UnknownUsername(String),
    #[error("Wrong username or password")]
    WrongPassword,
    #[error("Username {0} is already taken")]
    UsernameTaken(String),
    #[error("{0}")]
    Invalid(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type DirectoryResult<T> = std::result::Result<T, DirectoryError>;

/// Body of a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginSuccess {
    pub access_token: String,
    pub token_type: &'static str,
    pub id: i64,
}

pub struct UserDirectory {
    db: Arc<dyn Database>,
    cipher: Option<EmailCipher>,
    hasher: PasswordHasher,
}

impl UserDirectory {
    /// `cipher: None` stores emails as given.
    pub fn new(db: Arc<dyn Database>, cipher: Option<EmailCipher>, hasher: PasswordHasher) -> Self {
        Self { db, cipher, hasher }
    }

    pub fn encrypts_email(&self) -> bool {
        self.cipher.is_some()
    }

    pub async fn list(&self) -> DirectoryResult<Vec<UserView>> {
        let users = self.db.list_users().await?;
        Ok(users.into_iter().map(|u| self.view(u)).collect())
    }

    pub async fn get(&self, id: i64) -> DirectoryResult<UserView> {
        self.db
            .get_user(id)
            .await?
            .map(|u| self.view(u))
            .ok_or(DirectoryError::NotFound)
    }

    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password: &str,
        is_superuser: bool,
    ) -> DirectoryResult<Vec<UserView>> {
        validate_username(username)?;
        if password.is_empty() {
            return Err(DirectoryError::Invalid("Password must not be empty"));
        }
        if self.db.get_user_by_username(username).await?.is_some() {
            return Err(DirectoryError::UsernameTaken(username.to_string()));
        }

        let user = NewUser {
            username: username.to_string(),
            email: self.seal_email(email)?,
            is_superuser,
            password_hash: self.hasher.hash(password).await?,
        };
        let id = self
            .db
            .insert_user(&user)
            .await
            .map_err(|e| unique_violation(e, username))?;

        info!(id, username, is_superuser, "Registered user");
        self.list().await
    }

    pub async fn update(&self, id: i64, username: &str, email: &str) -> DirectoryResult<Vec<UserView>> {
        validate_username(username)?;
        if let Some(existing) = self.db.get_user_by_username(username).await? {
            if existing.id != id {
                return Err(DirectoryError::UsernameTaken(username.to_string()));
            }
        }

        let sealed = self.seal_email(email)?;
        let updated = self
            .db
            .update_user(id, username, &sealed)
            .await
            .map_err(|e| unique_violation(e, username))?;
        if !updated {
            return Err(DirectoryError::NotFound);
        }
        info!(id, username, "Updated user");
        self.list().await
    }

    pub async fn delete(&self, id: i64) -> DirectoryResult<Vec<UserView>> {
        if !self.db.delete_user(id).await? {
            return Err(DirectoryError::NotFound);
        }
        info!(id, "Deleted user");
        self.list().await
    }

    /// Flip the stored superuser flag. Applying it twice restores the original.
    pub async fn toggle_superuser(&self, id: i64) -> DirectoryResult<Vec<UserView>> {
        let flag = self
            .db
            .toggle_superuser(id)
            .await?
            .ok_or(DirectoryError::NotFound)?;
        info!(id, is_superuser = flag, "Changed superuser flag");
        self.list().await
    }

    /// Check credentials and issue an access token.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        signer: &TokenSigner,
    ) -> DirectoryResult<LoginSuccess> {
        let user = self
            .db
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| DirectoryError::UnknownUsername(username.to_string()))?;

        if !self.hasher.verify(password, &user.password_hash).await? {
            warn!(username, "Rejected login with wrong password");
            return Err(DirectoryError::WrongPassword);
        }

        let id = user.id;
        let view = self.view(user);
        let access_token = signer.issue(&Principal {
            username: view.username,
            email: view.email,
            is_superuser: view.is_superuser,
        });

        Ok(LoginSuccess {
            access_token,
            token_type: "bearer",
            id,
        })
    }

    fn seal_email(&self, email: &str) -> anyhow::Result<String> {
        match &self.cipher {
            Some(cipher) => cipher.encrypt(email).context("Failed to encrypt email"),
            None => Ok(email.to_string()),
        }
    }

    fn view(&self, user: UserRecord) -> UserView {
        let email = match &self.cipher {
            Some(cipher) => cipher.decrypt_or_sentinel(&user.email),
            None => user.email,
        };
        UserView {
            id: user.id,
            username: user.username,
            email,
            is_superuser: user.is_superuser,
            created_at: user.created_at,
        }
    }
}

fn validate_username(username: &str) -> DirectoryResult<()> {
    if username.trim().is_empty() {
        return Err(DirectoryError::Invalid("Username must not be empty"));
    }
    Ok(())
}

/// A concurrent insert can still trip the UNIQUE constraint after the
/// pre-check passed; report that as a taken username rather than a 500.
fn unique_violation(err: anyhow::Error, username: &str) -> DirectoryError {
    let is_constraint = err
        .downcast_ref::<rusqlite::Error>()
        .and_then(|e| e.sqlite_error_code())
        .is_some_and(|code| code == rusqlite::ErrorCode::ConstraintViolation);
    if is_constraint {
        DirectoryError::UsernameTaken(username.to_string())
    } else {
        DirectoryError::Internal(err)
    }
}
