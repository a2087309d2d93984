//! Registration and login.

use std::sync::Arc;

use crate::auth::{PasswordAuthenticator, PasswordCheck, TokenIssuer};
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{LoginRequest, NewUser, RegisterRequest};

/// Account registration and token issuance.
pub struct AuthService {
    repo: Arc<Repository>,
    tokens: Arc<TokenIssuer>,
    passwords: PasswordAuthenticator,
}

impl AuthService {
    pub fn new(
        repo: Arc<Repository>,
        tokens: Arc<TokenIssuer>,
        passwords: PasswordAuthenticator,
    ) -> Self {
        Self {
            repo,
            tokens,
            passwords,
        }
    }

    /// Token verifier used by the request middleware.
    pub fn tokens(&self) -> Arc<TokenIssuer> {
        self.tokens.clone()
    }

    /// Register an account and return its id.
    pub async fn register(&self, request: RegisterRequest) -> Result<i64, AppError> {
        let registration = request.validate()?;

        if self
            .repo
            .find_user_by_identity_or_email(&registration.nickname, &registration.email)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "User with this nickname or email already exists".to_string(),
            ));
        }

        let passwords = self.passwords;
        let password = registration.password;
        let password_hash =
            tokio::task::spawn_blocking(move || passwords.hash(&password)).await??;

        let id = self
            .repo
            .insert_user(&NewUser {
                nickname: registration.nickname.clone(),
                email: registration.email,
                password_hash,
                role: registration.role,
            })
            .await?;

        tracing::info!(user_id = id, role = %registration.role, "Registered user {}", registration.nickname);
        Ok(id)
    }

    /// Check credentials and issue a session token.
    ///
    /// Unknown nicknames and wrong passwords produce the same error.
    pub async fn login(&self, request: LoginRequest) -> Result<String, AppError> {
        let password_hash = match self.repo.get_password_hash(&request.nickname).await {
            Ok(hash) => hash,
            Err(AppError::NotFound(_)) => return Err(bad_credentials(&request.nickname)),
            Err(e) => return Err(e),
        };

        let passwords = self.passwords;
        let digest = password_hash.clone();
        let password = request.password;
        let check =
            tokio::task::spawn_blocking(move || passwords.verify(&digest, &password)).await?;
        if check == PasswordCheck::Mismatch {
            return Err(bad_credentials(&request.nickname));
        }

        let user = match self
            .repo
            .get_user_by_identity_and_hash(&request.nickname, &password_hash)
            .await
        {
            Ok(user) => user,
            Err(AppError::NotFound(_)) => return Err(bad_credentials(&request.nickname)),
            Err(e) => return Err(e),
        };

        let token = self.tokens.issue(user.id, user.role)?;
        tracing::info!(user_id = user.id, role = %user.role, "Issued session token for {}", user.nickname);
        Ok(token)
    }
}

fn bad_credentials(nickname: &str) -> AppError {
    tracing::warn!("Failed login for {}", nickname);
    AppError::Authentication("Invalid nickname or password".to_string())
}
