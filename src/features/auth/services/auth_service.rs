use std::sync::Arc;

use argon2::{
    password_hash::{PasswordHasher, PasswordVerifier, SaltString},
    Argon2, PasswordHash,
};
use rand::rngs::OsRng;
use tracing::{info, instrument};

use crate::core::error::{AppError, Result};
use crate::features::auth::dtos::{LoginFormDto, SignupFormDto};
use crate::features::auth::model::{AuthenticatedUser, NewUser};
use crate::features::auth::repositories::UserRepository;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Local username/password authentication
pub struct AuthService {
    repo: Arc<dyn UserRepository>,
}

impl AuthService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    /// Register a new account. The DTO must already be validated.
    #[instrument(skip(self, dto), fields(username = %dto.username))]
    pub async fn register(&self, dto: SignupFormDto) -> Result<AuthenticatedUser> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(dto.password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?
            .to_string();

        let user = self
            .repo
            .create(NewUser {
                username: dto.username.trim().to_string(),
                email: dto.email.trim().to_lowercase(),
                password_hash,
            })
            .await?;

        info!(user_id = %user.id, "user_registered");
        Ok(AuthenticatedUser::from(&user))
    }

    /// Verify credentials. Unknown users and wrong passwords get the same error.
    #[instrument(skip(self, dto), fields(username = %dto.username))]
    pub async fn login(&self, dto: LoginFormDto) -> Result<AuthenticatedUser> {
        let user = self
            .repo
            .find_by_username(dto.username.trim())
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        let parsed = PasswordHash::new(&user.password_hash)
            .map_err(|e| AppError::Internal(format!("Stored password hash is invalid: {}", e)))?;

        Argon2::default()
            .verify_password(dto.password.as_bytes(), &parsed)
            .map_err(|_| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        info!(user_id = %user.id, "user_logged_in");
        Ok(AuthenticatedUser::from(&user))
    }
}
