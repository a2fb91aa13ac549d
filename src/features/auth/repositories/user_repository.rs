use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::{NewUser, User};

/// Persistence for user accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user. Duplicate usernames or emails are a `Conflict`.
    async fn create(&self, new_user: NewUser) -> Result<User>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map unique violations (PostgreSQL code 23505) to a user-facing conflict
fn handle_db_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code() == Some(std::borrow::Cow::Borrowed("23505")) {
            let field = match db_err.constraint() {
                Some(constraint) if constraint.contains("email") => "email",
                _ => "username",
            };
            return AppError::Conflict(format!(
                "A user with the given {} is already registered",
                field
            ));
        }
    }

    tracing::error!("User query failed: {:?}", e);
    AppError::Database(e)
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, password_hash
            "#,
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(handle_db_error)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(handle_db_error)
    }
}
