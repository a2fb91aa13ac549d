//! Cookie sessions carried as HS256-signed JWTs.

use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, SameSite};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::config::SessionConfig;
use crate::core::error::{AppError, Result};
use crate::core::integrations::validate_session_secret;
use crate::features::auth::model::AuthenticatedUser;

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: Uuid,
    username: String,
    iat: i64,
    exp: i64,
}

pub struct SessionService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
    secure_cookie: bool,
}

impl SessionService {
    /// Build from configuration. A missing or weak secret is replaced by a
    /// random per-process one, so sessions are lost on restart.
    pub fn new(config: &SessionConfig) -> Self {
        let secret = match config.secret.as_deref() {
            Some(secret) if validate_session_secret(Some(secret)) => secret.as_bytes().to_vec(),
            _ => {
                let mut random = vec![0u8; 64];
                OsRng.fill_bytes(&mut random);
                random
            }
        };

        Self::with_secret(&secret, config.ttl, config.secure_cookie)
    }

    pub fn with_secret(secret: &[u8], ttl: Duration, secure_cookie: bool) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
            secure_cookie,
        }
    }

    /// Sign a session token for `user`
    pub fn issue(&self, user: &AuthenticatedUser) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = SessionClaims {
            sub: user.id,
            username: user.username.clone(),
            iat: now,
            exp: now + self.ttl.as_secs() as i64,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign session: {}", e)))
    }

    /// Decode a session token. Expired, tampered or malformed tokens yield `None`.
    pub fn verify(&self, token: &str) -> Option<AuthenticatedUser> {
        match decode::<SessionClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Some(AuthenticatedUser {
                id: data.claims.sub,
                username: data.claims.username,
            }),
            Err(e) => {
                tracing::debug!("Ignoring invalid session cookie: {}", e);
                None
            }
        }
    }

    /// Cookie that logs `user` in
    pub fn login_cookie(&self, user: &AuthenticatedUser) -> Result<Cookie<'static>> {
        let token = self.issue(user)?;
        let max_age = time::Duration::seconds(self.ttl.as_secs() as i64);

        Ok(Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .secure(self.secure_cookie)
            .same_site(SameSite::Lax)
            .max_age(max_age)
            .build())
    }

    /// Removal cookie for logging out
    pub fn logout_cookie() -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE).path("/").build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> SessionService {
        SessionService::with_secret(
            b"0123456789abcdef0123456789abcdef",
            Duration::from_secs(3600),
            false,
        )
    }

    fn user() -> AuthenticatedUser {
        AuthenticatedUser {
            id: Uuid::new_v4(),
            username: "wanderer".to_string(),
        }
    }

    #[test]
    fn test_issue_then_verify() {
        let sessions = service();
        let user = user();
        let token = sessions.issue(&user).unwrap();
        assert_eq!(sessions.verify(&token), Some(user));
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let other = SessionService::with_secret(
            b"another-secret-another-secret-xx",
            Duration::from_secs(3600),
            false,
        );
        let token = other.issue(&user()).unwrap();
        assert_eq!(service().verify(&token), None);
    }

    #[test]
    fn test_expired_token_rejected() {
        let sessions = SessionService::with_secret(
            b"0123456789abcdef0123456789abcdef",
            Duration::from_secs(0),
            false,
        );
        let token = sessions.issue(&user()).unwrap();
        std::thread::sleep(Duration::from_millis(1100));
        assert_eq!(sessions.verify(&token), None);
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert_eq!(service().verify("not-a-jwt"), None);
    }

    #[test]
    fn test_weak_secret_replaced_with_random() {
        let config = SessionConfig {
            secret: Some("short".to_string()),
            ttl: Duration::from_secs(60),
            secure_cookie: false,
        };
        let first = SessionService::new(&config);
        let second = SessionService::new(&config);
        let token = first.issue(&user()).unwrap();

        assert!(first.verify(&token).is_some());
        assert!(second.verify(&token).is_none());
    }

    #[test]
    fn test_login_cookie_attributes() {
        let cookie = service().login_cookie(&user()).unwrap();
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age().map(|d| d.whole_seconds()), Some(3600));
    }
}
