mod auth_service;
mod session_service;

pub use auth_service::AuthService;
pub use session_service::{SessionService, SESSION_COOKIE};
