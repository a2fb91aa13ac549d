//! Local username/password accounts and cookie sessions.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Auth | Description |
//! |--------|----------|------|-------------|
//! | GET/POST | `/signup` | No | Create an account and log in |
//! | GET/POST | `/login` | No | Log in |
//! | GET | `/logout` | No | Clear the session |

pub mod dtos;
pub mod handlers;
pub mod model;
pub mod repositories;
pub mod routes;
pub mod services;

pub use handlers::AuthState;
pub use repositories::PgUserRepository;
pub use services::{AuthService, SessionService};
