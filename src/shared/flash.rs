//! Flash notices: short-lived, severity-tagged messages shown on the next
//! rendered page.
//!
//! Notices are stored in a cookie as base64-encoded JSON. Handlers take a
//! [`Flash`] extractor, push notices onto it and return it as part of the
//! response; page handlers drain it with [`Flash::take`] before rendering.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, IntoResponseParts, Redirect, Response, ResponseParts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64, Engine};
use serde::{Deserialize, Serialize};

pub const FLASH_COOKIE: &str = "flash";

/// Presentation class of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }
}

/// Pending notices of the current visitor
pub struct Flash {
    jar: CookieJar,
}

impl<S> FromRequestParts<S> for Flash
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self {
            jar: CookieJar::from_headers(&parts.headers),
        })
    }
}

impl Flash {
    /// Queue a notice for the next rendered page
    pub fn push(self, notice: Notice) -> Self {
        let mut notices = decode(&self.jar);
        notices.push(notice);
        Self {
            jar: self.jar.add(flash_cookie(&notices)),
        }
    }

    /// Drain pending notices. The returned `Flash` clears the cookie.
    pub fn take(self) -> (Self, Vec<Notice>) {
        if self.jar.get(FLASH_COOKIE).is_none() {
            return (self, Vec::new());
        }
        let notices = decode(&self.jar);
        let jar = self.jar.remove(Cookie::build(FLASH_COOKIE).path("/"));
        (Self { jar }, notices)
    }
}

impl IntoResponseParts for Flash {
    type Error = Infallible;

    fn into_response_parts(self, res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        self.jar.into_response_parts(res)
    }
}

/// Redirect with a single notice, discarding any other pending notices
pub fn redirect_with_notice(to: &str, notice: Notice) -> Response {
    let jar = CookieJar::new().add(flash_cookie(&[notice]));
    (jar, Redirect::to(to)).into_response()
}

fn flash_cookie(notices: &[Notice]) -> Cookie<'static> {
    let payload = serde_json::to_vec(notices).unwrap_or_default();
    Cookie::build((FLASH_COOKIE, BASE64.encode(payload)))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn decode(jar: &CookieJar) -> Vec<Notice> {
    jar.get(FLASH_COOKIE)
        .and_then(|cookie| BASE64.decode(cookie.value()).ok())
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue};

    fn flash_from_cookie(value: &str) -> Flash {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("{}={}", FLASH_COOKIE, value)).unwrap(),
        );
        Flash {
            jar: CookieJar::from_headers(&headers),
        }
    }

    #[test]
    fn test_push_then_take_keeps_order_and_severity() {
        let flash = Flash {
            jar: CookieJar::new(),
        }
        .push(Notice::warning("Map unavailable"))
        .push(Notice::new(Severity::Success, "New Listing Created!"));

        let (_, notices) = flash.take();
        assert_eq!(
            notices,
            vec![
                Notice::warning("Map unavailable"),
                Notice::success("New Listing Created!")
            ]
        );
    }

    #[test]
    fn test_take_from_request_cookie() {
        let encoded = BASE64.encode(serde_json::to_vec(&[Notice::info("hello")]).unwrap());
        let (flash, notices) = flash_from_cookie(&encoded).take();
        assert_eq!(notices, vec![Notice::info("hello")]);

        // Draining leaves nothing behind
        assert!(decode(&flash.jar).is_empty());
    }

    #[test]
    fn test_garbage_cookie_yields_no_notices() {
        let (_, notices) = flash_from_cookie("not-base64-json").take();
        assert!(notices.is_empty());
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        let json = serde_json::to_string(&Notice::warning("x")).unwrap();
        assert_eq!(json, r#"{"severity":"warning","message":"x"}"#);
    }
}
