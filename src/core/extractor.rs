use std::convert::Infallible;

use axum::{
    extract::{rejection::FormRejection, FromRequest, FromRequestParts, Request},
    http::{request::Parts, Method},
    response::{IntoResponse, Response},
    Form,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::de::DeserializeOwned;

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;

/// Cookie remembering the page a logged-out visitor tried to open
pub const RETURN_TO_COOKIE: &str = "return_to";

/// URL-encoded form extractor with consistent error responses
pub struct AppForm<T>(pub T);

impl<T, S> FromRequest<S> for AppForm<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppFormRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Form::<T>::from_request(req, state).await {
            Ok(value) => Ok(Self(value.0)),
            Err(rejection) => Err(AppFormRejection(rejection)),
        }
    }
}

pub struct AppFormRejection(FormRejection);

impl AppFormRejection {
    pub fn message(&self) -> String {
        match &self.0 {
            FormRejection::FailedToDeserializeForm(err) => {
                format!("Invalid form data: {}", err.body_text())
            }
            FormRejection::FailedToDeserializeFormBody(err) => {
                format!("Invalid form data: {}", err.body_text())
            }
            FormRejection::InvalidFormContentType(_) => {
                "Expected a URL-encoded form submission".to_string()
            }
            _ => "Failed to read form data".to_string(),
        }
    }
}

impl IntoResponse for AppFormRejection {
    fn into_response(self) -> Response {
        AppError::BadRequest(self.message()).into_response()
    }
}

/// Rejection for pages that need a logged-in user
pub struct LoginRequired {
    return_to: Option<String>,
}

impl IntoResponse for LoginRequired {
    fn into_response(self) -> Response {
        let mut jar = CookieJar::new();
        if let Some(path) = self.return_to {
            jar = jar.add(
                Cookie::build((RETURN_TO_COOKIE, path))
                    .path("/")
                    .http_only(true)
                    .same_site(SameSite::Lax)
                    .build(),
            );
        }

        let redirect = AppError::Unauthorized("You must be logged in".to_string()).into_response();
        (jar, redirect).into_response()
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = LoginRequired;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(user.clone());
        }

        // Only pages can be reopened after login, not form submissions
        let return_to = (parts.method == Method::GET).then(|| parts.uri.path().to_string());
        Err(LoginRequired { return_to })
    }
}

/// The logged-in user, if any
pub struct CurrentUser(pub Option<AuthenticatedUser>);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<AuthenticatedUser>().cloned()))
    }
}

/// Only same-site absolute paths are followed after login
pub fn safe_return_path(path: &str) -> Option<&str> {
    (path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')).then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Router};
    use axum_test::TestServer;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Guests {
        count: u32,
    }

    async fn count_guests(AppForm(form): AppForm<Guests>) -> String {
        form.count.to_string()
    }

    #[tokio::test]
    async fn test_app_form_rejects_bad_field_with_bad_request() {
        let server = TestServer::new(Router::new().route("/", post(count_guests))).unwrap();

        let ok = server.post("/").form(&[("count", "3")]).await;
        ok.assert_status_ok();
        assert_eq!(ok.text(), "3");

        let response = server.post("/").form(&[("count", "many")]).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.text().contains("Invalid form data"));
    }

    #[test]
    fn test_safe_return_path() {
        assert_eq!(safe_return_path("/listings/new"), Some("/listings/new"));
        assert_eq!(safe_return_path("//evil.example.com"), None);
        assert_eq!(safe_return_path("https://evil.example.com"), None);
        assert_eq!(safe_return_path("/\\evil.example.com"), None);
    }
}
