use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use minijinja::context;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{safe_return_path, AppForm, CurrentUser, RETURN_TO_COOKIE};
use crate::features::auth::dtos::{LoginFormDto, SignupFormDto};
use crate::features::auth::services::{AuthService, SessionService};
use crate::shared::flash::{redirect_with_notice, Flash, Notice};
use crate::shared::validation::validation_message;
use crate::shared::views::{self, PageContext};

/// Handler state for the auth feature
#[derive(Clone)]
pub struct AuthState {
    pub auth: Arc<AuthService>,
    pub sessions: Arc<SessionService>,
}

/// Render the signup form
pub async fn signup_form(CurrentUser(user): CurrentUser, flash: Flash) -> Result<Response> {
    let (flash, notices) = flash.take();
    let page = PageContext::new(user, notices);
    let html = views::render("users/signup.html", &page, context! {})?;
    Ok((flash, html).into_response())
}

/// Create an account and log it in
pub async fn signup(
    State(state): State<AuthState>,
    flash: Flash,
    jar: CookieJar,
    AppForm(dto): AppForm<SignupFormDto>,
) -> Result<Response> {
    if let Err(errors) = dto.validate() {
        return Ok(redirect_with_notice(
            "/signup",
            Notice::error(validation_message(&errors)),
        ));
    }

    let user = match state.auth.register(dto).await {
        Ok(user) => user,
        Err(AppError::Conflict(message)) => {
            return Ok(redirect_with_notice("/signup", Notice::error(message)));
        }
        Err(e) => return Err(e),
    };

    let jar = jar.add(state.sessions.login_cookie(&user)?);
    let flash = flash.push(Notice::success("Welcome to Wanderlust!"));
    Ok((flash, jar, Redirect::to("/listings")).into_response())
}

/// Render the login form
pub async fn login_form(CurrentUser(user): CurrentUser, flash: Flash) -> Result<Response> {
    let (flash, notices) = flash.take();
    let page = PageContext::new(user, notices);
    let html = views::render("users/login.html", &page, context! {})?;
    Ok((flash, html).into_response())
}

/// Verify credentials, then return to the page that required a login
pub async fn login(
    State(state): State<AuthState>,
    flash: Flash,
    jar: CookieJar,
    AppForm(dto): AppForm<LoginFormDto>,
) -> Result<Response> {
    if let Err(errors) = dto.validate() {
        return Ok(redirect_with_notice(
            "/login",
            Notice::error(validation_message(&errors)),
        ));
    }

    let user = match state.auth.login(dto).await {
        Ok(user) => user,
        Err(AppError::Unauthorized(message)) => {
            return Ok(redirect_with_notice("/login", Notice::error(message)));
        }
        Err(e) => return Err(e),
    };

    let destination = jar
        .get(RETURN_TO_COOKIE)
        .and_then(|cookie| safe_return_path(cookie.value()).map(str::to_string))
        .unwrap_or_else(|| "/listings".to_string());

    let jar = jar
        .remove(Cookie::build(RETURN_TO_COOKIE).path("/"))
        .add(state.sessions.login_cookie(&user)?);
    let flash = flash.push(Notice::success("Welcome back to Wanderlust!"));
    Ok((flash, jar, Redirect::to(&destination)).into_response())
}

/// Clear the session cookie
pub async fn logout(flash: Flash, jar: CookieJar) -> Response {
    let jar = jar.remove(SessionService::logout_cookie());
    let flash = flash.push(Notice::success("You are logged out!"));
    (flash, jar, Redirect::to("/listings")).into_response()
}
