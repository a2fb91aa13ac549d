//! HTML rendering with minijinja.
//!
//! Templates live in `templates/` and are compiled into the binary so the
//! server does not depend on its working directory.

use std::sync::OnceLock;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use minijinja::{context, Environment, Value};
use serde::Serialize;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::shared::flash::{Notice, Severity};

/// Global template environment
static TEMPLATE_ENV: OnceLock<Environment<'static>> = OnceLock::new();

const TEMPLATES: &[(&str, &str)] = &[
    ("layout.html", include_str!("../../templates/layout.html")),
    ("home.html", include_str!("../../templates/home.html")),
    ("error.html", include_str!("../../templates/error.html")),
    (
        "listings/index.html",
        include_str!("../../templates/listings/index.html"),
    ),
    (
        "listings/show.html",
        include_str!("../../templates/listings/show.html"),
    ),
    (
        "listings/new.html",
        include_str!("../../templates/listings/new.html"),
    ),
    (
        "listings/edit.html",
        include_str!("../../templates/listings/edit.html"),
    ),
    (
        "users/signup.html",
        include_str!("../../templates/users/signup.html"),
    ),
    (
        "users/login.html",
        include_str!("../../templates/users/login.html"),
    ),
];

fn init_environment() -> Environment<'static> {
    let mut env = Environment::new();
    for (name, source) in TEMPLATES {
        if let Err(e) = env.add_template(name, source) {
            tracing::warn!("Failed to load template {}: {}", name, e);
        }
    }
    env
}

fn get_environment() -> &'static Environment<'static> {
    TEMPLATE_ENV.get_or_init(init_environment)
}

/// Notices grouped by severity, in the order the layout displays them
#[derive(Debug, Default, Serialize)]
pub struct NoticeGroups {
    pub success: Vec<String>,
    pub info: Vec<String>,
    pub warning: Vec<String>,
    pub error: Vec<String>,
}

impl From<Vec<Notice>> for NoticeGroups {
    fn from(notices: Vec<Notice>) -> Self {
        let mut groups = Self::default();
        for notice in notices {
            let bucket = match notice.severity {
                Severity::Success => &mut groups.success,
                Severity::Info => &mut groups.info,
                Severity::Warning => &mut groups.warning,
                Severity::Error => &mut groups.error,
            };
            bucket.push(notice.message);
        }
        groups
    }
}

/// Data every page layout needs
#[derive(Debug, Default, Serialize)]
pub struct PageContext {
    pub current_user: Option<AuthenticatedUser>,
    pub notices: NoticeGroups,
}

impl PageContext {
    pub fn new(current_user: Option<AuthenticatedUser>, notices: Vec<Notice>) -> Self {
        Self {
            current_user,
            notices: notices.into(),
        }
    }
}

/// Render a page template. `data` is merged into the template context next
/// to `page`.
pub fn render(template_name: &str, page: &PageContext, data: Value) -> Result<Html<String>> {
    let template = get_environment()
        .get_template(template_name)
        .map_err(|_| AppError::Internal(format!("Template '{}' not found", template_name)))?;

    template
        .render(context! { page => page, ..data })
        .map(Html)
        .map_err(|e| AppError::Internal(format!("Failed to render {}: {}", template_name, e)))
}

/// Render the generic error page. Falls back to plain text if rendering fails.
pub fn render_error(status: StatusCode, message: &str) -> Response {
    let page = PageContext::default();
    let data = context! { status => status.as_u16(), message => message };

    match render("error.html", &page, data) {
        Ok(html) => (status, html).into_response(),
        Err(e) => {
            tracing::error!("Failed to render error page: {}", e);
            (status, message.to_string()).into_response()
        }
    }
}
