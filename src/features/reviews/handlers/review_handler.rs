use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppForm, AppFormRejection};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::reviews::dtos::ReviewFormDto;
use crate::features::reviews::services::ReviewService;
use crate::shared::constants::LISTING_NOT_FOUND;
use crate::shared::flash::{redirect_with_notice, Flash, Notice};

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(LISTING_NOT_FOUND.to_string()))
}

/// Add a review and go back to the listing
pub async fn create(
    State(service): State<Arc<ReviewService>>,
    user: AuthenticatedUser,
    flash: Flash,
    Path(listing_id): Path<String>,
    form: std::result::Result<AppForm<ReviewFormDto>, AppFormRejection>,
) -> Result<Response> {
    let listing_id = parse_id(&listing_id)?;
    let listing_path = format!("/listings/{}", listing_id);

    let dto = match form {
        Ok(AppForm(dto)) => dto,
        Err(rejection) => {
            tracing::debug!("Rejected review form: {}", rejection.message());
            return Ok(redirect_with_notice(
                &listing_path,
                Notice::error("Rating must be a number from 1 to 5 and a comment is required"),
            ));
        }
    };

    match service.create(listing_id, &user, dto).await {
        Ok(_) => {
            let flash = flash.push(Notice::success("New Review Created!"));
            Ok((flash, Redirect::to(&listing_path)).into_response())
        }
        Err(AppError::Validation(message)) => {
            Ok(redirect_with_notice(&listing_path, Notice::error(message)))
        }
        Err(e) => Err(e),
    }
}

/// Delete a review written by the current user
pub async fn delete(
    State(service): State<Arc<ReviewService>>,
    user: AuthenticatedUser,
    flash: Flash,
    Path((listing_id, review_id)): Path<(String, String)>,
) -> Result<Response> {
    let listing_id = parse_id(&listing_id)?;
    let listing_path = format!("/listings/{}", listing_id);
    let review_id = Uuid::parse_str(&review_id).map_err(|_| {
        AppError::NotFound("Review you requested doesn't exist!".to_string())
    })?;

    match service.delete(listing_id, review_id, &user).await {
        Ok(()) => {
            let flash = flash.push(Notice::success("Review Deleted!"));
            Ok((flash, Redirect::to(&listing_path)).into_response())
        }
        Err(AppError::Forbidden(message)) => {
            Ok(redirect_with_notice(&listing_path, Notice::error(message)))
        }
        Err(e) => Err(e),
    }
}
