use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Redirect, Response},
};
use minijinja::context;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::core::extractor::CurrentUser;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::listings::dtos::{ListingChanges, ListingFields, ListingView};
use crate::features::listings::services::ListingService;
use crate::modules::storage::{ImageRef, ImageStore, ImageUpload};
use crate::shared::constants::{EDIT_PREVIEW_WIDTH, LISTING_NOT_FOUND, PLACEHOLDER_IMAGE_FILENAME};
use crate::shared::flash::{redirect_with_notice, Flash, Notice};
use crate::shared::views::{self, PageContext};

/// Handler state for the listings feature
#[derive(Clone)]
pub struct ListingsState {
    pub listings: Arc<ListingService>,
    /// `None` when the image store is not configured
    pub images: Option<Arc<dyn ImageStore>>,
    /// Public Mapbox token for the show-page map
    pub map_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct MapSettings {
    enabled: bool,
    token: Option<String>,
}

/// Raw multipart submission of the new/edit listing forms
#[derive(Debug, Default)]
struct ListingForm {
    title: Option<String>,
    description: Option<String>,
    price: Option<String>,
    location: Option<String>,
    country: Option<String>,
    image: Option<(Vec<u8>, String)>,
}

impl ListingForm {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            debug!("Failed to read multipart field: {}", e);
            AppError::BadRequest(format!("Failed to read form data: {}", e))
        })? {
            let name = field.name().unwrap_or("").to_string();

            if name == "image" {
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let data = field.bytes().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read image data: {}", e))
                })?;
                // Browsers send an empty part when no file was chosen
                if !data.is_empty() {
                    form.image = Some((data.to_vec(), content_type));
                }
                continue;
            }

            let slot = match name.as_str() {
                "title" => &mut form.title,
                "description" => &mut form.description,
                "price" => &mut form.price,
                "location" => &mut form.location,
                "country" => &mut form.country,
                _ => {
                    debug!("Ignoring unknown field: {}", name);
                    continue;
                }
            };
            let text = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read field {}: {}", name, e)))?;
            *slot = Some(text);
        }

        Ok(form)
    }

    fn has_fields(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.price.is_some()
            || self.location.is_some()
            || self.country.is_some()
    }

    /// Fields of a new listing. Missing text fields count as empty.
    fn into_fields(self) -> Result<(ListingFields, Option<(Vec<u8>, String)>)> {
        let price = parse_price(self.price.as_deref().unwrap_or(""))?;
        let fields = ListingFields {
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            price,
            location: self.location.unwrap_or_default(),
            country: self.country.unwrap_or_default(),
        };
        Ok((fields, self.image))
    }

    /// Changes of an edit. `None` when neither a listing field nor an
    /// image was sent.
    fn into_changes(self) -> Result<(Option<ListingChanges>, Option<(Vec<u8>, String)>)> {
        if !self.has_fields() {
            let changes = self.image.as_ref().map(|_| ListingChanges::default());
            return Ok((changes, self.image));
        }

        let price = match self.price.as_deref() {
            Some(price) => Some(parse_price(price)?),
            None => None,
        };
        let changes = ListingChanges {
            title: self.title,
            description: self.description,
            price,
            location: self.location,
            country: self.country,
        };
        Ok((Some(changes), self.image))
    }
}

fn parse_price(raw: &str) -> Result<Decimal> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|_| AppError::Validation("Price must be a number".to_string()))
}

fn parse_listing_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(LISTING_NOT_FOUND.to_string()))
}

/// Form errors send the user back to the form with a notice
fn back_to_form(path: &str, error: AppError) -> Result<Response> {
    match error {
        AppError::Validation(message) => Ok(redirect_with_notice(path, Notice::error(message))),
        other => Err(other),
    }
}

/// Store an uploaded image, if any
async fn store_image(
    state: &ListingsState,
    upload: Option<(Vec<u8>, String)>,
) -> Result<Option<ImageRef>> {
    let Some((data, content_type)) = upload else {
        return Ok(None);
    };

    let store = state
        .images
        .as_ref()
        .ok_or_else(|| AppError::Validation("Image uploads are not configured".to_string()))?;

    let upload = ImageUpload::new(data, &content_type)?;
    store.store(upload).await.map(Some)
}

/// Best-effort removal of an image the listing no longer references
async fn discard_image(state: &ListingsState, image: &ImageRef) {
    if image.filename == PLACEHOLDER_IMAGE_FILENAME {
        return;
    }
    if let Some(store) = &state.images {
        if let Err(e) = store.delete(&image.filename).await {
            tracing::warn!("Failed to delete image '{}': {}", image.filename, e);
        }
    }
}

fn render_page(
    template: &str,
    user: Option<AuthenticatedUser>,
    flash: Flash,
    data: minijinja::Value,
) -> Result<Response> {
    let (flash, notices) = flash.take();
    let page = PageContext::new(user, notices);
    let html = views::render(template, &page, data)?;
    Ok((flash, html).into_response())
}

/// All listings
pub async fn index(
    State(state): State<ListingsState>,
    CurrentUser(user): CurrentUser,
    flash: Flash,
) -> Result<Response> {
    let listings: Vec<ListingView> = state
        .listings
        .index()
        .await?
        .into_iter()
        .map(ListingView::from)
        .collect();

    render_page(
        "listings/index.html",
        user,
        flash,
        context! { listings => listings },
    )
}

/// New listing form
pub async fn new_form(
    State(state): State<ListingsState>,
    user: AuthenticatedUser,
    flash: Flash,
) -> Result<Response> {
    render_page(
        "listings/new.html",
        Some(user),
        flash,
        context! { uploads_enabled => state.images.is_some() },
    )
}

/// Create a listing from the multipart form
pub async fn create(
    State(state): State<ListingsState>,
    user: AuthenticatedUser,
    flash: Flash,
    multipart: Multipart,
) -> Result<Response> {
    const FORM: &str = "/listings/new";

    let (fields, upload) = match ListingForm::read(multipart).await?.into_fields() {
        Ok(parsed) => parsed,
        Err(e) => return back_to_form(FORM, e),
    };

    // Reject before anything is uploaded
    if let Err(e) = ListingService::check_fields(&fields) {
        return back_to_form(FORM, e);
    }

    let image = match store_image(&state, upload).await {
        Ok(image) => image,
        Err(e) => return back_to_form(FORM, e),
    };

    match state.listings.create_listing(user.id, fields, image.clone()).await {
        Ok(outcome) => Ok((flash.push(outcome.notice), Redirect::to("/listings")).into_response()),
        Err(e) => {
            if let Some(image) = &image {
                discard_image(&state, image).await;
            }
            back_to_form(FORM, e)
        }
    }
}

/// Listing page with owner, reviews and map
pub async fn show(
    State(state): State<ListingsState>,
    CurrentUser(user): CurrentUser,
    flash: Flash,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = parse_listing_id(&id)?;
    let details = state.listings.show(id).await?;

    let is_owner = user.as_ref().is_some_and(|u| u.is(details.listing.owner_id));
    let has_geometry = details.listing.geometry.is_some();
    let mut listing = ListingView::from(details.listing);
    listing.owner_username = Some(details.owner_username);

    let map = MapSettings {
        enabled: has_geometry && state.map_token.is_some(),
        token: state.map_token.clone(),
    };

    render_page(
        "listings/show.html",
        user,
        flash,
        context! {
            listing => listing,
            reviews => details.reviews,
            is_owner => is_owner,
            map => map,
        },
    )
}

/// Edit form with a preview of the current image
pub async fn edit_form(
    State(state): State<ListingsState>,
    user: AuthenticatedUser,
    flash: Flash,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = parse_listing_id(&id)?;
    let listing = state.listings.ensure_owner(id, &user).await?;
    let preview_image_url = listing.image.url.clone();

    render_page(
        "listings/edit.html",
        Some(user),
        flash,
        context! {
            listing => ListingView::from(listing),
            preview_image_url => preview_image_url,
            preview_width => EDIT_PREVIEW_WIDTH,
            uploads_enabled => state.images.is_some(),
        },
    )
}

/// Apply an edit from the multipart form
pub async fn update(
    State(state): State<ListingsState>,
    user: AuthenticatedUser,
    flash: Flash,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Response> {
    let id = parse_listing_id(&id)?;
    let previous = state.listings.ensure_owner(id, &user).await?;
    let form_path = format!("/listings/{}/edit", id);

    let (changes, upload) = match ListingForm::read(multipart).await?.into_changes() {
        Ok(parsed) => parsed,
        Err(e) => return back_to_form(&form_path, e),
    };

    if let Some(changes) = &changes {
        if let Err(e) = ListingService::check_changes(changes) {
            return back_to_form(&form_path, e);
        }
    }

    let image = match store_image(&state, upload).await {
        Ok(image) => image,
        Err(e) => return back_to_form(&form_path, e),
    };

    match state.listings.update_listing(id, changes, image.clone()).await {
        Ok(outcome) => {
            if image.is_some() {
                discard_image(&state, &previous.image).await;
            }
            let to = format!("/listings/{}", outcome.listing.id);
            Ok((flash.push(outcome.notice), Redirect::to(&to)).into_response())
        }
        Err(e) => {
            if let Some(image) = &image {
                discard_image(&state, image).await;
            }
            back_to_form(&form_path, e)
        }
    }
}

/// Delete a listing and its reviews
pub async fn delete(
    State(state): State<ListingsState>,
    user: AuthenticatedUser,
    flash: Flash,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = parse_listing_id(&id)?;
    state.listings.ensure_owner(id, &user).await?;

    let deleted = state.listings.delete(id).await?;
    discard_image(&state, &deleted.image).await;

    let flash = flash.push(Notice::success("Listing Deleted!"));
    Ok((flash, Redirect::to("/listings")).into_response())
}
