//! Ad endpoints: creation by authenticated users, staff moderation.
//!
//! Listing/search is out of scope; ads are fetched by id. An ad becomes
//! publicly visible once the author keeps it active AND staff confirm it.

use crate::auth::middleware::{AdminUser, AppState, AuthUser};
use crate::config::is_valid_phone;
use crate::error::AppError;
use crate::models::{unix_now, AdInfo, CreateAdRequest, StoredAd};
use crate::storage;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

const MAX_TITLE_LEN: usize = 200;
const MAX_TEXT_LEN: usize = 10_000;

/// POST /api/ads — Create an ad (starts unconfirmed).
pub async fn create_ad(
    author: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateAdRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.title.is_empty() || req.title.len() > MAX_TITLE_LEN {
        return Err(AppError::BadRequest(format!(
            "Title must be 1-{} characters",
            MAX_TITLE_LEN
        )));
    }
    if req.text.is_empty() || req.text.len() > MAX_TEXT_LEN {
        return Err(AppError::BadRequest(format!(
            "Text must be 1-{} characters",
            MAX_TEXT_LEN
        )));
    }
    if !is_valid_phone(&req.phone) {
        return Err(AppError::BadRequest(
            "Contact phone must be E.164: '+' followed by 8-15 digits".to_string(),
        ));
    }

    let now = unix_now();
    let ad = StoredAd {
        id: nanoid::nanoid!(12),
        author_id: author.user_id.clone(),
        title: req.title,
        text: req.text,
        price: req.price,
        condition: req.condition,
        location: req.location,
        phone: req.phone,
        active: req.active,
        confirmed: false,
        created_at: now,
        modified_at: now,
    };

    let mut con = state.connection().await?;
    storage::ad::store_ad(&mut con, &ad).await?;

    tracing::info!(action = "ad_created", ad_id = %ad.id, author_id = %author.user_id, "Ad created, awaiting confirmation");

    Ok(Json(AdInfo::from(ad)))
}

/// GET /api/ads/:id — Fetch an ad.
///
/// Unconfirmed or inactive ads are only visible to their author and
/// admins; everyone else gets 404 rather than a hint that it exists.
pub async fn get_ad(
    caller: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    super::validate_id(&id, "ad ID", 12)?;

    let mut con = state.connection().await?;

    let ad = storage::ad::get_ad(&mut con, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ad not found".to_string()))?;

    let visible = ad.confirmed && ad.active;
    let privileged = caller
        .as_ref()
        .map(|c| c.is_admin || c.user_id == ad.author_id)
        .unwrap_or(false);

    if !visible && !privileged {
        return Err(AppError::NotFound("Ad not found".to_string()));
    }

    Ok(Json(AdInfo::from(ad)))
}

/// POST /api/ads/:id/confirm — Staff confirmation (admin only).
pub async fn confirm_ad(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    super::validate_id(&id, "ad ID", 12)?;

    let mut con = state.connection().await?;

    let mut ad = storage::ad::get_ad(&mut con, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ad not found".to_string()))?;

    if !ad.confirmed {
        ad.confirmed = true;
        ad.modified_at = unix_now();
        storage::ad::update_ad(&mut con, &ad).await?;
    }

    tracing::info!(action = "ad_confirmed", ad_id = %id, "Ad confirmed by staff");

    Ok(Json(AdInfo::from(ad)))
}

/// DELETE /api/ads/:id — Remove an ad (author or admin).
pub async fn delete_ad(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    super::validate_id(&id, "ad ID", 12)?;

    let mut con = state.connection().await?;

    let ad = storage::ad::get_ad(&mut con, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ad not found".to_string()))?;

    if caller.user_id != ad.author_id && !caller.is_admin {
        return Err(AppError::Forbidden(
            "Only the author or staff may delete an ad".to_string(),
        ));
    }

    storage::ad::delete_ad(&mut con, &id, &ad.author_id).await?;

    tracing::info!(action = "ad_deleted", ad_id = %id, by = %caller.user_id, "Ad deleted");

    Ok(StatusCode::NO_CONTENT)
}
