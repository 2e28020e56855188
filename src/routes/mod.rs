//! API route handlers.

pub mod ad;
pub mod auth;
pub mod order;
pub mod user;

use crate::auth::middleware::AppState;
use crate::error::AppError;
use axum::{routing::get, routing::post, Router};

/// Validate that a string is a valid nanoid (alphanumeric, hyphens, underscores).
pub fn validate_id(id: &str, label: &str, expected_len: usize) -> Result<(), AppError> {
    if id.len() != expected_len
        || !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::BadRequest(format!("Invalid {} format", label)));
    }
    Ok(())
}

/// Build the API router with all endpoints.
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Token (API) auth flow
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/verify", post(auth::verify))
        .route("/api/token/refresh", post(auth::refresh))
        // Session auth flow (shares the issuance path)
        .route("/api/session/login", post(auth::login))
        .route("/api/session/verify", post(auth::session_verify))
        .route("/api/session/logout", post(auth::logout))
        // User profile (ownership-checked)
        .route(
            "/api/users",
            get(user::get_user_info).post(user::update_user_info),
        )
        // Ads and moderation
        .route("/api/ads", post(ad::create_ad))
        .route("/api/ads/{id}", get(ad::get_ad).delete(ad::delete_ad))
        .route("/api/ads/{id}/confirm", post(ad::confirm_ad))
        // Orders (ownership-checked)
        .route("/api/orders", post(order::create_order))
        .route("/api/orders/{id}", get(order::get_order))
}
