//! User profile endpoints.
//!
//! Both require the caller to own the identified record; admins may read
//! and edit anyone.

use crate::auth::middleware::{AppState, AuthUser};
use crate::config::is_valid_phone;
use crate::error::AppError;
use crate::models::{UpdateUserRequest, UserInfo, UserQuery};
use crate::storage;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};

/// Resolve `?pk=` and enforce the ownership check.
fn require_pk(query: &UserQuery, caller: &AuthUser) -> Result<String, AppError> {
    let pk = query
        .pk
        .as_deref()
        .filter(|pk| !pk.is_empty())
        .ok_or_else(|| AppError::BadRequest("send pk".to_string()))?;

    if pk != caller.user_id && !caller.is_admin {
        return Err(AppError::Forbidden(
            "You do not own this record".to_string(),
        ));
    }
    Ok(pk.to_string())
}

/// GET /api/users?pk= — Fetch a user profile (owner only).
pub async fn get_user_info(
    caller: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, AppError> {
    let pk = require_pk(&query, &caller)?;

    let mut con = state.connection().await?;

    let user = storage::user::get_user(&mut con, &pk)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("There is no user with pk {}", pk)))?;

    Ok(Json(UserInfo::from(user)))
}

/// POST /api/users?pk= — Partial update of a user profile (owner only).
pub async fn update_user_info(
    caller: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let pk = require_pk(&query, &caller)?;

    if req.phone_number.is_none() {
        return Err(AppError::BadRequest(
            "You must enter at least one field".to_string(),
        ));
    }

    let mut con = state.connection().await?;

    let mut user = storage::user::get_user(&mut con, &pk)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("There is no user with pk {}", pk)))?;
    let previous_phone = user.phone_number.clone();

    if let Some(phone) = req.phone_number {
        if !is_valid_phone(&phone) {
            return Err(AppError::BadRequest(
                "Phone number must be E.164: '+' followed by 8-15 digits".to_string(),
            ));
        }
        if phone != previous_phone {
            // Same first-writer-wins claim as registration
            if !storage::user::claim_phone(&mut con, &phone, &user.id).await? {
                return Err(AppError::BadRequest(
                    "Phone number is already registered".to_string(),
                ));
            }
            user.phone_number = phone;
        }
    }

    storage::user::update_user(&mut con, &user, &previous_phone).await?;

    // Sessions were granted to the old phone identity; drop them on change.
    if user.phone_number != previous_phone {
        storage::session::delete_user_sessions(&mut con, &user.id).await?;
    }

    tracing::info!(action = "user_updated", user_id = %user.id, "Profile updated");

    Ok(Json(serde_json::json!({"status": "Done"})))
}
