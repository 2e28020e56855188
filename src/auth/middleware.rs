//! Axum extractors for authentication and rate limiting.

use crate::auth::token;
use crate::config::Config;
use crate::error::AppError;
use crate::storage;
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};
use redis::AsyncCommands;
use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub redis: redis::Client,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, AppError> {
        self.redis
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Redis connection error: {}", e)))
    }
}

/// Authenticated caller extractor.
///
/// Accepts `Authorization: Bearer {token}` where the token is either an
/// opaque session token (session flow, looked up in Redis) or a JWT access
/// token (API flow). Returns 401 Unauthorized if missing or invalid.
pub struct AuthUser {
    pub user_id: String,
    pub is_admin: bool,
    /// Raw bearer value; used by logout to drop the session record.
    pub token: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Invalid authorization format".to_string()))?
            .to_string();

        let mut con = state.connection().await?;

        // Session token first (session flow), then JWT access token (API flow).
        let user_id = match storage::session::get_session(&mut con, &token).await? {
            Some(session) => session.user_id,
            None => {
                let claims =
                    token::decode_token(&state.config.jwt_secret, &token, token::KIND_ACCESS)
                        .ok_or_else(|| {
                            AppError::Unauthorized("Invalid or expired token".to_string())
                        })?;
                claims.sub
            }
        };

        let user = storage::user::get_user(&mut con, &user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Unknown user".to_string()))?;

        Ok(AuthUser {
            user_id: user.id,
            is_admin: user.is_admin,
            token,
        })
    }
}

/// Optional authenticated caller (`Option<AuthUser>` in handlers).
///
/// Some(AuthUser) if a valid bearer is present, None otherwise.
/// Does not fail the request if auth is missing or invalid.
impl OptionalFromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(
            <AuthUser as FromRequestParts<AppState>>::from_request_parts(parts, state)
                .await
                .ok(),
        )
    }
}

/// Admin-only extractor. Returns 403 Forbidden for non-staff callers.
pub struct AdminUser(pub AuthUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user =
            <AuthUser as FromRequestParts<AppState>>::from_request_parts(parts, state).await?;

        if !user.is_admin {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }

        Ok(AdminUser(user))
    }
}

/// Check a per-IP rate limit using Redis INCR with TTL.
///
/// Separate from the per-user OTP attempt cap: this one throttles raw
/// request volume before any user state is touched.
///
/// Returns `Ok(true)` if under limit, `Ok(false)` if exceeded.
pub async fn check_rate_limit<C>(
    con: &mut C,
    key: &str,
    max: u32,
    window_secs: u64,
) -> Result<bool, redis::RedisError>
where
    C: AsyncCommands,
{
    let count: u32 = con.incr(key, 1).await?;

    // Window starts on the first request
    if count == 1 {
        con.expire::<_, ()>(key, window_secs as i64).await?;
    }

    Ok(count <= max)
}
