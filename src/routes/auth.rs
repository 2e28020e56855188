//! Auth API endpoints: registration, OTP login/verify for both the
//! token (JWT) flow and the session flow, logout, and refresh.

use crate::auth::middleware::{check_rate_limit, AppState, AuthUser};
use crate::auth::session::generate_session_token;
use crate::auth::{otp, token};
use crate::config::is_valid_phone;
use crate::error::AppError;
use crate::models::{
    unix_now, LoginRequest, LoginResponse, OtpState, RefreshRequest, RefreshResponse,
    RegisterRequest, RegisterResponse, SessionVerifyResponse, StoredRefresh, StoredSession,
    StoredUser, VerifyRequest, VerifyResponse,
};
use crate::{notify, storage};
use axum::{
    extract::{ConnectInfo, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;

/// Throttle an auth endpoint by caller IP before touching user state.
async fn throttle_by_ip(
    state: &AppState,
    con: &mut redis::aio::MultiplexedConnection,
    endpoint: &'static str,
    addr: SocketAddr,
) -> Result<(), AppError> {
    let rate_limit_key = format!("ratelimit:{}:{}", endpoint, addr.ip());
    let allowed = check_rate_limit(
        con,
        &rate_limit_key,
        state.config.rate_limit_login_per_min,
        60,
    )
    .await
    .map_err(|e| AppError::Internal(format!("Rate limit check failed: {}", e)))?;

    if !allowed {
        let mut hasher = std::hash::DefaultHasher::new();
        addr.ip().hash(&mut hasher);
        let ip_hash = format!("{:x}", hasher.finish());
        tracing::warn!(action = "rate_limited", endpoint = endpoint, ip_hash = %ip_hash, "Rate limit exceeded");
        return Err(AppError::RateLimited);
    }
    Ok(())
}

/// Issue a fresh code for the user, subject to the per-user attempt cap,
/// and hand it to the delivery stub. The issuance write goes through the
/// versioned CAS so concurrent resends serialize.
async fn issue_code(
    state: &AppState,
    con: &mut redis::aio::MultiplexedConnection,
    user: &StoredUser,
) -> Result<(), AppError> {
    let now = unix_now();
    let window = state.config.otp_ttl_secs;
    let max_attempts = state.config.otp_max_attempts;
    let code_len = state.config.otp_code_length;

    let committed = storage::otp::update_state(con, &user.id, |otp_state: &mut OtpState| {
        if !otp::can_issue(otp_state, now, window, max_attempts) {
            return Err(AppError::MaxOtpTry);
        }
        otp::issue(otp_state, otp::generate_code(code_len), now, window);
        Ok(())
    })
    .await??;

    let code = committed.code.as_deref().unwrap_or_default();
    notify::deliver_code(&user.phone_number, code);

    tracing::info!(
        action = "otp_issued",
        user_id = %user.id,
        attempt = committed.attempt_count,
        "Verification code issued"
    );

    Ok(())
}

/// Map a state-machine rejection onto the API error payloads.
fn map_verify_error(err: otp::VerifyError) -> AppError {
    match err {
        otp::VerifyError::NoActiveCode => AppError::NoActiveCode,
        otp::VerifyError::WrongCode => AppError::WrongCode,
        otp::VerifyError::Expired => AppError::CodeExpired,
    }
}

/// Consume the submitted code and, on success, stamp `last_login`.
///
/// The consumed (reset) state is persisted via CAS before any credential is
/// minted by the caller, so a verified code can never be replayed. Returns
/// the welcome message derived from the previous `last_login`.
async fn consume_code(
    state: &AppState,
    con: &mut redis::aio::MultiplexedConnection,
    user: &StoredUser,
    submitted: &str,
) -> Result<Option<String>, AppError> {
    let now = unix_now();

    storage::otp::update_state(con, &user.id, |otp_state: &mut OtpState| {
        otp::verify(otp_state, submitted, now).map_err(map_verify_error)
    })
    .await??;

    let message = user.welcome_message(now).map(str::to_string);

    let mut updated = user.clone();
    updated.last_login = Some(now);
    storage::user::update_user(con, &updated, &user.phone_number).await?;

    tracing::info!(action = "otp_verified", user_id = %user.id, "User authenticated");

    Ok(message)
}

/// POST /api/register — Create a user for a phone number.
///
/// The empty OTP state is initialized in the same step (explicit part of
/// the user-creation workflow, not a side effect).
pub async fn register(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut con = state.connection().await?;
    throttle_by_ip(&state, &mut con, "register", addr).await?;

    if !is_valid_phone(&req.phone_number) {
        return Err(AppError::BadRequest(
            "Phone number must be E.164: '+' followed by 8-15 digits".to_string(),
        ));
    }

    let user = StoredUser {
        id: nanoid::nanoid!(12),
        phone_number: req.phone_number,
        is_admin: false,
        last_login: None,
        created_at: unix_now(),
    };

    // First writer wins the phone claim; concurrent registrations of the
    // same number resolve here, not at a separate existence check.
    if !storage::user::claim_phone(&mut con, &user.phone_number, &user.id).await? {
        return Err(AppError::BadRequest(
            "Phone number is already registered".to_string(),
        ));
    }

    storage::user::store_user(&mut con, &user).await?;
    storage::otp::init_state(&mut con, &user.id).await?;

    tracing::info!(action = "user_registered", user_id = %user.id, "New user registered");

    Ok(Json(RegisterResponse { user_id: user.id }))
}

/// POST /api/login and /api/session/login — Issue a verification code.
///
/// Both flows share the issuance path; they diverge at verification
/// (JWT pair vs stored session).
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut con = state.connection().await?;
    throttle_by_ip(&state, &mut con, "login", addr).await?;

    if !is_valid_phone(&req.phone_number) {
        return Err(AppError::BadRequest(
            "Phone number must be E.164: '+' followed by 8-15 digits".to_string(),
        ));
    }

    let user = storage::user::get_user_by_phone(&mut con, &req.phone_number)
        .await?
        .ok_or_else(|| AppError::BadRequest("Unknown phone number".to_string()))?;

    issue_code(&state, &mut con, &user).await?;

    Ok(Json(LoginResponse { user_id: user.id }))
}

/// Resolve the user for a verify request; bad ids surface as the
/// field-keyed `user_id` error.
async fn verify_target(
    con: &mut redis::aio::MultiplexedConnection,
    user_id: &str,
) -> Result<StoredUser, AppError> {
    if user_id.is_empty() || user_id.len() > 64 {
        return Err(AppError::InvalidUserId);
    }
    storage::user::get_user(con, user_id)
        .await?
        .ok_or(AppError::InvalidUserId)
}

/// Handle `send_again`: reissue for a user who already has issuance history.
///
/// A user who never created a code gets the `authentication` error, like
/// a verify without one.
async fn send_again(
    state: &AppState,
    con: &mut redis::aio::MultiplexedConnection,
    user: &StoredUser,
) -> Result<(), AppError> {
    let otp_state = storage::otp::get_state(con, &user.id).await?;
    match otp_state {
        Some(ref s) if s.expires_at.is_some() => issue_code(state, con, user).await,
        _ => Err(AppError::NoActiveCode),
    }
}

/// POST /api/verify — Token flow: verify code, mint JWT pair.
pub async fn verify(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut con = state.connection().await?;
    let user = verify_target(&mut con, &req.user_id).await?;

    if req.send_again {
        send_again(&state, &mut con, &user).await?;
        return Ok(Json(serde_json::json!({"send_again": "Done"})).into_response());
    }

    let code = req
        .code
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Code is required".to_string()))?;

    let message = consume_code(&state, &mut con, &user, code).await?;

    let now = unix_now();
    let pair = token::mint_pair(
        &state.config.jwt_secret,
        &user.id,
        now,
        state.config.access_token_ttl_secs,
        state.config.refresh_token_ttl_secs,
    )
    .map_err(|e| AppError::Internal(format!("Token minting failed: {}", e)))?;

    let refresh = StoredRefresh {
        jti: pair.refresh_jti.clone(),
        user_id: user.id.clone(),
        created_at: now,
    };
    storage::session::store_refresh(&mut con, &refresh, state.config.refresh_token_ttl_secs)
        .await?;

    Ok(Json(VerifyResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        message,
    })
    .into_response())
}

/// POST /api/session/verify — Session flow: verify code, create a session.
pub async fn session_verify(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut con = state.connection().await?;
    let user = verify_target(&mut con, &req.user_id).await?;

    if req.send_again {
        send_again(&state, &mut con, &user).await?;
        return Ok(Json(serde_json::json!({"send_again": "Done"})).into_response());
    }

    let code = req
        .code
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Code is required".to_string()))?;

    let message = consume_code(&state, &mut con, &user, code).await?;

    let session = StoredSession {
        token: generate_session_token(),
        user_id: user.id.clone(),
        created_at: unix_now(),
    };
    storage::session::store_session(&mut con, &session, state.config.session_ttl_secs).await?;

    Ok(Json(SessionVerifyResponse {
        token: session.token,
        message,
    })
    .into_response())
}

/// POST /api/session/logout — Invalidate the current session.
pub async fn logout(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let mut con = state.connection().await?;

    storage::session::delete_session(&mut con, &user.token, &user.user_id).await?;

    tracing::info!(action = "logout", user_id = %user.user_id, "User logged out");

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/token/refresh — Rotate a refresh token into a new pair.
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let claims = token::decode_token(
        &state.config.jwt_secret,
        &req.refresh_token,
        token::KIND_REFRESH,
    )
    .ok_or_else(|| AppError::Unauthorized("Invalid or expired refresh token".to_string()))?;

    let mut con = state.connection().await?;

    // Single-use: a revoked or already-rotated token has no record.
    let record = storage::session::take_refresh(&mut con, &claims.jti)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Refresh token has been revoked".to_string()))?;

    if record.user_id != claims.sub {
        return Err(AppError::Unauthorized("Refresh token mismatch".to_string()));
    }

    let now = unix_now();
    let pair = token::mint_pair(
        &state.config.jwt_secret,
        &record.user_id,
        now,
        state.config.access_token_ttl_secs,
        state.config.refresh_token_ttl_secs,
    )
    .map_err(|e| AppError::Internal(format!("Token minting failed: {}", e)))?;

    let refresh = StoredRefresh {
        jti: pair.refresh_jti.clone(),
        user_id: record.user_id.clone(),
        created_at: now,
    };
    storage::session::store_refresh(&mut con, &refresh, state.config.refresh_token_ttl_secs)
        .await?;

    tracing::info!(action = "token_refreshed", user_id = %record.user_id, "Refresh token rotated");

    Ok(Json(RefreshResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}
