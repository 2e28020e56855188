//! Request and response models for the API.
//!
//! All models use serde for serialization/deserialization.
//! Storage models represent Redis data structures.

use serde::{Deserialize, Serialize};

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// A returning user gets the "welcome back" greeting after this long away.
pub const WELCOME_BACK_AFTER_SECS: u64 = 30 * 86_400;

// ============================================================================
// Storage Models
// ============================================================================

/// User data as stored in Redis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUser {
    pub id: String,
    pub phone_number: String, // E.164
    pub is_admin: bool,
    /// Unix seconds of the last successful verification, None before first login.
    pub last_login: Option<u64>,
    pub created_at: u64,
}

impl StoredUser {
    /// Greeting shown on successful login, derived from the previous
    /// `last_login` value. First login and long-absent users get one;
    /// recently active users get none.
    pub fn welcome_message(&self, now: u64) -> Option<&'static str> {
        match self.last_login {
            None => Some("Welcome to our site."),
            Some(last) if now.saturating_sub(last) >= WELCOME_BACK_AFTER_SECS => {
                Some("Welcome back to our site")
            }
            Some(_) => None,
        }
    }
}

/// Per-user OTP verification state, keyed `otp:{user_id}`.
///
/// Created empty alongside the user and mutated only through the
/// `auth::otp` state machine plus the versioned write in `storage::otp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpState {
    /// Active code value; None when empty or consumed.
    pub code: Option<String>,
    /// When the active code was issued (unix seconds).
    pub issued_at: Option<u64>,
    /// When the active code stops being accepted. None means no code
    /// was ever issued (or the last one was consumed).
    pub expires_at: Option<u64>,
    /// Issuances within the current rate-limit window.
    pub attempt_count: u32,
    /// Optimistic-concurrency stamp, bumped on every persisted write.
    pub version: u64,
}

impl OtpState {
    pub fn empty() -> Self {
        OtpState {
            code: None,
            issued_at: None,
            expires_at: None,
            attempt_count: 0,
            version: 0,
        }
    }
}

/// Session data as stored in Redis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub user_id: String,
    pub created_at: u64,
}

/// Refresh-token record, keyed `refresh:{jti}`. Deleted on rotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRefresh {
    pub jti: String,
    pub user_id: String,
    pub created_at: u64,
}

/// Product condition declared by the seller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    NeedRepair,
    Worked,
    LikeNew,
    New,
}

/// Ad data as stored in Redis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAd {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub text: String,
    pub price: String,
    pub condition: Condition,
    pub location: String,
    pub phone: String,
    /// Set by the author; an inactive ad is hidden from everyone else.
    pub active: bool,
    /// Set by staff; unconfirmed ads are visible only to author and admins.
    pub confirmed: bool,
    pub created_at: u64,
    pub modified_at: u64,
}

/// Order data as stored in Redis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredOrder {
    pub id: String,
    pub customer_id: String,
    pub ad_id: String,
    pub created_at: u64,
}

// ============================================================================
// Auth Models
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub phone_number: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub phone_number: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: String,
}

/// Body for both `POST /api/verify` and `POST /api/session/verify`.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub user_id: String,
    pub code: Option<String>,
    #[serde(default)]
    pub send_again: bool,
}

/// Successful token-flow verification.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Successful session-flow verification.
#[derive(Debug, Serialize)]
pub struct SessionVerifyResponse {
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
}

// ============================================================================
// User Models
// ============================================================================

/// `?pk=` query on the user endpoints.
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub pk: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: String,
    pub phone_number: String,
    pub is_admin: bool,
    pub last_login: Option<u64>,
    pub created_at: u64,
}

impl From<StoredUser> for UserInfo {
    fn from(user: StoredUser) -> Self {
        UserInfo {
            id: user.id,
            phone_number: user.phone_number,
            is_admin: user.is_admin,
            last_login: user.last_login,
            created_at: user.created_at,
        }
    }
}

/// Partial update; every field optional, at least one required.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub phone_number: Option<String>,
}

// ============================================================================
// Ad Models
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateAdRequest {
    pub title: String,
    pub text: String,
    pub price: String,
    pub condition: Condition,
    pub location: String,
    pub phone: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct AdInfo {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub text: String,
    pub price: String,
    pub condition: Condition,
    pub location: String,
    pub phone: String,
    pub active: bool,
    pub confirmed: bool,
    pub created_at: u64,
    pub modified_at: u64,
}

impl From<StoredAd> for AdInfo {
    fn from(ad: StoredAd) -> Self {
        AdInfo {
            id: ad.id,
            author_id: ad.author_id,
            title: ad.title,
            text: ad.text,
            price: ad.price,
            condition: ad.condition,
            location: ad.location,
            phone: ad.phone,
            active: ad.active,
            confirmed: ad.confirmed,
            created_at: ad.created_at,
            modified_at: ad.modified_at,
        }
    }
}

// ============================================================================
// Order Models
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub ad_id: String,
}

#[derive(Debug, Serialize)]
pub struct OrderInfo {
    pub id: String,
    pub customer_id: String,
    pub ad_id: String,
    pub created_at: u64,
}

impl From<StoredOrder> for OrderInfo {
    fn from(order: StoredOrder) -> Self {
        OrderInfo {
            id: order.id,
            customer_id: order.customer_id,
            ad_id: order.ad_id,
            created_at: order.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_last_login(last_login: Option<u64>) -> StoredUser {
        StoredUser {
            id: "u1".to_string(),
            phone_number: "+989121234567".to_string(),
            is_admin: false,
            last_login,
            created_at: 0,
        }
    }

    #[test]
    fn test_welcome_message_first_login() {
        let user = user_with_last_login(None);
        assert_eq!(user.welcome_message(1_000), Some("Welcome to our site."));
    }

    #[test]
    fn test_welcome_message_returning_after_month() {
        let now = 100 * 86_400;
        let user = user_with_last_login(Some(now - WELCOME_BACK_AFTER_SECS));
        assert_eq!(user.welcome_message(now), Some("Welcome back to our site"));
    }

    #[test]
    fn test_welcome_message_recent_login() {
        let now = 100 * 86_400;
        let user = user_with_last_login(Some(now - 3_600));
        assert_eq!(user.welcome_message(now), None);
    }

    #[test]
    fn test_condition_serde_round_trip() {
        let json = serde_json::to_string(&Condition::NeedRepair).unwrap();
        assert_eq!(json, "\"need_repair\"");
        let parsed: Condition = serde_json::from_str("\"like_new\"").unwrap();
        assert_eq!(parsed, Condition::LikeNew);
    }

    #[test]
    fn test_verify_request_send_again_defaults_false() {
        let req: VerifyRequest =
            serde_json::from_str(r#"{"user_id": "abc", "code": "123456"}"#).unwrap();
        assert!(!req.send_again);
        assert_eq!(req.code.as_deref(), Some("123456"));
    }

    #[test]
    fn test_verify_response_omits_empty_message() {
        let resp = VerifyResponse {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            message: None,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("message").is_none());
    }
}
