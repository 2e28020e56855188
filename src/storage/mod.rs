//! Redis storage layer for users, OTP state, sessions, ads, and orders.
//!
//! All functions are async and use redis::AsyncCommands.
//! Data is serialized to JSON for storage in Redis.

pub mod ad;
pub mod order;
pub mod otp;
pub mod session;
pub mod user;

/// Wrap a serde_json error into a RedisError so storage functions keep a
/// single error type.
pub(crate) fn json_err(context: &'static str, e: impl std::fmt::Display) -> redis::RedisError {
    redis::RedisError::from((
        redis::ErrorKind::TypeError,
        context,
        e.to_string(),
    ))
}
