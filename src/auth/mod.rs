//! Authentication: OTP state machine, session tokens, JWT pairs, and
//! the Axum extractors that guard the API.

pub mod middleware;
pub mod otp;
pub mod session;
pub mod token;
