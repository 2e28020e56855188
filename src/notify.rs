//! Out-of-band code delivery stub.
//!
//! Actual SMS delivery is an external collaborator; the core only produces
//! the code. The original implementation printed the code to stdout, so the
//! stub logs it at info level where an operator (or an integration test
//! reading the state store) can see it.

/// Hand a freshly issued code to the delivery channel.
pub fn deliver_code(phone: &str, code: &str) {
    tracing::info!(action = "otp_delivery", phone = %phone, code = %code, "OTP code ready for delivery");
}
