//! JWT access/refresh token pairs for the stateless API flow.
//!
//! HS256 with a shared secret from config. Refresh tokens carry a `jti`
//! that is tracked in Redis (`storage::session`) so they can be revoked
//! and rotate on use.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub const KIND_ACCESS: &str = "access";
pub const KIND_REFRESH: &str = "refresh";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    /// Token id; only meaningful for refresh tokens (revocation key).
    pub jti: String,
    /// "access" or "refresh".
    pub kind: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// jti of the refresh token, for the Redis revocation record.
    pub refresh_jti: String,
}

/// Mint an access/refresh pair for a user.
pub fn mint_pair(
    secret: &str,
    user_id: &str,
    now: u64,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
) -> Result<TokenPair, jsonwebtoken::errors::Error> {
    let key = EncodingKey::from_secret(secret.as_bytes());

    let access_claims = Claims {
        sub: user_id.to_string(),
        jti: nanoid::nanoid!(16),
        kind: KIND_ACCESS.to_string(),
        iat: now,
        exp: now + access_ttl_secs,
    };
    let refresh_jti = nanoid::nanoid!(16);
    let refresh_claims = Claims {
        sub: user_id.to_string(),
        jti: refresh_jti.clone(),
        kind: KIND_REFRESH.to_string(),
        iat: now,
        exp: now + refresh_ttl_secs,
    };

    Ok(TokenPair {
        access_token: encode(&Header::default(), &access_claims, &key)?,
        refresh_token: encode(&Header::default(), &refresh_claims, &key)?,
        refresh_jti,
    })
}

/// Decode and validate a token of the expected kind.
///
/// Returns None on any failure: bad signature, expired, wrong kind.
pub fn decode_token(secret: &str, token: &str, expected_kind: &str) -> Option<Claims> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let data = decode::<Claims>(token, &key, &Validation::default()).ok()?;
    if data.claims.kind != expected_kind {
        return None;
    }
    Some(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::unix_now;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_mint_and_decode_pair() {
        let now = unix_now();
        let pair = mint_pair(SECRET, "user-1", now, 900, 86_400).unwrap();

        let access = decode_token(SECRET, &pair.access_token, KIND_ACCESS).unwrap();
        assert_eq!(access.sub, "user-1");
        assert_eq!(access.exp, now + 900);

        let refresh = decode_token(SECRET, &pair.refresh_token, KIND_REFRESH).unwrap();
        assert_eq!(refresh.sub, "user-1");
        assert_eq!(refresh.jti, pair.refresh_jti);
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let pair = mint_pair(SECRET, "user-1", unix_now(), 900, 86_400).unwrap();
        assert!(decode_token(SECRET, &pair.access_token, KIND_REFRESH).is_none());
        assert!(decode_token(SECRET, &pair.refresh_token, KIND_ACCESS).is_none());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let pair = mint_pair(SECRET, "user-1", unix_now(), 900, 86_400).unwrap();
        assert!(decode_token("another-secret-another-secret-xx", &pair.access_token, KIND_ACCESS)
            .is_none());
    }

    #[test]
    fn test_expired_token_rejected() {
        // Issued far in the past; default validation has 60s leeway.
        let now = unix_now() - 10_000;
        let pair = mint_pair(SECRET, "user-1", now, 900, 900).unwrap();
        assert!(decode_token(SECRET, &pair.access_token, KIND_ACCESS).is_none());
    }

    #[test]
    fn test_refresh_jtis_are_unique() {
        let now = unix_now();
        let a = mint_pair(SECRET, "user-1", now, 900, 86_400).unwrap();
        let b = mint_pair(SECRET, "user-1", now, 900, 86_400).unwrap();
        assert_ne!(a.refresh_jti, b.refresh_jti);
    }
}
