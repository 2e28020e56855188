use std::env;
use std::net::SocketAddr;

#[derive(Clone)]
pub struct Config {
    // Admin identity
    pub admin_phone: String,

    // Redis
    pub redis_url: String,

    // Server
    pub bind_addr: SocketAddr,

    // Token signing
    pub jwt_secret: String,

    // TTLs (in seconds)
    pub session_ttl_secs: u64,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,

    // OTP policy
    pub otp_ttl_secs: u64,
    pub otp_max_attempts: u32,
    pub otp_code_length: usize,

    // Rate limiting
    pub rate_limit_login_per_min: u32,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("admin_phone", &"[REDACTED]")
            .field("redis_url", &"[REDACTED]")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"[REDACTED]")
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("refresh_token_ttl_secs", &self.refresh_token_ttl_secs)
            .field("otp_ttl_secs", &self.otp_ttl_secs)
            .field("otp_max_attempts", &self.otp_max_attempts)
            .field("otp_code_length", &self.otp_code_length)
            .field("rate_limit_login_per_min", &self.rate_limit_login_per_min)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

/// Check that a phone number is plausible E.164: leading `+` followed by
/// 8-15 digits. Full parsing is an external concern.
pub fn is_valid_phone(phone: &str) -> bool {
    let Some(digits) = phone.strip_prefix('+') else {
        return false;
    };
    (8..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file, but don't fail if it doesn't exist
        // (env vars may be set directly in production)
        let _ = dotenvy::dotenv();

        // Admin identity - ADMIN_PHONE is required
        let admin_phone = env::var("ADMIN_PHONE")
            .map_err(|_| ConfigError::MissingVar("ADMIN_PHONE".to_string()))?;

        if !is_valid_phone(&admin_phone) {
            return Err(ConfigError::InvalidValue(
                "ADMIN_PHONE".to_string(),
                "must be E.164: '+' followed by 8-15 digits".to_string(),
            ));
        }

        // Redis — required to prevent silent unauthenticated connections
        let redis_url =
            env::var("REDIS_URL").map_err(|_| ConfigError::MissingVar("REDIS_URL".to_string()))?;

        // Token signing key — required, never defaulted
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| ConfigError::MissingVar("JWT_SECRET".to_string()))?;
        if jwt_secret.len() < 32 {
            return Err(ConfigError::InvalidValue(
                "JWT_SECRET".to_string(),
                "must be at least 32 bytes".to_string(),
            ));
        }

        // Server
        let bind_addr_str = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_addr = bind_addr_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::ParseError("BIND_ADDR".to_string(), e.to_string()))?;

        // TTLs
        let session_ttl_secs = parse_env_or_default("SESSION_TTL_SECS", 86_400)?;
        let access_token_ttl_secs = parse_env_or_default("ACCESS_TOKEN_TTL_SECS", 900)?;
        let refresh_token_ttl_secs = parse_env_or_default("REFRESH_TOKEN_TTL_SECS", 1_209_600)?;

        // OTP policy: the code TTL doubles as the issuance rate-limit window
        let otp_ttl_secs = parse_env_or_default("OTP_TTL_SECS", 600)?;
        let otp_max_attempts = parse_env_or_default("OTP_MAX_ATTEMPTS", 3)?;
        let otp_code_length = parse_env_or_default("OTP_CODE_LENGTH", 6)?;
        if otp_code_length < 4 || otp_code_length > 10 {
            return Err(ConfigError::InvalidValue(
                "OTP_CODE_LENGTH".to_string(),
                "must be between 4 and 10".to_string(),
            ));
        }

        // Rate limiting
        let rate_limit_login_per_min = parse_env_or_default("RATE_LIMIT_LOGIN_PER_MIN", 5)?;

        Ok(Config {
            admin_phone,
            redis_url,
            bind_addr,
            jwt_secret,
            session_ttl_secs,
            access_token_ttl_secs,
            refresh_token_ttl_secs,
            otp_ttl_secs,
            otp_max_attempts,
            otp_code_length,
            rate_limit_login_per_min,
        })
    }
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}
