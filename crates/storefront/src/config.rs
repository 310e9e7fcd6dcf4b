//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string for the session store
//!   (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_SESSION_SECRET` - Cookie signing secret (min 64 chars, high entropy)
//! - `ATELIER_BACKEND_URL` - Base URL of the Atelier backend API
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_TOKEN_TTL_MINUTES` - Lifetime of a stored bearer token (default: 120)
//! - `STOREFRONT_TOKEN_CHECK_SECS` - Minimum time between token checks against
//!   `/protected` on page loads (default: 60)
//! - `STOREFRONT_RATE_LIMIT_AUTH` - Rate limit `/auth/*` per client IP (default: true)
//! - `ATELIER_BACKEND_TIMEOUT_SECS` - Backend request timeout (default: 10)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

/// Signed cookies need a 64 byte key.
const MIN_SESSION_SECRET_LENGTH: usize = 64;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "insert",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` URL of the session store (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Cookie signing secret
    pub session_secret: SecretString,
    /// How long a bearer token stays usable after login
    pub token_ttl: Duration,
    /// How often a page load re-checks the token with the backend
    pub token_check_interval: Duration,
    /// Whether `/auth/*` is rate limited
    pub rate_limit_auth: bool,
    /// Backend API configuration
    pub backend: BackendConfig,
    /// Error tracking configuration
    pub sentry: SentryConfig,
}

/// Where and how to reach the Atelier backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL, always ending in `/` so endpoint paths can be joined onto it
    pub base_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
}

/// Sentry settings. Tracking is off when `dsn` is `None`.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the session secret fails validation (length, placeholder, entropy).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        let session_secret = get_validated_secret("STOREFRONT_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;
        let token_ttl_minutes: u64 = parse_env("STOREFRONT_TOKEN_TTL_MINUTES", "120")?;
        let token_check_secs: u64 = parse_env("STOREFRONT_TOKEN_CHECK_SECS", "60")?;
        let rate_limit_auth = parse_env("STOREFRONT_RATE_LIMIT_AUTH", "true")?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            token_ttl: Duration::from_secs(token_ttl_minutes * 60),
            token_check_interval: Duration::from_secs(token_check_secs),
            rate_limit_auth,
            backend: BackendConfig::from_env()?,
            sentry: SentryConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl BackendConfig {
    /// Load the backend settings on their own (also used by the CLI).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `ATELIER_BACKEND_URL` is missing or not a URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = get_required_env("ATELIER_BACKEND_URL")?;
        let base_url = normalize_base_url(&raw)
            .map_err(|e| ConfigError::InvalidEnvVar("ATELIER_BACKEND_URL".to_string(), e))?;
        let timeout_secs: u64 = parse_env("ATELIER_BACKEND_TIMEOUT_SECS", "10")?;

        Ok(Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Build a config for a known URL with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns a message if `raw` is not an absolute http(s) URL.
    pub fn for_url(raw: &str) -> Result<Self, String> {
        Ok(Self {
            base_url: normalize_base_url(raw)?,
            timeout: Duration::from_secs(10),
        })
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, using `default` when it is unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a base URL and make sure its path ends with `/`.
///
/// `Url::join` replaces the last path segment unless the base ends with a
/// slash, so `http://api/v1` + `products` would become `http://api/products`.
fn normalize_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_bounds() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("zzzzzz") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("q8$Lw2!vN7@rK4#t") > 3.3);
    }

    #[test]
    fn test_placeholder_secret_rejected() {
        let err = validate_secret_strength("changeme-changeme-changeme", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_low_entropy_secret_rejected() {
        assert!(validate_secret_strength(&"ab".repeat(40), "TEST_VAR").is_err());
    }

    #[test]
    fn test_random_secret_accepted() {
        assert!(validate_secret_strength("q8$Lw2!vN7@rK4#tZ1&mB6^pD3*hF9(j", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_session_secret_length() {
        let short = SecretString::from("k".repeat(63));
        assert!(validate_session_secret(&short, "TEST_SESSION").is_err());
        let long = SecretString::from("k".repeat(64));
        assert!(validate_session_secret(&long, "TEST_SESSION").is_ok());
    }

    #[test]
    fn test_normalize_base_url_adds_trailing_slash() {
        let url = normalize_base_url("http://localhost:3001/api").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3001/api/");
        assert_eq!(
            url.join("products/3").unwrap().as_str(),
            "http://localhost:3001/api/products/3"
        );

        let root = normalize_base_url("https://backend.example.org").unwrap();
        assert_eq!(root.as_str(), "https://backend.example.org/");
    }

    #[test]
    fn test_normalize_base_url_rejects_other_schemes() {
        assert!(normalize_base_url("ftp://files.example.org").is_err());
        assert!(normalize_base_url("not a url").is_err());
    }

    #[test]
    fn test_socket_addr_and_https() {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/atelier"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "https://shop.atelier.test".to_string(),
            session_secret: SecretString::from("k".repeat(64)),
            token_ttl: Duration::from_secs(60),
            token_check_interval: Duration::from_secs(60),
            rate_limit_auth: true,
            backend: BackendConfig::for_url("http://localhost:3001").unwrap(),
            sentry: SentryConfig::default(),
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(config.is_https());
    }
}
