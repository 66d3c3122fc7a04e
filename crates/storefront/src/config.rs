//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `GOLD_API_URL` - Spot price feed endpoint
//! - `GOLD_API_KEY` - Spot price feed access key
//! - `STRIPE_SECRET_KEY` - Payment processor secret key
//! - `STRIPE_WEBHOOK_SECRET` - Payment webhook signing secret
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `GOLD_API_PROVIDER` - Spot feed provider, `goldapi` or `metalsapi` (default: metalsapi)
//! - `CHECKOUT_ID_VERIFY_THRESHOLD_USD` - Identity gate threshold; unset or 0 disables the gate
//! - `CHECKOUT_ENABLE_ACH` - Offer ACH alongside card payments (default: false)
//! - `STRIPE_API_BASE` - Payment API base URL (default: <https://api.stripe.com>)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
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
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
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
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Spot price feed configuration
    pub spot: SpotFeedConfig,
    /// Payment processor configuration
    pub payments: PaymentConfig,
    /// High-value orders at or above this subtotal require identity
    /// verification before checkout; `None` disables the gate
    pub identity_threshold_usd: Option<f64>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Spot price feed provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotProvider {
    /// goldapi.io response shape: `{ price, timestamp }`
    GoldApi,
    /// metals-api.com response shape: `{ rates: { USD }, timestamp }`
    MetalsApi,
}

impl SpotProvider {
    /// Provider name as reported in the spot payload.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GoldApi => "goldapi",
            Self::MetalsApi => "metalsapi",
        }
    }
}

impl std::fmt::Display for SpotProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpotProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "goldapi" => Ok(Self::GoldApi),
            "metalsapi" => Ok(Self::MetalsApi),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

/// Spot price feed configuration.
///
/// Implements `Debug` manually to redact the access key.
#[derive(Clone)]
pub struct SpotFeedConfig {
    /// Which upstream feed supplies the price
    pub provider: SpotProvider,
    /// Feed endpoint URL
    pub url: String,
    /// Feed access key
    pub api_key: SecretString,
}

impl std::fmt::Debug for SpotFeedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotFeedConfig")
            .field("provider", &self.provider)
            .field("url", &self.url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Payment processor configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct PaymentConfig {
    /// REST API base URL (overridable for testing)
    pub api_base: String,
    /// Secret API key (server-side only)
    pub secret_key: SecretString,
    /// Webhook signing secret
    pub webhook_secret: SecretString,
    /// Offer ACH (bank debit) alongside card payments
    pub enable_ach: bool,
}

impl std::fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("api_base", &self.api_base)
            .field("secret_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("enable_ach", &self.enable_ach)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;
        let session_secret = get_validated_secret("STOREFRONT_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        let spot = SpotFeedConfig::from_env()?;
        let payments = PaymentConfig::from_env()?;
        let identity_threshold_usd = parse_identity_threshold()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            host,
            port,
            base_url,
            session_secret,
            spot,
            payments,
            identity_threshold_usd,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl SpotFeedConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let provider = get_env_or_default("GOLD_API_PROVIDER", "metalsapi")
            .parse::<SpotProvider>()
            .map_err(|e| ConfigError::InvalidEnvVar("GOLD_API_PROVIDER".to_string(), e))?;

        Ok(Self {
            provider,
            url: get_required_env("GOLD_API_URL")?,
            api_key: get_required_secret("GOLD_API_KEY")?,
        })
    }
}

impl PaymentConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_base: get_env_or_default("STRIPE_API_BASE", "https://api.stripe.com"),
            secret_key: get_validated_secret("STRIPE_SECRET_KEY")?,
            webhook_secret: get_validated_secret("STRIPE_WEBHOOK_SECRET")?,
            enable_ach: get_env_or_default("CHECKOUT_ENABLE_ACH", "false") == "true",
        })
    }
}

/// Parse the identity gate threshold. Unset, empty, or non-positive disables
/// the gate (matching the checkout contract).
fn parse_identity_threshold() -> Result<Option<f64>, ConfigError> {
    let Some(raw) = get_optional_env("CHECKOUT_ID_VERIFY_THRESHOLD_USD") else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let value = raw.parse::<f64>().map_err(|e| {
        ConfigError::InvalidEnvVar("CHECKOUT_ID_VERIFY_THRESHOLD_USD".to_string(), e.to_string())
    })?;
    Ok((value > 0.0).then_some(value))
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
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
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
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
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_high() {
        // Random-looking string should have high entropy
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        // High-entropy random string
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        let result = validate_session_secret(&secret, "TEST_SESSION");
        assert!(result.is_err());
    }

    #[test]
    fn test_spot_provider_parse() {
        assert_eq!("goldapi".parse::<SpotProvider>().unwrap(), SpotProvider::GoldApi);
        assert_eq!(
            "metalsapi".parse::<SpotProvider>().unwrap(),
            SpotProvider::MetalsApi
        );
        assert!("kitco".parse::<SpotProvider>().is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            spot: SpotFeedConfig {
                provider: SpotProvider::MetalsApi,
                url: "https://metals-api.test/v1/latest".to_string(),
                api_key: SecretString::from("key"),
            },
            payments: PaymentConfig {
                api_base: "https://api.stripe.com".to_string(),
                secret_key: SecretString::from("sk_test"),
                webhook_secret: SecretString::from("whsec_test"),
                enable_ach: false,
            },
            identity_threshold_usd: None,
            sentry_dsn: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_config_debug_redacts_secrets() {
        let spot = SpotFeedConfig {
            provider: SpotProvider::GoldApi,
            url: "https://goldapi.test/XAU/USD".to_string(),
            api_key: SecretString::from("super_private_feed_key"),
        };
        let payments = PaymentConfig {
            api_base: "https://api.stripe.com".to_string(),
            secret_key: SecretString::from("sk_live_super_private"),
            webhook_secret: SecretString::from("whsec_super_private"),
            enable_ach: true,
        };

        let debug_output = format!("{spot:?} {payments:?}");

        // Public fields should be visible
        assert!(debug_output.contains("goldapi.test"));
        assert!(debug_output.contains("api.stripe.com"));

        // Secret fields should be redacted
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_private_feed_key"));
        assert!(!debug_output.contains("sk_live_super_private"));
        assert!(!debug_output.contains("whsec_super_private"));
    }
}
