//! Storefront server configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax.
//! Well-known environment variables then override the file.
//!
//! # Example Configuration
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 3000
//! upstream_timeout_secs = 5
//!
//! [provider]
//! api_url = "https://api.esim-go.com/v2.4"
//! api_key = "$ESIM_GO_API_KEY"
//!
//! [payment]
//! recipient = "${X402_PAYMENT_ADDRESS}"
//! network = "devnet"
//!
//! [webhook]
//! secret = "$WEBHOOK_SECRET"
//! ```
//!
//! # Environment Variables
//!
//! - `HOST`, `PORT` - Bind address
//! - `ESIM_GO_API_URL` - Provider base URL
//! - `ESIM_GO_API_KEY` - Provider API key (required)
//! - `WEBHOOK_SECRET` - HMAC secret for usage webhooks; unset disables verification
//! - `X402_PAYMENT_ADDRESS` - Solana address advertised in payment challenges
//! - `SOLANA_NETWORK` - `devnet` or `mainnet-beta`
//! - `UPSTREAM_TIMEOUT_SECS` - Provider request timeout

use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::time::Duration;

use esim402::networks::SolanaNetwork;
use esim402_http::server::fulfillment::DEFAULT_PROVIDER_URL;
use serde::{Deserialize, Serialize};

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    /// The config file is not valid TOML for [`StoreConfig`].
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    /// An override variable holds an unusable value.
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Offending value.
        value: String,
    },
    /// No provider API key after expansion and overrides.
    #[error("ESIM_GO_API_KEY environment variable is required")]
    MissingApiKey,
}

/// Top-level server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Server bind address (default: `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Server port (default: `3000`).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Timeout for each provider request, in seconds (default: `5`).
    #[serde(default = "default_timeout_secs")]
    pub upstream_timeout_secs: u64,

    /// eSIM provider access.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Payment terms advertised in challenges.
    #[serde(default)]
    pub payment: PaymentConfig,

    /// Usage webhook settings.
    #[serde(default)]
    pub webhook: WebhookConfig,
}

/// eSIM provider connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// REST API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// API key sent as `X-API-Key`.
    #[serde(default)]
    pub api_key: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: String::new(),
        }
    }
}

/// x402 payment settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Solana address that receives payments.
    #[serde(default)]
    pub recipient: String,
    /// Cluster payments settle on.
    #[serde(default)]
    pub network: SolanaNetwork,
}

/// Usage webhook settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Shared HMAC secret. Unset or empty disables verification.
    #[serde(default)]
    pub secret: Option<String>,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

const fn default_port() -> u16 {
    3000
}

const fn default_timeout_secs() -> u64 {
    5
}

fn default_api_url() -> String {
    DEFAULT_PROVIDER_URL.to_owned()
}

impl StoreConfig {
    /// Loads configuration from `path` and the process environment.
    ///
    /// A missing file is treated as empty, so a deployment may configure the
    /// server through environment variables alone.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, an
    /// override is invalid, or no API key is configured.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Like [`load_from`](Self::load_from) with an explicit variable lookup.
    ///
    /// # Errors
    ///
    /// See [`load_from`](Self::load_from).
    pub fn load_with<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let content = if path.exists() {
            std::fs::read_to_string(path)?
        } else {
            String::new()
        };
        Self::parse_with(&content, lookup)
    }

    /// Parses TOML `content`, expanding variables and applying overrides.
    ///
    /// # Errors
    ///
    /// See [`load_from`](Self::load_from).
    pub fn parse_with<F>(content: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let expanded = expand_env_vars(content, &lookup);
        let mut config: Self = toml::from_str(&expanded)?;
        config.apply_overrides(&lookup)?;
        config.normalize();
        if config.provider.api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.host = parse_var("HOST", &host)?;
        }
        if let Some(port) = lookup("PORT") {
            self.port = parse_var("PORT", &port)?;
        }
        if let Some(secs) = lookup("UPSTREAM_TIMEOUT_SECS") {
            self.upstream_timeout_secs = parse_var("UPSTREAM_TIMEOUT_SECS", &secs)?;
        }
        if let Some(network) = lookup("SOLANA_NETWORK") {
            self.payment.network = parse_var("SOLANA_NETWORK", &network)?;
        }
        if let Some(url) = lookup("ESIM_GO_API_URL") {
            self.provider.api_url = url;
        }
        if let Some(key) = lookup("ESIM_GO_API_KEY") {
            self.provider.api_key = key;
        }
        if let Some(recipient) = lookup("X402_PAYMENT_ADDRESS") {
            self.payment.recipient = recipient;
        }
        if let Some(secret) = lookup("WEBHOOK_SECRET") {
            self.webhook.secret = Some(secret);
        }
        Ok(())
    }

    /// Trims values and drops references left unresolved by expansion.
    fn normalize(&mut self) {
        let resolved = |value: &str| {
            let value = value.trim();
            if value.starts_with('$') {
                String::new()
            } else {
                value.to_owned()
            }
        };
        self.provider.api_key = resolved(&self.provider.api_key);
        self.payment.recipient = resolved(&self.payment.recipient);
        self.webhook.secret = self
            .webhook
            .secret
            .as_deref()
            .map(resolved)
            .filter(|s| !s.is_empty());
    }

    /// Provider request timeout.
    #[must_use]
    pub const fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_owned(),
    })
}

/// Expands `$VAR` and `${VAR}` patterns in a string using `lookup`.
///
/// Unresolved variables are left as-is.
fn expand_env_vars<F>(input: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }
        let braced = chars.next_if_eq(&'{').is_some();
        let mut var_name = String::new();
        let mut closed = false;
        while let Some(&c) = chars.peek() {
            if braced && c == '}' {
                chars.next();
                closed = true;
                break;
            }
            if !braced && !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            var_name.push(c);
            chars.next();
        }

        match lookup(&var_name).filter(|_| !var_name.is_empty()) {
            Some(value) => result.push_str(&value),
            None => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&var_name);
                if closed {
                    result.push('}');
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_expand_env_vars() {
        let lookup = env(&[("A", "1"), ("LONG_NAME", "two")]);
        assert_eq!(expand_env_vars("x=$A", &lookup), "x=1");
        assert_eq!(expand_env_vars("x=${LONG_NAME}!", &lookup), "x=two!");
        assert_eq!(expand_env_vars("x=$MISSING", &lookup), "x=$MISSING");
        assert_eq!(expand_env_vars("x=${MISSING}", &lookup), "x=${MISSING}");
        assert_eq!(expand_env_vars("cost $ 5", &lookup), "cost $ 5");
    }

    #[test]
    fn test_env_only_configuration() {
        let config = StoreConfig::parse_with("", env(&[("ESIM_GO_API_KEY", "k")])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.provider.api_url, "https://api.esim-go.com/v2.4");
        assert_eq!(config.provider.api_key, "k");
        assert_eq!(config.payment.network, SolanaNetwork::Devnet);
        assert!(config.webhook.secret.is_none());
        assert_eq!(config.upstream_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_api_key_is_required() {
        let err = StoreConfig::parse_with("", env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));

        // an unresolved reference counts as missing
        let toml = "[provider]\napi_key = \"$ESIM_GO_API_KEY\"\n";
        let err = StoreConfig::parse_with(toml, env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));
    }

    #[test]
    fn test_file_values_and_expansion() {
        let toml = r#"
            port = 8080
            upstream_timeout_secs = 9

            [provider]
            api_url = "https://sandbox.example.com/v2.4"
            api_key = "${KEY}"

            [payment]
            recipient = "$ADDR"
            network = "mainnet-beta"

            [webhook]
            secret = "$SECRET"
        "#;
        let config = StoreConfig::parse_with(
            toml,
            env(&[("KEY", "abc"), ("ADDR", "shop"), ("SECRET", "s3cret")]),
        )
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.upstream_timeout_secs, 9);
        assert_eq!(config.provider.api_url, "https://sandbox.example.com/v2.4");
        assert_eq!(config.provider.api_key, "abc");
        assert_eq!(config.payment.recipient, "shop");
        assert_eq!(config.payment.network, SolanaNetwork::MainnetBeta);
        assert_eq!(config.webhook.secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_environment_overrides_file() {
        let toml = "port = 8080\n[provider]\napi_key = \"file\"\n";
        let config = StoreConfig::parse_with(
            toml,
            env(&[
                ("PORT", "9090"),
                ("HOST", "127.0.0.1"),
                ("ESIM_GO_API_KEY", "env"),
                ("SOLANA_NETWORK", "mainnet"),
                ("WEBHOOK_SECRET", ""),
            ]),
        )
        .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.provider.api_key, "env");
        assert_eq!(config.payment.network, SolanaNetwork::MainnetBeta);
        assert!(config.webhook.secret.is_none());
    }

    #[test]
    fn test_invalid_override_is_reported() {
        let err = StoreConfig::parse_with(
            "",
            env(&[("ESIM_GO_API_KEY", "k"), ("PORT", "eighty")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "PORT", .. }));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let config = StoreConfig::load_with(
            Path::new("/nonexistent/esim402/config.toml"),
            env(&[("ESIM_GO_API_KEY", "k")]),
        )
        .unwrap();
        assert_eq!(config.provider.api_key, "k");
    }
}
