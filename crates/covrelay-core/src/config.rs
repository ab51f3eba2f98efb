//! Relay configuration.
//!
//! A relay is bootstrapped from a TOML document:
//!
//! ```toml
//! local_chain = 1
//! local_endpoint = "0x1111111111111111111111111111111111111111"
//! admin = "0xadadadadadadadadadadadadadadadadadadadad"
//! window_secs = 3600
//! default_rate_limit = 100
//!
//! [[chains]]
//! destination = 137
//! remote_endpoint = "0x2222222222222222222222222222222222222222"
//! rate_limit = 50
//!
//! [[roles]]
//! account = "0x3333333333333333333333333333333333333333"
//! capabilities = ["bridge_admin", "emergency"]
//! ```
//!
//! Every key except `local_chain` and `local_endpoint` is optional. Unknown
//! keys are rejected.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::access::Capability;
use crate::constants::{DEFAULT_RATE_LIMIT, DEFAULT_SIGNAL_CAPACITY, DEFAULT_WINDOW_SECS};
use crate::registry::RateLimitPolicy;
use crate::types::{Address, DestinationId};

/// Top-level relay configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Chain this relay runs on.
    pub local_chain: DestinationId,

    /// This relay's endpoint address, stamped as the origin of every
    /// envelope it seals.
    pub local_endpoint: Address,

    /// Identity that receives every capability at startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<Address>,

    /// Rate-limit window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Limit applied when a destination is enabled with a limit of zero.
    #[serde(default = "default_rate_limit")]
    pub default_rate_limit: u32,

    /// Number of signals retained before the oldest are dropped.
    #[serde(default = "default_signal_capacity")]
    pub signal_capacity: usize,

    /// Destinations enabled at startup.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chains: Vec<ChainSeed>,

    /// Role grants applied at startup.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<RoleSeed>,
}

/// A destination enabled at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainSeed {
    /// The destination.
    pub destination: DestinationId,

    /// Its remote endpoint.
    pub remote_endpoint: Address,

    /// Its limit; zero or absent selects `default_rate_limit`.
    #[serde(default)]
    pub rate_limit: u32,
}

/// A set of capabilities granted at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleSeed {
    /// Receiving identity.
    pub account: Address,

    /// Capabilities to grant.
    pub capabilities: Vec<Capability>,
}

const fn default_window_secs() -> u64 {
    DEFAULT_WINDOW_SECS
}

const fn default_rate_limit() -> u32 {
    DEFAULT_RATE_LIMIT
}

const fn default_signal_capacity() -> usize {
    DEFAULT_SIGNAL_CAPACITY
}

impl RelayConfig {
    /// Minimal configuration with defaults for everything optional.
    #[must_use]
    pub const fn new(local_chain: DestinationId, local_endpoint: Address) -> Self {
        Self {
            local_chain,
            local_endpoint,
            admin: None,
            window_secs: DEFAULT_WINDOW_SECS,
            default_rate_limit: DEFAULT_RATE_LIMIT,
            signal_capacity: DEFAULT_SIGNAL_CAPACITY,
            chains: Vec::new(),
            roles: Vec::new(),
        }
    }

    /// Loads and validates configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails
    /// [`RelayConfig::validate`].
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The rate-limit policy described by this configuration.
    #[must_use]
    pub const fn rate_limit_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            window_secs: self.window_secs,
            default_limit: self.default_rate_limit,
        }
    }

    /// Checks cross-field constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.local_chain.is_zero() {
            return Err(ConfigError::validation("local_chain must be non-zero"));
        }
        if self.local_endpoint.is_zero() {
            return Err(ConfigError::validation("local_endpoint must be non-zero"));
        }
        if self.admin.is_some_and(|admin| admin.is_zero()) {
            return Err(ConfigError::validation("admin must be non-zero"));
        }
        if self.window_secs == 0 {
            return Err(ConfigError::validation("window_secs must be positive"));
        }
        if self.default_rate_limit == 0 {
            return Err(ConfigError::validation("default_rate_limit must be positive"));
        }
        if self.signal_capacity == 0 {
            return Err(ConfigError::validation("signal_capacity must be positive"));
        }

        let mut seen = HashSet::new();
        for seed in &self.chains {
            if seed.destination.is_zero() {
                return Err(ConfigError::validation("chain destination must be non-zero"));
            }
            if seed.destination == self.local_chain {
                return Err(ConfigError::validation(format!(
                    "chain {} is the local chain",
                    seed.destination
                )));
            }
            if seed.remote_endpoint.is_zero() {
                return Err(ConfigError::validation(format!(
                    "chain {} has a zero remote_endpoint",
                    seed.destination
                )));
            }
            if !seen.insert(seed.destination) {
                return Err(ConfigError::validation(format!(
                    "chain {} is listed twice",
                    seed.destination
                )));
            }
        }

        for seed in &self.roles {
            if seed.account.is_zero() {
                return Err(ConfigError::validation("role account must be non-zero"));
            }
            if seed.capabilities.is_empty() {
                return Err(ConfigError::validation(format!(
                    "role entry for {} grants nothing",
                    seed.account
                )));
            }
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// I/O error reading the configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Validation error.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl ConfigError {
    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const SAMPLE: &str = r#"
local_chain = 1
local_endpoint = "0x1111111111111111111111111111111111111111"
admin = "0xadadadadadadadadadadadadadadadadadadadad"
window_secs = 600

[[chains]]
destination = 137
remote_endpoint = "0x2222222222222222222222222222222222222222"
rate_limit = 50

[[chains]]
destination = 56
remote_endpoint = "0x4444444444444444444444444444444444444444"

[[roles]]
account = "0x3333333333333333333333333333333333333333"
capabilities = ["bridge_admin", "emergency"]
"#;

    #[test]
    fn test_parse_sample() {
        let config = RelayConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.local_chain, DestinationId::new(1));
        assert_eq!(config.admin, Some(Address::repeat_byte(0xad)));
        assert_eq!(config.window_secs, 600);
        assert_eq!(config.default_rate_limit, DEFAULT_RATE_LIMIT);
        assert_eq!(config.signal_capacity, DEFAULT_SIGNAL_CAPACITY);
        assert_eq!(config.chains.len(), 2);
        assert_eq!(config.chains[1].rate_limit, 0);
        assert_eq!(
            config.roles[0].capabilities,
            vec![Capability::BridgeAdmin, Capability::Emergency]
        );
        assert_eq!(config.rate_limit_policy().window_secs, 600);
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = RelayConfig::from_toml(
            r#"
local_chain = 9
local_endpoint = "0x0101010101010101010101010101010101010101"
"#,
        )
        .unwrap();
        assert_eq!(
            config,
            RelayConfig::new(DestinationId::new(9), Address::repeat_byte(1))
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = RelayConfig::from_toml(
            r#"
local_chain = 9
local_endpoint = "0x0101010101010101010101010101010101010101"
sliding_window = true
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_malformed_address_rejected() {
        let err = RelayConfig::from_toml(
            r#"
local_chain = 9
local_endpoint = "0x0101"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_failures() {
        let base = RelayConfig::new(DestinationId::new(1), Address::repeat_byte(1));

        let mut config = base.clone();
        config.window_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = base.clone();
        config.chains.push(ChainSeed {
            destination: DestinationId::new(1),
            remote_endpoint: Address::repeat_byte(2),
            rate_limit: 0,
        });
        assert!(config.validate().is_err());

        let mut config = base.clone();
        let seed = ChainSeed {
            destination: DestinationId::new(2),
            remote_endpoint: Address::repeat_byte(2),
            rate_limit: 0,
        };
        config.chains.push(seed.clone());
        config.chains.push(seed);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("listed twice"));

        let mut config = base.clone();
        config.roles.push(RoleSeed {
            account: Address::repeat_byte(3),
            capabilities: Vec::new(),
        });
        assert!(config.validate().is_err());

        let mut config = base;
        config.local_endpoint = Address::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = RelayConfig::from_toml(SAMPLE).unwrap();
        let text = config.to_toml().unwrap();
        assert_eq!(RelayConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = RelayConfig::from_file(file.path()).unwrap();
        assert_eq!(config.chains[0].destination, DestinationId::new(137));

        let missing = file.path().with_extension("missing");
        assert!(matches!(
            RelayConfig::from_file(&missing),
            Err(ConfigError::Io(_))
        ));
    }
}
