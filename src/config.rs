/*
 * Responsibility
 * - Process-wide settings (RPC endpoint, registry contract, broker name, token age)
 * - Loaded once at startup; everything downstream receives plain values
 */
use std::fmt;

use crate::error::SsoError;

pub const DEFAULT_CLIENT_URL: &str = "http://localhost:8545";
pub const DEFAULT_BROKER_NAME: &str = "Hades";
pub const DEFAULT_TOKEN_MAX_AGE_SECONDS: i64 = 30;

#[derive(Debug)]
pub enum ConfigError {
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Settings handed to the registry lookup collaborator at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryConfig {
    pub client_url: String,
    pub contract_address: String,
    // Name the broker's signing address is registered under.
    pub broker_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SdkConfig {
    pub client_url: String,
    pub registry_contract_address: String,
    pub broker_name: String,
    pub token_max_age_seconds: i64,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            client_url: DEFAULT_CLIENT_URL.to_string(),
            registry_contract_address: String::new(),
            broker_name: DEFAULT_BROKER_NAME.to_string(),
            token_max_age_seconds: DEFAULT_TOKEN_MAX_AGE_SECONDS,
        }
    }
}

impl SdkConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup (env, file, test map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let client_url = lookup("SILKEY_CLIENT_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.client_url);
        url::Url::parse(&client_url).map_err(|_| ConfigError::Invalid("SILKEY_CLIENT_URL"))?;

        let registry_contract_address = lookup("SILKEY_REGISTRY_CONTRACT_ADDRESS")
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        let broker_name = lookup("SILKEY_BROKER_NAME")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.broker_name);

        let token_max_age_seconds = match lookup("SILKEY_TOKEN_MAX_AGE_SECONDS") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|v| *v >= 0)
                .ok_or(ConfigError::Invalid("SILKEY_TOKEN_MAX_AGE_SECONDS"))?,
            None => defaults.token_max_age_seconds,
        };

        Ok(Self {
            client_url,
            registry_contract_address,
            broker_name,
            token_max_age_seconds,
        })
    }

    pub fn registry(&self) -> RegistryConfig {
        RegistryConfig {
            client_url: self.client_url.clone(),
            contract_address: self.registry_contract_address.clone(),
            broker_name: self.broker_name.clone(),
        }
    }
}

impl From<ConfigError> for SsoError {
    fn from(e: ConfigError) -> Self {
        SsoError::Registry(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = SdkConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, SdkConfig::default());
        assert_eq!(config.registry().broker_name, "Hades");
    }

    #[test]
    fn reads_overrides() {
        let config = SdkConfig::from_lookup(lookup_from(&[
            ("SILKEY_CLIENT_URL", "https://rpc.example.org"),
            ("SILKEY_REGISTRY_CONTRACT_ADDRESS", "0xabc"),
            ("SILKEY_BROKER_NAME", "Broker"),
            ("SILKEY_TOKEN_MAX_AGE_SECONDS", "10"),
        ]))
        .unwrap();

        assert_eq!(config.client_url, "https://rpc.example.org");
        assert_eq!(config.registry_contract_address, "0xabc");
        assert_eq!(config.broker_name, "Broker");
        assert_eq!(config.token_max_age_seconds, 10);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = SdkConfig::from_lookup(lookup_from(&[
            ("SILKEY_CLIENT_URL", "  "),
            ("SILKEY_BROKER_NAME", ""),
        ]))
        .unwrap();

        assert_eq!(config.client_url, DEFAULT_CLIENT_URL);
        assert_eq!(config.broker_name, DEFAULT_BROKER_NAME);
        assert_eq!(config.registry_contract_address, "");
    }

    #[test]
    fn rejects_bad_values() {
        let err = SdkConfig::from_lookup(lookup_from(&[("SILKEY_TOKEN_MAX_AGE_SECONDS", "-1")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("SILKEY_TOKEN_MAX_AGE_SECONDS")));

        let err = SdkConfig::from_lookup(lookup_from(&[("SILKEY_CLIENT_URL", "not a url")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("SILKEY_CLIENT_URL")));
    }
}
