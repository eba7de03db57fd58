//! Broker public key discovery.
//!
//! The broker's current signing address lives in an on-chain name → address registry. This
//! module only defines the lookup seam and the checks around it; the RPC transport is plugged in
//! by the integrator. Callers should cache the resolved address across verifications.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::config::RegistryConfig;
use crate::error::{Result, SsoError};
use crate::services::hex_codec::{add_0x, address_valid};

/// Read-only name → address lookup.
pub trait Registry: Send + Sync {
    fn get_address(&self, name: &str) -> Result<String>;
}

/// Fixed registry, for pinned deployments and tests.
#[derive(Clone, Debug, Default)]
pub struct StaticRegistry {
    entries: HashMap<String, String>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, name: impl Into<String>, address: impl Into<String>) -> Self {
        self.entries.insert(name.into(), address.into());
        self
    }
}

impl Registry for StaticRegistry {
    fn get_address(&self, name: &str) -> Result<String> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| SsoError::Registry(format!("`{}` is not registered", name)))
    }
}

pub struct BrokerKeyResolver<R: Registry> {
    registry: R,
    config: RegistryConfig,
}

impl<R: Registry> BrokerKeyResolver<R> {
    pub fn new(registry: R, config: RegistryConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Current broker signing address, `0x`-prefixed.
    pub fn fetch_broker_address(&self) -> Result<String> {
        let raw = self.registry.get_address(&self.config.broker_name)?;
        let address = add_0x(raw.trim());

        if !address_valid(&address) {
            warn!(
                name = %self.config.broker_name,
                contract = %self.config.contract_address,
                address = %address,
                "registry returned an invalid broker address"
            );
            return Err(SsoError::InvalidAddress(address));
        }

        info!(name = %self.config.broker_name, address = %address, "resolved broker address");
        Ok(address)
    }
}
