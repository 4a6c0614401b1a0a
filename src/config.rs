//! Runtime configuration.
//!
//! Tries multiple locations in order:
//! 1. WOLFIES_BROADCAST_CONFIG env var
//! 2. ~/.wolfies-broadcast/config.json
//! 3. Built-in defaults
//!
//! Every field is optional in the file. CLI flags override file values.
//!
//! CHANGELOG:
//! - 10/15/2026 - Country plan moved into config
//! - 10/14/2026 - Initial implementation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::batch::BatchOptions;
use crate::contacts::CountryPlan;
use crate::delivery::DeliveryOptions;
use crate::pacing::Pacer;
use crate::policy::SkipPolicy;

/// Env var pointing at a config file.
pub const CONFIG_ENV: &str = "WOLFIES_BROADCAST_CONFIG";

/// Default bridge socket (tilde-expanded at use).
pub const DEFAULT_SOCKET: &str = "~/.wolfies-broadcast/bridge.sock";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub send_timeout_ms: u64,
    pub verify_delay_ms: u64,
    pub retry_delay_ms: u64,
    pub max_verify_retries: u32,
    pub skip_verify: bool,
    pub check_already_sent: bool,
    pub skip_if_ever_sent: bool,
    pub force: bool,
    pub socket_path: String,
    /// Bridge request timeout for non-send calls.
    pub bridge_timeout_ms: u64,
    pub country: CountryPlan,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 4_000,
            max_delay_ms: 12_000,
            send_timeout_ms: 30_000,
            verify_delay_ms: 2_000,
            retry_delay_ms: 2_000,
            max_verify_retries: 2,
            skip_verify: false,
            check_already_sent: true,
            skip_if_ever_sent: true,
            force: false,
            socket_path: DEFAULT_SOCKET.to_string(),
            bridge_timeout_ms: 60_000,
            country: CountryPlan::default(),
        }
    }
}

/// Default config path, if one exists.
pub fn default_config_path() -> Option<PathBuf> {
    // 1. Check env var
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    // 2. Try ~/.wolfies-broadcast/config.json
    let home_path = dirs::home_dir()?.join(".wolfies-broadcast").join("config.json");
    home_path.exists().then_some(home_path)
}

impl BroadcastConfig {
    /// Load config from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))
    }

    /// Load from the default location, or built-in defaults when there is none.
    pub fn load_default() -> Result<Self> {
        match default_config_path() {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::load(path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Socket path with `~` expanded.
    pub fn socket_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.socket_path).to_string())
    }

    pub fn bridge_timeout(&self) -> Duration {
        Duration::from_millis(self.bridge_timeout_ms)
    }

    pub fn skip_policy(&self) -> SkipPolicy {
        SkipPolicy::from_flags(self.force, self.skip_if_ever_sent)
    }

    pub fn delivery_options(&self) -> DeliveryOptions {
        DeliveryOptions {
            send_timeout: Duration::from_millis(self.send_timeout_ms),
            verify_delay: Duration::from_millis(self.verify_delay_ms),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            max_verify_retries: self.max_verify_retries,
            check_already_sent: self.check_already_sent,
        }
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            pacer: Pacer::new(self.min_delay_ms, self.max_delay_ms),
            delivery: self.delivery_options(),
            skip_verify: self.skip_verify,
            skip_policy: self.skip_policy(),
            country: self.country.clone(),
        }
    }
}
