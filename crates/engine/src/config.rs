//! Engine configuration.
//!
//! Loaded from TOML. Every section is optional.
//!
//! # Example
//!
//! ```toml
//! utc_offset = "+02:00"
//! store_path = "herald-state.json"
//! user_id = "customer-42"
//!
//! [jit]
//! ttl = 30
//! backoff_base = 10
//! backoff_max = 600
//! current_url = "https://jit.example.com/v2/eligibility"
//! legacy_url = "https://jit.example.com/v1/eligibility"
//! # auth_token falls back to HERALD_JIT_AUTH_TOKEN
//!
//! [native]
//! platform = "ios"
//! app_version = "5.2.0"
//! installation_id = "0d6f..."
//! ```
//!
//! Durations are whole seconds.

use std::path::{Path, PathBuf};

use herald_expr::NativeAttributes;
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Duration, UtcOffset};

use crate::error::EngineError;
use crate::jit::{DeviceIds, JitSettings};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Offset for local-time rules such as quiet hours. `"+HH:MM"`,
    /// `"-HH:MM"` or `"Z"`. Defaults to UTC.
    #[serde(default)]
    pub utc_offset: Option<String>,
    /// JSON file holding tracker and JIT state. In-memory when absent.
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    /// External user id tracker rows and JIT requests are keyed by.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub jit: JitConfig,
    #[serde(default)]
    pub native: NativeAttributes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JitConfig {
    pub ttl: Option<u32>,
    pub backoff_base: Option<u32>,
    pub backoff_max: Option<u32>,
    /// Endpoint for current-format campaigns.
    pub current_url: Option<String>,
    /// Endpoint for legacy-format campaigns. Defaults to `current_url`.
    pub legacy_url: Option<String>,
    pub auth_token: Option<String>,
    /// Request timeout.
    pub timeout: Option<u32>,
}

impl EngineConfig {
    pub fn from_toml_str(src: &str) -> Result<Self, EngineError> {
        let config: EngineConfig =
            toml::from_str(src).map_err(|e| EngineError::config(e.to_string()))?;
        config.utc_offset()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::config(format!("could not read '{}': {}", path.display(), e)))?;
        Self::from_toml_str(&content).map_err(|e| match e {
            EngineError::Config { message } => {
                EngineError::config(format!("could not parse '{}': {}", path.display(), message))
            }
            other => other,
        })
    }

    pub fn utc_offset(&self) -> Result<UtcOffset, EngineError> {
        match self.utc_offset.as_deref().map(str::trim) {
            None | Some("Z") | Some("UTC") => Ok(UtcOffset::UTC),
            Some(s) => UtcOffset::parse(
                s,
                format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
            )
            .map_err(|e| EngineError::config(format!("invalid utc_offset '{}': {}", s, e))),
        }
    }

    pub fn jit_settings(&self) -> JitSettings {
        let defaults = JitSettings::default();
        let secs = |v: Option<u32>, fallback: Duration| {
            v.map(|s| Duration::seconds(s as i64)).unwrap_or(fallback)
        };
        JitSettings {
            ttl: secs(self.jit.ttl, defaults.ttl),
            backoff_base: secs(self.jit.backoff_base, defaults.backoff_base),
            backoff_max: secs(self.jit.backoff_max, defaults.backoff_max),
        }
    }

    pub fn device_ids(&self) -> DeviceIds {
        DeviceIds {
            installation_id: self.native.installation_id.clone(),
            custom_user_id: self.user_id.clone(),
        }
    }

    /// HTTP transport for the configured endpoints, if any.
    #[cfg(feature = "http")]
    pub fn http_transport(&self) -> Option<crate::jit::HttpJitTransport> {
        let current = self.jit.current_url.clone()?;
        let legacy = self.jit.legacy_url.clone().unwrap_or_else(|| current.clone());
        let transport =
            crate::jit::HttpJitTransport::new(legacy, current, self.jit.auth_token.clone());
        Some(match self.jit.timeout {
            Some(secs) => transport.with_timeout(std::time::Duration::from_secs(secs as u64)),
            None => transport,
        })
    }
}
