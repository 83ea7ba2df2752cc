//! Runtime configuration, loadable from JSON. Every field has a default, so an
//! empty object `{}` is a valid configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{DurationSeconds, serde_as};

use crate::{definitions::KeyRole, retry::RetryPolicy};

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeyStoreConfig {
    /// Keys kept per role, the current one included
    pub max_keys: usize,
    /// Lifetime of a freshly generated key
    #[serde_as(as = "DurationSeconds<u64>")]
    pub key_ttl: Duration,
    /// Age after which `rotate_or_create` replaces a still valid key
    #[serde_as(as = "DurationSeconds<u64>")]
    pub rotation_interval: Duration,
    /// Minimum time between two rotations triggered by owner activity
    #[serde_as(as = "DurationSeconds<u64>")]
    pub rotation_check_interval: Duration,
    pub rsa_key_bits: usize,
}

impl Default for KeyStoreConfig {
    fn default() -> Self {
        Self {
            max_keys: 2,
            key_ttl: Duration::from_secs(24 * 60 * 60),
            rotation_interval: Duration::from_secs(12 * 60 * 60),
            rotation_check_interval: Duration::from_secs(15 * 60),
            rsa_key_bits: 2048,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RemoteKeyCacheConfig {
    /// Whether a cache miss may call the remote public key endpoint
    pub allow_fetch: bool,
}

impl Default for RemoteKeyCacheConfig {
    fn default() -> Self {
        Self { allow_fetch: true }
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub keys: KeyStoreConfig,
    pub remote_keys: RemoteKeyCacheConfig,
    pub retry: RetryPolicy,
    /// Role of the recipient key connection requests are encrypted to.
    /// Requests encrypted to the online key can only be read after the
    /// recipient owner logged in at least once.
    pub request_key_role: KeyRole,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keys: KeyStoreConfig::default(),
            remote_keys: RemoteKeyCacheConfig::default(),
            retry: RetryPolicy::default(),
            request_key_role: KeyRole::Online,
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, crate::Error> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.keys.max_keys == 0 {
            return Err(crate::Error::InvalidOperation(
                "max_keys must be at least 1".to_string(),
            ));
        }

        if self.keys.key_ttl.is_zero() {
            return Err(crate::Error::InvalidOperation(
                "key_ttl must be positive".to_string(),
            ));
        }

        if self.request_key_role == KeyRole::Signing {
            return Err(crate::Error::InvalidOperation(
                "connection requests cannot be encrypted to a signing key".to_string(),
            ));
        }

        Ok(())
    }
}
