use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::AsymmetricKeyPair;

/// Ordered key pairs of one role; the first entry is the current key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsymmetricKeySet {
    keys: Vec<AsymmetricKeyPair>,
}

impl AsymmetricKeySet {
    pub fn current(&self) -> Option<&AsymmetricKeyPair> {
        self.keys.first()
    }

    pub fn find(&self, crc32: u32) -> Option<&AsymmetricKeyPair> {
        self.keys.iter().find(|key| key.crc32 == crc32)
    }

    pub fn contains(&self, crc32: u32) -> bool {
        self.find(crc32).is_some()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AsymmetricKeyPair> {
        self.keys.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut AsymmetricKeyPair> {
        self.keys.iter_mut()
    }

    /// Whether the current key is missing, expired or older than `max_age`
    pub fn needs_rotation(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        match self.current() {
            None => true,
            Some(current) => current.is_expired(now) || now - current.created_at >= max_age,
        }
    }

    /// Make `key` the current key, then drop dead keys and everything beyond
    /// `max_keys`. Returns the key back if its CRC is already in the set.
    pub fn rotate(
        &mut self,
        key: AsymmetricKeyPair,
        max_keys: usize,
        now: DateTime<Utc>,
    ) -> Result<(), AsymmetricKeyPair> {
        if self.contains(key.crc32) {
            return Err(key);
        }

        self.keys.insert(0, key);
        self.trim(max_keys, now);

        Ok(())
    }

    /// Drop dead keys except the current one, and cap the set at `max_keys`
    pub fn trim(&mut self, max_keys: usize, now: DateTime<Utc>) {
        let mut index = 0;
        self.keys.retain(|key| {
            let keep = index == 0 || !key.is_dead(now);
            index += 1;
            keep
        });

        self.keys.truncate(max_keys.max(1));
    }
}
