//! In-memory profile store for testing and embedding hosts

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use super::{ProfileStore, RawProfile};
use crate::error::Result;
use crate::identity::DeviceIdentity;

#[derive(Debug, Default)]
pub struct MemoryStore {
    profiles: RwLock<BTreeMap<DeviceIdentity, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with_profile(self, identity: DeviceIdentity, document: Value) -> Self {
        self.insert(identity, document);
        self
    }

    pub fn insert(&self, identity: DeviceIdentity, document: Value) {
        self.profiles.write().insert(identity, document);
    }

    pub fn remove(&self, identity: &DeviceIdentity) -> Option<Value> {
        self.profiles.write().remove(identity)
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self, identity: &DeviceIdentity) -> Result<Option<RawProfile>> {
        Ok(self.profiles.read().get(identity).map(|value| RawProfile {
            origin: format!("memory:{}", identity),
            value: value.clone(),
        }))
    }

    async fn manufacturers(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .profiles
            .read()
            .keys()
            .map(|identity| identity.manufacturer().to_string())
            .collect();
        names.dedup();
        Ok(names)
    }

    async fn models(&self, manufacturer: &str) -> Result<Vec<String>> {
        Ok(self
            .profiles
            .read()
            .keys()
            .filter(|identity| identity.manufacturer() == manufacturer)
            .map(|identity| identity.model().to_string())
            .collect())
    }
}
