//! Ordered chain of stores; the first store holding a profile wins

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{ProfileStore, RawProfile};
use crate::error::Result;
use crate::identity::DeviceIdentity;

pub struct CompositeStore {
    stores: Vec<Arc<dyn ProfileStore>>,
}

impl CompositeStore {
    pub fn new(stores: Vec<Arc<dyn ProfileStore>>) -> Self {
        Self { stores }
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

#[async_trait]
impl ProfileStore for CompositeStore {
    fn name(&self) -> &str {
        "composite"
    }

    async fn load(&self, identity: &DeviceIdentity) -> Result<Option<RawProfile>> {
        for store in &self.stores {
            if let Some(raw) = store.load(identity).await? {
                debug!("{} found in {} store", identity, store.name());
                return Ok(Some(raw));
            }
        }
        Ok(None)
    }

    async fn manufacturers(&self) -> Result<Vec<String>> {
        let mut names = BTreeSet::new();
        for store in &self.stores {
            names.extend(store.manufacturers().await?);
        }
        Ok(names.into_iter().collect())
    }

    async fn models(&self, manufacturer: &str) -> Result<Vec<String>> {
        let mut models = BTreeSet::new();
        for store in &self.stores {
            models.extend(store.models(manufacturer).await?);
        }
        Ok(models.into_iter().collect())
    }

    async fn refresh(&self) -> Result<()> {
        for store in &self.stores {
            store.refresh().await?;
        }
        Ok(())
    }
}
