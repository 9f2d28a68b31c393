//! Backing stores for profile documents
//!
//! The library resolves identities through a [`ProfileStore`]. Stores only
//! fetch raw documents; parsing and caching happen in the library.

mod composite;
mod local;
mod memory;
mod remote;

pub use composite::CompositeStore;
pub use local::{LocalStore, MODEL_FILE_NAMES};
pub use memory::MemoryStore;
pub use remote::{LibraryManifest, ManifestManufacturer, ManifestModel, RemoteStore};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::identity::DeviceIdentity;

/// Unparsed profile document plus where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct RawProfile {
    /// File path or URL, used in error messages
    pub origin: String,
    pub value: Value,
}

/// Source of profile documents keyed by device identity
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Short name used in log output
    fn name(&self) -> &str;

    /// Fetch the document for `identity`, `None` when the store has no such profile
    async fn load(&self, identity: &DeviceIdentity) -> Result<Option<RawProfile>>;

    async fn manufacturers(&self) -> Result<Vec<String>>;

    /// Model ids of a manufacturer; empty when the manufacturer is unknown
    async fn models(&self, manufacturer: &str) -> Result<Vec<String>>;

    /// Drop any store-level state (e.g. a downloaded manifest)
    async fn refresh(&self) -> Result<()> {
        Ok(())
    }
}
