//! Remote profile library store
//!
//! The remote library publishes a manifest at `<base>/library.json` listing
//! manufacturers, models and their aliases. Model documents live at
//! `<base>/profiles/<manufacturer>/<model>/model.json`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{ProfileStore, RawProfile};
use crate::error::{LibraryError, Result};
use crate::identity::DeviceIdentity;

pub const MANIFEST_FILE: &str = "library.json";
pub const PROFILES_PATH: &str = "profiles";

/// Remote library manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryManifest {
    #[serde(default)]
    pub manufacturers: Vec<ManifestManufacturer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestManufacturer {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub models: Vec<ManifestModel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestModel {
    pub id: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl LibraryManifest {
    /// Find a manufacturer by canonical name, then by alias
    pub fn manufacturer(&self, name: &str) -> Option<&ManifestManufacturer> {
        self.manufacturers
            .iter()
            .find(|m| m.name == name)
            .or_else(|| {
                self.manufacturers
                    .iter()
                    .find(|m| m.aliases.iter().any(|a| a == name))
            })
    }

    /// Map an identity (possibly using aliases) to canonical (manufacturer, model id)
    pub fn resolve(&self, identity: &DeviceIdentity) -> Option<(&str, &str)> {
        let manufacturer = self.manufacturer(identity.manufacturer())?;
        let model = manufacturer
            .models
            .iter()
            .find(|m| m.id == identity.model())
            .or_else(|| {
                manufacturer
                    .models
                    .iter()
                    .find(|m| m.aliases.iter().any(|a| a == identity.model()))
            })?;
        Some((manufacturer.name.as_str(), model.id.as_str()))
    }
}

/// Profile store reading from an HTTP(S) profile library
pub struct RemoteStore {
    base_url: Url,
    client: Client,
    /// Held across the manifest download so only one fetch runs at a time
    manifest: Mutex<Option<Arc<LibraryManifest>>>,
}

impl RemoteStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| LibraryError::Remote(format!("invalid base URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(LibraryError::Remote(format!(
                "base URL cannot be a base: {}",
                base_url
            )));
        }
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            client,
            manifest: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| LibraryError::Remote(format!("invalid base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Cached manifest, downloading it on first use
    pub async fn manifest(&self) -> Result<Arc<LibraryManifest>> {
        let mut slot = self.manifest.lock().await;
        if let Some(manifest) = slot.as_ref() {
            return Ok(Arc::clone(manifest));
        }

        let manifest = Arc::new(self.fetch_manifest().await?);
        *slot = Some(Arc::clone(&manifest));
        Ok(manifest)
    }

    async fn fetch_manifest(&self) -> Result<LibraryManifest> {
        let url = self.url_for(&[MANIFEST_FILE])?;
        debug!("Fetching library manifest {}", url);

        let text = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let manifest: LibraryManifest = serde_json::from_str(&text).map_err(|e| {
            warn!("Invalid library manifest at {}: {}", url, e);
            LibraryError::parse(url.as_str(), e.to_string())
        })?;
        info!(
            "Library manifest: {} manufacturers",
            manifest.manufacturers.len()
        );
        Ok(manifest)
    }
}

#[async_trait]
impl ProfileStore for RemoteStore {
    fn name(&self) -> &str {
        "remote"
    }

    async fn load(&self, identity: &DeviceIdentity) -> Result<Option<RawProfile>> {
        let manifest = self.manifest().await?;
        let Some((manufacturer, model)) = manifest.resolve(identity) else {
            debug!("{} not listed in remote manifest", identity);
            return Ok(None);
        };

        let url = self.url_for(&[PROFILES_PATH, manufacturer, model, "model.json"])?;
        debug!("Downloading profile {}", url);

        let response = self.client.get(url.clone()).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            warn!("Profile {} listed in manifest but missing at {}", identity, url);
            return Ok(None);
        }
        let text = response.error_for_status()?.text().await?;

        let value = serde_json::from_str(&text)
            .map_err(|e| LibraryError::parse(url.as_str(), e.to_string()))?;
        Ok(Some(RawProfile {
            origin: url.to_string(),
            value,
        }))
    }

    async fn manufacturers(&self) -> Result<Vec<String>> {
        let manifest = self.manifest().await?;
        Ok(manifest
            .manufacturers
            .iter()
            .map(|m| m.name.clone())
            .collect())
    }

    async fn models(&self, manufacturer: &str) -> Result<Vec<String>> {
        let manifest = self.manifest().await?;
        Ok(manifest
            .manufacturer(manufacturer)
            .map(|m| m.models.iter().map(|model| model.id.clone()).collect())
            .unwrap_or_default())
    }

    async fn refresh(&self) -> Result<()> {
        let mut slot = self.manifest.lock().await;
        let manifest = self.fetch_manifest().await?;
        *slot = Some(Arc::new(manifest));
        Ok(())
    }
}
