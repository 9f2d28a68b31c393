//! Host context a library instance is bound to

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::{CompositeStore, LocalStore, ProfileStore, RemoteStore};

/// Profile directory below the host config directory
pub const PROFILE_SUBDIR: &str = "powercalc_profiles";

pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;

fn default_remote_timeout_secs() -> u64 {
    DEFAULT_REMOTE_TIMEOUT_SECS
}

/// Remote profile library settings
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteSettings {
    pub base_url: String,
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
}

impl RemoteSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: DEFAULT_REMOTE_TIMEOUT_SECS,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Host context: where profiles live and how they are cached
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LibraryContext {
    pub config_dir: PathBuf,
    /// Overrides `<config_dir>/powercalc_profiles`
    pub local_dir: Option<PathBuf>,
    pub remote: Option<RemoteSettings>,
    pub cache_enabled: bool,
}

impl LibraryContext {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            local_dir: None,
            remote: None,
            cache_enabled: true,
        }
    }

    pub fn with_local_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.local_dir = Some(dir.into());
        self
    }

    pub fn with_remote(mut self, remote: RemoteSettings) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn profile_dir(&self) -> PathBuf {
        self.local_dir
            .clone()
            .unwrap_or_else(|| self.config_dir.join(PROFILE_SUBDIR))
    }

    /// Local store, followed by the remote library when one is configured
    pub fn build_store(&self) -> Result<Arc<dyn ProfileStore>> {
        let local: Arc<dyn ProfileStore> = Arc::new(LocalStore::new(self.profile_dir()));

        let Some(remote) = &self.remote else {
            return Ok(local);
        };
        let remote: Arc<dyn ProfileStore> =
            Arc::new(RemoteStore::new(&remote.base_url, remote.timeout())?);

        Ok(Arc::new(CompositeStore::new(vec![local, remote])))
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_profile_dir_default_and_override() {
        let ctx = LibraryContext::new("/config");
        assert_eq!(ctx.profile_dir(), PathBuf::from("/config/powercalc_profiles"));

        let ctx = ctx.with_local_dir("/data/profiles");
        assert_eq!(ctx.profile_dir(), PathBuf::from("/data/profiles"));
    }

    #[test]
    fn test_build_store_variants() {
        let local_only = LibraryContext::new("/config").build_store().unwrap();
        assert_eq!(local_only.name(), "local");

        let with_remote = LibraryContext::new("/config")
            .with_remote(RemoteSettings::new("https://profiles.example.com/"))
            .build_store()
            .unwrap();
        assert_eq!(with_remote.name(), "composite");
    }

    #[test]
    fn test_remote_settings_default_timeout() {
        let remote: RemoteSettings =
            serde_json::from_str(r#"{"base_url": "https://x.example"}"#).unwrap();
        assert_eq!(remote.timeout(), Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS));
    }
}
