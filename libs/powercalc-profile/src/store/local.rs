//! Local directory store
//!
//! Layout: `<root>/<manufacturer>/<model>/model.json` (or `model.yaml`).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::{ProfileStore, RawProfile};
use crate::error::Result;
use crate::identity::DeviceIdentity;
use crate::loader::{self, DocumentFormat};

/// Document file names probed in each model directory, in priority order
pub const MODEL_FILE_NAMES: &[&str] = &["model.json", "model.yaml", "model.yml"];

/// Profile store backed by a directory tree
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn read_model_dir(&self, dir: &Path) -> Result<Option<RawProfile>> {
        for file_name in MODEL_FILE_NAMES {
            let path = dir.join(file_name);
            let text = match tokio::fs::read_to_string(&path).await {
                Ok(text) => text,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            let origin = path.display().to_string();
            let format = DocumentFormat::from_path(&path).unwrap_or(DocumentFormat::Json);
            let value = loader::parse_value(&text, format, &origin)?;
            return Ok(Some(RawProfile { origin, value }));
        }

        Ok(None)
    }

    /// Scan sibling model directories for a document listing `model` as alias
    async fn find_by_alias(&self, manufacturer: &str, model: &str) -> Result<Option<RawProfile>> {
        let manufacturer_dir = self.root.join(manufacturer);
        for candidate in list_dirs(&manufacturer_dir).await? {
            let raw = match self.read_model_dir(&manufacturer_dir.join(&candidate)).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Skipping {}/{} during alias lookup: {}", manufacturer, candidate, e);
                    continue;
                },
            };

            if has_alias(&raw.value, model) {
                debug!("Alias {} resolved to {}/{}", model, manufacturer, candidate);
                return Ok(Some(raw));
            }
        }

        Ok(None)
    }
}

#[async_trait]
impl ProfileStore for LocalStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn load(&self, identity: &DeviceIdentity) -> Result<Option<RawProfile>> {
        if !is_safe_component(identity.manufacturer()) || !is_safe_component(identity.model()) {
            debug!("Rejecting unsafe path components in {}", identity);
            return Ok(None);
        }

        let model_dir = self
            .root
            .join(identity.manufacturer())
            .join(identity.model());
        if let Some(raw) = self.read_model_dir(&model_dir).await? {
            return Ok(Some(raw));
        }

        self.find_by_alias(identity.manufacturer(), identity.model())
            .await
    }

    async fn manufacturers(&self) -> Result<Vec<String>> {
        list_dirs(&self.root).await
    }

    async fn models(&self, manufacturer: &str) -> Result<Vec<String>> {
        if !is_safe_component(manufacturer) {
            return Ok(Vec::new());
        }
        list_dirs(&self.root.join(manufacturer)).await
    }
}

/// Sorted names of non-hidden subdirectories; a missing directory is empty
async fn list_dirs(dir: &Path) -> Result<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if !name.starts_with('.') {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

fn is_safe_component(part: &str) -> bool {
    !part.is_empty() && part != "." && part != ".." && !part.contains(['/', '\\'])
}

fn has_alias(doc: &Value, model: &str) -> bool {
    doc.get("aliases")
        .and_then(Value::as_array)
        .is_some_and(|aliases| aliases.iter().any(|a| a.as_str() == Some(model)))
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    fn write_model(root: &Path, manufacturer: &str, model: &str, file: &str, body: &str) {
        let dir = root.join(manufacturer).join(model);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(file), body).unwrap();
    }

    #[tokio::test]
    async fn test_load_json_and_yaml_models() {
        let tmp = TempDir::new().unwrap();
        write_model(
            tmp.path(),
            "signify",
            "LCT010",
            "model.json",
            r#"{"calculation_strategy": "lut"}"#,
        );
        write_model(
            tmp.path(),
            "tp-link",
            "HS110",
            "model.yaml",
            "calculation_strategy: fixed\n",
        );
        let store = LocalStore::new(tmp.path());

        let json = store
            .load(&DeviceIdentity::new("signify", "LCT010").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(json.value["calculation_strategy"], "lut");
        assert!(json.origin.ends_with("model.json"));

        let yaml = store
            .load(&DeviceIdentity::new("tp-link", "HS110").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(yaml.value["calculation_strategy"], "fixed");
    }

    #[tokio::test]
    async fn test_unknown_identity_and_missing_root() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path().join("does-not-exist"));
        let identity = DeviceIdentity::new("signify", "LCT010").unwrap();

        assert!(store.load(&identity).await.unwrap().is_none());
        assert!(store.manufacturers().await.unwrap().is_empty());
        assert!(store.models("signify").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_alias_resolution() {
        let tmp = TempDir::new().unwrap();
        write_model(
            tmp.path(),
            "signify",
            "LCT010",
            "model.json",
            r#"{"calculation_strategy": "lut", "aliases": ["LCT010-EU"]}"#,
        );
        let store = LocalStore::new(tmp.path());

        let raw = store
            .load(&DeviceIdentity::new("signify", "LCT010-EU").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(raw.origin.contains("LCT010"));
    }

    #[tokio::test]
    async fn test_listing_is_sorted_and_skips_files() {
        let tmp = TempDir::new().unwrap();
        write_model(tmp.path(), "signify", "b-model", "model.json", "{}");
        write_model(tmp.path(), "signify", "a-model", "model.json", "{}");
        write_model(tmp.path(), "ikea", "x", "model.json", "{}");
        fs::write(tmp.path().join("README.md"), "docs").unwrap();
        fs::create_dir_all(tmp.path().join(".git")).unwrap();
        let store = LocalStore::new(tmp.path());

        assert_eq!(store.manufacturers().await.unwrap(), vec!["ikea", "signify"]);
        assert_eq!(
            store.models("signify").await.unwrap(),
            vec!["a-model", "b-model"]
        );
    }

    #[tokio::test]
    async fn test_malformed_document_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        write_model(tmp.path(), "test", "broken", "model.json", "{oops");
        let store = LocalStore::new(tmp.path());

        let err = store
            .load(&DeviceIdentity::new("test", "broken").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let identity = DeviceIdentity::new("..", "etc").unwrap();
        assert!(store.load(&identity).await.unwrap().is_none());
    }
}
