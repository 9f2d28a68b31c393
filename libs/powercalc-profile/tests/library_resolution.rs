//! Profile resolution, caching and single-flight loading
//!
//! Uses a deliberately slow store so concurrent lookups overlap.

// Allow unwrap() in tests for cleaner test code
#![allow(clippy::disallowed_methods)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use powercalc_profile::{
    DeviceIdentity, ErrorKind, LibraryContext, MemoryStore, ProfileLibrary, ProfileStore,
    RawProfile, Result,
};
use serde_json::json;
use tempfile::TempDir;

/// Memory store that counts loads and sleeps before answering
struct SlowStore {
    inner: MemoryStore,
    loads: AtomicUsize,
    refreshes: AtomicUsize,
    delay: Duration,
}

impl SlowStore {
    fn new(delay: Duration) -> Self {
        let inner = MemoryStore::new().with_profile(
            identity(),
            json!({"name": "Slow", "calculation_strategy": "linear"}),
        );
        Self {
            inner,
            loads: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
            delay,
        }
    }

    fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileStore for SlowStore {
    fn name(&self) -> &str {
        "slow"
    }

    async fn load(&self, identity: &DeviceIdentity) -> Result<Option<RawProfile>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.inner.load(identity).await
    }

    async fn manufacturers(&self) -> Result<Vec<String>> {
        self.inner.manufacturers().await
    }

    async fn models(&self, manufacturer: &str) -> Result<Vec<String>> {
        self.inner.models(manufacturer).await
    }

    async fn refresh(&self) -> Result<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Store whose document changes on every refresh
///
/// The version is read before the delay, so a slow load returns the
/// document as it was when the load started.
struct VersionedStore {
    version: AtomicUsize,
    delay: Duration,
}

#[async_trait]
impl ProfileStore for VersionedStore {
    fn name(&self) -> &str {
        "versioned"
    }

    async fn load(&self, identity: &DeviceIdentity) -> Result<Option<RawProfile>> {
        let version = self.version.load(Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(Some(RawProfile {
            origin: format!("versioned/{}", identity),
            value: json!({
                "name": format!("Version {}", version),
                "calculation_strategy": "fixed",
                "standby_power": version as f64,
            }),
        }))
    }

    async fn manufacturers(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn models(&self, _manufacturer: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn refresh(&self) -> Result<()> {
        self.version.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn identity() -> DeviceIdentity {
    DeviceIdentity::new("signify", "LCT010").unwrap()
}

// ============================================================================
// Single-flight
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_lookups_share_one_load() {
    let store = Arc::new(SlowStore::new(Duration::from_millis(100)));
    let lib = Arc::new(ProfileLibrary::with_store(store.clone()));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let lib = Arc::clone(&lib);
        handles.push(tokio::spawn(
            async move { lib.get_profile(&identity()).await },
        ));
    }

    let mut profiles = Vec::new();
    for handle in handles {
        profiles.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(store.loads(), 1);
    let stats = lib.stats();
    assert_eq!(stats.loads, 1);
    assert_eq!(stats.hits + stats.misses, 16);
    assert!(profiles.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}

#[tokio::test]
async fn test_distinct_identities_load_independently() {
    let store = MemoryStore::new()
        .with_profile(identity(), json!({"name": "Hue", "calculation_strategy": "lut"}))
        .with_profile(
            DeviceIdentity::new("ikea", "LED1545G12").unwrap(),
            json!({"name": "TRADFRI", "calculation_strategy": "lut"}),
        );
    let lib = ProfileLibrary::with_store(Arc::new(store));

    let id_a = identity();
    let id_b = DeviceIdentity::new("ikea", "LED1545G12").unwrap();
    let (a, b) = tokio::join!(lib.get_profile(&id_a), lib.get_profile(&id_b));
    a.unwrap();
    b.unwrap();

    assert_eq!(lib.stats().loads, 2);
    assert_eq!(lib.stats().entries, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelled_lookup_still_populates_cache() {
    let store = Arc::new(SlowStore::new(Duration::from_millis(100)));
    let lib = Arc::new(ProfileLibrary::with_store(store.clone()));

    let caller = {
        let lib = Arc::clone(&lib);
        tokio::spawn(async move { lib.get_profile(&identity()).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    caller.abort();
    assert!(caller.await.unwrap_err().is_cancelled());

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(lib.stats().entries, 1);

    lib.get_profile(&identity()).await.unwrap();
    assert_eq!(store.loads(), 1);
    assert_eq!(lib.stats().hits, 1);
}

// ============================================================================
// Reload and errors
// ============================================================================

#[tokio::test]
async fn test_reload_refreshes_store_and_invalidates_cache() {
    let store = Arc::new(SlowStore::new(Duration::from_millis(1)));
    let lib = ProfileLibrary::with_store(store.clone());

    lib.get_profile(&identity()).await.unwrap();
    lib.reload().await.unwrap();
    assert_eq!(store.refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(lib.stats().entries, 0);

    lib.get_profile(&identity()).await.unwrap();
    assert_eq!(store.loads(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_load_in_flight_during_reload_is_not_cached() {
    let store = Arc::new(VersionedStore {
        version: AtomicUsize::new(1),
        delay: Duration::from_millis(100),
    });
    let lib = Arc::new(ProfileLibrary::with_store(store.clone()));

    let before = {
        let lib = Arc::clone(&lib);
        tokio::spawn(async move { lib.get_profile(&identity()).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    lib.reload().await.unwrap();

    // A lookup after the reload does not join the stale load
    let after = lib.get_profile(&identity()).await.unwrap();
    assert_eq!(after.standby_power(), Some(2.0));

    // The caller that asked before the reload still gets its answer
    let stale = before.await.unwrap().unwrap();
    assert_eq!(stale.standby_power(), Some(1.0));

    tokio::time::sleep(Duration::from_millis(50)).await;
    let cached = lib.get_profile(&identity()).await.unwrap();
    assert_eq!(cached.standby_power(), Some(2.0));
    assert_eq!(lib.stats().loads, 2);
    assert_eq!(lib.stats().entries, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stale_load_does_not_overwrite_cache_after_reload() {
    let store = Arc::new(VersionedStore {
        version: AtomicUsize::new(1),
        delay: Duration::from_millis(100),
    });
    let lib = Arc::new(ProfileLibrary::with_store(store.clone()));

    let before = {
        let lib = Arc::clone(&lib);
        tokio::spawn(async move { lib.get_profile(&identity()).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    lib.reload().await.unwrap();
    assert_eq!(before.await.unwrap().unwrap().standby_power(), Some(1.0));

    assert_eq!(lib.stats().entries, 0);
    let profile = lib.get_profile(&identity()).await.unwrap();
    assert_eq!(profile.standby_power(), Some(2.0));
    assert_eq!(profile.name(), "Version 2");
}

#[tokio::test]
async fn test_failed_load_is_retried_on_next_call() {
    let store = Arc::new(MemoryStore::new());
    let lib = ProfileLibrary::with_store(store.clone());

    let err = lib.get_profile(&identity()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    store.insert(identity(), json!({"name": "Hue", "calculation_strategy": "fixed"}));
    let profile = lib.get_profile(&identity()).await.unwrap();
    assert_eq!(profile.calculation_strategy().as_str(), "fixed");
}

#[tokio::test]
async fn test_parse_error_is_not_cached() {
    let store = Arc::new(MemoryStore::new());
    store.insert(identity(), json!({"name": "no strategy"}));
    let lib = ProfileLibrary::with_store(store.clone());

    let err = lib.get_profile(&identity()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ParseError);
    assert_eq!(lib.stats().entries, 0);
}

// ============================================================================
// Local directory through the factory
// ============================================================================

#[tokio::test]
async fn test_factory_local_directory_with_alias() {
    let tmp = TempDir::new().unwrap();
    let model_dir = tmp.path().join("powercalc_profiles/signify/LCT010");
    std::fs::create_dir_all(&model_dir).unwrap();
    std::fs::write(
        model_dir.join("model.json"),
        r#"{"name": "Hue", "calculation_strategy": "lut", "aliases": ["LCT010-EU"]}"#,
    )
    .unwrap();

    let context = LibraryContext::new(tmp.path());
    let lib = ProfileLibrary::factory(&context).unwrap();
    assert!(Arc::ptr_eq(&lib, &ProfileLibrary::factory(&context).unwrap()));

    assert_eq!(lib.manufacturers().await.unwrap(), vec!["signify"]);
    assert_eq!(lib.models("signify").await.unwrap(), vec!["LCT010"]);

    let profile = lib
        .get_profile(&DeviceIdentity::new("signify", "LCT010-EU").unwrap())
        .await
        .unwrap();
    assert_eq!(profile.name(), "Hue");

    let err = lib
        .get_profile(&DeviceIdentity::new("signify", "LCT999").unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    ProfileLibrary::release(&context);
}
