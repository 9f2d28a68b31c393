//! Profile Library
//!
//! Resolves device identities to validated profiles. Parsed profiles are
//! cached per identity; a cache miss starts a single load task that every
//! concurrent caller for the same identity awaits. The load task runs on
//! its own, so a caller that gives up does not cancel it. A successful
//! result lands in the cache unless the library was cleared while it ran.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::context::LibraryContext;
use crate::error::{LibraryError, Result};
use crate::identity::{DeviceIdentity, VariableMapping};
use crate::schema::ProfileSchema;
use crate::store::ProfileStore;
use crate::variables;

type LoadFuture = Shared<BoxFuture<'static, Result<Arc<ProfileSchema>>>>;
type ProfileCache = RwLock<HashMap<DeviceIdentity, Arc<ProfileSchema>>>;

/// One library per host context
static REGISTRY: OnceLock<Mutex<HashMap<LibraryContext, Arc<ProfileLibrary>>>> = OnceLock::new();

/// Cache statistics snapshot
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    /// Lookups that started or joined a load
    pub misses: u64,
    /// Backing store loads actually performed
    pub loads: u64,
    pub entries: usize,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
}

/// A resolved profile with its custom fields bound, ready for the calculation engine
#[derive(Debug, Clone)]
pub struct PowerProfile {
    pub identity: DeviceIdentity,
    pub schema: Arc<ProfileSchema>,
    pub variables: VariableMapping,
    /// Profile document with `[[field]]` placeholders replaced
    pub config: Value,
}

pub struct ProfileLibrary {
    store: Arc<dyn ProfileStore>,
    cache: Arc<ProfileCache>,
    in_flight: Arc<Mutex<HashMap<DeviceIdentity, LoadFuture>>>,
    /// Bumped by `clear`; loads started in an older generation are not cached
    generation: Arc<AtomicU64>,
    counters: Arc<Counters>,
    cache_enabled: bool,
}

impl ProfileLibrary {
    /// Library bound to `context`, created on first use.
    ///
    /// Repeated calls with an equal context return the same instance.
    pub fn factory(context: &LibraryContext) -> Result<Arc<ProfileLibrary>> {
        let registry = REGISTRY.get_or_init(|| Mutex::new(HashMap::new()));
        let mut libraries = registry.lock();
        if let Some(library) = libraries.get(context) {
            return Ok(Arc::clone(library));
        }

        let store = context.build_store()?;
        let library = Arc::new(Self::with_store(store).cache(context.cache_enabled));
        info!(
            "Profile library: {} (remote: {})",
            context.profile_dir().display(),
            context
                .remote
                .as_ref()
                .map(|r| r.base_url.as_str())
                .unwrap_or("off")
        );
        libraries.insert(context.clone(), Arc::clone(&library));
        Ok(library)
    }

    /// Drop the registered library for `context`, clearing its cache.
    ///
    /// Returns whether a library was registered.
    pub fn release(context: &LibraryContext) -> bool {
        let Some(registry) = REGISTRY.get() else {
            return false;
        };
        match registry.lock().remove(context) {
            Some(library) => {
                library.clear();
                true
            },
            None => false,
        }
    }

    /// Unregistered library over a caller-supplied store
    pub fn with_store(store: Arc<dyn ProfileStore>) -> Self {
        Self {
            store,
            cache: Arc::new(RwLock::new(HashMap::new())),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
            counters: Arc::new(Counters::default()),
            cache_enabled: true,
        }
    }

    /// Enable or disable the profile cache (single-flight still applies)
    pub fn cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn store(&self) -> &Arc<dyn ProfileStore> {
        &self.store
    }

    /// Resolve a profile, loading it from the backing store on cache miss.
    pub async fn get_profile(&self, identity: &DeviceIdentity) -> Result<Arc<ProfileSchema>> {
        let lookup = match self.cached(identity) {
            Some(profile) => Ok(profile),
            None => self.join_or_start_load(identity),
        };

        match lookup {
            Ok(profile) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Profile cache hit: {}", identity);
                Ok(profile)
            },
            Err(load) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                load.await
            },
        }
    }

    /// Resolve, validate and bind a profile in one step.
    pub async fn create_power_profile(
        &self,
        identity: &DeviceIdentity,
        variables: &VariableMapping,
    ) -> Result<PowerProfile> {
        let schema = self.get_profile(identity).await?;
        variables::validate_variables(schema.field_keys(), variables).map_err(|e| {
            warn!("Profile {}: {}", identity, e);
            e
        })?;

        let config = if variables.is_empty() {
            schema.raw().clone()
        } else {
            variables::substitute_placeholders(schema.raw(), variables)
        };

        Ok(PowerProfile {
            identity: identity.clone(),
            schema,
            variables: variables.clone(),
            config,
        })
    }

    /// Check a raw profile document's `fields` against supplied variables.
    pub fn validate_variables(
        &self,
        profile_json: &Value,
        variables: &VariableMapping,
    ) -> Result<()> {
        let declared = variables::declared_field_keys(profile_json)?;
        variables::validate_variables(declared, variables)
    }

    pub async fn manufacturers(&self) -> Result<Vec<String>> {
        self.store.manufacturers().await
    }

    pub async fn models(&self, manufacturer: &str) -> Result<Vec<String>> {
        self.store.models(manufacturer).await
    }

    /// Case-insensitive substring search over a manufacturer's model ids
    pub async fn find_models(&self, manufacturer: &str, search: &str) -> Result<Vec<String>> {
        let needle = search.to_lowercase();
        let models = self.store.models(manufacturer).await?;
        Ok(models
            .into_iter()
            .filter(|model| model.to_lowercase().contains(&needle))
            .collect())
    }

    /// Refresh the backing store, then invalidate every cached profile.
    ///
    /// Loads already in flight finish for the callers awaiting them, but
    /// their results are not cached and later lookups start a fresh load.
    pub async fn reload(&self) -> Result<()> {
        self.store.refresh().await?;
        let dropped = self.clear();
        info!("Profile library reloaded, {} cached profiles dropped", dropped);
        Ok(())
    }

    /// Drop all cached profiles and detach in-flight loads, returning how many were cached
    pub fn clear(&self) -> usize {
        let mut in_flight = self.in_flight.lock();
        self.generation.fetch_add(1, Ordering::SeqCst);
        in_flight.clear();

        let mut cache = self.cache.write();
        let dropped = cache.len();
        cache.clear();
        dropped
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            loads: self.counters.loads.load(Ordering::Relaxed),
            entries: self.cache.read().len(),
        }
    }

    fn cached(&self, identity: &DeviceIdentity) -> Option<Arc<ProfileSchema>> {
        if !self.cache_enabled {
            return None;
        }
        self.cache.read().get(identity).cloned()
    }

    /// `Ok` when the profile landed in the cache meanwhile, otherwise the load to await
    fn join_or_start_load(
        &self,
        identity: &DeviceIdentity,
    ) -> std::result::Result<Arc<ProfileSchema>, LoadFuture> {
        let mut in_flight = self.in_flight.lock();

        // Load tasks insert into the cache before leaving the registry
        if let Some(profile) = self.cached(identity) {
            return Ok(profile);
        }
        if let Some(load) = in_flight.get(identity) {
            debug!("Joining in-flight load: {}", identity);
            return Err(load.clone());
        }

        let load = self.spawn_load(identity.clone());
        in_flight.insert(identity.clone(), load.clone());
        Err(load)
    }

    /// Must be called with the in-flight registry locked
    fn spawn_load(&self, identity: DeviceIdentity) -> LoadFuture {
        let store = Arc::clone(&self.store);
        let cache = Arc::clone(&self.cache);
        let in_flight = Arc::clone(&self.in_flight);
        let generation = Arc::clone(&self.generation);
        let started = generation.load(Ordering::SeqCst);
        let counters = Arc::clone(&self.counters);
        let cache_enabled = self.cache_enabled;

        let task = tokio::spawn(async move {
            counters.loads.fetch_add(1, Ordering::Relaxed);
            let result = load_profile(store.as_ref(), &identity).await;

            let mut in_flight = in_flight.lock();
            if generation.load(Ordering::SeqCst) != started {
                // Cleared meanwhile; the registry entry is gone or belongs to a newer load
                debug!("Discarding profile {} loaded before the cache was cleared", identity);
                return result;
            }
            if let (Ok(profile), true) = (&result, cache_enabled) {
                cache.write().insert(identity.clone(), Arc::clone(profile));
            }
            in_flight.remove(&identity);
            result
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(LibraryError::internal(format!("profile load task failed: {}", e))),
            }
        }
        .boxed()
        .shared()
    }
}

async fn load_profile(
    store: &dyn ProfileStore,
    identity: &DeviceIdentity,
) -> Result<Arc<ProfileSchema>> {
    debug!("Loading profile {} from {} store", identity, store.name());

    let raw = store
        .load(identity)
        .await?
        .ok_or_else(|| LibraryError::not_found(identity))?;

    match ProfileSchema::from_value(raw.value, &raw.origin) {
        Ok(schema) => {
            debug!(
                "Loaded profile {} ({}, {} custom fields)",
                identity,
                schema.calculation_strategy(),
                schema.fields().len()
            );
            Ok(Arc::new(schema))
        },
        Err(e) => {
            warn!("Invalid profile {}: {}", identity, e);
            Err(e)
        },
    }
}
