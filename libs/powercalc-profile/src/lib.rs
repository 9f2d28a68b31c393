//! Power Profile Library
//!
//! Maps a device identity (manufacturer, model) to a validated power
//! calculation profile.
//!
//! # Modules
//!
//! - `schema`: Profile documents (calculation strategy, custom field declarations)
//! - `variables`: Custom field validation and `[[field]]` placeholder substitution
//! - `store`: Backing stores (local directory, remote library, composite, memory)
//! - `library`: Cached, single-flight profile resolution
//! - `context`: Host context a library instance is bound to
//!
//! # Example
//!
//! ```rust
//! use powercalc_profile::{DeviceIdentity, MemoryStore, ProfileLibrary, VariableMapping};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # let rt = tokio::runtime::Builder::new_current_thread()
//! #     .enable_all()
//! #     .build()
//! #     .unwrap();
//! # rt.block_on(async {
//! let identity = DeviceIdentity::new("test", "custom-fields").unwrap();
//! let store = MemoryStore::new().with_profile(
//!     identity.clone(),
//!     json!({
//!         "name": "Custom fields",
//!         "calculation_strategy": "fixed",
//!         "fields": {"some_entity": {"name": "Entity", "selector": {"entity": {}}}},
//!         "fixed_config": {"power": "[[some_entity]]"}
//!     }),
//! );
//! let library = ProfileLibrary::with_store(Arc::new(store));
//!
//! let mut variables = VariableMapping::new();
//! variables.insert("some_entity".to_string(), "sensor.test".to_string());
//!
//! let profile = library.create_power_profile(&identity, &variables).await.unwrap();
//! assert_eq!(profile.config["fixed_config"]["power"], "sensor.test");
//! # });
//! ```

pub mod context;
pub mod error;
pub mod identity;
pub mod library;
pub mod loader;
pub mod schema;
pub mod store;
pub mod variables;

// Re-exports for convenience
pub use context::{LibraryContext, RemoteSettings, DEFAULT_REMOTE_TIMEOUT_SECS};
pub use error::{ErrorKind, LibraryError, Result};
pub use identity::{DeviceIdentity, VariableMapping};
pub use library::{CacheStats, PowerProfile, ProfileLibrary};
pub use schema::{CalculationStrategy, CustomField, ProfileSchema, Selector};
pub use store::{CompositeStore, LocalStore, MemoryStore, ProfileStore, RawProfile, RemoteStore};
pub use variables::{substitute_placeholders, validate_variables};
