//! Power sensor configuration
//!
//! Typed configuration for virtual power sensors and the profile library they
//! resolve against. Entries are validated at load time so the library only
//! ever sees well-formed identities and variable mappings.
//!
//! ```yaml
//! library:
//!   config_dir: /config
//!   remote:
//!     base_url: https://profiles.example.com/
//! sensors:
//!   - entity_id: light.kitchen
//!     manufacturer: signify
//!     model: LCT010
//!   - entity_id: switch.pump
//!     manufacturer: test
//!     model: custom-fields
//!     custom_fields:
//!       some_entity: sensor.pump_running
//! ```

pub mod error;
pub mod sensor;
pub mod settings;

pub use error::{ConfigError, Result};
pub use sensor::{ResolvedSensor, SensorConfig};
pub use settings::{load_config_from_file, LibrarySettings, PowercalcConfig, ENV_PREFIX};
