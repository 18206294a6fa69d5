//! JSON configuration schema, loader, and targeted persister (C12).
//!
//! Grounded on `knhk_config` (load hierarchy, env overrides, validation
//! split into dedicated functions) and `knhk-sidecar::config`
//! (typed-section config struct, `from_file`), adapted to the JSON format
//! and dual-write-with-rollback semantics the spec requires.

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigStore;
pub use schema::*;
