//! Build configuration
//!
//! Typed model of a build variant's configuration, plus loading of one or
//! more TOML/JSON layers merged in order:
//! 1. Shared base (e.g. generic Windows keys)
//! 2. Platform or variant overlay
//! 3. Inline values supplied by the caller

mod loader;
mod merge;
mod model;

pub use loader::{ConfigError, ConfigLoader, ConfigOrigin, ConfigSource, Format, LoadedConfig};
pub use merge::{deep_merge, merge_layers};
pub use model::{BuildConfig, Exe, RepoDescriptor};
