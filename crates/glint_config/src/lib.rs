//! Parsing and validation of `glint.toml` shader-cache configuration.
//!
//! This crate reads the configuration file, applies environment overrides,
//! and produces a strongly-typed [`GlintConfig`] with the cache size budget,
//! an optional cache root, and the driver identity strings stamped into
//! every cache entry.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{
    apply_env_overrides, load_config, load_config_from_str, load_config_or_default, CONFIG_FILE,
    SIZE_ENV,
};
pub use types::*;
