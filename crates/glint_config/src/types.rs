//! Configuration types deserialized from `glint.toml`.

use glint_common::ByteSize;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// The top-level configuration parsed from `glint.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlintConfig {
    /// Shader cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// The `[cache]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Size budget; caching is off unless this is set.
    #[serde(default, deserialize_with = "deserialize_cache_size")]
    pub size: CacheSize,
    /// Overrides the cache root (the directory holding `programs/` and `shaders/`).
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Driver vendor string stamped into every entry.
    #[serde(default = "default_vendor")]
    pub vendor: String,
    /// Driver renderer string stamped into every entry.
    #[serde(default = "default_renderer")]
    pub renderer: String,
}

fn default_vendor() -> String {
    "glint".to_string()
}

fn default_renderer() -> String {
    "glint software renderer".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            size: CacheSize::default(),
            root: None,
            vendor: default_vendor(),
            renderer: default_renderer(),
        }
    }
}

/// How much disk the cache may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheSize {
    /// No reads, no writes, no eviction.
    #[default]
    Disabled,
    /// Caching on, eviction off.
    Unbounded,
    /// Caching on; least recently accessed entries are evicted above this.
    Limited(ByteSize),
}

impl CacheSize {
    /// Returns `true` unless the cache is disabled.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, CacheSize::Disabled)
    }

    /// The byte budget, if eviction applies.
    pub fn budget(&self) -> Option<u64> {
        match self {
            CacheSize::Limited(size) => Some(size.bytes()),
            _ => None,
        }
    }

    /// Interprets a raw byte count: `0` disables the cache.
    pub fn from_bytes(bytes: u64) -> Self {
        if bytes == 0 {
            CacheSize::Disabled
        } else {
            CacheSize::Limited(ByteSize::new(bytes))
        }
    }
}

impl fmt::Display for CacheSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheSize::Disabled => f.write_str("off"),
            CacheSize::Unbounded => f.write_str("unlimited"),
            CacheSize::Limited(size) => write!(f, "{size}"),
        }
    }
}

/// Error type for parsing cache size strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid cache size '{input}' (expected off, unlimited, or a size like 64MB)")]
pub struct ParseCacheSizeError {
    /// The input string that failed to parse.
    pub input: String,
}

impl FromStr for CacheSize {
    type Err = ParseCacheSizeError;

    /// Accepts `off`/`disabled`/`0`, `unlimited`, or a [`ByteSize`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "off" | "disabled" | "false" => Ok(CacheSize::Disabled),
            "unlimited" | "unbounded" => Ok(CacheSize::Unbounded),
            _ => trimmed
                .parse::<ByteSize>()
                .map(|size| CacheSize::from_bytes(size.bytes()))
                .map_err(|_| ParseCacheSizeError {
                    input: trimmed.to_string(),
                }),
        }
    }
}

/// Deserializes a cache size given either as a string or as a byte count.
///
/// Allows both `size = "64MB"` and `size = 67108864`.
fn deserialize_cache_size<'de, D>(deserializer: D) -> Result<CacheSize, D::Error>
where
    D: Deserializer<'de>,
{
    struct CacheSizeVisitor;

    impl<'de> Visitor<'de> for CacheSizeVisitor {
        type Value = CacheSize;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a size string or a byte count")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            v.parse().map_err(E::custom)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            u64::try_from(v)
                .map(CacheSize::from_bytes)
                .map_err(|_| E::custom(format!("negative cache size {v}")))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(CacheSize::from_bytes(v))
        }
    }

    deserializer.deserialize_any(CacheSizeVisitor)
}
