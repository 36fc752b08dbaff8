//! High-level cache orchestrator.
//!
//! [`ShaderCache`] ties the configured budget, the build fingerprint, the
//! builtin table, and the two entry directories together. Nothing it does
//! is an error to the caller: stores report a [`StoreOutcome`] and loads
//! return `None` on any miss, with the reason logged.

use std::fs::{self, File};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glint_config::{CacheConfig, CacheSize};
use glint_ir::{BuiltinTable, Program, Shader, ShaderStage};
use tracing::{debug, info, warn};

use crate::directory::{self, CacheKind, EvictionReport};
use crate::entry;
use crate::error::CacheError;
use crate::fingerprint::Fingerprint;
use crate::reader::MappedBuffer;

/// Result of a store request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    /// Caching is turned off.
    Disabled,
    /// The object has no usable source text to key it by.
    NoKey,
    /// An entry for the key already exists and was left alone.
    AlreadyCached(PathBuf),
    /// The object uses features entries cannot represent.
    Ineligible(String),
    /// Encoding or writing failed; nothing was left on disk.
    Failed(String),
    /// A new entry was written.
    Stored(PathBuf),
}

/// Disk cache for compiled programs and shaders.
///
/// Holds only immutable state, so one instance may be shared between
/// threads. Concurrent stores of the same key are resolved by the file
/// system: the first file created wins.
pub struct ShaderCache {
    /// Size budget; also decides whether the cache is on at all.
    size: CacheSize,

    /// Identity every entry is stamped with and checked against.
    fingerprint: Fingerprint,

    /// Source of canonical builtin signatures for loaded shaders.
    builtins: Arc<dyn BuiltinTable + Send + Sync>,

    /// Directory of program entries.
    programs_dir: PathBuf,

    /// Directory of standalone shader entries.
    shaders_dir: PathBuf,

    /// Backend variant appended to entry names.
    variant: Option<String>,
}

impl ShaderCache {
    /// Creates a cache from configuration. No directory is touched until the
    /// first store.
    pub fn new(config: &CacheConfig, builtins: Arc<dyn BuiltinTable + Send + Sync>) -> Self {
        let root = config.root.as_deref();
        Self {
            size: config.size,
            fingerprint: Fingerprint::from_config(config),
            builtins,
            programs_dir: directory::resolve_cache_dir(CacheKind::Programs, root),
            shaders_dir: directory::resolve_cache_dir(CacheKind::Shaders, root),
            variant: None,
        }
    }

    /// Keys entries under a backend variant, so two backends sharing a cache
    /// root never load each other's entries.
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    /// Returns `true` unless the configured size disables caching.
    pub fn is_enabled(&self) -> bool {
        self.size.is_enabled()
    }

    /// The directory holding entries of `kind`.
    pub fn dir(&self, kind: CacheKind) -> &Path {
        match kind {
            CacheKind::Programs => &self.programs_dir,
            CacheKind::Shaders => &self.shaders_dir,
        }
    }

    /// The fingerprint entries are stamped with.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Stores a linked program keyed by the sources of its shaders.
    pub fn store_program(&self, program: &Program) -> StoreOutcome {
        self.store(CacheKind::Programs, &program.sources(), || {
            entry::encode_program(program, &self.fingerprint)
        })
    }

    /// Stores a compiled shader keyed by its stage and source.
    pub fn store_shader(&self, shader: &Shader) -> StoreOutcome {
        let source = shader.source.as_deref().unwrap_or("");
        self.store(CacheKind::Shaders, &shader_key(shader.stage, source), || {
            entry::encode_shader(shader, &self.fingerprint)
        })
    }

    /// Loads the program built from `sources`, given in stage order.
    pub fn load_program(&self, sources: &[&str]) -> Option<Program> {
        let path = self.lookup(CacheKind::Programs, sources)?;
        self.load(&path, |input| {
            entry::decode_program(input, &self.fingerprint, self.builtins.as_ref())
        })
    }

    /// Loads the shader of `stage` compiled from `source`.
    pub fn load_shader(&self, stage: ShaderStage, source: &str) -> Option<Shader> {
        let path = self.lookup(CacheKind::Shaders, &shader_key(stage, source))?;
        let shader = self.load(&path, |input| {
            entry::decode_shader(input, &self.fingerprint, self.builtins.as_ref())
        })?;
        if shader.stage != stage {
            debug!(
                "cache entry {} holds a {} shader, wanted {}",
                path.display(),
                shader.stage.name(),
                stage.name()
            );
            return None;
        }
        Some(shader)
    }

    /// Runs an eviction pass over the directory of `kind`.
    pub fn evict(&self, kind: CacheKind) -> io::Result<EvictionReport> {
        directory::enforce_size_budget(self.dir(kind), self.size)
    }

    fn key_path(&self, kind: CacheKind, sources: &[&str]) -> Option<PathBuf> {
        let key = directory::cache_key(sources, self.variant.as_deref())?;
        Some(directory::entry_path(self.dir(kind), &key))
    }

    fn lookup(&self, kind: CacheKind, sources: &[&str]) -> Option<PathBuf> {
        if !self.is_enabled() {
            return None;
        }
        let path = self.key_path(kind, sources)?;
        path.is_file().then_some(path)
    }

    fn store(
        &self,
        kind: CacheKind,
        sources: &[&str],
        encode: impl FnOnce() -> Result<Vec<u8>, CacheError>,
    ) -> StoreOutcome {
        if !self.is_enabled() {
            return StoreOutcome::Disabled;
        }
        let Some(path) = self.key_path(kind, sources) else {
            debug!("not caching {}: no source to key by", kind.dir_name());
            return StoreOutcome::NoKey;
        };
        if path.exists() {
            return StoreOutcome::AlreadyCached(path);
        }

        let bytes = match encode() {
            Ok(bytes) => bytes,
            Err(CacheError::Ineligible { reason }) => {
                debug!("not caching {}: {}", path.display(), reason);
                return StoreOutcome::Ineligible(reason);
            }
            Err(e) => {
                warn!("failed to encode cache entry {}: {}", path.display(), e);
                return StoreOutcome::Failed(e.to_string());
            }
        };

        match write_entry(self.dir(kind), &path, &bytes) {
            Ok(true) => {}
            Ok(false) => return StoreOutcome::AlreadyCached(path),
            Err(e) => {
                warn!("{}", e);
                return StoreOutcome::Failed(e.to_string());
            }
        }

        match self.evict(kind) {
            Ok(report) if report.removed > 0 => info!(
                "evicted {} cache entries ({} bytes), {} bytes remain",
                report.removed, report.bytes_freed, report.total_after
            ),
            Ok(_) => {}
            Err(e) => warn!("cache eviction in {} failed: {}", self.dir(kind).display(), e),
        }
        StoreOutcome::Stored(path)
    }

    fn load<T>(
        &self,
        path: &Path,
        decode: impl FnOnce(&mut MappedBuffer<'_>) -> Result<T, CacheError>,
    ) -> Option<T> {
        let mut input = match MappedBuffer::open(path) {
            Ok(input) => input,
            Err(e) => {
                debug!("cannot open cache entry {}: {}", path.display(), e);
                return None;
            }
        };
        match decode(&mut input) {
            Ok(value) => Some(value),
            Err(e) if e.is_stale() => {
                warn!("deleting stale cache entry {}: {}", path.display(), e);
                drop(input);
                if let Err(e) = fs::remove_file(path) {
                    debug!("could not delete {}: {}", path.display(), e);
                }
                None
            }
            Err(e) => {
                debug!("ignoring cache entry {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Key sources of a standalone shader. The stage takes part so one source
/// compiled for two stages gets two entries.
fn shader_key(stage: ShaderStage, source: &str) -> [&str; 2] {
    [stage.name(), source]
}

/// Writes `bytes` to a new file at `path`.
///
/// The first four bytes (the completeness sentinel) are written as zero and
/// patched in only after everything else reached the disk, so a crash
/// mid-write leaves an entry that readers reject. Returns `Ok(false)` if
/// the file already exists.
fn write_entry(dir: &Path, path: &Path, bytes: &[u8]) -> Result<bool, CacheError> {
    let io_err = |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    };
    directory::ensure_dir(dir).map_err(|source| CacheError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut file = match File::options().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(io_err(e)),
    };
    let (sentinel, rest) = bytes.split_at(bytes.len().min(4));
    let result = (|| {
        file.write_all(&[0; 4])?;
        file.write_all(rest)?;
        file.sync_data()?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(sentinel)?;
        file.sync_data()
    })();
    if let Err(e) = result {
        drop(file);
        remove_partial(path);
        return Err(io_err(e));
    }
    Ok(true)
}

/// Deletes a half-written entry. Returns `false` if it is still there.
fn remove_partial(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => true,
        Err(e) => {
            warn!("could not remove partial cache entry {}: {}", path.display(), e);
            false
        }
    }
}
