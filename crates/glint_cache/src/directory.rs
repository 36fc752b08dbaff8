//! Cache directory layout, keys, and size-budget eviction.
//!
//! Entries live under `<root>/programs` and `<root>/shaders`, one file per
//! key named `<key>[.<suffix>].bin`. The key is the concatenated
//! [`SourceChecksum`] of every source that went into the object, so any
//! change to any source moves the entry.

use glint_common::SourceChecksum;
use glint_config::CacheSize;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// File extension of cache entries.
pub const ENTRY_EXT: &str = "bin";

/// The two entry directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    /// Linked programs.
    Programs,
    /// Standalone compiled shaders.
    Shaders,
}

impl CacheKind {
    /// Both kinds.
    pub const ALL: [CacheKind; 2] = [CacheKind::Programs, CacheKind::Shaders];

    /// Directory name under the cache root.
    pub fn dir_name(self) -> &'static str {
        match self {
            CacheKind::Programs => "programs",
            CacheKind::Shaders => "shaders",
        }
    }
}

/// The file name of an entry, derived from its sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    stem: String,
    suffix: Option<String>,
}

impl CacheKey {
    /// The checksum part of the key.
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// The backend variant, if any.
    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    /// `<stem>[.<suffix>].bin`
    pub fn file_name(&self) -> String {
        match &self.suffix {
            Some(suffix) => format!("{}.{suffix}.{ENTRY_EXT}", self.stem),
            None => format!("{}.{ENTRY_EXT}", self.stem),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

/// Builds the key for an object compiled from `sources`.
///
/// Returns `None` if there are no sources, any source is empty, or the
/// suffix has characters other than ASCII letters, digits, `_`, and `-`.
pub fn cache_key(sources: &[&str], suffix: Option<&str>) -> Option<CacheKey> {
    if sources.is_empty() || sources.iter().any(|s| s.is_empty()) {
        return None;
    }
    if let Some(suffix) = suffix {
        let valid = !suffix.is_empty()
            && suffix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return None;
        }
    }
    let stem: String = sources
        .iter()
        .map(|s| SourceChecksum::of(s).to_string())
        .collect();
    Some(CacheKey {
        stem,
        suffix: suffix.map(str::to_string),
    })
}

/// The default cache root, `<base>/.cache/glint`, where `<base>` is the
/// first of `XDG_CACHE_DIR`, `HOME`, and `/tmp` that is set.
pub fn default_cache_root() -> PathBuf {
    default_cache_root_with(|name| std::env::var_os(name))
}

/// [`default_cache_root`] with a custom environment lookup.
pub fn default_cache_root_with(lookup: impl Fn(&str) -> Option<OsString>) -> PathBuf {
    let base = ["XDG_CACHE_DIR", "HOME"]
        .iter()
        .filter_map(|name| lookup(*name))
        .find(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"));
    base.join(".cache").join("glint")
}

/// The directory for `kind`, under `root` or the default root.
pub fn resolve_cache_dir(kind: CacheKind, root: Option<&Path>) -> PathBuf {
    match root {
        Some(root) => root.join(kind.dir_name()),
        None => default_cache_root().join(kind.dir_name()),
    }
}

/// Creates `dir` and every missing parent, one component at a time.
///
/// Components that already exist as directories are fine; a component that
/// exists as something else is an error.
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    let mut prefix = PathBuf::new();
    for component in dir.components() {
        prefix.push(component);
        match fs::create_dir(&prefix) {
            Ok(()) => {}
            Err(_) if prefix.is_dir() => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// The path of `key`'s entry in `dir`.
pub fn entry_path(dir: &Path, key: &CacheKey) -> PathBuf {
    dir.join(key.file_name())
}

/// What one eviction pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvictionReport {
    /// Regular files considered.
    pub scanned: usize,
    /// Their total size before eviction.
    pub total_before: u64,
    /// Files deleted.
    pub removed: usize,
    /// Bytes reclaimed.
    pub bytes_freed: u64,
    /// Total size afterwards.
    pub total_after: u64,
}

struct Candidate {
    path: PathBuf,
    size: u64,
    accessed: SystemTime,
}

fn candidates(dir: &Path) -> io::Result<Vec<Candidate>> {
    let mut files = Vec::new();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(files),
        Err(e) => return Err(e),
    };
    for entry in entries.flatten() {
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let Ok(accessed) = meta.accessed() else {
            continue;
        };
        files.push(Candidate {
            path: entry.path(),
            size: meta.len(),
            accessed,
        });
    }
    Ok(files)
}

/// Deletes least recently accessed files in `dir` until its total size is
/// within the budget of `size`.
///
/// Only [`CacheSize::Limited`] evicts. Files that cannot be stat'ed are
/// ignored, and a failed deletion leaves the file counted.
pub fn enforce_size_budget(dir: &Path, size: CacheSize) -> io::Result<EvictionReport> {
    let Some(budget) = size.budget() else {
        return Ok(EvictionReport::default());
    };
    let mut files = candidates(dir)?;
    let total_before: u64 = files.iter().map(|f| f.size).sum();
    let mut report = EvictionReport {
        scanned: files.len(),
        total_before,
        total_after: total_before,
        ..Default::default()
    };

    // Stable: enumeration order breaks ties.
    files.sort_by_key(|f| f.accessed);
    for file in files {
        if report.total_after <= budget {
            break;
        }
        if fs::remove_file(&file.path).is_ok() {
            report.removed += 1;
            report.bytes_freed += file.size;
            report.total_after -= file.size;
        }
    }
    Ok(report)
}

/// File count and size of a cache directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirUsage {
    /// Regular files.
    pub files: usize,
    /// Their total size.
    pub bytes: u64,
}

/// Measures `dir`; a missing directory is empty.
pub fn usage(dir: &Path) -> io::Result<DirUsage> {
    let files = candidates(dir)?;
    Ok(DirUsage {
        files: files.len(),
        bytes: files.iter().map(|f| f.size).sum(),
    })
}

/// Deletes every entry file in `dir`, returning how many were removed.
pub fn clear(dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for file in candidates(dir)? {
        if file.path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXT) {
            fs::remove_file(&file.path)?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_concatenates_checksums() {
        let key = cache_key(&["void main() {}", "precision mediump float;"], None).unwrap();
        assert_eq!(key.stem().len(), 2 * SourceChecksum::HEX_LEN);
        assert!(key.file_name().ends_with(".bin"));
        assert_eq!(key.suffix(), None);

        let short = cache_key(&["x"], None).unwrap();
        assert_eq!(short.stem().len(), SourceChecksum::HEX_LEN);
    }

    #[test]
    fn key_depends_on_order_and_content() {
        let a = cache_key(&["a", "b"], None).unwrap();
        let b = cache_key(&["b", "a"], None).unwrap();
        let c = cache_key(&["a", "c"], None).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, cache_key(&["a", "b"], None).unwrap());
    }

    #[test]
    fn no_key_for_empty_sources() {
        assert_eq!(cache_key(&[], None), None);
        assert_eq!(cache_key(&[""], None), None);
        assert_eq!(cache_key(&["void main() {}", ""], None), None);
    }

    #[test]
    fn suffix_in_file_name_only() {
        let plain = cache_key(&["x"], None).unwrap();
        let gles = cache_key(&["x"], Some("gles2")).unwrap();
        assert_eq!(plain.stem(), gles.stem());
        assert_eq!(gles.file_name(), format!("{}.gles2.bin", gles.stem()));
        assert_eq!(cache_key(&["x"], Some("../up")), None);
        assert_eq!(cache_key(&["x"], Some("")), None);
    }

    #[test]
    fn default_root_fallbacks() {
        let env = |vars: &'static [(&'static str, &'static str)]| {
            move |name: &str| {
                vars.iter()
                    .find(|(k, _)| *k == name)
                    .map(|(_, v)| OsString::from(*v))
            }
        };
        assert_eq!(
            default_cache_root_with(env(&[("XDG_CACHE_DIR", "/xdg"), ("HOME", "/home/u")])),
            PathBuf::from("/xdg/.cache/glint")
        );
        assert_eq!(
            default_cache_root_with(env(&[("HOME", "/home/u")])),
            PathBuf::from("/home/u/.cache/glint")
        );
        assert_eq!(
            default_cache_root_with(env(&[])),
            PathBuf::from("/tmp/.cache/glint")
        );
    }

    #[test]
    fn override_root_wins() {
        let root = Path::new("/srv/cache");
        assert_eq!(
            resolve_cache_dir(CacheKind::Shaders, Some(root)),
            PathBuf::from("/srv/cache/shaders")
        );
    }

    #[test]
    fn ensure_dir_creates_nested_and_tolerates_existing() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("a").join("b").join("programs");
        ensure_dir(&dir).unwrap();
        assert!(dir.is_dir());
        ensure_dir(&dir).unwrap();
    }

    #[test]
    fn ensure_dir_fails_on_file_component() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("occupied");
        fs::write(&file, b"x").unwrap();
        assert!(ensure_dir(&file.join("programs")).is_err());
    }

    #[test]
    fn unlimited_budget_never_evicts() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.bin"), [0u8; 64]).unwrap();
        let report = enforce_size_budget(tmp.path(), CacheSize::Unbounded).unwrap();
        assert_eq!(report, EvictionReport::default());
        assert!(tmp.path().join("a.bin").exists());
    }

    #[test]
    fn usage_and_clear() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.bin"), [0u8; 10]).unwrap();
        fs::write(tmp.path().join("b.bin"), [0u8; 20]).unwrap();
        fs::write(tmp.path().join("notes.txt"), [0u8; 5]).unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();

        let before = usage(tmp.path()).unwrap();
        assert_eq!(before, DirUsage { files: 3, bytes: 35 });
        assert_eq!(clear(tmp.path()).unwrap(), 2);
        assert_eq!(usage(tmp.path()).unwrap().files, 1);
    }

    #[test]
    fn missing_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        assert_eq!(usage(&missing).unwrap(), DirUsage::default());
        assert_eq!(clear(&missing).unwrap(), 0);
        let report = enforce_size_budget(
            &missing,
            CacheSize::Limited(glint_common::ByteSize::new(1)),
        )
        .unwrap();
        assert_eq!(report.scanned, 0);
    }
}
