//! Read-only examination of a single entry file.

use std::io;
use std::path::Path;

use glint_common::ContentHash;
use glint_ir::{print, BuiltinTable, Shader};
use serde::Serialize;

use crate::directory::CacheKind;
use crate::entry;
use crate::fingerprint::Fingerprint;
use crate::reader::MappedBuffer;

/// What an entry file contains and whether this build could load it.
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    /// `programs` or `shaders`.
    pub kind: &'static str,
    /// File size in bytes.
    pub size: usize,
    /// Stored completeness sentinel.
    pub sentinel: u32,
    /// Build magic, if the validation block could be read.
    pub magic: Option<String>,
    /// Driver vendor from the validation block.
    pub vendor: Option<String>,
    /// Driver renderer from the validation block.
    pub renderer: Option<String>,
    /// The validation block matches this build.
    pub fingerprint_ok: bool,
    /// XXH3-128 of the whole file.
    pub content_hash: String,
    /// Stages of the decoded shaders.
    pub stages: Vec<&'static str>,
    /// Uniform storage entries of a decoded program.
    pub uniforms: usize,
    /// Why the entry failed to load.
    pub error: Option<String>,
    /// IR dumps of the decoded shaders, when requested.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dumps: Vec<String>,
}

/// Decodes the entry at `path` as `kind` and summarizes it. Only failing to
/// read the file is an error; decode failures end up in
/// [`EntrySummary::error`].
pub fn inspect_entry(
    path: &Path,
    kind: CacheKind,
    fingerprint: &Fingerprint,
    builtins: &dyn BuiltinTable,
    with_dumps: bool,
) -> io::Result<EntrySummary> {
    let mut file = MappedBuffer::open(path)?;
    let mut summary = EntrySummary {
        kind: kind.dir_name(),
        size: file.size(),
        sentinel: 0,
        magic: None,
        vendor: None,
        renderer: None,
        fingerprint_ok: false,
        content_hash: ContentHash::from_bytes(file.as_bytes()).to_string(),
        stages: Vec::new(),
        uniforms: 0,
        error: None,
        dumps: Vec::new(),
    };

    if let Ok(sentinel) = file.read::<u32>() {
        summary.sentinel = sentinel;
        if let Ok(found) = Fingerprint::read(&mut file) {
            summary.fingerprint_ok = found == *fingerprint;
            summary.magic = Some(found.magic);
            summary.vendor = Some(found.vendor);
            summary.renderer = Some(found.renderer);
        }
    }

    let mut input = MappedBuffer::from_slice(file.as_bytes());
    let shaders: Vec<Shader> = match kind {
        CacheKind::Programs => match entry::decode_program(&mut input, fingerprint, builtins) {
            Ok(program) => {
                summary.uniforms = program.uniform_storage.len();
                program.stages.into_iter().flatten().collect()
            }
            Err(e) => {
                summary.error = Some(e.to_string());
                Vec::new()
            }
        },
        CacheKind::Shaders => match entry::decode_shader(&mut input, fingerprint, builtins) {
            Ok(shader) => vec![shader],
            Err(e) => {
                summary.error = Some(e.to_string());
                Vec::new()
            }
        },
    };

    summary.stages = shaders.iter().map(|s| s.stage.name()).collect();
    if with_dumps {
        summary.dumps = shaders.iter().map(print::dump).collect();
    }
    Ok(summary)
}
