//! Glint CLI: maintenance commands for the shader cache.
//!
//! Provides `glint info` to show the effective configuration and directory
//! usage, `glint inspect` to examine one entry file, `glint evict` to apply
//! the size budget, and `glint clear` to remove every entry.

#![warn(missing_docs)]

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use glint_cache::directory::{self, CacheKind};
use glint_cache::inspect::inspect_entry;
use glint_cache::ShaderCache;
use glint_common::ByteSize;
use glint_config::{load_config_or_default, GlintConfig};
use glint_ir::StandardBuiltins;
use tracing::Level;

/// Glint, the compiled-shader cache maintenance tool.
#[derive(Parser, Debug)]
#[command(name = "glint", version, about = "Glint shader cache tool")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory containing `glint.toml` (defaults to the current directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show configuration, cache directories, and their usage.
    Info,
    /// Decode one entry file and report what it holds.
    Inspect {
        /// Path to the entry.
        path: PathBuf,

        /// Entry kind; inferred from the parent directory if omitted.
        #[arg(short, long, value_enum)]
        kind: Option<KindArg>,

        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,

        /// Include IR dumps of the decoded shaders.
        #[arg(long)]
        dump: bool,
    },
    /// Delete least recently used entries until the size budget holds.
    Evict {
        /// Only this directory; both if omitted.
        #[arg(value_enum)]
        kind: Option<KindArg>,
    },
    /// Delete every entry.
    Clear {
        /// Only this directory; both if omitted.
        #[arg(value_enum)]
        kind: Option<KindArg>,
    },
}

/// Entry directory selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Linked programs.
    Programs,
    /// Standalone shaders.
    Shaders,
}

impl From<KindArg> for CacheKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Programs => CacheKind::Programs,
            KindArg::Shaders => CacheKind::Shaders,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

fn log_level(quiet: bool, verbose: bool) -> Level {
    if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

fn init_logging(quiet: bool, verbose: bool) {
    tracing_subscriber::fmt()
        .with_max_level(log_level(quiet, verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<i32, Box<dyn Error>> {
    let config_dir = match cli.config {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let config = load_config_or_default(&config_dir)?;
    let cache = ShaderCache::new(&config.cache, Arc::new(StandardBuiltins));

    match cli.command {
        Command::Info => info(&config, &cache),
        Command::Inspect {
            path,
            kind,
            json,
            dump,
        } => inspect(&cache, &path, kind, json, dump),
        Command::Evict { kind } => evict(&cache, kind),
        Command::Clear { kind } => clear(&cache, kind),
    }
}

fn selected(kind: Option<KindArg>) -> Vec<CacheKind> {
    match kind {
        Some(kind) => vec![kind.into()],
        None => CacheKind::ALL.to_vec(),
    }
}

fn info(config: &GlintConfig, cache: &ShaderCache) -> Result<i32, Box<dyn Error>> {
    let fp = cache.fingerprint();
    println!("size budget: {}", config.cache.size);
    println!("build:       {}", fp.magic);
    println!("driver:      {} / {}", fp.vendor, fp.renderer);
    for kind in CacheKind::ALL {
        let dir = cache.dir(kind);
        let usage = directory::usage(dir)?;
        println!(
            "{:<12} {} ({} entries, {})",
            format!("{}:", kind.dir_name()),
            dir.display(),
            usage.files,
            ByteSize::new(usage.bytes)
        );
    }
    Ok(0)
}

fn infer_kind(path: &Path) -> Option<CacheKind> {
    let parent = path.parent()?.file_name()?.to_str()?;
    CacheKind::ALL
        .into_iter()
        .find(|kind| kind.dir_name() == parent)
}

fn inspect(
    cache: &ShaderCache,
    path: &Path,
    kind: Option<KindArg>,
    json: bool,
    dump: bool,
) -> Result<i32, Box<dyn Error>> {
    let Some(kind) = kind.map(CacheKind::from).or_else(|| infer_kind(path)) else {
        return Err(format!(
            "cannot tell whether {} is a program or a shader entry; pass --kind",
            path.display()
        )
        .into());
    };
    let summary = inspect_entry(path, kind, cache.fingerprint(), &StandardBuiltins, dump)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("kind:        {}", summary.kind);
        println!("size:        {} bytes", summary.size);
        println!("sentinel:    {}", summary.sentinel);
        println!("hash:        {}", summary.content_hash);
        if let Some(magic) = &summary.magic {
            println!("build:       {magic}");
        }
        if let (Some(vendor), Some(renderer)) = (&summary.vendor, &summary.renderer) {
            println!("driver:      {vendor} / {renderer}");
        }
        println!(
            "fingerprint: {}",
            if summary.fingerprint_ok { "ok" } else { "mismatch" }
        );
        if !summary.stages.is_empty() {
            println!("stages:      {}", summary.stages.join(", "));
        }
        if summary.kind == CacheKind::Programs.dir_name() {
            println!("uniforms:    {}", summary.uniforms);
        }
        if let Some(error) = &summary.error {
            println!("error:       {error}");
        }
        for (stage, text) in summary.stages.iter().zip(&summary.dumps) {
            println!("\n; {stage}\n{text}");
        }
    }
    Ok(if summary.error.is_some() { 2 } else { 0 })
}

fn evict(cache: &ShaderCache, kind: Option<KindArg>) -> Result<i32, Box<dyn Error>> {
    if !cache.is_enabled() {
        tracing::info!("cache is disabled; nothing to evict");
        return Ok(0);
    }
    for kind in selected(kind) {
        let report = cache.evict(kind)?;
        tracing::info!(
            "{}: scanned {} entries, removed {} ({} freed, {} remain)",
            kind.dir_name(),
            report.scanned,
            report.removed,
            ByteSize::new(report.bytes_freed),
            ByteSize::new(report.total_after)
        );
    }
    Ok(0)
}

fn clear(cache: &ShaderCache, kind: Option<KindArg>) -> Result<i32, Box<dyn Error>> {
    for kind in selected(kind) {
        let removed = directory::clear(cache.dir(kind))?;
        tracing::info!("{}: removed {} entries", kind.dir_name(), removed);
    }
    Ok(0)
}
