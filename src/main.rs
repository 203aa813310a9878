//! Power Query Symbols CLI
//!
//! Usage:
//!   pqsym generate [PATHS...] [--out DIR] [--strict] [--parallel] [--clean]
//!   pqsym inspect FILE
//!   pqsym cleanup [--out DIR]
//!   pqsym sample [--out DIR]
//!   pqsym status
//!
//! Settings come from `pqsym.toml` in the workspace root when present.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use walkdir::WalkDir;

use pq_symbols::{to_symbol_json, Config, SourceFile, SymbolEmitter, SymbolScanner};

/// Generate Power Query symbol files for IntelliSense
#[derive(Parser, Debug)]
#[command(name = "pqsym", author, version, about)]
struct Args {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Workspace root
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    /// Config file (defaults to <root>/pqsym.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract symbols and write one symbol file per source file
    Generate {
        /// Files or directories to scan (defaults to the workspace root)
        paths: Vec<PathBuf>,

        /// Output directory (overrides symbols_directory)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Do not fall back to line-based extraction on parse errors
        #[arg(long)]
        strict: bool,

        /// Extract files in parallel
        #[arg(long)]
        parallel: bool,

        /// Remove existing symbol files first
        #[arg(long)]
        clean: bool,
    },

    /// Print the symbol descriptors of one file
    Inspect {
        file: PathBuf,
    },

    /// Remove all symbol files from the output directory
    Cleanup {
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Write a sample symbol file for checking the editor setup
    Sample {
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show configuration and output directory state
    Status,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load(&args.root)?,
    };

    match args.command {
        Command::Generate {
            paths,
            out,
            strict,
            parallel,
            clean,
        } => {
            config.use_fallback &= !strict;
            config.parallel |= parallel;
            generate(&args.root, &config, &paths, out, clean)
        }
        Command::Inspect { file } => inspect(&args.root, &config, &file),
        Command::Cleanup { out } => {
            let emitter = SymbolEmitter::new(output_dir(&args.root, &config, out));
            let report = emitter.cleanup();
            println!("Removed {} symbol files from {}", report.removed, emitter.output_dir().display());
            if report.failed > 0 {
                eprintln!("{} files could not be removed", report.failed);
                process::exit(1);
            }
            Ok(())
        }
        Command::Sample { out } => {
            let emitter = SymbolEmitter::new(output_dir(&args.root, &config, out));
            let path = emitter.write_sample_symbols()?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        Command::Status => status(&args.root, &config),
    }
}

fn init_logging(log_level: &str) -> anyhow::Result<()> {
    if std::env::var_os("RUST_LOG").is_some() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .with_target(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
        return Ok(());
    }

    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn output_dir(root: &Path, config: &Config, out: Option<PathBuf>) -> PathBuf {
    out.unwrap_or_else(|| config.symbols_dir(root))
}

/// Supported files below `paths`, skipping excluded directories
fn discover(root: &Path, config: &Config, paths: &[PathBuf]) -> Vec<Arc<SourceFile>> {
    let default_paths = [root.to_path_buf()];
    let paths = if paths.is_empty() { &default_paths[..] } else { paths };

    let mut files = Vec::new();
    for path in paths {
        let walker = WalkDir::new(path).sort_by_file_name().into_iter().filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !config.is_excluded(&entry.file_name().to_string_lossy())
        });
        for entry in walker.filter_map(|entry| entry.ok()) {
            if entry.file_type().is_file() && config.is_supported(entry.path()) {
                files.push(Arc::new(SourceFile::under_root(entry.into_path(), root)));
            }
        }
    }
    files
}

fn generate(root: &Path, config: &Config, paths: &[PathBuf], out: Option<PathBuf>, clean: bool) -> anyhow::Result<()> {
    let files = discover(root, config, paths);
    let report = SymbolScanner::from_config(config).scan(&files);

    let emitter = SymbolEmitter::new(output_dir(root, config, out));
    if clean {
        emitter.cleanup();
    }
    let emitted = emitter
        .emit(&report.symbols)
        .context("symbol generation failed")?;

    println!(
        "Generated {} symbol files ({} symbols) from {} source files in {}",
        emitted.files_written,
        emitted.symbols_written,
        report.files_scanned,
        emitter.output_dir().display()
    );
    for failure in &report.failures {
        eprintln!("skipped {}: {}", failure.path.display(), failure.error);
    }
    for failure in &emitted.failures {
        eprintln!("failed {}: {}", failure.path.display(), failure.error);
    }

    if emitted.is_partial() {
        process::exit(1);
    }
    Ok(())
}

fn inspect(root: &Path, config: &Config, file: &Path) -> anyhow::Result<()> {
    if !file.is_file() {
        bail!("{} is not a file", file.display());
    }
    let source = Arc::new(SourceFile::under_root(file, root));
    let symbols = SymbolScanner::from_config(config).scan_file(&source);
    println!("{}", to_symbol_json(&symbols)?);
    Ok(())
}

fn status(root: &Path, config: &Config) -> anyhow::Result<()> {
    let emitter = SymbolEmitter::new(config.symbols_dir(root));
    println!("Workspace root:    {}", root.display());
    println!("Symbols directory: {}", emitter.output_dir().display());
    println!("File extensions:   {}", config.file_extensions.join(", "));
    println!("Exclude patterns:  {}", config.exclude_patterns.join(", "));
    println!("Fallback parser:   {}", if config.use_fallback { "on" } else { "off" });
    println!("Parallel scan:     {}", if config.parallel { "on" } else { "off" });
    println!("Symbol files:      {}", emitter.symbol_files().len());
    Ok(())
}
