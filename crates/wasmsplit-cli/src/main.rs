//! wasmsplit - Split WebAssembly modules into a stripped core binary
//! and a metadata document, and reassemble them byte-for-byte.
//!
//! The `strip` subcommand removes sections from a module according to
//! the selected mode and writes two artifacts: the reduced binary and
//! a JSON metadata document. The `reassemble` subcommand merges the
//! two back into the original module.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;
use wasmsplit_core::{reassemble, strip, MetadataDocument, StripMode};

/// Split WebAssembly modules into a stripped core and a metadata document
#[derive(Parser, Debug)]
#[command(name = "wasmsplit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Strip sections from a module into a metadata document
    Strip(StripArgs),
    /// Reassemble a module from a stripped core and metadata
    Reassemble(ReassembleArgs),
}

#[derive(Args, Debug)]
struct StripArgs {
    /// Input module file
    input: PathBuf,

    /// Output stripped module file
    #[arg(short, long)]
    output: PathBuf,

    /// Output metadata JSON file
    #[arg(short, long)]
    metadata: PathBuf,

    /// Stripping mode
    #[arg(long, value_enum, default_value = "normal")]
    mode: Mode,

    /// Overwrite existing output files
    #[arg(long)]
    force: bool,
}

#[derive(Args, Debug)]
struct ReassembleArgs {
    /// Stripped module file
    stripped: PathBuf,

    /// Metadata JSON file
    metadata: PathBuf,

    /// Output reassembled module file
    #[arg(short, long)]
    output: PathBuf,

    /// Overwrite an existing output file
    #[arg(long)]
    force: bool,
}

/// Section removal policy
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Move Type, Import, and Export sections to metadata
    Normal,
    /// Keep only the Code section in the core
    Aggressive,
}

impl From<Mode> for StripMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Normal => StripMode::Normal,
            Mode::Aggressive => StripMode::Aggressive,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    match cli.command {
        Command::Strip(args) => run_strip(&args),
        Command::Reassemble(args) => run_reassemble(&args),
    }
}

/// Strip a module and write the core plus metadata artifacts
fn run_strip(args: &StripArgs) -> Result<()> {
    let data = fs::read(&args.input)
        .with_context(|| format!("failed to read input module: {}", args.input.display()))?;
    debug!("read {} bytes from {}", data.len(), args.input.display());

    let (core, metadata) = strip(&data, args.mode.into())
        .with_context(|| format!("failed to strip module: {}", args.input.display()))?;

    write_output(&args.output, &core, args.force)?;
    let json = metadata
        .to_json()
        .context("failed to serialize metadata document")?;
    write_output(&args.metadata, json.as_bytes(), args.force)?;

    info!("wrote stripped module to {}", args.output.display());
    info!("wrote metadata to {}", args.metadata.display());
    print_savings(data.len(), core.len());

    Ok(())
}

/// Merge a stripped core and metadata back into the original module
fn run_reassemble(args: &ReassembleArgs) -> Result<()> {
    let core = fs::read(&args.stripped).with_context(|| {
        format!("failed to read stripped module: {}", args.stripped.display())
    })?;
    let text = fs::read_to_string(&args.metadata)
        .with_context(|| format!("failed to read metadata: {}", args.metadata.display()))?;

    let metadata = MetadataDocument::from_json(&text)
        .with_context(|| format!("failed to parse metadata: {}", args.metadata.display()))?;

    let output = reassemble(&core, &metadata).context("failed to reassemble module")?;

    write_output(&args.output, &output, args.force)?;
    info!("wrote reassembled module to {}", args.output.display());
    println!(
        "Reassembled {} ({} bytes)",
        args.output.display(),
        output.len()
    );

    Ok(())
}

/// Write an output file, refusing to clobber without --force
fn write_output(path: &Path, data: &[u8], force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }
    fs::write(path, data).with_context(|| format!("failed to write file: {}", path.display()))
}

/// Report how much the strip saved
fn print_savings(original: usize, stripped: usize) {
    let saved = original.saturating_sub(stripped);
    let percent = if original > 0 {
        100.0 * saved as f64 / original as f64
    } else {
        0.0
    };
    println!("Original size:  {} bytes", original);
    println!("Stripped size:  {} bytes", stripped);
    println!("Saved:          {} bytes ({:.1}%)", saved, percent);
}
