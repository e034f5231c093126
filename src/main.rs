use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use pydocgen::engine::DEFAULT_PROGRAM;
use pydocgen::generate::{DEFAULT_CONFIG, DEFAULT_DOCS_DIR, DEFAULT_PACKAGE_DIR};
use pydocgen::{generate, GenerateOptions, PydocMarkdownCli};

/// Generate one Markdown page per module of a Python package.
#[derive(Debug, Parser)]
#[command(name = "pydocgen", version, about)]
struct Cli {
    /// pydoc-markdown configuration (YAML, JSON or pyproject.toml)
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Root of the package source tree
    #[arg(short, long = "package_dir", alias = "package-dir", default_value = DEFAULT_PACKAGE_DIR)]
    package_dir: String,

    /// Output root for the generated Markdown
    #[arg(short, long = "docs_dir", alias = "docs-dir", default_value = DEFAULT_DOCS_DIR)]
    docs_dir: String,

    /// Source files to process instead of walking the package
    #[arg(short, long, num_args = 0..)]
    files: Option<Vec<String>>,

    /// Base names that are never documented
    #[arg(
        short,
        long = "skip_files",
        alias = "skip-files",
        num_args = 0..,
        default_values = ["__init__.py", "version.py"]
    )]
    skip_files: Vec<String>,

    /// pydoc-markdown executable
    #[arg(long, env = "PYDOC_MARKDOWN", default_value = DEFAULT_PROGRAM)]
    engine: PathBuf,

    /// More output (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let engine = PydocMarkdownCli::locate(&cli.engine)?;
    let options = GenerateOptions {
        config: cli.config,
        package_dir: cli.package_dir,
        docs_dir: cli.docs_dir,
        skip_files: cli.skip_files,
        files: cli.files,
    };

    let report = generate(&options, &engine)?;
    for path in &report.watch_files {
        tracing::debug!(path = %path.display(), "Watch");
    }

    Ok(())
}
