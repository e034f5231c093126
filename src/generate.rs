use std::collections::BTreeSet;
use std::fs;
use std::path::{self, Path, PathBuf, MAIN_SEPARATOR};

use anyhow::{Context as _, Result};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::ConfigSource;
use crate::engine::DocEngine;
use crate::resolver::file_to_module;
use crate::session::{Overrides, RenderSession};

pub const DEFAULT_CONFIG: &str = "./pydoc-markdown.yml";
pub const DEFAULT_PACKAGE_DIR: &str = "erptools/";
pub const DEFAULT_DOCS_DIR: &str = "./docs/erptools/";
pub const DEFAULT_SKIP_FILES: &[&str] = &["__init__.py", "version.py"];

/// Inputs of one documentation run over a package.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub config: PathBuf,
    pub package_dir: String,
    pub docs_dir: String,
    pub skip_files: Vec<String>,
    /// Explicit sources; `None` walks `package_dir`.
    pub files: Option<Vec<String>>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            config: PathBuf::from(DEFAULT_CONFIG),
            package_dir: DEFAULT_PACKAGE_DIR.to_string(),
            docs_dir: DEFAULT_DOCS_DIR.to_string(),
            skip_files: DEFAULT_SKIP_FILES.iter().map(|s| s.to_string()).collect(),
            files: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedModule {
    pub source: String,
    pub module: String,
    pub output: String,
}

/// What a run did, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateReport {
    pub rendered: Vec<RenderedModule>,
    pub skipped: Vec<String>,
    pub watch_files: BTreeSet<PathBuf>,
}

fn with_trailing_separator(dir: &str) -> String {
    if dir.ends_with('/') || dir.ends_with(MAIN_SEPARATOR) {
        dir.to_string()
    } else {
        format!("{dir}/")
    }
}

/// Last non-empty segment of a directory path.
pub fn package_name(package_dir: &str) -> &str {
    package_dir
        .split(|c: char| c == '/' || c == MAIN_SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .last()
        .unwrap_or("")
}

fn base_name(file: &str) -> &str {
    Path::new(file)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(file)
}

/// Maps a source file to its Markdown page under `docs_dir`.
pub fn output_path(file: &str, package_dir: &str, docs_dir: &str) -> String {
    let relocated = file.replacen(package_dir, docs_dir, 1);
    match relocated.strip_suffix(".py") {
        Some(stem) => format!("{stem}.md"),
        None => relocated,
    }
}

/// Collects `.py` files under `package_dir`, sorted by path, leaving out
/// skip-listed base names.
///
/// A missing root or unreadable entries are logged and yield no sources.
pub fn discover_sources(package_dir: &str, skip_files: &[String]) -> Result<Vec<String>> {
    let mut sources = Vec::new();

    if !Path::new(package_dir).exists() {
        warn!(package_dir, "Package directory does not exist, nothing to document");
        return Ok(sources);
    }

    for entry in WalkDir::new(package_dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(package_dir, error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        // Follows symlinks to files; symlinked directories are not descended.
        if !entry.path().is_file() {
            continue;
        }

        let Some(path) = entry.path().to_str() else {
            warn!(path = %entry.path().display(), "Skipping non UTF-8 path");
            continue;
        };
        let name = base_name(path);
        if name.ends_with(".py") && !skip_files.iter().any(|skip| skip == name) {
            sources.push(path.to_string());
        }
    }

    debug!(count = sources.len(), package_dir, "Discovered sources");
    Ok(sources)
}

/// Renders one Markdown page per module of the package.
///
/// Files run one at a time in order; the first error aborts the run.
pub fn generate<E: DocEngine + ?Sized>(
    options: &GenerateOptions,
    engine: &E,
) -> Result<GenerateReport> {
    let package_dir = with_trailing_separator(&options.package_dir);
    let docs_dir = with_trailing_separator(&options.docs_dir);
    let package = package_name(&package_dir);

    let sources = match &options.files {
        Some(files) => files.clone(),
        None => discover_sources(&package_dir, &options.skip_files)?,
    };

    let mut report = GenerateReport::default();

    for file in sources {
        let name = base_name(&file);
        // Substring match on purpose; files outside the package may share the name.
        if options.skip_files.iter().any(|skip| skip == name) || !file.contains(package) {
            debug!(file = %file, "Skipping file");
            report.skipped.push(file);
            continue;
        }

        info!(file = %file, "Processing file");
        let module = file_to_module(&file, &package_dir);
        let output = output_path(&file, &package_dir, &docs_dir);

        if let Some(parent) = Path::new(&output).parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let session = RenderSession::new(
            Some(ConfigSource::File(options.config.clone())),
            Overrides {
                render_toc: Some(true),
                search_path: Some(vec![package_dir.clone()]),
                modules: Some(vec![module.clone()]),
                packages: Some(Vec::new()),
                py2: Some(false),
            },
        );

        let mut loaded = session
            .load()
            .with_context(|| format!("Failed to load configuration for {}", file))?;
        // The engine runs in the config directory; pages land relative to ours.
        let target = path::absolute(&output)
            .with_context(|| format!("Failed to resolve {}", output))?;
        loaded
            .config
            .renderer
            .set_output_filename(target.to_string_lossy())?;
        let watch_files = session
            .render(engine, &loaded)
            .with_context(|| format!("Failed to render {}", file))?;

        report.watch_files.extend(watch_files);
        report.rendered.push(RenderedModule {
            source: file,
            module,
            output,
        });
    }

    info!(
        rendered = report.rendered.len(),
        skipped = report.skipped.len(),
        "Documentation run complete"
    );
    Ok(report)
}
