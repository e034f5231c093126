use std::collections::BTreeSet;
use std::path::{self, PathBuf};

use anyhow::{Context as _, Result};
use tracing::{debug, warn};

use crate::config::{ConfigSource, EngineConfig, Renderer};
use crate::engine::{Context, DocEngine};
use crate::error::ConfigError;

/// Per-session overrides of the base configuration.
///
/// `None` leaves the configured value alone; `Some` replaces it, even when
/// the replacement is empty or `false`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    /// Markdown renderer's `render_toc`.
    pub render_toc: Option<bool>,
    /// Python loader's `search_path`.
    pub search_path: Option<Vec<String>>,
    /// Python loader's `modules`.
    pub modules: Option<Vec<String>>,
    /// Python loader's `packages`.
    pub packages: Option<Vec<String>>,
    /// Parse legacy Python 2 syntax (disables `print_function`).
    pub py2: Option<bool>,
}

impl Overrides {
    fn touches_loader(&self) -> bool {
        self.modules.is_some()
            || self.packages.is_some()
            || self.search_path.is_some()
            || self.py2.is_some()
    }
}

/// The effective configuration of a session, ready for the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub config: EngineConfig,
    pub context: Option<Context>,
}

/// One documentation pass over a module/package scope.
#[derive(Debug, Clone)]
pub struct RenderSession {
    source: Option<ConfigSource>,
    overrides: Overrides,
}

impl RenderSession {
    pub fn new(source: Option<ConfigSource>, overrides: Overrides) -> Self {
        Self { source, overrides }
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    fn apply_overrides(&self, config: &mut EngineConfig) -> Result<(), ConfigError> {
        if self.overrides.touches_loader() {
            let loader = config.python_loader_mut().ok_or(ConfigError::NoPythonLoader)?;

            if let Some(modules) = &self.overrides.modules {
                loader.modules = Some(modules.clone());
            }
            if let Some(packages) = &self.overrides.packages {
                loader.packages = Some(packages.clone());
            }
            if let Some(search_path) = &self.overrides.search_path {
                loader.search_path = Some(search_path.clone());
            }
            if let Some(py2) = self.overrides.py2 {
                loader.parser.print_function = Some(!py2);
            }
        }

        if let Some(render_toc) = self.overrides.render_toc {
            match &mut config.renderer {
                Renderer::Markdown(markdown) => markdown.render_toc = Some(render_toc),
                Renderer::Other { kind, .. } => {
                    warn!(renderer = %kind, "render_toc override ignored for non-markdown renderer")
                }
            }
        }

        Ok(())
    }

    /// Builds the effective configuration: base source, then overrides,
    /// then the engine context for file-based sources.
    pub fn load(&self) -> Result<LoadedConfig> {
        let mut config = match &self.source {
            Some(source) => source.load()?,
            None => EngineConfig::default(),
        };
        self.apply_overrides(&mut config)?;

        let context = match self.source.as_ref().and_then(ConfigSource::path) {
            Some(config_path) => {
                let absolute = path::absolute(config_path)
                    .with_context(|| format!("Failed to resolve {}", config_path.display()))?;
                let directory = absolute.parent().map(PathBuf::from).unwrap_or(absolute);
                debug!(directory = %directory.display(), "Engine context");
                Some(Context { directory })
            }
            None => None,
        };

        if !config.unknown_fields.is_empty() {
            warn!(
                "Unknown configuration options:\n{}\n",
                config.unknown_fields.join("\n------\n")
            );
        }

        Ok(LoadedConfig { config, context })
    }

    /// Loads, processes and renders the configured modules.
    ///
    /// Returns the files to watch for changes: every module's source file
    /// plus the configuration file when there is one, deduplicated.
    pub fn render<E: DocEngine + ?Sized>(
        &self,
        engine: &E,
        loaded: &LoadedConfig,
    ) -> Result<Vec<PathBuf>> {
        let context = loaded.context.as_ref();

        let mut modules = engine.load_modules(&loaded.config, context)?;
        engine.process(&loaded.config, context, &mut modules)?;
        engine.render(&loaded.config, context, &modules)?;

        let mut watch_files: BTreeSet<PathBuf> =
            modules.into_iter().filter_map(|module| module.filename).collect();
        if let Some(path) = self.source.as_ref().and_then(ConfigSource::path) {
            watch_files.insert(path.to_path_buf());
        }

        Ok(watch_files.into_iter().collect())
    }
}
