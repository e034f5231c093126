use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context as _, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::engine::traits::*;

pub const DEFAULT_PROGRAM: &str = "pydoc-markdown";

// Subset of a docspec module as printed by `pydoc-markdown --dump`.
#[derive(Debug, Deserialize)]
struct DumpedModule {
    name: String,
    #[serde(default)]
    location: Option<DumpedLocation>,
}

#[derive(Debug, Deserialize)]
struct DumpedLocation {
    filename: Option<String>,
}

/// Runs the `pydoc-markdown` executable as the documentation engine.
///
/// The effective configuration is passed inline as JSON, so nothing is
/// written to disk besides what the renderer itself produces.
#[derive(Debug, Clone)]
pub struct PydocMarkdownCli {
    program: PathBuf,
}

impl PydocMarkdownCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Resolves `program` (a bare name or a path) with `which`.
    pub fn locate(program: impl AsRef<Path>) -> Result<Self> {
        let program = program.as_ref();
        let resolved = which::which(program).with_context(|| {
            format!(
                "Cannot find engine {}; install pydoc-markdown or pass --engine",
                program.display()
            )
        })?;
        debug!(engine = %resolved.display(), "Using documentation engine");
        Ok(Self::new(resolved))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(
        &self,
        config: &EngineConfig,
        context: Option<&Context>,
        dump: bool,
    ) -> Result<Command> {
        let inline =
            serde_json::to_string(config).context("Failed to serialize engine configuration")?;

        let mut cmd = Command::new(&self.program);
        if dump {
            cmd.arg("--dump");
        }
        cmd.arg(inline);
        if let Some(context) = context {
            cmd.current_dir(&context.directory);
        }
        Ok(cmd)
    }

    fn run(&self, mut cmd: Command) -> Result<Vec<u8>> {
        let output = cmd
            .output()
            .with_context(|| format!("Failed to execute {}", self.program.display()))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines().filter(|line| !line.trim().is_empty()) {
            debug!(engine = %self.program.display(), "{}", line);
        }

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            );
        }
        Ok(output.stdout)
    }
}

/// Parses the whitespace-separated stream of JSON modules from `--dump`.
pub fn parse_dump(stdout: &[u8]) -> Result<Vec<ModuleInfo>> {
    serde_json::Deserializer::from_slice(stdout)
        .into_iter::<DumpedModule>()
        .map(|module| {
            let module = module.context("Failed to parse module dump")?;
            Ok(ModuleInfo {
                name: module.name,
                filename: module
                    .location
                    .and_then(|location| location.filename)
                    .map(PathBuf::from),
            })
        })
        .collect()
}

impl DocEngine for PydocMarkdownCli {
    fn load_modules(
        &self,
        config: &EngineConfig,
        context: Option<&Context>,
    ) -> Result<Vec<ModuleInfo>> {
        let stdout = self.run(self.command(config, context, true)?)?;
        let modules = parse_dump(&stdout)?;
        debug!(count = modules.len(), "Loaded modules");
        Ok(modules)
    }

    fn process(
        &self,
        _config: &EngineConfig,
        _context: Option<&Context>,
        modules: &mut Vec<ModuleInfo>,
    ) -> Result<()> {
        // `--dump` output is already processed.
        debug!(count = modules.len(), "Processors applied by the engine");
        Ok(())
    }

    fn render(
        &self,
        config: &EngineConfig,
        context: Option<&Context>,
        modules: &[ModuleInfo],
    ) -> Result<()> {
        self.run(self.command(config, context, false)?)?;
        info!(
            output = config.renderer.output_filename().unwrap_or("<engine default>"),
            modules = modules.len(),
            "Rendered"
        );
        Ok(())
    }
}
