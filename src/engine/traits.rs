use std::path::PathBuf;

use anyhow::Result;

use crate::config::EngineConfig;

/// Working context handed to the engine when the configuration came from a
/// file. Relative paths in that file resolve against `directory`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub directory: PathBuf,
}

/// A module discovered by the engine's loaders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: String,
    pub filename: Option<PathBuf>,
}

/// The documentation engine that loads, processes and renders modules.
#[cfg_attr(test, mockall::automock)]
pub trait DocEngine {
    fn load_modules<'a>(
        &self,
        config: &EngineConfig,
        context: Option<&'a Context>,
    ) -> Result<Vec<ModuleInfo>>;

    /// Applies the configured processors to `modules`.
    fn process<'a>(
        &self,
        config: &EngineConfig,
        context: Option<&'a Context>,
        modules: &mut Vec<ModuleInfo>,
    ) -> Result<()>;

    fn render<'a>(
        &self,
        config: &EngineConfig,
        context: Option<&'a Context>,
        modules: &[ModuleInfo],
    ) -> Result<()>;
}
