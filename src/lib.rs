//! # pydocgen
//!
//! Generates one Markdown page per module of a Python package by driving
//! pydoc-markdown with a per-module configuration.

pub mod config;
pub mod engine;
pub mod error;
pub mod generate;
pub mod resolver;
pub mod session;

pub use config::{ConfigSource, EngineConfig};
pub use engine::{Context, DocEngine, ModuleInfo, PydocMarkdownCli};
pub use error::ConfigError;
pub use generate::{generate, GenerateOptions, GenerateReport};
pub use resolver::file_to_module;
pub use session::{LoadedConfig, Overrides, RenderSession};

#[cfg(test)]
mod tests;
