use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_yaml::Value;
use tracing::{debug, info};

use crate::config::types::{EngineConfig, KNOWN_FIELDS};
use crate::error::ConfigError;

/// Where a render session takes its base configuration from.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    File(PathBuf),
    Inline(Value),
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::File(path) => Some(path),
            ConfigSource::Inline(_) => None,
        }
    }

    pub fn load(&self) -> Result<EngineConfig> {
        match self {
            ConfigSource::File(path) => load_file(path),
            ConfigSource::Inline(value) => Ok(from_value(value.clone())?),
        }
    }
}

/// Reads a configuration file.
///
/// `*.toml` files are treated as `pyproject.toml` and must carry a
/// `[tool.pydoc-markdown]` table. Everything else is parsed as YAML, which
/// also covers JSON.
pub fn load_file(path: &Path) -> Result<EngineConfig> {
    info!(config_path = %path.display(), "Loading configuration");

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let value = if path.extension().is_some_and(|ext| ext == "toml") {
        pyproject_section(path, &content)?
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config YAML {}", path.display()))?
    };

    let config = from_value(value)?;
    debug!(
        config_path = %path.display(),
        loaders = config.loaders.len(),
        renderer = config.renderer.kind(),
        "Parsed configuration"
    );
    Ok(config)
}

fn pyproject_section(path: &Path, content: &str) -> Result<Value> {
    let document: toml::Table = toml::from_str(content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let section = document
        .get("tool")
        .and_then(|tool| tool.get("pydoc-markdown"))
        .ok_or_else(|| ConfigError::MissingPyprojectSection(path.to_path_buf()))?;

    serde_yaml::to_value(section)
        .with_context(|| format!("Failed to convert [tool.pydoc-markdown] in {}", path.display()))
}

/// Builds an engine configuration from an in-memory value.
///
/// `null` yields the defaults. Unknown top-level keys are recorded in
/// `unknown_fields` as `$.<key>` and otherwise ignored.
pub fn from_value(value: Value) -> Result<EngineConfig, ConfigError> {
    let mapping = match value {
        Value::Null => return Ok(EngineConfig::default()),
        Value::Mapping(mapping) => mapping,
        Value::Bool(_) => return Err(ConfigError::NotAMapping("a boolean")),
        Value::Number(_) => return Err(ConfigError::NotAMapping("a number")),
        Value::String(_) => return Err(ConfigError::NotAMapping("a string")),
        Value::Sequence(_) => return Err(ConfigError::NotAMapping("a sequence")),
        Value::Tagged(_) => return Err(ConfigError::NotAMapping("a tagged value")),
    };

    let unknown_fields = mapping
        .keys()
        .filter_map(|key| match key {
            Value::String(name) if KNOWN_FIELDS.contains(&name.as_str()) => None,
            Value::String(name) => Some(format!("$.{name}")),
            other => Some(format!("$.{}", serde_yaml::to_string(other).unwrap_or_default().trim())),
        })
        .collect();

    let mut config: EngineConfig =
        serde_yaml::from_value(Value::Mapping(mapping)).map_err(|e| ConfigError::InvalidEntry {
            section: "configuration",
            reason: e.to_string(),
        })?;
    config.unknown_fields = unknown_fields;
    Ok(config)
}
