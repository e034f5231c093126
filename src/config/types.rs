use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::Value;

use crate::error::ConfigError;

/// Pass-through keys the typed model does not interpret.
pub type Options = BTreeMap<String, Value>;

const PYTHON_LOADER_TYPES: &[&str] = &[
    "python",
    "pydoc_markdown.contrib.loaders.python.PythonLoader",
];

const MARKDOWN_RENDERER_TYPES: &[&str] = &[
    "markdown",
    "pydoc_markdown.contrib.renderers.markdown.MarkdownRenderer",
];

/// Top-level keys the engine understands. Anything else lands in
/// `EngineConfig::unknown_fields`.
pub const KNOWN_FIELDS: &[&str] = &["loaders", "processors", "renderer", "hooks"];

// Engine configuration, shaped like a pydoc-markdown config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_loaders")]
    pub loaders: Vec<Loader>,
    #[serde(default = "default_processors")]
    pub processors: Vec<Value>,
    #[serde(default)]
    pub renderer: Renderer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hooks: Option<Value>,
    #[serde(skip)]
    pub unknown_fields: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            loaders: default_loaders(),
            processors: default_processors(),
            renderer: Renderer::default(),
            hooks: None,
            unknown_fields: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// First loader of the Python kind, if any.
    pub fn python_loader_mut(&mut self) -> Option<&mut PythonLoader> {
        self.loaders.iter_mut().find_map(|loader| match loader {
            Loader::Python(python) => Some(python),
            Loader::Other { .. } => None,
        })
    }

    pub fn python_loader(&self) -> Option<&PythonLoader> {
        self.loaders.iter().find_map(|loader| match loader {
            Loader::Python(python) => Some(python),
            Loader::Other { .. } => None,
        })
    }
}

fn default_loaders() -> Vec<Loader> {
    vec![Loader::Python(PythonLoader::default())]
}

fn default_processors() -> Vec<Value> {
    ["filter", "smart", "crossref"]
        .into_iter()
        .map(|kind| {
            let mut processor = serde_yaml::Mapping::new();
            processor.insert(Value::from("type"), Value::from(kind));
            Value::Mapping(processor)
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PythonLoader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_path: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packages: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "ParserOptions::is_empty")]
    pub parser: ParserOptions,
    #[serde(flatten)]
    pub options: Options,
}

/// Options forwarded to the Python source parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParserOptions {
    /// `false` parses legacy `print x` statements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_function: Option<bool>,
    #[serde(flatten)]
    pub options: Options,
}

impl ParserOptions {
    fn is_empty(&self) -> bool {
        self.print_function.is_none() && self.options.is_empty()
    }
}

/// A loader entry, resolved by its `type` tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Loader {
    Python(PythonLoader),
    Other { kind: String, options: Options },
}

impl Loader {
    pub fn kind(&self) -> &str {
        match self {
            Loader::Python(_) => PYTHON_LOADER_TYPES[0],
            Loader::Other { kind, .. } => kind,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkdownRenderer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_toc: Option<bool>,
    #[serde(flatten)]
    pub options: Options,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Renderer {
    Markdown(MarkdownRenderer),
    Other { kind: String, options: Options },
}

impl Default for Renderer {
    fn default() -> Self {
        Renderer::Markdown(MarkdownRenderer::default())
    }
}

impl Renderer {
    pub fn kind(&self) -> &str {
        match self {
            Renderer::Markdown(_) => MARKDOWN_RENDERER_TYPES[0],
            Renderer::Other { kind, .. } => kind,
        }
    }

    /// Points the renderer at a single output file.
    pub fn set_output_filename(&mut self, filename: impl Into<String>) -> Result<(), ConfigError> {
        match self {
            Renderer::Markdown(markdown) => {
                markdown.filename = Some(filename.into());
                Ok(())
            }
            Renderer::Other { kind, .. } => Err(ConfigError::UnsupportedRenderer(kind.clone())),
        }
    }

    pub fn output_filename(&self) -> Option<&str> {
        match self {
            Renderer::Markdown(markdown) => markdown.filename.as_deref(),
            Renderer::Other { .. } => None,
        }
    }
}

// Serialized form of a tagged entry: `type` followed by the entry's own keys.
#[derive(Serialize)]
struct Tagged<'a, T: Serialize> {
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(flatten)]
    inner: &'a T,
}

fn split_kind(section: &'static str, mut raw: Options) -> Result<(String, Options), ConfigError> {
    match raw.remove("type") {
        Some(Value::String(kind)) => Ok((kind, raw)),
        Some(_) => Err(ConfigError::InvalidEntry {
            section,
            reason: "`type` must be a string".to_string(),
        }),
        None => Err(ConfigError::InvalidEntry {
            section,
            reason: "missing `type`".to_string(),
        }),
    }
}

fn from_options<T: for<'de> Deserialize<'de>>(
    section: &'static str,
    options: Options,
) -> Result<T, ConfigError> {
    serde_yaml::to_value(options)
        .and_then(serde_yaml::from_value)
        .map_err(|e| ConfigError::InvalidEntry {
            section,
            reason: e.to_string(),
        })
}

impl Serialize for Loader {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Loader::Python(python) => Tagged {
                kind: self.kind(),
                inner: python,
            }
            .serialize(serializer),
            Loader::Other { kind, options } => Tagged {
                kind,
                inner: options,
            }
            .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Loader {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Options::deserialize(deserializer)?;
        let (kind, options) = split_kind("loader", raw).map_err(D::Error::custom)?;

        if PYTHON_LOADER_TYPES.contains(&kind.as_str()) {
            from_options("loader", options)
                .map(Loader::Python)
                .map_err(D::Error::custom)
        } else {
            Ok(Loader::Other { kind, options })
        }
    }
}

impl Serialize for Renderer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Renderer::Markdown(markdown) => Tagged {
                kind: self.kind(),
                inner: markdown,
            }
            .serialize(serializer),
            Renderer::Other { kind, options } => Tagged {
                kind,
                inner: options,
            }
            .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Renderer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Options::deserialize(deserializer)?;
        let (kind, options) = split_kind("renderer", raw).map_err(D::Error::custom)?;

        if MARKDOWN_RENDERER_TYPES.contains(&kind.as_str()) {
            from_options("renderer", options)
                .map(Renderer::Markdown)
                .map_err(D::Error::custom)
        } else {
            Ok(Renderer::Other { kind, options })
        }
    }
}
