use std::path::PathBuf;

use thiserror::Error;

/// Configuration problems that abort a render session.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no python loader found")]
    NoPythonLoader,

    #[error("renderer `{0}` does not write a single output file")]
    UnsupportedRenderer(String),

    #[error("configuration must be a mapping, found {0}")]
    NotAMapping(&'static str),

    #[error("{} has no [tool.pydoc-markdown] table", .0.display())]
    MissingPyprojectSection(PathBuf),

    #[error("invalid {section} entry: {reason}")]
    InvalidEntry {
        section: &'static str,
        reason: String,
    },
}
