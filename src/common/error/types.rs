//! Unified error types for the deck toolkit.
//!
//! Every subsystem (filters, expressions, archive, org chart pipeline, data
//! loading) reports through this enum so that the orchestrator sees a single
//! error surface. None of these errors are retried internally.
use thiserror::Error;

use crate::template::filters::ValidationError;

/// Main error type for deck operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A filter was invoked with arguments outside its contract
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A template placeholder failed to compile or evaluate
    #[error("Template expression error in `{placeholder}`: {message}")]
    TemplateExpression { placeholder: String, message: String },

    /// No media entry matched a replacement request
    #[error("Image not found: no media entry with MD5 {md5}{}", extension_suffix(.extension))]
    ImageNotFound {
        md5: String,
        extension: Option<String>,
    },

    /// Input bytes are not a usable zip archive
    #[error("Invalid archive: {0}")]
    ArchiveFormat(String),

    /// A templater operation was invoked out of order
    #[error("Invalid templater state: {0}")]
    InvalidState(String),

    /// The external graph layout engine failed
    #[error("Layout engine error: {0}")]
    Layout(String),

    /// The SVG produced by the layout engine could not be normalized
    #[error("SVG error: {0}")]
    Svg(String),

    /// Rasterization failed
    #[error("Rasterization error: {0}")]
    Raster(String),

    /// Data document loading or interpretation failed
    #[error("Data error: {0}")]
    Data(String),

    /// Deck configuration is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// ZIP library error
    #[error("ZIP error: {0}")]
    Zip(String),

    /// XML library error
    #[error("XML error: {0}")]
    Xml(String),

    /// JSON library error
    #[error("JSON error: {0}")]
    Json(String),

    /// YAML library error
    #[error("YAML error: {0}")]
    Yaml(String),
}

fn extension_suffix(extension: &Option<String>) -> String {
    match extension {
        Some(ext) => format!(" and extension '{ext}'"),
        None => String::new(),
    }
}

impl Error {
    /// Build a [`Error::TemplateExpression`] for the given placeholder text.
    pub fn template_expression(placeholder: impl Into<String>, message: impl ToString) -> Self {
        Error::TemplateExpression {
            placeholder: placeholder.into(),
            message: message.to_string(),
        }
    }
}

/// Result type for deck operations.
pub type Result<T> = std::result::Result<T, Error>;
