//! Pipeline error taxonomy.

use thiserror::Error;

/// Errors raised while parsing, transforming, or writing record streams.
///
/// `Config` is raised eagerly, before any record flows; the other
/// variants surface lazily, when the failing element is pulled from the
/// stream.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input text that is not a valid JSON document, attributed to the
    /// physical line where the record started.
    #[error("line {line}: malformed JSON record: {source}")]
    MalformedRecord {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A per-record domain operation failed on a structurally valid
    /// but semantically bad record.
    #[error("record {index}: {message}")]
    Transform { index: usize, message: String },

    /// Invalid stage name, option, value, or combination.
    #[error("invalid pipeline configuration: {0}")]
    Config(String),

    /// Reader or writer failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn config(message: impl Into<String>) -> Self {
        PipelineError::Config(message.into())
    }

    pub fn transform(index: usize, message: impl Into<String>) -> Self {
        PipelineError::Transform {
            index,
            message: message.into(),
        }
    }

    /// Whether a lenient drive may skip past this failure.
    ///
    /// Bad records are recoverable; broken configuration or I/O is not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::MalformedRecord { .. } | PipelineError::Transform { .. }
        )
    }
}
