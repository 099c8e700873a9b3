//! Pipeline error types.
//!
//! Only file-level failures surface as errors. Row-level data problems are
//! recovered in place and counted in a `DataQualityReport` instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to open '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parse error at line {line}: {source}")]
    Csv {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("Missing required columns: {}. Please ensure your file includes these fields.", .0.join(", "))]
    MissingColumns(Vec<&'static str>),

    #[error("Inventory file is empty. Please upload a file with data.")]
    EmptyFile,

    #[error("Invalid analysis policy: {0}")]
    InvalidPolicy(String),

    #[error("Policy parse error: {0}")]
    PolicyParse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Snapshot of {size} bytes exceeds the {limit} byte budget")]
    SnapshotTooLarge { size: usize, limit: usize },
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
