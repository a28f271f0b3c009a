use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExposureError {
    #[error("Exposure store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Exposure store at {path} is not a JSON object: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No exposure store path could be resolved")]
    NoStorePath,
}
