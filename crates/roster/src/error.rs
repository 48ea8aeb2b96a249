use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading a roster file.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("failed to read roster file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// `origin` is the file path, or `"inline"` for in-memory input.
    #[error("invalid roster JSON ({origin}): {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
}
