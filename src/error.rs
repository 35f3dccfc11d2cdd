use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Document-level failures. These end the run; page-level problems are
/// reported through [`crate::repair::SkipReason`] instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to load PDF {}: {source}", .path.display())]
    Load { path: PathBuf, source: lopdf::Error },

    #[error("failed to serialize repaired PDF for {}: {message}", .path.display())]
    Save { path: PathBuf, message: String },

    #[error("failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: std::io::Error },
}
