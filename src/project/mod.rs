//! Loading a run's inputs from disk.

pub mod workspace_loader;

pub use workspace_loader::{collect_file_paths, WorkspaceLoader};

use std::path::PathBuf;

use thiserror::Error;

use crate::hir::LoadError;

/// Failures that stop a run before resolution starts.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Library headers must parse; there is no partial symbol table.
    #[error("{path}:{line}:{col}: syntax error in header: {message}")]
    HeaderSyntax {
        path: String,
        line: u32,
        col: u32,
        message: String,
    },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[cfg(feature = "interchange")]
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[cfg(feature = "interchange")]
    #[error("invalid CastXML in {path}: {message}")]
    CastXml { path: String, message: String },
}
