use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::base::FileId;
use crate::hir::{FileSet, SourceKind};

use super::ProjectError;

/// Every file under `dir` whose extension is in `extensions`, sorted by
/// path so that runs over the same tree see the same order.
pub fn collect_file_paths(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, ProjectError> {
    if !dir.is_dir() {
        return Err(ProjectError::DirectoryNotFound(dir.to_owned()));
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|source| ProjectError::Walk {
            path: dir.to_owned(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| e == ext));
        if matches {
            paths.push(entry.into_path());
        }
    }
    paths.sort();
    debug!(dir = %dir.display(), files = paths.len(), "collected files");
    Ok(paths)
}

/// Reads headers and binding files into a [`FileSet`].
pub struct WorkspaceLoader<'a> {
    files: &'a FileSet,
}

impl<'a> WorkspaceLoader<'a> {
    pub fn new(files: &'a FileSet) -> Self {
        Self { files }
    }

    /// Load every matching file under `dir`, in path order.
    pub fn load_directory(
        &self,
        dir: impl AsRef<Path>,
        kind: SourceKind,
        extensions: &[String],
    ) -> Result<Vec<FileId>, ProjectError> {
        let dir = dir.as_ref();
        let paths = collect_file_paths(dir, extensions)?;
        let mut ids = Vec::with_capacity(paths.len());
        for path in &paths {
            ids.push(self.load_file(path, kind)?);
        }
        info!(dir = %dir.display(), ?kind, files = ids.len(), "directory loaded");
        Ok(ids)
    }

    pub fn load_file(&self, path: impl AsRef<Path>, kind: SourceKind) -> Result<FileId, ProjectError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ProjectError::Io {
            path: path.to_owned(),
            source,
        })?;
        Ok(self.files.add(path, kind, text))
    }
}
