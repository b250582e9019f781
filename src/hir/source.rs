//! Path to [`FileId`] assignment and file contents.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::base::FileId;

use super::input::{SourceKind, SourceRoot};

/// Assigns stable ids to paths and holds file contents.
///
/// Shared between the loader and the parallel parse, so access goes
/// through a read-write lock.
#[derive(Debug, Default)]
pub struct FileSet {
    inner: RwLock<FileSetInner>,
}

#[derive(Debug, Default)]
struct FileSetInner {
    path_to_id: IndexMap<PathBuf, FileId>,
    id_to_path: IndexMap<FileId, PathBuf>,
    kinds: IndexMap<FileId, SourceKind>,
    contents: IndexMap<FileId, Arc<str>>,
    next_id: u32,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id of `path`, assigning the next free one on first use.
    pub fn file_id(&self, path: &Path) -> FileId {
        {
            let inner = self.inner.read();
            if let Some(&id) = inner.path_to_id.get(path) {
                return id;
            }
        }

        let mut inner = self.inner.write();
        // Another writer may have won the race.
        if let Some(&id) = inner.path_to_id.get(path) {
            return id;
        }

        let id = FileId::new(inner.next_id);
        inner.next_id += 1;
        inner.path_to_id.insert(path.to_owned(), id);
        inner.id_to_path.insert(id, path.to_owned());
        id
    }

    /// Register `path` with its contents in one step.
    pub fn add(&self, path: &Path, kind: SourceKind, contents: impl Into<Arc<str>>) -> FileId {
        let id = self.file_id(path);
        let mut inner = self.inner.write();
        inner.kinds.insert(id, kind);
        inner.contents.insert(id, contents.into());
        id
    }

    pub fn path(&self, file: FileId) -> Option<PathBuf> {
        self.inner.read().id_to_path.get(&file).cloned()
    }

    pub fn kind(&self, file: FileId) -> Option<SourceKind> {
        self.inner.read().kinds.get(&file).copied()
    }

    pub fn set_contents(&self, file: FileId, contents: impl Into<Arc<str>>) {
        self.inner.write().contents.insert(file, contents.into());
    }

    pub fn contents(&self, file: FileId) -> Option<Arc<str>> {
        self.inner.read().contents.get(&file).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().path_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids in assignment order.
    pub fn files(&self) -> Vec<FileId> {
        self.inner.read().id_to_path.keys().copied().collect()
    }

    /// Ids of one kind with their contents, in assignment order.
    pub fn sources(&self, kind: SourceKind) -> Vec<(FileId, Arc<str>)> {
        let inner = self.inner.read();
        inner
            .kinds
            .iter()
            .filter(|(_, k)| **k == kind)
            .filter_map(|(id, _)| inner.contents.get(id).map(|text| (*id, text.clone())))
            .collect()
    }

    /// Display paths for reporting.
    pub fn source_root(&self) -> SourceRoot {
        let inner = self.inner.read();
        let mut root = SourceRoot::new();
        for (&id, path) in &inner.id_to_path {
            let kind = inner.kinds.get(&id).copied().unwrap_or(SourceKind::Binding);
            root.insert_kind(id, path.display().to_string(), kind);
        }
        root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_set_id_assignment() {
        let files = FileSet::new();

        let id1 = files.file_id(Path::new("/bind/a.cpp"));
        let id2 = files.file_id(Path::new("/bind/b.cpp"));
        let id3 = files.file_id(Path::new("/bind/a.cpp"));

        assert_ne!(id1, id2);
        assert_eq!(id1, id3);
    }

    #[test]
    fn test_file_set_contents() {
        let files = FileSet::new();
        let id = files.file_id(Path::new("/bind/prim.cpp"));
        assert!(files.contents(id).is_none());

        files.set_contents(id, "class UsdPrim {};");
        assert_eq!(files.contents(id).as_deref(), Some("class UsdPrim {};"));
    }

    #[test]
    fn test_sources_filters_by_kind() {
        let files = FileSet::new();
        let header = files.add(Path::new("/inc/prim.h"), SourceKind::Header, "class UsdPrim;");
        let binding = files.add(Path::new("/bind/prim.cpp"), SourceKind::Binding, "class UsdPrim {};");

        let headers: Vec<FileId> = files.sources(SourceKind::Header).into_iter().map(|(id, _)| id).collect();
        assert_eq!(headers, vec![header]);
        let root = files.source_root();
        assert_eq!(root.path(binding), Some("/bind/prim.cpp"));
        assert_eq!(root.kind(header), Some(SourceKind::Header));
    }

    #[test]
    fn test_re_adding_a_path_replaces_contents() {
        let files = FileSet::new();
        let first = files.add(Path::new("/bind/a.cpp"), SourceKind::Binding, "class A {};");
        let second = files.add(Path::new("/bind/a.cpp"), SourceKind::Binding, "class B {};");
        assert_eq!(first, second);
        assert_eq!(files.len(), 1);
        assert_eq!(files.contents(first).as_deref(), Some("class B {};"));
    }
}
