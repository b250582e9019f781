//! The files of one run and the role each plays.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::base::FileId;

/// What a loaded file contributes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// A header of the wrapped library, lowered into the symbol table.
    Header,
    /// A binding declaration file.
    Binding,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct SourceEntry {
    path: Arc<str>,
    kind: SourceKind,
}

/// Display paths of every file in a run, in the order they were added.
///
/// Diagnostics only carry a [`FileId`]; the reporter turns it back into a
/// path through this map.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceRoot {
    files: IndexMap<FileId, SourceEntry>,
}

impl SourceRoot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a binding file.
    pub fn insert(&mut self, file: FileId, path: impl Into<Arc<str>>) {
        self.insert_kind(file, path, SourceKind::Binding);
    }

    pub fn insert_kind(&mut self, file: FileId, path: impl Into<Arc<str>>, kind: SourceKind) {
        self.files.insert(
            file,
            SourceEntry {
                path: path.into(),
                kind,
            },
        );
    }

    pub fn path(&self, file: FileId) -> Option<&str> {
        self.files.get(&file).map(|entry| entry.path.as_ref())
    }

    pub fn kind(&self, file: FileId) -> Option<SourceKind> {
        self.files.get(&file).map(|entry| entry.kind)
    }

    pub fn contains(&self, file: FileId) -> bool {
        self.files.contains_key(&file)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FileId, &str)> + '_ {
        self.files.iter().map(|(&id, entry)| (id, entry.path.as_ref()))
    }

    /// Files of one kind, in insertion order.
    pub fn files_of(&self, kind: SourceKind) -> impl Iterator<Item = FileId> + '_ {
        self.files
            .iter()
            .filter(move |(_, entry)| entry.kind == kind)
            .map(|(&id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
