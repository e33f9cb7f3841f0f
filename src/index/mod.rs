//! Path reconstruction from the flat directory table.
//!
//! The table is a pre-order walk of the packaged tree.  A size-0 record
//! pushes a directory onto the cursor, a size-0 `..` record pops it, and
//! every other record is a file living under the current cursor.  The root
//! has no push/pop pair.
//!
//! Replay is tolerant: a `..` at the root and pushes left open at the end of
//! the table are logged and otherwise ignored.

use std::collections::btree_map::{self, BTreeMap};

use tracing::{trace, warn};

use crate::entry::{DirEntry, EntryKind};

// ── PathStack ────────────────────────────────────────────────────────────────

/// Current-directory cursor: the segments from the root to the directory
/// being filled.
#[derive(Debug, Clone, Default)]
pub struct PathStack {
    segments: Vec<String>,
}

impl PathStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str) {
        self.segments.push(normalize(name));
    }

    /// Returns `false` when already at the root.
    pub fn pop(&mut self) -> bool {
        self.segments.pop().is_some()
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Full `/`-separated path of `name` under the cursor.
    pub fn join(&self, name: &str) -> String {
        let name = normalize(name);
        if self.segments.is_empty() {
            return name;
        }
        let mut path = self.segments.join("/");
        path.push('/');
        path.push_str(&name);
        path
    }
}

fn normalize(name: &str) -> String {
    name.replace('\\', "/")
}

// ── ArchiveIndex ─────────────────────────────────────────────────────────────

/// Mapping from full relative path to its file record.  Directory markers
/// only steer the cursor and are never stored.
#[derive(Debug, Clone, Default)]
pub struct ArchiveIndex {
    entries:         BTreeMap<String, DirEntry>,
    records_read:    usize,
    records_skipped: usize,
}

impl ArchiveIndex {
    pub fn get(&self, path: &str) -> Option<&DirEntry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records decoded from the table, markers included.
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Records dropped because they failed to decode or validate.
    pub fn records_skipped(&self) -> usize {
        self.records_skipped
    }

    /// Entries in path order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, DirEntry> {
        self.entries.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }
}

impl<'a> IntoIterator for &'a ArchiveIndex {
    type Item     = (&'a String, &'a DirEntry);
    type IntoIter = btree_map::Iter<'a, String, DirEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// ── IndexBuilder ─────────────────────────────────────────────────────────────

/// Replays directory records, in table order, into an [`ArchiveIndex`].
#[derive(Debug)]
pub struct IndexBuilder {
    cursor:   PathStack,
    index:    ArchiveIndex,
    file_len: u64,
}

impl IndexBuilder {
    /// `file_len` is the archive length, used only to flag payloads that run
    /// past the end of the file.
    pub fn new(file_len: u64) -> Self {
        Self {
            cursor: PathStack::new(),
            index:  ArchiveIndex::default(),
            file_len,
        }
    }

    pub fn apply(&mut self, entry: DirEntry) {
        self.index.records_read += 1;
        match entry.kind() {
            EntryKind::PushDir => {
                trace!(name = %entry.name, depth = self.cursor.depth(), "enter directory");
                self.cursor.push(&entry.name);
            }
            EntryKind::PopDir => {
                if !self.cursor.pop() {
                    warn!("'..' marker at archive root ignored");
                }
            }
            EntryKind::File => {
                let (_, end) = entry.payload_range();
                let path = self.cursor.join(&entry.name);
                if end > self.file_len {
                    warn!(%path, end, file_len = self.file_len, "payload extends past end of archive");
                }
                trace!(%path, offset = entry.offset, size = entry.size, "file");
                if self.index.entries.insert(path.clone(), entry).is_some() {
                    warn!(%path, "duplicate path, keeping the later record");
                }
            }
        }
    }

    /// Count a record that was dropped before reaching [`apply`](Self::apply).
    pub fn skip(&mut self) {
        self.index.records_skipped += 1;
    }

    pub fn records_read(&self) -> usize {
        self.index.records_read
    }

    pub fn finish(self) -> ArchiveIndex {
        if self.cursor.depth() > 0 {
            warn!(open = self.cursor.depth(), "directory table ends inside unterminated directories");
        }
        self.index
    }
}
