//! High-level [`VpArchive`] API, the main embedding surface.
//!
//! ```no_run
//! use vpack::archive::VpArchive;
//!
//! let mut ar = VpArchive::open("root_fs.vp")?;
//! for (path, entry) in ar.entries() {
//!     println!("{path}: {} bytes", entry.size);
//! }
//! let table = ar.read_payload("data/tables/ships.tbl")?;
//! ar.extract_all("out")?;
//! # Ok::<(), vpack::VpError>(())
//! ```
//!
//! # Handle ownership
//! A `VpArchive` owns exactly one open file for its whole lifetime.  The
//! read position is shared state, so every payload read takes `&mut self`;
//! callers wanting concurrency open one handle per archive.  The file is
//! closed when the handle drops, including when [`VpArchive::open`] fails
//! part-way through the parse.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::entry::DirEntry;
use crate::error::{ExtractFailure, Result, VpError};
use crate::header::Header;
use crate::index::ArchiveIndex;
use crate::reader;

#[derive(Debug)]
pub struct VpArchive {
    path:   PathBuf,
    name:   String,
    file:   File,
    header: Header,
    index:  ArchiveIndex,
}

impl VpArchive {
    // ── Constructors ─────────────────────────────────────────────────────────

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_owned();
        let mut file = File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => VpError::NotFound(path.clone()),
            _                       => VpError::Io(e),
        })?;
        let (header, index) = reader::parse(&mut file)?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "archive".to_owned());
        debug!(archive = %path.display(), files = index.len(), "opened archive");

        Ok(Self { path, name, file, header, index })
    }

    /// Release the file handle.  Equivalent to dropping the archive.
    pub fn close(self) {}

    // ── Metadata ─────────────────────────────────────────────────────────────

    pub fn path(&self) -> &Path { &self.path }

    /// Archive basename without extension; extraction nests under it.
    pub fn name(&self) -> &str { &self.name }

    pub fn header(&self) -> &Header { &self.header }

    pub fn index(&self) -> &ArchiveIndex { &self.index }

    pub fn len(&self) -> usize { self.index.len() }

    pub fn is_empty(&self) -> bool { self.index.is_empty() }

    pub fn get(&self, path: &str) -> Option<&DirEntry> { self.index.get(path) }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &DirEntry)> + '_ {
        self.index.iter().map(|(p, e)| (p.as_str(), e))
    }

    // ── Read ──────────────────────────────────────────────────────────────────

    /// Read exactly the recorded payload of `path`.
    pub fn read_payload(&mut self, path: &str) -> Result<Vec<u8>> {
        let entry = self
            .index
            .get(path)
            .ok_or_else(|| VpError::EntryNotFound(path.to_owned()))?;
        let (start, end) = entry.payload_range();

        let available = self.file.metadata()?.len();
        if end > available {
            return Err(VpError::Truncated { needed: end, available });
        }
        self.file.seek(SeekFrom::Start(start))?;
        let mut data = vec![0u8; (end - start) as usize];
        self.file
            .read_exact(&mut data)
            .map_err(|e| VpError::from_read(e, end, available))?;
        Ok(data)
    }

    /// BLAKE3 digest of a payload.
    pub fn digest(&mut self, path: &str) -> Result<[u8; 32]> {
        Ok(blake3::hash(&self.read_payload(path)?).into())
    }

    // ── Extract ───────────────────────────────────────────────────────────────

    /// Where `path` lands under `dest_root`: `dest_root/<name>/<path>`.
    pub fn output_path(&self, path: &str, dest_root: &Path) -> Result<PathBuf> {
        Ok(dest_root.join(&self.name).join(relative_path(path)?))
    }

    /// Write one entry below `dest_root`, creating missing directories and
    /// overwriting any existing file.  Returns the written path.
    pub fn extract<P: AsRef<Path>>(&mut self, path: &str, dest_root: P) -> Result<PathBuf> {
        let out = self.output_path(path, dest_root.as_ref())?;
        let data = self.read_payload(path)?;

        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(&out)?;
        file.write_all(&data)?;

        if let Some(timestamp) = self.index.get(path).map(|e| e.timestamp).filter(|&t| t > 0) {
            let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(timestamp as u64);
            if let Err(e) = file.set_modified(mtime) {
                warn!(path = %out.display(), error = %e, "could not restore modification time");
            }
        }
        Ok(out)
    }

    /// Extract every indexed file.  Failures are collected rather than
    /// stopping the run; the result is an error if any entry failed.
    pub fn extract_all<P: AsRef<Path>>(&mut self, dest_root: P) -> Result<usize> {
        let dest_root = dest_root.as_ref();
        let paths: Vec<String> = self.index.paths().map(str::to_owned).collect();
        let total = paths.len();
        let mut failures = Vec::new();

        for path in paths {
            if let Err(e) = self.extract(&path, dest_root) {
                warn!(archive = %self.name, %path, error = %e, "extraction failed");
                failures.push(ExtractFailure {
                    path,
                    kind:    e.kind(),
                    message: e.to_string(),
                });
            }
        }

        if failures.is_empty() {
            debug!(archive = %self.name, total, "extracted all entries");
            Ok(total)
        } else {
            Err(VpError::Extraction { failed: failures.len(), total, failures })
        }
    }
}

/// Turn an index path into a relative filesystem path, refusing anything
/// that could resolve outside the destination.
fn relative_path(path: &str) -> Result<PathBuf> {
    let mut out = PathBuf::new();
    for segment in path.split('/') {
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(c)), None) => out.push(c),
            _ => return Err(VpError::UnsafePath(path.to_owned())),
        }
    }
    Ok(out)
}
