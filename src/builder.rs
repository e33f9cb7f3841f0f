//! Directory tree → archive.
//!
//! The walk is pre-order and sorted by raw file name at every level, so the
//! same tree always produces the same bytes.  Each directory below the walk
//! root becomes a push marker, its children, and a `..` marker; each regular
//! file becomes one record whose payload is streamed into the archive body.
//!
//! A failed build leaves whatever was written at `output`; callers must
//! treat that path as invalid and remove it themselves.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use walkdir::{DirEntry as WalkEntry, WalkDir};

use crate::error::{Result, VpError};
use crate::writer::VpWriter;

/// Name of the directory packaged archives are rooted at.
pub const DATA_DIR: &str = "data";

// ── BuildOptions ──────────────────────────────────────────────────────────────

/// Configuration for [`build_with_options`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Package `<source>/data` instead of `<source>` when it exists.
    pub detect_data_root:    bool,
    /// Record file/directory mtimes.  When off every timestamp is 0.
    pub preserve_timestamps: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            detect_data_root:    true,
            preserve_timestamps: true,
        }
    }
}

/// What a successful build wrote.
#[derive(Debug, Clone, Default)]
pub struct BuildSummary {
    pub root:          PathBuf,
    pub files:         usize,
    pub directories:   usize,
    pub payload_bytes: u64,
    /// Entries that exist on disk but cannot be stored: empty files,
    /// symlinks and other non-regular files.
    pub skipped:       Vec<PathBuf>,
}

// ── Entry points ──────────────────────────────────────────────────────────────

pub fn build<P: AsRef<Path>, Q: AsRef<Path>>(source_dir: P, output: Q) -> Result<BuildSummary> {
    build_with_options(source_dir, output, &BuildOptions::default())
}

pub fn build_with_options<P: AsRef<Path>, Q: AsRef<Path>>(
    source_dir: P,
    output:     Q,
    opts:       &BuildOptions,
) -> Result<BuildSummary> {
    let source = source_dir.as_ref();
    if !source.is_dir() {
        return Err(VpError::NotFound(source.to_owned()));
    }
    let root = effective_root(source, opts);

    let out = BufWriter::new(File::create(output.as_ref())?);
    let mut writer = VpWriter::new(out)?;
    let summary = walk(&root, &mut writer, opts)?;
    writer.finalize()?.flush()?;

    if summary.files == 0 {
        warn!(root = %root.display(), "archive contains no files");
    }
    info!(
        output = %output.as_ref().display(),
        files = summary.files,
        directories = summary.directories,
        bytes = summary.payload_bytes,
        "archive built"
    );
    Ok(summary)
}

/// `<source>/data` if present, otherwise `source` itself.
pub fn effective_root(source: &Path, opts: &BuildOptions) -> PathBuf {
    let data = source.join(DATA_DIR);
    if opts.detect_data_root && data.is_dir() {
        debug!(root = %data.display(), "packaging data subdirectory");
        return data;
    }
    if source.file_name().map_or(true, |n| n != DATA_DIR) {
        warn!(source = %source.display(), "source is not a 'data' directory and has none inside");
    }
    source.to_owned()
}

// ── Walk ─────────────────────────────────────────────────────────────────────

fn walk<W: Write + io::Seek>(
    root:   &Path,
    writer: &mut VpWriter<W>,
    opts:   &BuildOptions,
) -> Result<BuildSummary> {
    let mut summary = BuildSummary { root: root.to_owned(), ..Default::default() };
    // Directories pushed and not yet popped; equals the depth of the
    // innermost open directory.
    let mut open = 0usize;

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()));

    for ent in walker {
        let ent = ent.map_err(walk_error)?;
        while open >= ent.depth() {
            writer.pop_dir()?;
            open -= 1;
        }

        let file_type = ent.file_type();
        if file_type.is_dir() {
            writer.push_dir(entry_name(&ent)?, timestamp(&ent, opts))?;
            open += 1;
            summary.directories += 1;
        } else if file_type.is_file() {
            let data = fs::read(ent.path())?;
            if data.is_empty() {
                warn!(path = %ent.path().display(), "skipping zero-length file");
                summary.skipped.push(ent.path().to_owned());
                continue;
            }
            writer.add_file(entry_name(&ent)?, &data, timestamp(&ent, opts))?;
            summary.files += 1;
            summary.payload_bytes += data.len() as u64;
        } else {
            warn!(path = %ent.path().display(), "skipping non-regular file");
            summary.skipped.push(ent.path().to_owned());
        }
    }
    while open > 0 {
        writer.pop_dir()?;
        open -= 1;
    }
    Ok(summary)
}

fn entry_name(ent: &WalkEntry) -> Result<&str> {
    ent.file_name()
        .to_str()
        .ok_or_else(|| VpError::InvalidName(ent.path().to_string_lossy().into_owned()))
}

fn timestamp(ent: &WalkEntry, opts: &BuildOptions) -> i32 {
    if !opts.preserve_timestamps {
        return 0;
    }
    match ent.metadata().ok().and_then(|m| m.modified().ok()) {
        Some(mtime) => unix_seconds(mtime),
        None => {
            debug!(path = %ent.path().display(), "no modification time available");
            0
        }
    }
}

/// Unix seconds, saturated to the signed 32-bit field.
pub fn unix_seconds(time: SystemTime) -> i32 {
    let secs = DateTime::<Utc>::from(time).timestamp();
    secs.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn walk_error(e: walkdir::Error) -> VpError {
    let msg = e.to_string();
    let io = e
        .into_io_error()
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, msg));
    VpError::Io(io)
}
