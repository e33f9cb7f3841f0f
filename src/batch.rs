//! Batch extraction: every `*.vp` archive in a directory, one at a time or
//! one rayon worker per archive.
//!
//! A failing archive never stops the batch.  Its error kind is recorded in
//! the [`BatchReport`] and the next archive is processed.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::archive::VpArchive;
use crate::error::{ErrorKind, Result, VpError};

pub const ARCHIVE_EXTENSION: &str = "vp";

/// Configuration for [`extract_dir`].
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Skip archives whose output directory already exists.
    pub skip_existing: bool,
    /// One worker per archive.  Needs the `parallel` feature.
    pub parallel:      bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub archive: String,
    pub kind:    ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub succeeded:       Vec<String>,
    pub failed:          Vec<BatchFailure>,
    pub skipped:         Vec<String>,
    pub files_extracted: usize,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.skipped.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} archive(s): {} extracted ({} files), {} failed, {} skipped",
            self.total(),
            self.succeeded.len(),
            self.files_extracted,
            self.failed.len(),
            self.skipped.len(),
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

enum Outcome {
    Extracted(usize),
    Skipped,
    Failed(VpError),
}

/// Archives directly inside `dir` (not recursive), sorted by path.
pub fn find_archives(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(VpError::NotFound(dir.to_owned()));
    }
    let mut found = Vec::new();
    for ent in fs::read_dir(dir)? {
        let path = ent?.path();
        let is_vp = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case(ARCHIVE_EXTENSION));
        if is_vp && path.is_file() {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Extract every archive in `input_dir` to `dest_root/<archive name>/`.
pub fn extract_dir<P: AsRef<Path>, Q: AsRef<Path>>(
    input_dir: P,
    dest_root: Q,
    opts:      &BatchOptions,
) -> Result<BatchReport> {
    let dest_root = dest_root.as_ref();
    let archives = find_archives(input_dir.as_ref())?;
    info!(count = archives.len(), dest = %dest_root.display(), "batch extraction");

    let outcomes = run(&archives, dest_root, opts);

    let mut report = BatchReport::default();
    for (path, outcome) in archives.iter().zip(outcomes) {
        let name = display_name(path);
        match outcome {
            Outcome::Extracted(n) => {
                report.files_extracted += n;
                report.succeeded.push(name);
            }
            Outcome::Skipped => report.skipped.push(name),
            Outcome::Failed(e) => {
                warn!(archive = %name, kind = %e.kind(), error = %e, "archive failed");
                report.failed.push(BatchFailure {
                    archive: name,
                    kind:    e.kind(),
                    message: e.to_string(),
                });
            }
        }
    }
    info!("{}", report.summary());
    Ok(report)
}

fn run(archives: &[PathBuf], dest_root: &Path, opts: &BatchOptions) -> Vec<Outcome> {
    #[cfg(feature = "parallel")]
    {
        if opts.parallel {
            use rayon::prelude::*;
            return archives
                .par_iter()
                .map(|p| extract_one(p, dest_root, opts))
                .collect();
        }
    }
    #[cfg(not(feature = "parallel"))]
    {
        if opts.parallel {
            warn!("built without the `parallel` feature, extracting sequentially");
        }
    }
    archives.iter().map(|p| extract_one(p, dest_root, opts)).collect()
}

fn extract_one(path: &Path, dest_root: &Path, opts: &BatchOptions) -> Outcome {
    let stem = path.file_stem().map(|s| s.to_owned()).unwrap_or_default();
    if opts.skip_existing && dest_root.join(&stem).exists() {
        info!(archive = %path.display(), "output exists, skipping");
        return Outcome::Skipped;
    }
    let result = VpArchive::open(path).and_then(|mut ar| {
        let n = ar.extract_all(dest_root)?;
        info!(archive = %ar.name(), files = n, "extracted");
        Ok(n)
    });
    match result {
        Ok(n)  => Outcome::Extracted(n),
        Err(e) => Outcome::Failed(e),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
