//! Error taxonomy for the archive engine.
//!
//! Structural failures (`NotFound`, `Truncated`, `BadSignature`,
//! `UnsupportedVersion`, `CorruptHeader`) abort a parse and are returned to
//! the caller.  Per-record problems in the directory table never surface
//! here; they are logged and the record is skipped.

use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// One entry that failed during `extract_all`.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractFailure {
    pub path:    String,
    pub kind:    ErrorKind,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum VpError {
    #[error("archive not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("truncated archive: needed {needed} bytes, {available} available")]
    Truncated { needed: u64, available: u64 },
    #[error("bad signature: {0:02x?}")]
    BadSignature([u8; 4]),
    #[error("unsupported version: {0}")]
    UnsupportedVersion(u32),
    #[error("corrupt header: directory offset {dir_offset} beyond file length {file_len}")]
    CorruptHeader { dir_offset: u32, file_len: u64 },
    #[error("directory table is empty")]
    EmptyDirectory,
    #[error("no valid directory entries")]
    NoValidEntries,
    #[error("entry not found: {0}")]
    EntryNotFound(String),
    #[error("name too long ({len} bytes, max {max}): {name}")]
    NameTooLong { name: String, len: usize, max: usize },
    #[error("name cannot be encoded: {0}")]
    InvalidName(String),
    #[error("unsafe entry path: {0}")]
    UnsafePath(String),
    #[error("archive too large: {0} exceeds the 32-bit offset range")]
    TooLarge(u64),
    #[error("{failed} of {total} entries failed to extract")]
    Extraction {
        failed:   usize,
        total:    usize,
        failures: Vec<ExtractFailure>,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Flat, payload-free discriminant of [`VpError`] for logging and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Truncated,
    BadSignature,
    UnsupportedVersion,
    CorruptHeader,
    EmptyDirectory,
    NoValidEntries,
    EntryNotFound,
    NameTooLong,
    InvalidName,
    UnsafePath,
    TooLarge,
    Extraction,
    Io,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::NotFound           => "not_found",
            ErrorKind::Truncated          => "truncated",
            ErrorKind::BadSignature       => "bad_signature",
            ErrorKind::UnsupportedVersion => "unsupported_version",
            ErrorKind::CorruptHeader      => "corrupt_header",
            ErrorKind::EmptyDirectory     => "empty_directory",
            ErrorKind::NoValidEntries     => "no_valid_entries",
            ErrorKind::EntryNotFound      => "entry_not_found",
            ErrorKind::NameTooLong        => "name_too_long",
            ErrorKind::InvalidName        => "invalid_name",
            ErrorKind::UnsafePath         => "unsafe_path",
            ErrorKind::TooLarge           => "too_large",
            ErrorKind::Extraction         => "extraction",
            ErrorKind::Io                 => "io",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl VpError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VpError::NotFound(_)             => ErrorKind::NotFound,
            VpError::Truncated { .. }        => ErrorKind::Truncated,
            VpError::BadSignature(_)         => ErrorKind::BadSignature,
            VpError::UnsupportedVersion(_)   => ErrorKind::UnsupportedVersion,
            VpError::CorruptHeader { .. }    => ErrorKind::CorruptHeader,
            VpError::EmptyDirectory          => ErrorKind::EmptyDirectory,
            VpError::NoValidEntries          => ErrorKind::NoValidEntries,
            VpError::EntryNotFound(_)        => ErrorKind::EntryNotFound,
            VpError::NameTooLong { .. }      => ErrorKind::NameTooLong,
            VpError::InvalidName(_)          => ErrorKind::InvalidName,
            VpError::UnsafePath(_)           => ErrorKind::UnsafePath,
            VpError::TooLarge(_)             => ErrorKind::TooLarge,
            VpError::Extraction { .. }       => ErrorKind::Extraction,
            VpError::Io(_)                   => ErrorKind::Io,
        }
    }

    /// Map an `UnexpectedEof` from a bounded read to `Truncated`.
    pub(crate) fn from_read(err: io::Error, needed: u64, available: u64) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            VpError::Truncated { needed, available }
        } else {
            VpError::Io(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, VpError>;
