use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};
use thiserror::Error;

use crate::codec::{read_name, write_name, LE};
use crate::error::Result;

/// On-disk size of one directory record.
pub const DIR_ENTRY_SIZE: u64 = 44;

/// Name carried by the "pop to parent" marker.
pub const PARENT_NAME: &str = "..";

/// What a record means while replaying the directory table.  Derived from
/// `size` and `name`; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    PushDir,
    PopDir,
}

/// One 44-byte directory record.
///
/// ```text
/// [0:4)   offset     i32, payload offset (0 for markers)
/// [4:8)   size       i32, 0 marks a directory marker
/// [8:40)  name       32 bytes, NUL-padded Latin-1
/// [40:44) timestamp  i32, Unix seconds
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub offset:    i32,
    pub size:      i32,
    pub name:      String,
    pub timestamp: i32,
}

/// A record that decoded but cannot be used.  Recovered locally by the
/// reader: logged, skipped.
#[derive(Error, Debug, PartialEq, Eq)]
pub(crate) enum RecordError {
    #[error("negative payload offset {0}")]
    NegativeOffset(i32),
    #[error("negative payload size {0}")]
    NegativeSize(i32),
    #[error("empty name")]
    EmptyName,
}

impl DirEntry {
    pub fn file(name: impl Into<String>, offset: i32, size: i32, timestamp: i32) -> Self {
        Self { offset, size, name: name.into(), timestamp }
    }

    pub fn push_dir(name: impl Into<String>, timestamp: i32) -> Self {
        Self { offset: 0, size: 0, name: name.into(), timestamp }
    }

    pub fn pop_dir() -> Self {
        Self { offset: 0, size: 0, name: PARENT_NAME.to_owned(), timestamp: 0 }
    }

    pub fn kind(&self) -> EntryKind {
        match (self.size, self.name.as_str()) {
            (0, PARENT_NAME) => EntryKind::PopDir,
            (0, _)           => EntryKind::PushDir,
            _                => EntryKind::File,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind() == EntryKind::File
    }

    /// Payload byte range `[start, end)` for file records.
    pub fn payload_range(&self) -> (u64, u64) {
        let start = self.offset.max(0) as u64;
        (start, start + self.size.max(0) as u64)
    }

    pub(crate) fn validate(&self) -> std::result::Result<(), RecordError> {
        if self.offset < 0 {
            return Err(RecordError::NegativeOffset(self.offset));
        }
        if self.size < 0 {
            return Err(RecordError::NegativeSize(self.size));
        }
        if self.name.is_empty() {
            return Err(RecordError::EmptyName);
        }
        Ok(())
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_i32::<LE>(self.offset)?;
        writer.write_i32::<LE>(self.size)?;
        write_name(&mut writer, &self.name)?;
        writer.write_i32::<LE>(self.timestamp)?;
        Ok(())
    }

    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        Ok(Self {
            offset:    reader.read_i32::<LE>()?,
            size:      reader.read_i32::<LE>()?,
            name:      read_name(&mut reader)?,
            timestamp: reader.read_i32::<LE>()?,
        })
    }
}
