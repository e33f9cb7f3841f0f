//! Low-level archive emitter.
//!
//! [`VpWriter`] reserves the header, streams each payload straight to the
//! output as it is added, and keeps only the directory records in memory.
//! `finalize()` appends the directory table and patches the header in
//! place at offset 0.
//!
//! The caller drives the tree shape: `push_dir` / `add_file` / `pop_dir` in
//! pre-order, which is exactly the order the records are written.

use std::io::{self, Seek, SeekFrom, Write};

use tracing::{debug, warn};

use crate::codec::encode_name;
use crate::entry::{DirEntry, PARENT_NAME};
use crate::error::{Result, VpError};
use crate::header::{Header, HEADER_SIZE};

pub struct VpWriter<W: Write + Seek> {
    writer:  W,
    records: Vec<DirEntry>,
    /// Offset the next payload will be written at.
    offset:  u64,
    depth:   usize,
}

impl<W: Write + Seek> VpWriter<W> {
    pub fn new(mut writer: W) -> Result<Self> {
        writer.seek(SeekFrom::Start(0))?;
        writer.write_all(&[0u8; HEADER_SIZE as usize])?; // patched on finalize
        Ok(Self {
            writer,
            records: Vec::new(),
            offset:  HEADER_SIZE,
            depth:   0,
        })
    }

    pub fn records(&self) -> &[DirEntry] {
        &self.records
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn push_dir(&mut self, name: &str, timestamp: i32) -> Result<()> {
        encode_name(name)?;
        if name.is_empty() || name == PARENT_NAME {
            return Err(VpError::InvalidName(format!("{name:?} is not a directory name")));
        }
        self.records.push(DirEntry::push_dir(name, timestamp));
        self.depth += 1;
        Ok(())
    }

    pub fn pop_dir(&mut self) -> Result<()> {
        if self.depth == 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "pop_dir at archive root").into());
        }
        self.records.push(DirEntry::pop_dir());
        self.depth -= 1;
        Ok(())
    }

    /// Append one file.  An empty payload is rejected: a size-0 record is a
    /// directory marker on disk.
    pub fn add_file(&mut self, name: &str, data: &[u8], timestamp: i32) -> Result<()> {
        encode_name(name)?;
        if name.is_empty() {
            return Err(VpError::InvalidName("empty file name".into()));
        }
        if data.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{name}: zero-length files cannot be stored"),
            )
            .into());
        }

        let end = self.offset + data.len() as u64;
        if end > i32::MAX as u64 {
            return Err(VpError::TooLarge(end));
        }
        self.writer.write_all(data)?;
        self.records.push(DirEntry::file(name, self.offset as i32, data.len() as i32, timestamp));
        self.offset = end;
        Ok(())
    }

    /// Write the directory table, patch the header and hand back the sink.
    /// Directories still open are closed first.
    pub fn finalize(mut self) -> Result<W> {
        if self.depth > 0 {
            warn!(open = self.depth, "closing unterminated directories");
            while self.depth > 0 {
                self.pop_dir()?;
            }
        }

        let dir_offset = self.offset as u32;
        let dir_count = u32::try_from(self.records.len())
            .map_err(|_| VpError::TooLarge(self.records.len() as u64))?;
        for record in &self.records {
            record.write(&mut self.writer)?;
        }

        let end = self.writer.stream_position()?;
        self.writer.seek(SeekFrom::Start(0))?;
        Header::new(dir_offset, dir_count).write(&mut self.writer)?;
        self.writer.seek(SeekFrom::Start(end))?;
        self.writer.flush()?;

        debug!(dir_offset, dir_count, "archive finalized");
        Ok(self.writer)
    }
}
