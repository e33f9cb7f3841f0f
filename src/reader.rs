//! Directory-table parser.
//!
//! [`parse`] validates the header, then replays the directory table into an
//! [`ArchiveIndex`] without touching payload bytes.  Structural problems
//! abort; everything below that degrades:
//!
//! - an entry count larger than what fits before end-of-file is clamped;
//! - a record that fails to validate is logged and skipped;
//! - a short trailing record ends the table early.
//!
//! Only a table from which no record at all could be read is an error.

use std::io::{self, Read, Seek, SeekFrom};

use tracing::{debug, warn};

use crate::entry::{DirEntry, DIR_ENTRY_SIZE};
use crate::error::{Result, VpError};
use crate::header::{Header, HEADER_SIZE};
use crate::index::{ArchiveIndex, IndexBuilder};

/// Parse header and directory table from `reader`.
pub fn parse<R: Read + Seek>(reader: &mut R) -> Result<(Header, ArchiveIndex)> {
    let file_len = reader.seek(SeekFrom::End(0))?;
    if file_len < HEADER_SIZE {
        return Err(VpError::Truncated { needed: HEADER_SIZE, available: file_len });
    }

    reader.seek(SeekFrom::Start(0))?;
    let header = Header::read(&mut *reader)?;

    let dir_offset = u64::from(header.dir_offset);
    if dir_offset > file_len {
        return Err(VpError::CorruptHeader { dir_offset: header.dir_offset, file_len });
    }

    let max_count = (file_len - dir_offset) / DIR_ENTRY_SIZE;
    let mut count = u64::from(header.dir_count);
    if count > max_count {
        warn!(
            declared = header.dir_count,
            max_count,
            "directory entry count exceeds file bounds, clamping"
        );
        count = max_count;
    }
    if count == 0 {
        return Err(VpError::EmptyDirectory);
    }

    debug!(dir_offset, count, file_len, "reading directory table");
    reader.seek(SeekFrom::Start(dir_offset))?;

    let mut builder = IndexBuilder::new(file_len);
    let mut buf = [0u8; DIR_ENTRY_SIZE as usize];
    for i in 0..count {
        match reader.read_exact(&mut buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                warn!(record = i, "directory table ends mid-record, stopping");
                break;
            }
            Err(e) => return Err(e.into()),
        }

        let entry = match DirEntry::read(&buf[..]) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(record = i, error = %e, "undecodable directory record, skipping");
                builder.skip();
                continue;
            }
        };
        if let Err(e) = entry.validate() {
            warn!(record = i, name = %entry.name, error = %e, "invalid directory record, skipping");
            builder.skip();
            continue;
        }
        builder.apply(entry);
    }

    if builder.records_read() == 0 {
        return Err(VpError::NoValidEntries);
    }
    let index = builder.finish();
    debug!(
        files = index.len(),
        records = index.records_read(),
        skipped = index.records_skipped(),
        "directory table parsed"
    );
    Ok((header, index))
}
