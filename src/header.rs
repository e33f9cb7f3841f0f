use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

use crate::codec::LE;
use crate::error::{Result, VpError};

pub const MAGIC: &[u8; 4] = b"VPVP";
pub const VERSION: u32 = 2;
/// Fixed on-disk header size; also the offset of the first payload byte.
pub const HEADER_SIZE: u64 = 16;

/// The 16-byte archive header.
///
/// ```text
/// [0:4)   signature        "VPVP"
/// [4:8)   version          u32 = 2
/// [8:12)  dir_offset       u32, start of the directory table
/// [12:16) dir_count        u32, number of 44-byte records
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub signature:  [u8; 4],
    pub version:    u32,
    pub dir_offset: u32,
    pub dir_count:  u32,
}

impl Header {
    pub fn new(dir_offset: u32, dir_count: u32) -> Self {
        Self {
            signature: *MAGIC,
            version:   VERSION,
            dir_offset,
            dir_count,
        }
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.signature)?;
        writer.write_u32::<LE>(self.version)?;
        writer.write_u32::<LE>(self.dir_offset)?;
        writer.write_u32::<LE>(self.dir_count)?;
        Ok(())
    }

    /// Read and validate signature and version.  Bounds of `dir_offset` are
    /// checked by the reader, which knows the file length.
    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = Vec::with_capacity(HEADER_SIZE as usize);
        reader.by_ref().take(HEADER_SIZE).read_to_end(&mut buf)?;
        if (buf.len() as u64) < HEADER_SIZE {
            return Err(VpError::Truncated { needed: HEADER_SIZE, available: buf.len() as u64 });
        }
        let mut cur = &buf[..];

        let mut signature = [0u8; 4];
        cur.read_exact(&mut signature)?;
        if &signature != MAGIC {
            return Err(VpError::BadSignature(signature));
        }
        let version = cur.read_u32::<LE>()?;
        if version != VERSION {
            return Err(VpError::UnsupportedVersion(version));
        }
        Ok(Self {
            signature,
            version,
            dir_offset: cur.read_u32::<LE>()?,
            dir_count:  cur.read_u32::<LE>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let mut buf = Vec::new();
        Header::new(21, 1).write(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, HEADER_SIZE);
        assert_eq!(&buf[..4], b"VPVP");
        assert_eq!(&buf[4..8], &2u32.to_le_bytes());
        assert_eq!(&buf[8..12], &21u32.to_le_bytes());
        assert_eq!(&buf[12..16], &1u32.to_le_bytes());
        assert_eq!(Header::read(&buf[..]).unwrap(), Header::new(21, 1));
    }

    #[test]
    fn rejects_foreign_signature() {
        let mut buf = Vec::new();
        Header::new(16, 1).write(&mut buf).unwrap();
        buf[..4].copy_from_slice(b"PK\x03\x04");
        assert!(matches!(Header::read(&buf[..]), Err(VpError::BadSignature(s)) if &s == b"PK\x03\x04"));
    }

    #[test]
    fn rejects_other_versions() {
        let mut buf = Vec::new();
        Header::new(16, 1).write(&mut buf).unwrap();
        buf[4..8].copy_from_slice(&3u32.to_le_bytes());
        assert!(matches!(Header::read(&buf[..]), Err(VpError::UnsupportedVersion(3))));
    }

    #[test]
    fn short_input_is_truncated() {
        assert!(matches!(
            Header::read(&b"VPVP"[..]),
            Err(VpError::Truncated { needed: 16, available: 4 })
        ));
    }
}
