//! Binary primitive codec shared by the reader and the writer.
//!
//! # Endianness
//! Every integer in a VP archive is little-endian; [`LE`] is the byteorder
//! marker used throughout the crate.
//!
//! # Name fields
//! Names occupy a fixed 32-byte field, NUL-padded.  Each byte is one
//! character in the 8-bit Latin-1 range, so decoding never fails: bytes map
//! straight to `char`s up to the first NUL (or the full field if there is
//! none).  Encoding is the exact mirror and rejects what it cannot represent
//! instead of truncating.

use std::io::{self, Read, Write};

use crate::error::{Result, VpError};

pub type LE = byteorder::LittleEndian;

/// Width of the fixed name field.
pub const NAME_LEN: usize = 32;

/// Decode a NUL-padded name field.
pub fn decode_name(field: &[u8; NAME_LEN]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
    field[..end].iter().map(|&b| b as char).collect()
}

/// Encode `name` into a NUL-padded field.
///
/// A name of exactly [`NAME_LEN`] bytes is stored without a terminator.
pub fn encode_name(name: &str) -> Result<[u8; NAME_LEN]> {
    let mut bytes = Vec::with_capacity(name.len());
    for c in name.chars() {
        match u8::try_from(u32::from(c)) {
            Ok(0)  => return Err(VpError::InvalidName(format!("{name:?} contains NUL"))),
            Ok(b)  => bytes.push(b),
            Err(_) => {
                return Err(VpError::InvalidName(format!(
                    "{name:?}: {c:?} is outside the single-byte range"
                )))
            }
        }
    }
    if bytes.len() > NAME_LEN {
        return Err(VpError::NameTooLong {
            name: name.to_owned(),
            len:  bytes.len(),
            max:  NAME_LEN,
        });
    }
    let mut field = [0u8; NAME_LEN];
    field[..bytes.len()].copy_from_slice(&bytes);
    Ok(field)
}

pub fn read_name<R: Read>(mut reader: R) -> io::Result<String> {
    let mut field = [0u8; NAME_LEN];
    reader.read_exact(&mut field)?;
    Ok(decode_name(&field))
}

pub fn write_name<W: Write>(mut writer: W, name: &str) -> Result<()> {
    writer.write_all(&encode_name(name)?)?;
    Ok(())
}
