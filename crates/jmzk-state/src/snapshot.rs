//! Snapshot (C14): a sectioned, Zstd-compressed dump of TDB state.
//!
//! Layout: `magic(u32) version(u32)` header, then zero or more sections
//! each shaped `size(u64) row_count(u64) name\0 <zstd bytes>`, terminated
//! by a section whose `size` field reads `SNAPSHOT_TERMINATOR`. `size`
//! covers everything in the section after itself (row_count, name, and
//! the compressed payload), matching how a writer backpatches it once the
//! section's length is known.
//!
//! Row bytes within a section are bincode values written back to back
//! with no further framing; a reader parses exactly `row_count` of them
//! off the front of the decompressed buffer, one `bincode::deserialize`
//! at a time.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

use jmzk_chain_core::{JmzkError, Result, SNAPSHOT_MAGIC, SNAPSHOT_TERMINATOR, SNAPSHOT_VERSION};
use serde::{de::DeserializeOwned, Serialize};

pub struct SnapshotWriter<W: Write> {
    out: W,
}

impl<W: Write> SnapshotWriter<W> {
    pub fn new(mut out: W) -> Result<Self> {
        out.write_all(&SNAPSHOT_MAGIC.to_le_bytes())?;
        out.write_all(&SNAPSHOT_VERSION.to_le_bytes())?;
        Ok(SnapshotWriter { out })
    }

    pub fn write_section<T: Serialize>(&mut self, name: &str, rows: &[T]) -> Result<()> {
        let mut raw = Vec::new();
        for row in rows {
            raw.extend(bincode::serialize(row)?);
        }
        let compressed = zstd::stream::encode_all(Cursor::new(raw), 0)
            .map_err(|e| JmzkError::TokenDatabase(format!("snapshot compression failed: {e}")))?;

        let mut body = Vec::with_capacity(16 + name.len() + 1 + compressed.len());
        body.extend_from_slice(&(rows.len() as u64).to_le_bytes());
        body.extend_from_slice(name.as_bytes());
        body.push(0);
        body.extend_from_slice(&compressed);

        self.out.write_all(&(body.len() as u64).to_le_bytes())?;
        self.out.write_all(&body)?;
        Ok(())
    }

    pub fn finalize(mut self) -> Result<()> {
        self.out.write_all(&SNAPSHOT_TERMINATOR.to_le_bytes())?;
        Ok(())
    }
}

struct RawSection {
    row_count: u64,
    rows: Vec<u8>,
}

pub struct SnapshotReader {
    sections: HashMap<String, RawSection>,
}

impl SnapshotReader {
    pub fn read<R: Read>(mut src: R) -> Result<Self> {
        let mut magic_buf = [0u8; 4];
        src.read_exact(&mut magic_buf)?;
        let magic = u32::from_le_bytes(magic_buf);
        if magic != SNAPSHOT_MAGIC {
            return Err(JmzkError::TokenDatabase(format!("bad snapshot magic: {magic:#x}")));
        }
        let mut version_buf = [0u8; 4];
        src.read_exact(&mut version_buf)?;
        let version = u32::from_le_bytes(version_buf);
        if version != SNAPSHOT_VERSION {
            return Err(JmzkError::TokenDatabase(format!("unsupported snapshot version: {version}")));
        }

        let mut sections = HashMap::new();
        loop {
            let mut size_buf = [0u8; 8];
            src.read_exact(&mut size_buf)?;
            let size = u64::from_le_bytes(size_buf);
            if size == SNAPSHOT_TERMINATOR {
                break;
            }
            let mut body = vec![0u8; size as usize];
            src.read_exact(&mut body)?;

            let row_count = u64::from_le_bytes(body[0..8].try_into().unwrap());
            let name_start = 8;
            let name_end = body[name_start..]
                .iter()
                .position(|b| *b == 0)
                .map(|p| name_start + p)
                .ok_or_else(|| JmzkError::TokenDatabase("snapshot section missing name terminator".into()))?;
            let name = String::from_utf8_lossy(&body[name_start..name_end]).into_owned();
            let compressed = &body[name_end + 1..];
            let rows = zstd::stream::decode_all(compressed)
                .map_err(|e| JmzkError::TokenDatabase(format!("snapshot decompression failed: {e}")))?;

            sections.insert(name, RawSection { row_count, rows });
        }
        Ok(SnapshotReader { sections })
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    pub fn section_names(&self) -> Vec<&str> {
        self.sections.keys().map(|s| s.as_str()).collect()
    }

    pub fn read_section<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let section = self
            .sections
            .get(name)
            .ok_or_else(|| JmzkError::TokenDatabase(format!("snapshot section not found: {name}")))?;
        let mut cursor = Cursor::new(&section.rows[..]);
        let mut out = Vec::with_capacity(section.row_count as usize);
        for _ in 0..section.row_count {
            out.push(bincode::deserialize_from(&mut cursor)?);
        }
        Ok(out)
    }
}
