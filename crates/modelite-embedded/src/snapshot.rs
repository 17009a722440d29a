// Snapshot file format
//
// [magic: u32 LE] [version: u16 LE] [length: u32 LE] [payload] [crc32: u32 LE]
//
// The payload is the bincode encoding of every table; the CRC covers it.

use crate::table::Table;
use crc32fast::Hasher;
use modelite_core::{Error, Result};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// "MLSN" (ModeLite SNapshot)
pub const SNAPSHOT_MAGIC: u32 = 0x4D4C534E;

pub const SNAPSHOT_FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = 4 + 2 + 4;
const TRAILER_LEN: usize = 4;

pub type Tables = BTreeMap<String, Table>;

/// Encode tables into a framed snapshot
pub fn encode(tables: &Tables) -> Result<Vec<u8>> {
    let payload = bincode::serialize(tables)
        .map_err(|e| Error::Serialization(format!("Failed to serialize snapshot: {}", e)))?;
    let length = u32::try_from(payload.len())
        .map_err(|_| Error::Serialization("Snapshot payload exceeds 4 GiB".to_string()))?;

    let mut hasher = Hasher::new();
    hasher.update(&payload);
    let crc = hasher.finalize();

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len() + TRAILER_LEN);
    frame.extend_from_slice(&SNAPSHOT_MAGIC.to_le_bytes());
    frame.extend_from_slice(&SNAPSHOT_FORMAT_VERSION.to_le_bytes());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&payload);
    frame.extend_from_slice(&crc.to_le_bytes());
    Ok(frame)
}

/// Decode and validate a framed snapshot
pub fn decode(data: &[u8]) -> Result<Tables> {
    if data.len() < HEADER_LEN + TRAILER_LEN {
        return Err(Error::Corruption("Incomplete snapshot header".to_string()));
    }

    let magic = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    if magic != SNAPSHOT_MAGIC {
        return Err(Error::Corruption(format!("Bad snapshot magic {:#010x}", magic)));
    }

    let version = u16::from_le_bytes([data[4], data[5]]);
    if version == 0 || version > SNAPSHOT_FORMAT_VERSION {
        return Err(Error::Corruption(format!(
            "Unsupported snapshot version {} (current {})",
            version, SNAPSHOT_FORMAT_VERSION
        )));
    }

    let length = u32::from_le_bytes([data[6], data[7], data[8], data[9]]) as usize;
    let total = HEADER_LEN + length + TRAILER_LEN;
    if data.len() != total {
        return Err(Error::Corruption(format!(
            "Snapshot length mismatch: expected {} bytes, got {}",
            total,
            data.len()
        )));
    }

    let payload = &data[HEADER_LEN..HEADER_LEN + length];
    let crc_offset = HEADER_LEN + length;
    let expected_crc = u32::from_le_bytes([
        data[crc_offset],
        data[crc_offset + 1],
        data[crc_offset + 2],
        data[crc_offset + 3],
    ]);

    let mut hasher = Hasher::new();
    hasher.update(payload);
    let actual_crc = hasher.finalize();
    if actual_crc != expected_crc {
        return Err(Error::Corruption(format!(
            "Snapshot CRC mismatch: expected {}, got {}",
            expected_crc, actual_crc
        )));
    }

    bincode::deserialize(payload)
        .map_err(|e| Error::Serialization(format!("Failed to deserialize snapshot: {}", e)))
}

/// Write a snapshot next to `path`, then rename it into place
pub fn write(path: &Path, tables: &Tables) -> Result<()> {
    let frame = encode(tables)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        writer.write_all(&frame)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Load a snapshot, or `None` when the file does not exist
pub fn read(path: &Path) -> Result<Option<Tables>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read(path)?;
    decode(&data).map(Some)
}
