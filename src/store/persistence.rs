//! Checkpoint serialization (TMDX format).
//!
//! A checkpoint is the full state of the three tables: magic, version,
//! then a bincode body of flat records. Entries are written in id order,
//! so ids are implicit in the entry list. Postings are sorted by
//! (token, length) for deterministic output.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::tables::{StringTable, TranslationTable, WordIndex};
use super::StorageError;

pub(super) const MAGIC: &[u8; 4] = b"TMDX";
pub(super) const VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    entries: Vec<EntryRecord>,
    postings: Vec<PostingRecord>,
}

/// One stored entry; its id is its position in `Snapshot::entries`.
#[derive(Serialize, Deserialize)]
struct EntryRecord {
    source: String,
    translations: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct PostingRecord {
    token: String,
    length: u32,
    ids: Vec<u32>,
}

pub(super) fn snapshot_to_bytes(
    strings: &StringTable,
    translations: &TranslationTable,
    index: &WordIndex,
) -> Result<Vec<u8>, StorageError> {
    let entries = strings
        .sources()
        .iter()
        .enumerate()
        .map(|(id, source)| EntryRecord {
            source: source.clone(),
            translations: translations.get(id as u32).to_vec(),
        })
        .collect();

    let mut postings: Vec<PostingRecord> = index
        .iter()
        .map(|(token, length, ids)| PostingRecord {
            token: token.to_string(),
            length,
            ids: ids.to_vec(),
        })
        .collect();
    postings.sort_by(|a, b| a.token.cmp(&b.token).then(a.length.cmp(&b.length)));

    let snapshot = Snapshot { entries, postings };
    let body = bincode::serialize(&snapshot).map_err(StorageError::Serialize)?;

    let mut buf = Vec::with_capacity(5 + body.len());
    buf.extend_from_slice(MAGIC);
    buf.push(VERSION);
    buf.extend_from_slice(&body);
    Ok(buf)
}

pub(super) fn snapshot_from_bytes(
    bytes: &[u8],
) -> Result<(StringTable, TranslationTable, WordIndex), StorageError> {
    if bytes.len() < 5 {
        return Err(StorageError::InvalidHeader);
    }
    if &bytes[0..4] != MAGIC {
        return Err(StorageError::InvalidMagic);
    }
    if bytes[4] != VERSION {
        return Err(StorageError::UnsupportedVersion(bytes[4]));
    }
    let snapshot: Snapshot =
        bincode::deserialize(&bytes[5..]).map_err(StorageError::Deserialize)?;

    let entry_count = snapshot.entries.len() as u32;
    let mut sources = Vec::with_capacity(snapshot.entries.len());
    let mut rows = Vec::with_capacity(snapshot.entries.len());
    for rec in snapshot.entries {
        sources.push(rec.source);
        rows.push(rec.translations);
    }

    let mut index = WordIndex::new();
    for rec in snapshot.postings {
        if rec.ids.windows(2).any(|w| w[0] >= w[1]) {
            return Err(StorageError::Corrupt(format!(
                "posting list for ({:?}, {}) is not strictly ascending",
                rec.token, rec.length
            )));
        }
        if rec.ids.last().map_or(false, |&id| id >= entry_count) {
            return Err(StorageError::Corrupt(format!(
                "posting list for ({:?}, {}) references id beyond entry count {}",
                rec.token, rec.length, entry_count
            )));
        }
        index.insert_posting(rec.token, rec.length, rec.ids);
    }

    Ok((
        StringTable::from_sources(sources),
        TranslationTable::from_rows(rows),
        index,
    ))
}

/// Read the checkpoint file; `None` if it does not exist yet.
pub(super) fn read_checkpoint(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Atomic write: write to .tmp then rename.
pub(super) fn write_checkpoint(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let tmp = path.with_extension("tmp");
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
