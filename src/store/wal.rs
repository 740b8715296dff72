//! Append-only log of accepted store operations.
//!
//! Every pair handed to `TmStore::store` becomes one frame: a length
//! and crc32 header followed by a bincode body. Opening a store scans
//! the log front to back and feeds each intact frame back through the
//! normal apply path; the first frame that is torn or fails its
//! checksum ends the scan, and the file is cut back to the last good
//! frame so that nothing is ever appended behind garbage. Re-applying
//! a frame that an earlier checkpoint already captured is harmless
//! because the apply path is idempotent.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const FRAME_HEADER: usize = 8;

/// Body of one frame, the arguments of the `store` call it records.
#[derive(Serialize, Deserialize)]
struct LogRecord {
    source: String,
    translation: String,
}

/// Decode the frame at the start of `data`. Returns the record and the
/// number of bytes the frame occupied, or `None` when the bytes are
/// incomplete or fail the checksum.
fn decode_frame(data: &[u8]) -> Option<(LogRecord, usize)> {
    if data.len() < FRAME_HEADER {
        return None;
    }
    let length = u32::from_le_bytes(data[..4].try_into().unwrap()) as usize;
    let stored_crc = u32::from_le_bytes(data[4..8].try_into().unwrap());
    if length == 0 || data.len() < FRAME_HEADER + length {
        return None;
    }
    let body = &data[FRAME_HEADER..FRAME_HEADER + length];
    if crc32fast::hash(body) != stored_crc {
        return None;
    }
    let record = bincode::deserialize(body).ok()?;
    Some((record, FRAME_HEADER + length))
}

#[derive(Debug)]
pub(crate) struct StoreWal {
    /// The checkpoint this log belongs to (`memory.tmdx`).
    checkpoint_path: PathBuf,
    /// The log file, next to the checkpoint (`memory.tmdx.wal`).
    wal_path: PathBuf,
    /// Append handle, opened on first use.
    file: Option<File>,
    /// Frames in the log since it was last emptied.
    frame_count: usize,
}

impl StoreWal {
    pub fn new(checkpoint_path: &Path) -> Self {
        let wal_path = checkpoint_path.with_extension("tmdx.wal");
        Self {
            checkpoint_path: checkpoint_path.to_path_buf(),
            wal_path,
            file: None,
            frame_count: 0,
        }
    }

    /// Feed every intact frame to `apply`, in order, and return how
    /// many there were. A torn or corrupt tail is discarded from the
    /// file, so subsequent appends land on a valid frame boundary.
    pub fn replay<F>(&mut self, mut apply: F) -> io::Result<usize>
    where
        F: FnMut(&str, &str),
    {
        let data = match fs::read(&self.wal_path) {
            Ok(d) => d,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.frame_count = 0;
                return Ok(0);
            }
            Err(e) => return Err(e),
        };

        let mut count = 0;
        let mut pos = 0;
        while let Some((record, consumed)) = decode_frame(&data[pos..]) {
            apply(&record.source, &record.translation);
            count += 1;
            pos += consumed;
        }

        // Bytes past the last good frame are unrecoverable. Cut them
        // off now; otherwise frames appended after this recovery would
        // sit behind garbage and be lost to every future replay.
        if pos < data.len() {
            let file = OpenOptions::new().write(true).open(&self.wal_path)?;
            file.set_len(pos as u64)?;
        }

        self.frame_count = count;
        Ok(count)
    }

    /// Append one frame recording a `store` call.
    pub fn append(&mut self, source: &str, translation: &str) -> io::Result<()> {
        let record = LogRecord {
            source: source.to_string(),
            translation: translation.to_string(),
        };
        let body = bincode::serialize(&record).map_err(io::Error::other)?;
        let crc = crc32fast::hash(&body);

        let file = self.open_file()?;
        file.write_all(&(body.len() as u32).to_le_bytes())?;
        file.write_all(&crc.to_le_bytes())?;
        file.write_all(&body)?;

        self.frame_count += 1;
        Ok(())
    }

    fn open_file(&mut self) -> io::Result<&mut File> {
        if self.file.is_none() {
            if let Some(parent) = self.wal_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let f = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.wal_path)?;
            self.file = Some(f);
        }
        Ok(self.file.as_mut().unwrap())
    }

    pub fn needs_compact(&self, threshold: usize) -> bool {
        self.frame_count >= threshold
    }

    /// Empty the log once a checkpoint has captured its contents.
    pub fn truncate_wal(&mut self) -> io::Result<()> {
        self.file = None;
        File::create(&self.wal_path)?;
        self.frame_count = 0;
        Ok(())
    }

    /// Frames appended or replayed since the log was last emptied.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_path
    }

    pub fn wal_path(&self) -> &Path {
        &self.wal_path
    }
}
