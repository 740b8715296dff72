//! Persisted translation memory with approximate retrieval.
//!
//! `TmStore` owns three mutually consistent tables: source strings with
//! stable ids, translations per id, and an inverted word index keyed by
//! (token, sentence length). Durability comes from a write-ahead log
//! (one frame per `store`) plus periodic checkpoints; opening a store
//! loads the last checkpoint and replays the WAL, so a crash can never
//! leave the tables disagreeing with each other.
//!
//! Writes take `&mut self` and reads take `&self`, so the borrow system
//! enforces the single-writer / concurrent-reader discipline; share a
//! store across threads as `Arc<RwLock<TmStore>>`.

mod lookup;
mod persistence;
mod tables;
mod wal;

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, debug_span};

use crate::config::TmConfig;
use crate::tokenizer::Tokenizer;

use tables::{StringTable, TranslationTable, WordIndex};
use wal::StoreWal;

pub use lookup::CancelToken;

/// Checkpoint file name inside a store directory.
const CHECKPOINT_FILE: &str = "memory.tmdx";

/// Failure of the durable storage layer. Lookup misses are not errors;
/// they are represented as empty result sets.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid header (too short)")]
    InvalidHeader,

    #[error("invalid magic bytes (expected TMDX)")]
    InvalidMagic,

    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),

    #[error("serialization error: {0}")]
    Serialize(bincode::Error),

    #[error("deserialization error: {0}")]
    Deserialize(bincode::Error),

    #[error("index corruption: {0}")]
    Corrupt(String),
}

/// One ranked lookup result: the translations of a single stored source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    /// Insertion-ordered, duplicate-free translations of the matched source.
    pub translations: Vec<String>,
    /// 0-100 closeness of the matched source to the query; 100 is exact.
    pub exactness: u8,
}

/// Translation memory for one source language.
#[derive(Debug)]
pub struct TmStore {
    config: TmConfig,
    tokenizer: Tokenizer,
    strings: StringTable,
    translations: TranslationTable,
    index: WordIndex,
    wal: StoreWal,
}

impl TmStore {
    /// Open (or create) the store in `dir`: load the checkpoint if one
    /// exists, then replay the WAL over it.
    pub fn open(dir: &Path, config: TmConfig) -> Result<Self, StorageError> {
        let checkpoint = dir.join(CHECKPOINT_FILE);
        let (mut strings, mut translations, mut index) =
            match persistence::read_checkpoint(&checkpoint)? {
                Some(bytes) => persistence::snapshot_from_bytes(&bytes)?,
                None => (StringTable::new(), TranslationTable::new(), WordIndex::new()),
            };

        let tokenizer = Tokenizer::new(&config.tokenizer.locale, config.tokenizer.min_token_chars);
        let mut wal = StoreWal::new(&checkpoint);
        let replayed = wal.replay(|source, translation| {
            apply(&tokenizer, &mut strings, &mut translations, &mut index, source, translation);
        })?;
        debug!(entries = strings.len(), replayed, "opened translation memory");

        Ok(Self {
            config,
            tokenizer,
            strings,
            translations,
            index,
            wal,
        })
    }

    /// Resolve the store directory for a language under `root`.
    /// Falls back from a regional code ("pt_BR") to the bare language
    /// directory ("pt") when the exact one does not exist yet.
    pub fn language_dir(root: &Path, language: &str) -> PathBuf {
        let exact = root.join(language);
        if exact.is_dir() {
            return exact;
        }
        if let Some(bare) = language.split(['_', '-']).next() {
            if bare != language {
                let fallback = root.join(bare);
                if fallback.is_dir() {
                    return fallback;
                }
            }
        }
        exact
    }

    /// Record that `source` was translated as `translation`.
    ///
    /// Appends a WAL frame first; the in-memory tables are only touched
    /// after the frame is durable, and their update cannot fail, so a
    /// `store` either fully happens or not at all. Idempotent for
    /// repeated identical pairs.
    pub fn store(&mut self, source: &str, translation: &str) -> Result<(), StorageError> {
        let _span = debug_span!("store").entered();
        self.wal.append(source, translation)?;
        apply(
            &self.tokenizer,
            &mut self.strings,
            &mut self.translations,
            &mut self.index,
            source,
            translation,
        );
        if self
            .wal
            .needs_compact(self.config.storage.wal_compact_threshold)
        {
            debug!(frames = self.wal.frame_count(), "compacting WAL");
            self.save()?;
        }
        Ok(())
    }

    /// Write a checkpoint of the current state and truncate the WAL.
    pub fn save(&mut self) -> Result<(), StorageError> {
        let bytes =
            persistence::snapshot_to_bytes(&self.strings, &self.translations, &self.index)?;
        persistence::write_checkpoint(self.wal.checkpoint_path(), &bytes)?;
        self.wal.truncate_wal()?;
        Ok(())
    }

    /// Find translations for `query`, exact match first, then widening
    /// word-omission and length tolerances until something is found.
    /// An empty result means "no suggestion", never an error.
    pub fn lookup(
        &self,
        query: &str,
        max_words_omitted: u32,
        max_length_delta: u32,
    ) -> Vec<Suggestion> {
        self.lookup_cancellable(query, max_words_omitted, max_length_delta, &CancelToken::new())
    }

    /// Like [`lookup`](Self::lookup), but abandons the search (returning
    /// whatever has not yet been found, i.e. nothing) once `cancel` fires.
    pub fn lookup_cancellable(
        &self,
        query: &str,
        max_words_omitted: u32,
        max_length_delta: u32,
        cancel: &CancelToken,
    ) -> Vec<Suggestion> {
        let _span = debug_span!("lookup").entered();

        // Exact phase: verbatim hit wins regardless of tolerances.
        if let Some(id) = self.strings.lookup(query) {
            debug!(id, "exact hit");
            return vec![Suggestion {
                translations: self.translations.get(id).to_vec(),
                exactness: 100,
            }];
        }

        let tokens = self.tokenizer.normalize(query);
        if tokens.is_empty() {
            return Vec::new();
        }

        // Approximate phase: closest tolerance levels first.
        for omitted in 0..=max_words_omitted {
            for delta in 0..=max_length_delta {
                if cancel.is_cancelled() {
                    debug!("lookup cancelled");
                    return Vec::new();
                }
                if let Some(ids) = lookup::fuzzy_level(&self.index, &tokens, omitted, delta, cancel)
                {
                    let exactness =
                        lookup::exactness(omitted, delta, max_words_omitted, max_length_delta);
                    debug!(omitted, delta, hits = ids.len(), exactness, "fuzzy hit");
                    return ids
                        .iter()
                        .map(|&id| Suggestion {
                            translations: self.translations.get(id).to_vec(),
                            exactness,
                        })
                        .collect();
                }
            }
        }

        Vec::new()
    }

    /// Restartable read-only traversal of the whole memory in id order,
    /// as (source, translations) pairs. This is the export interface.
    pub fn enumerate(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.strings
            .sources()
            .iter()
            .enumerate()
            .map(|(id, source)| (source.as_str(), self.translations.get(id as u32)))
    }

    /// Number of distinct source strings stored.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Frames accumulated in the WAL since the last checkpoint.
    pub fn pending_wal_frames(&self) -> usize {
        self.wal.frame_count()
    }
}

/// The single mutation path shared by live `store` calls and WAL replay.
/// Infallible by construction; everything that can fail happens before.
fn apply(
    tokenizer: &Tokenizer,
    strings: &mut StringTable,
    translations: &mut TranslationTable,
    index: &mut WordIndex,
    source: &str,
    translation: &str,
) {
    let (id, is_new) = strings.insert(source);
    if is_new {
        let tokens = tokenizer.normalize(source);
        index.add_entry(id, &tokens);
    }
    translations.append(id, translation);
}
