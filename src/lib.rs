//! Translation memory with approximate retrieval.
//!
//! A translation memory (TM) is a persisted database of previously seen
//! (source string, translations) pairs that can answer a query even when
//! the query matches no stored source exactly: it returns the translations
//! of the most similar stored sentences, where similarity means sharing
//! the same significant words up to a bounded number of omissions and a
//! bounded difference in sentence length.
//!
//! The store keeps three mutually consistent tables (source strings,
//! translations, word postings) in memory, made durable through a
//! write-ahead log plus periodic checkpoints. See [`store::TmStore`].

pub mod config;
pub mod store;
pub mod tokenizer;

pub use config::{ConfigError, TmConfig};
pub use store::{CancelToken, StorageError, Suggestion, TmStore};
pub use tokenizer::Tokenizer;
