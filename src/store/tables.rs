//! The three tables backing the store.
//!
//! `StringTable` maps each distinct source string to a stable id,
//! `TranslationTable` holds the translations observed per id, and
//! `WordIndex` maps (token, sentence length) to the sorted id list of
//! entries of that length containing that token. Ids double as indexes
//! into the id-ordered tables.

use std::collections::HashMap;

/// Bijection between distinct source strings and ids.
///
/// Ids are assigned sequentially from 0 and never reused, so the id of an
/// entry equals its position in `by_id`.
#[derive(Debug)]
pub(crate) struct StringTable {
    by_source: HashMap<String, u32>,
    by_id: Vec<String>,
}

impl StringTable {
    pub fn new() -> Self {
        Self {
            by_source: HashMap::new(),
            by_id: Vec::new(),
        }
    }

    /// Rebuild from the id-ordered source list of a checkpoint.
    pub fn from_sources(by_id: Vec<String>) -> Self {
        let by_source = by_id
            .iter()
            .enumerate()
            .map(|(id, s)| (s.clone(), id as u32))
            .collect();
        Self { by_source, by_id }
    }

    /// Returns `(id, is_new)`; idempotent for repeated identical sources.
    pub fn insert(&mut self, source: &str) -> (u32, bool) {
        if let Some(&id) = self.by_source.get(source) {
            return (id, false);
        }
        let id = self.by_id.len() as u32;
        self.by_id.push(source.to_string());
        self.by_source.insert(source.to_string(), id);
        (id, true)
    }

    /// Exact-match read.
    pub fn lookup(&self, source: &str) -> Option<u32> {
        self.by_source.get(source).copied()
    }

    /// Source strings in id order.
    pub fn sources(&self) -> &[String] {
        &self.by_id
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Translations per entry, insertion-ordered and duplicate-free.
#[derive(Debug)]
pub(crate) struct TranslationTable {
    by_id: Vec<Vec<String>>,
}

impl TranslationTable {
    pub fn new() -> Self {
        Self { by_id: Vec::new() }
    }

    pub fn from_rows(by_id: Vec<Vec<String>>) -> Self {
        Self { by_id }
    }

    /// Append `translation` to the list for `id` unless already present.
    /// Creates the list lazily on first call for the id.
    pub fn append(&mut self, id: u32, translation: &str) {
        let idx = id as usize;
        if self.by_id.len() <= idx {
            self.by_id.resize_with(idx + 1, Vec::new);
        }
        let list = &mut self.by_id[idx];
        if !list.iter().any(|t| t == translation) {
            list.push(translation.to_string());
        }
    }

    /// Stored translations for `id`, empty if unknown.
    pub fn get(&self, id: u32) -> &[String] {
        self.by_id
            .get(id as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Inverted index keyed by (token, sentence length).
#[derive(Debug)]
pub(crate) struct WordIndex {
    /// token -> sentence length -> strictly ascending entry ids.
    postings: HashMap<String, HashMap<u32, Vec<u32>>>,
}

impl WordIndex {
    pub fn new() -> Self {
        Self {
            postings: HashMap::new(),
        }
    }

    /// Index a newly created entry. `tokens` must be the entry's distinct
    /// token sequence; must be called exactly once per id, at creation
    /// time, with ids arriving in ascending order. Appending at the tail
    /// is what keeps every posting list sorted without re-sorting.
    pub fn add_entry(&mut self, id: u32, tokens: &[String]) {
        let length = tokens.len() as u32;
        for token in tokens {
            let ids = self
                .postings
                .entry(token.clone())
                .or_default()
                .entry(length)
                .or_default();
            debug_assert!(ids.last().map_or(true, |&last| last < id));
            ids.push(id);
        }
    }

    /// Insert a whole posting list from a checkpoint.
    pub fn insert_posting(&mut self, token: String, length: u32, ids: Vec<u32>) {
        self.postings.entry(token).or_default().insert(length, ids);
    }

    /// Sorted id list for the key, empty if absent.
    pub fn posting(&self, token: &str, length: u32) -> &[u32] {
        self.postings
            .get(token)
            .and_then(|by_len| by_len.get(&length))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All (token, length, ids) triples, in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32, &[u32])> {
        self.postings.iter().flat_map(|(token, by_len)| {
            by_len
                .iter()
                .map(move |(&length, ids)| (token.as_str(), length, ids.as_slice()))
        })
    }
}
