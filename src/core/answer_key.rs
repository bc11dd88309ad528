/// Answer key store: the externally loaded ground truth, with an embedded
/// fallback so grading keeps working when loading fails.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

use crate::core::grading::AnswerKey;
use crate::schema::claim::{AnswerKeyEntry, ClaimId};

/// Answer data for the reference case, compiled into the binary.
const EMBEDDED_ANSWER_BOOK: &str = include_str!("../../case_data/flora_jasmine/answer_key.ron");

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("suspect '{suspect}' lists claim {claim} more than once")]
    DuplicateClaim { suspect: String, claim: u32 },
}

/// Answer entries for one suspect's summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspectFile {
    pub name: String,
    pub entries: Vec<AnswerKeyEntry>,
}

/// Every suspect's answer entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerBook {
    pub suspects: Vec<SuspectFile>,
}

impl AnswerBook {
    pub fn load_from_ron(path: &Path) -> Result<AnswerBook, StoreError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a book. Each claim may appear at most once per suspect.
    pub fn parse_ron(input: &str) -> Result<AnswerBook, StoreError> {
        let book: AnswerBook = ron::from_str(input)?;
        for file in &book.suspects {
            let mut seen = BTreeSet::new();
            if let Some(entry) = file.entries.iter().find(|entry| !seen.insert(entry.claim)) {
                return Err(StoreError::DuplicateClaim {
                    suspect: file.name.clone(),
                    claim: entry.claim.0,
                });
            }
        }
        Ok(book)
    }

    /// The book shipped with the crate. Empty if it somehow fails to parse.
    pub fn embedded() -> AnswerBook {
        match Self::parse_ron(EMBEDDED_ANSWER_BOOK) {
            Ok(book) => book,
            Err(e) => {
                tracing::error!(error = %e, "embedded answer book is malformed");
                AnswerBook::default()
            }
        }
    }

    pub fn suspect(&self, name: &str) -> Option<&SuspectFile> {
        self.suspects.iter().find(|suspect| suspect.name == name)
    }
}

/// Where the store is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    Loading,
    Ready,
    /// Loading failed and the embedded book is in use.
    Fallback,
}

/// Result of looking up one claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLookup<'a> {
    /// The store has not finished loading.
    NotLoaded,
    /// Loaded, but the suspect or the claim is not in it.
    Missing,
    Found(&'a AnswerKeyEntry),
}

impl<'a> KeyLookup<'a> {
    pub fn entry(self) -> Option<&'a AnswerKeyEntry> {
        match self {
            Self::Found(entry) => Some(entry),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum StoreState {
    Loading,
    Ready(AnswerBook),
    Fallback { book: AnswerBook, reason: String },
}

/// Holds the answer book once it arrives. Lookups before then report
/// `NotLoaded` instead of failing.
#[derive(Debug, Clone)]
pub struct AnswerKeyStore {
    state: StoreState,
}

impl Default for AnswerKeyStore {
    fn default() -> Self {
        Self::loading()
    }
}

impl AnswerKeyStore {
    /// A store still waiting for its data.
    pub fn loading() -> Self {
        Self {
            state: StoreState::Loading,
        }
    }

    pub fn ready(book: AnswerBook) -> Self {
        Self {
            state: StoreState::Ready(book),
        }
    }

    /// A store holding only the embedded book.
    pub fn embedded() -> Self {
        Self::ready(AnswerBook::embedded())
    }

    /// Load from a file, falling back to the embedded book on any error.
    pub fn load_from_ron(path: &Path) -> Self {
        let mut store = Self::loading();
        store.finish(AnswerBook::load_from_ron(path));
        store
    }

    /// Complete a pending load.
    pub fn finish(&mut self, result: Result<AnswerBook, StoreError>) {
        self.state = match result {
            Ok(book) => {
                tracing::debug!(suspects = book.suspects.len(), "answer book loaded");
                StoreState::Ready(book)
            }
            Err(e) => {
                tracing::warn!(error = %e, "answer book failed to load; using embedded default");
                StoreState::Fallback {
                    book: AnswerBook::embedded(),
                    reason: e.to_string(),
                }
            }
        };
    }

    pub fn status(&self) -> StoreStatus {
        match self.state {
            StoreState::Loading => StoreStatus::Loading,
            StoreState::Ready(_) => StoreStatus::Ready,
            StoreState::Fallback { .. } => StoreStatus::Fallback,
        }
    }

    /// Why the embedded book is in use, if it is.
    pub fn fallback_reason(&self) -> Option<&str> {
        match &self.state {
            StoreState::Fallback { reason, .. } => Some(reason),
            _ => None,
        }
    }

    fn book(&self) -> Option<&AnswerBook> {
        match &self.state {
            StoreState::Loading => None,
            StoreState::Ready(book) | StoreState::Fallback { book, .. } => Some(book),
        }
    }

    /// The answer key for one suspect, or `None` while loading or when the
    /// suspect is unknown.
    pub fn answer_key(&self, suspect: &str) -> Option<AnswerKey> {
        let file = self.book()?.suspect(suspect)?;
        Some(AnswerKey::new(file.entries.iter().cloned()))
    }

    pub fn entry(&self, suspect: &str, claim: ClaimId) -> KeyLookup<'_> {
        let Some(book) = self.book() else {
            return KeyLookup::NotLoaded;
        };
        book.suspect(suspect)
            .and_then(|file| file.entries.iter().find(|entry| entry.claim == claim))
            .map_or(KeyLookup::Missing, KeyLookup::Found)
    }
}
