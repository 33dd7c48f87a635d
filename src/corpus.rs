//! Corpus access interfaces.
//!
//! Ownership model:
//! - `SequenceStore` is the read-only, index-addressable view of one token
//!   stream (sentences by block id, titles by document id, or a parallel
//!   side-channel).
//! - Stores are shared behind `Arc` and never mutated by this crate.

use std::sync::Arc;

use crate::errors::SampleError;
use crate::tokenizer::Tokenizer;
use crate::types::{AuxValue, TokenId};

/// Index-addressable sequence store.
///
/// `get(idx)` must return the same sequence for the same index for the
/// lifetime of the store. Indices are dense over `0..len()`.
pub trait SequenceStore<T = TokenId>: Send + Sync {
    /// Short label used in error messages (`blocks`, `titles`, ...).
    fn name(&self) -> &'static str;
    /// Number of addressable entries.
    fn len(&self) -> usize;
    /// Entry at `idx`.
    fn get(&self, idx: usize) -> Result<Vec<T>, SampleError>;

    /// True when the store has no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries `[start, end)` in order.
    fn range(&self, start: usize, end: usize) -> Result<Vec<Vec<T>>, SampleError> {
        (start..end).map(|idx| self.get(idx)).collect()
    }
}

/// In-memory store backed by a vector of sequences.
#[derive(Clone, Debug)]
pub struct InMemoryCorpus<T = TokenId> {
    name: &'static str,
    entries: Vec<Vec<T>>,
}

impl<T> InMemoryCorpus<T> {
    /// Wrap `entries` under the given store label.
    pub fn new(name: &'static str, entries: Vec<Vec<T>>) -> Self {
        Self { name, entries }
    }
}

impl<T: Clone + Send + Sync> SequenceStore<T> for InMemoryCorpus<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get(&self, idx: usize) -> Result<Vec<T>, SampleError> {
        self.entries
            .get(idx)
            .cloned()
            .ok_or(SampleError::CorpusIndex {
                store: self.name,
                index: idx,
                len: self.entries.len(),
            })
    }
}

/// Optional per-token auxiliary mask channel.
#[derive(Clone, Default)]
pub enum AuxiliaryMask {
    /// No side channel; masking is purely random over whole words.
    #[default]
    Disabled,
    /// Values parallel to the primary block store; non-zero marks salient tokens.
    Enabled(Arc<dyn SequenceStore<AuxValue>>),
}

/// Optional alternate-case tokenization channel.
#[derive(Clone, Default)]
pub enum AlternateCase {
    /// No side channel; word boundaries come from `##` continuation pieces.
    #[default]
    Disabled,
    /// Case-sensitive re-tokenization of the same sentences plus its vocabulary.
    Enabled {
        store: Arc<dyn SequenceStore<TokenId>>,
        tokenizer: Arc<dyn Tokenizer>,
    },
}

impl AuxiliaryMask {
    /// True when a side channel is attached.
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled(_))
    }
}

impl AlternateCase {
    /// True when a side channel is attached.
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled { .. })
    }
}
