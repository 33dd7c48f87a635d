//! Sample index mapping: the fixed, ordered universe of addressable samples.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::corpus::SequenceStore;
use crate::errors::SampleError;

/// One mapping row: the block range, its document, and the block's own id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockWindow {
    /// First sentence index (inclusive) in the block store.
    pub start_idx: usize,
    /// Last sentence index (exclusive) in the block store.
    pub end_idx: usize,
    /// Document owning the block; indexes the title store.
    pub doc_idx: usize,
    /// Stable block id used for provenance joins.
    pub block_idx: usize,
}

impl BlockWindow {
    /// Number of sentences the window spans.
    pub fn sentence_count(&self) -> usize {
        self.end_idx.saturating_sub(self.start_idx)
    }

    /// `[start_idx, end_idx, doc_idx, block_idx]` as fixed-width integers.
    pub fn block_data(&self) -> [i64; 4] {
        [
            self.start_idx as i64,
            self.end_idx as i64,
            self.doc_idx as i64,
            self.block_idx as i64,
        ]
    }
}

/// Immutable table of block windows; row order defines sample indices `0..len`.
///
/// Serializes as a bare array of rows. Deserialization goes through
/// [`SampleMapping::from_windows`], so empty ranges are rejected there too.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<BlockWindow>", into = "Vec<BlockWindow>")]
pub struct SampleMapping {
    rows: Arc<[BlockWindow]>,
}

impl SampleMapping {
    /// Build a mapping from externally computed rows.
    ///
    /// Rows with `start_idx >= end_idx` can never produce a block and are
    /// rejected up front.
    pub fn from_windows(rows: Vec<BlockWindow>) -> Result<Self, SampleError> {
        if let Some((row, window)) = rows
            .iter()
            .enumerate()
            .find(|(_, window)| window.start_idx >= window.end_idx)
        {
            return Err(SampleError::Configuration(format!(
                "mapping row {row} has an empty block range [{}, {})",
                window.start_idx, window.end_idx
            )));
        }
        Ok(Self { rows: rows.into() })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the mapping has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row for sample `index`.
    pub fn get(&self, index: usize) -> Result<BlockWindow, SampleError> {
        self.rows
            .get(index)
            .copied()
            .ok_or(SampleError::IndexOutOfRange {
                index,
                len: self.rows.len(),
            })
    }

    /// All rows in order.
    pub fn rows(&self) -> &[BlockWindow] {
        &self.rows
    }
}

/// Parameters forwarded to an external mapping builder.
#[derive(Clone, Debug, PartialEq)]
pub struct MappingRequest {
    /// Corpus path prefix the builder may use to cache its output.
    pub data_prefix: String,
    /// Number of passes over the corpus; `None` leaves it to `max_num_samples`.
    pub num_epochs: Option<u64>,
    /// Target number of rows; `None` leaves it to `num_epochs`.
    pub max_num_samples: Option<u64>,
    /// Framed sequence length every window must fit into.
    pub max_seq_length: usize,
    /// Probability of deliberately short windows.
    pub short_seq_prob: f64,
    /// Seed controlling the builder's own shuffling.
    pub seed: u64,
    /// Dataset name used in the builder's cache key.
    pub name: String,
}

/// External precomputation that partitions a corpus into block windows.
///
/// The core only consumes the resulting rows; how windows are chosen is
/// entirely up to the implementation.
pub trait MappingBuilder {
    /// Build the mapping for `request` over the given stores.
    fn build(
        &self,
        blocks: &dyn SequenceStore,
        titles: &dyn SequenceStore,
        request: &MappingRequest,
    ) -> Result<SampleMapping, SampleError>;
}

impl TryFrom<Vec<BlockWindow>> for SampleMapping {
    type Error = SampleError;

    fn try_from(rows: Vec<BlockWindow>) -> Result<Self, Self::Error> {
        Self::from_windows(rows)
    }
}

impl From<SampleMapping> for Vec<BlockWindow> {
    fn from(mapping: SampleMapping) -> Self {
        mapping.rows.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(start_idx: usize, end_idx: usize) -> BlockWindow {
        BlockWindow {
            start_idx,
            end_idx,
            doc_idx: 0,
            block_idx: start_idx,
        }
    }

    #[test]
    fn rows_are_addressed_in_order() {
        let mapping = SampleMapping::from_windows(vec![window(0, 2), window(2, 5)]).unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get(1).unwrap(), window(2, 5));
        assert_eq!(mapping.get(1).unwrap().sentence_count(), 3);
        assert_eq!(mapping.get(1).unwrap().block_data(), [2, 5, 0, 2]);
    }

    #[test]
    fn out_of_range_index_is_reported() {
        let mapping = SampleMapping::from_windows(vec![window(0, 2)]).unwrap();
        assert!(matches!(
            mapping.get(3),
            Err(SampleError::IndexOutOfRange { index: 3, len: 1 })
        ));
    }

    #[test]
    fn empty_ranges_are_rejected() {
        let err = SampleMapping::from_windows(vec![window(0, 2), window(4, 4)]).unwrap_err();
        assert!(matches!(err, SampleError::Configuration(msg) if msg.contains("row 1")));
    }

    #[test]
    fn mapping_serializes_as_rows() {
        let mapping = SampleMapping::from_windows(vec![window(3, 6)]).unwrap();
        let raw = serde_json::to_string(&mapping).unwrap();
        assert_eq!(
            raw,
            r#"[{"start_idx":3,"end_idx":6,"doc_idx":0,"block_idx":3}]"#
        );
        let restored: SampleMapping = serde_json::from_str(&raw).unwrap();
        assert_eq!(restored, mapping);
    }

    #[test]
    fn deserialized_rows_are_validated() {
        let raw = r#"[
            {"start_idx": 0, "end_idx": 2, "doc_idx": 0, "block_idx": 0},
            {"start_idx": 5, "end_idx": 5, "doc_idx": 1, "block_idx": 1}
        ]"#;
        let err = serde_json::from_str::<SampleMapping>(raw).unwrap_err();
        assert!(err.to_string().contains("mapping row 1 has an empty block range"));
    }
}
