use serde::{Deserialize, Serialize};

pub use crate::types::{LabelId, MaskValue, TokenId};

/// Fixed-length framed token sequence with its pad mask.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramedSequence {
    /// `[CLS] (title [SEP])? payload [SEP]` followed by `[PAD]` up to `max_seq_length`.
    pub tokens: Vec<TokenId>,
    /// `1` for real and special positions, `0` for padding.
    pub pad_mask: Vec<MaskValue>,
}

impl FramedSequence {
    /// Framed length (always `max_seq_length`).
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True for a zero-length frame.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of non-padding positions.
    pub fn real_len(&self) -> usize {
        self.pad_mask.iter().filter(|mask| **mask != 0).count()
    }
}

/// Masked-language-modeling training example.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskedLmSample {
    /// Noised token ids (`[MASK]`, random, or original at selected positions).
    pub tokens: Vec<TokenId>,
    /// `1` for real and special positions, `0` for padding.
    pub pad_mask: Vec<MaskValue>,
    /// Original token id at selected positions, `-1` elsewhere.
    pub labels: Vec<LabelId>,
    /// `1` at selected positions, `0` elsewhere.
    pub loss_mask: Vec<MaskValue>,
    /// Segment ids; a block is a single segment so every entry is `0`.
    pub token_types: Vec<MaskValue>,
    /// Provenance: the mapping's `block_idx` for this sample.
    pub query_block_indices: Vec<i64>,
}

impl MaskedLmSample {
    /// Positions carrying a prediction target.
    pub fn masked_positions(&self) -> Vec<usize> {
        self.loss_mask
            .iter()
            .enumerate()
            .filter(|(_, mask)| **mask != 0)
            .map(|(pos, _)| pos)
            .collect()
    }
}

/// Inverse-cloze query/block training pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IctSample {
    /// Framed query sentence.
    pub query_tokens: Vec<TokenId>,
    /// Pad mask of `query_tokens`.
    pub query_pad_mask: Vec<MaskValue>,
    /// Framed context, title-prefixed when titles are enabled.
    pub block_tokens: Vec<TokenId>,
    /// Pad mask of `block_tokens`.
    pub block_pad_mask: Vec<MaskValue>,
    /// `[start_idx, end_idx, doc_idx, block_idx]` of the source window.
    pub block_data: [i64; 4],
}
