//! Sequence framing: special boundary tokens, truncation budgets, padding.

use crate::constants::framing::{PAD_TOKEN, REAL_TOKEN, TITLED_OVERHEAD, UNTITLED_OVERHEAD};
use crate::data::FramedSequence;
use crate::errors::SampleError;
use crate::tokenizer::SpecialTokenIds;
use crate::types::TokenId;

/// Frames payloads as `[CLS] (title [SEP])? payload [SEP]` and right-pads to a fixed length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Framer {
    cls: TokenId,
    sep: TokenId,
    pad: TokenId,
    max_seq_length: usize,
}

impl Framer {
    /// Framer using the `[CLS]`, `[SEP]` and `[PAD]` ids of `special`.
    pub fn new(special: SpecialTokenIds, max_seq_length: usize) -> Self {
        Self {
            cls: special.cls,
            sep: special.sep,
            pad: special.pad,
            max_seq_length,
        }
    }

    /// Fixed framed length.
    pub fn max_seq_length(&self) -> usize {
        self.max_seq_length
    }

    /// Payload budget left after special tokens and the optional title.
    ///
    /// `3 + len(title)` with a title, `2` without. Saturates at zero when the
    /// title alone does not fit; framing then reports the overflow.
    pub fn payload_budget(&self, title: Option<&[TokenId]>) -> usize {
        self.max_seq_length.saturating_sub(title_pad_offset(title))
    }

    /// Frame and pad `tokens`, failing when the framed length exceeds `max_seq_length`.
    ///
    /// Callers truncate beforehand; this never drops tokens.
    pub fn frame(
        &self,
        tokens: &[TokenId],
        title: Option<&[TokenId]>,
    ) -> Result<FramedSequence, SampleError> {
        let len = tokens.len() + title_pad_offset(title);
        if len > self.max_seq_length {
            return Err(SampleError::SequenceTooLong {
                len,
                max_seq_length: self.max_seq_length,
            });
        }

        let mut framed = Vec::with_capacity(self.max_seq_length);
        framed.push(self.cls);
        if let Some(title) = title {
            framed.extend_from_slice(title);
            framed.push(self.sep);
        }
        framed.extend_from_slice(tokens);
        framed.push(self.sep);

        let mut pad_mask = vec![REAL_TOKEN; framed.len()];
        pad_mask.resize(self.max_seq_length, PAD_TOKEN);
        framed.resize(self.max_seq_length, self.pad);

        Ok(FramedSequence {
            tokens: framed,
            pad_mask,
        })
    }

    /// Placeholder evidence block: empty payload under an empty title.
    pub fn null_block(&self) -> Result<FramedSequence, SampleError> {
        self.frame(&[], Some(&[]))
    }
}

/// Special-token overhead of a framed sequence, including the title when present.
pub fn title_pad_offset(title: Option<&[TokenId]>) -> usize {
    match title {
        Some(title) => TITLED_OVERHEAD + title.len(),
        None => UNTITLED_OVERHEAD,
    }
}

/// Concatenate sentences and keep at most `budget` tokens.
pub fn flatten_truncated(sentences: &[Vec<TokenId>], budget: usize) -> Vec<TokenId> {
    sentences.iter().flatten().copied().take(budget).collect()
}
