//! Inverse-cloze query/block splitting.
//!
//! One sentence of a block becomes the query. It is either copied (the block
//! keeps it, so the query appears inside its context) or removed (the block
//! is the surrounding context only).

use rand::Rng;

use crate::assembler::AssembledBlock;
use crate::data::{FramedSequence, IctSample};
use crate::errors::SampleError;
use crate::framing::{Framer, flatten_truncated};
use crate::tokenizer::SpecialTokenIds;
use crate::types::{Sentence, TokenId};

/// A query sentence and the context sentences left for the block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuerySplit {
    /// The extracted sentence.
    pub query: Sentence,
    /// Sentences the block is built from.
    pub context: Vec<Sentence>,
}

/// Copy sentence `idx` out as the query; the context keeps every sentence.
pub fn extract_copy(sentences: &[Sentence], idx: usize) -> Option<QuerySplit> {
    let query = sentences.get(idx)?.clone();
    Some(QuerySplit {
        query,
        context: sentences.to_vec(),
    })
}

/// Move sentence `idx` out as the query; the context holds the other sentences in order.
pub fn extract_remove(sentences: &[Sentence], idx: usize) -> Option<QuerySplit> {
    let query = sentences.get(idx)?.clone();
    let context = sentences
        .iter()
        .enumerate()
        .filter(|(pos, _)| *pos != idx)
        .map(|(_, sentence)| sentence.clone())
        .collect();
    Some(QuerySplit { query, context })
}

/// Builds inverse-cloze pairs from assembled blocks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QueryBlockSplitter {
    framer: Framer,
    query_in_block_prob: f64,
}

impl QueryBlockSplitter {
    /// Splitter framing to `max_seq_length` with the given keep probability.
    pub fn new(special: SpecialTokenIds, max_seq_length: usize, query_in_block_prob: f64) -> Self {
        Self {
            framer: Framer::new(special, max_seq_length),
            query_in_block_prob,
        }
    }

    /// Framer shared by queries and blocks.
    pub fn framer(&self) -> &Framer {
        &self.framer
    }

    /// Pick the query sentence and keep/remove policy from `rng`, then split.
    ///
    /// Draw order is fixed: the sentence index first, then the keep draw.
    pub fn split<R: Rng + ?Sized>(
        &self,
        block: &AssembledBlock,
        title: Option<&[TokenId]>,
        rng: &mut R,
    ) -> Result<IctSample, SampleError> {
        block.require_multi_sentence()?;
        let query_idx = rng.random_range(0..block.sentences.len());
        let keep_query = rng.random::<f64>() < self.query_in_block_prob;
        self.split_at(block, title, query_idx, keep_query)
    }

    /// Split with an explicit query sentence and policy.
    pub fn split_at(
        &self,
        block: &AssembledBlock,
        title: Option<&[TokenId]>,
        query_idx: usize,
        keep_query: bool,
    ) -> Result<IctSample, SampleError> {
        block.require_multi_sentence()?;
        let extracted = if keep_query {
            extract_copy(&block.sentences, query_idx)
        } else {
            extract_remove(&block.sentences, query_idx)
        };
        let QuerySplit { mut query, context } =
            extracted.ok_or(SampleError::IndexOutOfRange {
                index: query_idx,
                len: block.sentences.len(),
            })?;

        query.truncate(self.framer.payload_budget(None));
        let query = self.framer.frame(&query, None)?;
        let block_framed = self.frame_context(&context, title)?;

        Ok(IctSample {
            query_tokens: query.tokens,
            query_pad_mask: query.pad_mask,
            block_tokens: block_framed.tokens,
            block_pad_mask: block_framed.pad_mask,
            block_data: block.window.block_data(),
        })
    }

    /// Flatten, truncate to the title-aware budget, and frame context sentences.
    pub fn frame_context(
        &self,
        context: &[Sentence],
        title: Option<&[TokenId]>,
    ) -> Result<FramedSequence, SampleError> {
        let payload = flatten_truncated(context, self.framer.payload_budget(title));
        self.framer.frame(&payload, title)
    }
}
