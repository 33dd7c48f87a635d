//! Masked-LM sample construction.
//!
//! A block is flattened, truncated, framed, and then noised over whole-word
//! groups so that a word's subword pieces are always masked together. Word
//! boundaries come from `##` continuation pieces of the primary vocabulary,
//! or from the alternate-case stream when one is attached. Auxiliary values,
//! when attached, mark salient spans that are offered for masking first.

use std::ops::Range;
use std::sync::Arc;

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};

use crate::assembler::{AlternateTokens, AssembledBlock, AuxiliaryTokens};
use crate::config::MaskingPolicy;
use crate::constants::framing::{PAD_TOKEN, REAL_TOKEN};
use crate::constants::masking::{CONTINUATION_PREFIX, IGNORE_LABEL};
use crate::data::MaskedLmSample;
use crate::errors::SampleError;
use crate::framing::{Framer, flatten_truncated};
use crate::tokenizer::{SpecialTokenIds, Tokenizer};
use crate::types::{AuxValue, TokenId};

/// Builds masked-LM samples from assembled blocks.
#[derive(Clone)]
pub struct MaskedSampleBuilder {
    tokenizer: Arc<dyn Tokenizer>,
    special: SpecialTokenIds,
    framer: Framer,
    masked_lm_prob: f64,
    policy: MaskingPolicy,
    replacement_ids: Vec<TokenId>,
}

impl MaskedSampleBuilder {
    /// Builder over `tokenizer`'s vocabulary; `masked_lm_prob` is the target masking rate.
    pub fn new(
        tokenizer: Arc<dyn Tokenizer>,
        max_seq_length: usize,
        masked_lm_prob: f64,
        policy: MaskingPolicy,
    ) -> Self {
        let special = tokenizer.special_ids();
        // random replacements never inject framing or mask tokens
        let replacement_ids = tokenizer
            .vocab_ids()
            .into_iter()
            .filter(|id| !special.contains(*id))
            .collect();
        Self {
            framer: Framer::new(special, max_seq_length),
            tokenizer,
            special,
            masked_lm_prob,
            policy,
            replacement_ids,
        }
    }

    /// Fixed framed length.
    pub fn max_seq_length(&self) -> usize {
        self.framer.max_seq_length()
    }

    /// Build one masked-LM sample; all randomness is drawn from `rng`.
    pub fn build<R: Rng + ?Sized>(
        &self,
        block: &AssembledBlock,
        rng: &mut R,
    ) -> Result<MaskedLmSample, SampleError> {
        block.require_multi_sentence()?;

        let payload = flatten_truncated(&block.sentences, self.framer.payload_budget(None));
        let framed = self.framer.frame(&payload, None)?;
        let max_seq_length = self.framer.max_seq_length();

        let groups = self.word_groups(block, payload.len())?;
        let (mut salient, mut plain) = match &block.aux {
            AuxiliaryTokens::None => (Vec::new(), groups),
            AuxiliaryTokens::Values(values) => split_salient(groups, values, payload.len()),
        };
        salient.shuffle(rng);
        plain.shuffle(rng);

        let num_to_predict = self.num_to_predict(payload.len());
        let mut selected: Vec<Range<usize>> = Vec::new();
        let mut selected_count = 0;
        for candidate in salient.into_iter().chain(plain) {
            if selected_count >= num_to_predict {
                break;
            }
            if selected_count + candidate.len() > num_to_predict {
                continue;
            }
            selected_count += candidate.len();
            selected.push(candidate);
        }

        let mut tokens = framed.tokens;
        let mut labels = vec![IGNORE_LABEL; max_seq_length];
        let mut loss_mask = vec![PAD_TOKEN; max_seq_length];
        for pos in selected.into_iter().flatten() {
            let original = tokens[pos];
            labels[pos] = i64::from(original);
            loss_mask[pos] = REAL_TOKEN;
            tokens[pos] = self.noise(original, rng);
        }

        Ok(MaskedLmSample {
            tokens,
            pad_mask: framed.pad_mask,
            labels,
            loss_mask,
            token_types: vec![0; max_seq_length],
            query_block_indices: vec![block.window.block_idx as i64],
        })
    }

    /// `min(floor(p * max_seq_length), max(1, round(payload_len * p)))`.
    ///
    /// `payload_len` counts only maskable positions, never `[CLS]` or `[SEP]`.
    fn num_to_predict(&self, payload_len: usize) -> usize {
        let max_predictions = (self.masked_lm_prob * self.framer.max_seq_length() as f64) as usize;
        let target = (payload_len as f64 * self.masked_lm_prob).round() as usize;
        max_predictions.min(target.max(1))
    }

    fn noise<R: Rng + ?Sized>(&self, original: TokenId, rng: &mut R) -> TokenId {
        let draw = rng.random::<f64>();
        if draw < self.policy.mask_token_prob {
            self.special.mask
        } else if draw < self.policy.mask_token_prob + self.policy.random_token_prob {
            self.replacement_ids.choose(rng).copied().unwrap_or(original)
        } else {
            original
        }
    }

    /// Whole-word groups as framed positions (offset by `[CLS]`), clipped to the payload.
    fn word_groups(
        &self,
        block: &AssembledBlock,
        payload_len: usize,
    ) -> Result<Vec<Range<usize>>, SampleError> {
        let mut groups = Vec::new();
        let mut offset = 1;
        let limit = payload_len + 1;
        for (sentence_idx, sentence) in block.sentences.iter().enumerate() {
            if offset >= limit {
                break;
            }
            let local = match &block.alt {
                AlternateTokens::None => continuation_groups(sentence, self.tokenizer.as_ref()),
                AlternateTokens::Tokens {
                    sentences,
                    tokenizer,
                } => {
                    let alt = sentences.get(sentence_idx).ok_or_else(|| {
                        SampleError::StreamMisaligned {
                            stream: "alternate-case",
                            details: format!(
                                "no alternate sentence for primary sentence {sentence_idx}"
                            ),
                        }
                    })?;
                    align_words(
                        sentence,
                        self.tokenizer.as_ref(),
                        alt,
                        tokenizer.as_ref(),
                        sentence_idx,
                    )?
                }
            };
            for range in local {
                let start = range.start + offset;
                let end = (range.end + offset).min(limit);
                if start < end {
                    groups.push(start..end);
                }
            }
            offset += sentence.len();
        }
        Ok(groups)
    }
}

fn surface_of(tokenizer: &dyn Tokenizer, id: TokenId) -> &str {
    tokenizer.id_to_token(id).unwrap_or_default()
}

fn is_continuation(surface: &str) -> bool {
    surface.len() > CONTINUATION_PREFIX.len() && surface.starts_with(CONTINUATION_PREFIX)
}

fn piece_chars(surface: &str) -> usize {
    surface
        .strip_prefix(CONTINUATION_PREFIX)
        .filter(|rest| !rest.is_empty())
        .unwrap_or(surface)
        .chars()
        .count()
}

/// Group a sentence's positions into words using `##` continuation pieces.
pub fn continuation_groups(sentence: &[TokenId], tokenizer: &dyn Tokenizer) -> Vec<Range<usize>> {
    let mut groups: Vec<Range<usize>> = Vec::new();
    for (pos, id) in sentence.iter().enumerate() {
        let continues = tokenizer.id_to_token(*id).is_some_and(is_continuation);
        match groups.last_mut() {
            Some(last) if continues => last.end = pos + 1,
            _ => groups.push(pos..pos + 1),
        }
    }
    groups
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WordLen {
    Chars(usize),
    /// The alternate piece was unknown; fall back to continuation markers.
    Unknown,
}

fn alternate_word_lengths(alt: &[TokenId], tokenizer: &dyn Tokenizer) -> Vec<WordLen> {
    let unk = tokenizer.special_ids().unk;
    let mut words: Vec<WordLen> = Vec::new();
    for id in alt {
        let surface = surface_of(tokenizer, *id);
        let piece = if *id == unk {
            WordLen::Unknown
        } else {
            WordLen::Chars(piece_chars(surface))
        };
        if is_continuation(surface)
            && let Some(last) = words.last_mut()
        {
            *last = match (*last, piece) {
                (WordLen::Chars(len), WordLen::Chars(extra)) => WordLen::Chars(len + extra),
                _ => WordLen::Unknown,
            };
            continue;
        }
        words.push(piece);
    }
    words
}

/// Group primary positions into the words of the alternate-case stream.
///
/// Both streams tokenize the same text, so each alternate word covers the
/// same number of characters as the primary pieces it spans. Case and accent
/// folding keep character counts, which is what the alignment walks on.
pub fn align_words(
    primary: &[TokenId],
    primary_tokenizer: &dyn Tokenizer,
    alt: &[TokenId],
    alt_tokenizer: &dyn Tokenizer,
    sentence_idx: usize,
) -> Result<Vec<Range<usize>>, SampleError> {
    let misaligned = |details: String| SampleError::StreamMisaligned {
        stream: "alternate-case",
        details: format!("sentence {sentence_idx}: {details}"),
    };
    let words = alternate_word_lengths(alt, alt_tokenizer);
    let primary_unk = primary_tokenizer.special_ids().unk;

    let mut groups = Vec::with_capacity(words.len());
    let mut word = 0;
    let mut start = 0;
    let mut consumed = 0;
    for (pos, id) in primary.iter().enumerate() {
        let Some(target) = words.get(word) else {
            return Err(misaligned(format!(
                "primary token {pos} falls past the last of {} alternate words",
                words.len()
            )));
        };
        let closes = match *target {
            WordLen::Unknown => primary
                .get(pos + 1)
                .is_none_or(|next| !is_continuation(surface_of(primary_tokenizer, *next))),
            WordLen::Chars(len) => {
                consumed = if *id == primary_unk {
                    len
                } else {
                    consumed + piece_chars(surface_of(primary_tokenizer, *id))
                };
                if consumed > len {
                    return Err(misaligned(format!(
                        "word {word} spans {len} characters but primary pieces reach {consumed}"
                    )));
                }
                consumed == len
            }
        };
        if closes {
            groups.push(start..pos + 1);
            start = pos + 1;
            consumed = 0;
            word += 1;
        }
    }
    if word != words.len() || start != primary.len() {
        return Err(misaligned(format!(
            "primary tokens cover {word} of {} alternate words",
            words.len()
        )));
    }
    Ok(groups)
}

/// Split groups into merged salient spans and plain words.
fn split_salient(
    groups: Vec<Range<usize>>,
    values: &[Vec<AuxValue>],
    payload_len: usize,
) -> (Vec<Range<usize>>, Vec<Range<usize>>) {
    let flat: Vec<AuxValue> = values.iter().flatten().copied().take(payload_len).collect();
    let marked = |range: &Range<usize>| {
        range
            .clone()
            .any(|pos| flat.get(pos - 1).is_some_and(|value| *value != 0))
    };

    let mut salient: Vec<Range<usize>> = Vec::new();
    let mut plain = Vec::new();
    let mut extending = false;
    for group in groups {
        if !marked(&group) {
            extending = false;
            plain.push(group);
            continue;
        }
        match salient.last_mut() {
            Some(span) if extending && span.end == group.start => span.end = group.end,
            _ => salient.push(group),
        }
        extending = true;
    }
    (salient, plain)
}
