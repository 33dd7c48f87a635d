//! Tokenizer capability injected into every component that needs vocabulary
//! or special-token ids.
//!
//! The core never looks a tokenizer up from ambient state: datasets and
//! builders hold an `Arc<dyn Tokenizer>` handed to them at construction.

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokenizers::models::wordpiece::WordPiece;
use tokenizers::normalizers::bert::BertNormalizer;
use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tracing::debug;

use crate::constants::masking::CONTINUATION_PREFIX;
use crate::constants::tokens::{CLS, MASK, MAX_WORDPIECE_CHARS, PAD, SEP, UNK};
use crate::errors::SampleError;
use crate::types::{TokenId, TokenText};

/// Ids of the special tokens used for framing, masking, and decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialTokenIds {
    /// `[CLS]`
    pub cls: TokenId,
    /// `[SEP]`
    pub sep: TokenId,
    /// `[MASK]`
    pub mask: TokenId,
    /// `[PAD]`
    pub pad: TokenId,
    /// `[UNK]`
    pub unk: TokenId,
}

impl SpecialTokenIds {
    /// True for any of the special ids.
    pub fn contains(&self, id: TokenId) -> bool {
        id == self.cls || id == self.sep || id == self.mask || id == self.pad || id == self.unk
    }
}

/// Vocabulary and tokenization capability.
///
/// Implementations must be deterministic: the same text always tokenizes to
/// the same ids and `id_to_token` is a fixed mapping.
pub trait Tokenizer: Send + Sync {
    /// Special-token ids of this vocabulary.
    fn special_ids(&self) -> SpecialTokenIds;
    /// Number of entries in the vocabulary.
    fn vocab_size(&self) -> usize;
    /// Surface form for `id`, or `None` when the id is outside the vocabulary.
    fn id_to_token(&self, id: TokenId) -> Option<&str>;
    /// Id for a surface form, or `None` when it is not in the vocabulary.
    fn token_to_id(&self, token: &str) -> Option<TokenId>;
    /// Tokenize raw text into vocabulary ids, without framing tokens.
    fn tokenize(&self, text: &str) -> Result<Vec<TokenId>, SampleError>;

    /// Every id in the vocabulary, in id order.
    fn vocab_ids(&self) -> Vec<TokenId> {
        (0..self.vocab_size() as TokenId).collect()
    }

    /// Map ids to surface tokens; ids outside the vocabulary become the unknown token.
    fn convert_ids_to_tokens(&self, ids: &[TokenId]) -> Vec<TokenText> {
        let unk = self.id_to_token(self.special_ids().unk).unwrap_or(UNK);
        ids.iter()
            .map(|id| self.id_to_token(*id).unwrap_or(unk).to_string())
            .collect()
    }
}

/// WordPiece vocabulary backed by a BERT tokenization pipeline.
///
/// Text goes through [`BertNormalizer`] (control-character cleanup, CJK
/// character splitting, and lowercasing with accent stripping when
/// `lower_case` is set), then [`BertPreTokenizer`] (whitespace and Unicode
/// punctuation), then greedy longest-match [`WordPiece`]. Ids are line
/// positions in the vocabulary file (or positions in the token list handed to
/// [`WordPieceVocab::from_tokens`]).
#[derive(Clone)]
pub struct WordPieceVocab {
    token_to_id: IndexMap<TokenText, TokenId>,
    pipeline: tokenizers::Tokenizer,
    lower_case: bool,
    special: SpecialTokenIds,
}

impl fmt::Debug for WordPieceVocab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordPieceVocab")
            .field("vocab_size", &self.token_to_id.len())
            .field("lower_case", &self.lower_case)
            .field("special", &self.special)
            .finish_non_exhaustive()
    }
}

impl WordPieceVocab {
    /// Build a vocabulary from tokens in id order.
    ///
    /// The five special tokens (`[CLS]`, `[SEP]`, `[MASK]`, `[PAD]`, `[UNK]`)
    /// must be present; duplicate entries are rejected because they would
    /// shift every later id.
    pub fn from_tokens<I, T>(tokens: I, lower_case: bool) -> Result<Self, SampleError>
    where
        I: IntoIterator<Item = T>,
        T: Into<TokenText>,
    {
        let mut token_to_id = IndexMap::new();
        for token in tokens {
            let token = token.into();
            let id = token_to_id.len() as TokenId;
            if token_to_id.contains_key(&token) {
                return Err(SampleError::Configuration(format!(
                    "duplicate vocabulary entry '{token}' at id {id}"
                )));
            }
            token_to_id.insert(token, id);
        }
        Self::from_ordered(token_to_id, lower_case)
    }

    /// Load a `vocab.txt` file with one token per line.
    pub fn from_vocab_file(path: impl AsRef<Path>, lower_case: bool) -> Result<Self, SampleError> {
        let path = path.as_ref();
        let file = path.to_str().ok_or_else(|| {
            SampleError::Configuration(format!("vocabulary path {} is not UTF-8", path.display()))
        })?;
        let vocab = WordPiece::read_file(file).map_err(|err| {
            SampleError::Configuration(format!("failed to read vocabulary {file}: {err}"))
        })?;
        let mut entries: Vec<(TokenText, TokenId)> = vocab.into_iter().collect();
        entries.sort_by_key(|(_, id)| *id);
        // a repeated line keeps only its last id and leaves a gap behind
        if let Some((position, (token, _))) = entries
            .iter()
            .enumerate()
            .find(|(position, (_, id))| *id as usize != *position)
        {
            return Err(SampleError::Configuration(format!(
                "duplicate vocabulary entry '{token}' in {file} (id {position} is missing)"
            )));
        }
        Self::from_ordered(entries.into_iter().collect(), lower_case)
    }

    fn from_ordered(
        token_to_id: IndexMap<TokenText, TokenId>,
        lower_case: bool,
    ) -> Result<Self, SampleError> {
        let lookup = |name: &str| {
            token_to_id.get(name).copied().ok_or_else(|| {
                SampleError::Configuration(format!("vocabulary is missing special token {name}"))
            })
        };
        let special = SpecialTokenIds {
            cls: lookup(CLS)?,
            sep: lookup(SEP)?,
            mask: lookup(MASK)?,
            pad: lookup(PAD)?,
            unk: lookup(UNK)?,
        };
        let model = WordPiece::builder()
            .vocab(
                token_to_id
                    .iter()
                    .map(|(token, id)| (token.clone(), *id))
                    .collect::<std::collections::HashMap<String, u32>>(),
            )
            .unk_token(UNK.to_string())
            .continuing_subword_prefix(CONTINUATION_PREFIX.to_string())
            .max_input_chars_per_word(MAX_WORDPIECE_CHARS)
            .build()
            .map_err(|err| {
                SampleError::Configuration(format!("failed to build WordPiece model: {err}"))
            })?;
        let mut pipeline = tokenizers::Tokenizer::new(model);
        // strip_accents: None follows lower_case, as uncased BERT does
        pipeline
            .with_normalizer(Some(BertNormalizer::new(true, true, None, lower_case)))
            .with_pre_tokenizer(Some(BertPreTokenizer));
        debug!(
            "[realm:tokenizer] built WordPiece vocabulary ({} entries, lower_case={lower_case})",
            token_to_id.len()
        );
        Ok(Self {
            token_to_id,
            pipeline,
            lower_case,
            special,
        })
    }

    /// Whether input text is lowercased (and accent-stripped) before WordPiece lookup.
    pub fn lower_case(&self) -> bool {
        self.lower_case
    }
}

impl Tokenizer for WordPieceVocab {
    fn special_ids(&self) -> SpecialTokenIds {
        self.special
    }

    fn vocab_size(&self) -> usize {
        self.token_to_id.len()
    }

    fn id_to_token(&self, id: TokenId) -> Option<&str> {
        self.token_to_id
            .get_index(id as usize)
            .map(|(token, _)| token.as_str())
    }

    fn token_to_id(&self, token: &str) -> Option<TokenId> {
        self.token_to_id.get(token).copied()
    }

    fn tokenize(&self, text: &str) -> Result<Vec<TokenId>, SampleError> {
        let encoding = self
            .pipeline
            .encode(text, false)
            .map_err(|err| SampleError::Tokenization(err.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }
}
