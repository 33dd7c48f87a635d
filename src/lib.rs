#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Block windows read out of the corpus, with optional side channels attached.
pub mod assembler;
/// Inverse-cloze query/block splitting.
pub mod cloze;
/// Dataset configuration types.
pub mod config;
/// Centralized constants used across framing, masking, and decoding.
pub mod constants;
/// Corpus store traits and in-memory stores.
pub mod corpus;
/// Sample record types.
pub mod data;
/// Index-addressable dataset front-ends.
pub mod dataset;
/// Sequence framing and truncation budgets.
pub mod framing;
/// Sample index mapping table and builder seam.
pub mod mapping;
/// Masked-LM sample construction.
pub mod masking;
/// Per-sample deterministic RNG.
pub mod rng;
/// Token-id to text reconstruction.
pub mod text;
/// Tokenizer capability and WordPiece vocabulary.
pub mod tokenizer;
/// Shared type aliases.
pub mod types;

mod errors;

pub use assembler::{AlternateTokens, AssembledBlock, AuxiliaryTokens, BlockAssembler};
pub use cloze::{QueryBlockSplitter, QuerySplit, extract_copy, extract_remove};
pub use config::{DatasetConfig, MaskingPolicy};
pub use corpus::{AlternateCase, AuxiliaryMask, InMemoryCorpus, SequenceStore};
pub use data::{FramedSequence, IctSample, MaskedLmSample};
pub use dataset::{IctDataset, RealmDataset, SampleDataset};
pub use errors::SampleError;
pub use framing::Framer;
pub use mapping::{BlockWindow, MappingBuilder, MappingRequest, SampleMapping};
pub use masking::MaskedSampleBuilder;
pub use rng::{DeterministicRng, deterministic_rng};
pub use text::{decode_tokens, encode_text, escape_reserved, join_wordpieces};
pub use tokenizer::{SpecialTokenIds, Tokenizer, WordPieceVocab};
pub use types::{AuxValue, LabelId, MaskValue, Sentence, TokenId, TokenText};
