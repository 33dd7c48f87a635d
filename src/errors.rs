use std::io;

use thiserror::Error;

/// Error type for sample construction, corpus access, and configuration failures.
///
/// None of these are transient: every variant points at a broken upstream
/// invariant (mapping, corpus, or configuration) and the build is not retried.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("block [{start_idx}, {end_idx}) has {sentences} sentence(s); at least 2 are required")]
    BlockTooShort {
        start_idx: usize,
        end_idx: usize,
        sentences: usize,
    },
    #[error("framed sequence length {len} exceeds max_seq_length {max_seq_length}")]
    SequenceTooLong { len: usize, max_seq_length: usize },
    #[error("{stream} stream is misaligned with the primary block: {details}")]
    StreamMisaligned {
        stream: &'static str,
        details: String,
    },
    #[error("sample index {index} is out of range for a mapping of {len} rows")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("{store} store has no entry {index} (len {len})")]
    CorpusIndex {
        store: &'static str,
        index: usize,
        len: usize,
    },
    #[error("tokenization failed: {0}")]
    Tokenization(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}
