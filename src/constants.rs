/// Constants used by per-sample RNG derivation.
pub mod rng {
    /// Offset mixed into the global seed before it is combined with a sample index.
    pub const SAMPLE_SEED_OFFSET: u64 = 0x5EED_B10C;
    /// SplitMix64 increment (golden ratio).
    pub const SPLITMIX_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;
    /// First SplitMix64 multiplier.
    pub const SPLITMIX_MUL_A: u64 = 0xBF58_476D_1CE4_E5B9;
    /// Second SplitMix64 multiplier.
    pub const SPLITMIX_MUL_B: u64 = 0x94D0_49BB_1331_11EB;
}

/// Constants used by framing and padding.
pub mod framing {
    /// Special tokens surrounding an untitled payload: `[CLS]` and `[SEP]`.
    pub const UNTITLED_OVERHEAD: usize = 2;
    /// Special tokens surrounding a titled payload: `[CLS]`, the title's `[SEP]`,
    /// and the closing `[SEP]`.
    pub const TITLED_OVERHEAD: usize = 3;
    /// Pad-mask value for real and special positions.
    pub const REAL_TOKEN: u8 = 1;
    /// Pad-mask value for padding positions.
    pub const PAD_TOKEN: u8 = 0;
}

/// Constants used by the masked-LM builder.
pub mod masking {
    /// Label written at positions that carry no prediction target.
    pub const IGNORE_LABEL: i64 = -1;
    /// Default share of selected positions replaced with `[MASK]`.
    pub const DEFAULT_MASK_TOKEN_PROB: f64 = 0.8;
    /// Default share of selected positions replaced with a random vocabulary token.
    pub const DEFAULT_RANDOM_TOKEN_PROB: f64 = 0.1;
    /// Prefix marking a WordPiece continuation piece.
    pub const CONTINUATION_PREFIX: &str = "##";
}

/// Special-token surface forms shared by the WordPiece vocabulary and the text reconstructor.
pub mod tokens {
    /// Classification token opening every framed sequence.
    pub const CLS: &str = "[CLS]";
    /// Separator token closing titles and payloads.
    pub const SEP: &str = "[SEP]";
    /// Mask token written over selected positions.
    pub const MASK: &str = "[MASK]";
    /// Padding token.
    pub const PAD: &str = "[PAD]";
    /// Unknown-token fallback.
    pub const UNK: &str = "[UNK]";
    /// Words longer than this many characters tokenize to `[UNK]`.
    pub const MAX_WORDPIECE_CHARS: usize = 100;
}

/// Constants used by query text reconstruction.
pub mod text {
    /// Characters reserved by the downstream search syntax; escaped in strict decoding.
    pub const RESERVED_CHARS: [char; 17] = [
        '+', '-', '&', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '/',
    ];
    /// Escape character inserted before reserved characters.
    pub const ESCAPE_CHAR: char = '\\';
    /// Strict decodes shorter than this many characters receive the placeholder.
    pub const MIN_QUERY_CHARS: usize = 3;
    /// Placeholder appended to degenerate strict decodes.
    pub const SHORT_QUERY_PLACEHOLDER: &str = "text here";
}

/// Defaults used by `DatasetConfig`.
pub mod config {
    /// Default global seed.
    pub const DEFAULT_SEED: u64 = 1234;
    /// Default framed sequence length.
    pub const DEFAULT_MAX_SEQ_LENGTH: usize = 288;
    /// Default target masking rate.
    pub const DEFAULT_MASKED_LM_PROB: f64 = 0.15;
    /// Default short-sequence probability forwarded to the mapping builder.
    pub const DEFAULT_SHORT_SEQ_PROB: f64 = 0.1;
    /// Default probability of keeping the query sentence inside its block.
    pub const DEFAULT_QUERY_IN_BLOCK_PROB: f64 = 0.1;
    /// Smallest usable framed length (`[CLS]`, one token, `[SEP]`).
    pub const MIN_MAX_SEQ_LENGTH: usize = 3;
}
