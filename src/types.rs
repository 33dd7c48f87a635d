/// Vocabulary token id.
/// Example: `101` (`[CLS]` in the standard uncased BERT vocabulary)
pub type TokenId = u32;
/// One sentence of a block as vocabulary ids.
/// Example: `[7592, 2088, 1012]`
pub type Sentence = Vec<TokenId>;
/// Pad/loss mask entry (`1` real, `0` padding).
pub type MaskValue = u8;
/// Masked-LM label entry; `-1` marks positions that carry no prediction target.
pub type LabelId = i64;
/// Per-token auxiliary side-channel value; non-zero marks a salient token.
/// Example: `1` for a token inside a named-entity span
pub type AuxValue = u32;
/// Surface form of a vocabulary entry.
/// Examples: `hello`, `##ing`, `[SEP]`
pub type TokenText = String;
