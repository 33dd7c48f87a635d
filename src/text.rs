//! Reconstruct readable text from token ids, with optional escaping of
//! search-syntax reserved characters for use as a retrieval query.

use crate::constants::masking::CONTINUATION_PREFIX;
use crate::constants::text::{ESCAPE_CHAR, MIN_QUERY_CHARS, RESERVED_CHARS, SHORT_QUERY_PLACEHOLDER};
use crate::errors::SampleError;
use crate::tokenizer::Tokenizer;
use crate::types::TokenId;

/// Join WordPiece surface tokens into text.
///
/// `##` pieces are glued onto the preceding piece; every other piece is
/// prefixed with a space, including the first, so non-empty output always
/// starts with one.
pub fn join_wordpieces<S: AsRef<str>>(pieces: &[S]) -> String {
    let mut text = String::new();
    for piece in pieces {
        let piece = piece.as_ref();
        match piece.strip_prefix(CONTINUATION_PREFIX) {
            Some(rest) => text.push_str(rest),
            None => {
                text.push(' ');
                text.push_str(piece);
            }
        }
    }
    text
}

/// Strip existing backslashes, then escape every reserved character once.
///
/// Idempotent: escaping already-escaped text yields the same string.
pub fn escape_reserved(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars().filter(|ch| *ch != ESCAPE_CHAR) {
        if RESERVED_CHARS.contains(&ch) {
            escaped.push(ESCAPE_CHAR);
        }
        escaped.push(ch);
    }
    escaped
}

/// Decode ids back to text.
///
/// `[PAD]` and `[CLS]` are always dropped. `strict` also drops `[SEP]`,
/// escapes reserved characters, and pads results shorter than three
/// characters (counting the leading space) with a fixed placeholder.
pub fn decode_tokens(tokenizer: &dyn Tokenizer, ids: &[TokenId], strict: bool) -> String {
    let special = tokenizer.special_ids();
    let kept: Vec<TokenId> = ids
        .iter()
        .copied()
        .filter(|id| *id != special.pad && *id != special.cls)
        .filter(|id| !strict || *id != special.sep)
        .collect();
    let joined = join_wordpieces(&tokenizer.convert_ids_to_tokens(&kept));
    if !strict {
        return joined;
    }

    let mut escaped = escape_reserved(&joined);
    if escaped.chars().count() < MIN_QUERY_CHARS {
        escaped.push_str(SHORT_QUERY_PLACEHOLDER);
    }
    escaped
}

/// Tokenize text with the injected tokenizer.
pub fn encode_text(tokenizer: &dyn Tokenizer, text: &str) -> Result<Vec<TokenId>, SampleError> {
    tokenizer.tokenize(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::WordPieceVocab;

    fn vocab() -> WordPieceVocab {
        WordPieceVocab::from_tokens(
            [
                "[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]", "the", "run", "##ning", "(", ")",
                "fox", "?", "a", "ab",
            ],
            true,
        )
        .unwrap()
    }

    #[test]
    fn joins_words_with_a_leading_space_and_glues_continuations() {
        assert_eq!(join_wordpieces(&["the", "run", "##ning", "fox"]), " the running fox");
        assert_eq!(join_wordpieces::<&str>(&[]), "");
        assert_eq!(join_wordpieces(&["##s", "a"]), "s a");
    }

    #[test]
    fn escapes_reserved_characters_once() {
        assert_eq!(escape_reserved("f(x)"), r"f\(x\)");
        assert_eq!(escape_reserved(r"f\(x\)"), r"f\(x\)");
        assert_eq!(escape_reserved(&escape_reserved("a+b:c/d")), r"a\+b\:c\/d");
        assert_eq!(escape_reserved(r"back\slash"), "backslash");
    }

    #[test]
    fn lenient_decode_keeps_separators() {
        let vocab = vocab();
        let ids = vocab.tokenize("the running fox").unwrap();
        let mut framed = vec![2];
        framed.extend(&ids);
        framed.extend([3, 0, 0]);
        assert_eq!(decode_tokens(&vocab, &framed, false), " the running fox [SEP]");
    }

    #[test]
    fn strict_decode_escapes_and_drops_separators() {
        let vocab = vocab();
        let mut framed = vec![2];
        framed.extend(vocab.tokenize("(the fox?)").unwrap());
        framed.extend([3, 0]);
        assert_eq!(decode_tokens(&vocab, &framed, true), r" \( the fox \? \)");
    }

    #[test]
    fn strict_decode_pads_short_queries() {
        let vocab = vocab();
        assert_eq!(decode_tokens(&vocab, &[2, 3, 0, 0], true), "text here");
        assert_eq!(decode_tokens(&vocab, &[2, 12, 3], true), " atext here");
        // " ab" is three characters once the leading space counts
        assert_eq!(decode_tokens(&vocab, &[2, 13, 3], true), " ab");
        assert_eq!(decode_tokens(&vocab, &[2, 5, 3], true), " the");
    }

    #[test]
    fn encode_is_a_tokenizer_passthrough() {
        let vocab = vocab();
        assert_eq!(encode_text(&vocab, "The fox").unwrap(), vec![5, 10]);
    }
}
