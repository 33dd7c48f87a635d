//! Block assembly: materializes a mapping window into per-sentence token
//! sequences plus whichever side channels are attached.

use std::fmt;
use std::sync::Arc;

use crate::corpus::{AlternateCase, AuxiliaryMask, SequenceStore};
use crate::errors::SampleError;
use crate::mapping::BlockWindow;
use crate::tokenizer::Tokenizer;
use crate::types::{AuxValue, Sentence};

/// Auxiliary values for an assembled block, one vector per sentence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum AuxiliaryTokens {
    /// No auxiliary channel attached.
    #[default]
    None,
    /// Token-count aligned with the primary sentences.
    Values(Vec<Vec<AuxValue>>),
}

/// Alternate-case tokens for an assembled block, one sequence per sentence.
#[derive(Clone, Default)]
pub enum AlternateTokens {
    /// No alternate-case channel attached.
    #[default]
    None,
    /// Sentence-count aligned with the primary sentences; token counts may differ.
    Tokens {
        sentences: Vec<Sentence>,
        tokenizer: Arc<dyn Tokenizer>,
    },
}

impl fmt::Debug for AlternateTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Tokens { sentences, .. } => f
                .debug_struct("Tokens")
                .field("sentences", sentences)
                .finish_non_exhaustive(),
        }
    }
}

/// A block materialized from the corpus.
#[derive(Clone, Debug)]
pub struct AssembledBlock {
    /// Mapping row the block was read for.
    pub window: BlockWindow,
    /// Primary sentences in corpus order.
    pub sentences: Vec<Sentence>,
    /// Auxiliary values, when the assembler has a mask store attached.
    pub aux: AuxiliaryTokens,
    /// Alternate-case sentences, when the assembler has an alternate store attached.
    pub alt: AlternateTokens,
}

impl AssembledBlock {
    /// Build a block directly from sentences with no side channels.
    pub fn from_sentences(window: BlockWindow, sentences: Vec<Sentence>) -> Self {
        Self {
            window,
            sentences,
            aux: AuxiliaryTokens::None,
            alt: AlternateTokens::None,
        }
    }

    /// Fail unless the block holds more than one sentence.
    pub fn require_multi_sentence(&self) -> Result<(), SampleError> {
        if self.sentences.len() > 1 {
            return Ok(());
        }
        Err(SampleError::BlockTooShort {
            start_idx: self.window.start_idx,
            end_idx: self.window.end_idx,
            sentences: self.sentences.len(),
        })
    }

    /// Attach auxiliary values after checking they line up token-for-token.
    pub fn with_aux(mut self, values: Vec<Vec<AuxValue>>) -> Result<Self, SampleError> {
        check_aux_alignment(&self.sentences, &values)?;
        self.aux = AuxiliaryTokens::Values(values);
        Ok(self)
    }

    /// Attach alternate-case sentences after checking they line up sentence-for-sentence.
    pub fn with_alt(
        mut self,
        sentences: Vec<Sentence>,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Result<Self, SampleError> {
        if sentences.len() != self.sentences.len() {
            return Err(SampleError::StreamMisaligned {
                stream: "alternate-case",
                details: format!(
                    "{} sentences against {} primary sentences",
                    sentences.len(),
                    self.sentences.len()
                ),
            });
        }
        self.alt = AlternateTokens::Tokens {
            sentences,
            tokenizer,
        };
        Ok(self)
    }
}

fn check_aux_alignment(
    sentences: &[Sentence],
    values: &[Vec<AuxValue>],
) -> Result<(), SampleError> {
    if values.len() != sentences.len() {
        return Err(SampleError::StreamMisaligned {
            stream: "auxiliary",
            details: format!(
                "{} sentences against {} primary sentences",
                values.len(),
                sentences.len()
            ),
        });
    }
    for (idx, (sentence, aux)) in sentences.iter().zip(values).enumerate() {
        if sentence.len() != aux.len() {
            return Err(SampleError::StreamMisaligned {
                stream: "auxiliary",
                details: format!(
                    "sentence {idx} has {} tokens but {} auxiliary values",
                    sentence.len(),
                    aux.len()
                ),
            });
        }
    }
    Ok(())
}

/// Reads block windows and titles out of the corpus stores.
#[derive(Clone)]
pub struct BlockAssembler {
    blocks: Arc<dyn SequenceStore>,
    titles: Arc<dyn SequenceStore>,
    aux: AuxiliaryMask,
    alt: AlternateCase,
}

impl fmt::Debug for BlockAssembler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockAssembler")
            .field("blocks", &self.blocks.len())
            .field("titles", &self.titles.len())
            .field("aux", &self.aux.is_enabled())
            .field("alt", &self.alt.is_enabled())
            .finish()
    }
}

impl BlockAssembler {
    /// Assembler over a block store and a title store, with no side channels.
    pub fn new(blocks: Arc<dyn SequenceStore>, titles: Arc<dyn SequenceStore>) -> Self {
        Self {
            blocks,
            titles,
            aux: AuxiliaryMask::Disabled,
            alt: AlternateCase::Disabled,
        }
    }

    /// Attach an auxiliary mask store; it must index the same sentences as the block store.
    pub fn with_auxiliary_mask(mut self, aux: AuxiliaryMask) -> Result<Self, SampleError> {
        if let AuxiliaryMask::Enabled(store) = &aux {
            self.check_parallel_len("auxiliary", store.len())?;
        }
        self.aux = aux;
        Ok(self)
    }

    /// Attach an alternate-case store; it must index the same sentences as the block store.
    pub fn with_alternate_case(mut self, alt: AlternateCase) -> Result<Self, SampleError> {
        if let AlternateCase::Enabled { store, .. } = &alt {
            self.check_parallel_len("alternate-case", store.len())?;
        }
        self.alt = alt;
        Ok(self)
    }

    fn check_parallel_len(&self, stream: &'static str, len: usize) -> Result<(), SampleError> {
        if len == self.blocks.len() {
            return Ok(());
        }
        Err(SampleError::StreamMisaligned {
            stream,
            details: format!(
                "store holds {len} sentences, block store holds {}",
                self.blocks.len()
            ),
        })
    }

    /// Primary sentence store.
    pub fn block_store(&self) -> &dyn SequenceStore {
        self.blocks.as_ref()
    }

    /// Title store, indexed by document.
    pub fn title_store(&self) -> &dyn SequenceStore {
        self.titles.as_ref()
    }

    /// Attached auxiliary mask channel.
    pub fn auxiliary_mask(&self) -> &AuxiliaryMask {
        &self.aux
    }

    /// Attached alternate-case channel.
    pub fn alternate_case(&self) -> &AlternateCase {
        &self.alt
    }

    /// Primary sentences `[start_idx, end_idx)`.
    pub fn sentences(
        &self,
        start_idx: usize,
        end_idx: usize,
    ) -> Result<Vec<Sentence>, SampleError> {
        self.blocks.range(start_idx, end_idx)
    }

    /// Title tokens of `doc_idx`.
    pub fn title(&self, doc_idx: usize) -> Result<Sentence, SampleError> {
        self.titles.get(doc_idx)
    }

    /// Primary sentences only; side channels are not read.
    pub fn assemble_primary(&self, window: BlockWindow) -> Result<AssembledBlock, SampleError> {
        let sentences = self.sentences(window.start_idx, window.end_idx)?;
        Ok(AssembledBlock::from_sentences(window, sentences))
    }

    /// Primary sentences plus every attached side channel, alignment-checked.
    pub fn assemble(&self, window: BlockWindow) -> Result<AssembledBlock, SampleError> {
        let mut block = self.assemble_primary(window)?;
        if let AuxiliaryMask::Enabled(store) = &self.aux {
            let values = store.range(window.start_idx, window.end_idx)?;
            block = block.with_aux(values)?;
        }
        if let AlternateCase::Enabled { store, tokenizer } = &self.alt {
            let sentences = store.range(window.start_idx, window.end_idx)?;
            block = block.with_alt(sentences, Arc::clone(tokenizer))?;
        }
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::InMemoryCorpus;
    use crate::tokenizer::WordPieceVocab;

    fn window(start_idx: usize, end_idx: usize) -> BlockWindow {
        BlockWindow {
            start_idx,
            end_idx,
            doc_idx: 0,
            block_idx: 9,
        }
    }

    fn assembler() -> BlockAssembler {
        let blocks =
            InMemoryCorpus::<u32>::new("blocks", vec![vec![7, 8], vec![9, 10, 11], vec![12]]);
        let titles = InMemoryCorpus::<u32>::new("titles", vec![vec![5]]);
        BlockAssembler::new(Arc::new(blocks), Arc::new(titles))
    }

    fn cased_vocab() -> Arc<dyn Tokenizer> {
        Arc::new(
            WordPieceVocab::from_tokens(["[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]"], false)
                .unwrap(),
        )
    }

    #[test]
    fn assembles_primary_window() {
        let block = assembler().assemble(window(0, 2)).unwrap();
        assert_eq!(block.sentences, vec![vec![7, 8], vec![9, 10, 11]]);
        assert_eq!(block.aux, AuxiliaryTokens::None);
        assert!(matches!(block.alt, AlternateTokens::None));
        assert!(block.require_multi_sentence().is_ok());
    }

    #[test]
    fn single_sentence_block_fails_precondition() {
        let block = assembler().assemble(window(2, 3)).unwrap();
        assert!(matches!(
            block.require_multi_sentence(),
            Err(SampleError::BlockTooShort {
                start_idx: 2,
                end_idx: 3,
                sentences: 1
            })
        ));
    }

    #[test]
    fn window_past_corpus_end_is_a_corpus_error() {
        let err = assembler().assemble(window(1, 5)).unwrap_err();
        assert!(matches!(err, SampleError::CorpusIndex { store: "blocks", .. }));
    }

    #[test]
    fn aux_values_are_read_in_parallel() {
        let aux = InMemoryCorpus::<u32>::new("aux", vec![vec![0, 1], vec![0, 0, 1], vec![0]]);
        let assembler = assembler()
            .with_auxiliary_mask(AuxiliaryMask::Enabled(Arc::new(aux)))
            .unwrap();
        let block = assembler.assemble(window(0, 2)).unwrap();
        assert_eq!(
            block.aux,
            AuxiliaryTokens::Values(vec![vec![0, 1], vec![0, 0, 1]])
        );
    }

    #[test]
    fn aux_token_count_mismatch_fails_fast() {
        let aux = InMemoryCorpus::<u32>::new("aux", vec![vec![0, 1], vec![0, 1], vec![0]]);
        let assembler = assembler()
            .with_auxiliary_mask(AuxiliaryMask::Enabled(Arc::new(aux)))
            .unwrap();
        let err = assembler.assemble(window(0, 2)).unwrap_err();
        assert!(matches!(
            err,
            SampleError::StreamMisaligned {
                stream: "auxiliary",
                ..
            }
        ));
    }

    #[test]
    fn parallel_store_length_mismatch_fails_at_attach() {
        let aux = InMemoryCorpus::<u32>::new("aux", vec![vec![0, 1]]);
        let err = assembler()
            .with_auxiliary_mask(AuxiliaryMask::Enabled(Arc::new(aux)))
            .unwrap_err();
        assert!(matches!(err, SampleError::StreamMisaligned { .. }));

        let alt = InMemoryCorpus::<u32>::new("alt", vec![vec![1]]);
        let err = assembler()
            .with_alternate_case(AlternateCase::Enabled {
                store: Arc::new(alt),
                tokenizer: cased_vocab(),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            SampleError::StreamMisaligned {
                stream: "alternate-case",
                ..
            }
        ));
    }

    #[test]
    fn alt_sentences_may_differ_in_token_count() {
        let alt = InMemoryCorpus::<u32>::new("alt", vec![vec![1, 1, 1], vec![2], vec![3]]);
        let assembler = assembler()
            .with_alternate_case(AlternateCase::Enabled {
                store: Arc::new(alt),
                tokenizer: cased_vocab(),
            })
            .unwrap();
        let block = assembler.assemble(window(0, 2)).unwrap();
        match block.alt {
            AlternateTokens::Tokens { sentences, .. } => {
                assert_eq!(sentences, vec![vec![1, 1, 1], vec![2]]);
            }
            AlternateTokens::None => panic!("alternate stream should be attached"),
        }
    }

    #[test]
    fn titles_are_looked_up_by_document() {
        assert_eq!(assembler().title(0).unwrap(), vec![5]);
        assert!(assembler().title(1).is_err());
    }
}
