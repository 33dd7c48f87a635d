//! Index-addressable dataset front-ends.
//!
//! Each dataset pairs an immutable [`SampleMapping`] with a [`BlockAssembler`]
//! and turns row `index` into one sample. The RNG for a row is derived from
//! `(seed, index)` alone, so rows can be fetched in any order, from any
//! thread, and always come back identical.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::assembler::BlockAssembler;
use crate::cloze::QueryBlockSplitter;
use crate::config::DatasetConfig;
use crate::data::{FramedSequence, IctSample, MaskedLmSample};
use crate::errors::SampleError;
use crate::mapping::{MappingBuilder, SampleMapping};
use crate::masking::MaskedSampleBuilder;
use crate::rng::deterministic_rng;
use crate::text;
use crate::tokenizer::Tokenizer;
use crate::types::TokenId;

/// Random-access dataset contract.
pub trait SampleDataset: Send + Sync {
    /// Record produced for one mapping row.
    type Sample;

    /// Number of rows in the mapping.
    fn len(&self) -> usize;

    /// Build the sample for row `index`.
    fn get(&self, index: usize) -> Result<Self::Sample, SampleError>;

    /// True when the mapping has no rows.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Masked-LM dataset over multi-sentence blocks.
#[derive(Clone)]
pub struct RealmDataset {
    name: String,
    seed: u64,
    mapping: SampleMapping,
    assembler: BlockAssembler,
    builder: MaskedSampleBuilder,
}

impl fmt::Debug for RealmDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealmDataset")
            .field("name", &self.name)
            .field("seed", &self.seed)
            .field("rows", &self.mapping.len())
            .field("assembler", &self.assembler)
            .finish_non_exhaustive()
    }
}

impl RealmDataset {
    /// Create a dataset over a prebuilt mapping.
    pub fn new(
        config: &DatasetConfig,
        tokenizer: Arc<dyn Tokenizer>,
        mapping: SampleMapping,
        assembler: BlockAssembler,
    ) -> Result<Self, SampleError> {
        config.validate()?;
        let builder = MaskedSampleBuilder::new(
            tokenizer,
            config.max_seq_length,
            config.masked_lm_prob,
            config.masking,
        );
        info!(
            "[realm:mlm] dataset '{}' ready (rows={}, max_seq={}, aux_mask={}, alt_case={})",
            config.name,
            mapping.len(),
            config.max_seq_length,
            assembler.auxiliary_mask().is_enabled(),
            assembler.alternate_case().is_enabled()
        );
        Ok(Self {
            name: config.name.clone(),
            seed: config.seed,
            mapping,
            assembler,
            builder,
        })
    }

    /// Create a dataset whose mapping comes from `mapping_builder`.
    pub fn with_mapping_builder(
        config: &DatasetConfig,
        tokenizer: Arc<dyn Tokenizer>,
        assembler: BlockAssembler,
        mapping_builder: &dyn MappingBuilder,
    ) -> Result<Self, SampleError> {
        let mapping = build_mapping(config, &assembler, mapping_builder)?;
        Self::new(config, tokenizer, mapping, assembler)
    }

    /// Dataset name from the config.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rows this dataset serves.
    pub fn mapping(&self) -> &SampleMapping {
        &self.mapping
    }
}

impl SampleDataset for RealmDataset {
    type Sample = MaskedLmSample;

    fn len(&self) -> usize {
        self.mapping.len()
    }

    fn get(&self, index: usize) -> Result<MaskedLmSample, SampleError> {
        let window = self.mapping.get(index)?;
        let block = self.assembler.assemble(window)?;
        let mut rng = deterministic_rng(self.seed, index as u64);
        let sample = self.builder.build(&block, &mut rng)?;
        debug!(
            "[realm:mlm] sample {} from block {} [{}, {}) masked={}",
            index,
            window.block_idx,
            window.start_idx,
            window.end_idx,
            sample.masked_positions().len()
        );
        Ok(sample)
    }
}

/// Inverse-cloze dataset producing query/block pairs, plus evidence-block
/// access for building a retrieval index.
#[derive(Clone)]
pub struct IctDataset {
    name: String,
    seed: u64,
    use_titles: bool,
    mapping: SampleMapping,
    assembler: BlockAssembler,
    splitter: QueryBlockSplitter,
    tokenizer: Arc<dyn Tokenizer>,
}

impl fmt::Debug for IctDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IctDataset")
            .field("name", &self.name)
            .field("seed", &self.seed)
            .field("use_titles", &self.use_titles)
            .field("rows", &self.mapping.len())
            .field("splitter", &self.splitter)
            .finish_non_exhaustive()
    }
}

impl IctDataset {
    /// Create a dataset over a prebuilt mapping.
    pub fn new(
        config: &DatasetConfig,
        tokenizer: Arc<dyn Tokenizer>,
        mapping: SampleMapping,
        assembler: BlockAssembler,
    ) -> Result<Self, SampleError> {
        config.validate()?;
        let splitter = QueryBlockSplitter::new(
            tokenizer.special_ids(),
            config.max_seq_length,
            config.query_in_block_prob,
        );
        info!(
            "[realm:ict] dataset '{}' ready (rows={}, max_seq={}, titles={}, keep_query_prob={})",
            config.name,
            mapping.len(),
            config.max_seq_length,
            config.use_titles,
            config.query_in_block_prob
        );
        Ok(Self {
            name: config.name.clone(),
            seed: config.seed,
            use_titles: config.use_titles,
            mapping,
            assembler,
            splitter,
            tokenizer,
        })
    }

    /// Create a dataset whose mapping comes from `mapping_builder`.
    pub fn with_mapping_builder(
        config: &DatasetConfig,
        tokenizer: Arc<dyn Tokenizer>,
        assembler: BlockAssembler,
        mapping_builder: &dyn MappingBuilder,
    ) -> Result<Self, SampleError> {
        let mapping = build_mapping(config, &assembler, mapping_builder)?;
        Self::new(config, tokenizer, mapping, assembler)
    }

    /// Dataset name from the config.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rows this dataset serves.
    pub fn mapping(&self) -> &SampleMapping {
        &self.mapping
    }

    /// Framed evidence block for sentences `[start_idx, end_idx)` of `doc_idx`.
    ///
    /// Always title-prefixed, regardless of `use_titles`.
    pub fn get_block(
        &self,
        start_idx: usize,
        end_idx: usize,
        doc_idx: usize,
    ) -> Result<FramedSequence, SampleError> {
        let sentences = self.assembler.sentences(start_idx, end_idx)?;
        let title = self.title(doc_idx)?;
        self.splitter.frame_context(&sentences, Some(&title))
    }

    /// Placeholder evidence block: `[CLS] [SEP] [SEP]` followed by padding.
    pub fn get_null_block(&self) -> Result<FramedSequence, SampleError> {
        self.splitter.framer().null_block()
    }

    /// Tokenize query or evidence text.
    pub fn encode_text(&self, text: &str) -> Result<Vec<TokenId>, SampleError> {
        text::encode_text(self.tokenizer.as_ref(), text)
    }

    /// Readable text for `ids`; `strict` escapes it for use as a search query.
    pub fn decode_tokens(&self, ids: &[TokenId], strict: bool) -> String {
        text::decode_tokens(self.tokenizer.as_ref(), ids, strict)
    }

    fn title(&self, doc_idx: usize) -> Result<Vec<TokenId>, SampleError> {
        let title = self.assembler.title(doc_idx)?;
        if title.is_empty() {
            warn!(
                "[realm:ict] document {} of '{}' has an empty title",
                doc_idx, self.name
            );
        }
        Ok(title)
    }
}

impl SampleDataset for IctDataset {
    type Sample = IctSample;

    fn len(&self) -> usize {
        self.mapping.len()
    }

    fn get(&self, index: usize) -> Result<IctSample, SampleError> {
        let window = self.mapping.get(index)?;
        let block = self.assembler.assemble_primary(window)?;
        let title = if self.use_titles {
            Some(self.title(window.doc_idx)?)
        } else {
            None
        };
        let mut rng = deterministic_rng(self.seed, index as u64);
        let sample = self.splitter.split(&block, title.as_deref(), &mut rng)?;
        debug!(
            "[realm:ict] sample {} from block {} [{}, {}) doc={}",
            index, window.block_idx, window.start_idx, window.end_idx, window.doc_idx
        );
        Ok(sample)
    }
}

fn build_mapping(
    config: &DatasetConfig,
    assembler: &BlockAssembler,
    mapping_builder: &dyn MappingBuilder,
) -> Result<SampleMapping, SampleError> {
    config.validate()?;
    let request = config.mapping_request();
    mapping_builder.build(assembler.block_store(), assembler.title_store(), &request)
}
