use std::sync::Arc;

use realm_samples::{
    AlternateCase, AuxiliaryMask, BlockAssembler, BlockWindow, DatasetConfig, InMemoryCorpus,
    RealmDataset, SampleDataset, SampleError, SampleMapping, Tokenizer, TokenId, WordPieceVocab,
};

// "the ab cd" / "running" in a lowercase vocabulary that splits "abcd" into two whole pieces
fn primary_vocab() -> Arc<dyn Tokenizer> {
    Arc::new(
        WordPieceVocab::from_tokens(
            ["[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]", "the", "ab", "cd", "run", "##ning"],
            true,
        )
        .unwrap(),
    )
}

fn cased_vocab() -> Arc<dyn Tokenizer> {
    Arc::new(
        WordPieceVocab::from_tokens(
            ["[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]", "The", "Run", "##ning", "AbCd"],
            false,
        )
        .unwrap(),
    )
}

fn primary_sentences() -> Vec<Vec<TokenId>> {
    vec![vec![5, 6, 7], vec![8, 9]]
}

fn base_assembler() -> BlockAssembler {
    BlockAssembler::new(
        Arc::new(InMemoryCorpus::new("blocks", primary_sentences())),
        Arc::new(InMemoryCorpus::<TokenId>::new("titles", vec![vec![5]])),
    )
}

fn mapping(rows: usize) -> SampleMapping {
    SampleMapping::from_windows(
        (0..rows)
            .map(|block_idx| BlockWindow {
                start_idx: 0,
                end_idx: 2,
                doc_idx: 0,
                block_idx,
            })
            .collect(),
    )
    .unwrap()
}

fn config(masked_lm_prob: f64) -> DatasetConfig {
    DatasetConfig {
        max_seq_length: 10,
        masked_lm_prob,
        ..DatasetConfig::default()
    }
}

fn alternate(sentences: Vec<Vec<TokenId>>) -> AlternateCase {
    AlternateCase::Enabled {
        store: Arc::new(InMemoryCorpus::new("alternate", sentences)),
        tokenizer: cased_vocab(),
    }
}

#[test]
fn alternate_case_words_are_masked_whole() {
    let assembler = base_assembler()
        .with_alternate_case(alternate(vec![vec![5, 8], vec![6, 7]]))
        .unwrap();
    let dataset = RealmDataset::new(&config(0.3), primary_vocab(), mapping(40), assembler).unwrap();
    let mut ab_cd_masked = 0;
    for index in 0..dataset.len() {
        let sample = dataset.get(index).unwrap();
        // framed: [CLS] the ab cd run ##ning [SEP]
        assert_eq!(sample.loss_mask[2], sample.loss_mask[3], "row {index}");
        assert_eq!(sample.loss_mask[4], sample.loss_mask[5], "row {index}");
        ab_cd_masked += usize::from(sample.loss_mask[2] == 1);
    }
    assert!(ab_cd_masked > 0);
}

#[test]
fn salient_auxiliary_span_is_masked_first() {
    let aux = InMemoryCorpus::<u32>::new("aux", vec![vec![0, 0, 0], vec![1, 1]]);
    let assembler = base_assembler()
        .with_auxiliary_mask(AuxiliaryMask::Enabled(Arc::new(aux)))
        .unwrap();
    // budget min(floor(0.3 * 10), round(5 * 0.3)) = 2 covers exactly "run ##ning"
    let dataset = RealmDataset::new(&config(0.3), primary_vocab(), mapping(25), assembler).unwrap();
    for index in 0..dataset.len() {
        let sample = dataset.get(index).unwrap();
        assert_eq!(sample.masked_positions(), vec![4, 5], "row {index}");
        assert_eq!(sample.labels[4], 8);
        assert_eq!(sample.labels[5], 9);
    }
}

#[test]
fn side_channel_store_lengths_are_checked_on_attach() {
    let err = base_assembler()
        .with_alternate_case(alternate(vec![vec![5, 8]]))
        .unwrap_err();
    assert!(matches!(err, SampleError::StreamMisaligned { stream: "alternate-case", .. }));

    let aux = InMemoryCorpus::<u32>::new("aux", vec![vec![0, 0, 0], vec![1, 1], vec![0]]);
    let err = base_assembler()
        .with_auxiliary_mask(AuxiliaryMask::Enabled(Arc::new(aux)))
        .unwrap_err();
    assert!(matches!(err, SampleError::StreamMisaligned { stream: "auxiliary", .. }));
}

#[test]
fn token_level_misalignment_fails_the_row() {
    let aux = InMemoryCorpus::<u32>::new("aux", vec![vec![0, 0], vec![1, 1]]);
    let assembler = base_assembler()
        .with_auxiliary_mask(AuxiliaryMask::Enabled(Arc::new(aux)))
        .unwrap();
    let dataset = RealmDataset::new(&config(0.3), primary_vocab(), mapping(1), assembler).unwrap();
    assert!(matches!(
        dataset.get(0),
        Err(SampleError::StreamMisaligned { stream: "auxiliary", .. })
    ));

    // "The" alone cannot cover "the ab cd"
    let assembler = base_assembler()
        .with_alternate_case(alternate(vec![vec![5], vec![6, 7]]))
        .unwrap();
    let dataset = RealmDataset::new(&config(0.3), primary_vocab(), mapping(1), assembler).unwrap();
    assert!(matches!(
        dataset.get(0),
        Err(SampleError::StreamMisaligned { stream: "alternate-case", .. })
    ));
}
