use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::config::{
    DEFAULT_MASKED_LM_PROB, DEFAULT_MAX_SEQ_LENGTH, DEFAULT_QUERY_IN_BLOCK_PROB, DEFAULT_SEED,
    DEFAULT_SHORT_SEQ_PROB, MIN_MAX_SEQ_LENGTH,
};
use crate::constants::masking::{DEFAULT_MASK_TOKEN_PROB, DEFAULT_RANDOM_TOKEN_PROB};
use crate::errors::SampleError;
use crate::mapping::MappingRequest;

/// Noising applied to positions selected for masked-LM prediction.
///
/// The remaining share (`1 - mask_token_prob - random_token_prob`) keeps the
/// original token.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskingPolicy {
    /// Share of selected positions replaced with `[MASK]`.
    pub mask_token_prob: f64,
    /// Share of selected positions replaced with a random non-special vocabulary id.
    pub random_token_prob: f64,
}

impl Default for MaskingPolicy {
    fn default() -> Self {
        Self {
            mask_token_prob: DEFAULT_MASK_TOKEN_PROB,
            random_token_prob: DEFAULT_RANDOM_TOKEN_PROB,
        }
    }
}

/// Top-level dataset configuration shared by the masked-LM and inverse-cloze datasets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Dataset name (used in logs and forwarded to the mapping builder).
    pub name: String,
    /// Corpus path prefix forwarded to the mapping builder.
    pub data_prefix: String,
    /// Global seed; every sample's RNG derives from `(seed, index)`.
    pub seed: u64,
    /// Fixed length of every framed array.
    pub max_seq_length: usize,
    /// Target fraction of framed positions selected for masked-LM prediction.
    pub masked_lm_prob: f64,
    /// Probability of short windows; only meaningful to the mapping builder.
    pub short_seq_prob: f64,
    /// Probability that the inverse-cloze query stays inside its block.
    pub query_in_block_prob: f64,
    /// Prefix inverse-cloze blocks with their document title.
    pub use_titles: bool,
    /// Passes over the corpus requested from the mapping builder.
    pub num_epochs: Option<u64>,
    /// Row count requested from the mapping builder.
    pub max_num_samples: Option<u64>,
    /// Noising policy for masked positions.
    pub masking: MaskingPolicy,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            name: "train".to_string(),
            data_prefix: String::new(),
            seed: DEFAULT_SEED,
            max_seq_length: DEFAULT_MAX_SEQ_LENGTH,
            masked_lm_prob: DEFAULT_MASKED_LM_PROB,
            short_seq_prob: DEFAULT_SHORT_SEQ_PROB,
            query_in_block_prob: DEFAULT_QUERY_IN_BLOCK_PROB,
            use_titles: true,
            num_epochs: None,
            max_num_samples: None,
            masking: MaskingPolicy::default(),
        }
    }
}

impl DatasetConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, SampleError> {
        let config: Self = serde_json::from_str(raw).map_err(|err| {
            SampleError::Configuration(format!("invalid dataset config JSON: {err}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, SampleError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Reject values no sample could be built with.
    pub fn validate(&self) -> Result<(), SampleError> {
        if self.max_seq_length < MIN_MAX_SEQ_LENGTH {
            return Err(SampleError::Configuration(format!(
                "max_seq_length must be at least {MIN_MAX_SEQ_LENGTH}, got {}",
                self.max_seq_length
            )));
        }
        for (field, value) in [
            ("masked_lm_prob", self.masked_lm_prob),
            ("short_seq_prob", self.short_seq_prob),
            ("query_in_block_prob", self.query_in_block_prob),
            ("masking.mask_token_prob", self.masking.mask_token_prob),
            ("masking.random_token_prob", self.masking.random_token_prob),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SampleError::Configuration(format!(
                    "{field} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.masking.mask_token_prob + self.masking.random_token_prob > 1.0 {
            return Err(SampleError::Configuration(
                "masking.mask_token_prob + masking.random_token_prob must not exceed 1".into(),
            ));
        }
        if self.num_epochs.is_none() && self.max_num_samples.is_none() {
            tracing::debug!(
                "[realm:config] '{}' sets neither num_epochs nor max_num_samples",
                self.name
            );
        }
        Ok(())
    }

    /// Parameters for an external mapping builder.
    pub fn mapping_request(&self) -> MappingRequest {
        MappingRequest {
            data_prefix: self.data_prefix.clone(),
            num_epochs: self.num_epochs,
            max_num_samples: self.max_num_samples,
            max_seq_length: self.max_seq_length,
            short_seq_prob: self.short_seq_prob,
            seed: self.seed,
            name: self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_are_valid() {
        let config = DatasetConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.masking.mask_token_prob, 0.8);
        assert!(config.use_titles);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = DatasetConfig::from_json_str(
            r#"{"name": "ict", "max_seq_length": 64, "masking": {"random_token_prob": 0.05}}"#,
        )
        .unwrap();
        assert_eq!(config.name, "ict");
        assert_eq!(config.max_seq_length, 64);
        assert_eq!(config.seed, DEFAULT_SEED);
        assert_eq!(config.masking.mask_token_prob, DEFAULT_MASK_TOKEN_PROB);
        assert_eq!(config.masking.random_token_prob, 0.05);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let short = DatasetConfig {
            max_seq_length: 2,
            ..DatasetConfig::default()
        };
        assert!(matches!(short.validate(), Err(SampleError::Configuration(_))));

        let prob = DatasetConfig {
            query_in_block_prob: 1.5,
            ..DatasetConfig::default()
        };
        assert!(matches!(
            prob.validate(),
            Err(SampleError::Configuration(msg)) if msg.contains("query_in_block_prob")
        ));

        let policy = DatasetConfig {
            masking: MaskingPolicy {
                mask_token_prob: 0.9,
                random_token_prob: 0.2,
            },
            ..DatasetConfig::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_configuration_error() {
        let err = DatasetConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, SampleError::Configuration(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"seed": 7, "use_titles": false}}"#).unwrap();
        let config = DatasetConfig::from_json_path(file.path()).unwrap();
        assert_eq!(config.seed, 7);
        assert!(!config.use_titles);
    }

    #[test]
    fn mapping_request_mirrors_config() {
        let config = DatasetConfig {
            name: "blocks".into(),
            num_epochs: Some(3),
            ..DatasetConfig::default()
        };
        let request = config.mapping_request();
        assert_eq!(request.name, "blocks");
        assert_eq!(request.num_epochs, Some(3));
        assert_eq!(request.max_seq_length, DEFAULT_MAX_SEQ_LENGTH);
    }
}
