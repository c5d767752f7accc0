use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::prelude::*;

#[inline]
/// Try reading training config from the given file.
///
/// Missing sections and fields keep their default values.
pub fn load(path: impl AsRef<Path>) -> anyhow::Result<TrainingConfig> {
    let config = std::fs::read_to_string(path)?;

    Ok(toml::from_str::<TrainingConfig>(&config)?)
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub tokenizer: TokenizerConfig,
    pub training: TrainParams
}

impl TrainingConfig {
    /// Validate config before any training starts.
    #[inline]
    pub fn validate(&self) -> anyhow::Result<()> {
        self.training.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Convert content of the corpus to lowercase.
    pub lowercase: bool,

    /// Strip punctuation from the corpus.
    pub strip_punctuation: bool
}

impl Default for TokenizerConfig {
    #[inline]
    fn default() -> Self {
        Self {
            lowercase: true,
            strip_punctuation: true
        }
    }
}

impl TokenizerConfig {
    #[inline]
    pub fn parser(&self) -> CorpusParser {
        CorpusParser::new(self.lowercase, self.strip_punctuation)
    }
}

#[test]
fn test_config_parsing() -> anyhow::Result<()> {
    let config = toml::from_str::<TrainingConfig>("
        [tokenizer]
        lowercase = false

        [training]
        embedding_size = 16
        context_radius = 2
        epochs = 25
        learn_rate = 0.05
        negative_samples = 7
        batch_size = 64
        seed = 42
    ")?;

    assert!(!config.tokenizer.lowercase);
    assert!(config.tokenizer.strip_punctuation);

    assert_eq!(config.training.embedding_size, 16);
    assert_eq!(config.training.context_radius, 2);
    assert_eq!(config.training.epochs, 25);
    assert_eq!(config.training.learn_rate, 0.05);
    assert_eq!(config.training.negative_samples, 7);
    assert_eq!(config.training.batch_size, 64);
    assert_eq!(config.training.seed, Some(42));

    assert!(config.validate().is_ok());

    Ok(())
}

#[test]
fn test_config_defaults() -> anyhow::Result<()> {
    let config = toml::from_str::<TrainingConfig>("")?;

    assert_eq!(config, TrainingConfig::default());

    let config = toml::from_str::<TrainingConfig>("
        [training]
        epochs = 3
    ")?;

    assert_eq!(config.training.epochs, 3);
    assert_eq!(config.training.embedding_size, EMBEDDING_DEFAULT_SIZE);
    assert_eq!(config.training.seed, None);

    Ok(())
}

#[test]
fn test_config_validation() -> anyhow::Result<()> {
    let config = toml::from_str::<TrainingConfig>("
        [training]
        context_radius = 0
    ")?;

    assert!(config.validate().is_err());

    let config = toml::from_str::<TrainingConfig>("
        [training]
        learn_rate = -0.5
    ")?;

    assert!(config.validate().is_err());

    Ok(())
}
