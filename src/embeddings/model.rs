use std::path::Path;

use serde::{Serialize, Deserialize};

use rand::Rng;
use rand::rngs::StdRng;

use crate::prelude::*;

#[inline]
pub(crate) fn dot(word_1: &[f32], word_2: &[f32]) -> f32 {
    word_1.iter()
        .zip(word_2)
        .map(|(value_1, value_2)| value_1 * value_2)
        .sum()
}

#[inline]
/// Logistic sigmoid.
pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[inline]
/// Numerically stable `ln(sigmoid(x))`, computed as `-softplus(-x)`
/// so large negative scores don't overflow the exponent.
pub(crate) fn log_sigmoid(x: f32) -> f32 {
    let z = -x;

    -(z.max(0.0) + (-z.abs()).exp().ln_1p())
}

#[derive(Debug, Clone, PartialEq)]
/// Skip-gram model with negative sampling.
///
/// Two independently trained embedding tables of `words x dim` values:
/// the target table is used when a word is the prediction target, the
/// context table when it appears as a true context word or a negative
/// sample. Lookups of a trained model read the target table only.
pub struct SkipGramModel {
    dim: usize,
    target: Vec<f32>,
    context: Vec<f32>
}

impl SkipGramModel {
    /// Build new model with random weights.
    ///
    /// Both tables are filled uniformly from `[-0.5 / dim, 0.5 / dim]`
    /// so initial scores stay near zero for any embedding size.
    pub fn random(words: usize, dim: usize, rng: &mut StdRng) -> Self {
        let spread = 0.5 / dim.max(1) as f32;

        Self {
            dim,

            target: (0..words * dim)
                .map(|_| rng.gen_range(-spread..=spread))
                .collect(),

            context: (0..words * dim)
                .map(|_| rng.gen_range(-spread..=spread))
                .collect()
        }
    }

    /// Amount of words the model has embeddings for.
    #[inline]
    pub fn len(&self) -> usize {
        if self.dim == 0 {
            return 0;
        }

        self.target.len() / self.dim
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    /// Amount of dimensions in a word embedding.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    fn row(table: &[f32], dim: usize, index: usize) -> &[f32] {
        &table[index * dim..(index + 1) * dim]
    }

    #[inline]
    pub(crate) fn target_row_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.target[index * self.dim..(index + 1) * self.dim]
    }

    #[inline]
    pub(crate) fn context_row_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.context[index * self.dim..(index + 1) * self.dim]
    }

    /// Look up the vectors participating in one training sample: the
    /// target word's row of the target table, and the context word's
    /// and negative samples' rows of the context table.
    ///
    /// Lookup has no side effects and doesn't change any weights.
    pub fn forward(&self, target: usize, context: usize, negatives: &[usize]) -> (&[f32], &[f32], Vec<&[f32]>) {
        (
            Self::row(&self.target, self.dim, target),
            Self::row(&self.context, self.dim, context),

            negatives.iter()
                .map(|negative| Self::row(&self.context, self.dim, *negative))
                .collect()
        )
    }

    /// Target table embedding of the given word.
    #[inline]
    pub fn embedding_of(&self, index: usize) -> Option<&[f32]> {
        if index >= self.len() {
            return None;
        }

        Some(Self::row(&self.target, self.dim, index))
    }

    /// Negative sampling loss of a single training pair:
    ///
    /// ```text,ignore
    /// -ln(sigmoid(target . context)) - sum ln(sigmoid(-target . negative))
    /// ```
    ///
    /// The true context is pulled towards the target while negative
    /// samples are pushed away from it.
    pub fn pair_loss(&self, pair: TrainingPair, negatives: &[usize]) -> f32 {
        let (target, context, negatives) = self.forward(pair.target, pair.context, negatives);

        let mut loss = -log_sigmoid(dot(target, context));

        for negative in negatives {
            loss -= log_sigmoid(-dot(target, negative));
        }

        loss
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Snapshot of a trained model together with the vocabulary and the
/// parser flags it was trained with, stored as lz4 compressed JSON.
pub struct Checkpoint {
    pub lowercase: bool,
    pub strip_punctuation: bool,

    /// Vocabulary words in index order.
    pub words: Vec<String>,

    /// Amount of dimensions in a word embedding.
    pub dim: usize,

    /// Target embeddings table, row-major `words x dim`.
    pub target: Vec<f32>,

    /// Context embeddings table, row-major `words x dim`.
    pub context: Vec<f32>
}

impl Checkpoint {
    /// Snapshot parser flags, vocabulary and model weights.
    pub fn new(parser: &CorpusParser, vocab: &Vocabulary, model: &SkipGramModel) -> Self {
        Self {
            lowercase: parser.lowercase,
            strip_punctuation: parser.strip_punctuation,
            words: vocab.words().to_vec(),
            dim: model.dim,
            target: model.target.clone(),
            context: model.context.clone()
        }
    }

    /// Save checkpoint to a file.
    pub fn save(&self, file: impl AsRef<Path>) -> anyhow::Result<()> {
        let checkpoint = serde_json::to_vec(self)?;

        Ok(std::fs::write(file, lz4_flex::compress_prepend_size(&checkpoint))?)
    }

    /// Load checkpoint from a file.
    ///
    /// Embedding tables are validated against the stored vocabulary
    /// so a truncated or tampered file can't produce a model with
    /// out of bounds rows.
    pub fn load(file: impl AsRef<Path>) -> anyhow::Result<Self> {
        let compressed = std::fs::read(file)?;
        let checkpoint = lz4_flex::decompress_size_prepended(&compressed)?;

        let checkpoint = serde_json::from_slice::<Checkpoint>(&checkpoint)?;

        let expected = checkpoint.words.len() * checkpoint.dim;

        if checkpoint.target.len() != expected || checkpoint.context.len() != expected {
            anyhow::bail!(
                "checkpoint embedding tables don't match its vocabulary: expected {expected} values per table, got {} and {}",
                checkpoint.target.len(),
                checkpoint.context.len()
            );
        }

        Ok(checkpoint)
    }

    /// Split checkpoint into the parser, vocabulary and model it stores.
    pub fn into_parts(self) -> (CorpusParser, Vocabulary, SkipGramModel) {
        (
            CorpusParser::new(self.lowercase, self.strip_punctuation),
            Vocabulary::from_words(self.words),

            SkipGramModel {
                dim: self.dim,
                target: self.target,
                context: self.context
            }
        )
    }
}

#[test]
fn test_model_shapes() {
    use rand::SeedableRng;

    let mut rng = StdRng::seed_from_u64(123);

    let model = SkipGramModel::random(5, 8, &mut rng);

    assert_eq!(model.len(), 5);
    assert_eq!(model.dim(), 8);

    let spread = 0.5 / 8.0;

    for index in 0..5 {
        let embedding = model.embedding_of(index).unwrap();

        assert_eq!(embedding.len(), 8);
        assert!(embedding.iter().all(|value| value.abs() <= spread));
    }

    assert_eq!(model.embedding_of(5), None);

    let (target, context, negatives) = model.forward(0, 1, &[2, 3]);

    assert_eq!(target.len(), 8);
    assert_eq!(context.len(), 8);
    assert_eq!(negatives.len(), 2);
}

#[test]
fn test_pair_loss_on_zero_tables() {
    let (_, _, model) = Checkpoint {
        lowercase: true,
        strip_punctuation: true,
        words: vec![String::from("a"), String::from("b"), String::from("c")],
        dim: 4,
        target: vec![0.0; 12],
        context: vec![0.0; 12]
    }.into_parts();

    // All dot products are zero, so each of the three terms costs ln(2).
    let loss = model.pair_loss(TrainingPair { target: 0, context: 1 }, &[2, 2]);

    assert!((loss - 3.0 * 2.0_f32.ln()).abs() < 1e-6);
}

#[test]
fn test_log_sigmoid_stability() {
    assert!((log_sigmoid(0.0) + 2.0_f32.ln()).abs() < 1e-6);

    // Extreme scores must stay finite.
    assert!(log_sigmoid(-1000.0).is_finite());
    assert!(log_sigmoid(1000.0).is_finite());
    assert!(log_sigmoid(1000.0).abs() < 1e-6);
}

#[test]
fn test_checkpoint_file() -> anyhow::Result<()> {
    use rand::SeedableRng;

    let path = std::env::temp_dir()
        .join(format!("dipole-checkpoint-test-{}.model", std::process::id()));

    let parser = CorpusParser::default();

    let tokens = parser.read_text("the cat sat on the mat");
    let vocab = Vocabulary::from_tokens(&tokens);

    let mut rng = StdRng::seed_from_u64(42);

    let model = SkipGramModel::random(vocab.len(), 8, &mut rng);

    Checkpoint::new(&parser, &vocab, &model).save(&path)?;

    let (restored_parser, restored_vocab, restored_model) = Checkpoint::load(&path)?.into_parts();

    assert_eq!(restored_parser, parser);
    assert_eq!(restored_vocab, vocab);
    assert_eq!(restored_model, model);

    let _ = std::fs::remove_file(&path);

    Ok(())
}

#[test]
fn test_checkpoint_shape_validation() -> anyhow::Result<()> {
    let path = std::env::temp_dir()
        .join(format!("dipole-checkpoint-invalid-test-{}.model", std::process::id()));

    let checkpoint = Checkpoint {
        lowercase: true,
        strip_punctuation: true,
        words: vec![String::from("a"), String::from("b")],
        dim: 4,
        target: vec![0.0; 8],
        context: vec![0.0; 7]
    };

    checkpoint.save(&path)?;

    assert!(Checkpoint::load(&path).is_err());

    let _ = std::fs::remove_file(&path);

    Ok(())
}
