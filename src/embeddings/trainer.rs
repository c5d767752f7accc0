use std::collections::HashMap;

use serde::{Serialize, Deserialize};

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use rayon::prelude::*;

use crate::prelude::*;

use super::model::{dot, log_sigmoid, sigmoid};

pub const ADAM_BETA_1: f32 = 0.9;
pub const ADAM_BETA_2: f32 = 0.999;
pub const ADAM_EPSILON: f32 = 1e-8;

/// Batches at least this large compute their gradients in parallel.
pub const PARALLEL_BATCH_THRESHOLD: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Word embeddings training parameters.
pub struct TrainParams {
    /// Amount of dimensions in a word embedding.
    pub embedding_size: usize,

    /// Amount of tokens to the left and to the right of the target
    /// token used as its context.
    pub context_radius: usize,

    /// Amount of passes over the training pairs.
    pub epochs: usize,

    /// Learn rate of the model training.
    pub learn_rate: f32,

    /// Amount of negative samples drawn for every training pair.
    pub negative_samples: usize,

    /// Amount of training pairs in a single gradient step.
    pub batch_size: usize,

    /// Fixed seed for weights initialization and negative sampling.
    ///
    /// Random seed is drawn when none is set.
    pub seed: Option<u64>
}

impl Default for TrainParams {
    #[inline]
    fn default() -> Self {
        Self {
            embedding_size: EMBEDDING_DEFAULT_SIZE,
            context_radius: EMBEDDING_DEFAULT_CONTEXT_RADIUS,
            epochs: EMBEDDING_DEFAULT_EPOCHS,
            learn_rate: EMBEDDING_DEFAULT_LEARN_RATE,
            negative_samples: EMBEDDING_DEFAULT_NEGATIVE_SAMPLES,
            batch_size: EMBEDDING_DEFAULT_BATCH_SIZE,
            seed: None
        }
    }
}

impl TrainParams {
    /// Validate params before any corpus is read or trained on.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.embedding_size == 0 {
            anyhow::bail!("embedding size must be a positive number");
        }

        if self.context_radius == 0 {
            anyhow::bail!("context radius must be a positive number");
        }

        if self.batch_size == 0 {
            anyhow::bail!("batch size must be a positive number");
        }

        if !(self.learn_rate > 0.0) {
            anyhow::bail!("learn rate must be a positive number");
        }

        Ok(())
    }

    /// Source of randomness for weights initialization and negative
    /// sampling, seeded from the params or the system entropy.
    #[inline]
    pub fn rng(&self) -> StdRng {
        StdRng::seed_from_u64(self.seed.unwrap_or_else(|| fastrand::u64(..)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Loss summary of a single finished training epoch.
pub struct EpochReport {
    /// 1-based number of the epoch.
    pub epoch: usize,

    /// Mean negative sampling loss over all the epoch's pairs.
    pub mean_loss: f64
}

/// Draw `count` negative sample indices from `[0, words)` for a pair
/// with the given true context word.
///
/// Collisions with the context are redrawn, so returned samples can
/// repeat each other but never equal the context itself. Vocabularies
/// of less than two words produce no samples since every index would
/// collide.
pub fn sample_negatives(rng: &mut StdRng, words: usize, count: usize, context: usize) -> Vec<usize> {
    if words < 2 {
        return Vec::new();
    }

    (0..count)
        .map(|_| {
            loop {
                let index = rng.gen_range(0..words);

                if index != context {
                    break index;
                }
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
/// First and second moment estimates for one embedding table.
struct AdamMoments {
    m: Vec<f32>,
    v: Vec<f32>
}

impl AdamMoments {
    #[inline]
    fn new(values: usize) -> Self {
        Self {
            m: vec![0.0; values],
            v: vec![0.0; values]
        }
    }
}

/// Gradients of a single pair's loss with respect to the rows this
/// pair touches.
struct PairGradients {
    loss: f32,

    target: usize,
    target_grad: Vec<f32>,

    /// Context table rows: the true context and every negative sample.
    context_grads: Vec<(usize, Vec<f32>)>
}

fn pair_gradients(model: &SkipGramModel, pair: TrainingPair, negatives: &[usize]) -> PairGradients {
    let (target, context, negative_rows) = model.forward(pair.target, pair.context, negatives);

    let dim = model.dim();

    let score = dot(target, context);

    let mut loss = -log_sigmoid(score);

    // The true pair is pulled towards sigmoid(score) = 1.
    let slope = sigmoid(score) - 1.0;

    let mut target_grad = vec![0.0; dim];
    let mut context_grad = vec![0.0; dim];

    for i in 0..dim {
        target_grad[i] = slope * context[i];
        context_grad[i] = slope * target[i];
    }

    let mut context_grads = Vec::with_capacity(negatives.len() + 1);

    context_grads.push((pair.context, context_grad));

    for (negative, row) in negatives.iter().copied().zip(negative_rows) {
        let score = dot(target, row);

        loss -= log_sigmoid(-score);

        // Negative samples are pushed towards sigmoid(score) = 0.
        let slope = sigmoid(score);

        let mut negative_grad = vec![0.0; dim];

        for i in 0..dim {
            target_grad[i] += slope * row[i];
            negative_grad[i] = slope * target[i];
        }

        context_grads.push((negative, negative_grad));
    }

    PairGradients {
        loss,
        target: pair.target,
        target_grad,
        context_grads
    }
}

fn accumulate(grads: &mut HashMap<usize, Vec<f32>>, row: usize, values: &[f32], scale: f32, dim: usize) {
    let sum = grads.entry(row)
        .or_insert_with(|| vec![0.0; dim]);

    for i in 0..dim {
        sum[i] += values[i] * scale;
    }
}

/// Single Adam update of one embedding table row.
///
/// Moments of rows not touched by the current batch are left as is,
/// and the bias correction uses the amount of performed batch steps.
fn adam_step(
    weights: &mut [f32],
    moments: &mut AdamMoments,
    row: usize,
    dim: usize,
    grad: &[f32],
    learn_rate: f32,
    step: i32
) {
    let m = &mut moments.m[row * dim..(row + 1) * dim];
    let v = &mut moments.v[row * dim..(row + 1) * dim];

    let bias_1 = 1.0 - ADAM_BETA_1.powi(step);
    let bias_2 = 1.0 - ADAM_BETA_2.powi(step);

    for i in 0..dim {
        m[i] = ADAM_BETA_1 * m[i] + (1.0 - ADAM_BETA_1) * grad[i];
        v[i] = ADAM_BETA_2 * v[i] + (1.0 - ADAM_BETA_2) * grad[i] * grad[i];

        let m_hat = m[i] / bias_1;
        let v_hat = v[i] / bias_2;

        weights[i] -= learn_rate * m_hat / (v_hat.sqrt() + ADAM_EPSILON);
    }
}

#[derive(Debug)]
/// Mini-batch trainer of the skip-gram model.
///
/// Owns the optimizer state and the randomness source, so repeated
/// `fit` calls continue the same training trajectory.
pub struct Trainer {
    params: TrainParams,
    rng: StdRng,
    step: i32,
    target_moments: AdamMoments,
    context_moments: AdamMoments
}

impl Trainer {
    /// Build a randomly initialized model for the given vocabulary
    /// size together with its trainer, both driven by one seeded
    /// randomness source.
    pub fn initialize(params: TrainParams, words: usize) -> anyhow::Result<(SkipGramModel, Self)> {
        params.validate()?;

        let mut rng = params.rng();

        let model = SkipGramModel::random(words, params.embedding_size, &mut rng);

        let values = words * params.embedding_size;

        Ok((
            model,

            Self {
                params,
                rng,
                step: 0,
                target_moments: AdamMoments::new(values),
                context_moments: AdamMoments::new(values)
            }
        ))
    }

    /// Train the model on the given pairs for the configured amount
    /// of epochs, reporting each epoch's mean loss to the callback.
    ///
    /// Every epoch scans the pairs in their original order, splitting
    /// them into `batch_size` chunks. An empty pairs list is a no-op:
    /// the model keeps its current weights and nothing is reported.
    pub fn fit(
        &mut self,
        model: &mut SkipGramModel,
        pairs: &[TrainingPair],
        mut on_epoch: impl FnMut(EpochReport)
    ) {
        if pairs.is_empty() {
            return;
        }

        let words = model.len();

        for epoch in 1..=self.params.epochs {
            let mut loss_sum = 0.0;

            for batch in pairs.chunks(self.params.batch_size) {
                loss_sum += self.train_batch(model, batch, words);
            }

            on_epoch(EpochReport {
                epoch,
                mean_loss: loss_sum / pairs.len() as f64
            });
        }
    }

    /// Perform one gradient step over the batch, returning its total
    /// loss.
    fn train_batch(&mut self, model: &mut SkipGramModel, batch: &[TrainingPair], words: usize) -> f64 {
        // Negative samples are always drawn sequentially, before any
        // gradient is computed, so seeded runs produce identical
        // models whether the batch is processed in parallel or not.
        let samples = batch.iter()
            .map(|pair| (*pair, sample_negatives(&mut self.rng, words, self.params.negative_samples, pair.context)))
            .collect::<Vec<_>>();

        // Every pair's gradients are computed against the weights the
        // batch started with. Collects preserve the pairs order on
        // both paths.
        let snapshot: &SkipGramModel = model;

        let gradients = if batch.len() >= PARALLEL_BATCH_THRESHOLD {
            samples.par_iter()
                .map(|(pair, negatives)| pair_gradients(snapshot, *pair, negatives))
                .collect::<Vec<PairGradients>>()
        } else {
            samples.iter()
                .map(|(pair, negatives)| pair_gradients(snapshot, *pair, negatives))
                .collect::<Vec<PairGradients>>()
        };

        let dim = model.dim();
        let scale = 1.0 / batch.len() as f32;

        let mut loss_sum = 0.0;

        let mut target_grads = HashMap::new();
        let mut context_grads = HashMap::new();

        for gradients in gradients {
            loss_sum += gradients.loss as f64;

            accumulate(&mut target_grads, gradients.target, &gradients.target_grad, scale, dim);

            for (row, values) in &gradients.context_grads {
                accumulate(&mut context_grads, *row, values, scale, dim);
            }
        }

        self.step += 1;

        // Rows are independent so the hash map's scan order doesn't
        // affect the result.
        for (row, grad) in &target_grads {
            adam_step(
                model.target_row_mut(*row),
                &mut self.target_moments,
                *row,
                dim,
                grad,
                self.params.learn_rate,
                self.step
            );
        }

        for (row, grad) in &context_grads {
            adam_step(
                model.context_row_mut(*row),
                &mut self.context_moments,
                *row,
                dim,
                grad,
                self.params.learn_rate,
                self.step
            );
        }

        loss_sum
    }
}

#[cfg(test)]
fn train_test_model(corpus: &str, params: TrainParams) -> (Vocabulary, SkipGramModel, Vec<EpochReport>) {
    let parser = CorpusParser::default();

    let tokens = parser.read_text(corpus);
    let vocab = Vocabulary::from_tokens(&tokens);

    let pairs = window_pairs(&vocab.encode(&tokens), params.context_radius);

    let (mut model, mut trainer) = Trainer::initialize(params, vocab.len()).unwrap();

    let mut reports = Vec::new();

    trainer.fit(&mut model, &pairs, |report| reports.push(report));

    (vocab, model, reports)
}

#[test]
fn test_params_validation() {
    assert!(TrainParams::default().validate().is_ok());

    assert!(TrainParams { embedding_size: 0, ..Default::default() }.validate().is_err());
    assert!(TrainParams { context_radius: 0, ..Default::default() }.validate().is_err());
    assert!(TrainParams { batch_size: 0, ..Default::default() }.validate().is_err());
    assert!(TrainParams { learn_rate: 0.0, ..Default::default() }.validate().is_err());
    assert!(TrainParams { learn_rate: -1.0, ..Default::default() }.validate().is_err());
}

#[test]
fn test_negative_sampling() {
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..100 {
        let samples = sample_negatives(&mut rng, 3, 5, 1);

        assert_eq!(samples.len(), 5);
        assert!(samples.iter().all(|index| *index != 1 && *index < 3));
    }

    assert!(sample_negatives(&mut rng, 1, 5, 0).is_empty());
    assert!(sample_negatives(&mut rng, 0, 5, 0).is_empty());
    assert!(sample_negatives(&mut rng, 10, 0, 3).is_empty());
}

#[test]
fn test_epoch_loss_decreases() {
    let corpus = "the quick brown fox jumps over the lazy dog ".repeat(30);

    let (_, _, reports) = train_test_model(&corpus, TrainParams {
        embedding_size: 16,
        context_radius: 2,
        epochs: 5,
        learn_rate: 0.05,
        negative_samples: 5,
        batch_size: 16,
        seed: Some(42)
    });

    assert_eq!(reports.len(), 5);
    assert_eq!(reports[0].epoch, 1);
    assert_eq!(reports[4].epoch, 5);

    assert!(reports.iter().all(|report| report.mean_loss.is_finite()));
    assert!(reports[4].mean_loss < reports[0].mean_loss);
}

#[test]
fn test_words_with_shared_contexts_cluster() {
    let mut corpus = String::new();

    for _ in 0..20 {
        for animal in ["cat", "dog"] {
            corpus.push_str(&format!("the {animal} sat on the mat "));
            corpus.push_str(&format!("a {animal} chased the ball "));
            corpus.push_str(&format!("my {animal} slept all day "));
        }
    }

    let (vocab, model, _) = train_test_model(&corpus, TrainParams {
        embedding_size: 8,
        context_radius: 2,
        epochs: 20,
        learn_rate: 0.05,
        negative_samples: 5,
        batch_size: 16,
        seed: Some(42)
    });

    let cat = vocab.index_of("cat").unwrap();
    let dog = vocab.index_of("dog").unwrap();

    let similarity = cosine_similarity(
        model.embedding_of(cat).unwrap(),
        model.embedding_of(dog).unwrap()
    );

    assert!(similarity > 0.5, "cat and dog similarity is too low: {similarity}");
}

#[test]
fn test_seeded_training_is_reproducible() {
    let corpus = "the quick brown fox jumps over the lazy dog ".repeat(30);

    let params = TrainParams {
        embedding_size: 8,
        context_radius: 2,
        epochs: 2,
        learn_rate: 0.01,
        negative_samples: 5,

        // Large enough to hit the parallel gradients path.
        batch_size: 128,

        seed: Some(7)
    };

    let (_, first, _) = train_test_model(&corpus, params);
    let (_, second, _) = train_test_model(&corpus, params);

    assert_eq!(first, second);
}

#[test]
fn test_training_without_pairs_is_noop() {
    let (mut model, mut trainer) = Trainer::initialize(TrainParams::default(), 0).unwrap();

    let mut reports = 0;

    trainer.fit(&mut model, &[], |_| reports += 1);

    assert_eq!(reports, 0);
    assert!(model.is_empty());
}
