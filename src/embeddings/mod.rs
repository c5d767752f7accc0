pub mod database;
pub mod pairs;
pub mod model;
pub mod trainer;

pub const EMBEDDING_DEFAULT_SIZE: usize = 64;
pub const EMBEDDING_DEFAULT_CONTEXT_RADIUS: usize = 3;
pub const EMBEDDING_DEFAULT_EPOCHS: usize = 10;
pub const EMBEDDING_DEFAULT_LEARN_RATE: f32 = 0.0015;
pub const EMBEDDING_DEFAULT_NEGATIVE_SAMPLES: usize = 5;
pub const EMBEDDING_DEFAULT_BATCH_SIZE: usize = 32;

pub mod prelude {
    pub use super::database::Database as WordEmbeddingsDatabase;

    pub use super::pairs::{TrainingPair, window_pairs};

    pub use super::model::{SkipGramModel, Checkpoint};

    pub use super::trainer::{
        TrainParams,
        Trainer,
        EpochReport,
        sample_negatives
    };

    pub use super::{
        EMBEDDING_DEFAULT_SIZE,
        EMBEDDING_DEFAULT_CONTEXT_RADIUS,
        EMBEDDING_DEFAULT_EPOCHS,
        EMBEDDING_DEFAULT_LEARN_RATE,
        EMBEDDING_DEFAULT_NEGATIVE_SAMPLES,
        EMBEDDING_DEFAULT_BATCH_SIZE,

        cosine_similarity
    };
}

/// Calculate cosine similarity between two vectors.
///
/// Return value in `[-1.0, 1.0]` range where 1.0 means fully equal.
/// Vectors without magnitude are not comparable to anything so 0.0
/// is returned when any of the two is all zeros.
pub fn cosine_similarity(word_1: &[f32], word_2: &[f32]) -> f32 {
    let mut distance = 0.0;
    let mut len_1 = 0.0;
    let mut len_2 = 0.0;

    let n = std::cmp::max(word_1.len(), word_2.len());

    for i in 0..n {
        let word_1 = word_1.get(i).copied().unwrap_or(0.0);
        let word_2 = word_2.get(i).copied().unwrap_or(0.0);

        distance += word_1 * word_2;

        len_1 += word_1.powi(2);
        len_2 += word_2.powi(2);
    }

    if len_1 == 0.0 || len_2 == 0.0 {
        return 0.0;
    }

    distance / (len_1.sqrt() * len_2.sqrt())
}

#[test]
fn test_cosine_similarity() {
    assert!((cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]) - 1.0).abs() < 1e-6);
    assert_eq!(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]), -1.0);
    assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);

    // Scale invariance.
    assert!((cosine_similarity(&[1.0, 2.0], &[10.0, 20.0]) - 1.0).abs() < 1e-6);

    // Symmetry.
    assert_eq!(
        cosine_similarity(&[1.0, 2.0, 3.0], &[3.0, 1.0, 2.0]),
        cosine_similarity(&[3.0, 1.0, 2.0], &[1.0, 2.0, 3.0])
    );
}

#[test]
fn test_cosine_similarity_zero_vectors() {
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
    assert_eq!(cosine_similarity(&[], &[]), 0.0);
}
