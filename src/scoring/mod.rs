use std::collections::HashSet;

use crate::prelude::*;

pub mod transcript;

/// Weight of the embeddings relevance in the combined quality score.
pub const QUALITY_RELEVANCE_WEIGHT: f32 = 0.8;

/// Weight of the tokens novelty in the combined quality score.
pub const QUALITY_NOVELTY_WEIGHT: f32 = 0.2;

pub mod prelude {
    pub use super::transcript::{Exchange, parse_transcript};

    pub use super::{
        QUALITY_RELEVANCE_WEIGHT,
        QUALITY_NOVELTY_WEIGHT,

        SentenceScorer,
        QualityReport
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Quality summary of a single prompt and generation exchange.
pub struct QualityReport {
    /// Embeddings similarity of the prompt and the generation, mapped
    /// to the `[0.0, 100.0]` range.
    pub relevance: f32,

    /// Percent of the generation's tokens which don't repeat the
    /// prompt's tokens.
    pub novelty: f32,

    /// Weighted sum of relevance and novelty.
    pub quality: f32
}

#[derive(Debug, Clone)]
/// Sentence similarity scorer on top of a trained skip-gram model.
///
/// Owns the corpus parser, the vocabulary and the model, so every
/// scored sentence is tokenized exactly the way the training corpus
/// was.
pub struct SentenceScorer {
    parser: CorpusParser,
    vocab: Vocabulary,
    model: SkipGramModel
}

impl SentenceScorer {
    /// Create scorer from a trained model and its training-time parts.
    pub fn new(parser: CorpusParser, vocab: Vocabulary, model: SkipGramModel) -> anyhow::Result<Self> {
        if vocab.len() != model.len() {
            anyhow::bail!(
                "vocabulary of {} words doesn't match the model's {} embedding rows",
                vocab.len(),
                model.len()
            );
        }

        Ok(Self {
            parser,
            vocab,
            model
        })
    }

    /// Build scorer from a stored checkpoint.
    #[inline]
    pub fn from_checkpoint(checkpoint: Checkpoint) -> anyhow::Result<Self> {
        let (parser, vocab, model) = checkpoint.into_parts();

        Self::new(parser, vocab, model)
    }

    #[inline]
    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    #[inline]
    pub fn model(&self) -> &SkipGramModel {
        &self.model
    }

    /// Mean of the target table embeddings of all the sentence's words
    /// known to the vocabulary.
    ///
    /// Sentences without a single known word produce a zero vector.
    pub fn sentence_embedding(&self, sentence: impl AsRef<str>) -> Vec<f32> {
        let tokens = self.parser.read_text(sentence);
        let known = self.vocab.encode(&tokens);

        let mut embedding = vec![0.0; self.model.dim()];

        if known.is_empty() {
            return embedding;
        }

        for index in &known {
            if let Some(word) = self.model.embedding_of(*index) {
                for (value, word) in embedding.iter_mut().zip(word) {
                    *value += word;
                }
            }
        }

        let scale = 1.0 / known.len() as f32;

        for value in &mut embedding {
            *value *= scale;
        }

        embedding
    }

    /// Cosine similarity of two sentences' embeddings.
    ///
    /// Return value in `[-1.0, 1.0]` range, or exactly 0.0 when any
    /// of the sentences has no words known to the vocabulary.
    #[inline]
    pub fn similarity(&self, first: impl AsRef<str>, second: impl AsRef<str>) -> f32 {
        cosine_similarity(
            &self.sentence_embedding(first),
            &self.sentence_embedding(second)
        )
    }

    /// Sentences similarity mapped to the `[0.0, 100.0]` range.
    #[inline]
    pub fn relevance(&self, first: impl AsRef<str>, second: impl AsRef<str>) -> f32 {
        (self.similarity(first, second) + 1.0) * 50.0
    }

    /// Percent of the generation's tokens which don't appear among
    /// the prompt's tokens.
    ///
    /// Empty generations have no novelty.
    pub fn novelty(&self, prompt: impl AsRef<str>, generation: impl AsRef<str>) -> f32 {
        let prompt = self.parser.read_text(prompt)
            .into_iter()
            .collect::<HashSet<String>>();

        let generation = self.parser.read_text(generation);

        if generation.is_empty() {
            return 0.0;
        }

        let repeated = generation.iter()
            .filter(|token| prompt.contains(token.as_str()))
            .count();

        (generation.len() - repeated) as f32 / generation.len() as f32 * 100.0
    }

    /// Score a single transcript exchange.
    pub fn quality(&self, exchange: &Exchange) -> QualityReport {
        let relevance = self.relevance(&exchange.prompt, &exchange.generation);
        let novelty = self.novelty(&exchange.prompt, &exchange.generation);

        QualityReport {
            relevance,
            novelty,
            quality: QUALITY_RELEVANCE_WEIGHT * relevance + QUALITY_NOVELTY_WEIGHT * novelty
        }
    }
}

#[cfg(test)]
fn test_scorer() -> SentenceScorer {
    SentenceScorer::from_checkpoint(Checkpoint {
        lowercase: true,
        strip_punctuation: true,
        words: vec![String::from("cat"), String::from("dog"), String::from("mat")],
        dim: 2,

        target: vec![
            1.0, 0.0,
            0.0, 1.0,
            1.0, 1.0
        ],

        context: vec![0.0; 6]
    }).unwrap()
}

#[test]
fn test_scorer_size_validation() {
    let result = SentenceScorer::from_checkpoint(Checkpoint {
        lowercase: true,
        strip_punctuation: true,
        words: vec![String::from("cat")],
        dim: 2,
        target: vec![1.0, 0.0, 0.0, 1.0],
        context: vec![0.0; 4]
    });

    assert!(result.is_err());
}

#[test]
fn test_sentence_embeddings() {
    let scorer = test_scorer();

    assert_eq!(scorer.sentence_embedding("cat"), &[1.0, 0.0]);

    // Mean of the known words, unknown ones are skipped.
    assert_eq!(scorer.sentence_embedding("cat dog"), &[0.5, 0.5]);
    assert_eq!(scorer.sentence_embedding("the cat!"), &[1.0, 0.0]);

    // No known words at all.
    assert_eq!(scorer.sentence_embedding("completely unknown"), &[0.0, 0.0]);
    assert_eq!(scorer.sentence_embedding(""), &[0.0, 0.0]);
}

#[test]
fn test_sentence_similarity() {
    let scorer = test_scorer();

    assert!((scorer.similarity("the cat!", "Cat") - 1.0).abs() < 1e-6);

    // Mean of "cat dog" is parallel to "mat".
    assert!((scorer.similarity("cat dog", "mat") - 1.0).abs() < 1e-6);

    // Orthogonal words.
    assert_eq!(scorer.similarity("cat", "dog"), 0.0);

    // Symmetry.
    assert_eq!(
        scorer.similarity("cat mat", "dog"),
        scorer.similarity("dog", "cat mat")
    );

    // Unknown sentences are not similar to anything.
    assert_eq!(scorer.similarity("unknown words only", "cat dog mat"), 0.0);
    assert_eq!(scorer.similarity("", "cat"), 0.0);
}

#[test]
fn test_relevance_range() {
    let scorer = test_scorer();

    assert!((scorer.relevance("cat", "cat") - 100.0).abs() < 1e-4);
    assert!((scorer.relevance("cat", "dog") - 50.0).abs() < 1e-4);

    // Unknown sentences have zero similarity, so neutral relevance.
    assert_eq!(scorer.relevance("cat", "xyzzy"), 50.0);
}

#[test]
fn test_novelty() {
    let scorer = test_scorer();

    assert_eq!(scorer.novelty("the cat", "entirely fresh words"), 100.0);
    assert_eq!(scorer.novelty("the cat", "the cat"), 0.0);
    assert_eq!(scorer.novelty("anything", ""), 0.0);

    assert!((scorer.novelty("the cat", "the dog") - 50.0).abs() < 1e-4);

    // Tokenization applies to both sides.
    assert_eq!(scorer.novelty("The CAT!", "cat"), 0.0);
}

#[test]
fn test_exchange_quality() {
    let scorer = test_scorer();

    let report = scorer.quality(&Exchange {
        prompt: String::from("cat"),
        generation: String::from("dog")
    });

    assert!((report.relevance - 50.0).abs() < 1e-4);
    assert_eq!(report.novelty, 100.0);

    assert!((report.quality - (0.8 * 50.0 + 0.2 * 100.0)).abs() < 1e-3);
}
