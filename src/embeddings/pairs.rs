use crate::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Single (target word, context word) training sample of indexed
/// vocabulary tokens.
pub struct TrainingPair {
    pub target: usize,
    pub context: usize
}

/// Slide a fixed-radius window over the tokens stream and pair every
/// target token with each of its surrounding context tokens.
///
/// Targets are the positions in `[radius, len - radius)`, so every
/// emitted window is complete and every target produces exactly
/// `2 * radius` pairs in a stable left-to-right scan order. Streams
/// shorter than `2 * radius + 1` tokens produce no pairs at all.
pub fn window_pairs(tokens: &[usize], radius: usize) -> Vec<TrainingPair> {
    let n = tokens.len();

    if radius == 0 || n < 2 * radius + 1 {
        return Vec::new();
    }

    let mut pairs = Vec::with_capacity(2 * radius * (n - 2 * radius));

    for i in radius..n - radius {
        for j in i - radius..=i + radius {
            if j != i {
                pairs.push(TrainingPair {
                    target: tokens[i],
                    context: tokens[j]
                });
            }
        }
    }

    pairs
}

#[test]
fn test_window_pairs_amount() {
    let parser = CorpusParser::default();

    let tokens = parser.read_text("the cat sat on the mat the dog sat on the rug");

    assert_eq!(tokens.len(), 12);

    let vocab = Vocabulary::from_tokens(&tokens);

    assert_eq!(vocab.len(), 7);
    assert_eq!(vocab.words(), &["cat", "dog", "mat", "on", "rug", "sat", "the"]);

    let pairs = window_pairs(&vocab.encode(&tokens), 2);

    // 2 * radius pairs for each of the (len - 2 * radius) targets.
    assert_eq!(pairs.len(), 2 * 2 * (tokens.len() - 2 * 2));
    assert_eq!(pairs.len(), 32);

    for pair in &pairs {
        assert!(pair.target < vocab.len());
        assert!(pair.context < vocab.len());
    }

    let tokens = (0..11).collect::<Vec<usize>>();

    assert_eq!(window_pairs(&tokens, 2).len(), 28);
}

#[test]
fn test_window_pairs_order() {
    let tokens = [10, 20, 30, 40, 50];

    assert_eq!(window_pairs(&tokens, 1), &[
        TrainingPair { target: 20, context: 10 },
        TrainingPair { target: 20, context: 30 },
        TrainingPair { target: 30, context: 20 },
        TrainingPair { target: 30, context: 40 },
        TrainingPair { target: 40, context: 30 },
        TrainingPair { target: 40, context: 50 }
    ]);
}

#[test]
fn test_window_pairs_short_streams() {
    assert!(window_pairs(&[], 2).is_empty());
    assert!(window_pairs(&[1], 2).is_empty());
    assert!(window_pairs(&[1, 2, 3, 4], 2).is_empty());
    assert!(window_pairs(&[1, 2, 3], 0).is_empty());

    // Minimal stream for radius 2 is a single complete window.
    assert_eq!(window_pairs(&[1, 2, 3, 4, 5], 2).len(), 4);
}
