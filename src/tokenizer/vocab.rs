use std::collections::{BTreeSet, HashMap};

#[derive(Default, Debug, Clone, PartialEq, Eq)]
/// Deduplicated, sorted list of the corpus words with bijective
/// word to index and index to word lookups.
pub struct Vocabulary {
    words: Vec<String>,
    indices: HashMap<String, usize>
}

impl Vocabulary {
    /// Build vocabulary from the given tokens stream.
    ///
    /// Empty stream produces an empty vocabulary.
    pub fn from_tokens(tokens: &[String]) -> Self {
        let words = tokens.iter()
            .cloned()
            .collect::<BTreeSet<String>>();

        Self::from_words(words.into_iter().collect())
    }

    /// Build vocabulary from an already deduplicated words list.
    ///
    /// Positions of the words in the list define their indices.
    pub fn from_words(words: Vec<String>) -> Self {
        let indices = words.iter()
            .enumerate()
            .map(|(index, word)| (word.clone(), index))
            .collect::<HashMap<String, usize>>();

        Self {
            words,
            indices
        }
    }

    /// Amount of unique words.
    #[inline]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Index of the given word, if it's known.
    #[inline]
    pub fn index_of(&self, word: impl AsRef<str>) -> Option<usize> {
        self.indices.get(word.as_ref()).copied()
    }

    /// Word stored under the given index.
    #[inline]
    pub fn word(&self, index: usize) -> Option<&str> {
        self.words.get(index).map(String::as_str)
    }

    /// All the known words in index order.
    #[inline]
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Map words to their vocabulary indices.
    ///
    /// Unknown words are silently skipped.
    pub fn encode(&self, words: &[String]) -> Vec<usize> {
        words.iter()
            .filter_map(|word| self.index_of(word))
            .collect()
    }
}

#[test]
fn test_vocabulary() {
    let tokens = ["the", "cat", "sat", "on", "the", "mat"]
        .map(String::from);

    let vocab = Vocabulary::from_tokens(&tokens);

    assert_eq!(vocab.len(), 5);
    assert_eq!(vocab.words(), &["cat", "mat", "on", "sat", "the"]);

    for (index, word) in vocab.words().iter().enumerate() {
        assert_eq!(vocab.index_of(word), Some(index));
        assert_eq!(vocab.word(index), Some(word.as_str()));
    }

    assert_eq!(vocab.index_of("dog"), None);
    assert_eq!(vocab.word(5), None);
}

#[test]
fn test_vocabulary_encode() {
    let tokens = ["b", "a", "c"].map(String::from);

    let vocab = Vocabulary::from_tokens(&tokens);

    let stream = ["a", "unknown", "c", "b", "b"].map(String::from);

    assert_eq!(vocab.encode(&stream), &[0, 2, 1, 1]);
}

#[test]
fn test_empty_vocabulary() {
    let vocab = Vocabulary::from_tokens(&[]);

    assert!(vocab.is_empty());
    assert_eq!(vocab.len(), 0);
    assert_eq!(vocab.index_of("anything"), None);
    assert!(vocab.encode(&["a".to_string()]).is_empty());
}
