#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Parser {
    /// Convert all words to lowercase.
    pub lowercase: bool,

    /// Strip all punctuation characters.
    pub strip_punctuation: bool
}

impl Default for Parser {
    #[inline]
    fn default() -> Self {
        Self {
            lowercase: true,
            strip_punctuation: true
        }
    }
}

impl Parser {
    #[inline]
    pub fn new(lowercase: bool, strip_punctuation: bool) -> Self {
        Self {
            lowercase,
            strip_punctuation
        }
    }

    /// Split given text into word tokens.
    ///
    /// Punctuation characters are removed before splitting, so words
    /// joined by them (`re-use`) collapse into single tokens (`reuse`).
    /// Empty text produces an empty token stream.
    pub fn read_text(&self, text: impl AsRef<str>) -> Vec<String> {
        let mut text = text.as_ref().to_string();

        if self.lowercase {
            text = text.to_lowercase();
        }

        text.chars()
            .filter(|char| !self.strip_punctuation || !char.is_ascii_punctuation())
            .collect::<String>()
            .split_whitespace()
            .map(String::from)
            .collect()
    }
}

#[test]
fn test_text_parser() {
    let parser = Parser::default();

    assert_eq!(
        parser.read_text("The cat, the dog - and the rug!"),
        &["the", "cat", "the", "dog", "and", "the", "rug"]
    );

    assert_eq!(parser.read_text("re-use it"), &["reuse", "it"]);
    assert_eq!(parser.read_text("  \n\t "), Vec::<String>::new());
    assert_eq!(parser.read_text(""), Vec::<String>::new());
}

#[test]
fn test_text_parser_flags() {
    let parser = Parser::new(false, false);

    assert_eq!(parser.read_text("The cat!"), &["The", "cat!"]);

    let parser = Parser::new(true, false);

    assert_eq!(parser.read_text("The cat!"), &["the", "cat!"]);
}
