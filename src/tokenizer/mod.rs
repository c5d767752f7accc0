pub mod parser;
pub mod vocab;

pub mod prelude {
    pub use super::parser::Parser as CorpusParser;
    pub use super::vocab::Vocabulary;
}
