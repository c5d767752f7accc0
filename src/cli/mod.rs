use std::path::PathBuf;

use clap::Parser;

pub mod config;
pub mod embeddings;
pub mod score;

#[derive(Parser)]
pub enum CLI {
    /// Manage embeddings of plain text tokens.
    Embeddings {
        #[arg(long, short)]
        /// Path to the database file.
        database: PathBuf,

        #[arg(long, default_value_t = 1024 * 1024 * 64)]
        /// SQLite database cache size.
        ///
        /// Positive value sets cache size in bytes, negative - in sqlite pages.
        cache_size: i64,

        #[command(subcommand)]
        command: embeddings::EmbeddingsCLI
    },

    /// Score sentences and results transcripts with a trained model.
    Score {
        #[arg(long, short)]
        /// Path to the model checkpoint file.
        model: PathBuf,

        #[command(subcommand)]
        command: score::ScoreCLI
    }
}

impl CLI {
    #[inline]
    pub fn execute(self) -> anyhow::Result<()> {
        match self {
            Self::Embeddings { database, cache_size, command } => command.execute(database, cache_size),
            Self::Score { model, command } => command.execute(model)
        }
    }
}
