use std::path::PathBuf;
use std::fs::File;
use std::io::{BufWriter, Write};

use clap::Subcommand;
use colorful::Colorful;

use crate::prelude::*;

use super::config::TrainingConfig;

#[derive(Subcommand)]
pub enum EmbeddingsCLI {
    /// Create new word embeddings database.
    Create,

    /// Train skip-gram word embeddings on a plain text corpus.
    Train {
        #[arg(long, short)]
        /// Path to the UTF-8 text corpus file.
        corpus: PathBuf,

        #[arg(long, short)]
        /// Path to the model checkpoint file.
        model: PathBuf,

        #[arg(long)]
        /// Path to the TOML file with training parameters.
        ///
        /// Default parameters are used when not specified.
        config: Option<PathBuf>
    },

    /// Compare words to each other using their embeddings.
    Compare {
        #[arg(long, short, default_value_t = 10)]
        /// Amount of closest tokens to return.
        top_n: usize
    },

    /// Export word embeddings into a CSV file.
    Export {
        #[arg(long, short)]
        /// Path to the CSV file.
        csv: PathBuf
    }
}

impl EmbeddingsCLI {
    #[inline]
    pub fn execute(self, database: PathBuf, cache_size: i64) -> anyhow::Result<()> {
        match self {
            Self::Create => {
                let database = database.canonicalize().unwrap_or(database);

                println!("⏳ Creating word embeddings database in {database:?}...");

                match WordEmbeddingsDatabase::open(&database, cache_size) {
                    Ok(_) => println!("{}", "🚀 Database created".green()),
                    Err(err) => eprintln!("{}", format!("🧯 Failed to create database: {err}").red())
                }
            }

            Self::Train { corpus, model: model_path, config } => {
                let database = database.canonicalize().unwrap_or(database);
                let corpus = corpus.canonicalize().unwrap_or(corpus);

                let config = match config {
                    Some(path) => {
                        let path = path.canonicalize().unwrap_or(path);

                        println!("⏳ Reading training config from {path:?}...");

                        match super::config::load(&path) {
                            Ok(config) => config,
                            Err(err) => {
                                eprintln!("{}", format!("🧯 Failed to read training config: {err}").red());

                                return Ok(());
                            }
                        }
                    }

                    None => TrainingConfig::default()
                };

                // Malformed training parameters are fatal before the
                // corpus is even read.
                config.validate()?;

                println!("⏳ Opening word embeddings database in {database:?}...");

                let embeddings = match WordEmbeddingsDatabase::open(&database, cache_size) {
                    Ok(embeddings) => embeddings,
                    Err(err) => {
                        eprintln!("{}", format!("🧯 Failed to open word embeddings database: {err}").red());

                        return Ok(());
                    }
                };

                println!("⏳ Reading corpus from {corpus:?}...");

                let text = match std::fs::read_to_string(&corpus) {
                    Ok(text) => text,
                    Err(err) => {
                        eprintln!("{}", format!("🧯 Failed to read corpus: {err}").red());

                        return Ok(());
                    }
                };

                let parser = config.tokenizer.parser();

                let tokens = parser.read_text(&text);
                let vocab = Vocabulary::from_tokens(&tokens);

                let pairs = window_pairs(&vocab.encode(&tokens), config.training.context_radius);

                println!(
                    "📖 Indexed {} words, prepared {} training pairs",
                    vocab.len().to_string().yellow(),
                    pairs.len().to_string().yellow()
                );

                if pairs.is_empty() {
                    println!("{}", "⚠ Corpus is too short for the configured context radius, the model will keep random weights".yellow());
                }

                let (mut model, mut trainer) = Trainer::initialize(config.training, vocab.len())?;

                println!("⏳ Training the model...");

                trainer.fit(&mut model, &pairs, |report| {
                    println!(
                        "⏳ Epoch {} / {}: mean loss {}",
                        report.epoch.to_string().yellow(),
                        config.training.epochs.to_string().yellow(),
                        format!("{:.6}", report.mean_loss).yellow()
                    );
                });

                println!("{}", "✅ Model trained".green());
                println!("⏳ Saving the model checkpoint into {model_path:?}...");

                if let Err(err) = Checkpoint::new(&parser, &vocab, &model).save(&model_path) {
                    eprintln!("{}", format!("🧯 Failed to save model checkpoint: {err}").red());

                    return Ok(());
                }

                println!("⏳ Publishing word embeddings...");

                let mut published = 0;

                for (index, word) in vocab.words().iter().enumerate() {
                    if let Some(embedding) = model.embedding_of(index) {
                        embeddings.insert_embedding(word, embedding)?;

                        published += 1;
                    }
                }

                println!("✅ Published {} embeddings", published.to_string().yellow());
                println!("{}", "✅ Model saved".green());
            }

            Self::Compare { top_n } => {
                let database = database.canonicalize().unwrap_or(database);

                println!("⏳ Opening word embeddings database in {database:?}...");

                let embeddings = match WordEmbeddingsDatabase::open(&database, cache_size) {
                    Ok(embeddings) => embeddings,
                    Err(err) => {
                        eprintln!("{}", format!("🧯 Failed to open word embeddings database: {err}").red());

                        return Ok(());
                    }
                };

                if embeddings.is_empty()? {
                    println!("{}", "⚠ Database has no embeddings, train a model first".yellow());

                    return Ok(());
                }

                let stdin = std::io::stdin();
                let mut stdout = std::io::stdout();

                stdout.write_all(b"\n")?;
                stdout.flush()?;

                loop {
                    stdout.write_all(format!("{} ", "Word:".yellow()).as_bytes())?;
                    stdout.flush()?;

                    let mut line = String::new();

                    // Stop on the end of input or an empty line.
                    if stdin.read_line(&mut line)? == 0 || line.trim().is_empty() {
                        break;
                    }

                    stdout.write_all(b"\n")?;
                    stdout.flush()?;

                    let Some(target_embedding) = embeddings.query_embedding(line.trim())? else {
                        stdout.write_all("📖 Word is not indexed\n\n".as_bytes())?;
                        stdout.flush()?;

                        continue;
                    };

                    let mut best_tokens = Vec::new();

                    embeddings.for_each(|token, embedding| {
                        best_tokens.push((token, cosine_similarity(&target_embedding, &embedding)));

                        Ok(())
                    })?;

                    best_tokens.sort_by(|a, b| b.1.total_cmp(&a.1));

                    for (token, similarity) in best_tokens.into_iter().take(top_n) {
                        stdout.write_all(format!("- {} [{similarity:.08}]\n", format!("\"{token}\"").blue()).as_bytes())?;
                    }

                    stdout.write_all(b"\n")?;
                    stdout.flush()?;
                }
            }

            Self::Export { csv } => {
                let database = database.canonicalize().unwrap_or(database);
                let csv = csv.canonicalize().unwrap_or(csv);

                println!("⏳ Opening word embeddings database in {database:?}...");

                let embeddings = match WordEmbeddingsDatabase::open(&database, cache_size) {
                    Ok(embeddings) => embeddings,
                    Err(err) => {
                        eprintln!("{}", format!("🧯 Failed to open word embeddings database: {err}").red());

                        return Ok(());
                    }
                };

                let mut file = match File::create(&csv) {
                    Ok(file) => BufWriter::new(file),
                    Err(err) => {
                        eprintln!("{}", format!("🧯 Failed to create csv file: {err}").red());

                        return Ok(());
                    }
                };

                println!("⏳ Exporting tokens into {csv:?}...");

                let mut has_header = false;

                let result = embeddings.for_each(|token, embedding| {
                    if let Some(first_char) = token.chars().next() {
                        if first_char.is_alphanumeric() || (first_char.is_ascii_punctuation() && !['"', '\\'].contains(&first_char)) {
                            if !has_header {
                                file.write_all(b"\"token\"")?;

                                for i in 1..=embedding.len() {
                                    file.write_all(format!(",\"embedding{i}\"").as_bytes())?;
                                }

                                file.write_all(b"\n")?;

                                has_header = true;
                            }

                            file.write_all(format!("\"{token}\"").as_bytes())?;

                            for value in embedding {
                                file.write_all(format!(",\"{value}\"").as_bytes())?;
                            }

                            file.write_all(b"\n")?;
                        }
                    }

                    file.flush()?;

                    Ok(())
                });

                match result {
                    Ok(tokens) => println!("✅ Exported {} tokens", tokens.to_string().yellow()),
                    Err(err) => eprintln!("{}", format!("🧯 Failed to export tokens: {err}").red())
                }
            }
        }

        Ok(())
    }
}
