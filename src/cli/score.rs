use std::path::PathBuf;

use clap::Subcommand;
use colorful::Colorful;

use crate::prelude::*;

#[derive(Subcommand)]
pub enum ScoreCLI {
    /// Compare two sentences using their mean word embeddings.
    Sentences {
        #[arg(long, short)]
        /// First sentence.
        first: String,

        #[arg(long, short)]
        /// Second sentence.
        second: String
    },

    /// Score prompt and generation exchanges from a plain text
    /// results transcript.
    Transcript {
        #[arg(long, short)]
        /// Path to the transcript file.
        transcript: PathBuf
    }
}

impl ScoreCLI {
    #[inline]
    pub fn execute(self, model: PathBuf) -> anyhow::Result<()> {
        let model = model.canonicalize().unwrap_or(model);

        println!("⏳ Loading model checkpoint from {model:?}...");

        let scorer = match Checkpoint::load(&model) {
            Ok(checkpoint) => SentenceScorer::from_checkpoint(checkpoint)?,
            Err(err) => {
                eprintln!("{}", format!("🧯 Failed to load model checkpoint: {err}").red());

                return Ok(());
            }
        };

        println!(
            "📖 Model knows {} words of {} dimensions",
            scorer.vocab().len().to_string().yellow(),
            scorer.model().dim().to_string().yellow()
        );

        match self {
            Self::Sentences { first, second } => {
                let similarity = scorer.similarity(&first, &second);
                let relevance = scorer.relevance(&first, &second);

                println!("📖 Cosine similarity: {}", format!("{similarity:.6}").yellow());
                println!("📖 Relevance score: {}", format!("{relevance:.2}").yellow());
            }

            Self::Transcript { transcript } => {
                let transcript = transcript.canonicalize().unwrap_or(transcript);

                println!("⏳ Reading transcript from {transcript:?}...");

                let text = match std::fs::read_to_string(&transcript) {
                    Ok(text) => text,
                    Err(err) => {
                        eprintln!("{}", format!("🧯 Failed to read transcript: {err}").red());

                        return Ok(());
                    }
                };

                let exchanges = parse_transcript(&text);

                if exchanges.is_empty() {
                    println!("{}", "⚠ No prompt and generation exchanges found in the transcript".yellow());

                    return Ok(());
                }

                let mut best: Option<(usize, f32)> = None;
                let mut worst: Option<(usize, f32)> = None;

                for (i, exchange) in exchanges.iter().enumerate() {
                    let report = scorer.quality(exchange);

                    println!(
                        "📖 Exchange {}: relevance {}, novelty {}, quality {}",
                        (i + 1).to_string().yellow(),
                        format!("{:.2}", report.relevance).yellow(),
                        format!("{:.2}", report.novelty).yellow(),
                        format!("{:.2}", report.quality).yellow()
                    );

                    if best.map_or(true, |(_, quality)| report.quality > quality) {
                        best = Some((i, report.quality));
                    }

                    if worst.map_or(true, |(_, quality)| report.quality < quality) {
                        worst = Some((i, report.quality));
                    }
                }

                if let Some((i, quality)) = best {
                    println!();
                    println!("✅ Best exchange: {} (quality {})", (i + 1).to_string().green(), format!("{quality:.2}").yellow());
                    println!("   Prompt: {}", exchanges[i].prompt.lines().collect::<Vec<_>>().join(" "));
                    println!("   Generation: {}", exchanges[i].generation.lines().collect::<Vec<_>>().join(" "));
                }

                if let Some((i, quality)) = worst {
                    println!();
                    println!("📖 Worst exchange: {} (quality {})", (i + 1).to_string().red(), format!("{quality:.2}").yellow());
                    println!("   Prompt: {}", exchanges[i].prompt.lines().collect::<Vec<_>>().join(" "));
                    println!("   Generation: {}", exchanges[i].generation.lines().collect::<Vec<_>>().join(" "));
                }
            }
        }

        Ok(())
    }
}
