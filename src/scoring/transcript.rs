/// Line prefix opening a new prompt block.
pub const PROMPT_MARKER: &str = "Prompt:";

/// Line prefix switching the current exchange to its generation block.
pub const GENERATION_MARKER: &str = "Generation:";

#[derive(Default, Debug, Clone, PartialEq, Eq, Hash)]
/// Single prompt and generation pair read from a results transcript.
pub struct Exchange {
    pub prompt: String,
    pub generation: String
}

#[inline]
fn append(buffer: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }

    if !buffer.is_empty() {
        buffer.push('\n');
    }

    buffer.push_str(text);
}

/// Parse a plain text results transcript into prompt and generation
/// exchanges.
///
/// A line starting with `Prompt:` opens a new exchange and a line
/// starting with `Generation:` switches it to the generation block.
/// Both blocks continue over the following lines until the next
/// marker, and text placed on a marker line right after the marker
/// belongs to the block too.
///
/// Prompts without a following generation are dropped, generations
/// without a preceding prompt are ignored, and anything before the
/// first marker is skipped.
pub fn parse_transcript(text: impl AsRef<str>) -> Vec<Exchange> {
    let mut exchanges = Vec::new();

    let mut prompt: Option<String> = None;
    let mut generation: Option<String> = None;

    for line in text.as_ref().lines() {
        let line = line.trim();

        if let Some(text) = line.strip_prefix(PROMPT_MARKER) {
            if let (Some(prompt), Some(generation)) = (prompt.take(), generation.take()) {
                exchanges.push(Exchange {
                    prompt,
                    generation
                });
            }

            prompt = Some(text.trim().to_string());
            generation = None;
        }

        else if let Some(text) = line.strip_prefix(GENERATION_MARKER) {
            if prompt.is_some() {
                match &mut generation {
                    Some(generation) => append(generation, text.trim()),
                    None => generation = Some(text.trim().to_string())
                }
            }
        }

        else if let Some(generation) = &mut generation {
            append(generation, line);
        }

        else if let Some(prompt) = &mut prompt {
            append(prompt, line);
        }
    }

    if let (Some(prompt), Some(generation)) = (prompt, generation) {
        exchanges.push(Exchange {
            prompt,
            generation
        });
    }

    exchanges
}

#[test]
fn test_transcript_parsing() {
    let transcript = "
        Results of the experiment (model v2):

        Prompt: the cat sat
        on the mat
        Generation: and the dog
        slept nearby

        Prompt: empty one
        Prompt: hello world
        Generation: goodbye
    ";

    assert_eq!(parse_transcript(transcript), &[
        Exchange {
            prompt: String::from("the cat sat\non the mat"),
            generation: String::from("and the dog\nslept nearby")
        },

        Exchange {
            prompt: String::from("hello world"),
            generation: String::from("goodbye")
        }
    ]);
}

#[test]
fn test_transcript_markers_on_own_lines() {
    let transcript = "Prompt:\nfirst question\nGeneration:\nfirst answer";

    assert_eq!(parse_transcript(transcript), &[
        Exchange {
            prompt: String::from("first question"),
            generation: String::from("first answer")
        }
    ]);
}

#[test]
fn test_transcript_without_exchanges() {
    assert!(parse_transcript("").is_empty());
    assert!(parse_transcript("just some text\nwithout any markers").is_empty());
    assert!(parse_transcript("Prompt: never answered").is_empty());
    assert!(parse_transcript("Generation: never asked").is_empty());
}
