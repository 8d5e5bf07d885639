//! SubRip and JSON rendering of alignment and transcription results.
//!
//! Renderers only build strings; where they end up is the caller's business.

use std::fmt::Write as _;

use serde::Serialize;

use crate::params::OutputParams;
use crate::segmenter::Utterance;
use crate::strategy::CueReport;
use crate::subtitle::Cue;
use crate::time::format_srt_timecode;
use crate::{is_non_lexical, RecognizedBlock};

const LOW_CONFIDENCE_COLOR: &str = "#FF0000";
const UNRECOGNIZED_COLOR: &str = "#FF0000";
const KARAOKE_COLOR: &str = "#00FF00";

/// How aligned cues are laid out as subtitle entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CueRenderMode {
    /// One entry per cue with the cue's own timing.
    #[default]
    Dialogue,
    /// One entry per word, using the word's timing.
    Words,
    /// One entry per word showing the whole dialogue, highlighted up to that word.
    Karaoke,
}

/// Numbered SubRip entries.
#[derive(Debug, Clone, Default)]
pub struct SrtDocument {
    text: String,
    entries: usize,
}

impl SrtDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, start_ms: u64, end_ms: u64, body: &str) {
        self.entries += 1;
        // Writing to a String cannot fail.
        let _ = write!(
            self.text,
            "{}\n{} --> {}\n{}\n\n",
            self.entries,
            format_srt_timecode(start_ms),
            format_srt_timecode(end_ms),
            body
        );
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

fn colored(text: &str, color: &str) -> String {
    format!("<font color='{color}'>{text}</font>")
}

/// One entry per lexical token of each block.
pub fn render_transcript<'a, I>(blocks: I, params: &OutputParams) -> String
where
    I: IntoIterator<Item = &'a RecognizedBlock>,
{
    let mut doc = SrtDocument::new();
    for block in blocks {
        for token in &block.tokens {
            if is_non_lexical(&token.text) {
                continue;
            }
            let low_confidence = token.confidence < params.low_confidence_threshold;
            if params.highlight_low_confidence && low_confidence {
                doc.push(
                    token.start_ms,
                    token.end_ms,
                    &colored(&token.text, LOW_CONFIDENCE_COLOR),
                );
            } else {
                doc.push(token.start_ms, token.end_ms, &token.text);
            }
        }
    }
    doc.into_string()
}

/// Transcript of utterances produced by the segmenter.
pub fn render_utterances(utterances: &[Utterance], params: &OutputParams) -> String {
    render_transcript(utterances.iter().map(|utterance| &utterance.block), params)
}

/// Renders aligned cues. With `mark_unrecognized`, words the aligner never
/// matched are colored in the `Words` and `Karaoke` modes.
pub fn render_cues(cues: &[Cue], mode: CueRenderMode, mark_unrecognized: bool) -> String {
    let mut doc = SrtDocument::new();

    for cue in cues.iter().filter(|cue| !cue.is_empty()) {
        match mode {
            CueRenderMode::Dialogue => doc.push(cue.start_ms(), cue.end_ms(), cue.dialogue()),
            CueRenderMode::Words => {
                for word in &cue.words {
                    let body = if mark_unrecognized && !word.recognized {
                        colored(&word.text, UNRECOGNIZED_COLOR)
                    } else {
                        word.text.clone()
                    };
                    doc.push(word.start_ms, word.end_ms, &body);
                }
            }
            CueRenderMode::Karaoke => {
                for (current, word) in cue.words.iter().enumerate() {
                    doc.push(
                        word.start_ms,
                        word.end_ms,
                        &karaoke_line(cue, current, mark_unrecognized),
                    );
                }
            }
        }
    }

    doc.into_string()
}

/// Dialogue with words `0..=current` highlighted.
fn karaoke_line(cue: &Cue, current: usize, mark_unrecognized: bool) -> String {
    let (sung, rest) = cue.words.split_at(current + 1);
    let sung = sung
        .iter()
        .map(|word| {
            if mark_unrecognized && !word.recognized {
                colored(&word.text, UNRECOGNIZED_COLOR)
            } else {
                word.text.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    let mut line = colored(&sung, KARAOKE_COLOR);
    for word in rest {
        line.push(' ');
        line.push_str(&word.text);
    }
    line
}

#[derive(Debug, Serialize)]
struct AlignmentJson<'a> {
    cues: &'a [Cue],
    reports: &'a [CueReport],
}

/// Aligned cues and per-cue reports as pretty-printed JSON.
pub fn alignment_json(cues: &[Cue], reports: &[CueReport]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&AlignmentJson { cues, reports })
}

pub fn utterances_json(utterances: &[Utterance]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(utterances)
}
