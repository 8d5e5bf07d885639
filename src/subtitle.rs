//! Subtitle cues and their words.
//!
//! A [`Cue`] keeps its own start/end as fixed anchors; only its [`Word`]s are
//! rewritten during alignment.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::SubtitleError;
use crate::time::parse_srt_timecode;

static STYLE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>|\{\\[^}]*\}").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Word {
    /// Word as written in the dialogue.
    pub text: String,
    /// Lowercase match key with surrounding punctuation removed.
    #[serde(skip)]
    pub key: String,
    pub recognized: bool,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl Word {
    fn new(text: &str, key: String, start_ms: u64, end_ms: u64) -> Self {
        Self {
            text: text.to_string(),
            key,
            recognized: false,
            start_ms,
            end_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cue {
    start_ms: u64,
    end_ms: u64,
    dialogue: String,
    pub words: Vec<Word>,
}

impl Cue {
    /// Builds a cue, splitting `dialogue` into words that all carry the cue's
    /// own time range until [`Cue::estimate_word_times`] runs.
    pub fn new(start_ms: u64, end_ms: u64, dialogue: &str) -> Self {
        let dialogue = dialogue.trim().to_string();
        let words = split_words(&dialogue)
            .into_iter()
            .map(|(text, key)| Word::new(text, key, start_ms, end_ms))
            .collect();

        Self {
            start_ms,
            end_ms,
            dialogue,
            words,
        }
    }

    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }

    pub fn end_ms(&self) -> u64 {
        self.end_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    pub fn dialogue(&self) -> &str {
        &self.dialogue
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Baseline pass: spreads the words evenly over the cue and clears their
    /// recognized flags.
    pub fn estimate_word_times(&mut self) {
        let count = self.words.len() as u64;
        if count == 0 {
            return;
        }
        let duration = self.duration_ms();
        let start = self.start_ms;

        for (i, word) in self.words.iter_mut().enumerate() {
            let i = i as u64;
            word.recognized = false;
            word.start_ms = start + duration * i / count;
            word.end_ms = start + duration * (i + 1) / count;
        }
    }

    pub fn recognized_count(&self) -> usize {
        self.words.iter().filter(|word| word.recognized).count()
    }
}

/// Splits dialogue on whitespace into `(display, key)` pairs. Tokens that are
/// nothing but punctuation are dropped.
fn split_words(dialogue: &str) -> Vec<(&str, String)> {
    dialogue
        .split_whitespace()
        .filter_map(|text| {
            let key = text
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            (!key.is_empty()).then_some((text, key))
        })
        .collect()
}

/// Parses SubRip text into cues, in file order.
///
/// ```rust
/// use subalign_rs::subtitle::parse_srt;
///
/// let cues = parse_srt("1\n00:00:19,320 --> 00:00:21,056\nWhy are you boring?\n")?;
/// assert_eq!(cues[0].start_ms(), 19_320);
/// assert_eq!(cues[0].words.len(), 4);
/// # Ok::<(), subalign_rs::SubtitleError>(())
/// ```
pub fn parse_srt(content: &str) -> Result<Vec<Cue>, SubtitleError> {
    let content = content.trim_start_matches('\u{feff}');
    let mut cues = Vec::new();
    let mut lines = content.lines().enumerate().peekable();

    loop {
        while lines.peek().is_some_and(|(_, line)| line.trim().is_empty()) {
            lines.next();
        }
        let Some((mut line_no, mut line)) = lines.next() else {
            break;
        };

        if !line.contains("-->") {
            // Sequence number; the timing line must follow.
            match lines.next() {
                Some((next_no, next)) => {
                    line_no = next_no;
                    line = next;
                }
                None => {
                    return Err(SubtitleError::Parse {
                        line: line_no + 1,
                        message: "cue index without a timing line".to_string(),
                    })
                }
            }
        }

        let (start_ms, end_ms) = parse_timing_line(line).ok_or_else(|| SubtitleError::Parse {
            line: line_no + 1,
            message: format!("invalid timing line: {line:?}"),
        })?;
        if end_ms < start_ms {
            return Err(SubtitleError::Parse {
                line: line_no + 1,
                message: format!("cue ends before it starts: {line:?}"),
            });
        }

        let mut text_lines = Vec::new();
        while let Some((_, text)) = lines.next_if(|(_, text)| !text.trim().is_empty()) {
            text_lines.push(text.trim());
        }
        let dialogue = STYLE_TAG.replace_all(&text_lines.join(" "), "").into_owned();
        cues.push(Cue::new(start_ms, end_ms, &dialogue));
    }

    Ok(cues)
}

fn parse_timing_line(line: &str) -> Option<(u64, u64)> {
    let (start, rest) = line.split_once("-->")?;
    // Position hints such as "X1:100" may follow the end time.
    let end = rest.split_whitespace().next()?;
    Some((parse_srt_timecode(start)?, parse_srt_timecode(end)?))
}

pub fn read_srt(path: &Path) -> Result<Vec<Cue>, SubtitleError> {
    let content = std::fs::read_to_string(path).map_err(|source| SubtitleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let cues = parse_srt(&content)?;
    log::info!("Parsed {} cues from {}", cues.len(), path.display());
    Ok(cues)
}
