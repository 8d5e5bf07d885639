pub mod aligner;
pub mod audio;
pub mod distance;
pub mod engines;
pub mod error;
pub mod grammar;
pub mod output;
pub mod params;
pub mod segmenter;
pub mod strategy;
pub mod subtitle;
pub mod time;

use std::path::{Path, PathBuf};

use serde::Serialize;

pub use aligner::CueWordAligner;
pub use error::{AudioError, ConfigError, CueError, DecodeError, ParamsError, SubtitleError};
pub use params::{AlignmentParams, OutputParams, Params, SegmenterParams};
pub use segmenter::UtteranceSegmenter;
pub use strategy::{AlignmentStrategy, CueDriver, CueOutcome, CueReport, ForcedAlignment};
pub use subtitle::{Cue, Word};

/// Paths handed to a decoder engine when a session is opened.
#[derive(Debug, Clone, Default)]
pub struct DecoderConfig {
    pub acoustic_model_path: PathBuf,
    pub language_model_path: Option<PathBuf>,
    pub dictionary_path: Option<PathBuf>,
    pub log_path: Option<PathBuf>,
}

/// One token of a decoder segmentation, in decoder frames.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedToken {
    pub text: String,
    pub start_frame: u32,
    pub end_frame: u32,
    /// Posterior confidence in [0, 1].
    pub confidence: f32,
}

impl RecognizedToken {
    pub fn is_non_lexical(&self) -> bool {
        is_non_lexical(&self.text)
    }
}

/// Utterance markers, silence and bracketed fillers such as `[BREATH]`.
pub fn is_non_lexical(text: &str) -> bool {
    matches!(text, "<s>" | "</s>" | "<sil>") || text.starts_with('[')
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hypothesis {
    pub text: String,
    pub score: i32,
}

/// A recognized token after frame-to-time conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedToken {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub confidence: f32,
    /// Index of the reference word this token was matched to, if any.
    pub matched_word: Option<usize>,
}

/// Diagnostic report of everything the decoder emitted for one cue or utterance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecognizedBlock {
    pub tokens: Vec<AlignedToken>,
}

impl RecognizedBlock {
    /// Unaligned report of `tokens`, with frame times anchored at `origin_ms`.
    pub fn from_tokens<I>(tokens: I, frame_rate: u32, origin_ms: u64) -> Self
    where
        I: IntoIterator<Item = RecognizedToken>,
    {
        let tokens = tokens
            .into_iter()
            .map(|token| AlignedToken {
                start_ms: origin_ms + time::frame_to_ms(token.start_frame, frame_rate),
                end_ms: origin_ms + time::frame_to_ms(token.end_frame, frame_rate),
                confidence: token.confidence,
                matched_word: None,
                text: token.text,
            })
            .collect();
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn matched_count(&self) -> usize {
        self.tokens
            .iter()
            .filter(|token| token.matched_word.is_some())
            .count()
    }
}

/// Result of one begin/feed/end cycle that produced a hypothesis.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub hypothesis: Hypothesis,
    pub tokens: Vec<RecognizedToken>,
    pub frame_rate: u32,
}

/// An open speech decoder session.
///
/// A session owns the engine's mutable state (active grammar, utterance
/// buffer). Every state-changing call takes `&mut self`, so a session can
/// never be driven from two places at once; parallel work needs one session
/// per worker.
pub trait DecoderSession {
    /// Starts a new utterance, discarding anything left from an unfinished one.
    fn begin_utterance(&mut self) -> Result<(), DecodeError>;

    fn feed(&mut self, samples: &[i16]) -> Result<(), DecodeError>;

    /// Finishes the current utterance. `None` means the engine produced no
    /// hypothesis (silence, or audio too short).
    fn end_utterance(&mut self) -> Result<Option<Hypothesis>, DecodeError>;

    /// Drops the open utterance without decoding it.
    ///
    /// Engines with no cheaper path end the utterance and discard the result.
    fn cancel_utterance(&mut self) -> Result<(), DecodeError> {
        self.end_utterance().map(|_| ())
    }

    /// Tokens of the last finished utterance, in frame order.
    fn segmentation(&self) -> Vec<RecognizedToken>;

    fn frame_rate(&self) -> u32;

    /// Speech/silence state of the audio fed so far in the open utterance.
    fn is_in_speech(&self) -> bool;

    /// Restricts recognition to the grammar at `grammar_path`.
    fn use_grammar(&mut self, grammar_path: &Path) -> Result<(), ConfigError>;

    /// Returns to the general language model after a grammar-restricted decode.
    fn use_language_model(&mut self) -> Result<(), ConfigError>;

    /// Decodes `samples` as one utterance.
    fn decode_samples(&mut self, samples: &[i16]) -> Result<Option<Decoded>, DecodeError> {
        self.begin_utterance()?;
        self.feed(samples)?;
        let Some(hypothesis) = self.end_utterance()? else {
            return Ok(None);
        };

        Ok(Some(Decoded {
            hypothesis,
            tokens: self.segmentation(),
            frame_rate: self.frame_rate(),
        }))
    }
}
