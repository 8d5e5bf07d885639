use std::path::PathBuf;

use thiserror::Error;

/// Decoder or grammar setup failure.
///
/// Fatal when raised by the initial `configure`; recoverable per cue when raised
/// while swapping in a forced-alignment grammar.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("acoustic model not found at: {}", path.display())]
    ModelNotFound { path: PathBuf },
    #[error("failed to write grammar {}: {source}", path.display())]
    GrammarIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("grammar {} is invalid: {message}", path.display())]
    InvalidGrammar { path: PathBuf, message: String },
    #[error("cannot build a grammar for a cue without words")]
    EmptyGrammar,
    #[error("{context}: {message}")]
    Engine {
        context: &'static str,
        message: String,
    },
}

impl ConfigError {
    pub fn engine(context: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Engine {
            context,
            message: err.to_string(),
        }
    }
}

/// Engine failure in the middle of an utterance.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("no utterance in progress")]
    NoUtterance,
    #[error("{context}: {message}")]
    Engine {
        context: &'static str,
        message: String,
    },
}

impl DecodeError {
    pub fn engine(context: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Engine {
            context,
            message: err.to_string(),
        }
    }
}

/// Failure confined to a single cue. The driver logs it and moves on.
#[derive(Debug, Error)]
pub enum CueError {
    #[error("grammar setup failed: {0}")]
    Config(#[from] ConfigError),
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
}

#[derive(Debug, Error)]
pub enum SubtitleError {
    #[error("I/O error while reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("expected {expected}, found {found}")]
    UnsupportedFormat { expected: String, found: String },
}

#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("I/O error while reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON parse error in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
