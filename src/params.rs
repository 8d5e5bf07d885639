use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ParamsError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentParams {
    /// How far past the number of tokens seen so far a match may land.
    pub window_size: usize,
    /// A token matches when `distance < match_threshold * longer_length`.
    pub match_threshold: f64,
}

impl Default for AlignmentParams {
    fn default() -> Self {
        Self {
            window_size: 3,
            match_threshold: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterParams {
    /// Samples fed to the decoder between speech/silence checks.
    pub chunk_size: usize,
}

impl Default for SegmenterParams {
    fn default() -> Self {
        Self { chunk_size: 2048 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputParams {
    pub low_confidence_threshold: f32,
    pub highlight_low_confidence: bool,
}

impl Default for OutputParams {
    fn default() -> Self {
        Self {
            low_confidence_threshold: 0.7,
            highlight_low_confidence: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    pub alignment: AlignmentParams,
    pub segmenter: SegmenterParams,
    pub output: OutputParams,
}

impl Params {
    /// Loads parameters from a JSON file; absent fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ParamsError> {
        let data = std::fs::read_to_string(path).map_err(|source| ParamsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ParamsError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}
