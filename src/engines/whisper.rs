use std::path::{Path, PathBuf};

use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperState,
};

use crate::engines::energy::{EnergyEndpointer, SpeechBuffer};
use crate::engines::pieces::{merge_pieces, TokenPiece};
use crate::error::{ConfigError, DecodeError};
use crate::grammar::fsg_words;
use crate::time::{ms_to_sample_offset, SAMPLE_RATE_HZ};
use crate::{is_non_lexical, DecoderConfig, DecoderSession, Hypothesis, RecognizedToken};

/// whisper.cpp timestamps are in centiseconds.
const FRAME_RATE: u32 = 100;
const SAMPLES_PER_FRAME: usize = (SAMPLE_RATE_HZ / FRAME_RATE) as usize;
/// whisper.cpp refuses input shorter than one second; shorter utterances are
/// padded with silence up to this length.
const MIN_SAMPLES: usize = SAMPLE_RATE_HZ as usize * 21 / 20;

#[derive(Debug, Clone)]
pub struct WhisperDecoderParams {
    pub language: Option<String>,
    pub n_threads: i32,
    /// RMS level, on the [-1, 1] sample scale, at which a chunk counts as speech.
    pub speech_threshold: f32,
    /// Quiet chunks tolerated before speech is considered over.
    pub hangover_chunks: usize,
    /// Audio kept ahead of the first speech chunk; older silence is discarded.
    pub pre_roll_ms: u64,
}

impl Default for WhisperDecoderParams {
    fn default() -> Self {
        Self {
            language: Some("en".to_string()),
            n_threads: 4,
            speech_threshold: 0.02,
            hangover_chunks: 3,
            pre_roll_ms: 300,
        }
    }
}

/// Decoder session backed by a whisper.cpp model.
pub struct WhisperDecoder {
    model_path: PathBuf,
    params: WhisperDecoderParams,
    state: WhisperState,
    // Kept alive for the lifetime of `state`.
    _context: WhisperContext,
    audio: SpeechBuffer,
    in_utterance: bool,
    prompt: Option<String>,
    tokens: Vec<RecognizedToken>,
}

impl WhisperDecoder {
    pub fn configure(
        config: &DecoderConfig,
        params: WhisperDecoderParams,
    ) -> Result<Self, ConfigError> {
        let model_path = &config.acoustic_model_path;
        if !model_path.exists() {
            return Err(ConfigError::ModelNotFound {
                path: model_path.clone(),
            });
        }
        for (name, path) in [
            ("language model", &config.language_model_path),
            ("dictionary", &config.dictionary_path),
            ("log file", &config.log_path),
        ] {
            if let Some(path) = path {
                log::debug!("Whisper ignores {name} {}", path.display());
            }
        }

        log::info!("Loading whisper model {}", model_path.display());
        let context = WhisperContext::new_with_params(
            model_path
                .to_str()
                .ok_or_else(|| ConfigError::engine("load whisper model", "invalid model path"))?,
            WhisperContextParameters::default(),
        )
        .map_err(|e| ConfigError::engine("load whisper model", e))?;
        let state = context
            .create_state()
            .map_err(|e| ConfigError::engine("create whisper state", e))?;

        let audio = SpeechBuffer::new(
            EnergyEndpointer::new(params.speech_threshold, params.hangover_chunks),
            ms_to_sample_offset(params.pre_roll_ms, SAMPLE_RATE_HZ),
            SAMPLES_PER_FRAME,
        );
        Ok(Self {
            model_path: model_path.clone(),
            params,
            state,
            _context: context,
            audio,
            in_utterance: false,
            prompt: None,
            tokens: Vec::new(),
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    fn run_inference(&mut self) -> Result<Vec<RecognizedToken>, DecodeError> {
        let mut audio = self.audio.samples().to_vec();
        if audio.len() < MIN_SAMPLES {
            audio.resize(MIN_SAMPLES, 0.0);
        }

        let mut full_params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        full_params.set_language(self.params.language.as_deref());
        full_params.set_n_threads(self.params.n_threads);
        full_params.set_token_timestamps(true);
        full_params.set_print_special(false);
        full_params.set_print_progress(false);
        full_params.set_print_realtime(false);
        full_params.set_print_timestamps(false);
        full_params.set_suppress_blank(true);
        full_params.set_no_context(true);
        if let Some(prompt) = self.prompt.as_deref() {
            full_params.set_initial_prompt(prompt);
        }

        self.state
            .full(full_params, &audio)
            .map_err(|e| DecodeError::engine("whisper inference", e))?;

        let num_segments = self
            .state
            .full_n_segments()
            .map_err(|e| DecodeError::engine("read whisper segments", e))?;

        let mut pieces = Vec::new();
        for segment in 0..num_segments {
            let num_tokens = self
                .state
                .full_n_tokens(segment)
                .map_err(|e| DecodeError::engine("read whisper tokens", e))?;
            for token in 0..num_tokens {
                // Pieces that split a multi-byte character are not valid UTF-8.
                let Ok(text) = self.state.full_get_token_text(segment, token) else {
                    continue;
                };
                let data = self
                    .state
                    .full_get_token_data(segment, token)
                    .map_err(|e| DecodeError::engine("read whisper token data", e))?;
                pieces.push(TokenPiece {
                    text,
                    start_frame: data.t0.max(0) as u32,
                    end_frame: data.t1.max(0) as u32,
                    probability: data.p,
                });
            }
        }

        // Frames count from the first buffered sample, not the utterance start.
        let shift = u32::try_from(self.audio.dropped_frames()).unwrap_or(u32::MAX);
        let tokens = merge_pieces(pieces)
            .into_iter()
            .map(|token| RecognizedToken {
                start_frame: token.start_frame.saturating_add(shift),
                end_frame: token.end_frame.saturating_add(shift),
                ..token
            })
            .collect();
        Ok(tokens)
    }
}

impl DecoderSession for WhisperDecoder {
    fn begin_utterance(&mut self) -> Result<(), DecodeError> {
        self.audio.clear();
        self.tokens.clear();
        self.in_utterance = true;
        Ok(())
    }

    fn feed(&mut self, samples: &[i16]) -> Result<(), DecodeError> {
        if !self.in_utterance {
            return Err(DecodeError::NoUtterance);
        }
        self.audio.push(samples);
        Ok(())
    }

    fn cancel_utterance(&mut self) -> Result<(), DecodeError> {
        log::debug!(
            "Cancelling utterance with {} buffered samples",
            self.audio.samples().len()
        );
        self.audio.clear();
        self.tokens.clear();
        self.in_utterance = false;
        Ok(())
    }

    fn end_utterance(&mut self) -> Result<Option<Hypothesis>, DecodeError> {
        if !self.in_utterance {
            return Err(DecodeError::NoUtterance);
        }
        self.in_utterance = false;

        self.tokens = self.run_inference()?;
        let words: Vec<&RecognizedToken> = self
            .tokens
            .iter()
            .filter(|token| !is_non_lexical(&token.text))
            .collect();
        if words.is_empty() {
            return Ok(None);
        }

        let text = words
            .iter()
            .map(|token| token.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let mean_confidence =
            words.iter().map(|token| token.confidence).sum::<f32>() / words.len() as f32;

        Ok(Some(Hypothesis {
            text,
            score: (mean_confidence * 1000.0).round() as i32,
        }))
    }

    fn segmentation(&self) -> Vec<RecognizedToken> {
        self.tokens.clone()
    }

    fn frame_rate(&self) -> u32 {
        FRAME_RATE
    }

    fn is_in_speech(&self) -> bool {
        self.audio.in_speech()
    }

    fn use_grammar(&mut self, grammar_path: &Path) -> Result<(), ConfigError> {
        let fsg = std::fs::read_to_string(grammar_path).map_err(|source| {
            ConfigError::GrammarIo {
                path: grammar_path.to_path_buf(),
                source,
            }
        })?;
        let words = fsg_words(&fsg);
        if words.is_empty() {
            return Err(ConfigError::InvalidGrammar {
                path: grammar_path.to_path_buf(),
                message: "no word transitions".to_string(),
            });
        }

        log::debug!("Restricting whisper to {} grammar words", words.len());
        self.prompt = Some(words.join(" "));
        Ok(())
    }

    fn use_language_model(&mut self) -> Result<(), ConfigError> {
        self.prompt = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_is_a_config_error() {
        let config = DecoderConfig {
            acoustic_model_path: PathBuf::from("/nonexistent/model.bin"),
            ..DecoderConfig::default()
        };
        let err = WhisperDecoder::configure(&config, WhisperDecoderParams::default())
            .err()
            .expect("configure should fail");
        assert!(err.to_string().contains("not found"), "got: {err}");
    }
}
