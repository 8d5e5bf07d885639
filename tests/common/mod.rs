#![allow(dead_code)]

use std::{cell::RefCell, collections::VecDeque, path::Path, path::PathBuf, rc::Rc};

use subalign_rs::{
    grammar::fsg_words, ConfigError, DecodeError, DecoderSession, Hypothesis, RecognizedToken,
};

pub const FRAME_RATE: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Begin,
    Feed(usize),
    End,
    Cancel,
    UseGrammar(PathBuf),
    UseLanguageModel,
}

/// What the decoder hands back when an utterance ends.
#[derive(Debug, Clone)]
pub enum Response {
    Tokens(Vec<RecognizedToken>),
    NoHypothesis,
    Fail(&'static str),
}

/// Decoder double driven by scripts.
///
/// Each `end_utterance` pops the next [`Response`]; with an active grammar it
/// instead recognizes exactly the grammar's words, optionally separated by
/// `<sil>` tokens. Each `feed` pops the next speech flag.
pub struct ScriptedDecoder {
    responses: VecDeque<Response>,
    speech: VecDeque<bool>,
    in_speech: bool,
    grammar_words: Option<Vec<String>>,
    pub silence_between_grammar_words: bool,
    pub fail_grammar: bool,
    pub fail_feed_at: Option<usize>,
    feeds: usize,
    segmentation: Vec<RecognizedToken>,
    calls: Rc<RefCell<Vec<Call>>>,
}

impl ScriptedDecoder {
    pub fn with_responses(responses: Vec<Response>) -> (Self, Rc<RefCell<Vec<Call>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                responses: responses.into(),
                speech: VecDeque::new(),
                in_speech: false,
                grammar_words: None,
                silence_between_grammar_words: false,
                fail_grammar: false,
                fail_feed_at: None,
                feeds: 0,
                segmentation: Vec::new(),
                calls: Rc::clone(&calls),
            },
            calls,
        )
    }

    pub fn with_speech(
        speech: &[bool],
        responses: Vec<Response>,
    ) -> (Self, Rc<RefCell<Vec<Call>>>) {
        let (mut decoder, calls) = Self::with_responses(responses);
        decoder.speech = speech.iter().copied().collect();
        (decoder, calls)
    }

    fn grammar_tokens(&self, words: &[String]) -> Vec<RecognizedToken> {
        let mut tokens = Vec::new();
        let mut frame = 0;
        for word in words {
            if self.silence_between_grammar_words {
                tokens.push(token("<sil>", frame, frame + 5));
                frame += 5;
            }
            tokens.push(token(word, frame, frame + 20));
            frame += 20;
        }
        tokens
    }
}

impl DecoderSession for ScriptedDecoder {
    fn begin_utterance(&mut self) -> Result<(), DecodeError> {
        self.calls.borrow_mut().push(Call::Begin);
        self.in_speech = false;
        Ok(())
    }

    fn feed(&mut self, samples: &[i16]) -> Result<(), DecodeError> {
        self.calls.borrow_mut().push(Call::Feed(samples.len()));
        let index = self.feeds;
        self.feeds += 1;
        if self.fail_feed_at == Some(index) {
            return Err(DecodeError::Engine {
                context: "feed",
                message: "scripted feed failure".to_string(),
            });
        }
        if let Some(in_speech) = self.speech.pop_front() {
            self.in_speech = in_speech;
        }
        Ok(())
    }

    fn end_utterance(&mut self) -> Result<Option<Hypothesis>, DecodeError> {
        self.calls.borrow_mut().push(Call::End);

        let tokens = match &self.grammar_words {
            Some(words) => self.grammar_tokens(words),
            None => match self.responses.pop_front() {
                Some(Response::Tokens(tokens)) => tokens,
                Some(Response::NoHypothesis) | None => {
                    self.segmentation.clear();
                    return Ok(None);
                }
                Some(Response::Fail(message)) => {
                    self.segmentation.clear();
                    return Err(DecodeError::Engine {
                        context: "end utterance",
                        message: message.to_string(),
                    });
                }
            },
        };

        let text = tokens
            .iter()
            .filter(|token| !token.is_non_lexical())
            .map(|token| token.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        self.segmentation = tokens;
        Ok(Some(Hypothesis { text, score: 0 }))
    }

    fn cancel_utterance(&mut self) -> Result<(), DecodeError> {
        self.calls.borrow_mut().push(Call::Cancel);
        self.segmentation.clear();
        self.in_speech = false;
        Ok(())
    }

    fn segmentation(&self) -> Vec<RecognizedToken> {
        self.segmentation.clone()
    }

    fn frame_rate(&self) -> u32 {
        FRAME_RATE
    }

    fn is_in_speech(&self) -> bool {
        self.in_speech
    }

    fn use_grammar(&mut self, grammar_path: &Path) -> Result<(), ConfigError> {
        self.calls
            .borrow_mut()
            .push(Call::UseGrammar(grammar_path.to_path_buf()));
        if self.fail_grammar {
            return Err(ConfigError::InvalidGrammar {
                path: grammar_path.to_path_buf(),
                message: "scripted grammar failure".to_string(),
            });
        }
        let fsg = std::fs::read_to_string(grammar_path).map_err(|source| {
            ConfigError::GrammarIo {
                path: grammar_path.to_path_buf(),
                source,
            }
        })?;
        self.grammar_words = Some(fsg_words(&fsg));
        Ok(())
    }

    fn use_language_model(&mut self) -> Result<(), ConfigError> {
        self.calls.borrow_mut().push(Call::UseLanguageModel);
        self.grammar_words = None;
        Ok(())
    }
}

pub fn token(text: &str, start_frame: u32, end_frame: u32) -> RecognizedToken {
    RecognizedToken {
        text: text.to_string(),
        start_frame,
        end_frame,
        confidence: 0.9,
    }
}

/// Tokens for `words`, 20 frames each, back to back.
pub fn tokens(words: &[&str]) -> Vec<RecognizedToken> {
    words
        .iter()
        .enumerate()
        .map(|(i, word)| token(word, i as u32 * 20, i as u32 * 20 + 20))
        .collect()
}
