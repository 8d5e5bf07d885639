//! Reference-free transcription of a continuous stream.
//!
//! Audio goes to the decoder in fixed-size chunks. After each chunk the
//! decoder's speech/silence state drives a two-state machine: the first speech
//! chunk opens an utterance, the first silence chunk after that closes it and
//! collects the hypothesis. The decoder is restarted after every close, so
//! nothing carries over from one utterance to the next.

use serde::Serialize;

use crate::error::DecodeError;
use crate::params::SegmenterParams;
use crate::time::{sample_offset_to_ms, SAMPLE_RATE_HZ};
use crate::{DecoderSession, RecognizedBlock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// No speech seen since the decoder utterance began.
    Idle,
    /// Speech is in progress.
    Open,
}

/// A closed utterance with stream-relative timing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Utterance {
    /// Stream time at which the decoder utterance began.
    pub start_ms: u64,
    /// Stream time of the chunk that closed it.
    pub end_ms: u64,
    pub text: String,
    pub block: RecognizedBlock,
}

#[derive(Debug, Clone, Default)]
pub struct UtteranceSegmenter {
    params: SegmenterParams,
}

impl UtteranceSegmenter {
    pub fn new(params: SegmenterParams) -> Self {
        Self { params }
    }

    /// Transcribes `samples`, collecting every utterance that had a hypothesis.
    pub fn transcribe<D>(&self, session: &mut D, samples: &[i16]) -> Vec<Utterance>
    where
        D: DecoderSession + ?Sized,
    {
        let mut utterances = Vec::new();
        self.transcribe_with(session, samples, |utterance| utterances.push(utterance));
        utterances
    }

    /// Like [`UtteranceSegmenter::transcribe`], handing each utterance to
    /// `emit` as soon as it closes.
    pub fn transcribe_with<D, F>(&self, session: &mut D, samples: &[i16], mut emit: F)
    where
        D: DecoderSession + ?Sized,
        F: FnMut(Utterance),
    {
        let chunk_size = self.params.chunk_size.max(1);
        let mut run = SegmenterRun::new(session);

        for chunk in samples.chunks(chunk_size) {
            if let Some(utterance) = run.process_chunk(chunk) {
                emit(utterance);
            }
        }

        if let Some(utterance) = run.finish() {
            emit(utterance);
        }
    }
}

/// Mutable state of one pass over a stream.
struct SegmenterRun<'a, D: ?Sized> {
    session: &'a mut D,
    state: SegmenterState,
    /// Whether the decoder currently has an utterance begun.
    decoding: bool,
    /// Samples consumed so far.
    offset: usize,
    /// Sample offset at which the current decoder utterance began.
    origin: usize,
}

impl<'a, D: DecoderSession + ?Sized> SegmenterRun<'a, D> {
    fn new(session: &'a mut D) -> Self {
        let mut run = Self {
            session,
            state: SegmenterState::Idle,
            decoding: false,
            offset: 0,
            origin: 0,
        };
        run.restart();
        run
    }

    fn process_chunk(&mut self, chunk: &[i16]) -> Option<Utterance> {
        if !self.decoding {
            self.restart();
        }
        if !self.decoding {
            // The decoder refused a new utterance; this chunk is lost.
            self.offset += chunk.len();
            return None;
        }

        let fed = self.session.feed(chunk);
        self.offset += chunk.len();
        if let Err(err) = fed {
            self.abort(err);
            return None;
        }

        let in_speech = self.session.is_in_speech();
        match (self.state, in_speech) {
            (SegmenterState::Idle, true) => {
                log::debug!("Utterance opened at {} ms", self.ms(self.offset));
                self.state = SegmenterState::Open;
                None
            }
            (SegmenterState::Open, false) => {
                let utterance = self.close();
                self.restart();
                utterance
            }
            _ => None,
        }
    }

    /// Ends the stream, emitting the trailing utterance if speech was open.
    fn finish(mut self) -> Option<Utterance> {
        if !self.decoding {
            return None;
        }
        if self.state == SegmenterState::Open {
            return self.close();
        }
        if let Err(err) = self.session.cancel_utterance() {
            log::warn!("Failed to cancel trailing silence: {err}");
        }
        self.decoding = false;
        None
    }

    fn close(&mut self) -> Option<Utterance> {
        self.state = SegmenterState::Idle;
        self.decoding = false;

        let hypothesis = match self.session.end_utterance() {
            Ok(hypothesis) => hypothesis?,
            Err(err) => {
                log::warn!("Dropping utterance at {} ms: {err}", self.ms(self.origin));
                return None;
            }
        };

        let start_ms = self.ms(self.origin);
        let block = RecognizedBlock::from_tokens(
            self.session.segmentation(),
            self.session.frame_rate(),
            start_ms,
        );
        log::info!("Recognized {:?}", hypothesis.text);

        Some(Utterance {
            start_ms,
            end_ms: self.ms(self.offset),
            text: hypothesis.text,
            block,
        })
    }

    fn restart(&mut self) {
        self.state = SegmenterState::Idle;
        self.origin = self.offset;
        match self.session.begin_utterance() {
            Ok(()) => self.decoding = true,
            Err(err) => {
                log::warn!("Failed to begin utterance at {} ms: {err}", self.ms(self.offset));
                self.decoding = false;
            }
        }
    }

    fn abort(&mut self, err: DecodeError) {
        log::warn!(
            "Discarding utterance begun at {} ms: {err}",
            self.ms(self.origin)
        );
        self.state = SegmenterState::Idle;
        self.decoding = false;
    }

    fn ms(&self, offset: usize) -> u64 {
        sample_offset_to_ms(offset, SAMPLE_RATE_HZ)
    }
}
