//! Per-cue alignment strategies and the driver loop over a subtitle track.

use serde::Serialize;

use crate::aligner::CueWordAligner;
use crate::audio::PcmBuffer;
use crate::error::CueError;
use crate::grammar::{FsgGrammarWriter, GrammarBuilder};
use crate::subtitle::Cue;
use crate::{DecoderSession, RecognizedBlock};

/// How each cue's audio is decoded before alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AlignmentStrategy {
    /// Decode with the session's general language model.
    #[default]
    Recognition,
    /// Decode with a grammar restricted to the cue's own words.
    ForcedGrammar,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CueOutcome {
    Aligned { block: RecognizedBlock },
    NoHypothesis,
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CueReport {
    pub cue_index: usize,
    pub outcome: CueOutcome,
}

/// Decodes one cue with the session as configured and aligns the result.
///
/// Returns `Ok(None)` when the decoder has no hypothesis for the slice.
pub fn recognize_cue<D>(
    session: &mut D,
    aligner: &CueWordAligner,
    pcm: &PcmBuffer,
    cue: &mut Cue,
) -> Result<Option<RecognizedBlock>, CueError>
where
    D: DecoderSession + ?Sized,
{
    let samples = pcm.cue_slice(cue.start_ms(), cue.end_ms());
    if samples.is_empty() {
        log::debug!("Cue at {} ms has no audio", cue.start_ms());
        return Ok(None);
    }

    let Some(decoded) = session.decode_samples(samples)? else {
        return Ok(None);
    };

    log::info!(
        "Cue {} --> {} recognized {:?}, actual {:?}",
        cue.start_ms(),
        cue.end_ms(),
        decoded.hypothesis.text,
        cue.dialogue()
    );
    Ok(Some(aligner.align(cue, decoded.tokens, decoded.frame_rate)))
}

/// Forced alignment: swap in a grammar built from the cue's words, decode the
/// cue, and put the language model back.
#[derive(Debug, Clone)]
pub struct ForcedAlignment<G> {
    grammar: G,
}

impl<G: GrammarBuilder> ForcedAlignment<G> {
    pub fn new(grammar: G) -> Self {
        Self { grammar }
    }

    pub fn align_cue<D>(
        &self,
        session: &mut D,
        aligner: &CueWordAligner,
        pcm: &PcmBuffer,
        cue: &mut Cue,
    ) -> Result<Option<RecognizedBlock>, CueError>
    where
        D: DecoderSession + ?Sized,
    {
        let grammar_path = self.grammar.build(cue)?;
        let result = session
            .use_grammar(&grammar_path)
            .map_err(CueError::from)
            .and_then(|()| recognize_cue(session, aligner, pcm, cue));

        // The grammar never outlives its cue, even when the decode failed.
        if let Err(err) = session.use_language_model() {
            log::warn!(
                "Failed to restore language model after cue at {} ms: {err}",
                cue.start_ms()
            );
        }

        result
    }
}

/// Runs alignment over a whole subtitle track, one cue at a time.
pub struct CueDriver<G = FsgGrammarWriter> {
    aligner: CueWordAligner,
    forced: Option<ForcedAlignment<G>>,
}

impl CueDriver {
    /// Driver that decodes every cue with the session's language model.
    pub fn recognition(aligner: CueWordAligner) -> Self {
        Self {
            aligner,
            forced: None,
        }
    }
}

impl<G: GrammarBuilder> CueDriver<G> {
    /// Driver that decodes every cue against its own grammar.
    pub fn forced(aligner: CueWordAligner, grammar: G) -> Self {
        Self {
            aligner,
            forced: Some(ForcedAlignment::new(grammar)),
        }
    }

    pub fn strategy(&self) -> AlignmentStrategy {
        match self.forced {
            Some(_) => AlignmentStrategy::ForcedGrammar,
            None => AlignmentStrategy::Recognition,
        }
    }

    /// Aligns every non-empty cue in order.
    ///
    /// Words start from an even spread over their cue; a cue that fails keeps
    /// that estimate and the loop carries on with the next one.
    pub fn align_cues<D>(
        &self,
        session: &mut D,
        pcm: &PcmBuffer,
        cues: &mut [Cue],
    ) -> Vec<CueReport>
    where
        D: DecoderSession + ?Sized,
    {
        let mut reports = Vec::with_capacity(cues.len());

        for (cue_index, cue) in cues.iter_mut().enumerate() {
            if cue.is_empty() {
                continue;
            }
            cue.estimate_word_times();

            let result = match &self.forced {
                Some(forced) => forced.align_cue(session, &self.aligner, pcm, cue),
                None => recognize_cue(session, &self.aligner, pcm, cue),
            };

            let outcome = match result {
                Ok(Some(block)) => {
                    log::info!(
                        "Cue {cue_index}: matched {} of {} words",
                        cue.recognized_count(),
                        cue.words.len()
                    );
                    CueOutcome::Aligned { block }
                }
                Ok(None) => {
                    log::info!("Cue {cue_index}: no hypothesis");
                    CueOutcome::NoHypothesis
                }
                Err(err) => {
                    log::warn!("Cue {cue_index} skipped: {err}");
                    CueOutcome::Skipped {
                        reason: err.to_string(),
                    }
                }
            };

            reports.push(CueReport { cue_index, outcome });
        }

        reports
    }
}
