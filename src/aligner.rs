//! Reconciles a cue's reference words with a decoder's token segmentation.
//!
//! The matching is greedy and windowed rather than globally optimal. Tokens
//! are visited in frame order and each one may claim the earliest unmatched
//! reference word, inside a bounded lookahead, whose spelling is close enough.
//! Claimed words get the token's timing. Nothing is ever matched behind the
//! last claimed word, so word order is preserved even when the recognizer
//! drops or invents words.
//!
//! The lookahead bound keeps a late repetition from stealing an early
//! reference word:
//!
//! ```text
//! reference  : [why] would you use tomato just why
//! recognized :       would you use tomato just [why]
//! ```
//!
//! Without a window the first reference "why" would be claimed by the last
//! recognized token and every word in between would be left unmatched.

use crate::distance::levenshtein;
use crate::params::AlignmentParams;
use crate::subtitle::Cue;
use crate::time::frame_to_ms;
use crate::{AlignedToken, RecognizedBlock, RecognizedToken};

#[derive(Debug, Clone, Default)]
pub struct CueWordAligner {
    params: AlignmentParams,
}

impl CueWordAligner {
    pub fn new(params: AlignmentParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &AlignmentParams {
        &self.params
    }

    /// Aligns one decode pass against `cue`, updating matched words in place.
    ///
    /// Token frames are relative to the start of the cue's audio slice.
    /// Unmatched words keep whatever timing they had before the call.
    pub fn align<I>(&self, cue: &mut Cue, tokens: I, frame_rate: u32) -> RecognizedBlock
    where
        I: IntoIterator<Item = RecognizedToken>,
    {
        let cue_start = cue.start_ms();
        let mut block = RecognizedBlock::default();
        let mut cursor = AlignmentCursor::default();

        for token in tokens {
            let start_ms = cue_start + frame_to_ms(token.start_frame, frame_rate);
            let end_ms = cue_start + frame_to_ms(token.end_frame, frame_rate);
            let tokens_seen = block.len() + 1;

            let matched_word = if token.is_non_lexical() {
                None
            } else {
                self.find_match(cue, &token.text, cursor, tokens_seen)
            };

            if let Some(index) = matched_word {
                let word = &mut cue.words[index];
                word.recognized = true;
                word.start_ms = start_ms;
                word.end_ms = end_ms;
                cursor.advance(index);
                log::debug!(
                    "Matched {:?} to word {} {:?} [{} - {}]",
                    token.text,
                    index,
                    word.text,
                    start_ms,
                    end_ms
                );
            }

            block.tokens.push(AlignedToken {
                text: token.text,
                start_ms,
                end_ms,
                confidence: token.confidence,
                matched_word,
            });
        }

        block
    }

    /// Earliest reference word after the cursor, within the window, that is
    /// similar enough to `text`.
    fn find_match(
        &self,
        cue: &Cue,
        text: &str,
        cursor: AlignmentCursor,
        tokens_seen: usize,
    ) -> Option<usize> {
        let text = text.to_lowercase();
        let window_end = tokens_seen + self.params.window_size;

        cue.words
            .iter()
            .enumerate()
            .skip(cursor.next_candidate())
            .take_while(|(index, _)| *index <= window_end)
            .find(|(_, word)| self.is_similar(&word.key, &text))
            .map(|(index, _)| index)
    }

    fn is_similar(&self, reference: &str, recognized: &str) -> bool {
        let longer = reference.chars().count().max(recognized.chars().count());
        let distance = levenshtein(reference, recognized);
        (distance as f64) < longer as f64 * self.params.match_threshold
    }
}

/// Position of the last matched reference word within one cue's pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct AlignmentCursor {
    last_matched: Option<usize>,
}

impl AlignmentCursor {
    fn next_candidate(self) -> usize {
        self.last_matched.map_or(0, |index| index + 1)
    }

    fn advance(&mut self, index: usize) {
        debug_assert!(index >= self.next_candidate());
        self.last_matched = Some(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(text: &str, start_frame: u32, end_frame: u32) -> RecognizedToken {
        RecognizedToken {
            text: text.to_string(),
            start_frame,
            end_frame,
            confidence: 0.9,
        }
    }

    #[test]
    fn cursor_starts_before_first_word() {
        let mut cursor = AlignmentCursor::default();
        assert_eq!(cursor.next_candidate(), 0);
        cursor.advance(2);
        assert_eq!(cursor.next_candidate(), 3);
    }

    #[test]
    fn frames_are_offset_by_cue_start() {
        let mut cue = Cue::new(19_320, 21_056, "boring");
        let block = CueWordAligner::default().align(&mut cue, [token("boring", 10, 57)], 100);

        assert_eq!(cue.words[0].start_ms, 19_420);
        assert_eq!(cue.words[0].end_ms, 19_890);
        assert_eq!(block.tokens[0].matched_word, Some(0));
    }

    #[test]
    fn recognized_text_is_case_folded() {
        let mut cue = Cue::new(0, 1000, "Hello");
        let block = CueWordAligner::default().align(&mut cue, [token("HELLO", 0, 10)], 100);
        assert_eq!(block.matched_count(), 1);
    }

    #[test]
    fn near_miss_within_threshold_matches() {
        // One edit in eight characters is under a quarter of the length.
        let mut cue = Cue::new(0, 1000, "tomatoes");
        let block = CueWordAligner::default().align(&mut cue, [token("tomatoez", 0, 10)], 100);
        assert_eq!(block.matched_count(), 1);
    }

    #[test]
    fn distance_at_threshold_is_rejected() {
        // Distance 1 on a four letter word is exactly 25%, which is not enough.
        let mut cue = Cue::new(0, 1000, "wood");
        let block = CueWordAligner::default().align(&mut cue, [token("word", 0, 10)], 100);
        assert_eq!(block.matched_count(), 0);
        assert!(!cue.words[0].recognized);
    }

    #[test]
    fn custom_threshold_loosens_matching() {
        let aligner = CueWordAligner::new(AlignmentParams {
            match_threshold: 0.5,
            ..AlignmentParams::default()
        });
        let mut cue = Cue::new(0, 1000, "wood");
        let block = aligner.align(&mut cue, [token("word", 0, 10)], 100);
        assert_eq!(block.matched_count(), 1);
    }
}
