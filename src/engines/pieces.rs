//! Merging of sub-word decoder pieces into word tokens.

use crate::RecognizedToken;

/// One piece of decoder output as emitted, e.g. `" tom"` then `"ato"`.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPiece {
    pub text: String,
    pub start_frame: u32,
    pub end_frame: u32,
    pub probability: f32,
}

impl TokenPiece {
    /// Control tokens such as `[_BEG_]` or `<|endoftext|>`.
    fn is_control(&self) -> bool {
        self.text.starts_with("[_") || self.text.starts_with("<|")
    }
}

#[derive(Debug, Default)]
struct PendingWord {
    text: String,
    start_frame: u32,
    end_frame: u32,
    probability_sum: f32,
    pieces: usize,
}

impl PendingWord {
    fn push(&mut self, piece: &TokenPiece) {
        if self.pieces == 0 {
            self.start_frame = piece.start_frame;
        }
        self.text.push_str(&piece.text);
        self.end_frame = piece.end_frame.max(self.start_frame);
        self.probability_sum += piece.probability;
        self.pieces += 1;
    }

    fn take(&mut self) -> Option<RecognizedToken> {
        let pending = std::mem::take(self);
        if pending.pieces == 0 {
            return None;
        }
        let text = pending
            .text
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_string();
        if text.is_empty() {
            return None;
        }
        Some(RecognizedToken {
            text,
            start_frame: pending.start_frame,
            end_frame: pending.end_frame,
            confidence: (pending.probability_sum / pending.pieces as f32).clamp(0.0, 1.0),
        })
    }
}

/// Joins pieces into words. A piece starting with whitespace begins a new
/// word; control tokens are kept as bracketed standalone tokens.
pub fn merge_pieces<I>(pieces: I) -> Vec<RecognizedToken>
where
    I: IntoIterator<Item = TokenPiece>,
{
    let mut tokens = Vec::new();
    let mut word = PendingWord::default();

    for piece in pieces {
        if piece.is_control() {
            tokens.extend(word.take());
            let name = piece.text.trim_matches(|c| matches!(c, '[' | ']' | '<' | '>' | '|'));
            tokens.push(RecognizedToken {
                text: format!("[{name}]"),
                start_frame: piece.start_frame,
                end_frame: piece.end_frame,
                confidence: piece.probability.clamp(0.0, 1.0),
            });
            continue;
        }

        if piece.text.starts_with(char::is_whitespace) {
            tokens.extend(word.take());
        }
        word.push(&piece);
    }
    tokens.extend(word.take());

    tokens
}
