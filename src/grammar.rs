//! Per-cue finite-state grammars for forced alignment.
//!
//! The grammar is a straight chain through the cue's words with an optional
//! `<sil>` loop on every state, in the PocketSphinx FSG text format:
//!
//! ```text
//! FSG_BEGIN cue_19320
//! NUM_STATES 3
//! START_STATE 0
//! FINAL_STATE 2
//! TRANSITION 0 0 0.1 <sil>
//! TRANSITION 0 1 1.0 why
//! ...
//! FSG_END
//! ```

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::subtitle::Cue;

pub const SILENCE_WORD: &str = "<sil>";
const SILENCE_PROBABILITY: &str = "0.1";

/// Produces a grammar file restricted to one cue's words.
pub trait GrammarBuilder {
    fn build(&self, cue: &Cue) -> Result<PathBuf, ConfigError>;
}

pub fn render_fsg(name: &str, words: &[&str]) -> String {
    let final_state = words.len();
    let mut fsg = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(fsg, "FSG_BEGIN {name}");
    let _ = writeln!(fsg, "NUM_STATES {}", final_state + 1);
    let _ = writeln!(fsg, "START_STATE 0");
    let _ = writeln!(fsg, "FINAL_STATE {final_state}");
    for (state, word) in words.iter().enumerate() {
        let _ = writeln!(fsg, "TRANSITION {state} {state} {SILENCE_PROBABILITY} {SILENCE_WORD}");
        let _ = writeln!(fsg, "TRANSITION {state} {} 1.0 {word}", state + 1);
    }
    let _ = writeln!(fsg, "TRANSITION {final_state} {final_state} {SILENCE_PROBABILITY} {SILENCE_WORD}");
    fsg.push_str("FSG_END\n");
    fsg
}

/// Words on the non-silence transitions of an FSG, in file order.
pub fn fsg_words(fsg: &str) -> Vec<String> {
    fsg.lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            if fields.next()? != "TRANSITION" {
                return None;
            }
            let word = fields.nth(3)?;
            (word != SILENCE_WORD).then(|| word.to_string())
        })
        .collect()
}

/// Writes `<dir>/<cue start ms>.fsg` for each cue.
#[derive(Debug, Clone)]
pub struct FsgGrammarWriter {
    dir: PathBuf,
}

impl FsgGrammarWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl GrammarBuilder for FsgGrammarWriter {
    fn build(&self, cue: &Cue) -> Result<PathBuf, ConfigError> {
        if cue.is_empty() {
            return Err(ConfigError::EmptyGrammar);
        }

        let words: Vec<&str> = cue.words.iter().map(|word| word.key.as_str()).collect();
        let fsg = render_fsg(&format!("cue_{}", cue.start_ms()), &words);
        let path = self.dir.join(format!("{}.fsg", cue.start_ms()));

        std::fs::create_dir_all(&self.dir)
            .and_then(|()| std::fs::write(&path, fsg))
            .map_err(|source| ConfigError::GrammarIo {
                path: path.clone(),
                source,
            })?;

        log::debug!("Wrote grammar with {} words to {}", words.len(), path.display());
        Ok(path)
    }
}
