mod common;

use std::path::PathBuf;

use common::{Call, ScriptedDecoder};
use subalign_rs::{
    audio::PcmBuffer,
    grammar::{FsgGrammarWriter, GrammarBuilder},
    AlignmentStrategy, ConfigError, Cue, CueDriver, CueOutcome, CueWordAligner,
};

fn three_seconds() -> PcmBuffer {
    PcmBuffer::new(vec![0; 48_000])
}

/// Fails for the cue starting at `fail_at`, writes FSG files otherwise.
struct FailingGrammar {
    fail_at: u64,
    inner: FsgGrammarWriter,
}

impl GrammarBuilder for FailingGrammar {
    fn build(&self, cue: &Cue) -> Result<PathBuf, ConfigError> {
        if cue.start_ms() == self.fail_at {
            return Err(ConfigError::InvalidGrammar {
                path: self.inner.dir().join("broken.fsg"),
                message: "unsupported word".to_string(),
            });
        }
        self.inner.build(cue)
    }
}

#[test]
fn forced_decode_matches_every_word_in_order() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (mut decoder, _) = ScriptedDecoder::with_responses(Vec::new());
    let driver = CueDriver::forced(CueWordAligner::default(), FsgGrammarWriter::new(dir.path()));
    let mut cues = vec![Cue::new(1_000, 2_500, "Why are you boring?")];

    let reports = driver.align_cues(&mut decoder, &three_seconds(), &mut cues);

    assert_eq!(driver.strategy(), AlignmentStrategy::ForcedGrammar);
    assert_eq!(reports.len(), 1);
    let CueOutcome::Aligned { block } = &reports[0].outcome else {
        panic!("expected an aligned cue, got {:?}", reports[0].outcome);
    };
    assert_eq!(block.len(), cues[0].words.len());
    let matched: Vec<_> = block.tokens.iter().map(|t| t.matched_word).collect();
    assert_eq!(matched, [Some(0), Some(1), Some(2), Some(3)]);

    assert_eq!(cues[0].recognized_count(), 4);
    let starts: Vec<u64> = cues[0].words.iter().map(|w| w.start_ms).collect();
    assert_eq!(starts, [1_000, 1_200, 1_400, 1_600]);
}

#[test]
fn silence_between_grammar_words_is_reported_unmatched() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (mut decoder, _) = ScriptedDecoder::with_responses(Vec::new());
    decoder.silence_between_grammar_words = true;
    let driver = CueDriver::forced(CueWordAligner::default(), FsgGrammarWriter::new(dir.path()));
    let mut cues = vec![Cue::new(0, 2_000, "I think you've brought")];

    let reports = driver.align_cues(&mut decoder, &three_seconds(), &mut cues);

    let CueOutcome::Aligned { block } = &reports[0].outcome else {
        panic!("expected an aligned cue");
    };
    assert_eq!(block.len(), 8);
    assert_eq!(block.matched_count(), 4);
    assert!(block
        .tokens
        .iter()
        .filter(|t| t.text == "<sil>")
        .all(|t| t.matched_word.is_none()));
    assert_eq!(cues[0].recognized_count(), 4);
    assert_eq!(cues[0].words[1].start_ms, 300);
}

#[test]
fn grammar_is_installed_and_removed_around_each_cue() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (mut decoder, calls) = ScriptedDecoder::with_responses(Vec::new());
    let driver = CueDriver::forced(CueWordAligner::default(), FsgGrammarWriter::new(dir.path()));
    let mut cues = vec![
        Cue::new(0, 1_000, "first cue"),
        Cue::new(1_000, 2_000, "second cue"),
    ];

    driver.align_cues(&mut decoder, &three_seconds(), &mut cues);

    let expected = [
        Call::UseGrammar(dir.path().join("0.fsg")),
        Call::Begin,
        Call::Feed(16_000),
        Call::End,
        Call::UseLanguageModel,
        Call::UseGrammar(dir.path().join("1000.fsg")),
        Call::Begin,
        Call::Feed(16_000),
        Call::End,
        Call::UseLanguageModel,
    ];
    assert_eq!(*calls.borrow(), expected);
}

#[test]
fn rejected_grammar_skips_cue_and_restores_language_model() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (mut decoder, calls) = ScriptedDecoder::with_responses(Vec::new());
    decoder.fail_grammar = true;
    let driver = CueDriver::forced(CueWordAligner::default(), FsgGrammarWriter::new(dir.path()));
    let mut cues = vec![Cue::new(0, 1_000, "never decoded")];
    let mut baseline = cues[0].clone();
    baseline.estimate_word_times();

    let reports = driver.align_cues(&mut decoder, &three_seconds(), &mut cues);

    assert!(matches!(reports[0].outcome, CueOutcome::Skipped { .. }));
    assert_eq!(cues[0], baseline);
    let calls = calls.borrow();
    assert!(!calls.contains(&Call::Begin));
    assert_eq!(calls.last(), Some(&Call::UseLanguageModel));
}

#[test]
fn grammar_build_failure_is_confined_to_its_cue() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (mut decoder, calls) = ScriptedDecoder::with_responses(Vec::new());
    let grammar = FailingGrammar {
        fail_at: 0,
        inner: FsgGrammarWriter::new(dir.path()),
    };
    let driver = CueDriver::forced(CueWordAligner::default(), grammar);
    let mut cues = vec![
        Cue::new(0, 1_000, "broken words"),
        Cue::new(1_000, 2_000, "fine words"),
    ];

    let reports = driver.align_cues(&mut decoder, &three_seconds(), &mut cues);

    assert_eq!(reports.len(), 2);
    match &reports[0].outcome {
        CueOutcome::Skipped { reason } => assert!(reason.contains("unsupported word"), "{reason}"),
        other => panic!("expected a skipped cue, got {other:?}"),
    }
    assert!(matches!(reports[1].outcome, CueOutcome::Aligned { .. }));
    assert_eq!(cues[1].recognized_count(), 2);

    // Nothing was installed for the first cue, so only the second restores the model.
    let calls = calls.borrow();
    let restores = calls
        .iter()
        .filter(|call| **call == Call::UseLanguageModel)
        .count();
    assert_eq!(restores, 1);
    assert_eq!(calls[0], Call::UseGrammar(dir.path().join("1000.fsg")));
}

#[test]
fn cue_past_end_of_audio_has_no_hypothesis() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (mut decoder, calls) = ScriptedDecoder::with_responses(Vec::new());
    let driver = CueDriver::forced(CueWordAligner::default(), FsgGrammarWriter::new(dir.path()));
    let mut cues = vec![Cue::new(5_000, 6_000, "too late")];

    let reports = driver.align_cues(&mut decoder, &three_seconds(), &mut cues);

    assert_eq!(reports[0].outcome, CueOutcome::NoHypothesis);
    assert_eq!(cues[0].recognized_count(), 0);
    assert!(!calls.borrow().contains(&Call::Begin));
    assert_eq!(calls.borrow().last(), Some(&Call::UseLanguageModel));
}
