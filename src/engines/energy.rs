use crate::audio::sample_to_f32;

/// Speech/silence classifier over fed chunks.
///
/// A chunk whose RMS reaches `threshold` is speech. Once in speech, the state
/// holds through up to `hangover_chunks` quiet chunks so that short pauses
/// between words do not end an utterance.
#[derive(Debug, Clone)]
pub struct EnergyEndpointer {
    threshold: f32,
    hangover_chunks: usize,
    quiet_run: usize,
    in_speech: bool,
}

impl EnergyEndpointer {
    pub fn new(threshold: f32, hangover_chunks: usize) -> Self {
        Self {
            threshold,
            hangover_chunks,
            quiet_run: 0,
            in_speech: false,
        }
    }

    pub fn in_speech(&self) -> bool {
        self.in_speech
    }

    pub fn reset(&mut self) {
        self.quiet_run = 0;
        self.in_speech = false;
    }

    pub fn update(&mut self, samples: &[i16]) {
        if samples.is_empty() {
            return;
        }

        if rms(samples) >= self.threshold {
            self.in_speech = true;
            self.quiet_run = 0;
        } else if self.in_speech {
            self.quiet_run += 1;
            if self.quiet_run > self.hangover_chunks {
                self.in_speech = false;
                self.quiet_run = 0;
            }
        }
    }
}

/// Utterance audio gated by an [`EnergyEndpointer`].
///
/// Until speech is first heard only the newest `pre_roll` samples before the
/// latest chunk are kept.
/// Older audio is dropped in whole decoder frames and counted, so token times
/// decoded from the buffer can be shifted back onto the utterance timeline.
#[derive(Debug, Clone)]
pub struct SpeechBuffer {
    endpointer: EnergyEndpointer,
    pre_roll: usize,
    frame_samples: usize,
    samples: Vec<f32>,
    heard_speech: bool,
    dropped: usize,
}

impl SpeechBuffer {
    pub fn new(endpointer: EnergyEndpointer, pre_roll: usize, frame_samples: usize) -> Self {
        Self {
            endpointer,
            pre_roll,
            frame_samples: frame_samples.max(1),
            samples: Vec::new(),
            heard_speech: false,
            dropped: 0,
        }
    }

    /// Appends `chunk`. While no speech has been heard, audio from earlier
    /// chunks is trimmed to the pre-roll first; the chunk itself is always kept.
    pub fn push(&mut self, chunk: &[i16]) {
        self.endpointer.update(chunk);
        if self.endpointer.in_speech() {
            self.heard_speech = true;
        } else if !self.heard_speech {
            self.trim_to_pre_roll();
        }
        self.samples.extend(chunk.iter().copied().map(sample_to_f32));
    }

    fn trim_to_pre_roll(&mut self) {
        if self.samples.len() <= self.pre_roll {
            return;
        }
        let excess = self.samples.len() - self.pre_roll;
        let excess = excess - excess % self.frame_samples;
        self.samples.drain(..excess);
        self.dropped += excess;
    }

    pub fn in_speech(&self) -> bool {
        self.endpointer.in_speech()
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Samples discarded from the front of the utterance.
    pub fn dropped_samples(&self) -> usize {
        self.dropped
    }

    /// Whole decoder frames discarded from the front of the utterance.
    pub fn dropped_frames(&self) -> usize {
        self.dropped / self.frame_samples
    }

    pub fn clear(&mut self) {
        self.endpointer.reset();
        self.samples.clear();
        self.heard_speech = false;
        self.dropped = 0;
    }
}

fn rms(samples: &[i16]) -> f32 {
    let sum: f32 = samples
        .iter()
        .map(|&sample| {
            let value = sample_to_f32(sample);
            value * value
        })
        .sum();
    (sum / samples.len() as f32).sqrt()
}
