//! Audio loading for alignment and transcription.
//!
//! Decoders consume raw 16-bit PCM at 16kHz mono. The buffer is loaded once
//! and then only read, so cue and utterance decodes can share it freely.

use std::path::Path;

use crate::error::AudioError;
use crate::time::{ms_to_sample_offset, sample_offset_to_ms, SAMPLE_RATE_HZ};

/// Read-only PCM stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PcmBuffer {
    samples: Vec<i16>,
}

impl PcmBuffer {
    pub fn new(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_ms(&self) -> u64 {
        sample_offset_to_ms(self.samples.len(), SAMPLE_RATE_HZ)
    }

    /// Samples covering `[start_ms, end_ms)`, clamped to the end of the stream.
    ///
    /// A range that starts past the end of the audio yields an empty slice.
    pub fn cue_slice(&self, start_ms: u64, end_ms: u64) -> &[i16] {
        let start = ms_to_sample_offset(start_ms, SAMPLE_RATE_HZ).min(self.samples.len());
        let end = ms_to_sample_offset(end_ms, SAMPLE_RATE_HZ).clamp(start, self.samples.len());
        &self.samples[start..end]
    }
}

/// Read a WAV file into a [`PcmBuffer`].
///
/// # Audio Requirements
///
/// The input WAV file must have:
/// - Sample rate: 16,000 Hz
/// - Bit depth: 16 bits per sample
/// - Channels: 1 (mono)
/// - Format: PCM integer samples
///
/// # Examples
///
/// ```rust,no_run
/// use subalign_rs::audio::read_wav_pcm;
/// use std::path::Path;
///
/// let pcm = read_wav_pcm(Path::new("audio.wav"))?;
/// println!("Loaded {} ms of audio", pcm.duration_ms());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn read_wav_pcm(wav_path: &Path) -> Result<PcmBuffer, AudioError> {
    let mut reader = hound::WavReader::open(wav_path)?;
    let spec = reader.spec();

    let expected_spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE_HZ,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    if spec.channels != expected_spec.channels {
        return Err(AudioError::UnsupportedFormat {
            expected: format!("{} channels", expected_spec.channels),
            found: format!("{} channels", spec.channels),
        });
    }

    if spec.sample_rate != expected_spec.sample_rate {
        return Err(AudioError::UnsupportedFormat {
            expected: format!("{} Hz sample rate", expected_spec.sample_rate),
            found: format!("{} Hz", spec.sample_rate),
        });
    }

    if spec.bits_per_sample != expected_spec.bits_per_sample {
        return Err(AudioError::UnsupportedFormat {
            expected: format!("{} bits per sample", expected_spec.bits_per_sample),
            found: format!("{} bits", spec.bits_per_sample),
        });
    }

    if spec.sample_format != expected_spec.sample_format {
        return Err(AudioError::UnsupportedFormat {
            expected: "Int sample format".to_string(),
            found: format!("{:?}", spec.sample_format),
        });
    }

    let samples = reader.samples::<i16>().collect::<Result<Vec<i16>, _>>()?;
    log::info!(
        "Loaded {} samples ({} ms) from {}",
        samples.len(),
        sample_offset_to_ms(samples.len(), SAMPLE_RATE_HZ),
        wav_path.display()
    );

    Ok(PcmBuffer::new(samples))
}

/// Scales a 16-bit sample to `[-1.0, 1.0]`.
pub fn sample_to_f32(sample: i16) -> f32 {
    (sample as f32 / i16::MAX as f32).max(-1.0)
}
