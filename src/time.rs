//! Conversions between decoder frames, milliseconds, PCM sample offsets and
//! SubRip timecodes.

use once_cell::sync::Lazy;
use regex::Regex;

/// Sample rate of the PCM stream fed to decoders.
pub const SAMPLE_RATE_HZ: u32 = 16_000;

static TIMECODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+):(\d{1,2}):(\d{1,2})[,.](\d{1,3})$").expect("valid regex"));

/// Decoder frame index to milliseconds, truncated.
pub fn frame_to_ms(frame: u32, frame_rate: u32) -> u64 {
    if frame_rate == 0 {
        return 0;
    }
    u64::from(frame) * 1000 / u64::from(frame_rate)
}

/// Millisecond offset into the stream to a sample offset.
///
/// Saturates at `usize::MAX`; callers clamp to the buffer length.
pub fn ms_to_sample_offset(ms: u64, sample_rate: u32) -> usize {
    let samples = u128::from(ms) * u128::from(sample_rate) / 1000;
    usize::try_from(samples).unwrap_or(usize::MAX)
}

/// Sample offset back to milliseconds, truncated.
pub fn sample_offset_to_ms(offset: usize, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    offset as u64 * 1000 / u64::from(sample_rate)
}

/// Formats milliseconds as `HH:MM:SS,mmm`.
pub fn format_srt_timecode(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms / 60_000) % 60;
    let seconds = (ms / 1000) % 60;
    let millis = ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// Parses `HH:MM:SS,mmm` (a `.` before the milliseconds is accepted too).
pub fn parse_srt_timecode(text: &str) -> Option<u64> {
    let caps = TIMECODE.captures(text.trim())?;
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());

    let hours = field(1)?;
    let minutes = field(2)?;
    let seconds = field(3)?;
    let millis_text = caps.get(4)?.as_str();
    // "5" after the separator means 500 ms, not 5 ms.
    let millis = field(4)? * 10u64.pow(3 - millis_text.len() as u32);

    if minutes >= 60 || seconds >= 60 {
        return None;
    }
    hours
        .checked_mul(3_600_000)?
        .checked_add(minutes * 60_000 + seconds * 1000 + millis)
}
