//! Crossfade length calculation
//!
//! Decides how many chunks of the ending song overlap the start of the
//! next one. Two modes:
//! - **Fixed:** the configured duration, rounded to whole chunks
//! - **MixRamp:** the time both songs spend below the configured loudness,
//!   read from their MixRamp curves, minus the configured delay
//!
//! Called by the player thread with a snapshot taken under the decoder
//! control lock (see [`ControlState::cross_fade_chunks`](crate::ControlState::cross_fade_chunks)).

pub mod mixramp;

use segue_common::{AudioFormat, PlaybackConfig, CHUNK_SIZE};
use tracing::{debug, warn};

pub use mixramp::{MixRampCurve, MixRampPoint};

/// User crossfade preferences
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossFadeSettings {
    /// Fixed crossfade duration in seconds
    pub duration: f32,

    /// Loudness at which MixRamp overlaps the songs
    pub mixramp_db: f32,

    /// Seconds subtracted from the MixRamp overlap; `None` or NaN disables
    /// MixRamp
    pub mixramp_delay: Option<f32>,
}

/// Facts about one song transition
///
/// `total_time`, `format` and `replay_gain_db` describe the next song;
/// `old_format` and `replay_gain_prev_db` the song that is ending.
#[derive(Debug, Clone, Copy)]
pub struct Transition<'a> {
    /// Duration of the next song in seconds
    pub total_time: f32,

    /// Replay gain applied to the next song (dB)
    pub replay_gain_db: f32,

    /// Replay gain applied to the ending song (dB)
    pub replay_gain_prev_db: f32,

    /// MixRamp curve of the next song's start
    pub mixramp_start: Option<&'a str>,

    /// MixRamp curve of the ending song's end
    pub mixramp_prev_end: Option<&'a str>,

    /// Format of the next song's chunks
    pub format: AudioFormat,

    /// Format of the ending song's chunks
    pub old_format: AudioFormat,
}

impl Default for CrossFadeSettings {
    fn default() -> Self {
        Self {
            duration: 0.0,
            mixramp_db: 0.0,
            mixramp_delay: None,
        }
    }
}

impl CrossFadeSettings {
    /// Build settings from the `[playback]` config section
    pub fn from_config(config: &PlaybackConfig) -> crate::Result<Self> {
        config.validate()?;

        Ok(Self {
            duration: config.crossfade_seconds,
            mixramp_db: config.mixramp_db,
            mixramp_delay: config.effective_mixramp_delay(),
        })
    }

    /// MixRamp delay, if MixRamp is enabled
    fn mixramp_delay(&self) -> Option<f32> {
        self.mixramp_delay.filter(|delay| !delay.is_nan())
    }

    /// Number of chunks to overlap, 0 meaning no crossfade
    ///
    /// # Arguments
    /// * `transition` - Durations, gains, curves and formats of both songs
    /// * `max_chunks` - Ceiling derived from the playback buffer capacity
    ///
    /// # Returns
    /// - 0 if the duration is negative or not shorter than the next song,
    ///   or if the formats differ (chunks are mixed without resampling)
    /// - Fixed mode (no delay, or a curve missing): `duration` rounded to
    ///   the nearest chunk
    /// - MixRamp mode: the overlap minus the delay, truncated to whole
    ///   chunks, or 0 if the overlap is undefined or shorter than the delay
    ///
    /// The result never exceeds `max_chunks`; clamping logs a warning.
    pub fn calculate(&self, transition: &Transition<'_>, max_chunks: u32) -> u32 {
        if self.duration < 0.0
            || self.duration >= transition.total_time
            || transition.format != transition.old_format
        {
            return 0;
        }

        let chunks_per_second = transition.format.time_to_size() as f32 / CHUNK_SIZE as f32;

        let mixramp = match (
            self.mixramp_delay(),
            non_empty(transition.mixramp_start),
            non_empty(transition.mixramp_prev_end),
        ) {
            (Some(delay), Some(start), Some(prev_end)) => Some((delay, start, prev_end)),
            _ => None,
        };

        let mut chunks = match mixramp {
            None => {
                let chunks = (chunks_per_second * self.duration + 0.5) as u32;
                debug!(
                    "Crossfade will overlap {} chunks ({:.3}s fixed)",
                    chunks, self.duration
                );
                chunks
            }
            Some((delay, start, prev_end)) => {
                let start_secs =
                    mixramp::interpolate(start, self.mixramp_db - transition.replay_gain_db);
                let end_secs = mixramp::interpolate(
                    prev_end,
                    self.mixramp_db - transition.replay_gain_prev_db,
                );
                let overlap = start_secs.zip(end_secs).map(|(start, end)| start + end);

                match overlap {
                    Some(overlap) if delay <= overlap => {
                        let chunks = (chunks_per_second * (overlap - delay)) as u32;
                        debug!(
                            "MixRamp will overlap {} chunks, {:.3}s",
                            chunks,
                            overlap - delay
                        );
                        chunks
                    }
                    _ => {
                        debug!(
                            "MixRamp overlap {:?} too short for delay {:.3}s, no crossfade",
                            overlap, delay
                        );
                        0
                    }
                }
            }
        };

        if chunks > max_chunks {
            warn!(
                "Audio buffer too small for computed crossfade: {} chunks clamped to {}",
                chunks, max_chunks
            );
            chunks = max_chunks;
        }

        chunks
    }
}

fn non_empty(curve: Option<&str>) -> Option<&str> {
    curve.filter(|text| !text.trim().is_empty())
}
