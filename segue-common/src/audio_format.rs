//! Audio format value types
//!
//! Describes the sample geometry of a PCM stream: sample rate, sample
//! format and channel count. Two formats compare equal only when all three
//! match, which is what the crossfade calculator relies on before mixing
//! chunks of two songs without resampling.

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Maximum number of interleaved channels in one frame
pub const MAX_CHANNELS: u8 = 8;

/// Highest sample rate accepted by [`AudioFormat::is_valid`]
pub const MAX_SAMPLE_RATE: u32 = 768_000;

/// PCM sample encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleFormat {
    /// Not yet known (decoder has not initialized)
    #[default]
    Undefined,

    /// Signed 8 bit
    S8,

    /// Signed 16 bit, native endian
    S16,

    /// Signed 24 bit in the low bytes of a 32 bit word
    S24P32,

    /// Signed 32 bit
    S32,

    /// 32 bit IEEE float, -1.0 to 1.0
    Float,

    /// Direct Stream Digital, 8 one-bit samples per byte
    Dsd,
}

impl SampleFormat {
    /// Size of one sample in bytes (0 for [`SampleFormat::Undefined`])
    pub fn sample_size(&self) -> usize {
        match self {
            SampleFormat::Undefined => 0,
            SampleFormat::S8 | SampleFormat::Dsd => 1,
            SampleFormat::S16 => 2,
            SampleFormat::S24P32 | SampleFormat::S32 | SampleFormat::Float => 4,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            SampleFormat::Undefined => "?",
            SampleFormat::S8 => "8",
            SampleFormat::S16 => "16",
            SampleFormat::S24P32 => "24",
            SampleFormat::S32 => "32",
            SampleFormat::Float => "f",
            SampleFormat::Dsd => "dsd",
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SampleFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "8" => Ok(SampleFormat::S8),
            "16" => Ok(SampleFormat::S16),
            "24" => Ok(SampleFormat::S24P32),
            "32" => Ok(SampleFormat::S32),
            "f" => Ok(SampleFormat::Float),
            "dsd" => Ok(SampleFormat::Dsd),
            other => Err(Error::InvalidInput(format!(
                "Unknown sample format: {:?}",
                other
            ))),
        }
    }
}

/// Sample geometry of a PCM stream
///
/// The default value is the undefined format (all fields zero), used by
/// the decoder control before a decoder has reported what it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AudioFormat {
    /// Frames per second
    pub sample_rate: u32,

    /// Encoding of each sample
    pub format: SampleFormat,

    /// Interleaved channels per frame
    pub channels: u8,
}

impl AudioFormat {
    /// Create a format from its three components
    pub const fn new(sample_rate: u32, format: SampleFormat, channels: u8) -> Self {
        Self {
            sample_rate,
            format,
            channels,
        }
    }

    /// The undefined format
    pub const fn undefined() -> Self {
        Self::new(0, SampleFormat::Undefined, 0)
    }

    /// True if every component is within the supported range
    pub fn is_valid(&self) -> bool {
        self.sample_rate > 0
            && self.sample_rate <= MAX_SAMPLE_RATE
            && self.format != SampleFormat::Undefined
            && self.channels > 0
            && self.channels <= MAX_CHANNELS
    }

    /// Size of one frame (one sample per channel) in bytes
    pub fn frame_size(&self) -> usize {
        self.format.sample_size() * self.channels as usize
    }

    /// Number of bytes one second of audio occupies in this format
    pub fn time_to_size(&self) -> usize {
        self.sample_rate as usize * self.frame_size()
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.sample_rate, self.format, self.channels)
    }
}

impl FromStr for AudioFormat {
    type Err = Error;

    /// Parse the `rate:bits:channels` notation, e.g. `44100:16:2`
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().split(':');

        let (Some(rate), Some(format), Some(channels), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::InvalidInput(format!(
                "Audio format must be rate:bits:channels, got {:?}",
                s
            )));
        };

        let sample_rate = rate
            .parse::<u32>()
            .map_err(|e| Error::InvalidInput(format!("Invalid sample rate {:?}: {}", rate, e)))?;
        let format = format.parse::<SampleFormat>()?;
        let channels = channels.parse::<u8>().map_err(|e| {
            Error::InvalidInput(format!("Invalid channel count {:?}: {}", channels, e))
        })?;

        let af = AudioFormat::new(sample_rate, format, channels);
        if !af.is_valid() {
            return Err(Error::InvalidInput(format!("Unsupported audio format: {}", af)));
        }

        Ok(af)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cd_format_byte_rate() {
        let cd = AudioFormat::new(44100, SampleFormat::S16, 2);
        assert!(cd.is_valid());
        assert_eq!(cd.frame_size(), 4);
        assert_eq!(cd.time_to_size(), 176_400);
    }

    #[test]
    fn test_undefined_is_not_valid() {
        let af = AudioFormat::default();
        assert_eq!(af, AudioFormat::undefined());
        assert!(!af.is_valid());
        assert_eq!(af.time_to_size(), 0);
    }

    #[test]
    fn test_equality_requires_all_fields() {
        let a = AudioFormat::new(44100, SampleFormat::S16, 2);
        assert_eq!(a, AudioFormat::new(44100, SampleFormat::S16, 2));
        assert_ne!(a, AudioFormat::new(48000, SampleFormat::S16, 2));
        assert_ne!(a, AudioFormat::new(44100, SampleFormat::S24P32, 2));
        assert_ne!(a, AudioFormat::new(44100, SampleFormat::S16, 1));
    }

    #[test]
    fn test_display() {
        assert_eq!(AudioFormat::new(44100, SampleFormat::S16, 2).to_string(), "44100:16:2");
        assert_eq!(AudioFormat::new(48000, SampleFormat::Float, 6).to_string(), "48000:f:6");
    }

    #[test]
    fn test_parse() {
        let af: AudioFormat = "96000:24:2".parse().unwrap();
        assert_eq!(af, AudioFormat::new(96000, SampleFormat::S24P32, 2));
        assert_eq!(af.frame_size(), 8);
    }

    #[test]
    fn test_parse_invalid() {
        assert!("44100:16".parse::<AudioFormat>().is_err());
        assert!("44100:16:2:1".parse::<AudioFormat>().is_err());
        assert!("44100:12:2".parse::<AudioFormat>().is_err());
        assert!("0:16:2".parse::<AudioFormat>().is_err());
        assert!("44100:16:9".parse::<AudioFormat>().is_err());
    }
}
