//! MixRamp volume curves
//!
//! A MixRamp tag describes how loud the start (or end) of a song is over
//! time, as `"<dB> <seconds>;<dB> <seconds>;..."` with dB non-decreasing.
//! The crossfade calculator asks each curve how long it takes to reach a
//! target loudness and overlaps the songs for the sum of both answers.

/// One point of a MixRamp curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixRampPoint {
    /// Loudness in dB (usually negative)
    pub db: f32,

    /// Offset from the song edge in seconds
    pub seconds: f32,
}

/// Parsed MixRamp curve, points in tag order
#[derive(Debug, Clone, PartialEq)]
pub struct MixRampCurve {
    points: Vec<MixRampPoint>,
}

impl MixRampCurve {
    /// Parse a MixRamp tag
    ///
    /// Pairs are separated by `;`, the dB and seconds of a pair by
    /// whitespace; a trailing `;` is allowed. Returns `None` if the text
    /// holds no pairs, or if any pair is incomplete, has extra tokens, or
    /// contains a value that is not a finite number. A curve is never
    /// partially accepted.
    pub fn parse(text: &str) -> Option<Self> {
        let mut points = Vec::new();

        for pair in text.split(';') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }

            let mut tokens = pair.split_whitespace();
            let (Some(db), Some(seconds), None) = (tokens.next(), tokens.next(), tokens.next())
            else {
                return None;
            };

            let db = parse_finite(db)?;
            let seconds = parse_finite(seconds)?;
            points.push(MixRampPoint { db, seconds });
        }

        if points.is_empty() {
            None
        } else {
            Some(Self { points })
        }
    }

    /// Points in tag order
    pub fn points(&self) -> &[MixRampPoint] {
        &self.points
    }

    /// Time at which the curve reaches `required_db`
    ///
    /// An exact dB match returns that point's time. A target below the
    /// first point returns the first point's time (no extrapolation).
    /// Between two points the time is interpolated linearly on the dB
    /// axis. Returns `None` if no point is at least as loud as the target.
    pub fn interpolate(&self, required_db: f32) -> Option<f32> {
        let mut quieter: Option<MixRampPoint> = None;

        for point in &self.points {
            if point.db == required_db {
                return Some(point.seconds);
            }

            if point.db < required_db {
                quieter = Some(*point);
                continue;
            }

            let Some(last) = quieter else {
                return Some(point.seconds);
            };

            return Some(
                last.seconds
                    + (required_db - last.db) * (point.seconds - last.seconds)
                        / (point.db - last.db),
            );
        }

        None
    }
}

/// Parse `text` and interpolate it at `required_db`
///
/// `None` if the tag is empty, malformed, or never reaches the target.
pub fn interpolate(text: &str, required_db: f32) -> Option<f32> {
    MixRampCurve::parse(text)?.interpolate(required_db)
}

fn parse_finite(token: &str) -> Option<f32> {
    token.parse::<f32>().ok().filter(|v| v.is_finite())
}
