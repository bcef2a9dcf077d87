/// ffmpeg trimming.
use std::path::Path;

use thiserror::Error;

/// A validated `[start, end)` range in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    start: f64,
    end: f64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SegmentError {
    #[error("Start time and end time must be finite numbers")]
    NotFinite,

    #[error("Start time must not be negative")]
    NegativeStart,

    #[error("End time must be greater than start time")]
    EmptyRange,
}

impl Segment {
    pub fn new(start: f64, end: f64) -> Result<Self, SegmentError> {
        if !start.is_finite() || !end.is_finite() {
            return Err(SegmentError::NotFinite);
        }
        if start < 0.0 {
            return Err(SegmentError::NegativeStart);
        }
        if end <= start {
            return Err(SegmentError::EmptyRange);
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Copy `[start, start + duration)` of `input` into `output` without
/// re-encoding.
pub fn trim_args(input: &Path, output: &Path, segment: &Segment) -> Vec<String> {
    vec![
        "-i".into(),
        input.to_string_lossy().into_owned(),
        "-ss".into(),
        seconds(segment.start()),
        "-t".into(),
        seconds(segment.duration()),
        "-acodec".into(),
        "copy".into(),
        output.to_string_lossy().into_owned(),
    ]
}

// f64's Display never uses exponent notation, which ffmpeg would reject.
fn seconds(value: f64) -> String {
    format!("{}", value)
}
