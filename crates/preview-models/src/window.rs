//! Sample windows planned over the source timeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A time range of the source video to be extracted as one sample.
///
/// Windows are produced by the planner and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleWindow {
    /// Ordinal position in the plan (0-based)
    pub index: u32,
    /// Start time in seconds
    pub start: f64,
    /// Length in seconds
    pub length: f64,
}

impl SampleWindow {
    pub fn new(index: u32, start: f64, length: f64) -> Self {
        Self {
            index,
            start,
            length,
        }
    }

    /// End time in seconds (exclusive).
    pub fn end(&self) -> f64 {
        self.start + self.length
    }

    /// Whether this window lies inside `[0, duration]`.
    pub fn fits_within(&self, duration: f64) -> bool {
        self.start >= 0.0 && self.length > 0.0 && self.end() <= duration
    }

    /// Whether two windows share any part of the timeline.
    pub fn overlaps(&self, other: &SampleWindow) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

impl fmt::Display for SampleWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} [{:.3}s, {:.3}s)",
            self.index,
            self.start,
            self.end()
        )
    }
}
