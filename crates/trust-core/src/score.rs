//! Trust score types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer trust score, always within `[0, 100]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const MIN: Score = Score(0);
    pub const MAX: Score = Score(100);

    /// Clamp an arbitrary integer into the valid score range
    pub fn clamped(raw: i64) -> Self {
        Score(raw.clamp(0, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Score {
    fn default() -> Self {
        Score::MAX
    }
}

impl From<i64> for Score {
    fn from(raw: i64) -> Self {
        Score::clamped(raw)
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which trust channels contributed to a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// Application behavior only
    Standard,
    /// Application behavior combined with the secure-overlay channel
    Overlay,
}

impl Layer {
    pub fn as_str(self) -> &'static str {
        match self {
            Layer::Standard => "standard",
            Layer::Overlay => "overlay",
        }
    }
}

/// Result of scoring one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayeredScore {
    /// Score the policy table acts on
    pub combined: Score,
    /// Transport-layer score; `None` when no secondary channel is active
    pub network: Option<Score>,
    /// Behavioral (application-layer) score
    pub app: Score,
}

impl LayeredScore {
    /// Single-layer result: the combined score is the app score
    pub fn single(app: Score) -> Self {
        Self {
            combined: app,
            network: None,
            app,
        }
    }
}
