use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of categories a blocked address can fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockingCategory {
    ExplicitContent,
    AdultEntertainment,
    Gambling,
    DatingSites,
    InappropriateImagery,
    SuspiciousContent,
}

impl BlockingCategory {
    pub const ALL: [BlockingCategory; 6] = [
        BlockingCategory::ExplicitContent,
        BlockingCategory::AdultEntertainment,
        BlockingCategory::Gambling,
        BlockingCategory::DatingSites,
        BlockingCategory::InappropriateImagery,
        BlockingCategory::SuspiciousContent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockingCategory::ExplicitContent => "EXPLICIT_CONTENT",
            BlockingCategory::AdultEntertainment => "ADULT_ENTERTAINMENT",
            BlockingCategory::Gambling => "GAMBLING",
            BlockingCategory::DatingSites => "DATING_SITES",
            BlockingCategory::InappropriateImagery => "INAPPROPRIATE_IMAGERY",
            BlockingCategory::SuspiciousContent => "SUSPICIOUS_CONTENT",
        }
    }

    /// Cooldown, in seconds, before the user may proceed past a block.
    pub fn remediation_seconds(&self) -> u32 {
        match self {
            BlockingCategory::ExplicitContent => 60,
            BlockingCategory::AdultEntertainment => 45,
            BlockingCategory::Gambling => 30,
            BlockingCategory::DatingSites => 20,
            BlockingCategory::InappropriateImagery => 30,
            BlockingCategory::SuspiciousContent => 15,
        }
    }

    /// Reference into the guidance content store used when no curated
    /// guidance item is available for the category.
    pub fn guidance_ref(&self) -> &'static str {
        match self {
            BlockingCategory::ExplicitContent => "guidance/explicit-content",
            BlockingCategory::AdultEntertainment => "guidance/adult-entertainment",
            BlockingCategory::Gambling => "guidance/gambling",
            BlockingCategory::DatingSites => "guidance/dating-sites",
            BlockingCategory::InappropriateImagery => "guidance/inappropriate-imagery",
            BlockingCategory::SuspiciousContent => "guidance/suspicious-content",
        }
    }

    /// Stable index, used for per-category counters.
    pub fn index(&self) -> usize {
        match self {
            BlockingCategory::ExplicitContent => 0,
            BlockingCategory::AdultEntertainment => 1,
            BlockingCategory::Gambling => 2,
            BlockingCategory::DatingSites => 3,
            BlockingCategory::InappropriateImagery => 4,
            BlockingCategory::SuspiciousContent => 5,
        }
    }
}

impl fmt::Display for BlockingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockingCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockingCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown blocking category: {}", s))
    }
}
