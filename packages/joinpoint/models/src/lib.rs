#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Joinpoint regression record types for the REM dashboard.
//!
//! Rows of the two upstream joinpoint exports are represented here as plain
//! data: one [`SegmentRecord`] per municipality and trend segment, and one
//! [`ObservationRecord`] per municipality and period. The fixed display
//! mappings (significance labels, segment palette) live next to the types
//! they describe so that every consumer renders them the same way.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Whether a segment's PPC is statistically distinguishable from zero.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Significance {
    /// Flag `0` in the export.
    NotSignificant = 0,
    /// Flag `1` in the export.
    Significant = 1,
}

impl Significance {
    /// Returns the export flag value for this significance.
    #[must_use]
    pub const fn flag(self) -> u8 {
        self as u8
    }

    /// Creates a significance from the export's `0`/`1` flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the flag is neither `0` nor `1`.
    pub const fn from_flag(flag: u8) -> Result<Self, InvalidSignificanceFlagError> {
        match flag {
            0 => Ok(Self::NotSignificant),
            1 => Ok(Self::Significant),
            _ => Err(InvalidSignificanceFlagError { flag }),
        }
    }

    /// Display label shown in the summary table.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Significant => "Yes",
            Self::NotSignificant => "No",
        }
    }

    /// Marker color used for this significance in the PPC chart.
    #[must_use]
    pub const fn marker_color(self) -> &'static str {
        match self {
            Self::Significant => "blue",
            Self::NotSignificant => "orange",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::NotSignificant, Self::Significant]
    }
}

/// Error returned when a significance flag is not `0` or `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSignificanceFlagError {
    /// The invalid flag value that was provided.
    pub flag: u8,
}

impl std::fmt::Display for InvalidSignificanceFlagError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid significance flag {}: expected 0 or 1", self.flag)
    }
}

impl std::error::Error for InvalidSignificanceFlagError {}

/// Fixed six-color palette for segment lines in the trend chart.
///
/// Segment `i` is drawn with `SegmentColor::all()[i % 6]`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SegmentColor {
    /// Palette slot 0
    Blue,
    /// Palette slot 1
    Green,
    /// Palette slot 2
    Red,
    /// Palette slot 3
    Purple,
    /// Palette slot 4
    Orange,
    /// Palette slot 5
    Brown,
}

impl SegmentColor {
    /// Returns the palette in slot order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Blue,
            Self::Green,
            Self::Red,
            Self::Purple,
            Self::Orange,
            Self::Brown,
        ]
    }

    /// Picks the palette entry for a segment index, wrapping around.
    #[must_use]
    pub const fn for_segment(segment: u32) -> Self {
        let palette = Self::all();
        palette[segment as usize % palette.len()]
    }
}

/// One trend segment of a municipality's selected joinpoint model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRecord {
    /// Normalized (uppercase) municipality key.
    pub municipality: String,
    /// Segment index, unique within the municipality.
    pub segment: u32,
    /// First period covered by the segment (inclusive).
    pub start: i64,
    /// Last period covered by the segment (inclusive).
    pub end: i64,
    /// Percent per-period change estimated for the segment.
    pub ppc: f64,
    /// Whether the PPC is significant.
    pub significance: Significance,
    /// Joinpoint count of the selected model, when the export carries a
    /// `Model` column. The first row of a municipality is authoritative.
    pub model: Option<u32>,
}

impl SegmentRecord {
    /// Whether `period` lies within `[start, end]`.
    #[must_use]
    pub const fn contains_period(&self, period: i64) -> bool {
        self.start <= period && period <= self.end
    }

    /// Label derived from the significance flag.
    #[must_use]
    pub const fn significance_label(&self) -> &'static str {
        self.significance.label()
    }

    /// Palette color of this segment's fitted line.
    #[must_use]
    pub const fn color(&self) -> SegmentColor {
        SegmentColor::for_segment(self.segment)
    }
}

/// One observed period of a municipality together with its fitted value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationRecord {
    /// Normalized (uppercase) municipality key.
    pub municipality: String,
    /// Global period index.
    pub period: i64,
    /// Observed REM value.
    pub observed: f64,
    /// Model (fitted) value for the period.
    pub fitted: f64,
    /// Joinpoint count of the municipality's model, when the data export
    /// carries one. Constant per municipality.
    pub joinpoints: Option<u32>,
}

/// Normalizes a municipality key for storage and lookup.
#[must_use]
pub fn normalize_municipality(key: &str) -> String {
    key.trim().to_uppercase()
}
