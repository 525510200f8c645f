#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Loader for the joinpoint regression exports.
//!
//! Reads the segment export (one row per municipality and trend segment) and
//! the data export (one row per municipality and period) into an immutable
//! [`JoinpointTables`]. Both files are loaded once at startup; any missing
//! column, unparsable cell, or broken per-municipality invariant is fatal.
//!
//! A municipality's joinpoint count comes from the `Model` column of its
//! first segment-export row. The data export's first `Model` column is the
//! fitted value for the period; a `Joinpoints` column, or a second `Model`
//! column, is read as that export's own count and only used as a fallback
//! and cross-check.

pub mod parsing;

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::{Path, PathBuf};

use rem_dashboard_joinpoint_models::{
    ObservationRecord, SegmentRecord, Significance, normalize_municipality,
};

use crate::parsing::{Headers, Row};

/// Municipality key column, present in both exports.
pub const MUNICIPALITY_COLUMN: &str = "municipio";
/// Segment index column of the segment export.
pub const SEGMENT_COLUMN: &str = "Segment";
/// Segment start period column of the segment export.
pub const SEGMENT_START_COLUMN: &str = "Segment Start";
/// Segment end period column of the segment export.
pub const SEGMENT_END_COLUMN: &str = "Segment End";
/// PPC column of the segment export.
pub const PPC_COLUMN: &str = "PPC";
/// PPC significance flag column of the segment export.
pub const PPC_SIGNIFICANT_COLUMN: &str = "PPC Significant";
/// Model column: the joinpoint count in the segment export, the fitted value
/// (first occurrence) in the data export.
pub const MODEL_COLUMN: &str = "Model";
/// Period column of the data export.
pub const PERIOD_COLUMN: &str = "periodo_global";
/// Observed value column of the data export.
pub const OBSERVED_COLUMN: &str = "REM";
/// Explicit joinpoint count column some data exports carry.
pub const JOINPOINTS_COLUMN: &str = "Joinpoints";

/// Which of the two exports an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    /// The segment (`APC`) export.
    Segments,
    /// The data (observed + fitted) export.
    Observations,
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Segments => write!(f, "segment export"),
            Self::Observations => write!(f, "data export"),
        }
    }
}

/// Errors that can occur while loading the joinpoint exports.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// An export file could not be opened.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The delimited text could not be parsed.
    #[error("CSV error in {table}: {source}")]
    Csv {
        /// Export being parsed.
        table: Table,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// A required column is missing from the header row.
    #[error("{table} is missing column '{column}'")]
    MissingColumn {
        /// Export being parsed.
        table: Table,
        /// Name of the missing column.
        column: String,
    },

    /// A cell could not be parsed.
    #[error("{table} line {line}, column '{column}': invalid value '{value}' ({reason})")]
    InvalidCell {
        /// Export being parsed.
        table: Table,
        /// Line number in the file.
        line: u64,
        /// Column name.
        column: String,
        /// Offending cell text.
        value: String,
        /// What was expected.
        reason: String,
    },

    /// A segment ends before it starts.
    #[error("segment {segment} of {municipality} has start {start} after end {end}")]
    InvalidSegmentRange {
        /// Municipality key.
        municipality: String,
        /// Segment index.
        segment: u32,
        /// Start period.
        start: i64,
        /// End period.
        end: i64,
    },

    /// The same segment index appears twice for a municipality.
    #[error("segment {segment} of {municipality} appears more than once")]
    DuplicateSegment {
        /// Municipality key.
        municipality: String,
        /// Segment index.
        segment: u32,
    },

    /// The data export's joinpoint count differs between rows of one
    /// municipality.
    #[error(
        "joinpoint count of {municipality} changes from {expected} to {found}{}",
        .line.map_or_else(String::new, |line| format!(" at data export line {line}"))
    )]
    InconsistentJoinpoints {
        /// Municipality key.
        municipality: String,
        /// Count read from the municipality's first row.
        expected: u32,
        /// Differing count.
        found: u32,
        /// Line of the differing row, when the records were read from a file.
        line: Option<u64>,
    },

    /// The segment export contains no rows.
    #[error("segment export contains no municipalities")]
    NoMunicipalities,
}

/// Where to read the two exports from.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Path of the segment (`APC`) export.
    pub segments_path: PathBuf,
    /// Path of the data export.
    pub observations_path: PathBuf,
    /// Field delimiter byte (defaults to `,`).
    pub delimiter: u8,
}

impl LoadOptions {
    /// Creates options for the given paths with a comma delimiter.
    #[must_use]
    pub fn new(segments_path: impl Into<PathBuf>, observations_path: impl Into<PathBuf>) -> Self {
        Self {
            segments_path: segments_path.into(),
            observations_path: observations_path.into(),
            delimiter: b',',
        }
    }

    /// Sets the field delimiter (e.g. `b'\t'` for tab-separated exports).
    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

/// Row positions of one municipality in both tables, in source order.
#[derive(Debug, Clone, Default)]
struct MunicipalityRows {
    segments: Vec<usize>,
    observations: Vec<usize>,
}

/// The two loaded exports, indexed by municipality.
///
/// Immutable after construction; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct JoinpointTables {
    segments: Vec<SegmentRecord>,
    observations: Vec<ObservationRecord>,
    municipalities: Vec<String>,
    index: BTreeMap<String, MunicipalityRows>,
    /// Source line of each observation; empty for in-memory records.
    observation_lines: Vec<u64>,
}

impl JoinpointTables {
    /// Loads both exports from disk.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if either file is missing or malformed, or if
    /// the data violates a per-municipality invariant.
    pub fn load(options: &LoadOptions) -> Result<Self, LoadError> {
        log::info!(
            "Loading joinpoint segments from {}",
            options.segments_path.display()
        );
        let segments = open(&options.segments_path)?;
        log::info!(
            "Loading joinpoint data from {}",
            options.observations_path.display()
        );
        let observations = open(&options.observations_path)?;

        Self::from_readers(segments, observations, options.delimiter)
    }

    /// Loads both exports from arbitrary readers.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if either source is malformed or the data
    /// violates a per-municipality invariant.
    pub fn from_readers(
        segments: impl Read,
        observations: impl Read,
        delimiter: u8,
    ) -> Result<Self, LoadError> {
        let segments = read_segments(segments, delimiter)?;
        let (observations, lines) = read_observations(observations, delimiter)?;
        Self::build(segments, observations, lines)
    }

    /// Builds the tables from already-parsed records, validating invariants
    /// and indexing rows by municipality.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the records violate a per-municipality
    /// invariant or contain no segments.
    pub fn from_records(
        segments: Vec<SegmentRecord>,
        observations: Vec<ObservationRecord>,
    ) -> Result<Self, LoadError> {
        Self::build(segments, observations, Vec::new())
    }

    fn build(
        segments: Vec<SegmentRecord>,
        observations: Vec<ObservationRecord>,
        observation_lines: Vec<u64>,
    ) -> Result<Self, LoadError> {
        let mut index: BTreeMap<String, MunicipalityRows> = BTreeMap::new();
        {
            let mut seen_segments: BTreeSet<(&str, u32)> = BTreeSet::new();
            for (row, seg) in segments.iter().enumerate() {
                if seg.start > seg.end {
                    return Err(LoadError::InvalidSegmentRange {
                        municipality: seg.municipality.clone(),
                        segment: seg.segment,
                        start: seg.start,
                        end: seg.end,
                    });
                }
                if !seen_segments.insert((seg.municipality.as_str(), seg.segment)) {
                    return Err(LoadError::DuplicateSegment {
                        municipality: seg.municipality.clone(),
                        segment: seg.segment,
                    });
                }
                index
                    .entry(seg.municipality.clone())
                    .or_default()
                    .segments
                    .push(row);
            }
        }

        if index.is_empty() {
            return Err(LoadError::NoMunicipalities);
        }

        // Only municipalities with segments are selectable.
        let municipalities: Vec<String> = index.keys().cloned().collect();

        for (row, obs) in observations.iter().enumerate() {
            index
                .entry(obs.municipality.clone())
                .or_default()
                .observations
                .push(row);
        }

        let tables = Self {
            segments,
            observations,
            municipalities,
            index,
            observation_lines,
        };
        tables.check_joinpoints()?;

        log::info!(
            "Loaded {} segments and {} observations for {} municipalities",
            tables.segments.len(),
            tables.observations.len(),
            tables.municipalities.len()
        );

        Ok(tables)
    }

    /// Asserts that the data export's joinpoint count is constant per
    /// municipality and warns when the two exports disagree.
    fn check_joinpoints(&self) -> Result<(), LoadError> {
        for (municipality, rows) in &self.index {
            let mut counts = rows
                .observations
                .iter()
                .filter_map(|&i| self.observations[i].joinpoints.map(|n| (i, n)));
            let data_count = counts.next().map(|(_, n)| n);

            if let Some(expected) = data_count
                && let Some((row, found)) = counts.find(|&(_, n)| n != expected)
            {
                return Err(LoadError::InconsistentJoinpoints {
                    municipality: municipality.clone(),
                    expected,
                    found,
                    line: self.observation_lines.get(row).copied(),
                });
            }

            if rows.segments.is_empty() {
                log::debug!("{municipality} has observations but no segments");
                continue;
            }
            if rows.observations.is_empty() {
                log::warn!("{municipality} has segments but no observations");
            }

            let segment_models: BTreeSet<u32> = rows
                .segments
                .iter()
                .filter_map(|&i| self.segments[i].model)
                .collect();
            if segment_models.len() > 1 {
                log::warn!(
                    "{municipality}: segment export reports models {segment_models:?}; \
                     using the first row's"
                );
            }

            let Some(count) = self.joinpoint_count(municipality) else {
                log::warn!("{municipality}: neither export carries a joinpoint count");
                continue;
            };

            if let Some(data_count) = data_count
                && data_count != count
            {
                log::warn!(
                    "{municipality}: segment export reports {count} joinpoints \
                     but data export reports {data_count}; using {count}"
                );
            }

            if rows.segments.len() != count as usize + 1 {
                log::warn!(
                    "{municipality}: {count} joinpoints but {} segments",
                    rows.segments.len()
                );
            }
        }

        Ok(())
    }

    /// Sorted, deduplicated municipality keys present in the segment export.
    #[must_use]
    pub fn municipalities(&self) -> &[String] {
        &self.municipalities
    }

    /// The first municipality alphabetically; the selector's default.
    #[must_use]
    pub fn default_municipality(&self) -> &str {
        self.municipalities.first().map_or("", String::as_str)
    }

    /// Whether `key` has any segment rows.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.rows(key).is_some_and(|rows| !rows.segments.is_empty())
    }

    /// Segment rows of `key`, in source order.
    pub fn segments_for<'a>(
        &'a self,
        key: &str,
    ) -> impl Iterator<Item = &'a SegmentRecord> + use<'a> {
        self.rows(key)
            .into_iter()
            .flat_map(move |rows| rows.segments.iter().map(move |&i| &self.segments[i]))
    }

    /// Observation rows of `key`, in source order.
    pub fn observations_for<'a>(
        &'a self,
        key: &str,
    ) -> impl Iterator<Item = &'a ObservationRecord> + use<'a> {
        self.rows(key)
            .into_iter()
            .flat_map(move |rows| {
                rows.observations
                    .iter()
                    .map(move |&i| &self.observations[i])
            })
    }

    /// Observation rows of `key`, sorted by period.
    #[must_use]
    pub fn sorted_observations_for(&self, key: &str) -> Vec<&ObservationRecord> {
        let mut rows: Vec<&ObservationRecord> = self.observations_for(key).collect();
        rows.sort_by_key(|obs| obs.period);
        rows
    }

    /// Joinpoint count of `key`.
    ///
    /// Read from the `Model` column of the key's first segment-export row.
    /// When the segment export has no `Model` column, falls back to the
    /// count the data export carries on the key's first observation row.
    /// `None` if neither export supplies one.
    #[must_use]
    pub fn joinpoint_count(&self, key: &str) -> Option<u32> {
        match self.segments_for(key).next() {
            Some(SegmentRecord {
                model: Some(model), ..
            }) => Some(*model),
            _ => self.observations_for(key).find_map(|obs| obs.joinpoints),
        }
    }

    /// Total number of segment rows.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Total number of observation rows.
    #[must_use]
    pub fn observation_count(&self) -> usize {
        self.observations.len()
    }

    fn rows(&self, key: &str) -> Option<&MunicipalityRows> {
        self.index.get(&normalize_municipality(key))
    }
}

fn open(path: &Path) -> Result<std::fs::File, LoadError> {
    std::fs::File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

fn csv_reader<R: Read>(source: R, delimiter: u8) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(source)
}

fn read_segments(source: impl Read, delimiter: u8) -> Result<Vec<SegmentRecord>, LoadError> {
    let table = Table::Segments;
    let csv_err = |source: csv::Error| LoadError::Csv { table, source };

    let mut reader = csv_reader(source, delimiter);
    let headers = Headers::new(table, reader.headers().map_err(csv_err)?);

    let municipality = headers.require(MUNICIPALITY_COLUMN)?;
    let segment = headers.require(SEGMENT_COLUMN)?;
    let start = headers.require(SEGMENT_START_COLUMN)?;
    let end = headers.require(SEGMENT_END_COLUMN)?;
    let ppc = headers.require(PPC_COLUMN)?;
    let significant = headers.require(PPC_SIGNIFICANT_COLUMN)?;
    let model = headers.find(MODEL_COLUMN);

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_err)?;
        let row = Row::new(table, &headers, &record);

        let flag = row.unsigned(significant)?;
        let significance = u8::try_from(flag)
            .ok()
            .and_then(|f| Significance::from_flag(f).ok())
            .ok_or_else(|| {
                row.invalid(significant, row.text(significant), "expected 0 or 1")
            })?;

        records.push(SegmentRecord {
            municipality: normalize_municipality(row.key(municipality)?),
            segment: row.unsigned(segment)?,
            start: row.integer(start)?,
            end: row.integer(end)?,
            ppc: row.float(ppc)?,
            significance,
            model: model.map(|i| row.unsigned(i)).transpose()?,
        });
    }

    log::debug!("Parsed {} segment rows", records.len());

    Ok(records)
}

fn read_observations(
    source: impl Read,
    delimiter: u8,
) -> Result<(Vec<ObservationRecord>, Vec<u64>), LoadError> {
    let table = Table::Observations;
    let csv_err = |source: csv::Error| LoadError::Csv { table, source };

    let mut reader = csv_reader(source, delimiter);
    let headers = Headers::new(table, reader.headers().map_err(csv_err)?);

    let municipality = headers.require(MUNICIPALITY_COLUMN)?;
    let period = headers.require(PERIOD_COLUMN)?;
    let observed = headers.require(OBSERVED_COLUMN)?;
    let fitted = headers.require(MODEL_COLUMN)?;
    // A repeated `Model` header carries the count when no `Joinpoints` column does.
    let joinpoints = headers
        .find(JOINPOINTS_COLUMN)
        .or_else(|| headers.find_all(MODEL_COLUMN).get(1).copied());

    let mut records = Vec::new();
    let mut lines = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_err)?;
        let row = Row::new(table, &headers, &record);

        records.push(ObservationRecord {
            municipality: normalize_municipality(row.key(municipality)?),
            period: row.integer(period)?,
            observed: row.float(observed)?,
            fitted: row.float(fitted)?,
            joinpoints: joinpoints.map(|i| row.unsigned(i)).transpose()?,
        });
        lines.push(row.line());
    }

    log::debug!("Parsed {} observation rows", records.len());

    Ok((records, lines))
}
