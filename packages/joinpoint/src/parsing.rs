//! Header lookup and cell parsing for the joinpoint exports.
//!
//! The exports are produced by an upstream tool that writes integer columns
//! either as `6` or `6.0` depending on the release, so integer cells accept
//! integral floats as well.

use crate::{LoadError, Table};

/// Column positions of a parsed header row.
#[derive(Debug, Clone)]
pub struct Headers {
    table: Table,
    names: Vec<String>,
}

impl Headers {
    /// Captures the (trimmed) header names of `table`.
    #[must_use]
    pub fn new(table: Table, record: &csv::StringRecord) -> Self {
        Self {
            table,
            names: record.iter().map(|h| h.trim().to_owned()).collect(),
        }
    }

    /// Position of the first column named `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|h| h == name)
    }

    /// Positions of every column named `name`, in header order.
    #[must_use]
    pub fn find_all(&self, name: &str) -> Vec<usize> {
        self.names
            .iter()
            .enumerate()
            .filter(|(_, h)| *h == name)
            .map(|(i, _)| i)
            .collect()
    }

    /// Position of the first column named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::MissingColumn`] if no such column exists.
    pub fn require(&self, name: &str) -> Result<usize, LoadError> {
        self.find(name).ok_or_else(|| self.missing(name))
    }

    /// Builds the missing-column error for this table.
    #[must_use]
    pub fn missing(&self, column: &str) -> LoadError {
        LoadError::MissingColumn {
            table: self.table,
            column: column.to_owned(),
        }
    }
}

/// A data row together with the context needed for error reporting.
pub struct Row<'a> {
    table: Table,
    line: u64,
    headers: &'a Headers,
    record: &'a csv::StringRecord,
}

impl<'a> Row<'a> {
    /// Wraps `record`, taking its line number from the reader position.
    #[must_use]
    pub fn new(table: Table, headers: &'a Headers, record: &'a csv::StringRecord) -> Self {
        let line = record.position().map_or(0, csv::Position::line);
        Self {
            table,
            line,
            headers,
            record,
        }
    }

    /// Line on which the record starts; `0` when the reader gave no position.
    #[must_use]
    pub const fn line(&self) -> u64 {
        self.line
    }

    /// Raw (trimmed) text of the cell at `index`.
    #[must_use]
    pub fn text(&self, index: usize) -> &'a str {
        self.record.get(index).map_or("", str::trim)
    }

    /// Parses the cell at `index` as a float.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::InvalidCell`] if the cell is not a finite number.
    pub fn float(&self, index: usize) -> Result<f64, LoadError> {
        let text = self.text(index);
        parse_float(text).ok_or_else(|| self.invalid(index, text, "expected a number"))
    }

    /// Parses the cell at `index` as an integer.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::InvalidCell`] if the cell is not an integral value.
    pub fn integer(&self, index: usize) -> Result<i64, LoadError> {
        let text = self.text(index);
        parse_integer(text).ok_or_else(|| self.invalid(index, text, "expected an integer"))
    }

    /// Parses the cell at `index` as a non-negative 32-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::InvalidCell`] if the cell is not in range.
    pub fn unsigned(&self, index: usize) -> Result<u32, LoadError> {
        let text = self.text(index);
        parse_integer(text)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| self.invalid(index, text, "expected a non-negative integer"))
    }

    /// Parses the cell at `index` as a non-empty key.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::InvalidCell`] if the cell is blank.
    pub fn key(&self, index: usize) -> Result<&'a str, LoadError> {
        let text = self.text(index);
        if text.is_empty() {
            return Err(self.invalid(index, text, "expected a non-empty value"));
        }
        Ok(text)
    }

    /// Builds an invalid-cell error for the cell at `index`.
    #[must_use]
    pub fn invalid(&self, index: usize, value: &str, reason: &str) -> LoadError {
        LoadError::InvalidCell {
            table: self.table,
            line: self.line,
            column: self
                .headers
                .names
                .get(index)
                .cloned()
                .unwrap_or_default(),
            value: value.to_owned(),
            reason: reason.to_owned(),
        }
    }
}

/// Parses a finite float.
#[must_use]
pub fn parse_float(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses an integer written either as `6` or as an integral float `6.0`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn parse_integer(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let v = parse_float(s)?;
    if v.fract() != 0.0 || v < i64::MIN as f64 || v > i64::MAX as f64 {
        return None;
    }
    Some(v as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_float_integers() {
        assert_eq!(parse_integer("6"), Some(6));
        assert_eq!(parse_integer(" 6.0 "), Some(6));
        assert_eq!(parse_integer("-3"), Some(-3));
        assert_eq!(parse_integer("6.5"), None);
        assert_eq!(parse_integer("abc"), None);
        assert_eq!(parse_integer(""), None);
    }

    #[test]
    fn rejects_non_finite_floats() {
        assert_eq!(parse_float("3.4"), Some(3.4));
        assert_eq!(parse_float("NaN"), None);
        assert_eq!(parse_float("inf"), None);
    }

    #[test]
    fn finds_duplicate_headers_in_order() {
        let record = csv::StringRecord::from(vec!["municipio", "Model", " REM ", "Model"]);
        let headers = Headers::new(Table::Observations, &record);
        assert_eq!(headers.find("REM"), Some(2));
        assert_eq!(headers.find_all("Model"), vec![1, 3]);
        assert!(matches!(
            headers.require("periodo_global"),
            Err(LoadError::MissingColumn { column, .. }) if column == "periodo_global"
        ));
    }

    #[test]
    fn reports_column_name_for_invalid_cells() {
        let header_record = csv::StringRecord::from(vec!["Segment", "PPC"]);
        let headers = Headers::new(Table::Segments, &header_record);
        let record = csv::StringRecord::from(vec!["one", "2.5"]);
        let row = Row::new(Table::Segments, &headers, &record);

        assert!((row.float(1).unwrap() - 2.5).abs() < f64::EPSILON);
        match row.unsigned(0) {
            Err(LoadError::InvalidCell { column, value, .. }) => {
                assert_eq!(column, "Segment");
                assert_eq!(value, "one");
            }
            other => panic!("expected invalid cell, got {other:?}"),
        }
    }
}
