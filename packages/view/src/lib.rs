#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dashboard view construction.
//!
//! [`build_view`] maps a selected municipality to the four artifacts the page
//! displays: the segmented trend chart, the segment summary table, the
//! joinpoint count text, and the PPC chart. It is a pure function of the
//! loaded [`JoinpointTables`] and the key, so repeated calls with the same
//! key produce identical views.

use rem_dashboard_joinpoint::JoinpointTables;
use rem_dashboard_joinpoint_models::{
    ObservationRecord, SegmentRecord, Significance, normalize_municipality,
};
use rem_dashboard_view_models::{
    DashboardView, Figure, Layout, Line, LineDash, Marker, MarkerColor, SegmentSummaryRow,
    Shape, Trace, TraceMode,
};

/// Text of the joinpoint box when a selection has no data.
pub const NO_DATA_TEXT: &str = "No data for this selection";

const TREND_HEIGHT: u32 = 700;
const PPC_HEIGHT: u32 = 350;
const OBSERVED_COLOR: &str = "darkred";
const PPC_LINE_COLOR: &str = "gray";
const REFERENCE_LINE_COLOR: &str = "black";

/// Errors that can occur while building a view.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    /// The key has no rows in the segment export.
    #[error("no segments for municipality '{0}'")]
    UnknownMunicipality(String),

    /// Neither export carries a joinpoint count for the key.
    #[error("no joinpoint count for municipality '{0}'")]
    MissingJoinpointCount(String),
}

/// Builds the dashboard view for `key` (case-insensitive).
///
/// # Errors
///
/// * [`ViewError::UnknownMunicipality`] if the key has no segments
/// * [`ViewError::MissingJoinpointCount`] if neither export carries the
///   key's joinpoint count
pub fn build_view(tables: &JoinpointTables, key: &str) -> Result<DashboardView, ViewError> {
    let municipality = normalize_municipality(key);

    let segments: Vec<&SegmentRecord> = tables.segments_for(&municipality).collect();
    if segments.is_empty() {
        return Err(ViewError::UnknownMunicipality(municipality));
    }

    let joinpoints = tables
        .joinpoint_count(&municipality)
        .ok_or_else(|| ViewError::MissingJoinpointCount(municipality.clone()))?;

    let observations = tables.sorted_observations_for(&municipality);

    log::debug!(
        "Building view for {municipality}: {} segments, {} observations",
        segments.len(),
        observations.len()
    );

    Ok(DashboardView {
        trend: trend_figure(&municipality, &segments, &observations),
        summary: summary_rows(&segments),
        joinpoints_text: joinpoints_text(joinpoints),
        ppc: ppc_figure(&municipality, &segments),
        has_data: true,
        municipality,
    })
}

/// Builds the view for `key`, falling back to [`DashboardView`] placeholders
/// via [`no_data_view`] when the key has no data.
#[must_use]
pub fn render(tables: &JoinpointTables, key: &str) -> DashboardView {
    build_view(tables, key).unwrap_or_else(|e| {
        log::warn!("Showing empty dashboard: {e}");
        no_data_view(key)
    })
}

/// Placeholder view shown for a selection without data.
#[must_use]
pub fn no_data_view(key: &str) -> DashboardView {
    let municipality = normalize_municipality(key);
    let title = format!("No data for {municipality}");

    DashboardView {
        trend: Figure::new(Layout::new(title.clone(), "Period", "REM", TREND_HEIGHT)),
        summary: Vec::new(),
        joinpoints_text: NO_DATA_TEXT.to_string(),
        ppc: Figure::new(Layout::new(title, "Segment", "PPC", PPC_HEIGHT)),
        has_data: false,
        municipality,
    }
}

/// Formats the joinpoint count box text.
#[must_use]
pub fn joinpoints_text(joinpoints: u32) -> String {
    format!("N° Joinpoints: {joinpoints}")
}

/// Observed markers plus one fitted line per segment, restricted to the
/// segment's inclusive period range. `observations` must be sorted by period.
fn trend_figure(
    municipality: &str,
    segments: &[&SegmentRecord],
    observations: &[&ObservationRecord],
) -> Figure {
    let layout = Layout::new(
        format!("Joinpoint model – {municipality}"),
        "Period",
        "REM",
        TREND_HEIGHT,
    );

    let observed = Trace::scatter("Observed", TraceMode::Markers)
        .with_points(observations.iter().map(|o| (o.period, o.observed)))
        .with_marker(Marker {
            color: MarkerColor::Single(OBSERVED_COLOR.to_string()),
            size: Some(7.0),
            line: None,
        });

    segments.iter().fold(
        Figure::new(layout).with_trace(observed),
        |figure, segment| {
            let fitted = observations
                .iter()
                .filter(|o| segment.contains_period(o.period))
                .map(|o| (o.period, o.fitted));

            figure.with_trace(
                Trace::scatter(format!("Segment {}", segment.segment), TraceMode::Lines)
                    .with_points(fitted)
                    .with_line(Line::colored(segment.color().to_string()).with_width(3.0)),
            )
        },
    )
}

fn summary_rows(segments: &[&SegmentRecord]) -> Vec<SegmentSummaryRow> {
    segments
        .iter()
        .map(|s| SegmentSummaryRow {
            segment: s.segment,
            ppc: s.ppc,
            significance: s.significance_label().to_string(),
        })
        .collect()
}

/// PPC per segment, markers colored by significance, with a zero line.
fn ppc_figure(municipality: &str, segments: &[&SegmentRecord]) -> Figure {
    let layout = Layout::new(
        format!("PPC by segment – {municipality}"),
        "Segment",
        "PPC",
        PPC_HEIGHT,
    )
    .with_shape(Shape::horizontal_line(
        0.0,
        Line::colored(REFERENCE_LINE_COLOR),
    ));

    let colors = segments
        .iter()
        .map(|s| Significance::marker_color(s.significance).to_string())
        .collect();

    Figure::new(layout).with_trace(
        Trace::scatter("PPC", TraceMode::MarkersAndLines)
            .with_points(segments.iter().map(|s| (i64::from(s.segment), s.ppc)))
            .with_marker(Marker {
                color: MarkerColor::PerPoint(colors),
                size: Some(12.0),
                line: Some(Line::colored("black").with_width(1.0)),
            })
            .with_line(Line::colored(PPC_LINE_COLOR).with_dash(LineDash::Dash)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rem_dashboard_joinpoint_models::SegmentColor;

    fn segment(municipality: &str, seg: u32, start: i64, end: i64, ppc: f64, sig: u8) -> SegmentRecord {
        SegmentRecord {
            municipality: municipality.to_string(),
            segment: seg,
            start,
            end,
            ppc,
            significance: Significance::from_flag(sig).unwrap(),
            model: None,
        }
    }

    fn observation(municipality: &str, period: i64, joinpoints: u32) -> ObservationRecord {
        #[allow(clippy::cast_precision_loss)]
        let value = period as f64;
        ObservationRecord {
            municipality: municipality.to_string(),
            period,
            observed: value + 0.5,
            fitted: value * 2.0,
            joinpoints: Some(joinpoints),
        }
    }

    /// Two segments for `X` covering periods 0-10, observations stored in
    /// reverse order, plus a municipality `Y` with segments but no data and
    /// no joinpoint count.
    fn tables() -> JoinpointTables {
        let segments = vec![
            segment("X", 1, 0, 5, -2.1, 1),
            segment("X", 2, 6, 10, 3.4, 0),
            segment("Y", 0, 0, 3, 1.0, 0),
        ];
        let observations = (0..=10).rev().map(|p| observation("X", p, 1)).collect();
        JoinpointTables::from_records(segments, observations).unwrap()
    }

    #[test]
    fn builds_two_segment_scenario() {
        let tables = tables();
        let view = build_view(&tables, "X").unwrap();

        assert!(view.has_data);
        assert_eq!(view.municipality, "X");
        assert_eq!(view.joinpoints_text, "N° Joinpoints: 1");

        assert_eq!(view.summary.len(), 2);
        assert_eq!(view.summary[0].segment, 1);
        assert_eq!(view.summary[0].significance, "Yes");
        assert_eq!(view.summary[1].segment, 2);
        assert_eq!(view.summary[1].significance, "No");

        let ppc = &view.ppc.data[0];
        assert_eq!(ppc.x, vec![1, 2]);
        assert_eq!(ppc.y, vec![-2.1, 3.4]);
        assert_eq!(
            ppc.marker.as_ref().unwrap().color,
            MarkerColor::PerPoint(vec!["blue".to_string(), "orange".to_string()])
        );
        assert_eq!(view.ppc.layout.shapes.len(), 1);
        assert!(view.ppc.layout.shapes[0].y0.abs() < f64::EPSILON);

        let trend = &view.trend.data;
        assert_eq!(trend.len(), 3);
        assert_eq!(trend[0].name, "Observed");
        assert_eq!(trend[0].x, (0..=10).collect::<Vec<_>>());
        assert_eq!(trend[1].name, "Segment 1");
        assert_eq!(trend[1].x, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(trend[2].name, "Segment 2");
        assert_eq!(trend[2].x, vec![6, 7, 8, 9, 10]);
    }

    #[test]
    fn segment_lines_use_fitted_values() {
        let tables = tables();
        let view = build_view(&tables, "X").unwrap();
        let line = &view.trend.data[1];
        let expected: Vec<f64> = (0..=5).map(|p| f64::from(p) * 2.0).collect();
        assert_eq!(line.y, expected);
        assert_eq!(line.mode, TraceMode::Lines);
    }

    #[test]
    fn segment_end_is_inclusive() {
        let tables = tables();
        let view = build_view(&tables, "X").unwrap();
        assert_eq!(view.trend.data[1].x.last(), Some(&5));
        assert_eq!(view.trend.data[2].x.first(), Some(&6));
        assert_eq!(view.trend.data[2].x.last(), Some(&10));
    }

    #[test]
    fn segment_lines_stay_within_bounds() {
        let segments = vec![
            segment("Z", 0, 2, 4, 0.1, 0),
            segment("Z", 1, 4, 8, 0.2, 1),
            segment("Z", 7, 20, 30, 0.3, 1),
        ];
        let observations = (0..=10).map(|p| observation("Z", p, 2)).collect();
        let tables = JoinpointTables::from_records(segments, observations).unwrap();
        let view = build_view(&tables, "Z").unwrap();

        let periods: Vec<i64> = (0..=10).collect();
        for (trace, seg) in view.trend.data[1..].iter().zip(tables.segments_for("Z")) {
            assert!(trace.x.iter().all(|p| periods.contains(p)));
            assert!(trace.x.iter().all(|&p| seg.start <= p && p <= seg.end));
        }
        assert_eq!(view.trend.data[1].x, vec![2, 3, 4]);
        assert_eq!(view.trend.data[2].x, vec![4, 5, 6, 7, 8]);
        assert!(view.trend.data[3].is_empty());
    }

    #[test]
    fn colors_segments_by_index_with_wraparound() {
        let segments = (0..14).map(|i| segment("W", i, i64::from(i), i64::from(i), 0.0, 0)).collect();
        let observations = (0..14).map(|p| observation("W", p, 13)).collect();
        let tables = JoinpointTables::from_records(segments, observations).unwrap();
        let view = build_view(&tables, "W").unwrap();

        for (i, trace) in view.trend.data[1..].iter().enumerate() {
            let index = u32::try_from(i).unwrap();
            let expected = SegmentColor::all()[i % 6].to_string();
            assert_eq!(trace.name, format!("Segment {index}"));
            assert_eq!(trace.line.as_ref().unwrap().color.as_deref(), Some(expected.as_str()));
        }
    }

    #[test]
    fn ppc_points_match_summary_rows() {
        let tables = tables();
        for key in tables.municipalities() {
            let Ok(view) = build_view(&tables, key) else {
                continue;
            };
            let ppc = &view.ppc.data[0];
            assert_eq!(ppc.len(), view.summary.len());
            for ((x, y), row) in ppc.x.iter().zip(&ppc.y).zip(&view.summary) {
                assert_eq!(*x, i64::from(row.segment));
                assert!((y - row.ppc).abs() < f64::EPSILON);
            }
        }
    }

    #[test]
    fn joinpoint_text_falls_back_to_data_export() {
        // no segment `Model`; first data row by source order is period 1
        let segments = vec![segment("V", 0, 0, 1, 0.0, 0)];
        let observations = vec![observation("V", 1, 4), observation("V", 0, 4)];
        let tables = JoinpointTables::from_records(segments, observations).unwrap();
        let view = build_view(&tables, "V").unwrap();
        assert_eq!(view.joinpoints_text, "N° Joinpoints: 4");
        assert_eq!(view.trend.data[0].x, vec![0, 1]);
    }

    const SEGMENTS: &str = "\
municipio,Model,Segment,Segment Start,Segment End,PPC,PPC Significant
X,1,1,0,5,-2.1,1
X,1,2,6,10,3.4,0
";

    #[test]
    fn joinpoint_text_reads_segment_export_model() {
        let data = "municipio,periodo_global,REM,Model\nX,0,1.0,0.9\nX,6,2.0,1.9\n";
        let tables =
            JoinpointTables::from_readers(SEGMENTS.as_bytes(), data.as_bytes(), b',').unwrap();
        let view = build_view(&tables, "X").unwrap();
        assert_eq!(view.joinpoints_text, "N° Joinpoints: 1");
        assert_eq!(view.trend.data[1].y, vec![0.9]);
        assert_eq!(view.trend.data[2].y, vec![1.9]);
    }

    #[test]
    fn segment_export_count_wins_over_data_export() {
        let data = "municipio,periodo_global,REM,Model,Joinpoints\nX,0,1.0,0.9,3\nX,6,2.0,1.9,3\n";
        let tables =
            JoinpointTables::from_readers(SEGMENTS.as_bytes(), data.as_bytes(), b',').unwrap();
        let view = build_view(&tables, "X").unwrap();
        assert_eq!(view.joinpoints_text, "N° Joinpoints: 1");
    }

    #[test]
    fn segments_without_observations_still_render() {
        let data = "municipio,periodo_global,REM,Model\nOTHER,0,1.0,0.9\n";
        let tables =
            JoinpointTables::from_readers(SEGMENTS.as_bytes(), data.as_bytes(), b',').unwrap();
        let view = build_view(&tables, "X").unwrap();
        assert!(view.has_data);
        assert_eq!(view.joinpoints_text, "N° Joinpoints: 1");
        assert_eq!(view.summary.len(), 2);
        assert!(view.trend.data[0].is_empty());
    }

    #[test]
    fn is_case_insensitive() {
        let tables = tables();
        assert_eq!(
            build_view(&tables, "x").unwrap(),
            build_view(&tables, "X").unwrap()
        );
    }

    #[test]
    fn is_idempotent() {
        let tables = tables();
        let first = serde_json::to_string(&build_view(&tables, "X").unwrap()).unwrap();
        let second = serde_json::to_string(&build_view(&tables, "X").unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn reports_unknown_and_incomplete_municipalities() {
        let tables = tables();
        assert_eq!(
            build_view(&tables, "nowhere"),
            Err(ViewError::UnknownMunicipality("NOWHERE".to_string()))
        );
        assert_eq!(
            build_view(&tables, "Y"),
            Err(ViewError::MissingJoinpointCount("Y".to_string()))
        );
    }

    #[test]
    fn render_falls_back_to_no_data_view() {
        let tables = tables();
        let view = render(&tables, "nowhere");
        assert!(!view.has_data);
        assert_eq!(view.municipality, "NOWHERE");
        assert_eq!(view.joinpoints_text, NO_DATA_TEXT);
        assert!(view.summary.is_empty());
        assert!(view.trend.data.is_empty());
        assert!(view.ppc.data.is_empty());
        assert_eq!(view.trend.layout.title.text, "No data for NOWHERE");

        assert!(render(&tables, "X").has_data);
    }
}
