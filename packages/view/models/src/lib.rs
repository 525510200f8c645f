#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! View types for the REM dashboard.
//!
//! Figures serialize to the JSON shape `Plotly.react` accepts directly
//! (`{ data: [...], layout: {...} }`), so the browser only forwards them to
//! the charting library. Field names therefore follow Plotly's schema rather
//! than the camelCase used by the rest of the API.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Plotly trace type. Only scatter traces are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TraceType {
    /// `scatter`
    Scatter,
}

/// How a scatter trace draws its points.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum TraceMode {
    /// Points only.
    #[serde(rename = "markers")]
    #[strum(serialize = "markers")]
    Markers,
    /// Connected line only.
    #[serde(rename = "lines")]
    #[strum(serialize = "lines")]
    Lines,
    /// Points joined by a line.
    #[serde(rename = "markers+lines")]
    #[strum(serialize = "markers+lines")]
    MarkersAndLines,
}

/// Line dash style.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LineDash {
    /// Continuous line.
    Solid,
    /// Dashed line.
    Dash,
    /// Dotted line.
    Dot,
}

/// Line styling for traces, marker outlines, and shapes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// CSS color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Width in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Dash style.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash: Option<LineDash>,
}

impl Line {
    /// A solid line of the given color.
    #[must_use]
    pub fn colored(color: impl Into<String>) -> Self {
        Self {
            color: Some(color.into()),
            ..Self::default()
        }
    }

    /// Sets the stroke width in pixels.
    #[must_use]
    pub const fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    /// Sets the dash style.
    #[must_use]
    pub const fn with_dash(mut self, dash: LineDash) -> Self {
        self.dash = Some(dash);
        self
    }
}

/// Marker color: one color for the whole trace or one per point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarkerColor {
    /// Same color for every point.
    Single(String),
    /// Color of each point, aligned with the trace's `x`/`y`.
    PerPoint(Vec<String>),
}

/// Marker styling for scatter points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Fill color(s).
    pub color: MarkerColor,
    /// Diameter in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    /// Outline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<Line>,
}

/// A single chart series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    /// Trace type.
    #[serde(rename = "type")]
    pub kind: TraceType,
    /// X values.
    pub x: Vec<i64>,
    /// Y values, aligned with `x`.
    pub y: Vec<f64>,
    /// Drawing mode.
    pub mode: TraceMode,
    /// Legend name.
    pub name: String,
    /// Point styling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
    /// Line styling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<Line>,
}

impl Trace {
    /// Creates an empty scatter trace.
    #[must_use]
    pub fn scatter(name: impl Into<String>, mode: TraceMode) -> Self {
        Self {
            kind: TraceType::Scatter,
            x: Vec::new(),
            y: Vec::new(),
            mode,
            name: name.into(),
            marker: None,
            line: None,
        }
    }

    /// Appends points to the trace.
    #[must_use]
    pub fn with_points(mut self, points: impl IntoIterator<Item = (i64, f64)>) -> Self {
        for (x, y) in points {
            self.x.push(x);
            self.y.push(y);
        }
        self
    }

    /// Sets the marker style.
    #[must_use]
    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.marker = Some(marker);
        self
    }

    /// Sets the line style.
    #[must_use]
    pub fn with_line(mut self, line: Line) -> Self {
        self.line = Some(line);
        self
    }

    /// Number of points in the trace.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Whether the trace has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Plotly text wrapper used for titles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title {
    /// Title text.
    pub text: String,
}

impl Title {
    /// A title with the given text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Axis configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Axis {
    /// Axis title.
    pub title: Title,
}

/// Layout shape kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    /// Straight line segment.
    Line,
}

/// A decoration drawn on the plot area, e.g. a reference line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    /// Shape kind.
    #[serde(rename = "type")]
    pub kind: ShapeType,
    /// Reference frame of `x0`/`x1` (`"paper"` spans the full width).
    pub xref: String,
    /// Reference frame of `y0`/`y1`.
    pub yref: String,
    /// Start x.
    pub x0: f64,
    /// End x.
    pub x1: f64,
    /// Start y.
    pub y0: f64,
    /// End y.
    pub y1: f64,
    /// Line styling.
    pub line: Line,
}

impl Shape {
    /// A horizontal line across the whole plot width at `y`.
    #[must_use]
    pub fn horizontal_line(y: f64, line: Line) -> Self {
        Self {
            kind: ShapeType::Line,
            xref: "paper".to_string(),
            yref: "y".to_string(),
            x0: 0.0,
            x1: 1.0,
            y0: y,
            y1: y,
            line,
        }
    }
}

/// Figure layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// Chart title.
    pub title: Title,
    /// X axis.
    pub xaxis: Axis,
    /// Y axis.
    pub yaxis: Axis,
    /// Plot area background color.
    pub plot_bgcolor: String,
    /// Figure height in pixels.
    pub height: u32,
    /// Reference shapes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shapes: Vec<Shape>,
}

impl Layout {
    /// A white-background layout with titled axes.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        x_title: impl Into<String>,
        y_title: impl Into<String>,
        height: u32,
    ) -> Self {
        Self {
            title: Title::new(title),
            xaxis: Axis {
                title: Title::new(x_title),
            },
            yaxis: Axis {
                title: Title::new(y_title),
            },
            plot_bgcolor: "white".to_string(),
            height,
            shapes: Vec::new(),
        }
    }

    /// Appends a shape drawn over the plot.
    #[must_use]
    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shapes.push(shape);
        self
    }
}

/// A complete chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    /// Series, drawn in order.
    pub data: Vec<Trace>,
    /// Layout.
    pub layout: Layout,
}

impl Figure {
    /// A figure with no traces.
    #[must_use]
    pub const fn new(layout: Layout) -> Self {
        Self {
            data: Vec::new(),
            layout,
        }
    }

    /// Appends a trace.
    #[must_use]
    pub fn with_trace(mut self, trace: Trace) -> Self {
        self.data.push(trace);
        self
    }
}

/// One row of the segment summary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentSummaryRow {
    /// Segment index.
    pub segment: u32,
    /// Percent per-period change.
    pub ppc: f64,
    /// Significance label.
    pub significance: String,
}

/// Everything the page displays for one selected municipality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    /// Normalized municipality key the view was built for.
    pub municipality: String,
    /// `false` when the selection had no data and placeholders are shown.
    pub has_data: bool,
    /// Observed values with one fitted line per segment.
    pub trend: Figure,
    /// Segment summary table rows.
    pub summary: Vec<SegmentSummaryRow>,
    /// Joinpoint count box text.
    pub joinpoints_text: String,
    /// PPC per segment chart.
    pub ppc: Figure,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trace_serializes_to_plotly_shape() {
        let trace = Trace::scatter("PPC", TraceMode::MarkersAndLines)
            .with_points([(1, -2.1), (2, 3.4)])
            .with_marker(Marker {
                color: MarkerColor::PerPoint(vec!["blue".to_string(), "orange".to_string()]),
                size: Some(12.0),
                line: None,
            })
            .with_line(Line::colored("gray").with_dash(LineDash::Dash));

        assert_eq!(
            serde_json::to_value(&trace).unwrap(),
            json!({
                "type": "scatter",
                "x": [1, 2],
                "y": [-2.1, 3.4],
                "mode": "markers+lines",
                "name": "PPC",
                "marker": { "color": ["blue", "orange"], "size": 12.0 },
                "line": { "color": "gray", "dash": "dash" },
            })
        );
    }

    #[test]
    fn layout_omits_empty_shapes() {
        let layout = Layout::new("Title", "Period", "REM", 700);
        let value = serde_json::to_value(&layout).unwrap();
        assert!(value.get("shapes").is_none());
        assert_eq!(value["xaxis"]["title"]["text"], "Period");
        assert_eq!(value["plot_bgcolor"], "white");

        let value = serde_json::to_value(
            layout.with_shape(Shape::horizontal_line(0.0, Line::colored("black"))),
        )
        .unwrap();
        assert_eq!(value["shapes"][0]["xref"], "paper");
        assert_eq!(value["shapes"][0]["type"], "line");
    }

    #[test]
    fn single_marker_color_serializes_as_string() {
        let marker = Marker {
            color: MarkerColor::Single("darkred".to_string()),
            size: Some(7.0),
            line: None,
        };
        assert_eq!(serde_json::to_value(&marker).unwrap()["color"], "darkred");
    }

    #[test]
    fn trace_mode_parses_from_plotly_names() {
        assert_eq!(
            "markers+lines".parse::<TraceMode>().unwrap(),
            TraceMode::MarkersAndLines
        );
        assert_eq!(TraceMode::Lines.to_string(), "lines");
    }
}
