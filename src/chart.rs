//! PNR–IDIR scatter plot: render-ready dataset and SVG output.

use std::fmt::Write;

use serde::Serialize;

use crate::models::{AnalysisResult, Quadrant};
use crate::quadrant::THRESHOLD;

pub const AXIS_MIN: f64 = 0.0;
pub const AXIS_MAX: f64 = 2.0;
pub const TICK_STEP: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub speaker: String,
    pub pnr: f64,
    pub idir: f64,
    pub quadrant: Quadrant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub title: &'static str,
    pub range: [f64; 2],
    pub dtick: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdLine {
    pub axis: &'static str,
    pub value: f64,
    pub dash: &'static str,
    pub color: &'static str,
}

/// Everything a plotting front end needs; axes never autoscale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterDataset {
    pub points: Vec<ScatterPoint>,
    pub x_axis: Axis,
    pub y_axis: Axis,
    pub thresholds: [ThresholdLine; 2],
}

impl ScatterDataset {
    pub fn from_result(result: &AnalysisResult) -> Self {
        let points = result
            .rows
            .iter()
            .map(|row| ScatterPoint {
                speaker: row.record.speaker_id.clone(),
                pnr: row.metrics.pnr,
                idir: row.metrics.idir,
                quadrant: row.quadrant,
            })
            .collect();

        Self {
            points,
            x_axis: Axis {
                title: "PNR (0–2 scale)",
                range: [AXIS_MIN, AXIS_MAX],
                dtick: TICK_STEP,
            },
            y_axis: Axis {
                title: "IDIR (0–2 scale)",
                range: [AXIS_MIN, AXIS_MAX],
                dtick: TICK_STEP,
            },
            thresholds: [
                ThresholdLine {
                    axis: "x",
                    value: THRESHOLD,
                    dash: "dash",
                    color: "purple",
                },
                ThresholdLine {
                    axis: "y",
                    value: THRESHOLD,
                    dash: "dash",
                    color: "purple",
                },
            ],
        }
    }
}

pub fn quadrant_color(quadrant: Quadrant) -> &'static str {
    match quadrant {
        Quadrant::Q1 => "#636efa",
        Quadrant::Q2 => "#ef553b",
        Quadrant::Q3 => "#00cc96",
        Quadrant::Q4 => "#ab63fa",
        Quadrant::Undefined => "#9ca3af",
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Points beyond the axis range are pinned to the edge; NaN is dropped.
fn clamp_to_axis(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value.clamp(AXIS_MIN, AXIS_MAX))
    }
}

/// Generate the axis-locked scatter chart as a standalone SVG document
pub fn render_svg(dataset: &ScatterDataset) -> String {
    let width = 720.0;
    let height = 550.0;
    let margin = 60.0;
    let plot_w = width - 2.0 * margin;
    let plot_h = height - 2.0 * margin;
    let span = AXIS_MAX - AXIS_MIN;

    let sx = |v: f64| margin + (v - AXIS_MIN) / span * plot_w;
    let sy = |v: f64| height - margin - (v - AXIS_MIN) / span * plot_h;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" style="background:white">"##
    );

    // Grid and ticks, one per 0.1, labelled every 0.2 to keep them legible.
    let ticks = (span / dataset.x_axis.dtick).round() as usize;
    for i in 0..=ticks {
        let v = AXIS_MIN + i as f64 * dataset.x_axis.dtick;
        let (x, y) = (sx(v), sy(v));
        let _ = writeln!(
            svg,
            r##"  <line x1="{x:.1}" y1="{:.1}" x2="{x:.1}" y2="{:.1}" stroke="#e5e7eb" stroke-width="1"/>"##,
            margin,
            height - margin
        );
        let _ = writeln!(
            svg,
            r##"  <line x1="{:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="#e5e7eb" stroke-width="1"/>"##,
            margin,
            width - margin
        );
        if i % 2 == 0 {
            let _ = writeln!(
                svg,
                r##"  <text x="{x:.1}" y="{:.1}" text-anchor="middle" font-size="11" fill="#6b7280">{v:.1}</text>"##,
                height - margin + 18.0
            );
            let _ = writeln!(
                svg,
                r##"  <text x="{:.1}" y="{:.1}" text-anchor="end" font-size="11" fill="#6b7280">{v:.1}</text>"##,
                margin - 8.0,
                y + 4.0
            );
        }
    }

    // Axes
    let _ = writeln!(
        svg,
        r##"  <line x1="{margin}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#374151" stroke-width="1.5"/>"##,
        height - margin,
        width - margin,
        height - margin
    );
    let _ = writeln!(
        svg,
        r##"  <line x1="{margin}" y1="{margin}" x2="{margin}" y2="{:.1}" stroke="#374151" stroke-width="1.5"/>"##,
        height - margin
    );
    let _ = writeln!(
        svg,
        r##"  <text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="13" fill="#374151">{}</text>"##,
        width / 2.0,
        height - 15.0,
        dataset.x_axis.title
    );
    let _ = writeln!(
        svg,
        r##"  <text x="18" y="{:.1}" text-anchor="middle" font-size="13" fill="#374151" transform="rotate(-90, 18, {:.1})">{}</text>"##,
        height / 2.0,
        height / 2.0,
        dataset.y_axis.title
    );

    for line in &dataset.thresholds {
        let (x1, y1, x2, y2) = if line.axis == "x" {
            (sx(line.value), margin, sx(line.value), height - margin)
        } else {
            (margin, sy(line.value), width - margin, sy(line.value))
        };
        let _ = writeln!(
            svg,
            r##"  <line class="threshold" x1="{x1:.1}" y1="{y1:.1}" x2="{x2:.1}" y2="{y2:.1}" stroke="{}" stroke-width="1.5" stroke-dasharray="6,4"/>"##,
            line.color
        );
    }

    for point in &dataset.points {
        let (Some(px), Some(py)) = (clamp_to_axis(point.pnr), clamp_to_axis(point.idir)) else {
            continue;
        };
        let (x, y) = (sx(px), sy(py));
        let color = quadrant_color(point.quadrant);
        let label = escape(&point.speaker);
        let _ = writeln!(
            svg,
            r##"  <circle class="point" cx="{x:.1}" cy="{y:.1}" r="6" fill="{color}"><title>{label}: PNR {:.3}, IDIR {:.3} ({})</title></circle>"##,
            point.pnr,
            point.idir,
            point.quadrant
        );
        let _ = writeln!(
            svg,
            r##"  <text x="{x:.1}" y="{:.1}" text-anchor="middle" font-size="12" fill="#1f2937">{label}</text>"##,
            y - 10.0
        );
    }

    // Legend
    for (i, quadrant) in Quadrant::ALL.iter().enumerate() {
        let y = margin + 10.0 + i as f64 * 18.0;
        let _ = writeln!(
            svg,
            r##"  <circle cx="{:.1}" cy="{y:.1}" r="5" fill="{}"/>"##,
            width - margin + 12.0,
            quadrant_color(*quadrant)
        );
        let _ = writeln!(
            svg,
            r##"  <text x="{:.1}" y="{:.1}" font-size="11" fill="#374151">{quadrant}</text>"##,
            width - margin + 20.0,
            y + 4.0
        );
    }

    svg.push_str("</svg>\n");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SpeakerRecord;
    use crate::pipeline::AnalysisPipeline;

    fn dataset() -> ScatterDataset {
        let records = vec![
            SpeakerRecord::new("A", 2.0, 4.0, 1.0, 5.0),
            SpeakerRecord::new("B<&>", 10.0, 2.0, 0.0, 1.0),
            SpeakerRecord::new("T", 1.0, 0.0, 0.0, 3.0),
            SpeakerRecord::new("Z", 0.0, 0.0, 0.0, 0.0),
        ];
        ScatterDataset::from_result(&AnalysisPipeline::new().run(records).unwrap())
    }

    #[test]
    fn axes_are_locked_to_zero_two() {
        let data = dataset();
        assert_eq!(data.x_axis.range, [0.0, 2.0]);
        assert_eq!(data.y_axis.range, [0.0, 2.0]);
        assert_eq!(data.x_axis.dtick, 0.1);
        assert_eq!(data.thresholds[0].value, 1.0);
        assert_eq!(data.thresholds[1].axis, "y");
    }

    #[test]
    fn dataset_keeps_row_order() {
        let speakers: Vec<_> = dataset().points.into_iter().map(|p| p.speaker).collect();
        assert_eq!(speakers, vec!["A", "B<&>", "T", "Z"]);
    }

    #[test]
    fn svg_has_dashed_thresholds_and_plottable_points() {
        let svg = render_svg(&dataset());
        assert_eq!(svg.matches(r#"class="threshold""#).count(), 2);
        assert!(svg.contains(r#"stroke-dasharray="6,4""#));
        // Z has NaN ratios and is left off the chart.
        assert_eq!(svg.matches(r#"class="point""#).count(), 3);
        assert!(svg.contains("B&lt;&amp;&gt;"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn out_of_range_points_are_pinned_to_the_edge() {
        assert_eq!(clamp_to_axis(f64::INFINITY), Some(2.0));
        assert_eq!(clamp_to_axis(3.5), Some(2.0));
        assert_eq!(clamp_to_axis(0.4), Some(0.4));
        assert_eq!(clamp_to_axis(f64::NAN), None);
    }

    #[test]
    fn dataset_serializes_to_json() {
        let json = serde_json::to_value(dataset()).unwrap();
        assert_eq!(json["points"][0]["quadrant"], "Q1");
        assert_eq!(json["x_axis"]["range"][1], 2.0);
        // Non-finite ratios become null in JSON.
        assert!(json["points"][3]["pnr"].is_null());
    }
}
