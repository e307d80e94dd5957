//! Line charts from long-form rows, drawn with plotters.

use std::path::Path;

use anyhow::{Result, anyhow, bail};
use chrono::{Duration, NaiveDateTime};
use plotters::coord::Shift;
use plotters::coord::types::RangedDateTime;
use plotters::prelude::*;

use crate::config::ChartFormat;
use crate::model::LongFormRow;

/// Static layout of one chart.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartLayout {
    pub title: &'static str,
    pub x_desc: &'static str,
    pub y_desc: &'static str,
    pub time_format: &'static str,
    pub mark_points: bool,
    pub size: (u32, u32),
}

pub const DAILY_CHART: ChartLayout = ChartLayout {
    title: "Daily Temperature Forecast",
    x_desc: "Date",
    y_desc: "Temperature (°F)",
    time_format: "%Y-%m-%d",
    mark_points: true,
    size: (1000, 600),
};

pub const HOURLY_CHART: ChartLayout = ChartLayout {
    title: "Hourly Forecast (Next 48 Hours)",
    x_desc: "Time",
    y_desc: "Value",
    time_format: "%Y-%m-%d %H:%M",
    mark_points: false,
    size: (1000, 600),
};

/// Points of one measure, in time order.
#[derive(Clone, Debug, PartialEq)]
pub struct PlotSeries {
    pub measure: String,
    pub points: Vec<(NaiveDateTime, f64)>,
}

/// Group rows by measure, keeping first-seen measure order. NaN values are dropped.
pub fn prepare_series(rows: &[LongFormRow]) -> Vec<PlotSeries> {
    let mut out: Vec<PlotSeries> = Vec::new();
    for row in rows {
        let idx = match out.iter().position(|s| s.measure == row.measure) {
            Some(i) => i,
            None => {
                out.push(PlotSeries {
                    measure: row.measure.clone(),
                    points: Vec::new(),
                });
                out.len() - 1
            }
        };
        if row.value.is_finite() {
            out[idx].points.push((row.time, row.value));
        }
    }
    for s in &mut out {
        s.points.sort_by_key(|(t, _)| *t);
    }
    out
}

/// Shared time axis across all series. A single instant is widened by an hour.
pub fn time_range(series: &[PlotSeries]) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let mut times = series.iter().flat_map(|s| s.points.iter().map(|(t, _)| *t));
    let first = times.next()?;
    let (lo, hi) = times.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)));
    if lo == hi {
        return Some((lo, hi + Duration::hours(1)));
    }
    Some((lo, hi))
}

/// Value axis with 10% padding, or ±1 around a flat line.
pub fn value_range(series: &[PlotSeries]) -> Option<(f64, f64)> {
    let (lo, hi) = series
        .iter()
        .flat_map(|s| s.points.iter().map(|(_, v)| *v))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() || !hi.is_finite() {
        return None;
    }
    let pad = if (hi - lo).abs() > 1e-6 { (hi - lo) * 0.1 } else { 1.0 };
    Some((lo - pad, hi + pad))
}

/// Render `rows` to `path` in the given format.
pub fn render_chart(path: &Path, format: ChartFormat, layout: &ChartLayout, rows: &[LongFormRow]) -> Result<()> {
    let series = prepare_series(rows);
    if time_range(&series).is_none() {
        bail!("no plottable values for '{}'", layout.title);
    }
    let drawn = match format {
        ChartFormat::Png => {
            let root = BitMapBackend::new(path, layout.size).into_drawing_area();
            draw(&root, layout, &series).map_err(|e| e.to_string())
        }
        ChartFormat::Svg => {
            let root = SVGBackend::new(path, layout.size).into_drawing_area();
            draw(&root, layout, &series).map_err(|e| e.to_string())
        }
    };
    drawn.map_err(|e| anyhow!("failed to draw {}: {e}", path.display()))
}

fn draw<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    layout: &ChartLayout,
    series: &[PlotSeries],
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    // Callers check for data first; an empty chart is just a blank canvas.
    let (Some((t0, t1)), Some((y0, y1))) = (time_range(series), value_range(series)) else {
        return root.fill(&WHITE);
    };

    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(root)
        .caption(layout.title, ("sans-serif", 28))
        .margin(15)
        .x_label_area_size(70)
        .y_label_area_size(60)
        .build_cartesian_2d(RangedDateTime::from(t0..t1), y0..y1)?;

    chart
        .configure_mesh()
        .x_desc(layout.x_desc)
        .y_desc(layout.y_desc)
        .x_labels(10)
        .x_label_formatter(&|dt: &NaiveDateTime| dt.format(layout.time_format).to_string())
        .light_line_style(BLACK.mix(0.1))
        .draw()?;

    for (i, s) in series.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        chart
            .draw_series(LineSeries::new(s.points.iter().copied(), color.stroke_width(2)))?
            .label(s.measure.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        if layout.mark_points {
            chart.draw_series(s.points.iter().map(|&p| Circle::new(p, 3, color.filled())))?;
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerMiddle)
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK)
        .draw()?;

    root.present()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn row(t: NaiveDateTime, m: &str, v: f64) -> LongFormRow {
        LongFormRow {
            time: t,
            measure: m.to_string(),
            value: v,
        }
    }

    #[test]
    fn groups_by_measure_in_first_seen_order() {
        let rows = vec![
            row(at(1, 0), "Temp Max", 80.0),
            row(at(2, 0), "Temp Max", 82.0),
            row(at(1, 0), "Temp Min", 60.0),
            row(at(2, 0), "Temp Min", f64::NAN),
        ];
        let s = prepare_series(&rows);
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].measure, "Temp Max");
        assert_eq!(s[0].points.len(), 2);
        assert_eq!(s[1].points, vec![(at(1, 0), 60.0)]);
    }

    #[test]
    fn ranges_are_padded() {
        let s = prepare_series(&[row(at(1, 0), "a", 10.0), row(at(1, 5), "b", 20.0)]);
        assert_eq!(time_range(&s), Some((at(1, 0), at(1, 5))));
        assert_eq!(value_range(&s), Some((9.0, 21.0)));

        let flat = prepare_series(&[row(at(1, 0), "a", 5.0)]);
        assert_eq!(time_range(&flat), Some((at(1, 0), at(1, 1))));
        assert_eq!(value_range(&flat), Some((4.0, 6.0)));
    }

    #[test]
    fn all_nan_has_no_range() {
        let s = prepare_series(&[row(at(1, 0), "a", f64::NAN)]);
        assert_eq!(time_range(&s), None);
        assert_eq!(value_range(&s), None);
        let dir = tempfile::tempdir().unwrap();
        let err = render_chart(&dir.path().join("x.svg"), ChartFormat::Svg, &DAILY_CHART, &[]).unwrap_err();
        assert!(err.to_string().contains("no plottable values"));
    }

    #[test]
    #[ignore] // needs a system font: cargo test -- --ignored
    fn renders_svg_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily.svg");
        let rows = vec![
            row(at(1, 0), "Temp Max", 80.0),
            row(at(2, 0), "Temp Max", 82.0),
            row(at(1, 0), "Temp Min", 60.0),
            row(at(2, 0), "Temp Min", 61.0),
        ];
        render_chart(&path, ChartFormat::Svg, &DAILY_CHART, &rows).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("Daily Temperature Forecast"));
    }
}
