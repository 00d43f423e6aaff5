use super::canvas::{Anchor, Canvas, Color, Style, TextStyle, GREY};
use super::{draw_title, draw_x_baseline, draw_y_axis, finite_extent, Axis, PlotArea};
use crate::core::aggregate::WaveSeries;
use crate::domain::model::{Gender, Group};
use crate::utils::error::Result;

pub const TITLE: &str = "Mean Wage Change by Wave, Gender, and Treatment (DiD)";
pub const X_LABEL: &str = "Wave (Post Transition)";
pub const Y_LABEL: &str = "dwage (After - Before)";

const MARKER_RADIUS: f64 = 3.5;

fn series_color(gender: Gender, group: Group) -> Color {
    match (gender, group) {
        (Gender::Male, Group::Control) => Color::rgb(0x1f, 0x77, 0xb4),
        (Gender::Male, Group::Treated) => Color::rgb(0xff, 0x7f, 0x0e),
        (Gender::Female, Group::Control) => Color::rgb(0x2c, 0xa0, 0x2c),
        (Gender::Female, Group::Treated) => Color::rgb(0xd6, 0x27, 0x28),
    }
}

/// Splits a series into runs of consecutive points with a mean.
fn runs(series: &WaveSeries) -> Vec<Vec<(i64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for point in &series.points {
        match point.mean {
            Some(mean) => current.push((point.wave, mean)),
            None if !current.is_empty() => out.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Mean outcome per post wave, one marked line per series. Waves with no
/// usable outcome break the line.
pub fn render_line_chart(series: &[WaveSeries], size: (f64, f64)) -> Result<String> {
    let (width, height) = size;
    let area = PlotArea::for_size(width, height)?;
    let mut canvas = Canvas::new(width, height);

    let points = series.iter().flat_map(|s| s.points.iter());
    let (wave_lo, wave_hi) =
        finite_extent(points.clone().map(|p| p.wave as f64)).unwrap_or((0.0, 0.0));
    let (y_lo, y_hi) = finite_extent(points.filter_map(|p| p.mean)).unwrap_or((0.0, 0.0));
    let mut x_axis = Axis::auto_linear(wave_lo, wave_hi, 8);
    // Waves are integers.
    x_axis.ticks.retain(|(v, _)| (v - v.round()).abs() < 1e-6);
    for (v, label) in x_axis.ticks.iter_mut() {
        *label = (v.round() as i64).to_string();
    }
    let y_axis = Axis::auto_linear(y_lo, y_hi, 6);

    draw_title(&mut canvas, &area, TITLE);
    draw_y_axis(&mut canvas, &area, &y_axis, Y_LABEL);
    draw_x_baseline(&mut canvas, &area, X_LABEL);

    let tick_text = TextStyle {
        size: 10.0,
        color: GREY,
        anchor: Anchor::Middle,
        ..Default::default()
    };
    for (value, text) in &x_axis.ticks {
        let x = x_axis.data_to_pixel(*value, area.left, area.right);
        canvas.line(x, area.bottom, x, area.bottom + 5.0, &Style::stroked(GREY, 1.0));
        canvas.text(x, area.bottom + 18.0, text, &tick_text);
    }

    if series.is_empty() {
        canvas.text(
            area.center_x(),
            area.center_y(),
            "No data",
            &TextStyle {
                size: 13.0,
                color: GREY,
                anchor: Anchor::Middle,
                ..Default::default()
            },
        );
        return Ok(canvas.finish_svg());
    }

    let to_pixel = |(wave, mean): (i64, f64)| {
        (
            x_axis.data_to_pixel(wave as f64, area.left, area.right),
            y_axis.data_to_pixel(mean, area.bottom, area.top),
        )
    };

    for s in series {
        let color = series_color(s.gender, s.group);
        let line_style = Style::stroked(color, 2.0).with_class("series-line");
        let marker_style = Style::filled(color).with_class("marker");
        for run in runs(s) {
            let pixels: Vec<(f64, f64)> = run.into_iter().map(to_pixel).collect();
            if pixels.len() > 1 {
                canvas.polyline(&pixels, &line_style);
            }
            for (x, y) in pixels {
                canvas.circle(x, y, MARKER_RADIUS, &marker_style);
            }
        }
    }

    // Legend, top-left inside the plot.
    let legend_text = TextStyle {
        size: 11.0,
        ..Default::default()
    };
    for (i, s) in series.iter().enumerate() {
        let y = area.top + 16.0 + i as f64 * 18.0;
        let x = area.left + 12.0;
        let color = series_color(s.gender, s.group);
        canvas.line(x, y, x + 24.0, y, &Style::stroked(color, 2.0).with_class("legend"));
        canvas.circle(x + 12.0, y, MARKER_RADIUS, &Style::filled(color));
        canvas.text(x + 32.0, y + 4.0, &s.label, &legend_text);
    }

    Ok(canvas.finish_svg())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregate::WavePoint;
    use crate::domain::model::cell_label;

    fn series(gender: Gender, group: Group, points: &[(i64, Option<f64>)]) -> WaveSeries {
        WaveSeries {
            gender,
            group,
            label: cell_label(gender, group),
            points: points
                .iter()
                .map(|&(wave, mean)| WavePoint {
                    wave,
                    mean,
                    rows: 1,
                })
                .collect(),
        }
    }

    #[test]
    fn test_one_line_per_series_with_legend() {
        let input = vec![
            series(Gender::Male, Group::Control, &[(2, Some(1.0)), (3, Some(1.5))]),
            series(Gender::Female, Group::Treated, &[(2, Some(2.0)), (3, Some(0.5)), (4, Some(1.0))]),
        ];

        let svg = render_line_chart(&input, (800.0, 600.0)).unwrap();

        assert_eq!(svg.matches(r#"class="series-line""#).count(), 2);
        assert_eq!(svg.matches(r#"class="marker""#).count(), 5);
        assert_eq!(svg.matches(r#"class="legend""#).count(), 2);
        assert!(svg.contains(">Male-Control<"));
        assert!(svg.contains(">Female-Treated<"));
        assert!(!svg.contains(">Male-Treated<"));
        assert!(svg.contains("#1f77b4"));
        assert!(svg.contains("#d62728"));
        assert!(svg.contains(X_LABEL));
        assert!(svg.contains(Y_LABEL));
    }

    #[test]
    fn test_missing_mean_breaks_the_line() {
        let input = vec![series(
            Gender::Male,
            Group::Treated,
            &[(1, Some(1.0)), (2, Some(2.0)), (3, None), (4, Some(0.0)), (5, Some(1.0))],
        )];

        let svg = render_line_chart(&input, (800.0, 600.0)).unwrap();

        assert_eq!(svg.matches(r#"class="series-line""#).count(), 2);
        assert_eq!(svg.matches(r#"class="marker""#).count(), 4);
    }

    #[test]
    fn test_isolated_point_has_marker_only() {
        let input = vec![series(Gender::Female, Group::Control, &[(7, Some(3.0))])];

        let svg = render_line_chart(&input, (800.0, 600.0)).unwrap();

        assert_eq!(svg.matches(r#"class="series-line""#).count(), 0);
        assert_eq!(svg.matches(r#"class="marker""#).count(), 1);
    }

    #[test]
    fn test_empty_renders_placeholder() {
        let svg = render_line_chart(&[], (800.0, 600.0)).unwrap();

        assert!(svg.contains(">No data<"));
        assert!(!svg.contains("<polyline"));
        assert!(svg.contains("Mean Wage Change by Wave, Gender, and Treatment (DiD)"));
    }

    #[test]
    fn test_runs() {
        let s = series(Gender::Male, Group::Control, &[(1, None), (2, Some(1.0)), (3, None)]);
        assert_eq!(runs(&s), vec![vec![(2, 1.0)]]);
    }
}
