use super::canvas::{Anchor, Canvas, Color, Style, TextStyle, BLACK, GREY};
use super::{draw_title, draw_x_baseline, draw_y_axis, finite_extent, Axis, PlotArea};
use crate::core::aggregate::CellMean;
use crate::domain::model::Gender;
use crate::utils::error::Result;

pub const TITLE: &str = "Average Wage Change by Gender & Treatment (DiD Setup)";
pub const Y_LABEL: &str = "Average Wage Change (After - Before)";

const MALE_FILL: Color = Color {
    r: 0,
    g: 0,
    b: 255,
    a: 0.7,
};
const FEMALE_FILL: Color = Color {
    r: 255,
    g: 0,
    b: 255,
    a: 0.7,
};

/// One bar per cell in the given order; cells without a mean are labelled `n/a`.
pub fn render_bar_chart(cells: &[CellMean], size: (f64, f64)) -> Result<String> {
    let (width, height) = size;
    let area = PlotArea::for_size(width, height)?;
    let mut canvas = Canvas::new(width, height);

    let (lo, hi) = finite_extent(cells.iter().filter_map(|c| c.mean)).unwrap_or((0.0, 0.0));
    let axis = Axis::auto_linear(lo.min(0.0), hi.max(0.0), 6);

    draw_title(&mut canvas, &area, TITLE);
    draw_y_axis(&mut canvas, &area, &axis, Y_LABEL);

    let zero_y = axis.data_to_pixel(0.0, area.bottom, area.top);
    let slot = area.width() / cells.len().max(1) as f64;
    let bar_width = slot * 0.6;
    let label_style = TextStyle {
        size: 11.0,
        anchor: Anchor::End,
        rotate: Some(-15.0),
        ..Default::default()
    };

    for (i, cell) in cells.iter().enumerate() {
        let center = area.left + slot * (i as f64 + 0.5);
        match cell.mean {
            Some(mean) => {
                let y = axis.data_to_pixel(mean, area.bottom, area.top);
                let fill = match cell.gender {
                    Gender::Male => MALE_FILL,
                    Gender::Female => FEMALE_FILL,
                };
                let mut style = Style::filled(fill).with_class("bar");
                style.stroke = Some(BLACK);
                style.stroke_width = 0.5;
                canvas.rect(
                    center - bar_width / 2.0,
                    y.min(zero_y),
                    bar_width,
                    (y - zero_y).abs(),
                    &style,
                );
            }
            None => {
                canvas.text(
                    center,
                    zero_y - 6.0,
                    "n/a",
                    &TextStyle {
                        size: 11.0,
                        color: GREY,
                        anchor: Anchor::Middle,
                        ..Default::default()
                    },
                );
            }
        }
        canvas.text(center + 20.0, area.bottom + 18.0, &cell.label, &label_style);
    }

    canvas.line(area.left, zero_y, area.right, zero_y, &Style::stroked(BLACK, 0.8));
    draw_x_baseline(&mut canvas, &area, "");

    Ok(canvas.finish_svg())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{cell_label, Group, CELLS};

    fn cells(means: [Option<f64>; 4]) -> Vec<CellMean> {
        CELLS
            .iter()
            .zip(means)
            .map(|(&(gender, group), mean)| CellMean {
                gender,
                group,
                label: cell_label(gender, group),
                mean,
                rows: usize::from(mean.is_some()),
            })
            .collect()
    }

    #[test]
    fn test_four_bars_in_order() {
        let svg = render_bar_chart(&cells([Some(1.0), Some(2.5), Some(-0.5), Some(3.0)]), (800.0, 600.0))
            .unwrap();

        assert_eq!(svg.matches(r#"class="bar""#).count(), 4);
        assert!(svg.contains("Average Wage Change by Gender &amp; Treatment (DiD Setup)"));
        assert!(svg.contains(Y_LABEL));
        let positions: Vec<usize> = ["Male-Control", "Male-Treated", "Female-Control", "Female-Treated"]
            .iter()
            .map(|label| svg.find(label).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(svg.matches("rgba(0,0,255,0.700)").count(), 2);
        assert_eq!(svg.matches("rgba(255,0,255,0.700)").count(), 2);
    }

    #[test]
    fn test_missing_cell_is_labelled() {
        let svg = render_bar_chart(&cells([Some(1.0), None, Some(2.0), Some(3.0)]), (800.0, 600.0))
            .unwrap();

        assert_eq!(svg.matches(r#"class="bar""#).count(), 3);
        assert!(svg.contains(">n/a<"));
        assert!(svg.contains("Male-Treated"));
    }

    #[test]
    fn test_all_missing_still_renders() {
        let input = cells([None, None, None, None]);
        assert_eq!(input[0].group, Group::Control);

        let svg = render_bar_chart(&input, (800.0, 600.0)).unwrap();
        assert_eq!(svg.matches(">n/a<").count(), 4);
        assert_eq!(svg.matches(r#"class="bar""#).count(), 0);
    }

    #[test]
    fn test_invalid_size() {
        let err = render_bar_chart(&cells([Some(1.0); 4]), (10.0, 10.0)).unwrap_err();
        assert!(err.to_string().contains("no room"));
    }
}
