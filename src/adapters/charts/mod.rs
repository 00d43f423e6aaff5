//! SVG rendering of the two DiD charts.

pub mod bar;
pub mod canvas;
pub mod line;

pub use bar::render_bar_chart;
pub use line::render_line_chart;

use crate::utils::error::{DidError, Result};
use canvas::{Anchor, Canvas, Style, TextStyle, BLACK, GREY, LIGHT_GREY};

pub const BAR_CHART_FILE: &str = "wage_change_by_group.svg";
pub const LINE_CHART_FILE: &str = "wage_change_by_wave.svg";

const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 80.0;

/// Pixel rectangle the data is drawn into.
#[derive(Debug, Clone, Copy)]
pub struct PlotArea {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl PlotArea {
    pub fn for_size(width: f64, height: f64) -> Result<Self> {
        if !(width.is_finite() && height.is_finite()) {
            return Err(DidError::RenderError {
                message: format!("chart size must be finite, got {}x{}", width, height),
            });
        }
        let area = Self {
            left: MARGIN_LEFT,
            top: MARGIN_TOP,
            right: width - MARGIN_RIGHT,
            bottom: height - MARGIN_BOTTOM,
        };
        if area.right - area.left < 50.0 || area.bottom - area.top < 50.0 {
            return Err(DidError::RenderError {
                message: format!("chart size {}x{} leaves no room for the plot", width, height),
            });
        }
        Ok(area)
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn center_x(&self) -> f64 {
        (self.left + self.right) / 2.0
    }

    pub fn center_y(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }
}

/// Linear axis with "nice number" ticks.
#[derive(Debug, Clone)]
pub struct Axis {
    pub min: f64,
    pub max: f64,
    pub ticks: Vec<(f64, String)>,
}

impl Axis {
    pub fn auto_linear(data_min: f64, data_max: f64, target_ticks: usize) -> Self {
        let (min, max, step) = nice_range(data_min, data_max, target_ticks);
        let mut ticks = Vec::new();
        let mut v = min;
        while v <= max + step * 0.01 {
            ticks.push((v, format_tick(v, step)));
            v += step;
        }
        Self { min, max, ticks }
    }

    pub fn data_to_pixel(&self, value: f64, px_min: f64, px_max: f64) -> f64 {
        let frac = (value - self.min) / (self.max - self.min);
        px_min + frac * (px_max - px_min)
    }
}

fn nice_range(data_min: f64, data_max: f64, target_ticks: usize) -> (f64, f64, f64) {
    if (data_max - data_min).abs() < 1e-12 {
        return (data_min - 1.0, data_max + 1.0, 1.0);
    }
    let rough_step = (data_max - data_min) / (target_ticks.max(2) - 1) as f64;
    let step = nice_step(rough_step);
    (
        (data_min / step).floor() * step,
        (data_max / step).ceil() * step,
        step,
    )
}

fn nice_step(rough: f64) -> f64 {
    let exp = rough.abs().log10().floor();
    let frac = rough / 10.0_f64.powf(exp);
    let nice_frac = if frac <= 1.5 {
        1.0
    } else if frac <= 3.5 {
        2.0
    } else if frac <= 7.5 {
        5.0
    } else {
        10.0
    };
    nice_frac * 10.0_f64.powf(exp)
}

fn format_tick(value: f64, step: f64) -> String {
    let decimals = if step >= 1.0 {
        0
    } else {
        (-step.log10()).ceil() as usize
    };
    // Avoid "-0"
    let value = if value.abs() < step * 0.01 { 0.0 } else { value };
    format!("{:.prec$}", value, prec = decimals)
}

/// Min and max over finite values, `None` when there are none.
pub(crate) fn finite_extent(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

pub(crate) fn draw_title(canvas: &mut Canvas, area: &PlotArea, title: &str) {
    canvas.text(
        area.center_x(),
        area.top - 20.0,
        title,
        &TextStyle {
            size: 14.0,
            anchor: Anchor::Middle,
            bold: true,
            ..Default::default()
        },
    );
}

/// Y axis with ticks, horizontal grid lines and a rotated label.
pub(crate) fn draw_y_axis(canvas: &mut Canvas, area: &PlotArea, axis: &Axis, label: &str) {
    let grid = Style::stroked(LIGHT_GREY, 0.8);
    let tick_text = TextStyle {
        size: 10.0,
        color: GREY,
        anchor: Anchor::End,
        ..Default::default()
    };
    for (value, text) in &axis.ticks {
        let y = axis.data_to_pixel(*value, area.bottom, area.top);
        canvas.line(area.left, y, area.right, y, &grid);
        canvas.text(area.left - 8.0, y + 3.5, text, &tick_text);
    }
    canvas.line(area.left, area.top, area.left, area.bottom, &Style::stroked(BLACK, 1.0));
    canvas.text(
        area.left - 55.0,
        area.center_y(),
        label,
        &TextStyle {
            size: 12.0,
            anchor: Anchor::Middle,
            rotate: Some(-90.0),
            ..Default::default()
        },
    );
}

pub(crate) fn draw_x_baseline(canvas: &mut Canvas, area: &PlotArea, label: &str) {
    canvas.line(area.left, area.bottom, area.right, area.bottom, &Style::stroked(BLACK, 1.0));
    canvas.text(
        area.center_x(),
        area.bottom + 60.0,
        label,
        &TextStyle {
            size: 12.0,
            anchor: Anchor::Middle,
            ..Default::default()
        },
    );
}
