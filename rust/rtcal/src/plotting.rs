// ANSI color codes
const COLOR_GRAY: &str = "\x1b[90m";
const COLOR_RESET: &str = "\x1b[0m";
const SERIES_COLORS: [&str; 6] = [
    "\x1b[96m", // cyan
    "\x1b[91m", // red
    "\x1b[92m", // green
    "\x1b[93m", // yellow
    "\x1b[95m", // magenta
    "\x1b[94m", // blue
];
const SERIES_MARKERS: [char; 6] = ['●', '▲', '■', '◆', '○', '✚'];

use crate::StepCalibration;

/// One labelled group of points in a scatter plot.
#[derive(Debug, Clone)]
pub struct ScatterSeries {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

impl StepCalibration {
    /// Formats the calibrated retention time over the anchor range (plus a
    /// tenth past the last anchor) as a terminal plot.
    pub fn format_plot(&self, label: &str, width: usize, height: usize, colored: bool) -> String {
        let (lo, hi) = self.anchor_range();
        let hi = if hi > lo { hi * 1.1 } else { lo + 1.0 };
        format_function_plot(label, |x| self.predict(x), (lo, hi), width, height, colored)
    }
}

fn series_style(idx: usize) -> (&'static str, char) {
    (
        SERIES_COLORS[idx % SERIES_COLORS.len()],
        SERIES_MARKERS[idx % SERIES_MARKERS.len()],
    )
}

fn paint(out: &mut String, ch: char, color: &str, colored: bool) {
    if colored {
        out.push_str(color);
        out.push(ch);
        out.push_str(COLOR_RESET);
    } else {
        out.push(ch);
    }
}

fn push_top_border(output: &mut String, width: usize) {
    output.push('╔');
    output.push_str(&"═".repeat(width));
    output.push_str("╗\n");
}

fn push_bottom_border(output: &mut String, width: usize) {
    output.push('╚');
    output.push_str(&"═".repeat(width));
    output.push_str("╝\n");
}

/// Formats a function plot as a string for logging or display.
///
/// # Arguments
/// * `label` - Legend entry for the sampled curve
/// * `f` - The function to plot
/// * `x_range` - Tuple of (min, max) for x-axis
/// * `width` - Number of columns for the plot
/// * `height` - Number of rows for the plot
/// * `colored` - Whether to emit ANSI color codes
pub fn format_function_plot<F>(
    label: &str,
    f: F,
    x_range: (f64, f64),
    width: usize,
    height: usize,
    colored: bool,
) -> String
where
    F: Fn(f64) -> f64,
{
    let width = width.max(2);
    let height = height.max(2);
    let (x_min, x_max) = x_range;
    let x_span = x_max - x_min;

    let samples: Vec<(f64, f64)> = (0..width)
        .map(|i| {
            let x = x_min + (i as f64 / (width - 1) as f64) * x_span;
            (x, f(x))
        })
        .collect();

    let series = [ScatterSeries {
        label: label.to_string(),
        points: samples,
    }];
    format_scatter_plot(&series, width, height, colored)
}

/// Formats labelled point groups as a terminal scatter plot.
///
/// Every series gets its own marker (and color when `colored` is set). Later
/// series overwrite earlier ones when they land in the same cell. A `y = x`
/// guide is drawn in gray where it is in range.
pub fn format_scatter_plot(
    series: &[ScatterSeries],
    width: usize,
    height: usize,
    colored: bool,
) -> String {
    let width = width.max(2);
    let height = height.max(2);
    let mut output = String::new();

    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for (x, y) in series.iter().flat_map(|s| s.points.iter()) {
        if x.is_finite() && y.is_finite() {
            x_min = x_min.min(*x);
            x_max = x_max.max(*x);
            y_min = y_min.min(*y);
            y_max = y_max.max(*y);
        }
    }

    // Handle edge cases
    if !x_min.is_finite() || !x_max.is_finite() || x_min == x_max {
        x_min -= 1.0;
        x_max += 1.0;
        if !x_min.is_finite() || !x_max.is_finite() {
            x_min = -1.0;
            x_max = 1.0;
        }
    }
    if !y_min.is_finite() || !y_max.is_finite() || y_min == y_max {
        y_min -= 1.0;
        y_max += 1.0;
        if !y_min.is_finite() || !y_max.is_finite() {
            y_min = -1.0;
            y_max = 1.0;
        }
    }

    let x_span = x_max - x_min;
    let y_span = y_max - y_min;
    let to_col = |x: f64| (((x - x_min) / x_span) * (width - 1) as f64).round() as usize;
    let to_row = |y: f64| ((1.0 - (y - y_min) / y_span) * (height - 1) as f64).round() as usize;

    // None = empty, Some(None) = guide, Some(Some(i)) = series i
    let mut grid: Vec<Vec<Option<Option<usize>>>> = vec![vec![None; width]; height];

    for col in 0..width {
        let x = x_min + (col as f64 / (width - 1) as f64) * x_span;
        if x >= y_min && x <= y_max {
            let row = to_row(x).min(height - 1);
            grid[row][col] = Some(None);
        }
    }

    for (idx, s) in series.iter().enumerate() {
        for (x, y) in s.points.iter() {
            if !(x.is_finite() && y.is_finite()) {
                continue;
            }
            let col = to_col(*x).min(width - 1);
            let row = to_row(*y).min(height - 1);
            grid[row][col] = Some(Some(idx));
        }
    }

    push_top_border(&mut output, width);
    for row in grid.iter() {
        output.push('║');
        for cell in row.iter() {
            match cell {
                None => output.push(' '),
                Some(None) => paint(&mut output, '·', COLOR_GRAY, colored),
                Some(Some(idx)) => {
                    let (color, marker) = series_style(*idx);
                    paint(&mut output, marker, color, colored);
                }
            }
        }
        output.push_str("║\n");
    }
    push_bottom_border(&mut output, width);

    // Legend with ranges
    output.push_str(&format!(
        "\n  X: [{:.2}, {:.2}]  Y: [{:.2}, {:.2}]  Size: {}×{}\n",
        x_min, x_max, y_min, y_max, width, height
    ));
    for (idx, s) in series.iter().enumerate() {
        let (color, marker) = series_style(idx);
        output.push_str("  ");
        paint(&mut output, marker, color, colored);
        output.push_str(&format!(" {} (n={})\n", s.label, s.points.len()));
    }

    output
}
