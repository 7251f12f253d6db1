//! PNG chart of one series: the values over time, reference lines at mean, median,
//! min and max, and a shaded band of one standard deviation around the mean.
//!
//! Charts carry no text so rendering needs no system fonts.

use std::path::Path;

use plotters::prelude::*;

use crate::error::{Error, Result};
use crate::sample::SampleSeries;
use crate::stats::Stats;

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

const MEAN_COLOR: RGBColor = RED;
const MEDIAN_COLOR: RGBColor = GREEN;
const MAX_COLOR: RGBColor = RGBColor(255, 165, 0);
const MIN_COLOR: RGBColor = BLUE;

pub fn render_series_plot(series: &SampleSeries, stats: &Stats, path: &Path) -> Result<()> {
    let points = series.relative_points();
    if points.is_empty() {
        return Err(Error::Plot(format!("`{}` has no samples", stats.name)));
    }

    let x_max = points
        .last()
        .map(|(x, _)| *x)
        .filter(|x| *x > f64::EPSILON)
        .unwrap_or(1.0);

    let mut y_min = stats.min.min(stats.mean - stats.stdev);
    let mut y_max = stats.max.max(stats.mean + stats.stdev);
    if (y_max - y_min).abs() < f64::EPSILON {
        // Flat series: pad so the line is not drawn on the border.
        let padding = if y_min.abs() < f64::EPSILON {
            1.0
        } else {
            y_min.abs() * 0.1
        };
        y_min -= padding;
        y_max += padding;
    }

    let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_2d(0.0..x_max, y_min..y_max)
        .map_err(plot_err)?;

    chart
        .draw_series(std::iter::once(Rectangle::new(
            [(0.0, stats.mean - stats.stdev), (x_max, stats.mean + stats.stdev)],
            MEAN_COLOR.mix(0.2).filled(),
        )))
        .map_err(plot_err)?;

    for (y, color) in [
        (stats.mean, MEAN_COLOR),
        (stats.median, MEDIAN_COLOR),
        (stats.max, MAX_COLOR),
        (stats.min, MIN_COLOR),
    ] {
        chart
            .draw_series(LineSeries::new([(0.0, y), (x_max, y)], &color))
            .map_err(plot_err)?;
    }

    chart
        .draw_series(LineSeries::new(points, &BLACK))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

fn plot_err<E: std::error::Error + Send + Sync>(err: DrawingAreaErrorKind<E>) -> Error {
    Error::Plot(err.to_string())
}
