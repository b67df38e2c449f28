//! PNG charts for a day of prices
//!
//! Charts are drawn with plotters into an RGB buffer and encoded with the image
//! crate, so nothing touches the filesystem. When the host has no usable fonts
//! the labelled render fails; the chart is then drawn again without text.

use image::{ImageFormat, RgbImage};
use plotters::prelude::*;
use std::io::Cursor;
use tracing::warn;

use crate::error::{ErrorCode, PipelineError, Result};

/// Pixel size of every chart
pub const CHART_SIZE: (u32, u32) = (1200, 600);

const PRICE_COLOR: RGBColor = BLUE;
const VOLUME_COLOR: RGBColor = RGBColor(255, 165, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChartKind {
    Line,
    Bar,
}

struct ChartSpec<'a> {
    kind: ChartKind,
    title: String,
    y_desc: &'a str,
    legend: &'a str,
    values: &'a [f64],
}

/// Closing price line chart: `"{symbol} Stock Price Trends ({date})"`
pub fn render_price_chart(symbol: &str, date: &str, closes: &[f64]) -> Result<Vec<u8>> {
    render(&ChartSpec {
        kind: ChartKind::Line,
        title: format!("{} Stock Price Trends ({})", symbol, date),
        y_desc: "Price ($)",
        legend: "Closing Price",
        values: closes,
    })
}

/// Trading volume bar chart: `"{symbol} Trading Volume ({date})"`
pub fn render_volume_chart(symbol: &str, date: &str, volumes: &[f64]) -> Result<Vec<u8>> {
    render(&ChartSpec {
        kind: ChartKind::Bar,
        title: format!("{} Trading Volume ({})", symbol, date),
        y_desc: "Volume",
        legend: "Volume",
        values: volumes,
    })
}

fn render(spec: &ChartSpec<'_>) -> Result<Vec<u8>> {
    if spec.values.is_empty() {
        return Err(PipelineError::data_with_code(
            ErrorCode::DATA_EMPTY,
            format!("nothing to plot for '{}'", spec.title),
        ));
    }
    if spec.values.iter().any(|v| !v.is_finite()) {
        return Err(PipelineError::data_with_code(
            ErrorCode::DATA_INVALID_FORMAT,
            format!("non-finite value in '{}'", spec.title),
        ));
    }

    match draw(spec, true) {
        Ok(png) => Ok(png),
        Err(e) => {
            warn!("Labelled chart failed ({}), drawing without text", e);
            draw(spec, false)
        }
    }
}

fn plot_error<E: std::fmt::Display>(err: E) -> PipelineError {
    PipelineError::data_with_code(ErrorCode::DATA_PLOT_ERROR, err.to_string())
}

fn y_range(kind: ChartKind, values: &[f64]) -> (f64, f64) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    match kind {
        // Bars grow from zero
        ChartKind::Bar => (0.0, if max > 0.0 { max * 1.05 } else { 1.0 }),
        ChartKind::Line => {
            let pad = if max > min { (max - min) * 0.05 } else { 1.0 };
            (min - pad, max + pad)
        }
    }
}

fn draw(spec: &ChartSpec<'_>, labelled: bool) -> Result<Vec<u8>> {
    let (width, height) = CHART_SIZE;
    let mut buffer = vec![0u8; (width * height * 3) as usize];
    let n = spec.values.len() as f64;
    let (y_min, y_max) = y_range(spec.kind, spec.values);
    let x_range = match spec.kind {
        ChartKind::Line => 0.0..(n - 1.0).max(1.0),
        ChartKind::Bar => -0.5..(n - 0.5),
    };

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(plot_error)?;

        let mut builder = ChartBuilder::on(&root);
        builder.margin(20);
        if labelled {
            builder
                .caption(&spec.title, ("sans-serif", 26))
                .x_label_area_size(50)
                .y_label_area_size(80);
        }
        let mut chart = builder
            .build_cartesian_2d(x_range, y_min..y_max)
            .map_err(plot_error)?;

        let mut mesh = chart.configure_mesh();
        mesh.light_line_style(BLACK.mix(0.08));
        if labelled {
            mesh.x_desc("Time").y_desc(spec.y_desc);
        }
        mesh.draw().map_err(plot_error)?;

        match spec.kind {
            ChartKind::Line => {
                let series = chart
                    .draw_series(LineSeries::new(
                        spec.values.iter().enumerate().map(|(i, v)| (i as f64, *v)),
                        PRICE_COLOR.stroke_width(2),
                    ))
                    .map_err(plot_error)?;
                if labelled {
                    series.label(spec.legend).legend(|(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], PRICE_COLOR.stroke_width(2))
                    });
                }
            }
            ChartKind::Bar => {
                let style = VOLUME_COLOR.mix(0.7).filled();
                let series = chart
                    .draw_series(spec.values.iter().enumerate().map(|(i, v)| {
                        let x = i as f64;
                        Rectangle::new([(x - 0.4, 0.0), (x + 0.4, *v)], style)
                    }))
                    .map_err(plot_error)?;
                if labelled {
                    series.label(spec.legend).legend(move |(x, y)| {
                        Rectangle::new([(x, y - 5), (x + 20, y + 5)], style)
                    });
                }
            }
        }

        if labelled {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(plot_error)?;
        }

        root.present().map_err(plot_error)?;
    }

    encode_png(buffer, width, height)
}

fn encode_png(buffer: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>> {
    let image = RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| plot_error("chart buffer does not match its dimensions"))?;
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .map_err(plot_error)?;
    Ok(out.into_inner())
}
