use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;
use thiserror::Error;
use tracing::info;

use crate::analysis::MonthlyTotal;

pub const DEFAULT_PLOT_PATH: &str = "plots/monthly_co2_by_type.svg";

const PLOT_SIZE: (u32, u32) = (1800, 750);

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("no monthly totals to plot")]
    NoData,
    #[error("unsupported plot file type for {0} (expected .svg)")]
    UnsupportedExtension(PathBuf),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to draw {path}: {message}")]
    Draw { path: PathBuf, message: String },
}

/// Renders one SVG line per taxi type of monthly CO2 totals (kg), with months on the x axis.
pub fn render_monthly_totals(totals: &[MonthlyTotal], path: &Path) -> Result<(), PlotError> {
    if totals.is_empty() {
        return Err(PlotError::NoData);
    }

    let is_svg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
    if !is_svg {
        return Err(PlotError::UnsupportedExtension(path.to_path_buf()));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PlotError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let draw_err = |err: &dyn Display| PlotError::Draw {
        path: path.to_path_buf(),
        message: err.to_string(),
    };
    let root = SVGBackend::new(path, PLOT_SIZE).into_drawing_area();
    draw_monthly_chart(&root, totals).map_err(|err| draw_err(&err))?;
    root.present().map_err(|err| draw_err(&err))?;

    info!(path = %path.display(), points = totals.len(), "wrote monthly CO2 plot");
    Ok(())
}

fn draw_monthly_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    totals: &[MonthlyTotal],
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let mut series: BTreeMap<&str, Vec<(i32, f64)>> = BTreeMap::new();
    for total in totals {
        series
            .entry(total.taxi_type.as_str())
            .or_default()
            .push((month_index(total.year, total.month), total.total_co2_kgs));
    }

    let first = totals
        .iter()
        .map(|t| month_index(t.year, t.month))
        .min()
        .unwrap_or_default();
    let last = totals
        .iter()
        .map(|t| month_index(t.year, t.month))
        .max()
        .unwrap_or_default();
    let peak = totals
        .iter()
        .map(|t| t.total_co2_kgs)
        .fold(0.0f64, f64::max);
    let y_max = if peak > 0.0 { peak * 1.1 } else { 1.0 };

    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(root)
        .caption("Monthly CO2 totals by taxi type", ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(first..last + 1, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Month")
        .y_desc("Total CO2 (kg)")
        .x_label_formatter(&|index| month_label(*index))
        .draw()?;

    for (position, (taxi_type, points)) in series.into_iter().enumerate() {
        let style = series_color(taxi_type, position).stroke_width(2);
        chart
            .draw_series(LineSeries::new(points, style))?
            .label(taxi_type)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    Ok(())
}

fn month_index(year: i32, month: u32) -> i32 {
    year * 12 + month as i32 - 1
}

fn month_label(index: i32) -> String {
    format!("{}-{:02}", index.div_euclid(12), index.rem_euclid(12) + 1)
}

fn series_color(taxi_type: &str, position: usize) -> RGBColor {
    match taxi_type {
        "YELLOW" => RGBColor(222, 170, 0),
        "GREEN" => RGBColor(34, 139, 34),
        _ => {
            let (r, g, b) = Palette99::pick(position).rgb();
            RGBColor(r, g, b)
        }
    }
}
