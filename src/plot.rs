// =============================================================================
// Plot Rendering — correlation heatmap and rescaled-range fit
// =============================================================================
//
// Plots are rendered straight to PNG files; the output paths come from the
// commodity flow's configuration.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::info;

use crate::analysis::{CorrelationMatrix, HurstFit};

/// Fitted power-law curve color (deep sky blue).
const CURVE_COLOR: RGBColor = RGBColor(0, 191, 255);

/// Observed R/S point color (purple).
const POINT_COLOR: RGBColor = RGBColor(128, 0, 128);

/// Strongest positive-correlation cell color.
const POSITIVE_COLOR: RGBColor = RGBColor(178, 24, 43);

/// Strongest negative-correlation cell color.
const NEGATIVE_COLOR: RGBColor = RGBColor(33, 102, 172);

/// Render the correlation matrix as an annotated heatmap.
pub fn render_correlation_heatmap(matrix: &CorrelationMatrix, path: &Path) -> Result<()> {
    if matrix.is_empty() {
        anyhow::bail!("cannot render an empty correlation matrix");
    }
    ensure_parent_dir(path)?;

    let n = matrix.len();
    let size = matrix.len() as f64;

    let root = BitMapBackend::new(path, (980, 860)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| anyhow::anyhow!("failed to clear heatmap canvas: {e}"))?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Pairwise correlation", ("sans-serif", 26))
        .margin(12)
        .x_label_area_size(120)
        .y_label_area_size(120)
        // Inverted y-range keeps row 0 at the top, matrix-style.
        .build_cartesian_2d(0.0..size, size..0.0)
        .map_err(|e| anyhow::anyhow!("failed to build heatmap chart: {e}"))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(n)
        .y_labels(n)
        .x_label_offset(35)
        .y_label_offset(25)
        .x_label_formatter(&|x| cell_label(matrix, *x))
        .y_label_formatter(&|y| cell_label(matrix, *y))
        .label_style(("sans-serif", 14))
        .draw()
        .map_err(|e| anyhow::anyhow!("failed to draw heatmap mesh: {e}"))?;

    chart
        .draw_series((0..n).flat_map(|row| {
            (0..n).map(move |col| {
                let corr = matrix.get(row, col);
                Rectangle::new(
                    [
                        (col as f64, row as f64),
                        (col as f64 + 1.0, row as f64 + 1.0),
                    ],
                    heat_color(corr).filled(),
                )
            })
        }))
        .map_err(|e| anyhow::anyhow!("failed to draw heatmap cells: {e}"))?;

    let annotation_style = ("sans-serif", 14)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));

    chart
        .draw_series((0..n).flat_map(|row| {
            let style = annotation_style.clone();
            (0..n).map(move |col| {
                let corr = matrix.get(row, col);
                Text::new(
                    format!("{corr:.2}"),
                    (col as f64 + 0.5, row as f64 + 0.5),
                    style.clone(),
                )
            })
        }))
        .map_err(|e| anyhow::anyhow!("failed to annotate heatmap cells: {e}"))?;

    root.present()
        .map_err(|e| anyhow::anyhow!("failed to write heatmap to {}: {e}", path.display()))?;

    info!(path = %path.display(), "correlation heatmap rendered");
    Ok(())
}

/// Render the observed R/S points and the fitted power law on log-log axes.
pub fn render_rescaled_range(fit: &HurstFit, path: &Path) -> Result<()> {
    if fit.points.is_empty() {
        anyhow::bail!("cannot render a rescaled-range fit with no points");
    }
    ensure_parent_dir(path)?;

    let x_min = fit.points.iter().map(|(w, _)| *w).fold(f64::INFINITY, f64::min);
    let x_max = fit
        .points
        .iter()
        .map(|(w, _)| *w)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for (w, rs) in &fit.points {
        y_min = y_min.min(rs.min(fit.curve(*w)));
        y_max = y_max.max(rs.max(fit.curve(*w)));
    }

    let root = BitMapBackend::new(path, (900, 640)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| anyhow::anyhow!("failed to clear R/S canvas: {e}"))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Rescaled range: H={:.4}, c={:.4}", fit.exponent, fit.constant),
            ("sans-serif", 24),
        )
        .margin(12)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(
            (x_min * 0.9..x_max * 1.1).log_scale(),
            (y_min * 0.9..y_max * 1.1).log_scale(),
        )
        .map_err(|e| anyhow::anyhow!("failed to build R/S chart: {e}"))?;

    chart
        .configure_mesh()
        .x_desc("Time interval")
        .y_desc("R/S ratio")
        .label_style(("sans-serif", 14))
        .draw()
        .map_err(|e| anyhow::anyhow!("failed to draw R/S mesh: {e}"))?;

    // Fitted power law, sampled evenly in log space.
    let samples = 100;
    let log_ratio = (x_max / x_min).ln();
    let curve = (0..=samples).map(|i| {
        let w = x_min * (log_ratio * i as f64 / samples as f64).exp();
        (w, fit.curve(w))
    });

    chart
        .draw_series(LineSeries::new(curve, &CURVE_COLOR))
        .map_err(|e| anyhow::anyhow!("failed to draw fitted curve: {e}"))?;

    chart
        .draw_series(
            fit.points
                .iter()
                .map(|(w, rs)| Circle::new((*w, *rs), 4, POINT_COLOR.filled())),
        )
        .map_err(|e| anyhow::anyhow!("failed to draw R/S points: {e}"))?;

    root.present()
        .map_err(|e| anyhow::anyhow!("failed to write R/S plot to {}: {e}", path.display()))?;

    info!(path = %path.display(), "rescaled-range plot rendered");
    Ok(())
}

/// Axis label for a fractional cell coordinate.
fn cell_label(matrix: &CorrelationMatrix, coord: f64) -> String {
    let idx = coord.floor();
    if idx < 0.0 {
        return String::new();
    }
    matrix
        .labels
        .get(idx as usize)
        .cloned()
        .unwrap_or_default()
}

/// Map a correlation in [-1, 1] onto a diverging blue-white-red scale.
/// NaN cells (degenerate columns) render gray.
fn heat_color(corr: f64) -> RGBColor {
    if corr.is_nan() {
        return RGBColor(200, 200, 200);
    }

    let c = corr.clamp(-1.0, 1.0);
    let target = if c < 0.0 { NEGATIVE_COLOR } else { POSITIVE_COLOR };
    let t = c.abs();

    let blend = |to: u8| (255.0 + (to as f64 - 255.0) * t).round() as u8;
    RGBColor(blend(target.0), blend(target.1), blend(target.2))
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create plot directory {}", parent.display()))?;
        }
    }
    Ok(())
}
