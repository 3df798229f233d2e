use std::{fs, path::Path};

use image::{Rgb, RgbImage};
use log::info;

use crate::{PipelineErr, Result, train::TrainingStats};

const PANEL_WIDTH: u32 = 500;
const PANEL_HEIGHT: u32 = 400;
const MARGIN: u32 = 40;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([0, 0, 0]);
const LOSS: Rgb<u8> = Rgb([31, 119, 180]);
const ACCURACY: Rgb<u8> = Rgb([255, 127, 14]);

/// Renders the per-step training loss and accuracy as two side by side panels and saves them
/// as a PNG, creating parent directories as needed.
///
/// # Arguments
/// * `stats` - The statistics recorded during training.
/// * `path` - The destination file.
pub fn save_training_plot(stats: &TrainingStats, path: &Path) -> Result<()> {
    if stats.train_loss.is_empty() {
        return Err(PipelineErr::Plot("no training steps to plot".to_string()));
    }

    let mut img = RgbImage::from_pixel(2 * PANEL_WIDTH, PANEL_HEIGHT, BACKGROUND);
    draw_panel(&mut img, 0, &stats.train_loss, LOSS);
    draw_panel(&mut img, PANEL_WIDTH, &stats.train_accuracy, ACCURACY);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    img.save(path)?;
    info!("saved training statistics plot to {}", path.display());
    Ok(())
}

/// Draws the axes of the panel starting at column `x0` and `series` as a polyline scaled to
/// fill it.
fn draw_panel(img: &mut RgbImage, x0: u32, series: &[f32], color: Rgb<u8>) {
    let left = x0 + MARGIN;
    let right = x0 + PANEL_WIDTH - MARGIN;
    let top = MARGIN;
    let bottom = PANEL_HEIGHT - MARGIN;

    draw_line(img, (left, top), (left, bottom), AXIS);
    draw_line(img, (left, bottom), (right, bottom), AXIS);

    let finite = series.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if min > max {
        return;
    }
    let range = if max - min == 0.0 { 1.0 } else { max - min };

    let width = (right - left - 1) as f32;
    let height = (bottom - top - 1) as f32;
    let steps = series.len().saturating_sub(1).max(1) as f32;

    let points: Vec<(u32, u32)> = series
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, &v)| {
            let x = left + 1 + (i as f32 / steps * width).round() as u32;
            let y = bottom - 1 - ((v - min) / range * height).round() as u32;
            (x, y)
        })
        .collect();

    if let [only] = points.as_slice() {
        img.put_pixel(only.0, only.1, color);
    }
    for pair in points.windows(2) {
        draw_line(img, pair[0], pair[1], color);
    }
}

/// Bresenham's line algorithm.
fn draw_line(img: &mut RgbImage, from: (u32, u32), to: (u32, u32), color: Rgb<u8>) {
    let (mut x, mut y) = (i64::from(from.0), i64::from(from.1));
    let (x1, y1) = (i64::from(to.0), i64::from(to.1));
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if let (Ok(px), Ok(py)) = (u32::try_from(x), u32::try_from(y)) {
            if px < img.width() && py < img.height() {
                img.put_pixel(px, py, color);
            }
        }

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plot_is_written_as_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/figures/stats.png");
        let stats = TrainingStats {
            train_loss: vec![2.3, 1.9, 1.2, 0.8],
            train_accuracy: vec![0.1, 0.3, 0.6, 0.75],
        };

        save_training_plot(&stats, &path).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (2 * PANEL_WIDTH, PANEL_HEIGHT));
        assert!(img.pixels().any(|p| *p == LOSS));
        assert!(img.pixels().any(|p| *p == ACCURACY));
    }

    #[test]
    fn empty_stats_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = save_training_plot(&TrainingStats::default(), &dir.path().join("x.png"))
            .unwrap_err();
        assert!(matches!(err, PipelineErr::Plot(_)));
    }
}
