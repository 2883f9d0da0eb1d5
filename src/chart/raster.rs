/*
 *  chart/raster.rs
 *
 *  TxMon - keeps an eye on the exciter
 *  (c) 2020-26 Stuart Hunter
 *
 *  Draws planned chart geometry into RGBA pixmaps
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */
use chrono::{Local, TimeZone};
use embedded_graphics::pixelcolor::Rgb888;
use std::path::Path as FsPath;
use thiserror::Error;
use tiny_skia::{
    Color, FillRule, GradientStop, LinearGradient, Paint, Path, PathBuilder, Pixmap, Point, Rect,
    Shader, SpreadMode, Stroke, Transform,
};

use super::level::{self, LevelPlan};
use super::line::{self, LinePlan};
use super::text::{draw_label, label_width};
use super::{ChartLayout, TimeSpan, Vertex, NO_DATA_TEXT};
use crate::history::HistoryPoint;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Pixmap creation error: {width}x{height}")]
    PixmapCreation { width: u32, height: u32 },
    #[error("PNG encode error: {0}")]
    Encode(String),
    #[error("chart write failed: {0}")]
    Io(#[from] std::io::Error),
}

const TEXT: Rgb888 = Rgb888::new(0xb8, 0xca, 0xd8);
const LEVEL_TEXT: Rgb888 = Rgb888::new(0xb6, 0xcf, 0xe6);

fn rgba(r: u8, g: u8, b: u8, a: f32) -> Color {
    Color::from_rgba8(r, g, b, (a * 255.0).round() as u8)
}

fn solid(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = true;
    paint
}

fn vertical_gradient(top: f32, bottom: f32, stops: Vec<GradientStop>) -> Option<Shader<'static>> {
    LinearGradient::new(
        Point::from_xy(0.0, top),
        Point::from_xy(0.0, bottom),
        stops,
        SpreadMode::Pad,
        Transform::identity(),
    )
}

fn open_path(vertices: &[Vertex]) -> Option<Path> {
    let (first, rest) = vertices.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.x, first.y);
    for v in rest {
        pb.line_to(v.x, v.y);
    }
    pb.finish()
}

fn closed_path(vertices: &[Vertex]) -> Option<Path> {
    let (first, rest) = vertices.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.x, first.y);
    for v in rest {
        pb.line_to(v.x, v.y);
    }
    pb.close();
    pb.finish()
}

fn time_label(ts_ms: i64) -> String {
    Local
        .timestamp_millis_opt(ts_ms)
        .single()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

/// Renders the power and level charts at a fixed frame size.
#[derive(Debug, Clone, Copy)]
pub struct ChartRenderer {
    layout: ChartLayout,
}

impl ChartRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        ChartRenderer { layout: ChartLayout::new(width, height) }
    }

    pub fn layout(&self) -> &ChartLayout {
        &self.layout
    }

    fn canvas(&self) -> Result<Pixmap, RenderError> {
        Pixmap::new(self.layout.width, self.layout.height).ok_or(RenderError::PixmapCreation {
            width: self.layout.width,
            height: self.layout.height,
        })
    }

    fn fill_background(&self, pixmap: &mut Pixmap) {
        let paint = match vertical_gradient(
            0.0,
            self.layout.height as f32,
            vec![
                GradientStop::new(0.0, Color::from_rgba8(0x10, 0x21, 0x2f, 255)),
                GradientStop::new(1.0, Color::from_rgba8(0x0c, 0x18, 0x24, 255)),
            ],
        ) {
            Some(shader) => Paint { shader, ..Paint::default() },
            None => solid(Color::from_rgba8(0x0c, 0x18, 0x24, 255)),
        };
        if let Some(rect) = Rect::from_xywh(0.0, 0.0, self.layout.width as f32, self.layout.height as f32) {
            pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }
    }

    fn draw_gridlines(&self, pixmap: &mut Pixmap, lines: &[f32], color: Color) {
        let paint = solid(color);
        let stroke = Stroke { width: 1.0, ..Stroke::default() };
        for &y in lines {
            let edge = [
                Vertex::new(self.layout.plot_left(), y),
                Vertex::new(self.layout.plot_right(), y),
            ];
            if let Some(path) = open_path(&edge) {
                pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
            }
        }
    }

    fn draw_time_labels(&self, pixmap: &mut Pixmap, span: &TimeSpan) {
        let y = self.layout.height as i32 - 12;
        draw_label(pixmap, &time_label(span.start_ms), self.layout.plot_left() as i32, y, TEXT);
        let end = time_label(span.end_ms);
        let x = self.layout.plot_right() as i32 - label_width(&end) as i32;
        draw_label(pixmap, &end, x, y, TEXT);
    }

    fn draw_no_data(&self, pixmap: &mut Pixmap) {
        draw_label(pixmap, NO_DATA_TEXT, 20, 26, TEXT);
    }

    /// Forward and reflected power over time.
    pub fn render_power(&self, points: &[HistoryPoint]) -> Result<Pixmap, RenderError> {
        let mut pixmap = self.canvas()?;
        self.fill_background(&mut pixmap);
        if let Some(rect) = Rect::from_xywh(0.0, 0.0, self.layout.width as f32, self.layout.height as f32) {
            pixmap.fill_rect(rect, &solid(rgba(255, 255, 255, 0.04)), Transform::identity(), None);
        }

        let plot = match line::plan(points, &self.layout) {
            LinePlan::NoData => {
                self.draw_no_data(&mut pixmap);
                return Ok(pixmap);
            }
            LinePlan::Plot(plot) => plot,
        };

        self.draw_gridlines(&mut pixmap, &plot.gridlines, rgba(255, 255, 255, 0.16));
        draw_label(&mut pixmap, &format!("{:.1} W", plot.range.max), 8, self.layout.plot_top() as i32, TEXT);
        draw_label(
            &mut pixmap,
            &format!("{:.1} W", plot.range.min),
            8,
            self.layout.plot_bottom() as i32 - 4,
            TEXT,
        );

        let fade = vertical_gradient(
            self.layout.plot_top(),
            self.layout.plot_bottom(),
            vec![
                GradientStop::new(0.0, rgba(57, 255, 159, 0.25)),
                GradientStop::new(1.0, rgba(57, 255, 159, 0.01)),
            ],
        );
        if let Some(shader) = fade {
            let paint = Paint { shader, anti_alias: true, ..Paint::default() };
            for polygon in &plot.forward_fill {
                if let Some(path) = closed_path(polygon) {
                    pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
                }
            }
        }

        let stroke = Stroke { width: 2.0, ..Stroke::default() };
        for (runs, color) in [
            (&plot.forward, Color::from_rgba8(0x39, 0xff, 0x9f, 255)),
            (&plot.reflected, Color::from_rgba8(0xff, 0xd1, 0x66, 255)),
        ] {
            let paint = solid(color);
            for run in runs {
                if let Some(path) = open_path(run) {
                    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
                }
            }
        }

        // legend
        let w = self.layout.width as f32;
        for (x, color, name) in [
            (w - 220.0, Color::from_rgba8(0x39, 0xff, 0x9f, 255), "Forward"),
            (w - 130.0, Color::from_rgba8(0xff, 0xd1, 0x66, 255), "Reflected"),
        ] {
            if let Some(rect) = Rect::from_xywh(x, 14.0, 10.0, 3.0) {
                pixmap.fill_rect(rect, &solid(color), Transform::identity(), None);
            }
            draw_label(&mut pixmap, name, x as i32 + 16, 16, TEXT);
        }

        self.draw_time_labels(&mut pixmap, &plot.span);
        Ok(pixmap)
    }

    /// Left level above, right level below a shared zero baseline.
    pub fn render_levels(&self, points: &[HistoryPoint]) -> Result<Pixmap, RenderError> {
        let mut pixmap = self.canvas()?;
        self.fill_background(&mut pixmap);

        let plot = match level::plan(points, &self.layout) {
            LevelPlan::NoData => {
                self.draw_no_data(&mut pixmap);
                return Ok(pixmap);
            }
            LevelPlan::Plot(plot) => plot,
        };

        self.draw_gridlines(&mut pixmap, &plot.gridlines, rgba(139, 176, 210, 0.20));
        let baseline = [
            Vertex::new(self.layout.plot_left(), plot.baseline),
            Vertex::new(self.layout.plot_right(), plot.baseline),
        ];
        if let Some(path) = open_path(&baseline) {
            let stroke = Stroke { width: 1.5, ..Stroke::default() };
            pixmap.stroke_path(&path, &solid(rgba(170, 205, 236, 0.70)), &stroke, Transform::identity(), None);
        }

        draw_label(&mut pixmap, "Left", 12, self.layout.plot_top() as i32, LEVEL_TEXT);
        draw_label(&mut pixmap, "0", 20, plot.baseline as i32, LEVEL_TEXT);
        draw_label(&mut pixmap, "Right", 12, self.layout.plot_bottom() as i32 - 4, LEVEL_TEXT);

        let bright = rgba(128, 220, 255, 0.98);
        let mid = rgba(74, 181, 236, 0.95);
        let deep = rgba(26, 108, 171, 0.88);
        let upper = vertical_gradient(
            self.layout.plot_top(),
            plot.baseline,
            vec![GradientStop::new(0.0, bright), GradientStop::new(0.35, mid), GradientStop::new(1.0, deep)],
        );
        let lower = vertical_gradient(
            plot.baseline,
            self.layout.plot_bottom(),
            vec![GradientStop::new(0.0, deep), GradientStop::new(0.65, mid), GradientStop::new(1.0, bright)],
        );

        for (polygons, shader) in [(&plot.upper, upper), (&plot.lower, lower)] {
            let paint = match shader {
                Some(shader) => Paint { shader, anti_alias: true, ..Paint::default() },
                None => solid(mid),
            };
            for polygon in polygons {
                if let Some(path) = closed_path(polygon) {
                    pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
                }
            }
        }

        self.draw_time_labels(&mut pixmap, &plot.span);
        Ok(pixmap)
    }

    pub fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>, RenderError> {
        pixmap.encode_png().map_err(|e| RenderError::Encode(e.to_string()))
    }

    pub fn save_png(pixmap: &Pixmap, path: &FsPath) -> Result<(), RenderError> {
        let bytes = Self::encode_png(pixmap)?;
        write_atomic(path, &bytes)?;
        Ok(())
    }
}

/// Writes `<path>.part` beside the destination, then renames it over `path`,
/// so a reader never sees a torn file.
pub fn write_atomic(path: &FsPath, bytes: &[u8]) -> std::io::Result<()> {
    let mut staging = path.as_os_str().to_os_string();
    staging.push(".part");
    std::fs::write(&staging, bytes)?;
    std::fs::rename(&staging, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(ts: i64, fwd: f64, left: f64) -> HistoryPoint {
        HistoryPoint {
            timestamp_ms: ts,
            forward_power_w: Some(fwd),
            reflected_power_w: Some(fwd / 50.0),
            level_left: Some(left),
            level_right: Some(255.0 - left),
        }
    }

    #[test]
    fn test_zero_size_is_an_error() {
        let renderer = ChartRenderer::new(0, 100);
        assert!(matches!(
            renderer.render_power(&[]),
            Err(RenderError::PixmapCreation { width: 0, height: 100 })
        ));
    }

    #[test]
    fn test_power_chart_draws_series() {
        let renderer = ChartRenderer::new(400, 160);
        let points: Vec<_> = (0..20).map(|i| point(i * 5_000, 100.0 + i as f64, 128.0)).collect();
        let pixmap = renderer.render_power(&points).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (400, 160));
        // some pixel inside the plot carries the forward stroke's green
        assert!(pixmap.pixels().iter().any(|p| p.green() > 200 && p.red() < 120));
    }

    #[test]
    fn test_levels_chart_fills_both_halves() {
        let renderer = ChartRenderer::new(400, 160);
        let points: Vec<_> = (0..10).map(|i| point(i * 1_000, 100.0, 200.0)).collect();
        let pixmap = renderer.render_levels(&points).unwrap();
        let layout = renderer.layout();
        let blue_at = |y: f32| {
            let x = (layout.plot_left() + layout.plot_width() / 2.0) as u32;
            pixmap.pixel(x, y as u32).is_some_and(|p| p.blue() > 120)
        };
        let half = layout.plot_height() / 2.0;
        let baseline = layout.plot_top() + half;
        // left at 200/255 of the half height, right at 55/255
        assert!(blue_at(baseline - half * 0.5));
        assert!(blue_at(baseline + half * 0.1));
        assert!(!blue_at(baseline + half * 0.5));
    }

    #[test]
    fn test_encode_png_signature() {
        let renderer = ChartRenderer::new(200, 100);
        let pixmap = renderer.render_levels(&[]).unwrap();
        let bytes = ChartRenderer::encode_png(&pixmap).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_save_png_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("power.png");
        let renderer = ChartRenderer::new(200, 100);
        let pixmap = renderer.render_power(&[]).unwrap();
        ChartRenderer::save_png(&pixmap, &path).unwrap();
        ChartRenderer::save_png(&pixmap, &path).unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("power.png.part").exists());
    }

    #[test]
    fn test_write_atomic_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        write_atomic(&path, b"{\"running\":true}").unwrap();
        write_atomic(&path, b"{}").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"{}");
        assert!(!dir.path().join("state.json.part").exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
