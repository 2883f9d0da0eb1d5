/*
 *  chart/mod.rs
 *
 *  TxMon - keeps an eye on the exciter
 *  (c) 2020-26 Stuart Hunter
 *
 *  Chart geometry shared by the power and level charts
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
//! Charts are planned as plain geometry (`line::plan`, `level::plan`) and
//! only then drawn by `raster::ChartRenderer`.

pub mod level;
pub mod line;
pub mod raster;
mod text;

pub use raster::{write_atomic, ChartRenderer, RenderError};

pub const NO_DATA_TEXT: &str = "No history yet";

/// Horizontal gridlines divide the plot into this many bands.
pub const GRID_INTERVALS: usize = 4;

/// Frame size and the padding around the plot area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartLayout {
    pub width: u32,
    pub height: u32,
    pub pad_left: f32,
    pub pad_right: f32,
    pub pad_top: f32,
    pub pad_bottom: f32,
}

impl ChartLayout {
    pub fn new(width: u32, height: u32) -> Self {
        ChartLayout {
            width,
            height,
            pad_left: 55.0,
            pad_right: 16.0,
            pad_top: 16.0,
            pad_bottom: 28.0,
        }
    }

    pub fn plot_left(&self) -> f32 {
        self.pad_left
    }

    pub fn plot_right(&self) -> f32 {
        self.width as f32 - self.pad_right
    }

    pub fn plot_top(&self) -> f32 {
        self.pad_top
    }

    pub fn plot_bottom(&self) -> f32 {
        self.height as f32 - self.pad_bottom
    }

    pub fn plot_width(&self) -> f32 {
        self.plot_right() - self.plot_left()
    }

    pub fn plot_height(&self) -> f32 {
        self.plot_bottom() - self.plot_top()
    }

    /// Y of each gridline, top to bottom, including both plot edges.
    pub fn gridlines(&self) -> Vec<f32> {
        (0..=GRID_INTERVALS)
            .map(|i| self.plot_top() + self.plot_height() * i as f32 / GRID_INTERVALS as f32)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
}

impl Vertex {
    pub fn new(x: f32, y: f32) -> Self {
        Vertex { x, y }
    }
}

/// First to last timestamp of the charted points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSpan {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TimeSpan {
    /// Never zero, so a single instant still maps without dividing by zero.
    pub fn duration_ms(&self) -> f64 {
        ((self.end_ms - self.start_ms) as f64).max(1.0)
    }

    /// Linear map of `ts` onto the plot width.
    pub fn to_x(&self, ts: i64, layout: &ChartLayout) -> f32 {
        let frac = (ts - self.start_ms) as f64 / self.duration_ms();
        layout.plot_left() + (frac * f64::from(layout.plot_width())) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gridlines_span_plot() {
        let layout = ChartLayout::new(200, 144);
        let lines = layout.gridlines();
        assert_eq!(lines.len(), GRID_INTERVALS + 1);
        assert_eq!(lines[0], 16.0);
        assert_eq!(lines[4], 116.0);
        assert_eq!(lines[2], 66.0);
    }

    #[test]
    fn test_zero_span_maps_to_left_edge() {
        let layout = ChartLayout::new(200, 100);
        let span = TimeSpan { start_ms: 1_000, end_ms: 1_000 };
        assert_eq!(span.duration_ms(), 1.0);
        assert_eq!(span.to_x(1_000, &layout), layout.plot_left());
    }

    #[test]
    fn test_span_maps_ends_to_plot_edges() {
        let layout = ChartLayout::new(271, 100);
        let span = TimeSpan { start_ms: 0, end_ms: 10_000 };
        assert_eq!(span.to_x(0, &layout), 55.0);
        assert_eq!(span.to_x(10_000, &layout), 255.0);
        assert_eq!(span.to_x(5_000, &layout), 155.0);
    }
}
