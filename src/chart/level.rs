/*
 *  chart/level.rs
 *
 *  TxMon - keeps an eye on the exciter
 *  (c) 2020-26 Stuart Hunter
 *
 *  Split left/right audio level chart geometry
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
//! The left channel grows up from a mid-plot baseline and the right channel
//! grows down from it. Each sample owns the slice of x between the midpoints
//! to its neighbours, so the fill reads as contiguous blocks, and heights at
//! shared edges inside a run are averaged to soften the steps.

use super::{ChartLayout, TimeSpan, Vertex};
use crate::history::HistoryPoint;

pub const LEVEL_MAX: f64 = 255.0;

pub fn clamp_level(v: f64) -> f64 {
    v.round().clamp(0.0, LEVEL_MAX)
}

/// `xs.len() + 1` edges: the plot's left edge, the rounded midpoints between
/// neighbouring samples, then the plot's right edge.
pub fn boundaries(xs: &[f32], left: f32, right: f32) -> Vec<f32> {
    let mut edges = Vec::with_capacity(xs.len() + 1);
    edges.push(left);
    edges.extend(xs.windows(2).map(|pair| ((pair[0] + pair[1]) / 2.0).round()));
    edges.push(right);
    edges
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Heights at each edge of every maximal run of present samples.
/// Returned as `(first_sample_index, heights)` with `heights.len() == run_len + 1`.
pub fn run_heights(levels: &[Option<f64>], half_height: f32) -> Vec<(usize, Vec<f32>)> {
    let scale = |v: f64| (v / LEVEL_MAX) as f32 * half_height;
    let mut runs = Vec::new();
    let mut start = 0;
    while start < levels.len() {
        if levels[start].is_none() {
            start += 1;
            continue;
        }
        let end = levels[start..]
            .iter()
            .position(Option::is_none)
            .map_or(levels.len(), |off| start + off);
        let run: Vec<f32> = levels[start..end].iter().flatten().map(|v| scale(*v)).collect();

        let mut heights = Vec::with_capacity(run.len() + 1);
        heights.push(run[0]);
        heights.extend(run.windows(2).map(|pair| (pair[0] + pair[1]) / 2.0));
        heights.push(run[run.len() - 1]);

        runs.push((start, heights));
        start = end;
    }
    runs
}

fn polygons(
    levels: &[Option<f64>],
    edges: &[f32],
    baseline: f32,
    half_height: f32,
    dir: Direction,
) -> Vec<Vec<Vertex>> {
    run_heights(levels, half_height)
        .into_iter()
        .map(|(first, heights)| {
            let mut poly = Vec::with_capacity(heights.len() + 2);
            poly.push(Vertex::new(edges[first], baseline));
            for (i, h) in heights.iter().enumerate() {
                let y = match dir {
                    Direction::Up => baseline - h,
                    Direction::Down => baseline + h,
                };
                poly.push(Vertex::new(edges[first + i], y));
            }
            poly.push(Vertex::new(edges[first + heights.len() - 1], baseline));
            poly
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelPlot {
    pub baseline: f32,
    pub half_height: f32,
    pub span: TimeSpan,
    pub gridlines: Vec<f32>,
    pub boundaries: Vec<f32>,
    /// Left channel, above the baseline.
    pub upper: Vec<Vec<Vertex>>,
    /// Right channel, below the baseline.
    pub lower: Vec<Vec<Vertex>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LevelPlan {
    NoData,
    Plot(LevelPlot),
}

pub fn plan(points: &[HistoryPoint], layout: &ChartLayout) -> LevelPlan {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return LevelPlan::NoData;
    };
    let finite = |v: Option<f64>| v.filter(|v| v.is_finite());
    let with_level = points
        .iter()
        .filter(|p| finite(p.level_left).is_some() || finite(p.level_right).is_some())
        .count();
    if points.len() < 2 || with_level < 2 {
        return LevelPlan::NoData;
    }

    let span = TimeSpan { start_ms: first.timestamp_ms, end_ms: last.timestamp_ms };
    let half_height = layout.plot_height() / 2.0;
    let baseline = layout.plot_top() + half_height;

    let xs: Vec<f32> = points.iter().map(|p| span.to_x(p.timestamp_ms, layout)).collect();
    let edges = boundaries(&xs, layout.plot_left(), layout.plot_right());

    let left: Vec<Option<f64>> = points.iter().map(|p| finite(p.level_left).map(clamp_level)).collect();
    let right: Vec<Option<f64>> = points.iter().map(|p| finite(p.level_right).map(clamp_level)).collect();

    LevelPlan::Plot(LevelPlot {
        baseline,
        half_height,
        span,
        gridlines: layout.gridlines(),
        upper: polygons(&left, &edges, baseline, half_height, Direction::Up),
        lower: polygons(&right, &edges, baseline, half_height, Direction::Down),
        boundaries: edges,
    })
}
