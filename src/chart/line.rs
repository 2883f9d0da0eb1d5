/*
 *  chart/line.rs
 *
 *  TxMon - keeps an eye on the exciter
 *  (c) 2020-26 Stuart Hunter
 *
 *  Forward/reflected power chart geometry
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
use super::{ChartLayout, TimeSpan, Vertex};
use crate::history::HistoryPoint;

/// Ranges narrower than this are treated as flat.
pub const FLAT_SPAN: f64 = 0.2;
/// Added above and below a flat range.
pub const FLAT_WIDEN: f64 = 0.5;
/// Fraction of the span added above and below otherwise.
pub const RANGE_PADDING: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YRange {
    pub min: f64,
    pub max: f64,
}

impl YRange {
    /// Autoscaled range over every finite value, `None` when there are none.
    pub fn fit(values: impl IntoIterator<Item = f64>) -> Option<YRange> {
        let (min, max) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })?;

        if (max - min).abs() < FLAT_SPAN {
            Some(YRange { min: min - FLAT_WIDEN, max: max + FLAT_WIDEN })
        } else {
            let pad = (max - min) * RANGE_PADDING;
            // powers are never negative
            Some(YRange { min: (min - pad).max(0.0), max: max + pad })
        }
    }

    pub fn to_y(&self, value: f64, layout: &ChartLayout) -> f32 {
        let frac = (self.max - value) / (self.max - self.min);
        layout.plot_top() + (frac * f64::from(layout.plot_height())) as f32
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinePlot {
    pub range: YRange,
    pub span: TimeSpan,
    pub gridlines: Vec<f32>,
    /// Unbroken runs of the forward series, each at least two vertices.
    pub forward: Vec<Vec<Vertex>>,
    pub reflected: Vec<Vec<Vertex>>,
    /// Closed polygons under each forward run, down to the plot bottom.
    pub forward_fill: Vec<Vec<Vertex>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LinePlan {
    NoData,
    Plot(LinePlot),
}

/// Splits a series at every missing/non-finite value. Runs shorter than two
/// vertices are dropped.
fn polylines<F>(
    points: &[HistoryPoint],
    select: F,
    span: &TimeSpan,
    range: &YRange,
    layout: &ChartLayout,
) -> Vec<Vec<Vertex>>
where
    F: Fn(&HistoryPoint) -> Option<f64>,
{
    let mut runs = Vec::new();
    let mut current: Vec<Vertex> = Vec::new();
    for p in points {
        match select(p).filter(|v| v.is_finite()) {
            Some(v) => current.push(Vertex::new(span.to_x(p.timestamp_ms, layout), range.to_y(v, layout))),
            None => {
                if current.len() >= 2 {
                    runs.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
            }
        }
    }
    if current.len() >= 2 {
        runs.push(current);
    }
    runs
}

fn fill_under(run: &[Vertex], bottom: f32) -> Vec<Vertex> {
    let mut polygon = run.to_vec();
    if let (Some(first), Some(last)) = (run.first(), run.last()) {
        polygon.push(Vertex::new(last.x, bottom));
        polygon.push(Vertex::new(first.x, bottom));
    }
    polygon
}

pub fn plan(points: &[HistoryPoint], layout: &ChartLayout) -> LinePlan {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return LinePlan::NoData;
    };
    if points.len() < 2 {
        return LinePlan::NoData;
    }

    let values = points
        .iter()
        .flat_map(|p| [p.forward_power_w, p.reflected_power_w])
        .flatten();
    let Some(range) = YRange::fit(values) else {
        return LinePlan::NoData;
    };

    let span = TimeSpan { start_ms: first.timestamp_ms, end_ms: last.timestamp_ms };
    let forward = polylines(points, |p| p.forward_power_w, &span, &range, layout);
    let reflected = polylines(points, |p| p.reflected_power_w, &span, &range, layout);
    let forward_fill = forward.iter().map(|run| fill_under(run, layout.plot_bottom())).collect();

    LinePlan::Plot(LinePlot {
        range,
        span,
        gridlines: layout.gridlines(),
        forward,
        reflected,
        forward_fill,
    })
}
