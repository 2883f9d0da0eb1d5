/*
 *  report.rs
 *
 *  TxMon - keeps an eye on the exciter
 *  (c) 2020-26 Stuart Hunter
 *
 *  Human readable status panels built from a snapshot
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
use log::info;

use crate::chart::level::LEVEL_MAX;
use crate::decode::Snapshot;
use crate::poller::PollerView;

const MISSING: &str = "-";

pub fn fmt_fixed(value: Option<f64>, digits: usize, suffix: &str) -> String {
    match value.filter(|v| !v.is_nan()) {
        Some(v) => format!("{v:.digits$}{suffix}"),
        None => MISSING.to_string(),
    }
}

pub fn fmt_int(value: Option<f64>) -> String {
    match value.filter(|v| !v.is_nan()) {
        Some(v) => format!("{}", v.round() as i64),
        None => MISSING.to_string(),
    }
}

pub fn fmt_yes_no(value: Option<bool>) -> String {
    match value {
        Some(true) => "Yes".into(),
        Some(false) => "No".into(),
        None => MISSING.into(),
    }
}

/// Low byte only, zero padded to eight digits.
pub fn fmt_alarm_bits(value: Option<u32>) -> String {
    match value {
        Some(bits) => format!("{:08b}", bits & 0xff),
        None => MISSING.into(),
    }
}

pub fn fmt_uptime(secs: Option<u64>) -> String {
    match secs {
        Some(total) => {
            let days = total / 86_400;
            let hours = (total % 86_400) / 3_600;
            let minutes = (total % 3_600) / 60;
            format!("{days}d {hours}h {minutes}m")
        }
        None => MISSING.into(),
    }
}

pub fn fmt_level(value: Option<f64>) -> String {
    match value.filter(|v| !v.is_nan()) {
        Some(v) => format!("{}/255", v.round().clamp(0.0, LEVEL_MAX) as i64),
        None => MISSING.into(),
    }
}

fn fmt_alarm(text: &Option<String>) -> String {
    text.clone().unwrap_or_else(|| "Unknown".into())
}

fn fmt_clock(ts_ms: i64) -> String {
    Local
        .timestamp_millis_opt(ts_ms)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts_ms.to_string())
}

/// A titled block of label/value rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: &'static str,
    pub rows: Vec<(&'static str, String)>,
}

pub fn panels(snap: &Snapshot) -> Vec<Panel> {
    let rf = &snap.rf;
    let alarms = &snap.alarms;
    let rail = &snap.power_rail;
    let audio = &snap.audio;
    vec![
        Panel {
            title: "Transmitter",
            rows: vec![
                ("Name", if snap.system.name.is_empty() { MISSING.into() } else { snap.system.name.clone() }),
                ("Frequency", fmt_fixed(rf.frequency_mhz, 3, " MHz")),
                ("Forward", fmt_fixed(rf.forward_power_w, 1, " W")),
                ("Reflected", fmt_fixed(rf.reflected_power_w, 1, " W")),
                ("Setpoint", format!("{} %", fmt_int(rf.power_percent))),
            ],
        },
        Panel {
            title: "RF & alarms",
            rows: vec![
                ("Alarm bits", fmt_alarm_bits(alarms.bits)),
                ("Alarm now", fmt_alarm(&alarms.code_now_text)),
                ("Alarm latched", fmt_alarm(&alarms.code_latched_text)),
                ("PA connected", fmt_yes_no(alarms.pa_connected)),
                ("Exciter temp", fmt_fixed(snap.thermal.internal_temp_c, 1, " C")),
                ("PA temp", fmt_fixed(snap.thermal.external_temp_c, 1, " C")),
            ],
        },
        Panel {
            title: "Power",
            rows: vec![
                ("Transmitter uptime", fmt_uptime(snap.system.uptime_secs)),
                ("Exciter voltage", fmt_fixed(rail.exciter_voltage_v, 1, " V")),
                ("PA voltage", fmt_fixed(rail.pa_voltage_v, 1, " V")),
                ("PA2 voltage", fmt_fixed(rail.pa2_voltage_v, 1, " V")),
                ("Exciter current", fmt_fixed(rail.exciter_current_a, 1, " A")),
                ("PA current", fmt_fixed(rail.pa_current_a, 1, " A")),
            ],
        },
        Panel {
            title: "Audio",
            rows: vec![
                ("Input source", audio.input_source_text.clone().unwrap_or_else(|| MISSING.into())),
                ("Audio input gain", format!("{} dB", fmt_int(audio.gain_db))),
                ("VU left", fmt_level(audio.vu_left)),
                ("VU right", fmt_level(audio.vu_right)),
            ],
        },
    ]
}

/// One line for the log: run state, last poll time and last error.
pub fn summary_line(view: &PollerView) -> String {
    let state = &view.state;
    let status = if state.running { "Polling" } else { "Stopped" };
    let last_poll = state.last_poll_ms.map_or_else(|| "never".to_string(), fmt_clock);
    let error = state.last_error.as_deref().unwrap_or("none");
    format!(
        "Status: {status} | Last poll: {last_poll} | Network error: {error} | History: {} points",
        view.history.len()
    )
}

pub fn log_report(view: &PollerView) {
    info!("{}", summary_line(view));
    let Some(snap) = &view.state.snapshot else {
        return;
    };
    for panel in panels(snap) {
        let body = panel
            .rows
            .iter()
            .map(|(label, value)| format!("{label}: {value}"))
            .collect::<Vec<_>>()
            .join(", ");
        info!("[{}] {body}", panel.title);
    }
}
