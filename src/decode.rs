/*
 *  decode.rs
 *
 *  TxMon - keeps an eye on the exciter
 *  (c) 2020-26 Stuart Hunter
 *
 *  Raw agent replies to typed, unit-converted snapshot values
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
//! Every field decodes on its own. A value that will not parse becomes
//! `None` for that field (and its converted sibling) and nothing else.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::registers::Register;

/// Hundredths of a second per uptime tick.
const TICKS_PER_SECOND: u64 = 100;
/// Fixed-point registers report tenths of a unit.
const TENTHS: f64 = 10.0;
const KHZ_PER_MHZ: f64 = 1000.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub descr: String,
    pub name: String,
    pub location: String,
    pub device_object_id: String,
    pub uptime_ticks: Option<u64>,
    pub uptime_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RfInfo {
    pub frequency_khz: Option<f64>,
    pub frequency_mhz: Option<f64>,
    pub forward_power_raw: Option<f64>,
    pub forward_power_w: Option<f64>,
    pub reflected_power_raw: Option<f64>,
    pub reflected_power_w: Option<f64>,
    pub power_percent: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThermalInfo {
    pub internal_temp_raw: Option<f64>,
    pub internal_temp_c: Option<f64>,
    pub external_temp_raw: Option<f64>,
    pub external_temp_c: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlarmInfo {
    pub bits: Option<u32>,
    pub pa_connected: Option<bool>,
    pub code_now: Option<i64>,
    pub code_now_text: Option<String>,
    pub code_latched: Option<i64>,
    pub code_latched_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerRailInfo {
    pub exciter_voltage_raw: Option<f64>,
    pub exciter_voltage_v: Option<f64>,
    pub pa_voltage_raw: Option<f64>,
    pub pa_voltage_v: Option<f64>,
    pub pa2_voltage_raw: Option<f64>,
    pub pa2_voltage_v: Option<f64>,
    pub exciter_current_raw: Option<f64>,
    pub exciter_current_a: Option<f64>,
    pub pa_current_raw: Option<f64>,
    pub pa_current_a: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioInfo {
    pub input_source: Option<i64>,
    pub input_source_text: Option<String>,
    pub gain_db: Option<f64>,
    pub vu_left: Option<f64>,
    pub vu_right: Option<f64>,
}

/// Decoded state of the exciter at one poll. All groups are always present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub system: SystemInfo,
    pub rf: RfInfo,
    pub thermal: ThermalInfo,
    pub alarms: AlarmInfo,
    pub power_rail: PowerRailInfo,
    pub audio: AudioInfo,
}

/// Replies keyed by register. Registers without a reply read as absent.
struct Readings<'a> {
    values: HashMap<Register, &'a str>,
}

impl<'a> Readings<'a> {
    fn new(registers: &[Register], values: &'a [String]) -> Self {
        let values = registers
            .iter()
            .copied()
            .zip(values.iter().map(String::as_str))
            .collect();
        Readings { values }
    }

    fn text(&self, reg: Register) -> String {
        self.values.get(&reg).map(|s| unquote(s).to_string()).unwrap_or_default()
    }

    fn number(&self, reg: Register) -> Option<f64> {
        self.values.get(&reg).and_then(|s| parse_number(s))
    }

    fn code(&self, reg: Register) -> Option<i64> {
        self.values.get(&reg).and_then(|s| parse_code(s))
    }

    fn ticks(&self, reg: Register) -> Option<u64> {
        self.values.get(&reg).and_then(|s| parse_time_ticks(s))
    }
}

/// Strips surrounding whitespace and one pair of double quotes.
pub fn unquote(raw: &str) -> &str {
    let s = raw.trim();
    let s = s.strip_prefix('"').unwrap_or(s);
    let s = s.strip_suffix('"').unwrap_or(s);
    s.trim()
}

/// A finite number, or `None` for empty, non-numeric or non-finite input.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = unquote(raw);
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Integral codes (alarm, source, bitmask). Fractional values are rejected.
pub fn parse_code(raw: &str) -> Option<i64> {
    let n = parse_number(raw)?;
    if n.fract() != 0.0 || n < i64::MIN as f64 || n > i64::MAX as f64 {
        return None;
    }
    Some(n as i64)
}

/// Ways an uptime counter shows up in agent output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFormat {
    /// `36000`
    Bare,
    /// `Timeticks: (36000) 0:06:00.00`
    Parenthesised,
    /// `[N day[s], ]H:MM:SS[.ff]`
    Clock,
}

impl TickFormat {
    /// Tried in this order; first hit wins.
    pub const PRIORITY: [TickFormat; 3] = [TickFormat::Bare, TickFormat::Parenthesised, TickFormat::Clock];

    pub fn parse(self, s: &str) -> Option<u64> {
        match self {
            TickFormat::Bare => parse_number(s)
                .filter(|n| *n >= 0.0 && *n <= u64::MAX as f64)
                .map(|n| n.floor() as u64),
            TickFormat::Parenthesised => parse_parenthesised(s),
            TickFormat::Clock => parse_clock(s),
        }
    }
}

/// Uptime in ticks (hundredths of a second).
pub fn parse_time_ticks(raw: &str) -> Option<u64> {
    let s = unquote(raw);
    TickFormat::PRIORITY.iter().find_map(|f| f.parse(s))
}

fn digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_parenthesised(s: &str) -> Option<u64> {
    s.match_indices('(').find_map(|(at, _)| {
        let rest = &s[at + 1..];
        let (inner, _) = rest.split_once(')')?;
        digits(inner)
    })
}

fn parse_clock(s: &str) -> Option<u64> {
    let (days, clock) = match s.split_once(',') {
        Some((head, tail)) => {
            let mut words = head.split_whitespace();
            let count = digits(words.next()?)?;
            let unit = words.next()?;
            if words.next().is_some()
                || !(unit.eq_ignore_ascii_case("day") || unit.eq_ignore_ascii_case("days"))
                || head.trim_start() != head
            {
                return None;
            }
            (count, tail.trim_start())
        }
        None => (0, s),
    };

    let (hms, frac) = match clock.split_once('.') {
        Some((hms, frac)) => (hms, Some(frac)),
        None => (clock, None),
    };
    let mut parts = hms.split(':');
    let hours = digits(parts.next()?)?;
    let minutes = digits(parts.next()?)?;
    let seconds = digits(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }
    let hundredths = match frac {
        None => 0,
        Some(f) => {
            digits(f)?;
            let padded = format!("{f:0<2}");
            digits(&padded[..2])?
        }
    };

    days.checked_mul(24)?
        .checked_add(hours)?
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?
        .checked_add(seconds)?
        .checked_mul(TICKS_PER_SECOND)?
        .checked_add(hundredths)
}

pub fn alarm_text(code: i64) -> String {
    match code {
        0 => "No alarm".into(),
        1 => "External temperature alarm".into(),
        2 => "High SWR alarm".into(),
        3 => "Internal temperature alarm".into(),
        4 => "High current alarm".into(),
        5 => "High voltage alarm".into(),
        6 => "No exciter communication".into(),
        _ => format!("Unknown alarm code ({code})"),
    }
}

pub fn audio_source_text(code: i64) -> String {
    match code {
        0 => "Analog input".into(),
        1 => "AES/EBU".into(),
        2 => "I2S #1".into(),
        3 => "I2S #2".into(),
        _ => format!("Unknown source ({code})"),
    }
}

fn tenths(raw: Option<f64>) -> Option<f64> {
    raw.map(|v| v / TENTHS)
}

/// Decodes replies aligned 1:1 with `registers`.
pub fn decode(registers: &[Register], values: &[String]) -> Snapshot {
    let r = Readings::new(registers, values);

    let uptime_ticks = r.ticks(Register::SysUpTime);
    let frequency_khz = r.number(Register::FrequencyKhz);
    let forward_power_raw = r.number(Register::ForwardPower);
    let reflected_power_raw = r.number(Register::ReflectedPower);
    let internal_temp_raw = r.number(Register::InternalTemp);
    let external_temp_raw = r.number(Register::ExternalTemp);
    let exciter_voltage_raw = r.number(Register::ExciterVoltage);
    let pa_voltage_raw = r.number(Register::PaVoltage);
    let pa2_voltage_raw = r.number(Register::Pa2Voltage);
    let exciter_current_raw = r.number(Register::ExciterCurrent);
    let pa_current_raw = r.number(Register::PaCurrent);
    let code_now = r.code(Register::AlarmCodeNow);
    let code_latched = r.code(Register::AlarmCodeLatched);
    let input_source = r.code(Register::AudioInputSource);

    Snapshot {
        system: SystemInfo {
            descr: r.text(Register::SysDescr),
            name: r.text(Register::SysName),
            location: r.text(Register::SysLocation),
            device_object_id: r.text(Register::DeviceObjectId),
            uptime_ticks,
            uptime_secs: uptime_ticks.map(|t| t / TICKS_PER_SECOND),
        },
        rf: RfInfo {
            frequency_khz,
            frequency_mhz: frequency_khz.map(|k| k / KHZ_PER_MHZ),
            forward_power_raw,
            forward_power_w: tenths(forward_power_raw),
            reflected_power_raw,
            reflected_power_w: tenths(reflected_power_raw),
            power_percent: r.number(Register::PowerPercent),
        },
        thermal: ThermalInfo {
            internal_temp_raw,
            internal_temp_c: tenths(internal_temp_raw),
            external_temp_raw,
            external_temp_c: tenths(external_temp_raw),
        },
        alarms: AlarmInfo {
            bits: r.code(Register::AlarmBits).and_then(|b| u32::try_from(b).ok()),
            pa_connected: r.number(Register::PaConnected).map(|v| v != 0.0),
            code_now,
            code_now_text: code_now.map(alarm_text),
            code_latched,
            code_latched_text: code_latched.map(alarm_text),
        },
        power_rail: PowerRailInfo {
            exciter_voltage_raw,
            exciter_voltage_v: tenths(exciter_voltage_raw),
            pa_voltage_raw,
            pa_voltage_v: tenths(pa_voltage_raw),
            pa2_voltage_raw,
            pa2_voltage_v: tenths(pa2_voltage_raw),
            exciter_current_raw,
            exciter_current_a: tenths(exciter_current_raw),
            pa_current_raw,
            pa_current_a: tenths(pa_current_raw),
        },
        audio: AudioInfo {
            input_source,
            input_source_text: input_source.map(audio_source_text),
            gain_db: r.number(Register::AudioGain),
            vu_left: r.number(Register::VuLeft),
            vu_right: r.number(Register::VuRight),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::POLL_REGISTERS;
    use proptest::prelude::*;
    use serde_json::Value;

    fn clean_reply(reg: Register) -> String {
        match reg {
            Register::SysDescr => "\"PCS Electronics exciter\"".into(),
            Register::SysName => "\"tx-north\"".into(),
            Register::SysLocation => "\"Hill site\"".into(),
            Register::DeviceObjectId => "\"65081.1\"".into(),
            Register::SysUpTime => "36000".into(),
            Register::FrequencyKhz => "97900".into(),
            Register::ForwardPower => "1234".into(),
            Register::ReflectedPower => "12".into(),
            Register::PowerPercent => "80".into(),
            Register::ExciterVoltage => "138".into(),
            Register::PaVoltage => "480".into(),
            Register::Pa2Voltage => "479".into(),
            Register::ExciterCurrent => "21".into(),
            Register::PaCurrent => "65".into(),
            Register::AudioInputSource => "1".into(),
            Register::AudioGain => "-3".into(),
            Register::VuLeft => "120".into(),
            Register::VuRight => "118".into(),
            Register::InternalTemp => "352".into(),
            Register::ExternalTemp => "417".into(),
            Register::AlarmBits => "5".into(),
            Register::PaConnected => "1".into(),
            Register::AlarmCodeNow => "0".into(),
            Register::AlarmCodeLatched => "9".into(),
        }
    }

    fn clean_values() -> Vec<String> {
        POLL_REGISTERS.iter().map(|r| clean_reply(*r)).collect()
    }

    /// JSON pointers of the fields a register feeds.
    fn fields_of(reg: Register) -> &'static [&'static str] {
        match reg {
            Register::SysUpTime => &["/system/uptime_ticks", "/system/uptime_secs"],
            Register::FrequencyKhz => &["/rf/frequency_khz", "/rf/frequency_mhz"],
            Register::ForwardPower => &["/rf/forward_power_raw", "/rf/forward_power_w"],
            Register::ReflectedPower => &["/rf/reflected_power_raw", "/rf/reflected_power_w"],
            Register::PowerPercent => &["/rf/power_percent"],
            Register::ExciterVoltage => &["/power_rail/exciter_voltage_raw", "/power_rail/exciter_voltage_v"],
            Register::PaVoltage => &["/power_rail/pa_voltage_raw", "/power_rail/pa_voltage_v"],
            Register::Pa2Voltage => &["/power_rail/pa2_voltage_raw", "/power_rail/pa2_voltage_v"],
            Register::ExciterCurrent => &["/power_rail/exciter_current_raw", "/power_rail/exciter_current_a"],
            Register::PaCurrent => &["/power_rail/pa_current_raw", "/power_rail/pa_current_a"],
            Register::AudioInputSource => &["/audio/input_source", "/audio/input_source_text"],
            Register::AudioGain => &["/audio/gain_db"],
            Register::VuLeft => &["/audio/vu_left"],
            Register::VuRight => &["/audio/vu_right"],
            Register::InternalTemp => &["/thermal/internal_temp_raw", "/thermal/internal_temp_c"],
            Register::ExternalTemp => &["/thermal/external_temp_raw", "/thermal/external_temp_c"],
            Register::AlarmBits => &["/alarms/bits"],
            Register::PaConnected => &["/alarms/pa_connected"],
            Register::AlarmCodeNow => &["/alarms/code_now", "/alarms/code_now_text"],
            Register::AlarmCodeLatched => &["/alarms/code_latched", "/alarms/code_latched_text"],
            Register::SysDescr | Register::SysName | Register::SysLocation | Register::DeviceObjectId => &[],
        }
    }

    #[test]
    fn test_unit_conversions() {
        let snap = decode(&POLL_REGISTERS, &clean_values());
        assert_eq!(snap.rf.forward_power_w, Some(123.4));
        assert_eq!(snap.rf.frequency_mhz, Some(97.9));
        assert_eq!(snap.rf.reflected_power_w, Some(1.2));
        assert_eq!(snap.thermal.external_temp_c, Some(41.7));
        assert_eq!(snap.power_rail.pa_current_a, Some(6.5));
        assert_eq!(snap.system.uptime_secs, Some(360));
        assert_eq!(snap.system.name, "tx-north");
        assert_eq!(snap.alarms.bits, Some(5));
        assert_eq!(snap.alarms.pa_connected, Some(true));
        assert_eq!(snap.audio.input_source_text.as_deref(), Some("AES/EBU"));
    }

    #[test]
    fn test_unknown_codes_are_synthesised() {
        let snap = decode(&POLL_REGISTERS, &clean_values());
        assert_eq!(snap.alarms.code_now_text.as_deref(), Some("No alarm"));
        assert_eq!(snap.alarms.code_latched_text.as_deref(), Some("Unknown alarm code (9)"));
        assert_eq!(audio_source_text(7), "Unknown source (7)");
    }

    #[test]
    fn test_uptime_formats() {
        assert_eq!(parse_time_ticks("36000").map(|t| t / 100), Some(360));
        assert_eq!(parse_time_ticks("(36000) 0:06:00.00").map(|t| t / 100), Some(360));
        assert_eq!(parse_time_ticks("Timeticks: (123456) 0:20:34.56"), Some(123_456));
        assert_eq!(parse_time_ticks("1 day, 0:00:00.00").map(|t| t / 100), Some(86_400));
        assert_eq!(parse_time_ticks("14 days, 6:56:07.89"), Some(123_456_789));
        assert_eq!(parse_time_ticks("6:56:07.8"), Some(2_496_780));
        assert_eq!(parse_time_ticks("\"6:56:07\""), Some(2_496_700));
        assert_eq!(parse_time_ticks("sometime"), None);
        assert_eq!(parse_time_ticks("1 week, 0:00:00"), None);
        assert_eq!(parse_time_ticks(""), None);
    }

    #[test]
    fn test_strategies_in_priority_order() {
        assert_eq!(TickFormat::Bare.parse("(5) 0:00:00.05"), None);
        assert_eq!(TickFormat::Parenthesised.parse("(5) 0:00:00.05"), Some(5));
        assert_eq!(TickFormat::Clock.parse("0:00:01"), Some(100));
    }

    #[test]
    fn test_number_parsing_is_strict() {
        assert_eq!(parse_number(" \"42\" "), Some(42.0));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("\"\""), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("No Such Object available on this agent at this OID"), None);
        assert_eq!(parse_code("2.5"), None);
        assert_eq!(parse_code("-1"), Some(-1));
    }

    #[test]
    fn test_short_reply_list_leaves_tail_null() {
        let values = clean_values();
        let snap = decode(&POLL_REGISTERS, &values[..6]);
        assert_eq!(snap.rf.frequency_mhz, Some(97.9));
        assert_eq!(snap.rf.forward_power_w, None);
        assert_eq!(snap.alarms.code_now_text, None);
        assert_eq!(snap.audio, AudioInfo::default());
    }

    fn flatten(prefix: String, value: &Value, out: &mut Vec<(String, Value)>) {
        match value {
            Value::Object(map) => {
                for (k, v) in map {
                    flatten(format!("{prefix}/{k}"), v, out);
                }
            }
            other => out.push((prefix, other.clone())),
        }
    }

    proptest! {
        #[test]
        fn prop_corrupting_one_field_only_nulls_that_field(
            index in 0usize..POLL_REGISTERS.len(),
            garbage in prop_oneof![Just(String::new()), "[a-z ]{1,12}", Just("NaN".to_string())],
        ) {
            let reg = POLL_REGISTERS[index];
            prop_assume!(!reg.is_text());
            let clean = serde_json::to_value(decode(&POLL_REGISTERS, &clean_values())).unwrap();
            let mut values = clean_values();
            values[index] = garbage;
            let dirty = serde_json::to_value(decode(&POLL_REGISTERS, &values)).unwrap();

            let mut clean_leaves = Vec::new();
            let mut dirty_leaves = Vec::new();
            flatten(String::new(), &clean, &mut clean_leaves);
            flatten(String::new(), &dirty, &mut dirty_leaves);
            let affected = fields_of(reg);
            for ((path, before), (_, after)) in clean_leaves.iter().zip(dirty_leaves.iter()) {
                if affected.contains(&path.as_str()) {
                    prop_assert_eq!(after, &Value::Null, "{} should be null", path);
                } else {
                    prop_assert_eq!(after, before, "{} should be untouched", path);
                }
            }
        }
    }
}
