/*
 *  registers.rs
 *
 *  TxMon - keeps an eye on the exciter
 *  (c) 2020-26 Stuart Hunter
 *
 *  Register table of the exciter MIB (enterprise 65081) plus the
 *  MIB-II system group
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

/// A numbered value on the device, addressed by OID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    SysDescr,
    SysUpTime,
    SysName,
    SysLocation,
    DeviceObjectId,

    ForwardPower,
    ReflectedPower,
    PowerPercent,

    InternalTemp,
    ExternalTemp,

    AlarmBits,
    PaConnected,
    AlarmCodeNow,
    AlarmCodeLatched,

    ExciterVoltage,
    PaVoltage,
    Pa2Voltage,

    ExciterCurrent,
    PaCurrent,

    AudioInputSource,
    AudioGain,
    VuLeft,
    VuRight,

    FrequencyKhz,
}

/// Every register read by a poll cycle, in request order. Replies are
/// aligned to this order positionally.
pub const POLL_REGISTERS: [Register; 24] = [
    Register::SysDescr,
    Register::SysName,
    Register::SysLocation,
    Register::DeviceObjectId,
    Register::SysUpTime,
    Register::FrequencyKhz,
    Register::ForwardPower,
    Register::ReflectedPower,
    Register::PowerPercent,
    Register::ExciterVoltage,
    Register::PaVoltage,
    Register::Pa2Voltage,
    Register::ExciterCurrent,
    Register::PaCurrent,
    Register::AudioInputSource,
    Register::AudioGain,
    Register::VuLeft,
    Register::VuRight,
    Register::InternalTemp,
    Register::ExternalTemp,
    Register::AlarmBits,
    Register::PaConnected,
    Register::AlarmCodeNow,
    Register::AlarmCodeLatched,
];

impl Register {
    pub const fn oid(self) -> &'static str {
        match self {
            Register::SysDescr => "1.3.6.1.2.1.1.1.0",
            Register::SysUpTime => "1.3.6.1.2.1.1.3.0",
            Register::SysName => "1.3.6.1.2.1.1.5.0",
            Register::SysLocation => "1.3.6.1.2.1.1.6.0",
            Register::DeviceObjectId => "1.3.6.1.4.1.65081.1.1.0",

            Register::ForwardPower => "1.3.6.1.4.1.65081.1.2.1.0",
            Register::ReflectedPower => "1.3.6.1.4.1.65081.1.2.2.0",
            Register::PowerPercent => "1.3.6.1.4.1.65081.1.2.3.0",

            Register::InternalTemp => "1.3.6.1.4.1.65081.1.3.1.0",
            Register::ExternalTemp => "1.3.6.1.4.1.65081.1.3.2.0",

            Register::AlarmBits => "1.3.6.1.4.1.65081.1.4.1.0",
            Register::PaConnected => "1.3.6.1.4.1.65081.1.4.2.0",
            Register::AlarmCodeNow => "1.3.6.1.4.1.65081.1.4.3.0",
            Register::AlarmCodeLatched => "1.3.6.1.4.1.65081.1.4.4.0",

            Register::ExciterVoltage => "1.3.6.1.4.1.65081.1.5.1.0",
            Register::PaVoltage => "1.3.6.1.4.1.65081.1.5.2.0",
            Register::Pa2Voltage => "1.3.6.1.4.1.65081.1.5.3.0",

            Register::ExciterCurrent => "1.3.6.1.4.1.65081.1.6.1.0",
            Register::PaCurrent => "1.3.6.1.4.1.65081.1.6.2.0",

            Register::AudioInputSource => "1.3.6.1.4.1.65081.1.7.1.0",
            Register::AudioGain => "1.3.6.1.4.1.65081.1.7.2.0",
            Register::VuLeft => "1.3.6.1.4.1.65081.1.7.3.0",
            Register::VuRight => "1.3.6.1.4.1.65081.1.7.4.0",

            Register::FrequencyKhz => "1.3.6.1.4.1.65081.1.8.1.0",
        }
    }

    /// MIB object name, used in log output.
    pub const fn name(self) -> &'static str {
        match self {
            Register::SysDescr => "sysDescr",
            Register::SysUpTime => "sysUpTime",
            Register::SysName => "sysName",
            Register::SysLocation => "sysLocation",
            Register::DeviceObjectId => "pcsDeviceObjectId",
            Register::ForwardPower => "txForwardPower",
            Register::ReflectedPower => "txReflectedPower",
            Register::PowerPercent => "txPowerPercent",
            Register::InternalTemp => "txInternalTemp",
            Register::ExternalTemp => "txExternalTemp",
            Register::AlarmBits => "txAlarmBits",
            Register::PaConnected => "txPAConnected",
            Register::AlarmCodeNow => "txAlarmCodeNow",
            Register::AlarmCodeLatched => "txAlarmCodeLatched",
            Register::ExciterVoltage => "txExciterVoltage",
            Register::PaVoltage => "txPAVoltage",
            Register::Pa2Voltage => "txPA2Voltage",
            Register::ExciterCurrent => "txExciterCurrent",
            Register::PaCurrent => "txPACurrent",
            Register::AudioInputSource => "txAudioInputSource",
            Register::AudioGain => "txAudioGain",
            Register::VuLeft => "txVULeft",
            Register::VuRight => "txVURight",
            Register::FrequencyKhz => "txFrequencykHz",
        }
    }

    /// Identity registers carry free text rather than numbers.
    pub const fn is_text(self) -> bool {
        matches!(
            self,
            Register::SysDescr | Register::SysName | Register::SysLocation | Register::DeviceObjectId
        )
    }

    pub fn from_oid(oid: &str) -> Option<Register> {
        let oid = oid.strip_prefix('.').unwrap_or(oid);
        POLL_REGISTERS.iter().copied().find(|r| r.oid() == oid)
    }
}

/// OIDs of `POLL_REGISTERS`, in the same order.
pub fn poll_oids() -> Vec<&'static str> {
    POLL_REGISTERS.iter().map(|r| r.oid()).collect()
}

/// Free-text registers, which lead `POLL_REGISTERS`. A text value may span
/// several output lines, so each one is requested on its own.
pub fn identity_oids() -> Vec<&'static str> {
    POLL_REGISTERS.iter().filter(|r| r.is_text()).map(|r| r.oid()).collect()
}

/// The single-line numeric registers that follow the identity block.
pub fn telemetry_oids() -> Vec<&'static str> {
    POLL_REGISTERS.iter().filter(|r| !r.is_text()).map(|r| r.oid()).collect()
}
