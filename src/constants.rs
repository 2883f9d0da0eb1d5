/*
 *  constants.rs
 *
 *  TxMon - keeps an eye on the exciter
 *  (c) 2020-26 Stuart Hunter
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

// Device defaults
/// Address of the exciter on the bench network.
pub const DEFAULT_HOST: &str = "192.168.1.140";
/// Standard SNMP agent port.
pub const DEFAULT_SNMP_PORT: u16 = 161;
/// Seconds between scheduled polls.
pub const DEFAULT_POLL_INTERVAL_SECS: u32 = 5;
/// Lower bound for the poll interval (seconds).
pub const MIN_POLL_INTERVAL_SECS: u32 = 5;
/// Upper bound for the poll interval (seconds).
pub const MAX_POLL_INTERVAL_SECS: u32 = 10_000;

pub const DEFAULT_READ_COMMUNITY: &str = "public";
pub const DEFAULT_WRITE_COMMUNITY: &str = "private";
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_SNMPGET: &str = "snmpget";
pub const DEFAULT_SNMPSET: &str = "snmpset";

/// Per-request OID cap. The exciter's agent drops larger requests, so
/// growing the poll list must never raise this; reads are chunked instead.
pub const MAX_IDS_PER_REQUEST: usize = 5;

/// Rolling history length (points).
pub const HISTORY_CAPACITY: usize = 1000;

// Chart defaults
pub const DEFAULT_CHART_WIDTH: u32 = 900;
pub const DEFAULT_CHART_HEIGHT: u32 = 260;
/// Smallest frame that still leaves a usable plot inside the padding.
pub const MIN_CHART_WIDTH: u32 = 160;
pub const MIN_CHART_HEIGHT: u32 = 90;
/// Display refresh cadence, independent from polling.
pub const DEFAULT_REFRESH_MS: u64 = 1000;
pub const DEFAULT_OUTPUT_DIR: &str = "txmon-out";

pub const DEFAULT_LOG_LEVEL: &str = "info";
