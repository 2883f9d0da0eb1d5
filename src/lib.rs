/*
 *  lib.rs
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
//! Polls an FM exciter's management agent, keeps a rolling history of
//! power and audio levels, and renders both as charts.

pub mod agent;
pub mod chart;
pub mod config;
pub mod constants;
pub mod decode;
pub mod history;
pub mod poller;
pub mod registers;
pub mod report;

pub use agent::{AgentError, NetSnmpAgent, QueryAgent, SimulatedAgent, Target};
pub use chart::{ChartRenderer, RenderError};
pub use decode::Snapshot;
pub use history::{HistoryPoint, HistoryStore};
pub use poller::{PollConfig, PollState, Poller, PollerError, PollerView};
