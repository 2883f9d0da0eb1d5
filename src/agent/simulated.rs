/*
 *  agent/simulated.rs
 *
 *  TxMon - keeps an eye on the exciter
 *  (c) 2020-26 Stuart Hunter
 *
 *  In-process stand-in for an exciter, for bench runs without hardware
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
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Instant;

use super::{AgentError, QueryAgent, Target};
use crate::registers::Register;

const NO_SUCH_OBJECT: &str = "No Such Object available on this agent at this OID";

#[derive(Debug)]
struct Exciter {
    rng: StdRng,
    vu_left: f64,
    vu_right: f64,
    latched: i64,
}

impl Exciter {
    /// Random walk within [0, 255].
    fn step_level(rng: &mut StdRng, level: f64) -> f64 {
        (level + rng.random_range(-40.0..40.0)).clamp(0.0, 255.0)
    }

    fn value(&mut self, reg: Register, uptime_ticks: u64) -> String {
        let rng = &mut self.rng;
        match reg {
            Register::SysDescr => "\"FM exciter (simulated)\"".into(),
            Register::SysName => "\"txmon-sim\"".into(),
            Register::SysLocation => "\"bench\"".into(),
            Register::DeviceObjectId => "\"1.3.6.1.4.1.65081\"".into(),
            Register::SysUpTime => uptime_ticks.to_string(),
            Register::FrequencyKhz => "97900".into(),
            Register::ForwardPower => rng.random_range(985..1015).to_string(),
            Register::ReflectedPower => rng.random_range(8..22).to_string(),
            Register::PowerPercent => "80".into(),
            Register::InternalTemp => rng.random_range(340..360).to_string(),
            Register::ExternalTemp => rng.random_range(400..430).to_string(),
            Register::AlarmBits => if self.latched != 0 { "2" } else { "0" }.into(),
            Register::PaConnected => "1".into(),
            Register::AlarmCodeNow => "0".into(),
            Register::AlarmCodeLatched => {
                // the occasional SWR trip, held until reset
                if self.latched == 0 && rng.random_bool(0.01) {
                    self.latched = 2;
                }
                self.latched.to_string()
            }
            Register::ExciterVoltage => rng.random_range(136..140).to_string(),
            Register::PaVoltage => rng.random_range(478..484).to_string(),
            Register::Pa2Voltage => rng.random_range(476..482).to_string(),
            Register::ExciterCurrent => rng.random_range(19..23).to_string(),
            Register::PaCurrent => rng.random_range(60..70).to_string(),
            Register::AudioInputSource => "0".into(),
            Register::AudioGain => "0".into(),
            Register::VuLeft => {
                self.vu_left = Self::step_level(rng, self.vu_left);
                format!("{:.0}", self.vu_left)
            }
            Register::VuRight => {
                self.vu_right = Self::step_level(rng, self.vu_right);
                format!("{:.0}", self.vu_right)
            }
        }
    }
}

/// Answers for the registers this crate polls; anything else reads as
/// "No Such Object", as a real agent would report it.
#[derive(Debug)]
pub struct SimulatedAgent {
    started: Instant,
    exciter: Mutex<Exciter>,
}

impl Default for SimulatedAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedAgent {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// Reproducible sequence of readings.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        SimulatedAgent {
            started: Instant::now(),
            exciter: Mutex::new(Exciter {
                rng,
                vu_left: 128.0,
                vu_right: 128.0,
                latched: 0,
            }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Exciter>, AgentError> {
        self.exciter
            .lock()
            .map_err(|_| AgentError::Failed("simulated exciter state poisoned".into()))
    }
}

impl QueryAgent for SimulatedAgent {
    async fn batch_read(&self, target: &Target, ids: &[&str]) -> Result<Vec<String>, AgentError> {
        debug!("simulated read of {} ids from {target}", ids.len());
        let uptime_ticks = (self.started.elapsed().as_millis() / 10) as u64;
        let mut exciter = self.lock()?;
        Ok(ids
            .iter()
            .map(|id| match Register::from_oid(id) {
                Some(reg) => exciter.value(reg, uptime_ticks),
                None => NO_SUCH_OBJECT.to_string(),
            })
            .collect())
    }

    async fn write(&self, target: &Target, id: &str, value: i64) -> Result<String, AgentError> {
        debug!("simulated write {id} = {value} on {target}");
        match Register::from_oid(id) {
            Some(Register::AlarmCodeLatched) => {
                self.lock()?.latched = value;
                Ok(format!("{id} = INTEGER: {value}"))
            }
            _ => Err(AgentError::Failed(format!("Error in packet. Reason: notWritable ({id})"))),
        }
    }
}
