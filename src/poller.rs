/*
 *  poller.rs
 *
 *  TxMon - keeps an eye on the exciter
 *  (c) 2020-26 Stuart Hunter
 *
 *  Scheduled polling of one exciter: poll cycle, scheduler and read model
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
use chrono::Utc;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, Mutex as TokMutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::agent::{read_chunked, AgentError, QueryAgent, Target};
use crate::constants::{MAX_IDS_PER_REQUEST, MAX_POLL_INTERVAL_SECS, MIN_POLL_INTERVAL_SECS};
use crate::decode::{decode, Snapshot};
use crate::history::{HistoryPoint, HistoryStore};
use crate::registers::{identity_oids, telemetry_oids, Register, POLL_REGISTERS};

#[derive(Debug, Error)]
pub enum PollerError {
    #[error("{0}")]
    InvalidConfig(String),

    #[error("poller has no device configured")]
    NotConfigured,

    /// Resetting the latched alarm was refused or never arrived.
    #[error("alarm reset failed: {0}")]
    Write(#[source] AgentError),

    /// The reset went through but the follow-up poll did not.
    #[error("refresh after alarm reset failed: {0}")]
    Refresh(#[source] AgentError),
}

/// Device address and polling cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    pub host: String,
    pub port: u16,
    pub poll_interval_secs: u32,
}

impl PollConfig {
    /// Validated config; the host is trimmed.
    pub fn new(host: impl Into<String>, port: u16, poll_interval_secs: u32) -> Result<Self, PollerError> {
        let config = PollConfig {
            host: host.into().trim().to_string(),
            port,
            poll_interval_secs,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PollerError> {
        if self.host.trim().is_empty() {
            return Err(PollerError::InvalidConfig("IP address is required".into()));
        }
        if self.host.trim() != self.host {
            return Err(PollerError::InvalidConfig(format!(
                "IP address {:?} has surrounding whitespace",
                self.host
            )));
        }
        if self.port == 0 {
            return Err(PollerError::InvalidConfig("SNMP port must be 1..65535".into()));
        }
        if !(MIN_POLL_INTERVAL_SECS..=MAX_POLL_INTERVAL_SECS).contains(&self.poll_interval_secs) {
            return Err(PollerError::InvalidConfig(format!(
                "Polling time must be {MIN_POLL_INTERVAL_SECS}..{MAX_POLL_INTERVAL_SECS} seconds"
            )));
        }
        Ok(())
    }

    /// Timer period, clamped into the supported range.
    pub fn interval(&self) -> Duration {
        let secs = self
            .poll_interval_secs
            .clamp(MIN_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS);
        Duration::from_secs(u64::from(secs))
    }

    pub fn target(&self) -> Target {
        Target {
            host: self.host.clone(),
            port: self.port,
        }
    }
}

/// What the poller currently knows about the device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollState {
    pub running: bool,
    pub config: Option<PollConfig>,
    /// Wall-clock time of the last cycle, successful or not.
    pub last_poll_ms: Option<i64>,
    /// Cleared by the next successful cycle.
    pub last_error: Option<String>,
    /// Kept across failed cycles so stale values stay visible.
    pub snapshot: Option<Snapshot>,
}

/// Owned copy of the read model handed to renderers and the API layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollerView {
    #[serde(flatten)]
    pub state: PollState,
    pub history: Vec<HistoryPoint>,
}

#[derive(Debug)]
struct Inner {
    state: PollState,
    history: HistoryStore,
}

struct Shared<A> {
    agent: A,
    max_per_request: usize,
    inner: TokMutex<Inner>,
    /// Held for a whole cycle so cycles never overlap.
    cycle_gate: TokMutex<()>,
}

impl<A: QueryAgent> Shared<A> {
    async fn current_config(&self) -> Option<PollConfig> {
        self.inner.lock().await.state.config.clone()
    }

    /// Values for `POLL_REGISTERS`, in order. Text registers go out one per
    /// request so a string that wraps over several lines cannot shift the
    /// numeric values after it.
    async fn read_registers(&self, target: &Target) -> Result<Vec<String>, AgentError> {
        let mut values = read_chunked(&self.agent, target, &identity_oids(), 1).await?;
        let telemetry = telemetry_oids();
        values.extend(read_chunked(&self.agent, target, &telemetry, self.max_per_request).await?);
        Ok(values)
    }

    /// One poll cycle. The device is queried without holding the state lock;
    /// results land in one locked update.
    async fn run_cycle(&self, config: &PollConfig) -> Result<(), AgentError> {
        let _gate = self.cycle_gate.lock().await;

        let result = self.read_registers(&config.target()).await;
        let now = Utc::now().timestamp_millis();

        let mut inner = self.inner.lock().await;
        inner.state.last_poll_ms = Some(now);
        match result {
            Ok(values) => {
                let snapshot = decode(&POLL_REGISTERS, &values);
                if let Some(point) = HistoryPoint::from_snapshot(now, &snapshot) {
                    inner.history.append(point);
                }
                inner.state.snapshot = Some(snapshot);
                inner.state.last_error = None;
                Ok(())
            }
            Err(e) => {
                inner.state.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Timer-driven cycle; failures are recorded and logged, never fatal.
    async fn tick(&self) {
        let Some(config) = self.current_config().await else {
            debug!("poll tick with no device configured");
            return;
        };
        match self.run_cycle(&config).await {
            Ok(()) => debug!("polled {}", config.target()),
            Err(e) => warn!("poll of {} failed: {}", config.target(), e),
        }
    }
}

async fn poll_loop<A: QueryAgent>(shared: Arc<Shared<A>>, mut stop_rx: mpsc::Receiver<()>, period: Duration) {
    // superseded before it ever ran
    if !matches!(stop_rx.try_recv(), Err(TryRecvError::Empty)) {
        return;
    }
    shared.tick().await;

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = stop_rx.recv() => {
                debug!("poll task received stop signal. Exiting.");
                break;
            }
            _ = ticker.tick() => shared.tick().await,
        }
    }
}

#[derive(Default)]
struct Control {
    stop_sender: Option<mpsc::Sender<()>>,
    poll_handle: Option<JoinHandle<()>>,
}

impl Control {
    /// Signals the running task, if any. An in-flight cycle is left to finish.
    fn halt(&mut self) -> Option<JoinHandle<()>> {
        if let Some(sender) = self.stop_sender.take() {
            if let Err(e) = sender.try_send(()) {
                error!("Failed to send stop signal to poll task: {}", e);
            }
        }
        self.poll_handle.take()
    }
}

/// Polls one device on a timer and owns its snapshot and history.
pub struct Poller<A: QueryAgent> {
    shared: Arc<Shared<A>>,
    control: TokMutex<Control>,
}

impl<A: QueryAgent> Poller<A> {
    pub fn new(agent: A) -> Self {
        Self::with_batch_limit(agent, MAX_IDS_PER_REQUEST)
    }

    /// Poller whose reads carry at most `max_per_request` ids each.
    pub fn with_batch_limit(agent: A, max_per_request: usize) -> Self {
        Poller {
            shared: Arc::new(Shared {
                agent,
                max_per_request,
                inner: TokMutex::new(Inner {
                    state: PollState::default(),
                    history: HistoryStore::new(),
                }),
                cycle_gate: TokMutex::new(()),
            }),
            control: TokMutex::new(Control::default()),
        }
    }

    pub fn agent(&self) -> &A {
        &self.shared.agent
    }

    /// (Re)starts polling: cancels any active timer, optionally clears
    /// history, runs one cycle straight away, then one per interval.
    /// An invalid config is rejected with the current state left alone.
    pub async fn start(&self, config: PollConfig, reset_history: bool) -> Result<(), PollerError> {
        config.validate()?;
        let period = config.interval();

        let mut control = self.control.lock().await;
        let restarted = control.halt().is_some();
        {
            let mut inner = self.shared.inner.lock().await;
            if reset_history {
                inner.history.clear();
            }
            inner.state.config = Some(config.clone());
            inner.state.running = true;
        }

        let (tx, rx) = mpsc::channel(1);
        control.stop_sender = Some(tx);
        control.poll_handle = Some(tokio::spawn(poll_loop(Arc::clone(&self.shared), rx, period)));

        info!(
            "{} polling {} every {:?}{}",
            if restarted { "Restarted" } else { "Started" },
            config.target(),
            period,
            if reset_history { " (history cleared)" } else { "" }
        );
        Ok(())
    }

    /// Stops future ticks. Idempotent.
    pub async fn stop(&self) {
        let was_running = self.control.lock().await.halt().is_some();
        self.shared.inner.lock().await.state.running = false;
        if was_running {
            info!("Polling stopped");
        }
    }

    /// Stops and waits for the poll task, including any in-flight cycle.
    pub async fn shutdown(&self) {
        let handle = self.control.lock().await.halt();
        self.shared.inner.lock().await.state.running = false;
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("poll task ended abnormally: {}", e);
            }
        }
    }

    /// Replaces the device address used from the next cycle on. The timer
    /// period only changes on `start`.
    pub async fn configure(&self, config: PollConfig) -> Result<(), PollerError> {
        config.validate()?;
        self.shared.inner.lock().await.state.config = Some(config);
        Ok(())
    }

    /// Runs one cycle now, serialized with the timer's cycles.
    pub async fn poll_now(&self) -> Result<(), PollerError> {
        let config = self.shared.current_config().await.ok_or(PollerError::NotConfigured)?;
        self.shared.run_cycle(&config).await.map_err(PollerError::Refresh)
    }

    /// Writes 0 to the latched-alarm register, then polls once.
    pub async fn reset_latched_alarm(&self) -> Result<(), PollerError> {
        let config = self.shared.current_config().await.ok_or(PollerError::NotConfigured)?;
        let ack = self
            .shared
            .agent
            .write(&config.target(), Register::AlarmCodeLatched.oid(), 0)
            .await
            .map_err(PollerError::Write)?;
        info!("Latched alarm reset on {}: {}", config.target(), ack);
        self.shared.run_cycle(&config).await.map_err(PollerError::Refresh)
    }

    pub async fn state(&self) -> PollerView {
        let inner = self.shared.inner.lock().await;
        PollerView {
            state: inner.state.clone(),
            history: inner.history.snapshot(),
        }
    }

    pub async fn history(&self) -> Vec<HistoryPoint> {
        self.shared.inner.lock().await.history.snapshot()
    }

    pub async fn clear_history(&self) {
        self.shared.inner.lock().await.history.clear();
    }

    pub async fn is_running(&self) -> bool {
        self.shared.inner.lock().await.state.running
    }
}

// Stop the background task when the poller goes out of scope
impl<A: QueryAgent> Drop for Poller<A> {
    fn drop(&mut self) {
        if self.control.get_mut().halt().is_some() {
            debug!("Poller dropped. Poll task signalled to stop.");
        }
    }
}
