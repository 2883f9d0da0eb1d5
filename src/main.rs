/*
 *  main.rs
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
use anyhow::Context;
use env_logger::Env;
use log::{error, info, warn};
use std::path::Path;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::MissedTickBehavior;

use txmon::config::{self, Cli, Config};
use txmon::{chart, report, ChartRenderer, NetSnmpAgent, Poller, PollerView, QueryAgent, SimulatedAgent};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

async fn signal_handler() -> Result<(), Box<dyn std::error::Error>> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

fn write_frame(renderer: &ChartRenderer, view: &PollerView, out_dir: &Path) -> anyhow::Result<()> {
    let power = renderer.render_power(&view.history)?;
    ChartRenderer::save_png(&power, &out_dir.join("power.png"))?;

    let levels = renderer.render_levels(&view.history)?;
    ChartRenderer::save_png(&levels, &out_dir.join("levels.png"))?;

    let json = serde_json::to_vec_pretty(view)?;
    chart::write_atomic(&out_dir.join("state.json"), &json)?;
    Ok(())
}

/// Redraws on its own cadence; it only ever reads poller state.
async fn display_loop<A: QueryAgent>(poller: &Poller<A>, renderer: &ChartRenderer, out_dir: &Path, refresh: Duration) {
    let mut ticker = tokio::time::interval(refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut reported: Option<i64> = None;

    loop {
        ticker.tick().await;
        let view = poller.state().await;
        if let Err(e) = write_frame(renderer, &view, out_dir) {
            warn!("chart refresh failed: {:#}", e);
        }
        // log once per landed poll, not once per frame
        if view.state.last_poll_ms != reported {
            reported = view.state.last_poll_ms;
            report::log_report(&view);
        }
    }
}

async fn run<A: QueryAgent>(agent: A, cfg: &Config, cli: &Cli) -> anyhow::Result<()> {
    let poll_config = cfg.poll_config()?;
    let poller = Poller::new(agent);

    if cli.reset_latched_alarm {
        poller.configure(poll_config).await?;
        poller
            .reset_latched_alarm()
            .await
            .context("resetting latched alarm")?;
        report::log_report(&poller.state().await);
        return Ok(());
    }

    let out_dir = cfg.output_dir();
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;
    let (width, height) = cfg.chart_size();
    let renderer = ChartRenderer::new(width, height);
    info!("Charts {}x{} into {} every {:?}", width, height, out_dir.display(), cfg.refresh_interval());

    poller.start(poll_config, cfg.reset_history_on_start()).await?;

    tokio::select! {
        res = signal_handler() => {
            if let Err(e) = res {
                error!("signal handler failed: {}", e);
            }
        }
        _ = display_loop(&poller, &renderer, &out_dir, cfg.refresh_interval()) => {}
    }

    poller.shutdown().await;
    info!("Polling finished, exiting.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (cfg, cli) = config::load().context("loading configuration")?;

    if cli.dump_config {
        println!("{}", config::dump(&cfg)?);
        return Ok(());
    }

    env_logger::Builder::from_env(Env::default().default_filter_or(cfg.log_level()))
        .format_timestamp_secs()
        .init();

    info!("{} keeps an eye on the exciter", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    if cfg.simulate() {
        info!("Using the simulated exciter");
        run(SimulatedAgent::new(), &cfg, &cli).await
    } else {
        run(NetSnmpAgent::new(cfg.agent_settings()), &cfg, &cli).await
    }
}
