/*
 *  config.rs
 *
 *  TxMon - keeps an eye on the exciter
 *  (c) 2020-26 Stuart Hunter
 *
 *  Defaults, YAML file and command line, layered in that order
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
use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::agent::AgentSettings;
use crate::constants::*;
use crate::poller::PollConfig;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration. Every field is optional so layers can be
/// merged; the accessors fall back to the built-in defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    pub reset_history_on_start: Option<bool>,
    pub device: Option<DeviceConfig>,
    pub charts: Option<ChartConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DeviceConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub poll_interval_secs: Option<u32>,
    pub read_community: Option<String>,
    pub write_community: Option<String>,
    pub read_timeout_ms: Option<u64>,
    pub write_timeout_ms: Option<u64>,
    pub snmpget: Option<PathBuf>,
    pub snmpset: Option<PathBuf>,
    /// answer from the in-process simulator instead of the network
    pub simulate: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChartConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub refresh_ms: Option<u64>,
    pub output_dir: Option<PathBuf>,
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "txmon", about = "TxMon - FM exciter monitor", version)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// Device address
    #[arg(long, env = "TXMON_HOST")]
    pub host: Option<String>,
    #[arg(long, env = "TXMON_PORT")]
    pub port: Option<u16>,
    /// Seconds between polls (5..10000)
    #[arg(long, env = "TXMON_POLL_SECS")]
    pub poll_secs: Option<u32>,
    #[arg(long)]
    pub read_community: Option<String>,
    #[arg(long)]
    pub write_community: Option<String>,
    #[arg(long, action = ArgAction::Set)]
    pub simulate: Option<bool>,
    #[arg(long)]
    pub chart_width: Option<u32>,
    #[arg(long)]
    pub chart_height: Option<u32>,
    #[arg(long)]
    pub refresh_ms: Option<u64>,
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub output_dir: Option<PathBuf>,
    /// clear history before the first poll
    #[arg(long, action = ArgAction::SetTrue)]
    pub reset_history: bool,
    /// write 0 to the latched alarm code, poll once and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub reset_latched_alarm: bool,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

impl Config {
    /// Every field populated with its built-in default.
    pub fn with_defaults() -> Self {
        Config {
            log_level: Some(DEFAULT_LOG_LEVEL.to_string()),
            reset_history_on_start: Some(false),
            device: Some(DeviceConfig {
                host: Some(DEFAULT_HOST.to_string()),
                port: Some(DEFAULT_SNMP_PORT),
                poll_interval_secs: Some(DEFAULT_POLL_INTERVAL_SECS),
                read_community: Some(DEFAULT_READ_COMMUNITY.to_string()),
                write_community: Some(DEFAULT_WRITE_COMMUNITY.to_string()),
                read_timeout_ms: Some(DEFAULT_READ_TIMEOUT_MS),
                write_timeout_ms: Some(DEFAULT_WRITE_TIMEOUT_MS),
                snmpget: Some(PathBuf::from(DEFAULT_SNMPGET)),
                snmpset: Some(PathBuf::from(DEFAULT_SNMPSET)),
                simulate: Some(false),
            }),
            charts: Some(ChartConfig {
                width: Some(DEFAULT_CHART_WIDTH),
                height: Some(DEFAULT_CHART_HEIGHT),
                refresh_ms: Some(DEFAULT_REFRESH_MS),
                output_dir: Some(PathBuf::from(DEFAULT_OUTPUT_DIR)),
            }),
        }
    }

    fn device(&self) -> DeviceConfig {
        self.device.clone().unwrap_or_default()
    }

    fn charts(&self) -> ChartConfig {
        self.charts.clone().unwrap_or_default()
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn reset_history_on_start(&self) -> bool {
        self.reset_history_on_start.unwrap_or(false)
    }

    pub fn simulate(&self) -> bool {
        self.device().simulate.unwrap_or(false)
    }

    pub fn poll_config(&self) -> Result<PollConfig, ConfigError> {
        let device = self.device();
        PollConfig::new(
            device.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            device.port.unwrap_or(DEFAULT_SNMP_PORT),
            device.poll_interval_secs.unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
        )
        .map_err(|e| ConfigError::Validation(e.to_string()))
    }

    pub fn agent_settings(&self) -> AgentSettings {
        let device = self.device();
        let defaults = AgentSettings::default();
        AgentSettings {
            snmpget: device
                .snmpget
                .map_or(defaults.snmpget, |p| p.to_string_lossy().into_owned()),
            snmpset: device
                .snmpset
                .map_or(defaults.snmpset, |p| p.to_string_lossy().into_owned()),
            read_community: device.read_community.unwrap_or(defaults.read_community),
            write_community: device.write_community.unwrap_or(defaults.write_community),
            read_timeout: device
                .read_timeout_ms
                .map_or(defaults.read_timeout, Duration::from_millis),
            write_timeout: device
                .write_timeout_ms
                .map_or(defaults.write_timeout, Duration::from_millis),
        }
    }

    /// Chart frame size in pixels.
    pub fn chart_size(&self) -> (u32, u32) {
        let charts = self.charts();
        (
            charts.width.unwrap_or(DEFAULT_CHART_WIDTH),
            charts.height.unwrap_or(DEFAULT_CHART_HEIGHT),
        )
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.charts().refresh_ms.unwrap_or(DEFAULT_REFRESH_MS))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.charts()
            .output_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<(Config, Cli), ConfigError> {
    let cli = Cli::parse();
    let cfg = load_from(&cli)?;
    Ok((cfg, cli))
}

/// Same layering as [`load`] for an already parsed command line.
pub fn load_from(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults
    let mut cfg = Config::with_defaults();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;
    Ok(cfg)
}

/// Pretty YAML of the effective config.
pub fn dump(cfg: &Config) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(cfg)?)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/txmon/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/txmon/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/txmon.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["txmon.yaml", "config.yaml", "config/txmon.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    // top-level
    if src.log_level.is_some()              { dst.log_level = src.log_level; }
    if src.reset_history_on_start.is_some() { dst.reset_history_on_start = src.reset_history_on_start; }
    // groups
    match (&mut dst.device, src.device) {
        (None, Some(c)) => dst.device = Some(c),
        (Some(d), Some(s)) => merge_device(d, s),
        _ => {}
    }
    match (&mut dst.charts, src.charts) {
        (None, Some(c)) => dst.charts = Some(c),
        (Some(d), Some(s)) => merge_charts(d, s),
        _ => {}
    }
}

fn merge_device(dst: &mut DeviceConfig, src: DeviceConfig) {
    if src.host.is_some()               { dst.host = src.host; }
    if src.port.is_some()               { dst.port = src.port; }
    if src.poll_interval_secs.is_some() { dst.poll_interval_secs = src.poll_interval_secs; }
    if src.read_community.is_some()     { dst.read_community = src.read_community; }
    if src.write_community.is_some()    { dst.write_community = src.write_community; }
    if src.read_timeout_ms.is_some()    { dst.read_timeout_ms = src.read_timeout_ms; }
    if src.write_timeout_ms.is_some()   { dst.write_timeout_ms = src.write_timeout_ms; }
    if src.snmpget.is_some()            { dst.snmpget = src.snmpget; }
    if src.snmpset.is_some()            { dst.snmpset = src.snmpset; }
    if src.simulate.is_some()           { dst.simulate = src.simulate; }
}

fn merge_charts(dst: &mut ChartConfig, src: ChartConfig) {
    if src.width.is_some()      { dst.width = src.width; }
    if src.height.is_some()     { dst.height = src.height; }
    if src.refresh_ms.is_some() { dst.refresh_ms = src.refresh_ms; }
    if src.output_dir.is_some() { dst.output_dir = src.output_dir; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some() { cfg.log_level = cli.log_level.clone(); }
    if cli.reset_history       { cfg.reset_history_on_start = Some(true); }

    let device = cfg.device.get_or_insert_with(DeviceConfig::default);
    if cli.host.is_some()            { device.host = cli.host.clone(); }
    if cli.port.is_some()            { device.port = cli.port; }
    if cli.poll_secs.is_some()       { device.poll_interval_secs = cli.poll_secs; }
    if cli.read_community.is_some()  { device.read_community = cli.read_community.clone(); }
    if cli.write_community.is_some() { device.write_community = cli.write_community.clone(); }
    if cli.simulate.is_some()        { device.simulate = cli.simulate; }

    let charts = cfg.charts.get_or_insert_with(ChartConfig::default);
    if cli.chart_width.is_some()  { charts.width = cli.chart_width; }
    if cli.chart_height.is_some() { charts.height = cli.chart_height; }
    if cli.refresh_ms.is_some()   { charts.refresh_ms = cli.refresh_ms; }
    if cli.output_dir.is_some()   { charts.output_dir = cli.output_dir.clone(); }
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    cfg.poll_config()?;

    let (w, h) = cfg.chart_size();
    if w == 0 || h == 0 {
        return Err(ConfigError::Validation("chart width/height must be > 0".into()));
    }
    if w < MIN_CHART_WIDTH || h < MIN_CHART_HEIGHT {
        return Err(ConfigError::Validation(format!(
            "charts must be at least {MIN_CHART_WIDTH}x{MIN_CHART_HEIGHT} to fit the axes"
        )));
    }
    if cfg.refresh_interval().is_zero() {
        return Err(ConfigError::Validation("chart refresh_ms must be > 0".into()));
    }
    let settings = cfg.agent_settings();
    if settings.read_timeout.is_zero() || settings.write_timeout.is_zero() {
        return Err(ConfigError::Validation("device timeouts must be > 0".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["txmon"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    fn yaml_file(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_validate() {
        let cfg = Config::with_defaults();
        validate(&cfg).unwrap();
        let poll = cfg.poll_config().unwrap();
        assert_eq!(poll.host, "192.168.1.140");
        assert_eq!(poll.port, 161);
        assert_eq!(poll.poll_interval_secs, 5);
        let agent = cfg.agent_settings();
        assert_eq!(agent.read_community, "public");
        assert_eq!(agent.write_community, "private");
        assert_eq!(agent.read_timeout, Duration::from_secs(15));
        assert_eq!(agent.write_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_empty_config_falls_back_to_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.log_level(), "info");
        assert_eq!(cfg.chart_size(), (DEFAULT_CHART_WIDTH, DEFAULT_CHART_HEIGHT));
        assert!(!cfg.simulate());
        assert_eq!(cfg.output_dir(), PathBuf::from(DEFAULT_OUTPUT_DIR));
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let mut cfg = Config::with_defaults();
        merge(
            &mut cfg,
            Config {
                device: Some(DeviceConfig {
                    host: Some("10.0.0.7".into()),
                    ..DeviceConfig::default()
                }),
                ..Config::default()
            },
        );
        let poll = cfg.poll_config().unwrap();
        assert_eq!(poll.host, "10.0.0.7");
        assert_eq!(poll.port, 161);
        assert_eq!(cfg.log_level(), "info");
    }

    #[test]
    fn test_yaml_then_cli_precedence() {
        let file = yaml_file(
            "log_level: debug\n\
             device:\n  host: 10.1.1.9\n  port: 1161\n  poll_interval_secs: 30\n  simulate: true\n\
             charts:\n  width: 640\n",
        );
        let path = file.path().to_string_lossy().into_owned();
        let cfg = load_from(&cli(&["--config", &path, "--port", "2161", "--chart-height", "200"])).unwrap();

        assert_eq!(cfg.log_level(), "debug");
        assert!(cfg.simulate());
        let poll = cfg.poll_config().unwrap();
        assert_eq!(poll.host, "10.1.1.9");
        assert_eq!(poll.port, 2161);
        assert_eq!(poll.poll_interval_secs, 30);
        assert_eq!(cfg.chart_size(), (640, 200));
    }

    #[test]
    fn test_missing_config_file() {
        let err = load_from(&cli(&["--config", "/nonexistent/txmon.yaml"])).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("not found")));
    }

    #[test]
    fn test_bad_yaml_is_reported() {
        let file = yaml_file("device: [not, a, map\n");
        let path = file.path().to_string_lossy().into_owned();
        let err = load_from(&cli(&["--config", &path])).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut cfg = Config::with_defaults();
        cfg.device.as_mut().unwrap().poll_interval_secs = Some(4);
        assert!(matches!(validate(&cfg), Err(ConfigError::Validation(_))));

        let mut cfg = Config::with_defaults();
        cfg.device.as_mut().unwrap().host = Some("   ".into());
        assert!(validate(&cfg).is_err());

        let mut cfg = Config::with_defaults();
        cfg.charts.as_mut().unwrap().width = Some(40);
        assert!(validate(&cfg).is_err());

        let mut cfg = Config::with_defaults();
        cfg.charts.as_mut().unwrap().refresh_ms = Some(0);
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn test_dump_round_trips() {
        let cfg = Config::with_defaults();
        let text = dump(&cfg).unwrap();
        let back: Config = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }
}
