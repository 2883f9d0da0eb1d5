/*
 *  agent/netsnmp.rs
 *
 *  TxMon - keeps an eye on the exciter
 *  (c) 2020-26 Stuart Hunter
 *
 *  Query agent backed by the Net-SNMP command line tools
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
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::{AgentError, QueryAgent, Target};
use crate::constants::{
    DEFAULT_READ_COMMUNITY, DEFAULT_READ_TIMEOUT_MS, DEFAULT_SNMPGET, DEFAULT_SNMPSET,
    DEFAULT_WRITE_COMMUNITY, DEFAULT_WRITE_TIMEOUT_MS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    pub snmpget: String,
    pub snmpset: String,
    pub read_community: String,
    pub write_community: String,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl Default for AgentSettings {
    fn default() -> Self {
        AgentSettings {
            snmpget: DEFAULT_SNMPGET.to_string(),
            snmpset: DEFAULT_SNMPSET.to_string(),
            read_community: DEFAULT_READ_COMMUNITY.to_string(),
            write_community: DEFAULT_WRITE_COMMUNITY.to_string(),
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            write_timeout: Duration::from_millis(DEFAULT_WRITE_TIMEOUT_MS),
        }
    }
}

/// Runs `snmpget`/`snmpset` (SNMP v2c, no MIB loading) per request.
#[derive(Debug, Clone, Default)]
pub struct NetSnmpAgent {
    settings: AgentSettings,
}

impl NetSnmpAgent {
    pub fn new(settings: AgentSettings) -> Self {
        NetSnmpAgent { settings }
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// `-Oqv -Ot`: bare values, one per line, timeticks as raw integers.
    pub fn get_args(&self, target: &Target, ids: &[&str]) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-m".into(),
            "".into(),
            "-v2c".into(),
            "-c".into(),
            self.settings.read_community.clone(),
            "-Oqv".into(),
            "-Ot".into(),
            target.to_string(),
        ];
        args.extend(ids.iter().map(|id| id.to_string()));
        args
    }

    pub fn set_args(&self, target: &Target, id: &str, value: i64) -> Vec<String> {
        vec![
            "-m".into(),
            "".into(),
            "-v2c".into(),
            "-c".into(),
            self.settings.write_community.clone(),
            target.to_string(),
            id.to_string(),
            "i".into(),
            value.to_string(),
        ]
    }
}

/// Splits `-Oqv` output into one value per id.
///
/// A lone id owns the whole of stdout, so a quoted string spanning several
/// lines stays one value. Otherwise every non-blank line is one value and
/// the count must match exactly.
pub fn parse_get_output(stdout: &str, expected: usize) -> Result<Vec<String>, AgentError> {
    if expected == 1 {
        let value = stdout.trim();
        if value.is_empty() {
            return Err(AgentError::ShortReply { expected, got: 0 });
        }
        return Ok(vec![value.to_string()]);
    }

    let values: Vec<String> = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    match values.len() {
        got if got < expected => Err(AgentError::ShortReply { expected, got }),
        got if got > expected => Err(AgentError::ExtraLines { expected, got }),
        _ => Ok(values),
    }
}

async fn run(program: &str, args: &[String], timeout: Duration) -> Result<String, AgentError> {
    debug!("{program} {}", args.join(" "));

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| AgentError::Timeout {
            program: program.to_string(),
            after: timeout,
        })?
        .map_err(|source| AgentError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(AgentError::Failed(if stderr.is_empty() {
            format!("{program} exited with {}", output.status)
        } else {
            stderr
        }));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

impl QueryAgent for NetSnmpAgent {
    async fn batch_read(&self, target: &Target, ids: &[&str]) -> Result<Vec<String>, AgentError> {
        let args = self.get_args(target, ids);
        let stdout = run(&self.settings.snmpget, &args, self.settings.read_timeout).await?;
        parse_get_output(&stdout, ids.len())
    }

    async fn write(&self, target: &Target, id: &str, value: i64) -> Result<String, AgentError> {
        let args = self.set_args(target, id, value);
        let stdout = run(&self.settings.snmpset, &args, self.settings.write_timeout).await?;
        Ok(stdout.trim().to_string())
    }
}
