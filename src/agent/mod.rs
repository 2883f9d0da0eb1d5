/*
 *  agent/mod.rs
 *
 *  TxMon - keeps an eye on the exciter
 *  (c) 2020-26 Stuart Hunter
 *
 *  Query agent capability and chunked batch reads
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

pub mod netsnmp;
pub mod simulated;

use std::fmt;
use std::future::Future;
use std::time::Duration;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use netsnmp::{AgentSettings, NetSnmpAgent};
pub use simulated::SimulatedAgent;

/// Transport failures talking to the device.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The agent program could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// No reply inside the allotted time.
    #[error("{program} timed out after {after:?}")]
    Timeout { program: String, after: Duration },

    /// The agent ran but reported failure.
    #[error("{0}")]
    Failed(String),

    /// Fewer values came back than were asked for.
    #[error("Expected {expected} values, got {got}")]
    ShortReply { expected: usize, got: usize },

    /// More output lines than ids; positions can no longer be trusted.
    #[error("Expected {expected} values, got {got} lines")]
    ExtraLines { expected: usize, got: usize },

    #[error("batch size must be at least 1")]
    InvalidBatchSize,
}

/// Where the device agent lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Request/response access to the device registers.
pub trait QueryAgent: Send + Sync + 'static {
    /// One value per id, in id order. Implementations may return extra
    /// trailing values; returning fewer is a protocol error.
    fn batch_read(
        &self,
        target: &Target,
        ids: &[&str],
    ) -> impl Future<Output = Result<Vec<String>, AgentError>> + Send;

    /// Sets an integer register, returning the agent's acknowledgement text.
    fn write(
        &self,
        target: &Target,
        id: &str,
        value: i64,
    ) -> impl Future<Output = Result<String, AgentError>> + Send;
}

/// Reads `ids` in consecutive chunks of at most `max_per_request`, strictly
/// in order, and returns exactly one value per id. Any failing chunk fails
/// the whole read; partial results are dropped.
pub async fn read_chunked<A: QueryAgent>(
    agent: &A,
    target: &Target,
    ids: &[&str],
    max_per_request: usize,
) -> Result<Vec<String>, AgentError> {
    if max_per_request == 0 {
        return Err(AgentError::InvalidBatchSize);
    }

    let mut values = Vec::with_capacity(ids.len());
    for (n, chunk) in ids.chunks(max_per_request).enumerate() {
        debug!("{target}: chunk {n} ({} ids)", chunk.len());
        let mut reply = agent.batch_read(target, chunk).await?;
        if reply.len() < chunk.len() {
            return Err(AgentError::ShortReply {
                expected: chunk.len(),
                got: reply.len(),
            });
        }
        reply.truncate(chunk.len());
        values.extend(reply);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Mutex;

    /// Echoes each id back and records the chunks it saw.
    #[derive(Default)]
    struct EchoAgent {
        chunks: Mutex<Vec<Vec<String>>>,
        extra: usize,
        short_on_chunk: Option<usize>,
    }

    impl QueryAgent for EchoAgent {
        async fn batch_read(&self, _target: &Target, ids: &[&str]) -> Result<Vec<String>, AgentError> {
            let mut chunks = self.chunks.lock().unwrap();
            let n = chunks.len();
            chunks.push(ids.iter().map(|s| s.to_string()).collect());
            let mut reply: Vec<String> = ids.iter().map(|id| format!("v:{id}")).collect();
            if self.short_on_chunk == Some(n) {
                reply.pop();
            }
            reply.extend((0..self.extra).map(|i| format!("extra{i}")));
            Ok(reply)
        }

        async fn write(&self, _target: &Target, _id: &str, _value: i64) -> Result<String, AgentError> {
            Ok(String::new())
        }
    }

    fn target() -> Target {
        Target { host: "127.0.0.1".into(), port: 161 }
    }

    fn block_on<F: Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(f)
    }

    #[test]
    fn test_chunks_are_bounded_and_ordered() {
        let agent = EchoAgent::default();
        let ids: Vec<String> = (0..12).map(|i| format!("id{i}")).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let values = block_on(read_chunked(&agent, &target(), &refs, 5)).unwrap();

        let sizes: Vec<usize> = agent.chunks.lock().unwrap().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![5, 5, 2]);
        assert_eq!(values[0], "v:id0");
        assert_eq!(values[11], "v:id11");
    }

    #[test]
    fn test_extra_values_are_truncated() {
        let agent = EchoAgent { extra: 3, ..Default::default() };
        let values = block_on(read_chunked(&agent, &target(), &["a", "b", "c"], 2)).unwrap();
        assert_eq!(values, vec!["v:a", "v:b", "v:c"]);
    }

    #[test]
    fn test_short_chunk_fails_everything() {
        let agent = EchoAgent { short_on_chunk: Some(1), ..Default::default() };
        let err = block_on(read_chunked(&agent, &target(), &["a", "b", "c", "d"], 2)).unwrap_err();
        assert!(matches!(err, AgentError::ShortReply { expected: 2, got: 1 }));
        assert_eq!(err.to_string(), "Expected 2 values, got 1");
    }

    #[test]
    fn test_empty_list_makes_no_requests() {
        let agent = EchoAgent::default();
        let values = block_on(read_chunked(&agent, &target(), &[], 5)).unwrap();
        assert!(values.is_empty());
        assert!(agent.chunks.lock().unwrap().is_empty());
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let agent = EchoAgent::default();
        let err = block_on(read_chunked(&agent, &target(), &["a"], 0)).unwrap_err();
        assert!(matches!(err, AgentError::InvalidBatchSize));
    }

    proptest! {
        #[test]
        fn prop_output_matches_input_order(count in 0usize..60, max in 1usize..12) {
            let agent = EchoAgent::default();
            let ids: Vec<String> = (0..count).map(|i| format!("1.3.6.{i}")).collect();
            let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
            let values = block_on(read_chunked(&agent, &target(), &refs, max)).unwrap();

            prop_assert_eq!(values.len(), ids.len());
            for (id, value) in ids.iter().zip(&values) {
                prop_assert_eq!(value, &format!("v:{id}"));
            }
            prop_assert!(agent.chunks.lock().unwrap().iter().all(|c| c.len() <= max));
        }
    }
}
