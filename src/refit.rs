// Copyright 2026 The vocadrill developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Parameter refitting: hand review history to an external optimizer
//! process and store the weights it returns.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use vocadrill_core::ErrorReport;
use vocadrill_core::Fallible;
use vocadrill_core::ParameterVector;
use vocadrill_core::ReviewLog;
use vocadrill_core::Weights;
use vocadrill_core::fail;

use crate::store::Store;

/// History window for a refit triggered by a single finished session.
pub const ON_DEMAND_LOG_LIMIT: usize = 10_000;
/// History window for an explicit all-users sweep.
pub const SWEEP_LOG_LIMIT: usize = 100_000;

/// Turns a review history into a fitted weight vector. The computation
/// itself lives outside this crate.
#[async_trait]
pub trait ParameterFitter {
    async fn fit(&self, logs: &[ReviewLog]) -> Fallible<Weights>;
}

/// Runs an optimizer as a child process: review logs go in as one JSON
/// array on stdin, fitted weights come back as a JSON array of floats
/// on the first line of stdout.
pub struct SubprocessFitter {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl SubprocessFitter {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        SubprocessFitter {
            command: command.into(),
            args,
            timeout,
        }
    }
}

#[async_trait]
impl ParameterFitter for SubprocessFitter {
    async fn fit(&self, logs: &[ReviewLog]) -> Fallible<Weights> {
        let payload = serde_json::to_string(logs)?;
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ErrorReport::new(format!("failed to spawn fitter `{}`: {e}", self.command))
            })?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(payload.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            // Closes the pipe so the child sees EOF.
            drop(stdin);
        }
        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => return fail(format!("fitter `{}` timed out", self.command)),
        };
        if !output.status.success() {
            return fail(format!(
                "fitter `{}` exited with {}",
                self.command, output.status
            ));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = match stdout.lines().next() {
            Some(line) => line,
            None => return fail(format!("fitter `{}` produced no output", self.command)),
        };
        let raw: Vec<f64> = serde_json::from_str(line)?;
        Weights::from_slice(&raw)
    }
}

/// Refits one user's weights from their recent history. Returns whether
/// a new vector was stored: an empty history is a successful no-op, and
/// the desired retention is carried over unchanged.
pub async fn refit_user<S: Store>(
    store: &mut S,
    fitter: &dyn ParameterFitter,
    user: &str,
    defaults: ParameterVector,
    limit: usize,
) -> Fallible<bool> {
    let logs = store.recent_review_logs(user, limit)?;
    if logs.is_empty() {
        log::info!("no review history for {user}, skipping refit");
        return Ok(false);
    }
    let weights = fitter.fit(&logs).await?;
    let current = store.load_parameter_vector(user)?.unwrap_or(defaults);
    store.save_parameter_vector(user, &current.with_weights(weights))?;
    log::info!("refit {user} from {} reviews", logs.len());
    Ok(true)
}

/// Refits every known user. A failure for one user is logged and does
/// not stop the sweep.
pub async fn refit_sweep<S: Store>(
    store: &mut S,
    fitter: &dyn ParameterFitter,
    defaults: ParameterVector,
) -> Fallible<usize> {
    let mut refitted = 0;
    for user in store.list_users()? {
        match refit_user(store, fitter, &user, defaults, SWEEP_LOG_LIMIT).await {
            Ok(true) => refitted += 1,
            Ok(false) => {}
            Err(e) => log::warn!("refit failed for {user}: {e}"),
        }
    }
    Ok(refitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vocadrill_core::CardId;
    use vocadrill_core::Rating;
    use vocadrill_core::Timestamp;

    use crate::store::SqliteStore;

    fn sh(script: &str) -> SubprocessFitter {
        SubprocessFitter::new(
            "sh",
            vec!["-c".to_string(), script.to_string()],
            Duration::from_secs(5),
        )
    }

    fn sample_logs(n: i64) -> Vec<ReviewLog> {
        let t0 = Timestamp::try_from("2024-01-01T12:00:00.000Z".to_string()).unwrap();
        (0..n)
            .map(|i| ReviewLog {
                card_id: CardId(i),
                rating: Rating::Good,
                review_date_time: t0.add_minutes(i),
                review_duration_ms: Some(900),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_subprocess_fitter_parses_weights() {
        let fitter = sh(
            "cat > /dev/null; echo '[0.5, 1.0, 3.0, 16.0, 7.0, 0.5, 2.0, 0.01, 1.5, 0.1, \
             1.0, 1.8, 0.1, 0.3, 2.3, 0.2, 3.0, 0.7, 0.3, 0.1, 0.2]'",
        );
        let weights = fitter.fit(&sample_logs(3)).await.unwrap();
        assert_eq!(weights.initial_stability_again, 0.5);
        assert_eq!(weights.decay, 0.2);
    }

    #[tokio::test]
    async fn test_subprocess_fitter_sees_logs_on_stdin() {
        // The child echoes the input length; 21 copies of it make a
        // parseable vector, so a zero length would fail validation.
        let fitter = sh(
            "n=$(wc -c); printf '['; i=0; while [ $i -lt 20 ]; do printf '1,'; i=$((i+1)); done; \
             printf '%s]' \"$n\"",
        );
        let weights = fitter.fit(&sample_logs(2)).await.unwrap();
        assert!(weights.decay > 0.0);
    }

    #[tokio::test]
    async fn test_subprocess_fitter_nonzero_exit_is_error() {
        let fitter = sh("cat > /dev/null; exit 3");
        assert!(fitter.fit(&sample_logs(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_subprocess_fitter_malformed_output_is_error() {
        let fitter = sh("cat > /dev/null; echo 'not json'");
        assert!(fitter.fit(&sample_logs(1)).await.is_err());

        let short = sh("cat > /dev/null; echo '[1.0, 2.0]'");
        assert!(short.fit(&sample_logs(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_subprocess_fitter_timeout() {
        let fitter = SubprocessFitter::new(
            "sh",
            vec!["-c".to_string(), "cat > /dev/null; sleep 30".to_string()],
            Duration::from_millis(200),
        );
        assert!(fitter.fit(&sample_logs(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_refit_user_empty_history_is_noop() {
        let mut store = SqliteStore::in_memory().unwrap();
        let fitter = sh("cat > /dev/null; echo '[]'");
        let refitted = refit_user(
            &mut store,
            &fitter,
            "alice",
            ParameterVector::default(),
            ON_DEMAND_LOG_LIMIT,
        )
        .await
        .unwrap();
        assert!(!refitted);
        assert_eq!(store.load_parameter_vector("alice").unwrap(), None);
    }

    #[tokio::test]
    async fn test_refit_user_preserves_desired_retention() {
        let mut store = SqliteStore::in_memory().unwrap();
        let custom = ParameterVector::new(Weights::default(), 0.85).unwrap();
        store.save_parameter_vector("alice", &custom).unwrap();
        store
            .append_review_logs_batch("alice", &sample_logs(4))
            .unwrap();

        let fitter = sh(
            "cat > /dev/null; echo '[0.5, 1.0, 3.0, 16.0, 7.0, 0.5, 2.0, 0.01, 1.5, 0.1, \
             1.0, 1.8, 0.1, 0.3, 2.3, 0.2, 3.0, 0.7, 0.3, 0.1, 0.2]'",
        );
        let refitted = refit_user(
            &mut store,
            &fitter,
            "alice",
            ParameterVector::default(),
            ON_DEMAND_LOG_LIMIT,
        )
        .await
        .unwrap();
        assert!(refitted);
        let stored = store.load_parameter_vector("alice").unwrap().unwrap();
        assert_eq!(stored.desired_retention, 0.85);
        assert_eq!(stored.weights.initial_stability_again, 0.5);
    }

    #[tokio::test]
    async fn test_refit_sweep_survives_per_user_failure() {
        let mut store = SqliteStore::in_memory().unwrap();
        let now = Timestamp::try_from("2024-01-01T12:00:00.000Z".to_string()).unwrap();
        // alice has history; bob has a card but no reviews.
        store
            .insert_card("alice", "d", "f", &["a".to_string()], now)
            .unwrap();
        store
            .insert_card("bob", "d", "f", &["a".to_string()], now)
            .unwrap();
        store
            .append_review_logs_batch("alice", &sample_logs(2))
            .unwrap();

        let fitter = sh(
            "cat > /dev/null; echo '[0.5, 1.0, 3.0, 16.0, 7.0, 0.5, 2.0, 0.01, 1.5, 0.1, \
             1.0, 1.8, 0.1, 0.3, 2.3, 0.2, 3.0, 0.7, 0.3, 0.1, 0.2]'",
        );
        let refitted = refit_sweep(&mut store, &fitter, ParameterVector::default())
            .await
            .unwrap();
        assert_eq!(refitted, 1);
        assert!(store.load_parameter_vector("alice").unwrap().is_some());
        assert!(store.load_parameter_vector("bob").unwrap().is_none());
    }
}
