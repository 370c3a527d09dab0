use std::{io, process::Stdio, time::Duration};

use serde_json::Value;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Command,
};

use crate::config::ForecastConfig;

/// Longest diagnostic handed back to HTTP clients.
pub const MAX_DETAIL_CHARS: usize = 200;

/// Captured output kept for logs.
const MAX_LOGGED_BYTES: usize = 4096;

#[derive(thiserror::Error, Debug)]
pub enum ForecastError {
    #[error("failed to run forecaster `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("forecaster exited with code {code:?}")]
    Exit { code: Option<i32>, stderr: String },
    #[error("forecaster did not finish within {0:?}")]
    Timeout(Duration),
    #[error("forecaster produced invalid JSON: {0}")]
    InvalidOutput(#[source] serde_json::Error),
}

impl ForecastError {
    /// Short diagnostic safe to show to a caller. Raw stdout is never included.
    pub fn client_details(&self) -> Option<String> {
        match self {
            Self::Spawn { source, .. } => Some(truncate_chars(&source.to_string(), MAX_DETAIL_CHARS).to_string()),
            Self::Exit { stderr, .. } => {
                let trimmed = stderr.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(truncate_chars(trimmed, MAX_DETAIL_CHARS).to_string())
                }
            }
            Self::Timeout(limit) => Some(format!("timed out after {}s", limit.as_secs_f64())),
            Self::InvalidOutput(_) => None,
        }
    }
}

/// Cut `s` to at most `max` characters, on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn lossy_capped(bytes: &[u8]) -> String {
    let end = bytes.len().min(MAX_LOGGED_BYTES);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

async fn read_all<R: AsyncRead + Unpin>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(buf)
}

/// Keep the first `cap` bytes and discard the rest, so the child never
/// blocks on a full pipe.
async fn read_capped<R: AsyncRead + Unpin>(mut reader: R, cap: usize) -> io::Result<Vec<u8>> {
    let mut kept = Vec::with_capacity(cap.min(1024));
    (&mut reader).take(cap as u64).read_to_end(&mut kept).await?;
    tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    Ok(kept)
}

/// Produces per-metric predictions as an opaque JSON value.
#[async_trait::async_trait]
pub trait Forecaster: Send + Sync {
    async fn forecast(&self) -> Result<Value, ForecastError>;
}

/// Runs an external program once per call and reads one JSON value from
/// its stdout.
#[derive(Debug, Clone)]
pub struct ProcessForecaster {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ProcessForecaster {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(cfg: &ForecastConfig) -> Self {
        Self::new(
            cfg.program.clone(),
            vec![cfg.script.to_string_lossy().into_owned()],
            cfg.timeout(),
        )
    }
}

#[async_trait::async_trait]
impl Forecaster for ProcessForecaster {
    async fn forecast(&self) -> Result<Value, ForecastError> {
        let spawn_err = |source| ForecastError::Spawn {
            program: self.program.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_err)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_err(io::Error::other("stdout was not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| spawn_err(io::Error::other("stderr was not captured")))?;

        let run = async {
            let (stdout, stderr, status) =
                tokio::join!(read_all(stdout), read_capped(stderr, MAX_LOGGED_BYTES), child.wait());
            Ok::<_, io::Error>((status?, stdout?, stderr?))
        };

        // Dropping the pending future on timeout drops the child, which kills it.
        let (status, stdout, stderr) = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| ForecastError::Timeout(limit))?,
            None => run.await,
        }
        .map_err(spawn_err)?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr).into_owned();
            tracing::warn!(
                program = %self.program,
                code = ?status.code(),
                stderr = %stderr,
                "forecaster exited unsuccessfully"
            );
            return Err(ForecastError::Exit {
                code: status.code(),
                stderr,
            });
        }

        serde_json::from_slice::<Value>(&stdout).map_err(|e| {
            tracing::error!(
                program = %self.program,
                error = %e,
                stdout = %lossy_capped(&stdout),
                "forecaster output is not valid JSON"
            );
            ForecastError::InvalidOutput(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sh(script: &str, timeout: Option<Duration>) -> ProcessForecaster {
        ProcessForecaster::new("sh", vec!["-c".to_string(), script.to_string()], timeout)
    }

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[tokio::test]
    async fn successful_run_returns_parsed_stdout() {
        let f = sh(r#"printf '{"watt":[1,2]}\n'"#, Some(Duration::from_secs(10)));
        let value = f.forecast().await.unwrap();
        assert_eq!(value, json!({"watt": [1, 2]}));
    }

    #[tokio::test]
    async fn nonzero_exit_reports_stderr() {
        let f = sh("echo 'model file missing' >&2; exit 1", Some(Duration::from_secs(10)));
        let err = f.forecast().await.unwrap_err();

        match &err {
            ForecastError::Exit { code, .. } => assert_eq!(*code, Some(1)),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.client_details().as_deref(), Some("model file missing"));
    }

    #[tokio::test]
    async fn long_stderr_is_truncated_for_clients() {
        let f = sh("printf '%0500d' 0 >&2; exit 2", None);
        let err = f.forecast().await.unwrap_err();
        let details = err.client_details().unwrap();
        assert_eq!(details.chars().count(), MAX_DETAIL_CHARS);
    }

    #[tokio::test]
    async fn stderr_kept_for_logs_is_bounded() {
        let f = sh("head -c 100000 /dev/zero | tr '\\0' x >&2; exit 3", Some(Duration::from_secs(10)));
        let err = f.forecast().await.unwrap_err();

        match err {
            ForecastError::Exit { code, stderr } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr.len(), MAX_LOGGED_BYTES);
                assert!(stderr.chars().all(|c| c == 'x'));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_stdout_is_an_output_error() {
        let f = sh("echo not-json", None);
        let err = f.forecast().await.unwrap_err();
        assert!(matches!(err, ForecastError::InvalidOutput(_)));
        assert!(err.client_details().is_none());
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let f = ProcessForecaster::new("sensor-hub-no-such-forecaster", vec![], None);
        let err = f.forecast().await.unwrap_err();
        assert!(matches!(err, ForecastError::Spawn { .. }));
        assert!(err.client_details().is_some());
    }

    #[tokio::test]
    async fn hung_process_times_out() {
        let f = sh("sleep 5", Some(Duration::from_millis(100)));
        let err = f.forecast().await.unwrap_err();
        assert!(matches!(err, ForecastError::Timeout(_)));
        assert_eq!(err.client_details().as_deref(), Some("timed out after 0.1s"));
    }
}
