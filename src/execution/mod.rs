//! Running generated scripts in a child interpreter and capturing their output.

use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{
    config::RunConfig,
    error::ExecutionError,
    output,
    process::{script_command, InterpreterType},
};

#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    /// Logged only; the regeneration decision looks at the text.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub script_path: PathBuf,
    pub duration: Duration,
}

impl ExecutionResult {
    /// A run that did not finish in time. The child has been killed.
    pub fn timed_out(script_path: PathBuf, limit: Duration) -> Self {
        Self {
            stdout: String::new(),
            stderr: format!("Execution timed out after {} seconds.", limit.as_secs()),
            exit_code: None,
            timed_out: true,
            script_path,
            duration: limit,
        }
    }
}

/// Runs one unit's code. A script that crashes is a normal result, not an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodeExecutor: Send + Sync {
    async fn execute(&self, goal_index: usize, code: &str) -> Result<ExecutionResult, ExecutionError>;
}

#[derive(Debug, Clone)]
pub struct SubprocessExecutor {
    program: String,
    language: InterpreterType,
    output_dir: PathBuf,
    dataset: PathBuf,
    timeout: Duration,
}

impl SubprocessExecutor {
    pub fn new(
        program: impl Into<String>,
        language: InterpreterType,
        output_dir: impl Into<PathBuf>,
        dataset: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            language,
            output_dir: output_dir.into(),
            dataset: dataset.into(),
            timeout,
        }
    }

    pub fn from_run_config(run: &RunConfig) -> Self {
        Self::new(
            run.interpreter_program(),
            run.programming_language,
            run.output_dir.clone(),
            run.dataset.path.clone(),
            run.execution_timeout,
        )
    }

    async fn write_script(&self, path: &Path, code: &str) -> Result<(), ExecutionError> {
        let write = async {
            tokio::fs::create_dir_all(&self.output_dir).await?;
            tokio::fs::write(path, code).await
        };
        write
            .await
            .map_err(|source| ExecutionError::WriteScript { path: path.to_path_buf(), source })
    }
}

#[async_trait]
impl CodeExecutor for SubprocessExecutor {
    async fn execute(&self, goal_index: usize, code: &str) -> Result<ExecutionResult, ExecutionError> {
        let script = output::script_path(&self.output_dir, goal_index, self.language);
        self.write_script(&script, code).await?;

        let started = Instant::now();
        let child = script_command(&self.program, &script, &self.output_dir, &self.dataset)
            .spawn()
            .map_err(|source| ExecutionError::Spawn { program: self.program.clone(), source })?;

        // Dropping the future on timeout drops the child, which kills it.
        let out = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(res) => res.map_err(|source| ExecutionError::Wait { program: self.program.clone(), source })?,
            Err(_) => {
                warn!(goal_index, timeout_secs = self.timeout.as_secs(), "script timed out");
                return Ok(ExecutionResult::timed_out(script, self.timeout));
            }
        };

        let result = ExecutionResult {
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            exit_code: out.status.code(),
            timed_out: false,
            script_path: script,
            duration: started.elapsed(),
        };
        info!(goal_index, exit_code = ?result.exit_code, elapsed_ms = result.duration.as_millis() as u64, "script finished");
        debug!(goal_index, stdout = %result.stdout, stderr = %result.stderr, "captured output");
        Ok(result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn executor(dir: &Path, secs: u64) -> SubprocessExecutor {
        SubprocessExecutor::new("sh", InterpreterType::Python, dir, dir.join("data.csv"), Duration::from_secs(secs))
    }

    #[tokio::test]
    async fn captures_both_streams_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let res = executor(dir.path(), 10)
            .execute(2, "echo plotted\necho 'Traceback: boom' >&2\nexit 3\n")
            .await
            .unwrap();
        assert_eq!(res.stdout.trim(), "plotted");
        assert_eq!(res.stderr.trim(), "Traceback: boom");
        assert_eq!(res.exit_code, Some(3));
        assert!(!res.timed_out);
        assert!(dir.path().join("2_visualization.py").exists());
    }

    #[tokio::test]
    async fn environment_points_at_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let res = executor(dir.path(), 10)
            .execute(0, "printf '%s' \"$MPLBACKEND\"")
            .await
            .unwrap();
        assert_eq!(res.stdout, "Agg");
    }

    #[tokio::test]
    async fn slow_script_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let res = executor(dir.path(), 1).execute(0, "sleep 5\n").await.unwrap();
        assert!(res.timed_out);
        assert_eq!(res.stderr, "Execution timed out after 1 seconds.");
        assert!(res.stdout.is_empty());
    }

    #[tokio::test]
    async fn missing_interpreter_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let exec = SubprocessExecutor::new(
            "definitely-not-an-interpreter",
            InterpreterType::R,
            dir.path(),
            "d.csv",
            Duration::from_secs(1),
        );
        let err = exec.execute(0, "x").await.unwrap_err();
        assert!(matches!(err, ExecutionError::Spawn { .. }));
    }
}
