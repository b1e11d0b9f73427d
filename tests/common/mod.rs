#![allow(dead_code)]

use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use vizgen::{
    config::{Config, DatasetHandle, RunConfig},
    error::{ExecutionError, LlmError},
    execution::{CodeExecutor, ExecutionResult},
    visualization::{VisualizationGoal, VisualizationUnit},
    workflow::{CodeRegenerator, RegenerationOracle},
};

pub fn run_config(output: &Path, dataset: &Path, max: usize) -> RunConfig {
    let cfg = Config::from_pairs([("AGENT_LANGUAGE", "en")]);
    let mut run = RunConfig::from_config(&cfg, DatasetHandle::new(dataset));
    run.output_dir = output.to_path_buf();
    run.statistics_dir = output.join("statistics");
    run.max_regeneration_attempts = max;
    run.execution_timeout = Duration::from_secs(10);
    run
}

pub fn goal(index: usize) -> VisualizationGoal {
    VisualizationGoal {
        index,
        question: format!("What does column {index} look like?"),
        visualization: "histogram".into(),
        rationale: format!("column_{index} is numeric"),
    }
}

pub fn units(codes: &[&str]) -> Vec<VisualizationUnit> {
    codes
        .iter()
        .enumerate()
        .map(|(i, code)| VisualizationUnit::new(Arc::new(goal(i)), *code))
        .collect()
}

/// Flags output as broken when stderr mentions any of the given markers.
pub struct KeywordOracle {
    markers: Vec<&'static str>,
    pub calls: AtomicUsize,
}

impl KeywordOracle {
    pub fn new(markers: &[&'static str]) -> Self {
        Self { markers: markers.to_vec(), calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegenerationOracle for KeywordOracle {
    async fn should_regenerate(&self, _stdout: &str, stderr: &str) -> Result<bool, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.markers.iter().any(|m| stderr.contains(m)))
    }
}

/// Hands out replacement code in order; repeats the last one when exhausted.
pub struct ScriptedRegenerator {
    replies: Mutex<VecDeque<String>>,
    last: Mutex<String>,
    pub seen: Mutex<Vec<(usize, String)>>,
}

impl ScriptedRegenerator {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
            last: Mutex::new(String::from("print('regenerated')")),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl CodeRegenerator for ScriptedRegenerator {
    async fn regenerate(
        &self,
        goal: &VisualizationGoal,
        _code: &str,
        _stdout: &str,
        stderr: &str,
    ) -> Result<String, LlmError> {
        self.seen.lock().unwrap().push((goal.index, stderr.to_string()));
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.replies.lock().unwrap().pop_front() {
            *last = next;
        }
        Ok(last.clone())
    }
}

/// In-process executor: code containing "fail" writes to stderr, anything
/// else writes `<index>_plot.png` into the output directory.
pub struct FakeExecutor {
    pub output_dir: PathBuf,
    pub runs: AtomicUsize,
}

impl FakeExecutor {
    pub fn new(output_dir: &Path) -> Self {
        Self { output_dir: output_dir.to_path_buf(), runs: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl CodeExecutor for FakeExecutor {
    async fn execute(&self, goal_index: usize, code: &str) -> Result<ExecutionResult, ExecutionError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if code.contains("fail") {
            return Ok(ExecutionResult {
                stderr: format!("Error in visualization {goal_index}: {code}"),
                exit_code: Some(1),
                ..Default::default()
            });
        }
        std::fs::write(self.output_dir.join(format!("{goal_index}_plot.png")), b"png")
            .map_err(|source| ExecutionError::WriteScript { path: self.output_dir.clone(), source })?;
        Ok(ExecutionResult { exit_code: Some(0), ..Default::default() })
    }
}
