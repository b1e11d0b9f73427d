//! Immutable per-run settings handed to the loop controller and the pipeline.

use std::{path::PathBuf, time::Duration};

use crate::{language::Language, process::InterpreterType};

use super::Config;

/// Where and how to read the working dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetHandle {
    pub path: PathBuf,
    pub delimiter: char,
    pub encoding: String,
}

impl DatasetHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), delimiter: ';', encoding: "utf-8".into() }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub dataset: DatasetHandle,
    pub programming_language: InterpreterType,
    pub language: Language,
    pub output_dir: PathBuf,
    pub statistics_dir: PathBuf,
    pub max_regeneration_attempts: usize,
    pub execution_timeout: Duration,
    pub python_interpreter: String,
    pub r_interpreter: String,
    pub refactor: bool,
}

impl RunConfig {
    /// Resolve once at start-up; CLI overrides are applied by the caller afterwards.
    pub fn from_config(cfg: &Config, dataset: DatasetHandle) -> Self {
        Self {
            dataset,
            programming_language: InterpreterType::Python,
            language: cfg
                .get("AGENT_LANGUAGE")
                .map(|v| Language::from_setting(&v))
                .unwrap_or_default(),
            output_dir: cfg.get_path("OUTPUT_PATH").unwrap_or_else(|| PathBuf::from("output")),
            statistics_dir: cfg
                .get_path("STATISTICS_PATH")
                .unwrap_or_else(|| PathBuf::from("statistics")),
            max_regeneration_attempts: cfg.get_usize("MAX_REGENERATION_ATTEMPTS").unwrap_or(3),
            execution_timeout: Duration::from_secs(cfg.get_u64("EXECUTION_TIMEOUT").unwrap_or(300)),
            python_interpreter: cfg
                .get("PYTHON_INTERPRETER")
                .unwrap_or_else(|| InterpreterType::Python.default_program().into()),
            r_interpreter: cfg
                .get("R_INTERPRETER")
                .unwrap_or_else(|| InterpreterType::R.default_program().into()),
            refactor: false,
        }
    }

    /// Interpreter binary for the configured programming language.
    pub fn interpreter_program(&self) -> &str {
        match self.programming_language {
            InterpreterType::Python => &self.python_interpreter,
            InterpreterType::R => &self.r_interpreter,
        }
    }
}
