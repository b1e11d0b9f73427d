//! Interpreter selection and process setup for generated scripts.

use std::{path::Path, process::Stdio};

use serde::{Deserialize, Serialize};
use tokio::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InterpreterType {
    #[default]
    Python,
    R,
}

impl InterpreterType {
    /// File extension for scripts written to the output directory.
    pub fn extension(&self) -> &'static str {
        match self {
            InterpreterType::Python => "py",
            InterpreterType::R => "r",
        }
    }

    /// Name used inside prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            InterpreterType::Python => "Python",
            InterpreterType::R => "R",
        }
    }

    pub fn default_program(&self) -> &'static str {
        match self {
            InterpreterType::Python => "python3",
            InterpreterType::R => "Rscript",
        }
    }
}

/// Build the command that runs `script` with `program`, with piped output and
/// the child killed if the handle is dropped.
pub fn script_command(program: &str, script: &Path, output_dir: &Path, dataset: &Path) -> Command {
    let mut cmd = Command::new(program);
    cmd.arg(script)
        .env("MPLBACKEND", "Agg") // headless matplotlib
        .env("VIZGEN_OUTPUT_DIR", output_dir)
        .env("VIZGEN_DATASET", dataset)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_and_programs() {
        assert_eq!(InterpreterType::Python.extension(), "py");
        assert_eq!(InterpreterType::R.extension(), "r");
        assert_eq!(InterpreterType::R.default_program(), "Rscript");
        assert_eq!(InterpreterType::default(), InterpreterType::Python);
    }

    #[test]
    fn command_targets_program_and_script() {
        let cmd = script_command("python3", Path::new("out/0_visualization.py"), Path::new("out"), Path::new("d.csv"));
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), "python3");
        assert_eq!(std_cmd.get_args().collect::<Vec<_>>(), vec!["out/0_visualization.py"]);
    }
}
