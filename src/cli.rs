use std::path::PathBuf;

use clap::Parser;

use vizgen::{language::Language, process::InterpreterType};

#[derive(Parser, Debug, Clone)]
#[command(name = "vizgen", about = "Generate, test and evaluate visualization code for a dataset", version)]
pub struct Cli {
    /// Tabular dataset (CSV) to visualize.
    #[arg(value_name = "DATASET")]
    pub dataset: PathBuf,

    /// Column separator of the dataset.
    #[arg(long, default_value_t = ';')]
    pub delimiter: char,

    /// Text encoding of the dataset, passed on to the generated code.
    #[arg(long, default_value = "utf-8")]
    pub encoding: String,

    /// JSON file with visualization goals; skips goal generation.
    #[arg(long, value_name = "FILE")]
    pub goals: Option<PathBuf>,

    /// Number of goals to generate when no goals file is given.
    #[arg(long = "goal-count", default_value_t = 5)]
    pub goal_count: usize,

    /// Language of the generated scripts.
    #[arg(long = "programming-language", value_enum, default_value_t = InterpreterType::Python)]
    pub programming_language: InterpreterType,

    /// Prompt and schema locale (overrides AGENT_LANGUAGE).
    #[arg(long, value_enum)]
    pub language: Option<Language>,

    /// Output directory for scripts and images (overrides OUTPUT_PATH).
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Directory for the statistics report (overrides STATISTICS_PATH).
    #[arg(long = "statistics-dir", value_name = "DIR")]
    pub statistics_dir: Option<PathBuf>,

    /// Regeneration attempt ceiling per loop pass (overrides MAX_REGENERATION_ATTEMPTS).
    #[arg(long = "max-attempts")]
    pub max_attempts: Option<usize>,

    /// Seconds before a generated script is killed (overrides EXECUTION_TIMEOUT).
    #[arg(long = "execution-timeout")]
    pub execution_timeout: Option<u64>,

    /// Judge the code after the first evaluation and refactor where needed.
    #[arg(long)]
    pub refactor: bool,

    /// Print the run summary as Markdown.
    #[arg(long)]
    pub md: bool,

    /// More log output (-v info, -vv debug).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}
