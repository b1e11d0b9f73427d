//! Generate visualization code for a dataset with an LLM, run it, regenerate
//! what fails under an attempt budget, and score the result.

pub mod cache;
pub mod config;
pub mod error;
pub mod execution;
pub mod handlers;
pub mod language;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod printer;
pub mod process;
pub mod prompt;
pub mod responses;
pub mod stats;
pub mod utils;
pub mod visualization;
pub mod workflow;
