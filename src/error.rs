//! Error types shared across the crate's seams.

use std::path::PathBuf;

use thiserror::Error;

/// Failures of a single LLM call. None of these are retried.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("failed to send chat request: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("LLM error: {status} - {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("LLM returned no content for {0}")]
    EmptyResponse(String),

    #[error("malformed structured response for {method}: {source}")]
    Malformed {
        method: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Infrastructure failures while running generated code. A script that runs
/// and fails is not an error; it is captured output.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("failed to write script {}: {source}", path.display())]
    WriteScript {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn interpreter `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for interpreter `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("output directory {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
