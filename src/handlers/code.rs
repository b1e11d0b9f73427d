//! Initial code generation, one script per goal.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    config::RunConfig,
    error::LlmError,
    llm::{ChatOptions, LlmClient},
    prompt::{self, PromptKind},
    responses::GeneratedCode,
    visualization::VisualizationGoal,
};

use super::code_system_prompt;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// First version of the script for `goal`. `preview` is the head of the dataset.
    async fn generate(&self, goal: &VisualizationGoal, preview: &str) -> Result<String, LlmError>;
}

pub struct LlmCodeGenerator {
    client: Arc<LlmClient>,
    run: Arc<RunConfig>,
    model: String,
}

impl LlmCodeGenerator {
    pub fn new(client: Arc<LlmClient>, run: Arc<RunConfig>, model: impl Into<String>) -> Self {
        Self { client, run, model: model.into() }
    }
}

pub(crate) fn user_prompt(run: &RunConfig, goal: &VisualizationGoal, preview: &str) -> String {
    let index = goal.index.to_string();
    let dataset = run.dataset.path.display().to_string();
    let delimiter = run.dataset.delimiter.to_string();
    let output_dir = run.output_dir.display().to_string();
    prompt::render(
        run.language,
        PromptKind::GenerateCodeUser,
        &[
            ("programming_language", run.programming_language.display_name()),
            ("goal_index", &index),
            ("question", &goal.question),
            ("visualization", &goal.visualization),
            ("rationale", &goal.rationale),
            ("dataset_path", &dataset),
            ("delimiter", &delimiter),
            ("encoding", &run.dataset.encoding),
            ("output_dir", &output_dir),
            ("preview", preview),
        ],
    )
}

#[async_trait]
impl CodeGenerator for LlmCodeGenerator {
    async fn generate(&self, goal: &VisualizationGoal, preview: &str) -> Result<String, LlmError> {
        let generated: GeneratedCode = self
            .client
            .complete_structured(
                "generate_code",
                self.run.language,
                &code_system_prompt(self.run.language, self.run.programming_language),
                user_prompt(&self.run, goal, preview),
                ChatOptions::for_model(&self.model),
            )
            .await?;
        if generated.code.trim().is_empty() {
            return Err(LlmError::EmptyResponse("generate_code".into()));
        }
        Ok(generated.code)
    }
}
