//! Code regenerator backed by a chat completion.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::LlmError,
    language::Language,
    llm::{ChatOptions, LlmClient},
    process::InterpreterType,
    prompt::{self, PromptKind},
    responses::GeneratedCode,
    visualization::VisualizationGoal,
    workflow::CodeRegenerator,
};

use super::code_system_prompt;

pub struct LlmCodeRegenerator {
    client: Arc<LlmClient>,
    language: Language,
    interpreter: InterpreterType,
    model: String,
}

impl LlmCodeRegenerator {
    pub fn new(
        client: Arc<LlmClient>,
        language: Language,
        interpreter: InterpreterType,
        model: impl Into<String>,
    ) -> Self {
        Self { client, language, interpreter, model: model.into() }
    }
}

pub(crate) fn user_prompt(
    language: Language,
    goal: &VisualizationGoal,
    code: &str,
    stdout: &str,
    stderr: &str,
) -> String {
    let goal = goal.to_string();
    prompt::render(
        language,
        PromptKind::RegenerateCodeUser,
        &[("stdout", stdout), ("stderr", stderr), ("goal", &goal), ("code", code)],
    )
}

#[async_trait]
impl CodeRegenerator for LlmCodeRegenerator {
    async fn regenerate(
        &self,
        goal: &VisualizationGoal,
        code: &str,
        stdout: &str,
        stderr: &str,
    ) -> Result<String, LlmError> {
        let generated: GeneratedCode = self
            .client
            .complete_structured(
                "regenerate_code",
                self.language,
                &code_system_prompt(self.language, self.interpreter),
                user_prompt(self.language, goal, code, stdout, stderr),
                ChatOptions::for_model(&self.model),
            )
            .await?;
        if generated.code.trim().is_empty() {
            return Err(LlmError::EmptyResponse("regenerate_code".into()));
        }
        Ok(generated.code)
    }
}
