//! Judge stage: critique of the final code of each unit.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::LlmError,
    language::Language,
    llm::{ChatOptions, LlmClient},
    process::InterpreterType,
    prompt::{self, PromptKind},
    responses::JudgeVerdict,
    visualization::VisualizationGoal,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodeJudge: Send + Sync {
    async fn judge(&self, goal: &VisualizationGoal, code: &str) -> Result<JudgeVerdict, LlmError>;
}

pub struct LlmCodeJudge {
    client: Arc<LlmClient>,
    language: Language,
    interpreter: InterpreterType,
    model: String,
}

impl LlmCodeJudge {
    pub fn new(
        client: Arc<LlmClient>,
        language: Language,
        interpreter: InterpreterType,
        model: impl Into<String>,
    ) -> Self {
        Self { client, language, interpreter, model: model.into() }
    }
}

#[async_trait]
impl CodeJudge for LlmCodeJudge {
    async fn judge(&self, goal: &VisualizationGoal, code: &str) -> Result<JudgeVerdict, LlmError> {
        let goal = goal.to_string();
        let user = prompt::render(
            self.language,
            PromptKind::JudgeUser,
            &[
                ("goal", &goal),
                ("programming_language", self.interpreter.display_name()),
                ("code", code),
            ],
        );
        self.client
            .complete_structured(
                "judge_code",
                self.language,
                prompt::prompt_text(self.language, PromptKind::JudgeSystem),
                user,
                ChatOptions::for_model(&self.model),
            )
            .await
    }
}
