//! Refactoring of code the judge flagged.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::LlmError,
    language::Language,
    llm::{ChatOptions, LlmClient},
    prompt::{self, PromptKind},
    responses::{GeneratedCode, JudgeVerdict},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodeRefactorer: Send + Sync {
    async fn refactor(&self, code: &str, verdict: &JudgeVerdict) -> Result<String, LlmError>;
}

pub struct LlmCodeRefactorer {
    client: Arc<LlmClient>,
    language: Language,
    model: String,
}

impl LlmCodeRefactorer {
    pub fn new(client: Arc<LlmClient>, language: Language, model: impl Into<String>) -> Self {
        Self { client, language, model: model.into() }
    }
}

pub(crate) fn user_prompt(language: Language, code: &str, verdict: &JudgeVerdict) -> String {
    prompt::render(
        language,
        PromptKind::RefactorUser,
        &[
            ("code", code),
            ("critic_notes", &verdict.critic_notes),
            ("suggestions", &verdict.suggestions),
        ],
    )
}

#[async_trait]
impl CodeRefactorer for LlmCodeRefactorer {
    async fn refactor(&self, code: &str, verdict: &JudgeVerdict) -> Result<String, LlmError> {
        let generated: GeneratedCode = self
            .client
            .complete_structured(
                "refactor_code",
                self.language,
                prompt::prompt_text(self.language, PromptKind::RefactorSystem),
                user_prompt(self.language, code, verdict),
                ChatOptions::for_model(&self.model),
            )
            .await?;
        if generated.code.trim().is_empty() {
            return Err(LlmError::EmptyResponse("refactor_code".into()));
        }
        Ok(generated.code)
    }
}
