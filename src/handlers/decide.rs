//! Regeneration oracle backed by a chat completion.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::{
    error::LlmError,
    language::Language,
    llm::{ChatOptions, LlmClient},
    prompt::{self, PromptKind},
    responses::RegenerationDecision,
    workflow::RegenerationOracle,
};

pub struct LlmRegenerationOracle {
    client: Arc<LlmClient>,
    language: Language,
    model: String,
}

impl LlmRegenerationOracle {
    pub fn new(client: Arc<LlmClient>, language: Language, model: impl Into<String>) -> Self {
        Self { client, language, model: model.into() }
    }
}

pub(crate) fn user_prompt(language: Language, stdout: &str, stderr: &str) -> String {
    prompt::render(language, PromptKind::DecideUser, &[("stdout", stdout), ("stderr", stderr)])
}

#[async_trait]
impl RegenerationOracle for LlmRegenerationOracle {
    async fn should_regenerate(&self, stdout: &str, stderr: &str) -> Result<bool, LlmError> {
        let decision: RegenerationDecision = self
            .client
            .complete_structured(
                "decide_regeneration",
                self.language,
                prompt::prompt_text(self.language, PromptKind::DecideSystem),
                user_prompt(self.language, stdout, stderr),
                ChatOptions::for_model(&self.model),
            )
            .await?;
        debug!(verdict = decision.should_be_regenerated, "oracle answered");
        Ok(decision.should_be_regenerated)
    }
}
