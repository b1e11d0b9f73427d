//! Visualization goals: proposed by the model from a dataset preview, or read
//! from a JSON file.

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::{
    error::LlmError,
    language::Language,
    llm::{ChatOptions, LlmClient},
    prompt::{self, PromptKind},
    responses::GoalList,
    visualization::{renumber, VisualizationGoal},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GoalGenerator: Send + Sync {
    async fn generate(&self, preview: &str, count: usize) -> Result<Vec<VisualizationGoal>, LlmError>;
}

pub struct LlmGoalGenerator {
    client: Arc<LlmClient>,
    language: Language,
    model: String,
    delimiter: char,
}

impl LlmGoalGenerator {
    pub fn new(client: Arc<LlmClient>, language: Language, model: impl Into<String>, delimiter: char) -> Self {
        Self { client, language, model: model.into(), delimiter }
    }
}

#[async_trait]
impl GoalGenerator for LlmGoalGenerator {
    async fn generate(&self, preview: &str, count: usize) -> Result<Vec<VisualizationGoal>, LlmError> {
        let count_s = count.to_string();
        let delimiter = self.delimiter.to_string();
        let user = prompt::render(
            self.language,
            PromptKind::GoalsUser,
            &[("count", &count_s), ("delimiter", &delimiter), ("preview", preview)],
        );
        let list: GoalList = self
            .client
            .complete_structured(
                "generate_goals",
                self.language,
                prompt::prompt_text(self.language, PromptKind::GoalsSystem),
                user,
                ChatOptions::for_model(&self.model),
            )
            .await?;
        let mut goals = list.goals;
        if goals.is_empty() {
            return Err(LlmError::EmptyResponse("generate_goals".into()));
        }
        renumber(&mut goals);
        info!(count = goals.len(), "goals generated");
        Ok(goals)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GoalsFile {
    List(Vec<VisualizationGoal>),
    Wrapped(GoalList),
}

/// Read goals from a JSON file, either a bare array or `{"goals": [...]}`.
/// Indices are re-numbered in file order.
pub fn load_goals(path: &Path) -> Result<Vec<VisualizationGoal>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read goals file {}", path.display()))?;
    let parsed: GoalsFile = serde_json::from_str(&text)
        .with_context(|| format!("goals file {} is not a goal list", path.display()))?;
    let mut goals = match parsed {
        GoalsFile::List(goals) => goals,
        GoalsFile::Wrapped(list) => list.goals,
    };
    if goals.is_empty() {
        anyhow::bail!("goals file {} contains no goals", path.display());
    }
    renumber(&mut goals);
    Ok(goals)
}
