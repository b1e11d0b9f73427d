//! LIDA self-evaluation of the final code, once per evaluator model.

use std::{fmt, fs, io, path::Path, sync::Arc};

use async_trait::async_trait;
use tracing::info;

use crate::{
    error::LlmError,
    language::Language,
    llm::{ChatOptions, LlmClient},
    process::InterpreterType,
    prompt::{self, PromptKind},
    responses::LidaEvaluation,
    visualization::VisualizationGoal,
};

pub const SEVQ_HEADER: &str = "vis_index,phase,model,bugs,transformation,compliance,type,encoding,aesthetics";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationPhase {
    PreRefactoring,
    PostRefactoring,
}

impl EvaluationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationPhase::PreRefactoring => "pre_refactoring",
            EvaluationPhase::PostRefactoring => "post_refactoring",
        }
    }
}

impl fmt::Display for EvaluationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One model's scores for one visualization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEvaluation {
    pub model: String,
    pub evaluation: LidaEvaluation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationRecord {
    pub vis_index: usize,
    pub phase: EvaluationPhase,
    pub model: String,
    pub evaluation: LidaEvaluation,
}

impl EvaluationRecord {
    fn csv_row(&self) -> String {
        let mut row = format!("{},{},{}", self.vis_index, self.phase, csv_field(&self.model));
        for (_, score) in self.evaluation.scores() {
            row.push(',');
            row.push_str(&score.score.to_string());
        }
        row
    }
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VisualizationEvaluator: Send + Sync {
    async fn evaluate(&self, goal: &VisualizationGoal, code: &str) -> Result<Vec<ModelEvaluation>, LlmError>;
}

pub struct LlmVisualizationEvaluator {
    client: Arc<LlmClient>,
    language: Language,
    interpreter: InterpreterType,
    models: Vec<String>,
}

impl LlmVisualizationEvaluator {
    pub fn new(
        client: Arc<LlmClient>,
        language: Language,
        interpreter: InterpreterType,
        models: Vec<String>,
    ) -> Self {
        Self { client, language, interpreter, models }
    }
}

#[async_trait]
impl VisualizationEvaluator for LlmVisualizationEvaluator {
    async fn evaluate(&self, goal: &VisualizationGoal, code: &str) -> Result<Vec<ModelEvaluation>, LlmError> {
        let goal_text = goal.to_string();
        let user = prompt::render(
            self.language,
            PromptKind::EvaluateUser,
            &[
                ("goal", &goal_text),
                ("programming_language", self.interpreter.extension()),
                ("code", code),
            ],
        );
        let system = prompt::prompt_text(self.language, PromptKind::EvaluateSystem);

        let mut out = Vec::with_capacity(self.models.len());
        for model in &self.models {
            let evaluation: LidaEvaluation = self
                .client
                .complete_structured(
                    "evaluate_visualization",
                    self.language,
                    system,
                    user.clone(),
                    ChatOptions::for_model(model),
                )
                .await?;
            info!(goal = goal.index, model = %model, total = evaluation.total(), "evaluated");
            out.push(ModelEvaluation { model: model.clone(), evaluation });
        }
        Ok(out)
    }
}

/// Write all records to `path` as CSV, replacing any previous file.
pub fn write_sevq_csv(path: &Path, records: &[EvaluationRecord]) -> io::Result<()> {
    let mut text = String::from(SEVQ_HEADER);
    text.push('\n');
    for record in records {
        text.push_str(&record.csv_row());
        text.push('\n');
    }
    fs::write(path, text)
}
