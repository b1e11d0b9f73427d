//! The full run: goals → code → loop → evaluation → (judge → refactor → loop →
//! evaluation).

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use tracing::{info, instrument};

use crate::{
    config::{Config, RunConfig},
    execution::{CodeExecutor, SubprocessExecutor},
    handlers::{
        code::{CodeGenerator, LlmCodeGenerator},
        decide::LlmRegenerationOracle,
        evaluate::{
            write_sevq_csv, EvaluationPhase, EvaluationRecord, LlmVisualizationEvaluator,
            VisualizationEvaluator,
        },
        goals::{GoalGenerator, LlmGoalGenerator},
        judge::{CodeJudge, LlmCodeJudge},
        refactor::{CodeRefactorer, LlmCodeRefactorer},
        regenerate::LlmCodeRegenerator,
    },
    llm::LlmClient,
    output,
    printer::{TextPrinter, Tone},
    stats::StageTiming,
    utils,
    visualization::{renumber, VisualizationGoal, VisualizationUnit},
    workflow::{CodeRegenerator, LoopController, LoopDecision, LoopOutcome, RegenerationOracle},
};

/// Rows of the dataset shown to the model.
const PREVIEW_LINES: usize = 6;

/// Every external capability the pipeline calls.
#[derive(Clone)]
pub struct Collaborators {
    pub goals: Arc<dyn GoalGenerator>,
    pub code: Arc<dyn CodeGenerator>,
    pub executor: Arc<dyn CodeExecutor>,
    pub oracle: Arc<dyn RegenerationOracle>,
    pub regenerator: Arc<dyn CodeRegenerator>,
    pub judge: Arc<dyn CodeJudge>,
    pub refactorer: Arc<dyn CodeRefactorer>,
    pub evaluator: Arc<dyn VisualizationEvaluator>,
}

impl Collaborators {
    /// Wire the LLM-backed implementations with the models named in `cfg`.
    pub fn from_llm(client: Arc<LlmClient>, cfg: &Config, run: Arc<RunConfig>) -> Self {
        let model = |key: &str, default: &str| cfg.get(key).unwrap_or_else(|| default.to_string());
        let code_model = model("CODE_MODEL", "gpt-5");
        let mut evaluation_models = cfg.get_list("EVALUATION_MODELS");
        if evaluation_models.is_empty() {
            evaluation_models.push("gpt-5".into());
        }
        let language = run.language;
        let interpreter = run.programming_language;

        Self {
            goals: Arc::new(LlmGoalGenerator::new(
                client.clone(),
                language,
                code_model.clone(),
                run.dataset.delimiter,
            )),
            code: Arc::new(LlmCodeGenerator::new(client.clone(), run.clone(), code_model.clone())),
            executor: Arc::new(SubprocessExecutor::from_run_config(&run)),
            oracle: Arc::new(LlmRegenerationOracle::new(
                client.clone(),
                language,
                model("DECISION_MODEL", "gpt-4o"),
            )),
            regenerator: Arc::new(LlmCodeRegenerator::new(
                client.clone(),
                language,
                interpreter,
                code_model.clone(),
            )),
            judge: Arc::new(LlmCodeJudge::new(
                client.clone(),
                language,
                interpreter,
                model("JUDGE_MODEL", "gpt-5"),
            )),
            refactorer: Arc::new(LlmCodeRefactorer::new(client.clone(), language, code_model)),
            evaluator: Arc::new(LlmVisualizationEvaluator::new(
                client,
                language,
                interpreter,
                evaluation_models,
            )),
        }
    }
}

/// What a finished run hands to the statistics report.
#[derive(Debug)]
pub struct PipelineReport {
    pub units: Vec<VisualizationUnit>,
    pub decisions: Vec<LoopDecision>,
    pub outcome: Option<LoopOutcome>,
    pub stages: Vec<StageTiming>,
    pub evaluations: Vec<EvaluationRecord>,
    pub total_duration: Duration,
}

pub struct Pipeline {
    run: Arc<RunConfig>,
    parts: Collaborators,
    printer: TextPrinter,
    goal_count: usize,
}

impl Pipeline {
    pub fn new(run: Arc<RunConfig>, parts: Collaborators) -> Self {
        Self { run, parts, printer: TextPrinter::default(), goal_count: 5 }
    }

    pub fn with_goal_count(mut self, count: usize) -> Self {
        self.goal_count = count.max(1);
        self
    }

    pub fn with_printer(mut self, printer: TextPrinter) -> Self {
        self.printer = printer;
        self
    }

    /// Run everything. `goals` skips goal generation when given.
    #[instrument(skip_all, fields(dataset = %self.run.dataset.path.display()))]
    pub async fn run(&self, goals: Option<Vec<VisualizationGoal>>) -> Result<PipelineReport> {
        let started = Instant::now();
        let mut stages = Vec::new();
        let mut decisions = Vec::new();
        let mut evaluations = Vec::new();

        if output::holds_file(&self.run.output_dir, &self.run.dataset.path) {
            bail!(
                "dataset '{}' is inside the output directory '{}', which is cleared before every execution cycle",
                self.run.dataset.path.display(),
                self.run.output_dir.display()
            );
        }
        let preview = utils::read_dataset_preview(&self.run.dataset.path, PREVIEW_LINES)?;

        let t = Instant::now();
        let mut goals = match goals {
            Some(goals) => goals,
            None => {
                self.printer.info("Generating visualization goals...");
                self.parts
                    .goals
                    .generate(&preview, self.goal_count)
                    .await
                    .context("goal generation failed")?
            }
        };
        renumber(&mut goals);
        stages.push(StageTiming::new("generate_goals", t.elapsed()));
        for goal in &goals {
            self.printer.print(Tone::Plain, &goal.to_string());
        }

        let t = Instant::now();
        let mut units = Vec::with_capacity(goals.len());
        for goal in goals {
            self.printer.info(&format!("Generating code for visualization #{}", goal.index));
            let code = self
                .parts
                .code
                .generate(&goal, &preview)
                .await
                .with_context(|| format!("code generation failed for goal #{}", goal.index))?;
            units.push(VisualizationUnit::new(Arc::new(goal), code));
        }
        stages.push(StageTiming::new("generate_code", t.elapsed()));

        let mut controller = LoopController::new(
            self.run.clone(),
            self.parts.executor.clone(),
            self.parts.oracle.clone(),
            self.parts.regenerator.clone(),
        )
        .with_printer(self.printer);

        let t = Instant::now();
        let decision = controller.run(&mut units).await.context("code test loop failed")?;
        decisions.push(decision);
        stages.push(StageTiming::new("test_code", t.elapsed()));
        info!(%decision, attempts = controller.attempts(), "first loop finished");

        let t = Instant::now();
        evaluations.extend(self.evaluate(&units, EvaluationPhase::PreRefactoring).await?);
        self.write_sevq(&evaluations)?;
        stages.push(StageTiming::new("evaluate_pre_refactoring", t.elapsed()));

        if self.run.refactor {
            let t = Instant::now();
            let refactored = self.judge_and_refactor(&mut units).await?;
            stages.push(StageTiming::new("judge_and_refactor", t.elapsed()));

            if refactored > 0 {
                controller.enter_refactor_pass();
                let t = Instant::now();
                let decision = controller.run(&mut units).await.context("refactor test loop failed")?;
                decisions.push(decision);
                stages.push(StageTiming::new("test_refactored_code", t.elapsed()));

                let t = Instant::now();
                evaluations.extend(self.evaluate(&units, EvaluationPhase::PostRefactoring).await?);
                self.write_sevq(&evaluations)?;
                stages.push(StageTiming::new("evaluate_post_refactoring", t.elapsed()));
            } else {
                self.printer.success("The judge found nothing to refactor.");
            }
        }

        Ok(PipelineReport {
            units,
            decisions,
            outcome: controller.last_outcome(),
            stages,
            evaluations,
            total_duration: started.elapsed(),
        })
    }

    async fn evaluate(
        &self,
        units: &[VisualizationUnit],
        phase: EvaluationPhase,
    ) -> Result<Vec<EvaluationRecord>> {
        self.printer.info(&format!("Evaluating visualizations ({phase})"));
        let mut records = Vec::new();
        for unit in units {
            let scores = self
                .parts
                .evaluator
                .evaluate(unit.goal(), unit.code())
                .await
                .with_context(|| format!("evaluation failed for visualization #{}", unit.index()))?;
            records.extend(scores.into_iter().map(|s| EvaluationRecord {
                vis_index: unit.index(),
                phase,
                model: s.model,
                evaluation: s.evaluation,
            }));
        }
        Ok(records)
    }

    /// Judge every unit and refactor the flagged ones. Returns how many were refactored.
    async fn judge_and_refactor(&self, units: &mut [VisualizationUnit]) -> Result<usize> {
        let mut refactored = 0;
        for unit in units.iter_mut() {
            let verdict = self
                .parts
                .judge
                .judge(unit.goal(), unit.code())
                .await
                .with_context(|| format!("judging failed for visualization #{}", unit.index()))?;
            if verdict.needs_refactoring {
                self.printer.info(&format!("Refactoring visualization #{}", unit.index()));
                let code = self
                    .parts
                    .refactorer
                    .refactor(unit.code(), &verdict)
                    .await
                    .with_context(|| format!("refactoring failed for visualization #{}", unit.index()))?;
                unit.replace_code(code);
                refactored += 1;
            }
            unit.judge_result = Some(verdict);
        }
        Ok(refactored)
    }

    fn write_sevq(&self, records: &[EvaluationRecord]) -> Result<()> {
        let path = self.run.output_dir.join("sevq.csv");
        write_sevq_csv(&path, records).with_context(|| format!("failed to write {}", path.display()))
    }
}
