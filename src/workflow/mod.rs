//! The execute → decide → regenerate loop over all visualization units.
//!
//! One cycle executes every unit in order, records one verdict per unit and
//! then picks a single edge for the whole batch. Regeneration is bounded by a
//! run-wide attempt counter that advances once per cycle, not once per unit.

use std::{fmt, sync::Arc};

use tracing::{info, instrument, warn};

use crate::{
    config::RunConfig,
    error::WorkflowError,
    execution::CodeExecutor,
    output,
    printer::TextPrinter,
    visualization::VisualizationUnit,
};

pub mod oracle;
pub mod regenerator;

pub use oracle::RegenerationOracle;
pub use regenerator::CodeRegenerator;

/// Edge taken by the hosting graph after a decision pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopDecision {
    RegenerateCode,
    Evaluate,
    End,
}

impl LoopDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopDecision::RegenerateCode => "regenerate_code",
            LoopDecision::Evaluate => "evaluate",
            LoopDecision::End => "end",
        }
    }
}

impl fmt::Display for LoopDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    AllPassing,
    BudgetExhausted,
}

pub struct LoopController {
    config: Arc<RunConfig>,
    executor: Arc<dyn CodeExecutor>,
    oracle: Arc<dyn RegenerationOracle>,
    regenerator: Arc<dyn CodeRegenerator>,
    printer: TextPrinter,
    attempts: usize,
    is_refactoring: bool,
    /// Execution cycles across all passes; keys `ver_values` and archive folders.
    cycle: usize,
    last_outcome: Option<LoopOutcome>,
}

impl LoopController {
    pub fn new(
        config: Arc<RunConfig>,
        executor: Arc<dyn CodeExecutor>,
        oracle: Arc<dyn RegenerationOracle>,
        regenerator: Arc<dyn CodeRegenerator>,
    ) -> Self {
        Self {
            config,
            executor,
            oracle,
            regenerator,
            printer: TextPrinter::default(),
            attempts: 0,
            is_refactoring: false,
            cycle: 0,
            last_outcome: None,
        }
    }

    pub fn with_printer(mut self, printer: TextPrinter) -> Self {
        self.printer = printer;
        self
    }

    /// Regeneration cycles spent in the current pass.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn is_refactoring(&self) -> bool {
        self.is_refactoring
    }

    pub fn cycles(&self) -> usize {
        self.cycle
    }

    pub fn last_outcome(&self) -> Option<LoopOutcome> {
        self.last_outcome
    }

    /// Start a refactor pass with a fresh budget. Its loop exits on `end`.
    pub fn enter_refactor_pass(&mut self) {
        self.attempts = 0;
        self.is_refactoring = true;
        self.last_outcome = None;
    }

    /// Drive cycles until a terminal edge is reached.
    pub async fn run(&mut self, units: &mut [VisualizationUnit]) -> Result<LoopDecision, WorkflowError> {
        loop {
            match self.test_and_decide(units).await? {
                LoopDecision::RegenerateCode => {
                    self.regenerate(units).await?;
                }
                terminal => return Ok(terminal),
            }
        }
    }

    /// Execute every unit, record one verdict each, and route the batch.
    #[instrument(skip_all, fields(cycle = self.cycle, refactoring = self.is_refactoring))]
    pub async fn test_and_decide(
        &mut self,
        units: &mut [VisualizationUnit],
    ) -> Result<LoopDecision, WorkflowError> {
        let dir = self.config.output_dir.clone();
        let io_err = |source| WorkflowError::Output { path: dir.clone(), source };

        if self.cycle > 0 {
            output::archive_images(&dir, self.cycle - 1).map_err(io_err)?;
        }
        output::clear_output_dir(&dir).map_err(io_err)?;

        for unit in units.iter_mut() {
            let result = self.executor.execute(unit.index(), unit.code()).await?;
            unit.record_execution(&result.stdout, &result.stderr);
            unit.record_images(self.cycle, output::count_images(&dir, unit.index()));
        }

        for unit in units.iter_mut() {
            let verdict = oracle::decide(self.oracle.as_ref(), unit).await?;
            unit.record_verdict(verdict);
            info!(unit = unit.index(), verdict, attempt = self.attempts, "decision");
            if verdict {
                self.printer
                    .warn(&format!("Visualization #{} needs to be regenerated.", unit.index()));
            }
        }
        self.cycle += 1;

        Ok(self.route(units))
    }

    fn route(&mut self, units: &[VisualizationUnit]) -> LoopDecision {
        let flagged = units.iter().filter(|u| u.needs_regeneration()).count();
        if flagged == 0 {
            self.last_outcome = Some(LoopOutcome::AllPassing);
            self.printer.success("All visualizations ran without errors.");
            return self.exit_edge();
        }
        if self.attempts >= self.config.max_regeneration_attempts {
            self.last_outcome = Some(LoopOutcome::BudgetExhausted);
            warn!(flagged, attempts = self.attempts, "attempt ceiling reached");
            self.printer.failure(&format!(
                "Stopping after {} regeneration attempts; {} visualization(s) still failing.",
                self.attempts, flagged
            ));
            return self.exit_edge();
        }
        LoopDecision::RegenerateCode
    }

    fn exit_edge(&self) -> LoopDecision {
        if self.is_refactoring {
            LoopDecision::End
        } else {
            LoopDecision::Evaluate
        }
    }

    /// Replace the code of every unit whose latest verdict is `true`. Returns
    /// how many were regenerated; the counter advances once if any were.
    #[instrument(skip_all, fields(attempt = self.attempts + 1))]
    pub async fn regenerate(&mut self, units: &mut [VisualizationUnit]) -> Result<usize, WorkflowError> {
        if self.attempts >= self.config.max_regeneration_attempts {
            return Ok(0);
        }
        let mut regenerated = 0;
        for unit in units.iter_mut().filter(|u| u.needs_regeneration()) {
            self.printer.info(&format!(
                "Regenerating visualization #{} (attempt {}/{})",
                unit.index(),
                self.attempts + 1,
                self.config.max_regeneration_attempts
            ));
            let code = self
                .regenerator
                .regenerate(unit.goal(), unit.code(), unit.stdout(), unit.stderr())
                .await?;
            unit.apply_regenerated_code(code);
            regenerated += 1;
        }
        if regenerated > 0 {
            self.attempts += 1;
        }
        info!(regenerated, attempts = self.attempts, "regeneration cycle done");
        Ok(regenerated)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        path::Path,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        config::{Config, DatasetHandle},
        error::{ExecutionError, LlmError},
        execution::{ExecutionResult, MockCodeExecutor},
        visualization::VisualizationGoal,
        workflow::{oracle::MockRegenerationOracle, regenerator::MockCodeRegenerator},
    };

    fn run_config(dir: &Path, max: usize) -> Arc<RunConfig> {
        let mut run = RunConfig::from_config(
            &Config::from_pairs(Vec::<(String, String)>::new()),
            DatasetHandle::new("data.csv"),
        );
        run.output_dir = dir.to_path_buf();
        run.max_regeneration_attempts = max;
        run.execution_timeout = Duration::from_secs(5);
        Arc::new(run)
    }

    fn units(codes: &[&str]) -> Vec<VisualizationUnit> {
        codes
            .iter()
            .enumerate()
            .map(|(i, code)| {
                let goal = VisualizationGoal {
                    index: i,
                    question: format!("question {i}"),
                    visualization: "bar chart".into(),
                    rationale: "column a".into(),
                };
                VisualizationUnit::new(Arc::new(goal), *code)
            })
            .collect()
    }

    fn output(stdout: &str, stderr: &str) -> ExecutionResult {
        ExecutionResult { stdout: stdout.into(), stderr: stderr.into(), ..Default::default() }
    }

    /// Fails with a traceback whenever the code contains "broken".
    fn tracing_executor() -> MockCodeExecutor {
        let mut exec = MockCodeExecutor::new();
        exec.expect_execute().returning(|_, code| {
            if code.contains("broken") {
                Ok(output("", "Traceback (most recent call last):\nKeyError: 'price'"))
            } else {
                Ok(output("", ""))
            }
        });
        exec
    }

    fn traceback_oracle() -> MockRegenerationOracle {
        let mut oracle = MockRegenerationOracle::new();
        oracle
            .expect_should_regenerate()
            .returning(|_, stderr| Ok(stderr.contains("Traceback")));
        oracle
    }

    fn controller(
        dir: &Path,
        max: usize,
        exec: MockCodeExecutor,
        oracle: MockRegenerationOracle,
        regen: MockCodeRegenerator,
    ) -> LoopController {
        LoopController::new(run_config(dir, max), Arc::new(exec), Arc::new(oracle), Arc::new(regen))
            .with_printer(TextPrinter::plain())
    }

    #[tokio::test]
    async fn clean_batch_goes_straight_to_evaluation() {
        let dir = tempfile::tempdir().unwrap();
        let mut exec = MockCodeExecutor::new();
        exec.expect_execute().times(3).returning(|_, _| Ok(output("", "")));
        let mut oracle = MockRegenerationOracle::new();
        oracle.expect_should_regenerate().never();
        let mut regen = MockCodeRegenerator::new();
        regen.expect_regenerate().never();

        let mut ctl = controller(dir.path(), 3, exec, oracle, regen);
        let mut batch = units(&["a", "b", "c"]);
        let decision = ctl.run(&mut batch).await.unwrap();

        assert_eq!(decision, LoopDecision::Evaluate);
        assert_eq!(ctl.attempts(), 0);
        assert_eq!(ctl.last_outcome(), Some(LoopOutcome::AllPassing));
        for u in &batch {
            assert_eq!(u.regeneration_history(), &[false]);
        }
    }

    #[tokio::test]
    async fn only_the_failing_unit_is_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let mut regen = MockCodeRegenerator::new();
        regen
            .expect_regenerate()
            .withf(|goal, code, _, stderr| goal.index == 1 && code == "broken" && stderr.contains("KeyError"))
            .times(1)
            .returning(|_, _, _, _| Ok("fixed".to_string()));

        let mut ctl = controller(dir.path(), 3, tracing_executor(), traceback_oracle(), regen);
        let mut batch = units(&["ok 0", "broken", "ok 2"]);

        assert_eq!(ctl.test_and_decide(&mut batch).await.unwrap(), LoopDecision::RegenerateCode);
        assert_eq!(ctl.regenerate(&mut batch).await.unwrap(), 1);
        assert_eq!(ctl.attempts(), 1);
        assert_eq!(batch[0].code(), "ok 0");
        assert_eq!(batch[1].code(), "fixed");
        assert_eq!(batch[2].code(), "ok 2");
        // verdict stays until the next decision pass
        assert!(batch[1].needs_regeneration());

        assert_eq!(ctl.test_and_decide(&mut batch).await.unwrap(), LoopDecision::Evaluate);
        assert_eq!(batch[1].regeneration_history(), &[true, false]);
        assert_eq!(batch[0].regeneration_history(), &[false, false]);
        assert_eq!(batch[1].regeneration_attempts(), 1);
    }

    #[tokio::test]
    async fn counter_advances_once_per_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let mut regen = MockCodeRegenerator::new();
        regen
            .expect_regenerate()
            .times(3)
            .returning(|_, _, _, _| Ok("print('ok')".to_string()));

        let mut ctl = controller(dir.path(), 3, tracing_executor(), traceback_oracle(), regen);
        let mut batch = units(&["broken", "broken", "broken"]);
        let decision = ctl.run(&mut batch).await.unwrap();

        assert_eq!(decision, LoopDecision::Evaluate);
        assert_eq!(ctl.attempts(), 1);
        assert_eq!(ctl.cycles(), 2);
    }

    #[tokio::test]
    async fn persistent_failure_stops_at_the_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let mut regen = MockCodeRegenerator::new();
        regen
            .expect_regenerate()
            .times(3)
            .returning(|_, _, _, _| Ok("still broken".to_string()));

        let mut ctl = controller(dir.path(), 3, tracing_executor(), traceback_oracle(), regen);
        let mut batch = units(&["ok", "broken"]);
        let decision = ctl.run(&mut batch).await.unwrap();

        assert_eq!(decision, LoopDecision::Evaluate);
        assert_eq!(ctl.attempts(), 3);
        assert_eq!(ctl.last_outcome(), Some(LoopOutcome::BudgetExhausted));
        assert_eq!(batch[1].regeneration_history(), &[true, true, true, true]);
        assert_eq!(batch[1].code(), "still broken");
        assert_eq!(batch[0].regeneration_history().len(), 4);
    }

    #[tokio::test]
    async fn exhausted_budget_never_calls_the_regenerator() {
        let dir = tempfile::tempdir().unwrap();
        let mut regen = MockCodeRegenerator::new();
        regen.expect_regenerate().never();

        let mut ctl = controller(dir.path(), 0, tracing_executor(), traceback_oracle(), regen);
        let mut batch = units(&["broken"]);
        assert_eq!(ctl.test_and_decide(&mut batch).await.unwrap(), LoopDecision::Evaluate);
        assert_eq!(ctl.regenerate(&mut batch).await.unwrap(), 0);
        assert_eq!(ctl.attempts(), 0);
    }

    #[tokio::test]
    async fn warnings_reach_the_oracle_but_do_not_force_regeneration() {
        let dir = tempfile::tempdir().unwrap();
        let mut exec = MockCodeExecutor::new();
        exec.expect_execute()
            .returning(|_, _| Ok(output("", "FutureWarning: the default of observed=False is deprecated")));
        let mut oracle = MockRegenerationOracle::new();
        oracle.expect_should_regenerate().times(1).returning(|_, _| Ok(false));
        let mut regen = MockCodeRegenerator::new();
        regen.expect_regenerate().never();

        let mut ctl = controller(dir.path(), 3, exec, oracle, regen);
        let mut batch = units(&["sns.countplot()"]);
        assert_eq!(ctl.run(&mut batch).await.unwrap(), LoopDecision::Evaluate);
        assert_eq!(batch[0].code(), "sns.countplot()");
    }

    #[tokio::test]
    async fn refactor_pass_gets_a_fresh_budget_and_ends() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let mut oracle = MockRegenerationOracle::new();
        // first pass: fail twice then pass; refactor pass: always fail
        oracle.expect_should_regenerate().returning(move |_, _| {
            let n = seen.fetch_add(1, Ordering::SeqCst);
            Ok(n != 2)
        });
        let mut exec = MockCodeExecutor::new();
        exec.expect_execute().returning(|_, _| Ok(output("", "Error in ggplot()")));
        let mut regen = MockCodeRegenerator::new();
        regen.expect_regenerate().times(5).returning(|_, _, _, _| Ok("again".to_string()));

        let mut ctl = controller(dir.path(), 3, exec, oracle, regen);
        let mut batch = units(&["library(ggplot2)"]);

        assert_eq!(ctl.run(&mut batch).await.unwrap(), LoopDecision::Evaluate);
        assert_eq!(ctl.attempts(), 2);

        ctl.enter_refactor_pass();
        assert_eq!(ctl.attempts(), 0);
        assert!(ctl.is_refactoring());

        assert_eq!(ctl.run(&mut batch).await.unwrap(), LoopDecision::End);
        assert_eq!(ctl.attempts(), 3);
        assert_eq!(batch[0].regeneration_attempts(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn clean_refactor_pass_ends_without_evaluating() {
        let dir = tempfile::tempdir().unwrap();
        let mut exec = MockCodeExecutor::new();
        exec.expect_execute().returning(|_, _| Ok(output("", "")));
        let mut ctl = controller(dir.path(), 3, exec, MockRegenerationOracle::new(), MockCodeRegenerator::new());
        ctl.enter_refactor_pass();
        let mut batch = units(&["a"]);
        assert_eq!(ctl.run(&mut batch).await.unwrap(), LoopDecision::End);
    }

    #[tokio::test]
    async fn images_are_counted_per_cycle_and_archived() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().to_path_buf();
        let mut exec = MockCodeExecutor::new();
        exec.expect_execute().returning(move |idx, code| {
            if !code.contains("broken") {
                std::fs::write(out.join(format!("{idx}_plot.png")), b"png").unwrap();
                Ok(output("", ""))
            } else {
                Ok(output("", "Traceback: boom"))
            }
        });
        let mut regen = MockCodeRegenerator::new();
        regen.expect_regenerate().returning(|_, _, _, _| Ok("works".to_string()));

        let mut ctl = controller(dir.path(), 3, exec, traceback_oracle(), regen);
        let mut batch = units(&["broken", "fine"]);
        ctl.run(&mut batch).await.unwrap();

        assert_eq!(batch[0].ver_values().iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>(), vec![(0, 0), (1, 1)]);
        assert_eq!(batch[1].ver_values().get(&0), Some(&1));
        assert!(dir.path().join("code_generation_#0").join("1_plot.png").exists());
        assert!(dir.path().join("0_plot.png").exists());
    }

    #[tokio::test]
    async fn executor_faults_abort_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut exec = MockCodeExecutor::new();
        exec.expect_execute().returning(|_, _| {
            Err(ExecutionError::Spawn {
                program: "python3".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            })
        });
        let mut ctl = controller(dir.path(), 3, exec, MockRegenerationOracle::new(), MockCodeRegenerator::new());
        let err = ctl.run(&mut units(&["a"])).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Execution(ExecutionError::Spawn { .. })));
    }

    #[tokio::test]
    async fn oracle_faults_abort_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut oracle = MockRegenerationOracle::new();
        oracle
            .expect_should_regenerate()
            .returning(|_, _| Err(LlmError::EmptyResponse("decide".into())));
        let mut ctl = controller(dir.path(), 3, tracing_executor(), oracle, MockCodeRegenerator::new());
        let err = ctl.run(&mut units(&["broken"])).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Llm(LlmError::EmptyResponse(_))));
    }

    #[test]
    fn decision_strings_match_graph_edges() {
        assert_eq!(LoopDecision::RegenerateCode.to_string(), "regenerate_code");
        assert_eq!(LoopDecision::Evaluate.as_str(), "evaluate");
        assert_eq!(LoopDecision::End.as_str(), "end");
    }
}
