//! Run statistics: stage timings, LLM usage, VER per cycle and evaluation scores.

use std::{
    collections::BTreeSet,
    fmt::Write as _,
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::{DateTime, Local};

use crate::{
    handlers::evaluate::EvaluationRecord,
    llm::LlmCallRecord,
    process::InterpreterType,
    utils::truncate_chars,
    visualization::VisualizationUnit,
    workflow::{LoopDecision, LoopOutcome},
};

#[derive(Debug, Clone, PartialEq)]
pub struct StageTiming {
    pub name: String,
    pub duration: Duration,
}

impl StageTiming {
    pub fn new(name: impl Into<String>, duration: Duration) -> Self {
        Self { name: name.into(), duration }
    }
}

/// Visualization error rate inputs for one execution cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerSummary {
    pub cycle: usize,
    pub units: usize,
    pub no_image: usize,
    pub exactly_one: usize,
    pub at_least_one: usize,
}

impl VerSummary {
    fn ratio(&self, n: usize) -> f64 {
        if self.units == 0 {
            0.0
        } else {
            n as f64 / self.units as f64
        }
    }

    /// Share of units that produced no image, i.e. the error rate.
    pub fn no_image_ratio(&self) -> f64 {
        self.ratio(self.no_image)
    }

    pub fn exactly_one_ratio(&self) -> f64 {
        self.ratio(self.exactly_one)
    }

    pub fn at_least_one_ratio(&self) -> f64 {
        self.ratio(self.at_least_one)
    }
}

pub fn ver_summaries(units: &[VisualizationUnit]) -> Vec<VerSummary> {
    let cycles: BTreeSet<usize> = units.iter().flat_map(|u| u.ver_values().keys().copied()).collect();
    cycles
        .into_iter()
        .map(|cycle| {
            let counts: Vec<usize> = units.iter().filter_map(|u| u.ver_values().get(&cycle).copied()).collect();
            VerSummary {
                cycle,
                units: counts.len(),
                no_image: counts.iter().filter(|&&c| c == 0).count(),
                exactly_one: counts.iter().filter(|&&c| c == 1).count(),
                at_least_one: counts.iter().filter(|&&c| c >= 1).count(),
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct RunStatistics {
    pub dataset: PathBuf,
    pub programming_language: InterpreterType,
    pub finished: DateTime<Local>,
    pub total_duration: Duration,
    pub stages: Vec<StageTiming>,
    pub llm_calls: Vec<LlmCallRecord>,
    pub ver: Vec<VerSummary>,
    pub evaluations: Vec<EvaluationRecord>,
    pub decisions: Vec<LoopDecision>,
    pub outcome: Option<LoopOutcome>,
    pub units: usize,
}

impl RunStatistics {
    pub fn total_tokens(&self) -> u64 {
        self.llm_calls.iter().map(|c| c.usage.total_tokens).sum()
    }

    pub fn total_cost(&self) -> f64 {
        self.llm_calls.iter().filter_map(|c| c.usage.cost).sum()
    }

    pub fn file_name(&self) -> String {
        format!("statistics_{}.txt", self.finished.format("%Y-%m-%d_%H-%M-%S"))
    }

    fn outcome_text(&self) -> &'static str {
        match self.outcome {
            Some(LoopOutcome::AllPassing) => "all visualizations passing",
            Some(LoopOutcome::BudgetExhausted) => "stopped at the regeneration attempt ceiling",
            None => "loop did not finish",
        }
    }

    pub fn render(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "Dataset: {}", self.dataset.display());
        let _ = writeln!(s, "Programming language: {}", self.programming_language.display_name());
        let _ = writeln!(s, "Finished: {}", self.finished.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(s, "Total duration: {:.2}s", self.total_duration.as_secs_f64());
        let _ = writeln!(s, "Total tokens: {}", self.total_tokens());
        let _ = writeln!(s, "Total cost: {:.6}", self.total_cost());
        let _ = writeln!(s, "Visualizations: {}", self.units);
        let edges: Vec<&str> = self.decisions.iter().map(|d| d.as_str()).collect();
        let _ = writeln!(s, "Loop exits: {}", edges.join(" -> "));
        let _ = writeln!(s, "Loop outcome: {}", self.outcome_text());

        let _ = writeln!(s, "\nStages:");
        for stage in &self.stages {
            let _ = writeln!(s, "  {:<24} {:>9.2}s", stage.name, stage.duration.as_secs_f64());
        }

        let _ = writeln!(s, "\nLLM calls:");
        for call in &self.llm_calls {
            let _ = writeln!(
                s,
                "  {:<24} {:<28} prompt={} completion={} total={} cost={}{}",
                call.method,
                call.model,
                call.usage.prompt_tokens,
                call.usage.completion_tokens,
                call.usage.total_tokens,
                call.usage.cost.map(|c| format!("{c:.6}")).unwrap_or_else(|| "-".into()),
                if call.cached { " (cached)" } else { "" }
            );
        }

        let _ = writeln!(s, "\nVER per execution cycle:");
        for v in &self.ver {
            let _ = writeln!(
                s,
                "  cycle {}: no image {}/{} ({:.2}), exactly one {}/{} ({:.2}), one or more {}/{} ({:.2})",
                v.cycle,
                v.no_image,
                v.units,
                v.no_image_ratio(),
                v.exactly_one,
                v.units,
                v.exactly_one_ratio(),
                v.at_least_one,
                v.units,
                v.at_least_one_ratio()
            );
        }

        let _ = writeln!(s, "\nEvaluations:");
        for e in &self.evaluations {
            let _ = writeln!(
                s,
                "  #{} {} {}: total {}/60, average {:.2}/10",
                e.vis_index,
                e.phase,
                e.model,
                e.evaluation.total(),
                e.evaluation.average()
            );
            for (name, score) in e.evaluation.scores() {
                let _ = writeln!(s, "    {:<15} {:>2}  {}", name, score.score, truncate_chars(&score.rationale, 160));
            }
        }
        s
    }

    /// Short Markdown summary for the terminal.
    pub fn render_markdown(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "# Run summary\n");
        let _ = writeln!(s, "* **Outcome**: {}", self.outcome_text());
        let _ = writeln!(s, "* **Visualizations**: {}", self.units);
        let _ = writeln!(s, "* **Duration**: {:.1}s", self.total_duration.as_secs_f64());
        let _ = writeln!(s, "* **Tokens**: {} (cost {:.4})", self.total_tokens(), self.total_cost());
        if let Some(last) = self.ver.last() {
            let _ = writeln!(
                s,
                "* **Images in last cycle**: {}/{} visualizations produced at least one",
                last.at_least_one, last.units
            );
        }
        if !self.evaluations.is_empty() {
            let _ = writeln!(s, "\n| # | phase | model | total |\n|-|-|-|-|");
            for e in &self.evaluations {
                let _ = writeln!(s, "| {} | {} | {} | {}/60 |", e.vis_index, e.phase, e.model, e.evaluation.total());
            }
        }
        s
    }

    /// Write the report into `dir` and return the file path.
    pub fn write(&self, dir: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        fs::write(&path, self.render())?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;

    use super::*;
    use crate::{llm::Usage, visualization::VisualizationGoal};

    fn unit(index: usize, images: &[(usize, usize)]) -> VisualizationUnit {
        let goal = VisualizationGoal {
            index,
            question: "q".into(),
            visualization: "bar".into(),
            rationale: "r".into(),
        };
        let mut u = VisualizationUnit::new(Arc::new(goal), "code");
        for (cycle, count) in images {
            u.record_images(*cycle, *count);
        }
        u
    }

    #[test]
    fn ver_counts_per_cycle() {
        let units = vec![unit(0, &[(0, 0), (1, 1)]), unit(1, &[(0, 2), (1, 1)]), unit(2, &[(0, 1)])];
        let ver = ver_summaries(&units);
        assert_eq!(
            ver[0],
            VerSummary { cycle: 0, units: 3, no_image: 1, exactly_one: 1, at_least_one: 2 }
        );
        assert_eq!(ver[1].units, 2);
        assert_eq!(ver[1].exactly_one, 2);
        assert!((ver[0].no_image_ratio() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn report_is_named_by_timestamp_and_sums_usage() {
        let stats = RunStatistics {
            dataset: "data.csv".into(),
            programming_language: InterpreterType::Python,
            finished: Local.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap(),
            total_duration: Duration::from_secs(3),
            stages: vec![StageTiming::new("generate_code", Duration::from_millis(1500))],
            llm_calls: vec![
                LlmCallRecord {
                    method: "generate_code".into(),
                    model: "gpt-5".into(),
                    usage: Usage { prompt_tokens: 10, completion_tokens: 5, total_tokens: 15, cost: Some(0.5) },
                    cached: false,
                },
                LlmCallRecord {
                    method: "decide_regeneration".into(),
                    model: "gpt-4o".into(),
                    usage: Usage { total_tokens: 5, cost: Some(0.25), ..Default::default() },
                    cached: false,
                },
            ],
            ver: Vec::new(),
            evaluations: Vec::new(),
            decisions: vec![LoopDecision::Evaluate],
            outcome: Some(LoopOutcome::BudgetExhausted),
            units: 1,
        };
        assert_eq!(stats.file_name(), "statistics_2025-03-04_05-06-07.txt");
        assert_eq!(stats.total_tokens(), 20);
        assert!((stats.total_cost() - 0.75).abs() < 1e-9);

        let text = stats.render();
        assert!(text.contains("Loop outcome: stopped at the regeneration attempt ceiling"));
        assert!(text.contains("Loop exits: evaluate"));

        let dir = tempfile::tempdir().unwrap();
        let path = stats.write(dir.path()).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), text);
    }
}
