//! Visualization goals and the mutable per-goal units the loop works on.

use std::{collections::BTreeMap, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::responses::JudgeVerdict;

pub const STDOUT_SENTINEL: &str = "No output from generated code.";
pub const STDERR_SENTINEL: &str = "No errors from generated code.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualizationGoal {
    #[serde(default)]
    pub index: usize,
    pub question: String,
    pub visualization: String,
    pub rationale: String,
}

impl fmt::Display for VisualizationGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} (visualization: {}; rationale: {})",
            self.index, self.question, self.visualization, self.rationale
        )
    }
}

/// Re-number goals 0..N in their current order so file prefixes are unique.
pub fn renumber(goals: &mut [VisualizationGoal]) {
    for (i, goal) in goals.iter_mut().enumerate() {
        goal.index = i;
    }
}

/// State for one goal. `regeneration_history` is append-only; its last entry is
/// the current verdict.
#[derive(Debug, Clone)]
pub struct VisualizationUnit {
    goal: Arc<VisualizationGoal>,
    code: String,
    stdout: String,
    stderr: String,
    regeneration_history: Vec<bool>,
    regeneration_attempts: usize,
    ver_values: BTreeMap<usize, usize>,
    pub judge_result: Option<JudgeVerdict>,
}

impl VisualizationUnit {
    pub fn new(goal: Arc<VisualizationGoal>, code: impl Into<String>) -> Self {
        Self {
            goal,
            code: code.into(),
            stdout: STDOUT_SENTINEL.to_string(),
            stderr: STDERR_SENTINEL.to_string(),
            regeneration_history: Vec::new(),
            regeneration_attempts: 0,
            ver_values: BTreeMap::new(),
            judge_result: None,
        }
    }

    pub fn goal(&self) -> &VisualizationGoal {
        &self.goal
    }

    pub fn index(&self) -> usize {
        self.goal.index
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn regeneration_history(&self) -> &[bool] {
        &self.regeneration_history
    }

    /// How often this unit's code was replaced by the regenerator.
    pub fn regeneration_attempts(&self) -> usize {
        self.regeneration_attempts
    }

    /// Images produced per loop cycle, keyed by cycle number.
    pub fn ver_values(&self) -> &BTreeMap<usize, usize> {
        &self.ver_values
    }

    /// Store the captured streams, substituting the sentinels for blank text.
    pub fn record_execution(&mut self, stdout: &str, stderr: &str) {
        self.stdout = if stdout.trim().is_empty() {
            STDOUT_SENTINEL.to_string()
        } else {
            stdout.to_string()
        };
        self.stderr = if stderr.trim().is_empty() {
            STDERR_SENTINEL.to_string()
        } else {
            stderr.to_string()
        };
    }

    /// False when both streams are blank or exactly their sentinel.
    pub fn has_output(&self) -> bool {
        is_meaningful(&self.stdout, STDOUT_SENTINEL) || is_meaningful(&self.stderr, STDERR_SENTINEL)
    }

    pub fn record_verdict(&mut self, needs_regeneration: bool) {
        self.regeneration_history.push(needs_regeneration);
    }

    pub fn needs_regeneration(&self) -> bool {
        self.regeneration_history.last().copied().unwrap_or(false)
    }

    /// Replace the code wholesale after a regeneration. The verdict is left
    /// untouched until the next decision pass.
    pub fn apply_regenerated_code(&mut self, code: String) {
        self.code = code;
        self.regeneration_attempts += 1;
    }

    /// Replace the code without counting a regeneration (refactoring).
    pub fn replace_code(&mut self, code: String) {
        self.code = code;
    }

    pub fn record_images(&mut self, cycle: usize, count: usize) {
        self.ver_values.insert(cycle, count);
    }
}

fn is_meaningful(text: &str, sentinel: &str) -> bool {
    let t = text.trim();
    !t.is_empty() && t != sentinel
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal(index: usize) -> Arc<VisualizationGoal> {
        Arc::new(VisualizationGoal {
            index,
            question: "How are prices distributed?".into(),
            visualization: "histogram".into(),
            rationale: "price is numeric".into(),
        })
    }

    #[test]
    fn blank_streams_become_sentinels() {
        let mut unit = VisualizationUnit::new(goal(0), "print(1)");
        unit.record_execution("", "  \n");
        assert_eq!(unit.stdout(), STDOUT_SENTINEL);
        assert_eq!(unit.stderr(), STDERR_SENTINEL);
        assert!(!unit.has_output());
    }

    #[test]
    fn any_real_text_counts_as_output() {
        let mut unit = VisualizationUnit::new(goal(0), "print(1)");
        unit.record_execution("", "FutureWarning: use observed=True");
        assert!(unit.has_output());
        unit.record_execution("saved 0_hist.png", "");
        assert!(unit.has_output());
    }

    #[test]
    fn latest_verdict_is_authoritative() {
        let mut unit = VisualizationUnit::new(goal(1), "x");
        assert!(!unit.needs_regeneration());
        unit.record_verdict(true);
        unit.record_verdict(false);
        assert_eq!(unit.regeneration_history(), &[true, false]);
        assert!(!unit.needs_regeneration());
    }

    #[test]
    fn regeneration_keeps_verdict_and_counts_attempts() {
        let mut unit = VisualizationUnit::new(goal(1), "broken");
        unit.record_verdict(true);
        unit.apply_regenerated_code("fixed".into());
        assert_eq!(unit.code(), "fixed");
        assert_eq!(unit.regeneration_attempts(), 1);
        assert!(unit.needs_regeneration());

        unit.replace_code("refactored".into());
        assert_eq!(unit.regeneration_attempts(), 1);
    }

    #[test]
    fn renumber_assigns_positions() {
        let mut goals = vec![(*goal(7)).clone(), (*goal(7)).clone()];
        renumber(&mut goals);
        assert_eq!(goals.iter().map(|g| g.index).collect::<Vec<_>>(), vec![0, 1]);
    }
}
