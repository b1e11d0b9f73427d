//! Replacement code for a unit that failed.

use async_trait::async_trait;

use crate::{error::LlmError, visualization::VisualizationGoal};

/// Stateless per call: sees only the previous attempt and the goal. Returns
/// the new code; the caller owns every other field of the unit.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodeRegenerator: Send + Sync {
    async fn regenerate(
        &self,
        goal: &VisualizationGoal,
        code: &str,
        stdout: &str,
        stderr: &str,
    ) -> Result<String, LlmError>;
}
