//! Regeneration decision: does a unit's captured output show a real failure?

use async_trait::async_trait;
use tracing::debug;

use crate::{error::LlmError, visualization::VisualizationUnit};

/// Binary classifier over one unit's stdout/stderr.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegenerationOracle: Send + Sync {
    async fn should_regenerate(&self, stdout: &str, stderr: &str) -> Result<bool, LlmError>;
}

/// Consult the oracle for `unit`, unless it produced no output at all, in
/// which case the verdict is `false` without a call.
pub async fn decide(oracle: &dyn RegenerationOracle, unit: &VisualizationUnit) -> Result<bool, LlmError> {
    if !unit.has_output() {
        debug!(unit = unit.index(), "no output, skipping oracle");
        return Ok(false);
    }
    oracle.should_regenerate(unit.stdout(), unit.stderr()).await
}
