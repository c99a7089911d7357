use lambdasheet_engine::formula;
use serde::Serialize;
use tracing::debug;

use super::Sheet;

/// Outcome counts of one calculation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CalcSummary {
    pub evaluated: usize,
    pub failed: usize,
}

impl Sheet {
    /// Evaluate every formula cell once, in insertion order.
    ///
    /// A failing formula stores its error in the cell and never stops the
    /// pass. Calling this again re-evaluates every formula from scratch.
    #[tracing::instrument(skip(self), fields(formulas = self.formulas.len()))]
    pub fn calculate(&mut self) -> CalcSummary {
        let mut summary = CalcSummary::default();
        for at in &self.formulas {
            let Some(cell) = self.cells.get_mut(at) else {
                continue;
            };
            let result = formula::calculate(&cell.input, &self.env);
            match &result {
                Ok(value) => debug!(cell = %at, value, "formula evaluated"),
                Err(e) => {
                    debug!(cell = %at, error = %e, "formula failed");
                    summary.failed += 1;
                }
            }
            cell.resolve(result);
            summary.evaluated += 1;
        }
        summary
    }
}
