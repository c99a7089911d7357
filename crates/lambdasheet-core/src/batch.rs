//! The batch boundary: a list of raw cell inputs in, their outputs out.
//!
//! This is the shape a request/response layer hands to the core. Every call
//! builds and discards its own [`Sheet`].

use lambdasheet_engine::engine::SheetBounds;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::sheet::Sheet;

/// One raw cell as supplied by a caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellInput {
    pub column: String,
    pub row: i64,
    pub value: String,
}

impl CellInput {
    pub fn new(column: &str, row: i64, value: &str) -> Self {
        CellInput {
            column: column.to_string(),
            row,
            value: value.to_string(),
        }
    }
}

/// One computed cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellOutput {
    /// Canonical uppercase column letters.
    pub column: String,
    pub row: u32,
    pub input: String,
    pub output: String,
}

/// Add every input to a fresh sheet, calculate it, and report each cell.
///
/// Outputs follow input order. The first input that cannot be added aborts
/// the call with [`SheetError::Item`](crate::SheetError::Item) naming its
/// zero-based position.
pub fn calculate_cells(inputs: &[CellInput], bounds: SheetBounds) -> Result<Vec<CellOutput>> {
    let mut sheet = build_sheet(inputs, bounds)?;
    let summary = sheet.calculate();
    debug!(
        cells = sheet.len(),
        evaluated = summary.evaluated,
        failed = summary.failed,
        "batch calculated"
    );
    Ok(outputs(&sheet))
}

/// Add every input to a fresh sheet without calculating it.
pub fn build_sheet(inputs: &[CellInput], bounds: SheetBounds) -> Result<Sheet> {
    let mut sheet = Sheet::new(bounds);
    for (index, item) in inputs.iter().enumerate() {
        sheet
            .add_cell(&item.column, item.row, &item.value)
            .map_err(|e| e.at_item(index))?;
    }
    Ok(sheet)
}

/// Snapshot every cell of a sheet in insertion order.
pub fn outputs(sheet: &Sheet) -> Vec<CellOutput> {
    sheet
        .cells()
        .map(|(at, cell)| CellOutput {
            column: at.column(),
            row: at.row,
            input: cell.input.clone(),
            output: cell.output().unwrap_or_default(),
        })
        .collect()
}
