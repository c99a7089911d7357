//! lambdasheet-core - UI-agnostic sheet orchestration, batch API and storage.

pub mod batch;
pub mod error;
pub mod sheet;
pub mod storage;

pub use batch::{CellInput, CellOutput, build_sheet, calculate_cells};
pub use error::{Result, SheetError};
pub use sheet::{CalcSummary, Sheet};

pub use lambdasheet_engine::engine::{Cell, CellRef, SheetBounds};
