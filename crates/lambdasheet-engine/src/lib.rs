//! lambdasheet-engine - cell addressing, the formula language and its
//! evaluation environment.

pub mod engine;
pub mod formula;

pub use engine::{Cell, CellRef, Environment, SheetBounds};
pub use formula::{FormulaError, calculate};
