//! Spreadsheet engine API.
//!
//! - [`Cell`], [`CellType`], [`Evaluation`] - what a cell holds
//! - [`CellRef`], [`SheetBounds`] - column-letter addressing and its limits
//! - [`Environment`] - the symbols a formula may reference
//! - [`format_number`] - canonical text for numeric outputs

mod cell;
mod cell_ref;
mod env;
mod format;

pub use cell::{Cell, CellType, Evaluation, FORMULA_MARKER, parse_number};
pub use cell_ref::{
    AddressError, CellRef, SheetBounds, column_to_number, number_to_column, validate_column,
    validate_row,
};
pub use env::{Binding, BoundCell, Builtin, Environment, SLICER_SYMBOL};
pub use format::format_number;
