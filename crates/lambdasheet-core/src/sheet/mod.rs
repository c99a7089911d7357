//! Sheet state and orchestration.
//!
//! A [`Sheet`] is filled with [`Sheet::add_cell`] and then evaluated once
//! with [`Sheet::calculate`]. Number cells are bound into the sheet's
//! environment as they are added; formula cells only read that environment.

mod calc;
mod ops;
mod state;

pub use calc::CalcSummary;
pub use state::Sheet;
