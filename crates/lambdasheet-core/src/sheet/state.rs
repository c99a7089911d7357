use std::collections::HashMap;

use lambdasheet_engine::engine::{Cell, CellRef, Environment, SheetBounds};

/// The cells of one spreadsheet plus the environment their formulas see.
///
/// A sheet is owned by a single caller for its whole life: all cells are
/// added before [`Sheet::calculate`] runs, and a new sheet is built for
/// every independent computation.
#[derive(Clone, Debug)]
pub struct Sheet {
    pub(crate) bounds: SheetBounds,
    pub(crate) cells: HashMap<CellRef, Cell>,
    /// Every address, in insertion order.
    pub(crate) order: Vec<CellRef>,
    /// Formula addresses, in insertion order.
    pub(crate) formulas: Vec<CellRef>,
    pub(crate) env: Environment,
}

impl Sheet {
    /// Create an empty sheet with the given address bounds.
    pub fn new(bounds: SheetBounds) -> Self {
        Sheet {
            bounds,
            cells: HashMap::new(),
            order: Vec::new(),
            formulas: Vec::new(),
            env: Environment::new(),
        }
    }

    pub fn bounds(&self) -> SheetBounds {
        self.bounds
    }

    /// The symbols formulas on this sheet are evaluated against.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn formula_count(&self) -> usize {
        self.formulas.len()
    }

    /// All cells in the order they were added.
    pub fn cells(&self) -> impl Iterator<Item = (CellRef, &Cell)> {
        self.order
            .iter()
            .filter_map(|at| self.cells.get(at).map(|cell| (*at, cell)))
    }
}

impl Default for Sheet {
    fn default() -> Self {
        Self::new(SheetBounds::INTERACTIVE)
    }
}
