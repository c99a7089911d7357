//! The evaluation environment: every symbol a formula may reference.
//!
//! Bindings come from three places:
//! - Number cells, bound under their lowercase name (`a1`)
//! - the reducer built-ins `sum`, `min` and `max`
//! - the range slicer, bound under [`SLICER_SYMBOL`]
//!
//! Formula results are never bound, so formulas cannot see each other.

use std::collections::HashMap;

use super::cell_ref::CellRef;
use crate::formula::{FormulaError, Value};

/// Symbol the range slicer is bound under: `s[a1:b3]`.
pub const SLICER_SYMBOL: &str = "s";

/// Reducer functions available to every formula.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    Sum,
    Min,
    Max,
}

impl Builtin {
    pub const ALL: [Builtin; 3] = [Builtin::Sum, Builtin::Min, Builtin::Max];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Sum => "sum",
            Builtin::Min => "min",
            Builtin::Max => "max",
        }
    }
}

/// A cell's numeric value together with its address.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundCell {
    pub value: f64,
    pub at: CellRef,
}

/// What a symbol is bound to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Binding {
    Cell(BoundCell),
    Builtin(Builtin),
    Slicer,
}

impl Binding {
    pub fn to_value(self) -> Value {
        match self {
            Binding::Cell(cell) => Value::Cell(cell),
            Binding::Builtin(builtin) => Value::Builtin(builtin),
            Binding::Slicer => Value::Slicer,
        }
    }
}

/// Symbol table shared by every formula of a sheet.
#[derive(Clone, Debug)]
pub struct Environment {
    symbols: HashMap<String, Binding>,
    cells: HashMap<CellRef, f64>,
}

impl Environment {
    /// An environment holding only the built-ins and the slicer.
    pub fn new() -> Self {
        let mut symbols = HashMap::new();
        for builtin in Builtin::ALL {
            symbols.insert(builtin.name().to_string(), Binding::Builtin(builtin));
        }
        symbols.insert(SLICER_SYMBOL.to_string(), Binding::Slicer);
        Environment {
            symbols,
            cells: HashMap::new(),
        }
    }

    /// Bind a Number cell's value under its symbol name.
    pub fn bind_cell(&mut self, at: CellRef, value: f64) {
        self.symbols
            .insert(at.symbol(), Binding::Cell(BoundCell { value, at }));
        self.cells.insert(at, value);
    }

    pub fn lookup(&self, name: &str) -> Option<Binding> {
        self.symbols.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// Every bound symbol name, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(String::as_str)
    }

    /// The value bound for the cell at `at`, if any.
    pub fn cell_value(&self, at: &CellRef) -> Option<f64> {
        self.cells.get(at).copied()
    }

    /// Number of bound cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Evaluate the slicer subscript `s[start:stop:step]`.
    ///
    /// Both endpoints must be values read from cell bindings and no step may
    /// be given.
    pub fn slice(
        &self,
        start: &Value,
        stop: &Value,
        step: &Value,
    ) -> Result<Vec<Value>, FormulaError> {
        let Value::Cell(from) = start else {
            return Err(FormulaError::range(format!(
                "start of range must be a cell value, not {}",
                start.type_name()
            )));
        };
        let Value::Cell(to) = stop else {
            return Err(FormulaError::range(format!(
                "end of range must be a cell value, not {}",
                stop.type_name()
            )));
        };
        if *step != Value::None {
            return Err(FormulaError::range("step is not supported"));
        }
        let cells = self.range(from.at, to.at)?;
        Ok(cells.into_iter().map(Value::Cell).collect())
    }

    /// Every bound cell in the rectangle spanned by two corners, column by
    /// column, each column top to bottom.
    pub fn range(&self, a: CellRef, b: CellRef) -> Result<Vec<BoundCell>, FormulaError> {
        let (col_lo, col_hi) = (a.col.min(b.col), a.col.max(b.col));
        let (row_lo, row_hi) = (a.row.min(b.row), a.row.max(b.row));

        let mut out = Vec::new();
        for col in col_lo..=col_hi {
            for row in row_lo..=row_hi {
                let at = CellRef::new(col, row);
                let value = self
                    .cell_value(&at)
                    .ok_or(FormulaError::MissingBinding(at))?;
                out.push(BoundCell { value, at });
            }
        }
        Ok(out)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
