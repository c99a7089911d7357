use lambdasheet_engine::engine::{Cell, CellRef, CellType, column_to_number};
use tracing::debug;

use super::Sheet;
use crate::error::{Result, SheetError};

impl Sheet {
    /// Classify `input` and store it at (`column`, `row`).
    ///
    /// Fails without touching the sheet if the address is out of bounds or
    /// already occupied. Number cells are bound into the environment right
    /// away; formulas wait for [`Sheet::calculate`].
    pub fn add_cell(&mut self, column: &str, row: i64, input: &str) -> Result<CellRef> {
        let at = self.bounds.validate(column, row)?;
        let cell = Cell::from_input(input);
        if self.cells.contains_key(&at) {
            return Err(SheetError::DuplicateCell(at));
        }
        debug!(cell = %at, kind = cell.kind(), "adding cell");

        match cell.contents {
            CellType::Number(n) => self.env.bind_cell(at, n),
            CellType::Formula(_) => self.formulas.push(at),
            CellType::Text => {}
        }
        self.cells.insert(at, cell);
        self.order.push(at);
        Ok(at)
    }

    /// Look a cell up by column letters (either case) and row.
    pub fn get_cell(&self, column: &str, row: i64) -> Option<&Cell> {
        let col = column_to_number(column)?;
        let row = u32::try_from(row).ok()?;
        self.get(&CellRef::new(col, row))
    }

    pub fn get(&self, at: &CellRef) -> Option<&Cell> {
        self.cells.get(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lambdasheet_engine::engine::{AddressError, SheetBounds};

    #[test]
    fn test_add_and_get() {
        let mut sheet = Sheet::default();
        let at = sheet.add_cell("b", 3, "hello").unwrap();
        assert_eq!(at, CellRef::new(2, 3));
        assert_eq!(sheet.get_cell("B", 3).unwrap().input, "hello");
        assert_eq!(sheet.get_cell("b", 3).unwrap().input, "hello");
        assert!(sheet.get_cell("b", 4).is_none());
        assert!(sheet.get_cell("", 3).is_none());
        assert!(sheet.get_cell("b", -3).is_none());
    }

    #[test]
    fn test_numbers_are_bound_immediately() {
        let mut sheet = Sheet::default();
        sheet.add_cell("A", 1, "2").unwrap();
        sheet.add_cell("A", 2, "lambda: a1").unwrap();
        sheet.add_cell("A", 3, "text").unwrap();
        assert_eq!(sheet.env().cell_value(&CellRef::new(1, 1)), Some(2.0));
        assert_eq!(sheet.env().cell_count(), 1);
        assert_eq!(sheet.formula_count(), 1);
        assert_eq!(sheet.len(), 3);
    }

    #[test]
    fn test_duplicate_leaves_first_cell() {
        let mut sheet = Sheet::default();
        sheet.add_cell("A", 1, "1").unwrap();
        let err = sheet.add_cell("a", 1, "2").unwrap_err();
        assert!(matches!(err, SheetError::DuplicateCell(at) if at == CellRef::new(1, 1)));
        assert_eq!(err.to_string(), "Cell A1 already exists");
        assert_eq!(sheet.get_cell("A", 1).unwrap().value(), Some(1.0));
        assert_eq!(sheet.env().cell_value(&CellRef::new(1, 1)), Some(1.0));
        assert_eq!(sheet.len(), 1);
    }

    #[test]
    fn test_out_of_range_is_not_stored() {
        let mut sheet = Sheet::new(SheetBounds::new(3, 3));
        assert!(matches!(
            sheet.add_cell("C", 1, "1"),
            Err(SheetError::OutOfRange(AddressError::ColumnOutOfRange { .. }))
        ));
        assert!(matches!(
            sheet.add_cell("A", 3, "1"),
            Err(SheetError::OutOfRange(AddressError::RowOutOfRange { max: 3 }))
        ));
        assert!(matches!(
            sheet.add_cell("A1", 1, "1"),
            Err(SheetError::OutOfRange(AddressError::InvalidColumn(_)))
        ));
        assert!(sheet.is_empty());
        assert_eq!(sheet.env().cell_count(), 0);
    }

    #[test]
    fn test_cells_iterate_in_insertion_order() {
        let mut sheet = Sheet::default();
        sheet.add_cell("C", 1, "x").unwrap();
        sheet.add_cell("A", 2, "y").unwrap();
        sheet.add_cell("B", 1, "z").unwrap();
        let order: Vec<String> = sheet.cells().map(|(at, _)| at.to_string()).collect();
        assert_eq!(order, vec!["C1", "A2", "B1"]);
    }
}
