//! Cell reference parsing, formatting and bounds checking.
//!
//! Columns are bijective base-26 numerals: there is no digit for zero, so
//! `A` is 1, `Z` is 26 and `AA` is 27. Rows are 1-based.
//!
//! # Examples
//!
//! ```
//! use lambdasheet_engine::engine::CellRef;
//!
//! let cell = CellRef::from_str("B3").unwrap();
//! assert_eq!(cell.col, 2);
//! assert_eq!(cell.row, 3);
//! assert_eq!(cell.to_string(), "B3");
//! assert_eq!(cell.symbol(), "b3");
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

const ALPHABET_LEN: u64 = 26;

/// Errors raised while validating a cell address against sheet bounds.
///
/// All variants belong to the "out of range" category: the address is
/// rejected before anything is stored.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("Column '{0}' not in valid format ([A-Z]+)")]
    InvalidColumn(String),

    #[error("Column out of range (A-{max})")]
    ColumnOutOfRange { max: String },

    #[error("Row out of range (1-{max})")]
    RowOutOfRange { max: u32 },
}

/// A reference to a cell by 1-based column and row numbers.
///
/// Ordering is column-major, the same order range slices are produced in.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CellRef {
    pub col: u32,
    pub row: u32,
}

impl CellRef {
    pub fn new(col: u32, row: u32) -> CellRef {
        CellRef { col, row }
    }

    /// Parse a cell reference from A1 notation (e.g. "A1", "b2", "AA10").
    /// Returns None if the input is invalid.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(name: &str) -> Option<CellRef> {
        Self::parse_a1(name)
    }

    fn parse_a1(name: &str) -> Option<CellRef> {
        let caps = a1_re().captures(name)?;
        let col = column_to_number(&caps["letters"])?;
        let row = caps["numbers"].parse::<u32>().ok()?;
        if row == 0 {
            return None;
        }
        Some(CellRef::new(col, row))
    }

    /// Column letters in canonical (uppercase) form.
    pub fn column(&self) -> String {
        number_to_column(self.col)
    }

    /// The name this cell is bound under in an evaluation environment.
    pub fn symbol(&self) -> String {
        self.to_string().to_ascii_lowercase()
    }
}

impl std::str::FromStr for CellRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_a1(s).ok_or_else(|| format!("Invalid cell reference: {}", s))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", number_to_column(self.col), self.row)
    }
}

fn a1_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?<letters>[A-Za-z]+)(?<numbers>[0-9]+)$")
            .expect("cell reference regex must compile")
    })
}

/// Interpret column letters as a bijective base-26 numeral (A=1, Z=26, AA=27).
///
/// Letters are case-insensitive. Returns None for an empty string, a
/// non-letter character, or a column that does not fit in `u32`.
pub fn column_to_number(column: &str) -> Option<u32> {
    if column.is_empty() {
        return None;
    }
    let mut acc = 0u64;
    for c in column.bytes() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() - b'A') as u64 + 1;
        acc = acc * ALPHABET_LEN + digit;
        if acc > u32::MAX as u64 {
            return None;
        }
    }
    Some(acc as u32)
}

/// Convert a column number to letters (1 -> A, 26 -> Z, 27 -> AA).
///
/// Zero has no letter form and yields an empty string.
pub fn number_to_column(number: u32) -> String {
    let mut letters = Vec::new();
    let mut n = number as u64;
    while n > 0 {
        let rem = (n - 1) % ALPHABET_LEN;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / ALPHABET_LEN;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Check that `column` is well-formed letters whose number is in `1..max_columns`.
///
/// The configured maximum itself is rejected.
pub fn validate_column(column: &str, max_columns: u32) -> Result<u32, AddressError> {
    if column.is_empty() || !column.bytes().all(|c| c.is_ascii_alphabetic()) {
        return Err(AddressError::InvalidColumn(column.to_string()));
    }
    let out_of_range = || AddressError::ColumnOutOfRange {
        max: number_to_column(max_columns),
    };
    let number = column_to_number(column).ok_or_else(out_of_range)?;
    if (1..max_columns).contains(&number) {
        Ok(number)
    } else {
        Err(out_of_range())
    }
}

/// Check that `row` is in `1..max_rows`. The configured maximum itself is rejected.
pub fn validate_row(row: i64, max_rows: u32) -> Result<u32, AddressError> {
    if (1..max_rows as i64).contains(&row) {
        Ok(row as u32)
    } else {
        Err(AddressError::RowOutOfRange { max: max_rows })
    }
}

/// Per-sheet address bounds, fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SheetBounds {
    pub max_columns: u32,
    pub max_rows: u32,
}

impl SheetBounds {
    /// Bounds used for interactive sheets.
    pub const INTERACTIVE: SheetBounds = SheetBounds {
        max_columns: 26,
        max_rows: 100,
    };

    /// Bounds used for bulk imports.
    pub const BULK: SheetBounds = SheetBounds {
        max_columns: 1000,
        max_rows: 1000,
    };

    pub fn new(max_columns: u32, max_rows: u32) -> SheetBounds {
        SheetBounds {
            max_columns,
            max_rows,
        }
    }

    /// Validate a (column, row) pair and build its reference.
    pub fn validate(&self, column: &str, row: i64) -> Result<CellRef, AddressError> {
        let col = validate_column(column, self.max_columns)?;
        let row = validate_row(row, self.max_rows)?;
        Ok(CellRef::new(col, row))
    }
}

impl Default for SheetBounds {
    fn default() -> Self {
        SheetBounds::INTERACTIVE
    }
}
