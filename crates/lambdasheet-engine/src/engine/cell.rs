//! Cell data structures.
//!
//! - [`CellType`] - what the raw input was classified as
//! - [`Evaluation`] - the state of a formula cell's result
//! - [`Cell`] - the raw input together with its classification

use serde::{Deserialize, Serialize};

use super::format::format_number;
use crate::formula::FormulaError;

/// Inputs starting with this prefix are formulas.
pub const FORMULA_MARKER: &str = "lambda:";

/// Result of evaluating a formula cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Evaluation {
    /// Not evaluated yet.
    Deferred,
    Value(f64),
    Error(FormulaError),
}

/// The classification of a cell's input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CellType {
    Text,
    Number(f64),
    Formula(Evaluation),
}

/// A cell: the raw input text and what it was classified as.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub input: String,
    pub contents: CellType,
}

impl Cell {
    pub fn new_text(input: &str) -> Cell {
        Cell {
            input: input.to_string(),
            contents: CellType::Text,
        }
    }

    pub fn new_number(input: &str, n: f64) -> Cell {
        Cell {
            input: input.to_string(),
            contents: CellType::Number(n),
        }
    }

    pub fn new_formula(input: &str) -> Cell {
        Cell {
            input: input.to_string(),
            contents: CellType::Formula(Evaluation::Deferred),
        }
    }

    /// Classify raw input text. Never fails.
    /// - Parses as a floating-point number -> Number
    /// - Starts with [`FORMULA_MARKER`] -> Formula (deferred)
    /// - Otherwise -> Text, kept verbatim
    pub fn from_input(input: &str) -> Cell {
        if let Some(n) = parse_number(input) {
            return Cell::new_number(input, n);
        }
        if input.starts_with(FORMULA_MARKER) {
            return Cell::new_formula(input);
        }
        Cell::new_text(input)
    }

    pub fn is_formula(&self) -> bool {
        matches!(self.contents, CellType::Formula(_))
    }

    /// Numeric value of a Number cell or an evaluated Formula cell.
    pub fn value(&self) -> Option<f64> {
        match &self.contents {
            CellType::Number(n) | CellType::Formula(Evaluation::Value(n)) => Some(*n),
            _ => None,
        }
    }

    /// The evaluation error of a failed Formula cell.
    pub fn error(&self) -> Option<&FormulaError> {
        match &self.contents {
            CellType::Formula(Evaluation::Error(e)) => Some(e),
            _ => None,
        }
    }

    /// Display text for the cell; `None` while a formula is deferred.
    pub fn output(&self) -> Option<String> {
        match &self.contents {
            CellType::Text => Some(self.input.clone()),
            CellType::Number(n) => Some(format_number(*n)),
            CellType::Formula(Evaluation::Deferred) => None,
            CellType::Formula(Evaluation::Value(n)) => Some(format_number(*n)),
            CellType::Formula(Evaluation::Error(e)) => Some(e.to_string()),
        }
    }

    /// Store the result of evaluating this formula cell.
    /// Has no effect on Text and Number cells.
    pub fn resolve(&mut self, result: Result<f64, FormulaError>) {
        if let CellType::Formula(evaluation) = &mut self.contents {
            *evaluation = match result {
                Ok(n) => Evaluation::Value(n),
                Err(e) => Evaluation::Error(e),
            };
        }
    }

    /// Short name of the cell's classification, for logs.
    pub fn kind(&self) -> &'static str {
        match self.contents {
            CellType::Text => "text",
            CellType::Number(_) => "number",
            CellType::Formula(_) => "formula",
        }
    }
}

/// Parse `text` as a floating-point literal, ignoring surrounding whitespace.
/// Single underscores between digits group them, as in `1_000`.
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if !text.contains('_') {
        return text.parse::<f64>().ok();
    }
    let bytes = text.as_bytes();
    let grouped = bytes.iter().enumerate().all(|(i, &b)| {
        b != b'_'
            || (i > 0
                && bytes[i - 1].is_ascii_digit()
                && bytes.get(i + 1).is_some_and(u8::is_ascii_digit))
    });
    if !grouped {
        return None;
    }
    text.replace('_', "").parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_detection() {
        let formula = |s: &str| Cell::from_input(s).is_formula();
        assert!(formula("lambda: 2 + 2"));
        assert!(formula("lambda: (2 + 2) * 2"));
        assert!(!formula("lambda ..."));
        assert!(!formula("Test"));
        assert!(!formula("def test():\n  print('test')"));

        assert_eq!(Cell::from_input("123").contents, CellType::Number(123.0));
        assert_eq!(Cell::from_input(".1").contents, CellType::Number(0.1));
        assert_eq!(Cell::from_input("100.123").contents, CellType::Number(100.123));
        assert_eq!(Cell::from_input(" 7 ").contents, CellType::Number(7.0));
        assert_eq!(Cell::from_input("0").contents, CellType::Number(0.0));
    }

    #[test]
    fn test_digit_grouping_underscores() {
        assert_eq!(parse_number("1_000"), Some(1000.0));
        assert_eq!(parse_number(" 1_000.2_5 "), Some(1000.25));
        assert_eq!(parse_number("1e1_0"), Some(1e10));
        for text in ["_1", "1_", "1__0", "1_.5", "1._5", "1_e3", "_"] {
            assert_eq!(parse_number(text), None, "{text:?}");
        }
        assert_eq!(Cell::from_input("1_000").contents, CellType::Number(1000.0));
        assert_eq!(Cell::from_input("1_000").output().as_deref(), Some("1000.0"));
    }

    #[test]
    fn test_number_output_is_canonical() {
        let cell = Cell::from_input("2");
        assert_eq!(cell.output().as_deref(), Some("2.0"));
        assert_eq!(cell.input, "2");
        assert_eq!(Cell::from_input("1e3").output().as_deref(), Some("1000.0"));
    }

    #[test]
    fn test_text_output_is_verbatim() {
        for text in ["test", "  padded  ", "", "Lambda: 1", "1,000"] {
            let cell = Cell::from_input(text);
            assert_eq!(cell.contents, CellType::Text);
            assert_eq!(cell.output().as_deref(), Some(text));
        }
    }

    #[test]
    fn test_formula_output_lifecycle() {
        let mut cell = Cell::from_input("lambda: 1");
        assert_eq!(cell.output(), None);
        assert_eq!(cell.value(), None);

        cell.resolve(Ok(1.0));
        assert_eq!(cell.output().as_deref(), Some("1.0"));
        assert_eq!(cell.value(), Some(1.0));

        cell.resolve(Err(FormulaError::UnknownSymbol("b2".into())));
        assert_eq!(cell.value(), None);
        assert_eq!(cell.output().as_deref(), Some("Unknown symbol: b2"));
        assert!(cell.error().is_some());
    }

    #[test]
    fn test_resolve_ignores_non_formula_cells() {
        let mut cell = Cell::from_input("5");
        cell.resolve(Ok(9.0));
        assert_eq!(cell.value(), Some(5.0));
    }
}
