//! Error types for lambdasheet core.

use thiserror::Error;

use lambdasheet_engine::engine::{AddressError, CellRef};

/// Errors raised while building or loading a sheet.
///
/// Formula failures are not here: they are stored in the failing cell.
#[derive(Error, Debug)]
pub enum SheetError {
    #[error(transparent)]
    OutOfRange(#[from] AddressError),

    #[error("Cell {0} already exists")]
    DuplicateCell(CellRef),

    /// An add-time failure attributed to its position in a batch.
    #[error("Error while adding cell #{index}: {source}")]
    Item {
        index: usize,
        #[source]
        source: Box<SheetError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

impl SheetError {
    /// Attach a batch position to an add-time error.
    pub fn at_item(self, index: usize) -> SheetError {
        SheetError::Item {
            index,
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, SheetError>;
