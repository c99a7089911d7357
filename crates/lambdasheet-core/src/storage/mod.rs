//! Bulk import and export.

mod tsv;

pub use tsv::{load_tsv, parse_tsv, save_tsv, tsv_cells, write_tsv};
