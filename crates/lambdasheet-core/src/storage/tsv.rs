//! TSV import/export.
//!
//! A TSV grid has a header line and a row-label column, both ignored on
//! import. Every other field becomes one cell: the n-th field after the
//! label is column n, the n-th line after the header is row n.

use std::fmt::Write as _;
use std::path::Path;

use lambdasheet_engine::engine::{CellRef, SheetBounds, number_to_column};
use tracing::{debug, warn};

use crate::batch::CellInput;
use crate::error::{Result, SheetError};
use crate::sheet::Sheet;

const MAX_TSV_BYTES: u64 = 16 * 1_048_576; // 16 MiB

/// Split one line on `delim`, honouring double-quoted fields.
///
/// A quote only opens a quoted field at the start of the field; inside one,
/// `""` is a literal quote. Fields are not trimmed.
pub(crate) fn parse_delimited_line(line: &str, delim: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
            continue;
        }
        match c {
            '"' if at_field_start => {
                in_quotes = true;
                at_field_start = false;
            }
            c if c == delim => {
                fields.push(std::mem::take(&mut current));
                at_field_start = true;
            }
            _ => {
                current.push(c);
                at_field_start = false;
            }
        }
    }
    fields.push(current);
    fields
}

/// Split TSV text into records, each with the 1-based line it starts on.
///
/// Records end at a newline outside a quoted field, so a quoted field may
/// span lines. A `\r` before the newline is dropped.
fn split_records(text: &str) -> Vec<(usize, &str)> {
    let bytes = text.as_bytes();
    let mut records = Vec::new();
    let mut start = 0;
    let mut line = 1;
    let mut start_line = 1;
    let mut in_quotes = false;
    let mut at_field_start = true;

    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if in_quotes {
            match b {
                b'"' if bytes.get(i + 1) == Some(&b'"') => i += 1,
                b'"' => in_quotes = false,
                b'\n' => line += 1,
                _ => {}
            }
            i += 1;
            continue;
        }
        match b {
            b'"' if at_field_start => {
                in_quotes = true;
                at_field_start = false;
            }
            b'\t' => at_field_start = true,
            b'\n' => {
                let record = &text[start..i];
                records.push((start_line, record.strip_suffix('\r').unwrap_or(record)));
                line += 1;
                start = i + 1;
                start_line = line;
                at_field_start = true;
            }
            _ => at_field_start = false,
        }
        i += 1;
    }
    if start < bytes.len() {
        records.push((start_line, &text[start..]));
    }
    records
}

/// Every cell field of a TSV grid, with the 1-based file line it starts on.
pub fn tsv_cells(text: &str) -> Vec<(usize, CellInput)> {
    let mut cells = Vec::new();
    let mut width = None;

    for (idx, (line_no, record)) in split_records(text).into_iter().enumerate().skip(1) {
        let fields = parse_delimited_line(record, '\t');
        if !record.is_empty() {
            match width {
                None => width = Some(fields.len()),
                Some(w) if w != fields.len() => {
                    warn!(line = line_no, fields = fields.len(), expected = w, "ragged TSV row");
                }
                Some(_) => {}
            }
        }
        for (col, field) in fields.into_iter().enumerate().skip(1) {
            let column = number_to_column(col as u32);
            cells.push((line_no, CellInput::new(&column, idx as i64, &field)));
        }
    }
    cells
}

/// Build a sheet from TSV text. Any cell that cannot be added aborts the
/// import with the line it came from.
pub fn parse_tsv(text: &str, bounds: SheetBounds) -> Result<Sheet> {
    let mut sheet = Sheet::new(bounds);
    for (line, cell) in tsv_cells(text) {
        sheet
            .add_cell(&cell.column, cell.row, &cell.value)
            .map_err(|e| SheetError::Parse {
                line,
                message: format!("column {}: {}", cell.column, e),
            })?;
    }
    debug!(cells = sheet.len(), formulas = sheet.formula_count(), "TSV parsed");
    Ok(sheet)
}

/// Read a TSV file into a new sheet.
pub fn load_tsv(path: &Path, bounds: SheetBounds) -> Result<Sheet> {
    let meta = std::fs::metadata(path)?;
    if meta.len() > MAX_TSV_BYTES {
        return Err(SheetError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "Refusing to read {}: file too large ({} bytes, max {})",
                path.display(),
                meta.len(),
                MAX_TSV_BYTES
            ),
        )));
    }
    let content = std::fs::read_to_string(path)?;
    parse_tsv(&content, bounds)
}

fn escape_tsv_field(field: &str) -> String {
    if field.contains(['\t', '\n', '\r']) || field.starts_with('"') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render a sheet's outputs as a TSV grid with a header line of column
/// letters and a leading row-number column. Absent cells are empty.
pub fn write_tsv(sheet: &Sheet) -> String {
    let (max_col, max_row) = sheet
        .cells()
        .fold((0, 0), |(c, r), (at, _)| (c.max(at.col), r.max(at.row)));

    let mut out = String::new();
    let header: Vec<String> = (1..=max_col).map(number_to_column).collect();
    let _ = writeln!(out, "\t{}", header.join("\t"));
    for row in 1..=max_row {
        let fields: Vec<String> = (1..=max_col)
            .map(|col| {
                sheet
                    .get(&CellRef::new(col, row))
                    .and_then(|cell| cell.output())
                    .map(|s| escape_tsv_field(&s))
                    .unwrap_or_default()
            })
            .collect();
        let _ = writeln!(out, "{}\t{}", row, fields.join("\t"));
    }
    out
}

/// Write a sheet's outputs to a TSV file.
pub fn save_tsv(path: &Path, sheet: &Sheet) -> Result<()> {
    std::fs::write(path, write_tsv(sheet))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delimited_line_simple() {
        assert_eq!(parse_delimited_line("a\tb\tc", '\t'), vec!["a", "b", "c"]);
        assert_eq!(parse_delimited_line("", '\t'), vec![""]);
        assert_eq!(parse_delimited_line("a\t\t", '\t'), vec!["a", "", ""]);
    }

    #[test]
    fn test_parse_delimited_line_keeps_whitespace() {
        assert_eq!(parse_delimited_line(" a \t b", '\t'), vec![" a ", " b"]);
    }

    #[test]
    fn test_parse_delimited_line_quoted() {
        assert_eq!(
            parse_delimited_line("\"x\ty\"\t\"say \"\"hi\"\"\"", '\t'),
            vec!["x\ty", "say \"hi\""]
        );
        // A quote after the start of a field is literal.
        assert_eq!(parse_delimited_line("a\"b\tc", '\t'), vec!["a\"b", "c"]);
    }

    #[test]
    fn test_tsv_cells_skip_header_and_labels() {
        let cells = tsv_cells("\tA\tB\n1\t1\t2\n2\tx\tlambda: 1\n");
        let flat: Vec<(usize, &str, i64, &str)> = cells
            .iter()
            .map(|(line, c)| (*line, c.column.as_str(), c.row, c.value.as_str()))
            .collect();
        assert_eq!(
            flat,
            vec![
                (2, "A", 1, "1"),
                (2, "B", 1, "2"),
                (3, "A", 2, "x"),
                (3, "B", 2, "lambda: 1"),
            ]
        );
    }

    #[test]
    fn test_split_records() {
        assert_eq!(
            split_records("h\r\n1\t\"a\nb\"\n\n2\tc"),
            vec![(1, "h"), (2, "1\t\"a\nb\""), (4, ""), (5, "2\tc")]
        );
        assert_eq!(split_records("h\n"), vec![(1, "h")]);
        assert!(split_records("").is_empty());
    }

    #[test]
    fn test_tsv_cells_quoted_newline_stays_in_field() {
        let cells = tsv_cells("\tA\tB\n1\t\"say \"\"hi\"\"\nthere\"\t5\n2\t6\t7\n");
        let flat: Vec<(usize, &str, i64, &str)> = cells
            .iter()
            .map(|(line, c)| (*line, c.column.as_str(), c.row, c.value.as_str()))
            .collect();
        assert_eq!(
            flat,
            vec![
                (2, "A", 1, "say \"hi\"\nthere"),
                (2, "B", 1, "5"),
                (4, "A", 2, "6"),
                (4, "B", 2, "7"),
            ]
        );
    }

    #[test]
    fn test_written_tsv_reads_back() {
        let mut sheet = Sheet::new(SheetBounds::BULK);
        sheet.add_cell("A", 1, "line1\nline2").unwrap();
        sheet.add_cell("B", 1, "5").unwrap();
        sheet.add_cell("A", 2, "lambda: b1 * 2").unwrap();
        sheet.calculate();

        let text = write_tsv(&sheet);
        let mut back = parse_tsv(&text, SheetBounds::BULK).unwrap();
        back.calculate();
        assert_eq!(back.len(), 3);
        assert_eq!(write_tsv(&back), text);

        let output = |at| back.get(&at).and_then(|cell| cell.output());
        assert_eq!(output(CellRef::new(1, 1)).as_deref(), Some("line1\nline2"));
        assert_eq!(output(CellRef::new(2, 1)).as_deref(), Some("5.0"));
        assert_eq!(output(CellRef::new(1, 2)).as_deref(), Some("10.0"));
    }

    #[test]
    fn test_parse_tsv_reports_line() {
        let err = parse_tsv("\tA\n1\t1\n2\t2\n", SheetBounds::new(10, 2)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Parse error at line 3: column A: Row out of range (1-2)"
        );

        // Lines inside a quoted field still count.
        let err = parse_tsv("\tA\n1\t\"a\nb\"\n2\t2\n", SheetBounds::new(10, 2)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Parse error at line 4: column A: Row out of range (1-2)"
        );
    }

    #[test]
    fn test_write_tsv() {
        let mut sheet = Sheet::new(SheetBounds::BULK);
        sheet.add_cell("A", 1, "1").unwrap();
        sheet.add_cell("C", 2, "lambda: a1 * 2").unwrap();
        sheet.add_cell("B", 1, "tab\there").unwrap();
        sheet.calculate();
        assert_eq!(
            write_tsv(&sheet),
            "\tA\tB\tC\n1\t1.0\t\"tab\there\"\t\n2\t\t\t2.0\n"
        );
    }

    #[test]
    fn test_write_tsv_empty_sheet() {
        assert_eq!(write_tsv(&Sheet::default()), "\t\n");
    }
}
