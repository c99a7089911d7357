//! Rendering calculated cells for stdout.

use lambdasheet_core::CellOutput;

/// One `REF<TAB>OUTPUT` line per cell, in input order.
pub fn render_text(outputs: &[CellOutput]) -> String {
    let mut out = String::new();
    for cell in outputs {
        out.push_str(&cell.column);
        out.push_str(&cell.row.to_string());
        out.push('\t');
        // Keep one cell per line even for multi-line text.
        out.push_str(&cell.output.replace('\n', "\\n"));
        out.push('\n');
    }
    out
}

pub fn render_json(outputs: &[CellOutput]) -> serde_json::Result<String> {
    let mut json = serde_json::to_string_pretty(outputs)?;
    json.push('\n');
    Ok(json)
}
