//! A minimal terminal renderer for the `fleet_model::Row::cells` markup
//! convention (`crate::styling` in `fleet-core`): `<fg=color>..</fg>`
//! and `<style attrs>..</style>` tags. `fleetctl` is not the
//! interactive TUI (that renderer is an out-of-scope collaborator); it
//! only needs enough of a renderer to make `get`/`watch` output legible
//! on a plain terminal, the way `ferrexctl`'s CLI prints tabular status
//! without the full `ferrex-player` UI.

/// Strips styling tags, keeping the inner text. Good enough for
/// `fleetctl`'s plain-text table output.
pub fn strip_tags(cell: &str) -> String {
    let mut out = String::with_capacity(cell.len());
    let mut rest = cell;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let Some(end) = rest[start..].find('>') else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        rest = &rest[start + end + 1..];
    }
    out.push_str(rest);
    out
}

/// Renders a header + row set as a simple left-padded column table.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let plain_rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|c| strip_tags(c)).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &plain_rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.len());
            }
        }
    }

    let mut out = String::new();
    push_row(&mut out, headers, &widths);
    for row in &plain_rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    for (i, cell) in cells.iter().enumerate() {
        let width = widths.get(i).copied().unwrap_or(cell.len());
        out.push_str(&format!("{cell:<width$}  "));
    }
    out.push('\n');
}
