use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;
use unicode_width::UnicodeWidthStr;

use crate::error::RecordStoreError;
use crate::paths::table_path;
use crate::schema::{IdentityKeys, Record};

const COLUMN_GAP: &str = "  ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

/// Columns in display order: identity keys in reverse priority, then the
/// remaining field names sorted.
///
/// Every configured identity key leads, so a `desc` key built by
/// [`IdentityKeys::with_desc`] is the first column rather than being sorted
/// in among the other fields.
#[must_use]
pub fn column_order(records: &[Record], identity_keys: &IdentityKeys) -> Vec<String> {
    let present: BTreeSet<&str> = records
        .iter()
        .flat_map(|record| record.keys().map(String::as_str))
        .collect();

    let mut columns: Vec<String> = identity_keys
        .iter()
        .rev()
        .filter(|key| present.contains(key))
        .map(str::to_string)
        .collect();
    columns.extend(
        present
            .iter()
            .filter(|key| !identity_keys.contains(key))
            .map(|key| key.to_string()),
    );
    columns
}

/// Text shown for a field value. Absent and null fields are empty.
#[must_use]
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Render records as an aligned plain-text table, one trailing newline.
#[must_use]
pub fn render_table(records: &[Record], identity_keys: &IdentityKeys) -> String {
    let columns = column_order(records, identity_keys);
    if columns.is_empty() {
        return "\n".to_string();
    }

    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|column| cell_text(record.get(column)))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .map(|row| cell_width(&row[i]))
                .fold(cell_width(header), usize::max)
        })
        .collect();
    let aligns: Vec<Align> = (0..columns.len())
        .map(|i| column_alignment(rows.iter().map(|row| row[i].as_str())))
        .collect();

    let mut out = String::new();
    push_row(&mut out, columns.iter().map(String::as_str), &widths, &aligns);
    let rules: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    push_line(&mut out, rules.iter().map(String::as_str), &widths, &aligns);
    for row in &rows {
        push_row(&mut out, row.iter().map(String::as_str), &widths, &aligns);
    }
    out
}

/// Write the table next to `path` (same stem, `.txt`) and return where it went.
pub fn export_table(
    path: &Path,
    records: &[Record],
    identity_keys: &IdentityKeys,
) -> Result<PathBuf, RecordStoreError> {
    let target = table_path(path);
    fs::write(&target, render_table(records, identity_keys))
        .map_err(|source| RecordStoreError::io("writing table", &target, source))?;
    debug!(path = %target.display(), rows = records.len(), "exported table");
    Ok(target)
}

fn column_alignment<'a>(cells: impl Iterator<Item = &'a str>) -> Align {
    let mut saw_number = false;
    for cell in cells.filter(|cell| !cell.is_empty()) {
        if cell.trim().parse::<f64>().is_err() {
            return Align::Left;
        }
        saw_number = true;
    }
    if saw_number {
        Align::Right
    } else {
        Align::Left
    }
}

/// Widest physical line of a cell.
fn cell_width(cell: &str) -> usize {
    cell.split('\n').map(UnicodeWidthStr::width).max().unwrap_or(0)
}

/// Emit one logical row, spreading multi-line cells over as many physical
/// lines as the tallest cell needs.
fn push_row<'a>(
    out: &mut String,
    cells: impl Iterator<Item = &'a str>,
    widths: &[usize],
    aligns: &[Align],
) {
    let split: Vec<Vec<&str>> = cells.map(|cell| cell.split('\n').collect()).collect();
    let height = split.iter().map(Vec::len).max().unwrap_or(1);
    for line in 0..height {
        let parts = split
            .iter()
            .map(|cell_lines| cell_lines.get(line).copied().unwrap_or(""));
        push_line(out, parts, widths, aligns);
    }
}

fn push_line<'a>(
    out: &mut String,
    cells: impl Iterator<Item = &'a str>,
    widths: &[usize],
    aligns: &[Align],
) {
    let mut line = String::new();
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            line.push_str(COLUMN_GAP);
        }
        let pad = " ".repeat(widths[i].saturating_sub(cell.width()));
        match aligns[i] {
            Align::Left => {
                line.push_str(cell);
                line.push_str(&pad);
            }
            Align::Right => {
                line.push_str(&pad);
                line.push_str(cell);
            }
        }
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::{cell_text, column_order, render_table};
    use crate::schema::{IdentityKeys, Record};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn identity_columns_reverse_then_rest_sorted() {
        let keys = IdentityKeys::new(["subject", "session", "task", "desc"]);
        let records = vec![
            record(json!({"zeta": 1, "subject": "01", "file": "a", "task": "rest"})),
            record(json!({"alpha": true, "desc": "x"})),
        ];
        assert_eq!(
            column_order(&records, &keys),
            ["desc", "task", "subject", "alpha", "file", "zeta"]
        );
    }

    #[test]
    fn cells_stringify_scalars_and_blank_nulls() {
        assert_eq!(cell_text(None), "");
        assert_eq!(cell_text(Some(&json!(null))), "");
        assert_eq!(cell_text(Some(&json!("text"))), "text");
        assert_eq!(cell_text(Some(&json!(1.5))), "1.5");
        assert_eq!(cell_text(Some(&json!(false))), "false");
        assert_eq!(cell_text(Some(&json!([1, "a"]))), "[1,\"a\"]");
    }

    #[test]
    fn renders_aligned_table_with_rule() {
        let keys = IdentityKeys::new(["subject", "task"]);
        let records = vec![
            record(json!({"subject": "01", "task": "rest", "fd_mean": 0.25})),
            record(json!({"subject": "10", "task": "faces", "fd_mean": 12.5, "note": null})),
        ];
        let expected = concat!(
            "task   subject  fd_mean  note\n",
            "-----  -------  -------  ----\n",
            "rest        01     0.25\n",
            "faces       10     12.5\n",
        );
        assert_eq!(render_table(&records, &keys), expected);
    }

    #[test]
    fn wide_characters_use_display_width() {
        let keys = IdentityKeys::new(["desc"]);
        let records = vec![
            record(json!({"desc": "日本", "x": "a"})),
            record(json!({"desc": "ab", "x": "b"})),
        ];
        let expected = concat!(
            "desc  x\n",
            "----  -\n",
            "日本  a\n",
            "ab    b\n",
        );
        assert_eq!(render_table(&records, &keys), expected);
    }

    #[test]
    fn multiline_cells_span_padded_physical_lines() {
        let records = vec![
            record(json!({"a": "x\ny", "b": "z"})),
            record(json!({"a": "long", "b": "p\nq\nr"})),
        ];
        let expected = concat!(
            "a     b\n",
            "----  -\n",
            "x     z\n",
            "y\n",
            "long  p\n",
            "      q\n",
            "      r\n",
        );
        assert_eq!(render_table(&records, &IdentityKeys::default()), expected);
    }

    #[test]
    fn desc_from_with_desc_leads_the_columns() {
        let keys = IdentityKeys::with_desc(["subject", "task"]);
        let records = vec![record(json!({"subject": "01", "task": "rest", "desc": "fd", "a": 1}))];
        assert_eq!(column_order(&records, &keys), ["desc", "task", "subject", "a"]);
    }

    #[test]
    fn empty_list_renders_single_newline() {
        assert_eq!(render_table(&[], &IdentityKeys::default()), "\n");
    }
}
