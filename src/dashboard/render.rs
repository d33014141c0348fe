use std::io::{self, Write};

use crate::database::repo::{LoadCounts, QueryResult, TableCounts};
use crate::reports::catalog::ChartHint;

const MAX_CELL_WIDTH: usize = 40;
const BAR_WIDTH: usize = 40;

fn clip(value: &str) -> String {
    let single_line = value.replace(['\n', '\r'], " ");
    if single_line.chars().count() <= MAX_CELL_WIDTH {
        return single_line;
    }
    let mut clipped: String = single_line.chars().take(MAX_CELL_WIDTH - 1).collect();
    clipped.push('…');
    clipped
}

/// Plain-text table. Shows at most `limit` rows and says how many were left out.
pub fn table<W: Write>(out: &mut W, columns: &[String], rows: &[Vec<String>], limit: usize) -> io::Result<()> {
    let shown = &rows[..rows.len().min(limit)];
    let header: Vec<String> = columns.iter().map(|c| clip(c)).collect();
    let body: Vec<Vec<String>> = shown.iter().map(|r| r.iter().map(|c| clip(c)).collect()).collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &body {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    writeln!(out, "{}", line(header.as_slice()))?;
    writeln!(out, "{}", widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-"))?;
    for row in &body {
        writeln!(out, "{}", line(row.as_slice()))?;
    }
    if rows.len() > shown.len() {
        writeln!(out, "… {} more row(s)", rows.len() - shown.len())?;
    }
    writeln!(out, "({} row(s))", rows.len())
}

pub fn query_result<W: Write>(out: &mut W, result: &QueryResult, limit: usize) -> io::Result<()> {
    let rows: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect();
    table(out, &result.columns, &rows, limit)
}

/// Horizontal bar chart of one numeric column against a label column.
pub fn bar_chart<W: Write>(out: &mut W, result: &QueryResult, hint: ChartHint) -> io::Result<()> {
    let (Some(label_idx), Some(value_idx)) = (result.column_index(hint.label), result.column_index(hint.value)) else {
        return writeln!(out, "(chart columns {} / {} missing from result)", hint.label, hint.value);
    };

    let bars: Vec<(String, f64)> = result
        .rows
        .iter()
        .map(|r| {
            let label = r[label_idx].to_string();
            let label = if label.is_empty() { "(none)".to_string() } else { clip(&label) };
            (label, r[value_idx].as_f64().unwrap_or(0.0))
        })
        .collect();

    let max = bars.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
    let label_width = bars.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);

    writeln!(out, "{} by {}", hint.value, hint.label)?;
    for (label, value) in &bars {
        let len = if max > 0.0 {
            ((value / max) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        writeln!(out, "{:>width$} | {} {}", label, "█".repeat(len), value, width = label_width)?;
    }
    Ok(())
}

pub fn table_counts<W: Write>(out: &mut W, counts: &TableCounts) -> io::Result<()> {
    writeln!(out, "Total records in database")?;
    writeln!(out, "  artifact_metadata : {}", counts.metadata)?;
    writeln!(out, "  artifact_media    : {}", counts.media)?;
    writeln!(out, "  artifact_colors   : {}", counts.colors)
}

/// Color rows pointing at a missing artifact. Zero on any store this crate wrote.
pub fn integrity<W: Write>(out: &mut W, orphaned_colors: i64) -> io::Result<()> {
    if orphaned_colors == 0 {
        return writeln!(out, "Integrity: every color row references an artifact.");
    }
    writeln!(out, "Integrity: {} color row(s) reference a missing artifact.", orphaned_colors)
}

pub fn load_counts<W: Write>(out: &mut W, counts: &LoadCounts) -> io::Result<()> {
    if counts.total() == 0 {
        return writeln!(out, "Records already exist, nothing inserted.");
    }
    writeln!(
        out,
        "Inserted {} row(s): {} metadata, {} media, {} colors.",
        counts.total(),
        counts.metadata,
        counts.media,
        counts.colors
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::repo::Cell;

    fn render<F: FnOnce(&mut Vec<u8>) -> io::Result<()>>(f: F) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn sample() -> QueryResult {
        QueryResult {
            columns: vec!["department".to_string(), "artifact_count".to_string()],
            rows: vec![
                vec![Cell::Text("D1".to_string()), Cell::Integer(4)],
                vec![Cell::Text("D2".to_string()), Cell::Integer(2)],
                vec![Cell::Text(String::new()), Cell::Integer(0)],
            ],
        }
    }

    #[test]
    fn test_table_aligns_and_truncates() {
        let text = render(|out| query_result(out, &sample(), 2));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "department | artifact_count");
        assert_eq!(lines[2], "D1         | 4");
        assert_eq!(lines[4], "… 1 more row(s)");
        assert_eq!(lines[5], "(3 row(s))");
    }

    #[test]
    fn test_bar_chart_scales_to_largest_value() {
        let hint = ChartHint { label: "department", value: "artifact_count" };
        let text = render(|out| bar_chart(out, &sample(), hint));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1].matches('█').count(), BAR_WIDTH);
        assert_eq!(lines[2].matches('█').count(), BAR_WIDTH / 2);
        assert!(lines[3].contains("(none)"));
    }

    #[test]
    fn test_integrity_line() {
        assert!(render(|o| integrity(o, 0)).contains("every color row references an artifact"));
        assert_eq!(
            render(|o| integrity(o, 3)),
            "Integrity: 3 color row(s) reference a missing artifact.\n"
        );
    }

    #[test]
    fn test_bar_chart_reports_missing_columns() {
        let hint = ChartHint { label: "century", value: "total" };
        let text = render(|out| bar_chart(out, &sample(), hint));
        assert!(text.contains("missing"));
    }

    #[test]
    fn test_load_counts_message() {
        let none = render(|out| load_counts(out, &LoadCounts::default()));
        assert!(none.contains("already exist"));
        let some = render(|out| load_counts(out, &LoadCounts { metadata: 1, media: 1, colors: 2 }));
        assert!(some.contains("Inserted 4 row(s)"));
    }
}
