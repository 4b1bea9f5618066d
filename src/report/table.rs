//! Text rendering of effects tables.

use super::{ReportError, TableStyle};
use crate::effects::{EffectsRow, EffectsTable};
use crate::inference::EquivalenceResult;

/// Tables longer than this print only their first and last rows.
const MAX_ROWS: usize = 30;
const HEAD_TAIL: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

struct Column {
    header: String,
    align: Align,
    cells: Vec<String>,
}

/// Render `table` with three significant digits.
pub fn format_table(table: &EffectsTable, style: TableStyle) -> Result<String, ReportError> {
    format_table_with(table, style, 3)
}

/// Render `table` with `digits` significant digits for estimates.
///
/// Tables with more than 30 rows show the first and last 5. Columns that are
/// undefined for every row (e.g. standard errors after a transform) are
/// left out.
pub fn format_table_with(
    table: &EffectsTable,
    style: TableStyle,
    digits: usize,
) -> Result<String, ReportError> {
    if table.is_empty() {
        return Err(ReportError::EmptyTable);
    }

    let (rows, omitted): (Vec<&EffectsRow>, usize) = if table.len() > MAX_ROWS {
        let rows = table.rows();
        let head = rows.iter().take(HEAD_TAIL);
        let tail = rows.iter().skip(rows.len() - HEAD_TAIL);
        (head.chain(tail).collect(), rows.len() - 2 * HEAD_TAIL)
    } else {
        (table.rows().iter().collect(), 0)
    };

    let columns = build_columns(table, &rows, digits);
    let mut out = match style {
        TableStyle::Pipe => render_pipe(&escape_pipes(columns), omitted),
        TableStyle::Grid => render_grid(&columns, omitted),
        TableStyle::Compact => render_compact(&columns, omitted),
    };
    if omitted > 0 {
        out.push_str(&format!("\n--- {omitted} rows omitted ---\n"));
    }
    Ok(out)
}

fn build_columns(table: &EffectsTable, rows: &[&EffectsRow], digits: usize) -> Vec<Column> {
    let mut columns = Vec::new();

    if rows.iter().any(|r| r.key.term.is_some()) {
        columns.push(column("Term", Align::Left, rows, |r| {
            r.key.term.clone().unwrap_or_default()
        }));
    }
    if rows.iter().any(|r| r.key.contrast.is_some()) {
        columns.push(column("Contrast", Align::Left, rows, |r| {
            r.key.contrast.clone().unwrap_or_default()
        }));
    }
    if let Some(first) = rows.first() {
        for (k, (name, _)) in first.key.group.iter().enumerate() {
            columns.push(column(name, Align::Right, rows, |r| {
                r.key
                    .group
                    .get(k)
                    .map(|(_, v)| format_number(*v, digits))
                    .unwrap_or_default()
            }));
        }
    }
    if rows.iter().any(|r| r.key.hypothesis.is_some()) {
        columns.push(column("Hypothesis", Align::Left, rows, |r| {
            r.key.hypothesis.clone().unwrap_or_default()
        }));
    }
    if rows.iter().any(|r| r.key.row_id.is_some()) {
        for name in table.context_columns() {
            columns.push(column(name, Align::Right, rows, |r| {
                table
                    .grid_value(r, name)
                    .map(|v| format_number(v, digits))
                    .unwrap_or_default()
            }));
        }
    }

    columns.push(column("Estimate", Align::Right, rows, |r| {
        format_number(r.estimate, digits)
    }));
    if rows.iter().any(|r| !r.std_error.is_nan()) {
        let stat = table.distribution().statistic_name();
        columns.push(column("Std. Error", Align::Right, rows, |r| {
            format_number(r.std_error, digits)
        }));
        columns.push(column(stat, Align::Right, rows, |r| {
            format_number(r.statistic, digits)
        }));
        columns.push(column(&format!("Pr(>|{stat}|)"), Align::Right, rows, |r| {
            format_p_value(r.p_value)
        }));
        columns.push(column("S", Align::Right, rows, |r| format_s_value(r.p_value)));
    }

    let (low, high) = interval_headers(table.conf_level());
    columns.push(column(&low, Align::Right, rows, |r| format_number(r.conf_low, digits)));
    columns.push(column(&high, Align::Right, rows, |r| format_number(r.conf_high, digits)));

    if rows.iter().any(|r| r.equivalence.is_some()) {
        columns.push(column("p (NonInf)", Align::Right, rows, |r| {
            equivalence_cell(r, |e| e.p_value_noninf)
        }));
        columns.push(column("p (NonSup)", Align::Right, rows, |r| {
            equivalence_cell(r, |e| e.p_value_nonsup)
        }));
        columns.push(column("p (Equiv)", Align::Right, rows, |r| {
            equivalence_cell(r, |e| e.p_value_equiv)
        }));
    }

    columns
}

fn column<F>(header: &str, align: Align, rows: &[&EffectsRow], cell: F) -> Column
where
    F: Fn(&EffectsRow) -> String,
{
    Column {
        header: header.to_string(),
        align,
        cells: rows.iter().map(|&r| cell(r)).collect(),
    }
}

fn equivalence_cell(row: &EffectsRow, field: fn(&EquivalenceResult) -> f64) -> String {
    row.equivalence
        .as_ref()
        .map(|e| format_p_value(field(e)))
        .unwrap_or_default()
}

/// Interval column headers, e.g. `2.5 %` and `97.5 %`.
fn interval_headers(conf_level: f64) -> (String, String) {
    let percent = |p: f64| {
        let s = format!("{p:.1}");
        format!("{} %", s.strip_suffix(".0").unwrap_or(&s))
    };
    let tail = (1.0 - conf_level) / 2.0 * 100.0;
    (percent(tail), percent(100.0 - tail))
}

/// Format with `digits` significant digits; NaN prints as `NA`.
pub(crate) fn format_number(x: f64, digits: usize) -> String {
    if x.is_nan() {
        return "NA".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "Inf" } else { "-Inf" }.to_string();
    }
    if x == 0.0 {
        return "0".to_string();
    }
    let magnitude = x.abs().log10().floor() as i32;
    if !(-5..15).contains(&magnitude) {
        return format!("{:.*e}", digits.saturating_sub(1), x);
    }
    let decimals = (digits as i32 - 1 - magnitude).clamp(0, 15) as usize;
    format!("{x:.decimals$}")
}

fn format_p_value(p: f64) -> String {
    if p.is_nan() {
        "NA".to_string()
    } else if p < 0.001 {
        "<0.001".to_string()
    } else {
        format!("{p:.3}")
    }
}

/// Shannon information of the p-value, -log2(p).
fn format_s_value(p: f64) -> String {
    if p.is_nan() {
        return "NA".to_string();
    }
    format!("{:.1}", -p.max(f64::MIN_POSITIVE).log2())
}

/// Literal `|` would split a markdown pipe-table cell.
fn escape_pipes(columns: Vec<Column>) -> Vec<Column> {
    columns
        .into_iter()
        .map(|c| Column {
            header: c.header.replace('|', "\\|"),
            align: c.align,
            cells: c.cells.into_iter().map(|s| s.replace('|', "\\|")).collect(),
        })
        .collect()
}

fn widths(columns: &[Column]) -> Vec<usize> {
    columns
        .iter()
        .map(|c| {
            c.cells
                .iter()
                .map(|s| s.chars().count())
                .chain(std::iter::once(c.header.chars().count()))
                .chain(std::iter::once(3))
                .max()
                .unwrap_or(3)
        })
        .collect()
}

fn pad(s: &str, width: usize, align: Align) -> String {
    match align {
        Align::Left => format!("{s:<width$}"),
        Align::Right => format!("{s:>width$}"),
    }
}

/// Row indices to print, with `None` marking the omitted block.
fn layout(n: usize, omitted: usize) -> Vec<Option<usize>> {
    if omitted == 0 {
        return (0..n).map(Some).collect();
    }
    (0..HEAD_TAIL)
        .map(Some)
        .chain(std::iter::once(None))
        .chain((HEAD_TAIL..n).map(Some))
        .collect()
}

fn cells(columns: &[Column], widths: &[usize], row: Option<usize>) -> Vec<String> {
    columns
        .iter()
        .zip(widths)
        .map(|(c, &w)| match row {
            Some(i) => pad(&c.cells[i], w, c.align),
            None => pad("...", w, c.align),
        })
        .collect()
}

fn render_pipe(columns: &[Column], omitted: usize) -> String {
    let w = widths(columns);
    let n = columns.first().map_or(0, |c| c.cells.len());
    let mut out = String::new();

    let header: Vec<String> = columns
        .iter()
        .zip(&w)
        .map(|(c, &w)| pad(&c.header, w, c.align))
        .collect();
    out.push_str(&format!("| {} |\n", header.join(" | ")));

    let rule: Vec<String> = columns
        .iter()
        .zip(&w)
        .map(|(c, &w)| match c.align {
            Align::Left => format!(":{}", "-".repeat(w - 1)),
            Align::Right => format!("{}:", "-".repeat(w - 1)),
        })
        .collect();
    let rule: Vec<String> = rule.iter().map(|r| format!(" {r} ")).collect();
    out.push_str(&format!("|{}|\n", rule.join("|")));

    for row in layout(n, omitted) {
        out.push_str(&format!("| {} |\n", cells(columns, &w, row).join(" | ")));
    }
    out
}

fn render_grid(columns: &[Column], omitted: usize) -> String {
    let w = widths(columns);
    let n = columns.first().map_or(0, |c| c.cells.len());
    let line = |fill: &str| {
        let parts: Vec<String> = w.iter().map(|&w| fill.repeat(w + 2)).collect();
        format!("+{}+\n", parts.join("+"))
    };

    let mut out = line("-");
    let header: Vec<String> = columns
        .iter()
        .zip(&w)
        .map(|(c, &w)| pad(&c.header, w, c.align))
        .collect();
    out.push_str(&format!("| {} |\n", header.join(" | ")));
    out.push_str(&line("="));

    for row in layout(n, omitted) {
        out.push_str(&format!("| {} |\n", cells(columns, &w, row).join(" | ")));
        out.push_str(&line("-"));
    }
    out
}

fn render_compact(columns: &[Column], omitted: usize) -> String {
    let w = widths(columns);
    let n = columns.first().map_or(0, |c| c.cells.len());
    let mut out = String::new();

    // R right-aligns headers over every column
    let header: Vec<String> = columns
        .iter()
        .zip(&w)
        .map(|(c, &w)| pad(&c.header, w, Align::Right))
        .collect();
    out.push_str(&format!(" {}\n", header.join(" ")));

    for row in layout(n, omitted) {
        let line: Vec<String> = columns
            .iter()
            .zip(&w)
            .map(|(c, &w)| match row {
                Some(i) => pad(&c.cells[i], w, Align::Right),
                None => pad("...", w, Align::Right),
            })
            .collect();
        out.push_str(&format!(" {}\n", line.join(" ")));
    }
    out
}
