//! Averaging estimates within groups.

use super::table::RowKey;
use super::{By, EffectsError, EffectsTable};
use crate::data::Dataset;
use faer::Mat;
use std::cmp::Ordering;
use tracing::debug;

/// Average the estimates of `table` within groups.
///
/// Rows are grouped by term, contrast and hypothesis label, plus the values
/// of the `by` columns looked up in the table's evaluation grid. Each group
/// estimate is the plain mean of its rows; its Jacobian is the mean of their
/// Jacobian rows, so uncertainty propagates exactly. Groups come out sorted
/// by term, then contrast, then group values. `By::None` returns the table
/// unchanged.
pub fn aggregate(table: &EffectsTable, by: &By) -> Result<EffectsTable, EffectsError> {
    let columns: &[String] = match by {
        By::None => return Ok(table.clone()),
        By::All => &[],
        By::Columns(columns) => columns,
    };
    if table.is_transformed() {
        return Err(EffectsError::TransformedTable);
    }

    let mut keys: Vec<RowKey> = Vec::new();
    let mut members: Vec<Vec<usize>> = Vec::new();

    for (i, row) in table.rows().iter().enumerate() {
        let mut group = row.key.group.clone();
        for column in columns {
            if group.iter().any(|(name, _)| name == column) {
                continue;
            }
            let (id, grid) = row
                .key
                .row_id
                .zip(table.grid())
                .ok_or_else(|| EffectsError::NoGrid(column.clone()))?;
            group.push((column.clone(), grid.value(column, id)?));
        }

        let key = RowKey {
            row_id: None,
            term: row.key.term.clone(),
            contrast: row.key.contrast.clone(),
            group,
            hypothesis: row.key.hypothesis.clone(),
        };
        match keys.iter().position(|k| *k == key) {
            Some(g) => members[g].push(i),
            None => {
                keys.push(key);
                members.push(vec![i]);
            }
        }
    }

    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| compare_keys(&keys[a], &keys[b]));

    let mut weights = Mat::zeros(order.len(), table.len());
    for (r, &g) in order.iter().enumerate() {
        let w = 1.0 / members[g].len() as f64;
        for &i in &members[g] {
            weights[(r, i)] = w;
        }
    }

    debug!(
        n_rows = table.len(),
        n_groups = order.len(),
        "aggregated estimates"
    );

    let sorted_keys = order.iter().map(|&g| keys[g].clone()).collect();
    Ok(EffectsTable::assemble(
        table.estimand(),
        sorted_keys,
        table.delta().map_linear(&weights),
        table.vcov(),
        table.distribution(),
        table.conf_level(),
    ))
}

/// Partition `rows` of `grid` by the values of `columns`, sorted by value.
pub(crate) fn group_rows(
    grid: &Dataset,
    rows: &[usize],
    columns: &[String],
) -> Result<Vec<(Vec<(String, f64)>, Vec<usize>)>, EffectsError> {
    let mut groups: Vec<(Vec<(String, f64)>, Vec<usize>)> = Vec::new();
    for &row in rows {
        let mut values = Vec::with_capacity(columns.len());
        for column in columns {
            values.push((column.clone(), grid.value(column, row)?));
        }
        match groups.iter_mut().find(|(v, _)| *v == values) {
            Some((_, members)) => members.push(row),
            None => groups.push((values, vec![row])),
        }
    }
    groups.sort_by(|a, b| compare_values(&a.0, &b.0));
    Ok(groups)
}

fn compare_keys(a: &RowKey, b: &RowKey) -> Ordering {
    a.term
        .cmp(&b.term)
        .then_with(|| a.contrast.cmp(&b.contrast))
        .then_with(|| a.hypothesis.cmp(&b.hypothesis))
        .then_with(|| compare_values(&a.group, &b.group))
}

fn compare_values(a: &[(String, f64)], b: &[(String, f64)]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.1.total_cmp(&y.1))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}
