mod config;
pub mod builder;
pub mod manual;

use log::{debug, info};

use std::collections::{BTreeMap, BTreeSet, HashMap};

pub use crate::config::*;

use crate::config::cell_at;

/// A table after normalization, with the number of rows that were excluded.
#[derive(PartialEq, Debug, Clone)]
pub struct Normalized {
    pub table: Table,
    /// Rows whose numeric field could not be coerced.
    pub dropped_rows: usize,
}

/// Cleans a raw table.
///
/// * column names are trimmed
/// * the values of `numeric_field` are coerced to numbers
/// * the rows where this coercion fails are dropped and counted
///
/// The input table is not modified. Percentages computed afterwards must use
/// the row count of the returned table.
pub fn normalize(raw: &Table, numeric_field: &str) -> Result<Normalized, AggregationError> {
    let columns: Vec<String> = raw.columns.iter().map(|c| c.trim().to_string()).collect();
    let mut trimmed = Table::new(columns, raw.rows.clone());
    let idx = trimmed.column_index(numeric_field)?;

    let mut rows: Vec<Vec<Cell>> = Vec::with_capacity(raw.num_rows());
    let mut dropped_rows: usize = 0;
    for (lineno, mut row) in std::mem::take(&mut trimmed.rows).into_iter().enumerate() {
        match cell_at(&row, idx).as_number() {
            Some(x) => {
                if row.len() <= idx {
                    row.resize(idx + 1, Cell::Empty);
                }
                row[idx] = Cell::Number(x);
                rows.push(row);
            }
            None => {
                debug!(
                    "normalize: row {}: dropping non-numeric {:?}: {:?}",
                    lineno,
                    numeric_field,
                    cell_at(&row, idx)
                );
                dropped_rows += 1;
            }
        }
    }
    info!(
        "normalize: kept {} rows, dropped {} rows with invalid {:?}",
        rows.len(),
        dropped_rows,
        numeric_field
    );
    Ok(Normalized {
        table: Table::new(trimmed.columns, rows),
        dropped_rows,
    })
}

/// Returns a copy of the table with the age bracket of every row in
/// `bracket_field`. The column is appended, or replaced if it already exists.
///
/// Rows whose age is not a number get a missing bracket. After `normalize`
/// on the age field, there are none.
pub fn derive_age_brackets(
    table: &Table,
    age_field: &str,
    bracket_field: &str,
) -> Result<Table, AggregationError> {
    let age_idx = table.column_index(age_field)?;
    let mut columns = table.columns.clone();
    let bracket_idx = match columns.iter().position(|c| c == bracket_field) {
        Some(idx) => idx,
        None => {
            columns.push(bracket_field.to_string());
            columns.len() - 1
        }
    };

    let rows: Vec<Vec<Cell>> = table
        .rows
        .iter()
        .map(|row| {
            let bracket = match cell_at(row, age_idx).as_number() {
                Some(age) => Cell::Text(AgeBracket::from_age(age).label().to_string()),
                None => Cell::Empty,
            };
            let mut new_row = row.clone();
            if new_row.len() <= bracket_idx {
                new_row.resize(bracket_idx + 1, Cell::Empty);
            }
            new_row[bracket_idx] = bracket;
            new_row
        })
        .collect();
    Ok(Table::new(columns, rows))
}

/// Normalizes a raw survey table on its age column and derives the age
/// bracket in `AGE_BRACKET_FIELD`.
pub fn prepare_survey(raw: &Table, age_field: &str) -> Result<Normalized, AggregationError> {
    let normalized = normalize(raw, age_field)?;
    let table = derive_age_brackets(&normalized.table, age_field, AGE_BRACKET_FIELD)?;
    Ok(Normalized {
        table,
        dropped_rows: normalized.dropped_rows,
    })
}

/// Computes the distribution of the values of a field.
///
/// Missing values are excluded from the counts and from the denominator.
pub fn frequency(
    table: &Table,
    field: &str,
    order: &CategoryOrder,
) -> Result<FrequencyTable, AggregationError> {
    let idx = table.column_index(field)?;
    let counts = count_categories(table, idx);
    let total: u64 = counts.iter().map(|(_, c)| *c).sum();

    let ordered: Vec<(String, u64)> = match order {
        CategoryOrder::ByCount => sort_by_count(counts),
        CategoryOrder::Explicit(categories) => {
            let mut listed: Vec<(String, u64)> = Vec::new();
            for c in categories.iter() {
                if let Some(p) = counts.iter().find(|(name, _)| name == c) {
                    if !listed.iter().any(|(name, _)| name == c) {
                        listed.push(p.clone());
                    }
                }
            }
            let rest: Vec<(String, u64)> = counts
                .into_iter()
                .filter(|(name, _)| !categories.contains(name))
                .collect();
            listed.extend(sort_by_count(rest));
            listed
        }
    };

    debug!(
        "frequency: field {:?}: total: {} categories: {:?}",
        field, total, ordered
    );

    let rows = ordered
        .into_iter()
        .map(|(category, count)| FrequencyRow {
            category,
            count,
            percentage: percentage(count, total),
        })
        .collect();
    Ok(FrequencyTable {
        field: field.to_string(),
        total,
        rows,
    })
}

impl FrequencyTable {
    /// Aligns the table on a domain of categories.
    ///
    /// The result has exactly one row per member of `domain`, in the order
    /// of `domain`. Members that were not observed get a count of 0.
    /// Observed categories outside the domain are dropped; they stay in the
    /// total, so the percentages are unchanged.
    pub fn reindex(&self, domain: &[String]) -> FrequencyTable {
        let mut seen: BTreeSet<&String> = BTreeSet::new();
        let rows = domain
            .iter()
            .filter(|c| seen.insert(*c))
            .map(|c| match self.get(c) {
                Some(r) => r.clone(),
                None => FrequencyRow {
                    category: c.clone(),
                    count: 0,
                    percentage: 0.0,
                },
            })
            .collect();
        FrequencyTable {
            field: self.field.clone(),
            total: self.total,
            rows,
        }
    }
}

/// Counts the joint occurrences of two fields.
///
/// Rows where either value is missing are skipped. Without declared domains,
/// only the observed pairs are returned, ordered by `(a, b)`. When a domain is
/// declared for either axis, the result is the full product of the two axes
/// in domain order, with zero counts for the missing pairs. An axis without a
/// declared domain then uses its observed categories in lexical order.
/// Observed categories outside a declared domain are left out.
///
/// If the secondary axis ends up empty (nothing observed, no secondary
/// domain), every primary category still gets one row, with an empty
/// secondary category and a count of 0.
pub fn cross_tab(
    table: &Table,
    field_a: &str,
    field_b: &str,
    domains: &CrossTabDomains,
) -> Result<CrossTab, AggregationError> {
    let idx_a = table.column_index(field_a)?;
    let idx_b = table.column_index(field_b)?;

    let mut pairs: BTreeMap<(String, String), u64> = BTreeMap::new();
    for row in table.rows.iter() {
        if let (Some(a), Some(b)) = (
            cell_at(row, idx_a).category(),
            cell_at(row, idx_b).category(),
        ) {
            *pairs.entry((a, b)).or_insert(0) += 1;
        }
    }
    let observed_a: Vec<String> = pairs
        .keys()
        .map(|(a, _)| a.clone())
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect();
    let observed_b: Vec<String> = pairs
        .keys()
        .map(|(_, b)| b.clone())
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect();

    let res = if domains.primary.is_none() && domains.secondary.is_none() {
        let rows = pairs
            .into_iter()
            .map(|((category_a, category_b), count)| CrossTabRow {
                category_a,
                category_b,
                count,
            })
            .collect();
        CrossTab {
            field_a: field_a.to_string(),
            field_b: field_b.to_string(),
            categories_a: observed_a,
            categories_b: observed_b,
            rows,
        }
    } else {
        let categories_a = domains
            .primary
            .as_deref()
            .map(dedup_domain)
            .unwrap_or(observed_a);
        let categories_b = domains
            .secondary
            .as_deref()
            .map(dedup_domain)
            .unwrap_or(observed_b);
        let mut rows: Vec<CrossTabRow> = Vec::new();
        for a in categories_a.iter() {
            if categories_b.is_empty() {
                rows.push(CrossTabRow {
                    category_a: a.clone(),
                    category_b: String::new(),
                    count: 0,
                });
            }
            for b in categories_b.iter() {
                let count = pairs.get(&(a.clone(), b.clone())).cloned().unwrap_or(0);
                rows.push(CrossTabRow {
                    category_a: a.clone(),
                    category_b: b.clone(),
                    count,
                });
            }
        }
        CrossTab {
            field_a: field_a.to_string(),
            field_b: field_b.to_string(),
            categories_a,
            categories_b,
            rows,
        }
    };
    debug!(
        "cross_tab: {:?} x {:?}: {} rows, {} counted",
        field_a,
        field_b,
        res.rows.len(),
        res.total()
    );
    Ok(res)
}

/// Keeps the rows where `field` equals `value` (exact, case-sensitive match).
/// Missing values never match.
pub fn filter_rows(table: &Table, field: &str, value: &str) -> Result<Table, AggregationError> {
    let idx = table.column_index(field)?;
    let rows: Vec<Vec<Cell>> = table
        .rows
        .iter()
        .filter(|row| cell_at(row, idx).matches(value))
        .cloned()
        .collect();
    debug!(
        "filter_rows: {:?} == {:?}: {} of {} rows",
        field,
        value,
        rows.len(),
        table.num_rows()
    );
    Ok(Table::new(table.columns.clone(), rows))
}

/// Distribution of `group_field` among the rows where `filter_field` equals
/// `filter_value`, aligned on `category_domain`.
///
/// The result always has one row per member of `category_domain`, in that
/// order, whatever the filter selects. A filter that matches no row is not
/// an error: all the counts are then 0.
pub fn query(
    table: &Table,
    filter_field: &str,
    filter_value: &str,
    group_field: &str,
    category_domain: &[String],
) -> Result<FrequencyTable, AggregationError> {
    table.column_index(group_field)?;
    let selected = filter_rows(table, filter_field, filter_value)?;
    let freq = frequency(&selected, group_field, &CategoryOrder::ByCount)?;
    Ok(freq.reindex(category_domain))
}

/// Cross-tabulation of `field_a` and `field_b` among the rows where
/// `filter_field` equals `filter_value`.
///
/// Declare the domains to get the same shape for every filter value.
pub fn query_cross_tab(
    table: &Table,
    filter_field: &str,
    filter_value: &str,
    field_a: &str,
    field_b: &str,
    domains: &CrossTabDomains,
) -> Result<CrossTab, AggregationError> {
    table.column_index(field_a)?;
    table.column_index(field_b)?;
    let selected = filter_rows(table, filter_field, filter_value)?;
    cross_tab(&selected, field_a, field_b, domains)
}

// Counts per category, in order of first appearance.
fn count_categories(table: &Table, idx: usize) -> Vec<(String, u64)> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, u64)> = Vec::new();
    for row in table.rows.iter() {
        if let Some(c) = cell_at(row, idx).category() {
            match positions.get(&c) {
                Some(pos) => counts[*pos].1 += 1,
                None => {
                    positions.insert(c.clone(), counts.len());
                    counts.push((c, 1));
                }
            }
        }
    }
    counts
}

// Stable: equal counts keep their relative order.
fn sort_by_count(mut counts: Vec<(String, u64)>) -> Vec<(String, u64)> {
    counts.sort_by(|x, y| y.1.cmp(&x.1));
    counts
}

fn dedup_domain(domain: &[String]) -> Vec<String> {
    let mut res: Vec<String> = Vec::new();
    for c in domain {
        if !res.contains(c) {
            res.push(c.clone());
        }
    }
    res
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(count as f64 / total as f64 * 100.0)
}

// Half-to-even at 2 decimals.
fn round2(x: f64) -> f64 {
    (x * 100.0).round_ties_even() / 100.0
}
