//! Table helpers shared by the layout and markdown mappers.

use std::collections::BTreeMap;

use crossdoc_core::types::{FieldValue, Table};

/// Fills blank header labels with `colN` and disambiguates duplicates.
#[must_use]
pub fn label_headers(raw: &[String]) -> Vec<String> {
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    raw.iter()
        .enumerate()
        .map(|(i, header)| {
            let base = if header.trim().is_empty() {
                format!("col{}", i + 1)
            } else {
                header.trim().to_string()
            };
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                base
            } else {
                format!("{base} ({count})")
            }
        })
        .collect()
}

/// Builds a typed row keyed by header label. Blank cells are left out.
///
/// Cells beyond the header count get `colN` labels.
#[must_use]
pub fn typed_row(headers: &[String], cells: &[String]) -> BTreeMap<String, FieldValue> {
    cells
        .iter()
        .enumerate()
        .filter_map(|(i, cell)| {
            let label = headers
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("col{}", i + 1));
            FieldValue::infer(cell).map(|value| (label, value))
        })
        .collect()
}

/// Builds a table from header and body cell text.
#[must_use]
pub fn build_table(page: Option<u32>, raw_headers: &[String], body: &[Vec<String>]) -> Table {
    let headers = label_headers(raw_headers);
    let rows = body
        .iter()
        .map(|cells| typed_row(&headers, cells))
        .filter(|row| !row.is_empty())
        .collect();
    Table { page, headers, rows }
}

/// Appends tables that continue onto the next page to their predecessor.
///
/// A table continues the previous one when it starts on the following page
/// and has the same non-empty headers.
#[must_use]
pub fn merge_continued(tables: Vec<Table>) -> Vec<Table> {
    let mut merged: Vec<Table> = Vec::with_capacity(tables.len());
    // Last page covered by the most recent merged table.
    let mut last_page: Option<u32> = None;

    for table in tables {
        let continues = match (merged.last(), last_page, table.page) {
            (Some(previous), Some(end), Some(page)) => {
                page == end + 1 && !table.headers.is_empty() && same_headers(&previous.headers, &table.headers)
            }
            _ => false,
        };
        if continues {
            if let Some(previous) = merged.last_mut() {
                tracing::debug!(page = ?table.page, rows = table.rows.len(), "Merging continued table");
                previous.rows.extend(table.rows);
                last_page = table.page;
                continue;
            }
        }
        last_page = table.page;
        merged.push(table);
    }
    merged
}

fn same_headers(a: &[String], b: &[String]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| x.trim().to_lowercase() == y.trim().to_lowercase())
}

/// Label/value pairs from two-column tables whose value is numeric.
pub fn two_column_figures(table: &Table) -> impl Iterator<Item = (String, FieldValue)> + '_ {
    let two_columns = table.headers.len() == 2;
    table.rows.iter().filter_map(move |row| {
        if !two_columns {
            return None;
        }
        let label = match row.get(&table.headers[0])? {
            FieldValue::Text(label) => label.clone(),
            _ => return None,
        };
        let value = row.get(&table.headers[1])?;
        value.is_numeric().then(|| (label, value.clone()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_label_headers() {
        assert_eq!(
            label_headers(&strings(&["Item", "", "2024", "2024"])),
            strings(&["Item", "col2", "2024", "2024 (2)"])
        );
    }

    #[test]
    fn test_typed_row_skips_blank_cells() {
        let headers = strings(&["Item", "Amount", "Date"]);
        let row = typed_row(&headers, &strings(&["Revenue", "₪1,200", ""]));
        assert_eq!(row.get("Item"), Some(&FieldValue::text("Revenue")));
        assert_eq!(
            row.get("Amount"),
            Some(&FieldValue::Currency {
                amount: 1200.0,
                currency: Some("ILS".into())
            })
        );
        assert!(!row.contains_key("Date"));
    }

    #[test]
    fn test_extra_cells_get_column_labels() {
        let row = typed_row(&strings(&["A"]), &strings(&["x", "5"]));
        assert_eq!(row.get("col2"), Some(&FieldValue::Number(5.0)));
    }

    #[test]
    fn test_merge_continued_on_next_page() {
        let headers = strings(&["Item", "2024"]);
        let page = |p: u32, item: &str| build_table(Some(p), &headers, &[strings(&[item, "1"])]);
        let merged = merge_continued(vec![page(1, "a"), page(2, "b"), page(3, "c"), page(5, "d")]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].rows.len(), 3);
        assert_eq!(merged[0].page, Some(1));
        assert_eq!(merged[1].page, Some(5));
    }

    #[test]
    fn test_different_headers_not_merged() {
        let a = build_table(Some(1), &strings(&["Item", "2024"]), &[strings(&["a", "1"])]);
        let b = build_table(Some(2), &strings(&["Name", "Qty"]), &[strings(&["b", "2"])]);
        let same_page = build_table(Some(2), &strings(&["Name", "Qty"]), &[strings(&["c", "3"])]);
        assert_eq!(merge_continued(vec![a, b, same_page]).len(), 3);
    }

    #[test]
    fn test_two_column_figures() {
        let table = build_table(
            Some(1),
            &strings(&["Metric", "Value"]),
            &[strings(&["Revenue", "1,234"]), strings(&["Notes", "see below"])],
        );
        let figures: Vec<_> = two_column_figures(&table).collect();
        assert_eq!(figures, vec![("Revenue".to_string(), FieldValue::Number(1234.0))]);
    }
}
