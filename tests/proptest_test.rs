//! Property-based tests for delistat using proptest

use delistat::aggregation::{Totals, evolution, ranking, sum_by};
use delistat::filters::RowFilter;
use delistat::shape::{detect_shape, melt, to_long};
use delistat_core::normalize::{normalize_column_name, normalize_column_names};
use delistat_core::{Table, Value};
use proptest::prelude::*;

// Strategies for generating test data

fn arb_column_name() -> impl Strategy<Value = String> {
    "[ A-Za-zÁÉÍÓÚÜÑáéíóúüñ_]{1,20}"
}

prop_compose! {
    fn arb_wide_table()(
        rows in 0usize..12,
        value_cols in 1usize..6,
    )(
        values in prop::collection::vec(prop::option::of(0u32..10_000), rows * value_cols),
        rows in Just(rows),
        value_cols in Just(value_cols),
    ) -> Table {
        let mut columns = vec!["delito".to_string()];
        columns.extend((0..value_cols).map(|i| format!("c{i}")));
        let data = (0..rows)
            .map(|r| {
                let mut row = vec![Value::Text(format!("delito {}", r % 4))];
                row.extend((0..value_cols).map(|c| match values[r * value_cols + c] {
                    Some(v) => Value::Number(v as f64),
                    None => Value::Null,
                }));
                row
            })
            .collect();
        Table::from_rows(columns, data).unwrap()
    }
}

proptest! {
    #[test]
    fn normalize_is_idempotent(name in arb_column_name()) {
        let once = normalize_column_name(&name);
        prop_assert_eq!(normalize_column_name(&once), once.clone());
        prop_assert!(!once.contains(' '));
        prop_assert!(once.chars().all(|c| !c.is_uppercase()));
    }

    #[test]
    fn normalized_names_are_unique(names in prop::collection::vec(arb_column_name(), 1..8)) {
        let mut table = Table::new(names);
        normalize_column_names(&mut table);
        let mut seen = std::collections::HashSet::new();
        for column in table.columns() {
            prop_assert!(seen.insert(column.clone()), "duplicate column {}", column);
        }
    }

    #[test]
    fn melt_row_count(table in arb_wide_table()) {
        let value_columns: Vec<String> = table.columns()[1..].to_vec();
        let long = melt(&table, &["delito".to_string()], &value_columns, "var", "val").unwrap();
        prop_assert_eq!(long.len(), table.len() * value_columns.len());
        prop_assert_eq!(long.width(), 3);
    }

    #[test]
    fn melt_preserves_sum(table in arb_wide_table()) {
        let value_columns: Vec<String> = table.columns()[1..].to_vec();
        let wide_sum: f64 = table
            .rows()
            .iter()
            .flat_map(|row| row[1..].iter())
            .filter_map(Value::as_f64)
            .sum();
        let long = melt(&table, &["delito".to_string()], &value_columns, "var", "val").unwrap();
        let totals = Totals::from_groups(&sum_by(&long, "delito", "val").unwrap());
        prop_assert_eq!(totals.total, wide_sum);
    }

    #[test]
    fn long_tables_pass_through(table in arb_wide_table()) {
        // Generated value columns are not month or region names
        let report = detect_shape(&table);
        prop_assert_eq!(to_long(&table, &report).unwrap(), table);
    }

    #[test]
    fn ranking_is_descending(table in arb_wide_table()) {
        let ranked = ranking(&table, "delito", "c0").unwrap();
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].total >= pair[1].total);
        }
    }

    #[test]
    fn evolution_of_years_is_ascending(years in prop::collection::vec(1990u32..2030, 1..30)) {
        let rows = years
            .iter()
            .map(|y| vec![Value::Number(*y as f64), Value::Number(1.0)])
            .collect();
        let table = Table::from_rows(vec!["ano".into(), "total".into()], rows).unwrap();
        let series = evolution(&table, "ano", "total").unwrap();
        let keys: Vec<u32> = series.iter().map(|g| g.key.parse().unwrap()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        prop_assert_eq!(keys, sorted);
    }

    #[test]
    fn filter_never_grows(table in arb_wide_table(), needle in "[a-z0-9 ]{0,3}") {
        let filtered = RowFilter::new().with_contains("delito", &needle).apply(&table).unwrap();
        prop_assert!(filtered.len() <= table.len());
    }
}
