//! Column-name normalization
//!
//! Source files label the same column in many ways (`Región`, `REGION `,
//! `region`). Everything downstream matches on the normalized form:
//! trimmed, lowercase, spaces replaced by `_` and basic Spanish accents
//! folded.

use std::collections::HashSet;

use crate::types::Table;

/// Normalize a single column name
///
/// ```
/// use delistat_core::normalize::normalize_column_name;
///
/// assert_eq!(normalize_column_name("  Región de Ñuble "), "region_de_nuble");
/// assert_eq!(normalize_column_name("AÑO"), "ano");
/// ```
pub fn normalize_column_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' => '_',
            'á' | 'à' => 'a',
            'é' | 'è' => 'e',
            'í' | 'ì' => 'i',
            'ó' | 'ò' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

/// Normalize every column name of a table
///
/// Names that collide after normalization get `_2`, `_3`, ... suffixes so
/// each column stays addressable.
pub fn normalize_column_names(table: &mut Table) {
    let mut used: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(table.width());

    for original in table.columns() {
        let base = normalize_column_name(original);
        let mut name = base.clone();
        let mut suffix = 2;
        while used.contains(&name) {
            name = format!("{base}_{suffix}");
            suffix += 1;
        }
        used.insert(name.clone());
        names.push(name);
    }

    for (idx, name) in names.into_iter().enumerate() {
        table.set_column_name(idx, name);
    }
}
