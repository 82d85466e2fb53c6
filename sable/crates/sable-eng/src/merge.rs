//! Multi-way MERGE BY.
//!
//! The inputs are each sorted by the BY keys, then walked in parallel:
//! at every step the element-wise minimum BY tuple across the open
//! datasets picks which rows participate, the picked rows are overlaid in
//! input order, and the merged row is emitted. Datasets exhaust
//! independently, so unmatched partial rows stream out in arrival order.

use std::cmp::Ordering;

use sable_data::{cmp_key_tuples, Cell, Dataset};

use crate::error::EngineError;

/// Build the merged input of a `merge a b ...; by k ...;` step as one
/// virtual dataset the row driver can consume like a SET input.
///
/// Overlay rule per merged row: cells land in input order; BY variables
/// are written once from the key tuple and never overwritten; any other
/// cell already holding a value from an earlier dataset is preserved
/// unless the later value is non-missing.
pub fn build_merged_input(
    mut inputs: Vec<Dataset>,
    by: &[String],
) -> Result<Dataset, EngineError> {
    if by.is_empty() {
        return Err(EngineError::MergeWithoutBy);
    }

    // Sort every input by its own BY columns.
    let mut input_keys = Vec::with_capacity(inputs.len());
    for dataset in &mut inputs {
        let keys = key_indices(dataset, by)?;
        dataset.sort_rows(&keys);
        input_keys.push(keys);
    }

    // Union catalog in input order; the BY variables appear once.
    let mut merged = Dataset::new("WORK", "_merged_");
    for dataset in &inputs {
        for def in &dataset.catalog {
            merged.add_var(def.clone());
        }
    }
    let merged_keys = key_indices(&merged, by)?;

    let mut positions = vec![0usize; inputs.len()];
    loop {
        // Minimum BY tuple across the datasets that still have rows.
        let mut min_tuple: Option<Vec<Cell>> = None;
        for (i, dataset) in inputs.iter().enumerate() {
            if positions[i] >= dataset.row_count() {
                continue;
            }
            let tuple = dataset.key_tuple(positions[i], &input_keys[i]);
            let smaller = match &min_tuple {
                None => true,
                Some(current) => cmp_key_tuples(&tuple, current) == Ordering::Less,
            };
            if smaller {
                min_tuple = Some(tuple);
            }
        }
        let Some(min_tuple) = min_tuple else {
            break; // all inputs exhausted
        };

        // Start from an all-missing row, install the BY values.
        let mut row: Vec<Cell> = merged
            .catalog
            .iter()
            .map(|def| Cell::missing(def.is_numeric()))
            .collect();
        for (key_cell, &merged_col) in min_tuple.iter().zip(&merged_keys) {
            row[merged_col] = key_cell.clone();
        }

        // Gather each dataset whose current BY tuple equals the minimum,
        // overlaying its non-BY cells in input order.
        for (i, dataset) in inputs.iter().enumerate() {
            if positions[i] >= dataset.row_count() {
                continue;
            }
            let tuple = dataset.key_tuple(positions[i], &input_keys[i]);
            if cmp_key_tuples(&tuple, &min_tuple) != Ordering::Equal {
                continue;
            }

            for (col, def) in dataset.catalog.iter().enumerate() {
                if by.iter().any(|k| def.named(k)) {
                    continue;
                }
                let Some(merged_col) = merged.var_index(&def.name) else {
                    continue;
                };
                let cell = dataset.rows[positions[i]][col].clone();
                if !cell.is_missing() || row[merged_col].is_missing() {
                    row[merged_col] = cell;
                }
            }
            positions[i] += 1;
        }

        merged.rows.push(row);
    }

    Ok(merged)
}

/// Catalog indices of the BY variables; every input must carry them all.
fn key_indices(dataset: &Dataset, by: &[String]) -> Result<Vec<usize>, EngineError> {
    by.iter()
        .map(|var| {
            dataset
                .var_index(var)
                .ok_or_else(|| EngineError::ByVarMissing {
                    var: var.clone(),
                    dataset: dataset.display_name(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_data::VarDef;

    fn dataset(name: &str, vars: &[(&str, bool)], rows: Vec<Vec<Cell>>) -> Dataset {
        let mut ds = Dataset::new("WORK", name);
        for (var, numeric) in vars {
            if *numeric {
                ds.add_var(VarDef::numeric(*var));
            } else {
                ds.add_var(VarDef::character(*var, 1));
            }
        }
        for row in rows {
            ds.push_row(row);
        }
        ds
    }

    fn by(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_two_way_merge_with_partials() {
        let x = dataset(
            "x",
            &[("id", true), ("a", false)],
            vec![
                vec![Cell::Num(1.0), Cell::Str("A".into())],
                vec![Cell::Num(2.0), Cell::Str("B".into())],
            ],
        );
        let y = dataset(
            "y",
            &[("id", true), ("b", true)],
            vec![
                vec![Cell::Num(1.0), Cell::Num(10.0)],
                vec![Cell::Num(3.0), Cell::Num(30.0)],
            ],
        );

        let merged = build_merged_input(vec![x, y], &by(&["id"])).unwrap();
        assert_eq!(merged.row_count(), 3);
        assert_eq!(
            merged.rows[0],
            vec![Cell::Num(1.0), Cell::Str("A".into()), Cell::Num(10.0)]
        );
        assert_eq!(
            merged.rows[1],
            vec![Cell::Num(2.0), Cell::Str("B".into()), Cell::missing_num()]
        );
        assert_eq!(
            merged.rows[2],
            vec![Cell::Num(3.0), Cell::missing_str(), Cell::Num(30.0)]
        );
    }

    #[test]
    fn test_unsorted_inputs_are_sorted_first() {
        let x = dataset(
            "x",
            &[("id", true), ("a", false)],
            vec![
                vec![Cell::Num(2.0), Cell::Str("B".into())],
                vec![Cell::Num(1.0), Cell::Str("A".into())],
            ],
        );
        let y = dataset("y", &[("id", true), ("b", true)], vec![]);

        let merged = build_merged_input(vec![x, y], &by(&["id"])).unwrap();
        assert_eq!(merged.rows[0][0], Cell::Num(1.0));
        assert_eq!(merged.rows[1][0], Cell::Num(2.0));
    }

    #[test]
    fn test_later_non_missing_overwrites_shared_column() {
        let x = dataset(
            "x",
            &[("id", true), ("v", true)],
            vec![vec![Cell::Num(1.0), Cell::Num(5.0)]],
        );
        let y = dataset(
            "y",
            &[("id", true), ("v", true)],
            vec![vec![Cell::Num(1.0), Cell::Num(9.0)]],
        );
        let merged = build_merged_input(vec![x, y], &by(&["id"])).unwrap();
        assert_eq!(merged.rows[0], vec![Cell::Num(1.0), Cell::Num(9.0)]);
    }

    #[test]
    fn test_later_missing_preserves_earlier_value() {
        let x = dataset(
            "x",
            &[("id", true), ("v", true)],
            vec![vec![Cell::Num(1.0), Cell::Num(5.0)]],
        );
        let y = dataset(
            "y",
            &[("id", true), ("v", true)],
            vec![vec![Cell::Num(1.0), Cell::missing_num()]],
        );
        let merged = build_merged_input(vec![x, y], &by(&["id"])).unwrap();
        assert_eq!(merged.rows[0], vec![Cell::Num(1.0), Cell::Num(5.0)]);
    }

    #[test]
    fn test_merge_without_by_errors() {
        let err = build_merged_input(vec![], &[]).unwrap_err();
        assert!(matches!(err, EngineError::MergeWithoutBy));
    }

    #[test]
    fn test_missing_by_variable_errors() {
        let x = dataset("x", &[("id", true)], vec![]);
        let y = dataset("y", &[("other", true)], vec![]);
        let err = build_merged_input(vec![x, y], &by(&["id"])).unwrap_err();
        assert!(matches!(err, EngineError::ByVarMissing { .. }));
    }

    #[test]
    fn test_merge_commutes_on_disjoint_columns() {
        let make_x = || {
            dataset(
                "x",
                &[("k", true), ("a", true)],
                vec![
                    vec![Cell::Num(1.0), Cell::Num(11.0)],
                    vec![Cell::Num(2.0), Cell::Num(12.0)],
                ],
            )
        };
        let make_y = || {
            dataset(
                "y",
                &[("k", true), ("b", true)],
                vec![
                    vec![Cell::Num(2.0), Cell::Num(22.0)],
                    vec![Cell::Num(3.0), Cell::Num(23.0)],
                ],
            )
        };

        let ab = build_merged_input(vec![make_x(), make_y()], &by(&["k"])).unwrap();
        let ba = build_merged_input(vec![make_y(), make_x()], &by(&["k"])).unwrap();

        assert_eq!(ab.row_count(), ba.row_count());
        for row in 0..ab.row_count() {
            for def in &ab.catalog {
                assert_eq!(
                    ab.cell_by_name(row, &def.name),
                    ba.cell_by_name(row, &def.name),
                    "column {} row {row}",
                    def.name
                );
            }
        }
    }
}
