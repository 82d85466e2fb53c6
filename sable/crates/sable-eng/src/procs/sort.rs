//! PROC SORT: stable multi-key sort with NODUPKEY and DUPLICATES.

use sable_data::{cmp_key_tuples, Cell, Dataset};
use sable_par::SortProc;
use sable_util::Handler;

use crate::data_step::StepReport;
use crate::env::DataEnvironment;
use crate::error::EngineError;

pub fn run(
    env: &mut DataEnvironment,
    handler: &Handler,
    sort: &SortProc,
) -> Result<StepReport, EngineError> {
    if sort.by.is_empty() {
        return Err(EngineError::SortWithoutBy);
    }

    let input = env
        .store
        .open_dataset(sort.data.libref.as_deref(), &sort.data.name)?
        .clone();

    let keys: Vec<usize> = sort
        .by
        .iter()
        .map(|var| {
            input
                .var_index(var)
                .ok_or_else(|| EngineError::ByVarMissing {
                    var: var.clone(),
                    dataset: input.display_name(),
                })
        })
        .collect::<Result<_, _>>()?;

    let mut sorted = input;
    sorted.sort_rows(&keys);

    // Count duplicate keys; with NODUPKEY only the first occurrence of
    // each key tuple survives.
    let mut duplicate_count = 0usize;
    if sort.nodupkey || sort.duplicates {
        let mut kept: Vec<Vec<Cell>> = Vec::with_capacity(sorted.rows.len());
        let mut last_key: Option<Vec<Cell>> = None;
        for row in sorted.rows.drain(..) {
            let key: Vec<Cell> = keys.iter().map(|&col| row[col].clone()).collect();
            let is_duplicate = last_key
                .as_ref()
                .map(|last| cmp_key_tuples(last, &key) == std::cmp::Ordering::Equal)
                .unwrap_or(false);
            if is_duplicate {
                duplicate_count += 1;
                if sort.nodupkey {
                    continue;
                }
            } else {
                last_key = Some(key);
            }
            kept.push(row);
        }
        sorted.rows = kept;
    }

    if sort.duplicates {
        handler.note(format!(
            "{duplicate_count} observation(s) with duplicate key values"
        ));
    }
    if sort.nodupkey && duplicate_count > 0 {
        handler.note(format!(
            "{duplicate_count} observation(s) with duplicate key values were deleted"
        ));
    }

    // Write to OUT= or back in place.
    let target = sort.out.as_ref().unwrap_or(&sort.data);
    let libref = target
        .libref
        .clone()
        .unwrap_or_else(|| sable_data::WORK_LIBREF.to_string());
    let mut out = Dataset::new(libref.clone(), target.name.clone());
    out.catalog = sorted.catalog;
    out.rows = sorted.rows;

    let report = StepReport {
        dataset: out.display_name(),
        rows: out.row_count(),
        vars: out.var_count(),
    };
    env.store.put_dataset(out)?;
    env.store.save_dataset(Some(&libref), &target.name)?;
    Ok(report)
}
