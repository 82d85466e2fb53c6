//! PROC implementations: whole-table passes driven by the same AST and
//! dataset model as the DATA step.

pub mod freq;
pub mod means;
pub mod print;
pub mod sort;
pub mod sql;

use sable_data::{Dataset, Pdv};
use sable_par::{Expr, ProcStep};
use sable_util::{Handler, LineSink};

use crate::data_step::StepReport;
use crate::env::DataEnvironment;
use crate::error::EngineError;
use crate::eval::{eval, ArrayTable};

/// Dispatch a PROC step. Procedures that persist a dataset return its
/// report for the driver's NOTE line.
pub fn execute(
    env: &mut DataEnvironment,
    handler: &Handler,
    list: &mut dyn LineSink,
    proc: &ProcStep,
) -> Result<Option<StepReport>, EngineError> {
    match proc {
        ProcStep::Sort(sort) => sort::run(env, handler, sort).map(Some),
        ProcStep::Means(means) => means::run(env, handler, list, means),
        ProcStep::Freq(freq) => freq::run(env, handler, list, freq).map(|_| None),
        ProcStep::Print(print) => print::run(env, handler, list, print).map(|_| None),
        ProcStep::Sql(sql) => sql::run(env, handler, list, sql),
    }
}

/// Indices of the rows passing an optional WHERE filter, in order.
pub(crate) fn filter_rows(
    dataset: &Dataset,
    where_clause: Option<&Expr>,
    handler: &Handler,
) -> Result<Vec<usize>, EngineError> {
    let Some(expr) = where_clause else {
        return Ok((0..dataset.row_count()).collect());
    };

    let mut pdv = Pdv::new();
    pdv.init_from_dataset(dataset);
    let arrays = ArrayTable::new();

    let mut selected = Vec::new();
    for row in 0..dataset.row_count() {
        pdv.load_row(dataset, row);
        if eval(expr, &pdv, &arrays, handler)?.is_truthy() {
            selected.push(row);
        }
    }
    Ok(selected)
}

/// Catalog index of a named column, or the UnknownColumn error.
pub(crate) fn column_index(dataset: &Dataset, name: &str) -> Result<usize, EngineError> {
    dataset
        .var_index(name)
        .ok_or_else(|| EngineError::UnknownColumn {
            column: name.to_string(),
            dataset: dataset.display_name(),
        })
}

/// Render a simple aligned listing table: headers, divider, rows.
pub(crate) fn render_table(headers: &[String], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths: Vec<usize> = headers.iter().map(String::len).collect();
    for row in rows {
        for (col, field) in row.iter().enumerate() {
            if col < widths.len() && field.len() > widths[col] {
                widths[col] = field.len();
            }
        }
    }

    let format_row = |fields: &[String]| -> String {
        fields
            .iter()
            .enumerate()
            .map(|(col, field)| format!("{:<width$}", field, width = widths[col]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format_row(headers));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        lines.push(format_row(row));
    }
    lines
}
