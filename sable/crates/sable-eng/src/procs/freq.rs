//! PROC FREQ: one- and two-way tabulation.

use std::cmp::Ordering;

use sable_data::{cmp_cells, Cell, Dataset};
use sable_par::{FreqProc, TableRequest};
use sable_util::{Handler, LineSink};

use crate::env::DataEnvironment;
use crate::error::EngineError;
use crate::procs::{column_index, render_table};

pub fn run(
    env: &mut DataEnvironment,
    _handler: &Handler,
    list: &mut dyn LineSink,
    freq: &FreqProc,
) -> Result<(), EngineError> {
    let input = env
        .store
        .open_dataset(freq.data.libref.as_deref(), &freq.data.name)?
        .clone();

    if let Some(title) = &env.title {
        list.write_line(title);
    }

    for request in &freq.tables {
        match &request.col {
            None => one_way(&input, list, request)?,
            Some(_) => two_way(&input, list, request)?,
        }
        if freq.chisq {
            // CHISQ is recognised but only a placeholder is reported.
            list.write_line("Chi-Square: . (not computed)");
        }
        list.write_line("");
    }
    Ok(())
}

/// Distinct cell values of a column with their counts, in comparator
/// order.
fn value_counts(dataset: &Dataset, col: usize) -> Vec<(Cell, usize)> {
    let mut counts: Vec<(Cell, usize)> = Vec::new();
    for row in &dataset.rows {
        let cell = &row[col];
        match counts.iter_mut().find(|(value, _)| value == cell) {
            Some((_, count)) => *count += 1,
            None => counts.push((cell.clone(), 1)),
        }
    }
    counts.sort_by(|(a, _), (b, _)| cmp_cells(a, b));
    counts
}

fn one_way(
    dataset: &Dataset,
    list: &mut dyn LineSink,
    request: &TableRequest,
) -> Result<(), EngineError> {
    let col = column_index(dataset, &request.row)?;
    let counts = value_counts(dataset, col);
    let total: usize = counts.iter().map(|(_, n)| n).sum();

    let headers = vec![
        dataset.catalog[col].name.clone(),
        "Frequency".to_string(),
        "Percent".to_string(),
    ];
    let rows: Vec<Vec<String>> = counts
        .iter()
        .map(|(value, count)| {
            let percent = if total == 0 {
                0.0
            } else {
                *count as f64 * 100.0 / total as f64
            };
            vec![
                value.to_string(),
                count.to_string(),
                format!("{percent:.2}"),
            ]
        })
        .collect();

    for line in render_table(&headers, &rows) {
        list.write_line(&line);
    }
    Ok(())
}

fn two_way(
    dataset: &Dataset,
    list: &mut dyn LineSink,
    request: &TableRequest,
) -> Result<(), EngineError> {
    let row_col = column_index(dataset, &request.row)?;
    let col_name = request.col.as_deref().unwrap_or_default();
    let col_col = column_index(dataset, col_name)?;

    let row_values: Vec<Cell> = value_counts(dataset, row_col)
        .into_iter()
        .map(|(v, _)| v)
        .collect();
    let col_values: Vec<Cell> = value_counts(dataset, col_col)
        .into_iter()
        .map(|(v, _)| v)
        .collect();

    // Count matrix indexed by (row value, column value).
    let mut matrix = vec![vec![0usize; col_values.len()]; row_values.len()];
    for row in &dataset.rows {
        let r = row_values
            .iter()
            .position(|v| cmp_cells(v, &row[row_col]) == Ordering::Equal);
        let c = col_values
            .iter()
            .position(|v| cmp_cells(v, &row[col_col]) == Ordering::Equal);
        if let (Some(r), Some(c)) = (r, c) {
            matrix[r][c] += 1;
        }
    }

    let mut headers = vec![format!(
        "{}*{}",
        dataset.catalog[row_col].name, dataset.catalog[col_col].name
    )];
    headers.extend(col_values.iter().map(Cell::to_string));
    headers.push("Total".to_string());

    let mut rows = Vec::with_capacity(row_values.len() + 1);
    for (r, value) in row_values.iter().enumerate() {
        let mut fields = vec![value.to_string()];
        fields.extend(matrix[r].iter().map(usize::to_string));
        fields.push(matrix[r].iter().sum::<usize>().to_string());
        rows.push(fields);
    }
    let mut totals = vec!["Total".to_string()];
    for c in 0..col_values.len() {
        totals.push(matrix.iter().map(|row| row[c]).sum::<usize>().to_string());
    }
    totals.push(dataset.row_count().to_string());
    rows.push(totals);

    for line in render_table(&headers, &rows) {
        list.write_line(&line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_data::VarDef;
    use sable_par::DatasetRef;
    use sable_util::MemorySink;

    fn env_with_survey() -> DataEnvironment {
        let mut env = DataEnvironment::new().unwrap();
        let ds = env.store.get_or_create_dataset(None, "survey").unwrap();
        ds.add_var(VarDef::character("answer", 1));
        ds.add_var(VarDef::numeric("group"));
        for (answer, group) in [("y", 1.0), ("n", 1.0), ("y", 2.0), ("y", 1.0)] {
            ds.push_row(vec![Cell::Str(answer.into()), Cell::Num(group)]);
        }
        env
    }

    fn freq_proc(tables: Vec<TableRequest>, chisq: bool) -> FreqProc {
        FreqProc {
            data: DatasetRef::work("survey"),
            tables,
            chisq,
        }
    }

    #[test]
    fn test_one_way_counts_and_percents() {
        let mut env = env_with_survey();
        let handler = Handler::new();
        let sink = MemorySink::new();
        let proc = freq_proc(
            vec![TableRequest {
                row: "answer".into(),
                col: None,
            }],
            false,
        );
        run(&mut env, &handler, &mut sink.clone(), &proc).unwrap();

        let lines = sink.lines();
        let n_line = lines.iter().find(|l| l.starts_with("n")).unwrap();
        assert!(n_line.contains('1'));
        assert!(n_line.contains("25.00"));
        let y_line = lines.iter().find(|l| l.starts_with("y")).unwrap();
        assert!(y_line.contains('3'));
        assert!(y_line.contains("75.00"));
    }

    #[test]
    fn test_two_way_matrix_with_totals() {
        let mut env = env_with_survey();
        let handler = Handler::new();
        let sink = MemorySink::new();
        let proc = freq_proc(
            vec![TableRequest {
                row: "answer".into(),
                col: Some("group".into()),
            }],
            false,
        );
        run(&mut env, &handler, &mut sink.clone(), &proc).unwrap();

        let lines = sink.lines();
        assert!(lines[0].contains("answer*group"));
        let y_line = lines.iter().find(|l| l.starts_with("y")).unwrap();
        // y: group 1 twice, group 2 once, total 3
        assert!(y_line.contains('2'));
        assert!(y_line.contains('3'));
        assert!(lines.iter().any(|l| l.starts_with("Total")));
    }

    #[test]
    fn test_chisq_placeholder() {
        let mut env = env_with_survey();
        let handler = Handler::new();
        let sink = MemorySink::new();
        let proc = freq_proc(
            vec![TableRequest {
                row: "answer".into(),
                col: None,
            }],
            true,
        );
        run(&mut env, &handler, &mut sink.clone(), &proc).unwrap();
        assert!(sink.contains("Chi-Square"));
    }

    #[test]
    fn test_unknown_table_variable() {
        let mut env = env_with_survey();
        let handler = Handler::new();
        let sink = MemorySink::new();
        let proc = freq_proc(
            vec![TableRequest {
                row: "ghost".into(),
                col: None,
            }],
            false,
        );
        let err = run(&mut env, &handler, &mut sink.clone(), &proc).unwrap_err();
        assert!(matches!(err, EngineError::UnknownColumn { .. }));
    }
}
