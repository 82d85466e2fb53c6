//! The minimal SQL sublanguage: single-table SELECT, CREATE TABLE,
//! INSERT, UPDATE and DELETE.
//!
//! Multi-table queries, GROUP BY aggregation and HAVING parse but are
//! surfaced as [`EngineError::UnsupportedSql`].

use sable_data::{Cell, Dataset, Pdv, VarDef, VarKind};
use sable_par::{SelectColumns, SelectStmt, SqlProc, SqlStatement};
use sable_util::{Handler, LineSink};

use crate::data_step::StepReport;
use crate::env::DataEnvironment;
use crate::error::EngineError;
use crate::eval::{eval, ArrayTable};
use crate::procs::{column_index, filter_rows, render_table};

pub fn run(
    env: &mut DataEnvironment,
    handler: &Handler,
    list: &mut dyn LineSink,
    sql: &SqlProc,
) -> Result<Option<StepReport>, EngineError> {
    let mut last_report = None;
    for statement in &sql.statements {
        match statement {
            SqlStatement::Select(query) => {
                let result = run_select(env, handler, query)?;
                let headers: Vec<String> =
                    result.catalog.iter().map(|v| v.name.clone()).collect();
                let rows: Vec<Vec<String>> = result
                    .rows
                    .iter()
                    .map(|row| row.iter().map(Cell::to_string).collect())
                    .collect();
                if let Some(title) = &env.title {
                    list.write_line(title);
                }
                for line in render_table(&headers, &rows) {
                    list.write_line(&line);
                }
            }
            SqlStatement::CreateTableAs { table, query } => {
                let mut result = run_select(env, handler, query)?;
                let libref = table
                    .libref
                    .clone()
                    .unwrap_or_else(|| sable_data::WORK_LIBREF.to_string());
                result.libref = libref.to_ascii_uppercase();
                result.name = table.name.clone();
                last_report = Some(persist(env, result, &libref, &table.name)?);
            }
            SqlStatement::CreateTable { table, columns } => {
                let libref = table
                    .libref
                    .clone()
                    .unwrap_or_else(|| sable_data::WORK_LIBREF.to_string());
                let mut out = Dataset::new(libref.clone(), table.name.clone());
                for column in columns {
                    let def = if column.is_character {
                        VarDef::character(&column.name, column.length.unwrap_or(8))
                    } else {
                        VarDef::numeric(&column.name)
                    };
                    out.add_var(def);
                }
                last_report = Some(persist(env, out, &libref, &table.name)?);
            }
            SqlStatement::Insert { table, values } => {
                let libref = table.libref.clone();
                let pdv = Pdv::new();
                let arrays = ArrayTable::new();
                let mut new_rows = Vec::with_capacity(values.len());
                for value_row in values {
                    let mut cells = Vec::with_capacity(value_row.len());
                    for expr in value_row {
                        cells.push(eval(expr, &pdv, &arrays, handler)?);
                    }
                    new_rows.push(cells);
                }

                let dataset = env.store.open_dataset(libref.as_deref(), &table.name)?;
                for cells in new_rows {
                    let coerced = coerce_row(dataset, cells);
                    dataset.push_row(coerced);
                }
                let report = report_of(dataset);
                env.store.save_dataset(libref.as_deref(), &table.name)?;
                last_report = Some(report);
            }
            SqlStatement::Update {
                table,
                assignments,
                where_clause,
            } => {
                let libref = table.libref.clone();
                let snapshot = env
                    .store
                    .open_dataset(libref.as_deref(), &table.name)?
                    .clone();
                let selected = filter_rows(&snapshot, where_clause.as_ref(), handler)?;

                let mut columns = Vec::with_capacity(assignments.len());
                for (name, _) in assignments {
                    columns.push(column_index(&snapshot, name)?);
                }

                let mut pdv = Pdv::new();
                pdv.init_from_dataset(&snapshot);
                let arrays = ArrayTable::new();
                let mut updates = Vec::with_capacity(selected.len());
                for &row in &selected {
                    pdv.load_row(&snapshot, row);
                    let mut row_updates = Vec::with_capacity(assignments.len());
                    for ((_, expr), &col) in assignments.iter().zip(&columns) {
                        row_updates.push((col, eval(expr, &pdv, &arrays, handler)?));
                    }
                    updates.push((row, row_updates));
                }

                let dataset = env.store.open_dataset(libref.as_deref(), &table.name)?;
                for (row, row_updates) in updates {
                    for (col, value) in row_updates {
                        dataset.rows[row][col] = coerce_cell(&mut dataset.catalog[col], value);
                    }
                }
                let report = report_of(dataset);
                env.store.save_dataset(libref.as_deref(), &table.name)?;
                last_report = Some(report);
            }
            SqlStatement::Delete {
                table,
                where_clause,
            } => {
                let libref = table.libref.clone();
                let snapshot = env
                    .store
                    .open_dataset(libref.as_deref(), &table.name)?
                    .clone();
                let selected = filter_rows(&snapshot, where_clause.as_ref(), handler)?;

                let dataset = env.store.open_dataset(libref.as_deref(), &table.name)?;
                let mut row_index = 0usize;
                dataset.rows.retain(|_| {
                    let deleted = selected.contains(&row_index);
                    row_index += 1;
                    !deleted
                });
                let report = report_of(dataset);
                env.store.save_dataset(libref.as_deref(), &table.name)?;
                last_report = Some(report);
            }
        }
    }
    Ok(last_report)
}

/// Execute a SELECT into an unnamed result dataset.
fn run_select(
    env: &mut DataEnvironment,
    handler: &Handler,
    query: &SelectStmt,
) -> Result<Dataset, EngineError> {
    if query.from.len() > 1 {
        return Err(EngineError::UnsupportedSql(
            "multi-table queries are not supported".into(),
        ));
    }
    if !query.group_by.is_empty() {
        return Err(EngineError::UnsupportedSql(
            "GROUP BY aggregation is not supported".into(),
        ));
    }
    if query.having.is_some() {
        return Err(EngineError::UnsupportedSql("HAVING is not supported".into()));
    }

    let source = &query.from[0];
    let input = env
        .store
        .open_dataset(source.libref.as_deref(), &source.name)?
        .clone();

    let mut selected = filter_rows(&input, query.where_clause.as_ref(), handler)?;

    if !query.order_by.is_empty() {
        let keys: Vec<usize> = query
            .order_by
            .iter()
            .map(|name| column_index(&input, name))
            .collect::<Result<_, _>>()?;
        selected.sort_by(|&a, &b| {
            let ka = input.key_tuple(a, &keys);
            let kb = input.key_tuple(b, &keys);
            sable_data::cmp_key_tuples(&ka, &kb)
        });
    }

    let columns: Vec<usize> = match &query.columns {
        SelectColumns::Star => (0..input.var_count()).collect(),
        SelectColumns::Names(names) => names
            .iter()
            .map(|name| column_index(&input, name))
            .collect::<Result<_, _>>()?,
    };

    let mut result = Dataset::new("WORK", "_query_");
    for &col in &columns {
        result.catalog.push(input.catalog[col].clone());
    }
    for &row in &selected {
        let cells: Vec<Cell> = columns.iter().map(|&col| input.rows[row][col].clone()).collect();
        result.rows.push(cells);
    }
    Ok(result)
}

/// Align an inserted row to the catalog, coercing each value to the
/// column kind.
fn coerce_row(dataset: &mut Dataset, cells: Vec<Cell>) -> Vec<Cell> {
    let mut row = Vec::with_capacity(dataset.catalog.len());
    for (col, cell) in cells.into_iter().enumerate() {
        if col >= dataset.catalog.len() {
            break;
        }
        row.push(coerce_cell(&mut dataset.catalog[col], cell));
    }
    row
}

fn coerce_cell(def: &mut VarDef, value: Cell) -> Cell {
    match def.kind {
        VarKind::Numeric => Cell::Num(value.to_number()),
        VarKind::Character => {
            let text = value.to_text();
            def.widen(text.len());
            Cell::Str(text)
        }
    }
}

fn report_of(dataset: &Dataset) -> StepReport {
    StepReport {
        dataset: dataset.display_name(),
        rows: dataset.row_count(),
        vars: dataset.var_count(),
    }
}

/// Swap a dataset into its library and write it out.
fn persist(
    env: &mut DataEnvironment,
    dataset: Dataset,
    libref: &str,
    name: &str,
) -> Result<StepReport, EngineError> {
    let report = report_of(&dataset);
    env.store.put_dataset(dataset)?;
    env.store.save_dataset(Some(libref), name)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_par::{Parser, ProcStep, StatementKind};
    use sable_util::MemorySink;

    fn env_with_t() -> DataEnvironment {
        let mut env = DataEnvironment::new().unwrap();
        let ds = env.store.get_or_create_dataset(None, "t").unwrap();
        ds.add_var(VarDef::numeric("x"));
        ds.add_var(VarDef::character("name", 5));
        for (x, name) in [(5.0, "BOB"), (15.0, "ALICE"), (10.0, "CAROL")] {
            ds.push_row(vec![Cell::Num(x), Cell::Str(name.into())]);
        }
        env
    }

    fn parse_sql(source: &str) -> SqlProc {
        let handler = Handler::new();
        let tokens = sable_lex::tokenize(source, &handler);
        let program = Parser::new(source, tokens, &handler).parse();
        assert!(
            !handler.has_errors(),
            "parse errors: {:?}",
            handler.diagnostics()
        );
        match program.statements.into_iter().next().map(|s| s.kind) {
            Some(StatementKind::Proc(ProcStep::Sql(sql))) => sql,
            other => panic!("expected proc sql, got {other:?}"),
        }
    }

    fn run_sql(env: &mut DataEnvironment, source: &str) -> MemorySink {
        let handler = Handler::new();
        let sink = MemorySink::new();
        run(env, &handler, &mut sink.clone(), &parse_sql(source)).unwrap();
        sink
    }

    #[test]
    fn test_select_where_order_by() {
        let mut env = env_with_t();
        let sink = run_sql(
            &mut env,
            "proc sql; select name from t where x >= 10 order by x; quit;",
        );
        let lines = sink.lines();
        assert_eq!(lines[0], "name");
        assert_eq!(lines[2], "CAROL");
        assert_eq!(lines[3], "ALICE");
    }

    #[test]
    fn test_create_table_empty_catalog() {
        let mut env = env_with_t();
        run_sql(
            &mut env,
            "proc sql; create table u (id num, tag char(4)); quit;",
        );
        let ds = env.store.open_dataset(None, "u").unwrap();
        assert_eq!(ds.var_count(), 2);
        assert_eq!(ds.row_count(), 0);
        assert_eq!(ds.catalog[1].kind, VarKind::Character);
        assert_eq!(ds.catalog[1].length, 4);
    }

    #[test]
    fn test_create_table_as_select() {
        let mut env = env_with_t();
        run_sql(
            &mut env,
            "proc sql; create table big as select * from t where x > 7; quit;",
        );
        let ds = env.store.open_dataset(None, "big").unwrap();
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.display_name(), "WORK.BIG");
    }

    #[test]
    fn test_insert_update_delete() {
        let mut env = env_with_t();
        run_sql(
            &mut env,
            "proc sql; insert into t values (20, 'DAVE'); update t set x = x + 1 where x = 20; delete from t where x = 5; quit;",
        );
        let ds = env.store.open_dataset(None, "t").unwrap();
        assert_eq!(ds.row_count(), 3);
        assert!(ds
            .rows
            .iter()
            .any(|r| r == &vec![Cell::Num(21.0), Cell::Str("DAVE".into())]));
        assert!(!ds.rows.iter().any(|r| r[0] == Cell::Num(5.0)));
    }

    #[test]
    fn test_group_by_is_unsupported() {
        let mut env = env_with_t();
        let handler = Handler::new();
        let sink = MemorySink::new();
        let sql = parse_sql("proc sql; select x from t group by x; quit;");
        let err = run(&mut env, &handler, &mut sink.clone(), &sql).unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedSql(_)));
    }

    #[test]
    fn test_multi_table_is_unsupported() {
        let mut env = env_with_t();
        let handler = Handler::new();
        let sink = MemorySink::new();
        let sql = parse_sql("proc sql; select x from t, t; quit;");
        let err = run(&mut env, &handler, &mut sink.clone(), &sql).unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedSql(_)));
    }

    #[test]
    fn test_unknown_select_column() {
        let mut env = env_with_t();
        let handler = Handler::new();
        let sink = MemorySink::new();
        let sql = parse_sql("proc sql; select ghost from t; quit;");
        let err = run(&mut env, &handler, &mut sink.clone(), &sql).unwrap_err();
        assert!(matches!(err, EngineError::UnknownColumn { .. }));
    }
}
