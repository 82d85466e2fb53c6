//! PROC PRINT: formatted rows to the list sink.

use sable_par::PrintProc;
use sable_util::{Handler, LineSink};

use crate::env::DataEnvironment;
use crate::error::EngineError;
use crate::procs::{column_index, render_table};

pub fn run(
    env: &mut DataEnvironment,
    _handler: &Handler,
    list: &mut dyn LineSink,
    print: &PrintProc,
) -> Result<(), EngineError> {
    let input = env
        .store
        .open_dataset(print.data.libref.as_deref(), &print.data.name)?
        .clone();

    // Column selection: VAR subset, or the whole catalog.
    let columns: Vec<usize> = if print.var_variables.is_empty() {
        (0..input.var_count()).collect()
    } else {
        print
            .var_variables
            .iter()
            .map(|name| column_index(&input, name))
            .collect::<Result<_, _>>()?
    };

    // OBS= on the statement wins over the session option.
    let limit = print
        .obs
        .or_else(|| env.option_row_count("OBS"))
        .unwrap_or(usize::MAX);
    let shown = input.row_count().min(limit);

    if let Some(title) = &env.title {
        list.write_line(title);
    }

    let mut headers = Vec::new();
    if !print.noobs {
        headers.push("Obs".to_string());
    }
    for &col in &columns {
        let def = &input.catalog[col];
        let header = if print.label {
            def.label.clone().unwrap_or_else(|| def.name.clone())
        } else {
            def.name.clone()
        };
        headers.push(header);
    }

    let mut rows = Vec::with_capacity(shown);
    for row in 0..shown {
        let mut fields = Vec::with_capacity(headers.len());
        if !print.noobs {
            fields.push((row + 1).to_string());
        }
        for &col in &columns {
            fields.push(input.rows[row][col].to_string());
        }
        rows.push(fields);
    }

    for line in render_table(&headers, &rows) {
        list.write_line(&line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_data::{Cell, VarDef};
    use sable_par::DatasetRef;
    use sable_util::MemorySink;

    fn env_with_people() -> DataEnvironment {
        let mut env = DataEnvironment::new().unwrap();
        let ds = env.store.get_or_create_dataset(None, "people").unwrap();
        let mut name = VarDef::character("name", 5);
        name.label = Some("Full Name".to_string());
        ds.add_var(name);
        ds.add_var(VarDef::numeric("age"));
        for (name, age) in [("ALICE", 30.0), ("BOB", 25.0), ("CAROL", 41.0)] {
            ds.push_row(vec![Cell::Str(name.into()), Cell::Num(age)]);
        }
        env
    }

    fn print_proc() -> PrintProc {
        PrintProc {
            data: DatasetRef::work("people"),
            obs: None,
            noobs: false,
            label: false,
            var_variables: Vec::new(),
        }
    }

    #[test]
    fn test_print_all_rows_with_obs_column() {
        let mut env = env_with_people();
        let handler = Handler::new();
        let sink = MemorySink::new();
        run(&mut env, &handler, &mut sink.clone(), &print_proc()).unwrap();

        let lines = sink.lines();
        assert!(lines[0].starts_with("Obs"));
        assert!(sink.contains("ALICE"));
        assert!(sink.contains("CAROL"));
        // header + divider + 3 rows
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_obs_limit_and_noobs() {
        let mut env = env_with_people();
        let handler = Handler::new();
        let sink = MemorySink::new();
        let mut proc = print_proc();
        proc.obs = Some(2);
        proc.noobs = true;
        run(&mut env, &handler, &mut sink.clone(), &proc).unwrap();

        let lines = sink.lines();
        assert!(!lines[0].starts_with("Obs"));
        assert!(sink.contains("BOB"));
        assert!(!sink.contains("CAROL"));
    }

    #[test]
    fn test_label_headers() {
        let mut env = env_with_people();
        let handler = Handler::new();
        let sink = MemorySink::new();
        let mut proc = print_proc();
        proc.label = true;
        run(&mut env, &handler, &mut sink.clone(), &proc).unwrap();
        assert!(sink.contains("Full Name"));
    }

    #[test]
    fn test_var_subset() {
        let mut env = env_with_people();
        let handler = Handler::new();
        let sink = MemorySink::new();
        let mut proc = print_proc();
        proc.var_variables = vec!["age".to_string()];
        run(&mut env, &handler, &mut sink.clone(), &proc).unwrap();
        assert!(sink.contains("age"));
        assert!(!sink.contains("ALICE"));
    }

    #[test]
    fn test_title_precedes_listing() {
        let mut env = env_with_people();
        env.title = Some("People Report".to_string());
        let handler = Handler::new();
        let sink = MemorySink::new();
        run(&mut env, &handler, &mut sink.clone(), &print_proc()).unwrap();
        assert_eq!(sink.lines()[0], "People Report");
    }

    #[test]
    fn test_session_obs_option_applies() {
        let mut env = env_with_people();
        env.set_option("obs", Some("1"));
        let handler = Handler::new();
        let sink = MemorySink::new();
        run(&mut env, &handler, &mut sink.clone(), &print_proc()).unwrap();
        assert!(sink.contains("ALICE"));
        assert!(!sink.contains("BOB"));
    }
}
