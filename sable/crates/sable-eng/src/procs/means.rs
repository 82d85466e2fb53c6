//! PROC MEANS: per-variable summary statistics with optional WHERE
//! filter and OUT= result dataset.

use sable_data::{Cell, Dataset, VarDef, MISSING};
use sable_par::{MeansProc, StatKind};
use sable_util::{Handler, LineSink, Span};

use crate::data_step::StepReport;
use crate::env::DataEnvironment;
use crate::error::EngineError;
use crate::procs::{column_index, filter_rows, render_table};

/// Computed statistics for one analysis variable. `MISSING` marks a
/// statistic that could not be computed (no data, or N < 2 for STD).
struct VarStats {
    name: String,
    n: f64,
    mean: f64,
    median: f64,
    std: f64,
    min: f64,
    max: f64,
}

impl VarStats {
    fn get(&self, stat: StatKind) -> f64 {
        match stat {
            StatKind::N => self.n,
            StatKind::Mean => self.mean,
            StatKind::Median => self.median,
            StatKind::Std => self.std,
            StatKind::Min => self.min,
            StatKind::Max => self.max,
        }
    }
}

pub fn run(
    env: &mut DataEnvironment,
    handler: &Handler,
    list: &mut dyn LineSink,
    means: &MeansProc,
) -> Result<Option<StepReport>, EngineError> {
    let input = env
        .store
        .open_dataset(means.data.libref.as_deref(), &means.data.name)?
        .clone();
    let selected = filter_rows(&input, means.where_clause.as_ref(), handler)?;

    // An empty VAR list analyses every numeric variable of the input.
    let var_names: Vec<String> = if means.var_variables.is_empty() {
        input
            .catalog
            .iter()
            .filter(|v| v.is_numeric())
            .map(|v| v.name.clone())
            .collect()
    } else {
        means.var_variables.clone()
    };

    let stats = if means.stats.is_empty() {
        StatKind::all()
    } else {
        means.stats.clone()
    };

    let mut computed = Vec::with_capacity(var_names.len());
    for name in &var_names {
        let col = column_index(&input, name)?;
        if !input.catalog[col].is_numeric() {
            handler.warning(
                format!("variable '{name}' is character; skipped by PROC MEANS"),
                Span::DUMMY,
            );
            continue;
        }
        let values: Vec<f64> = selected
            .iter()
            .map(|&row| input.rows[row][col].to_number())
            .filter(|v| *v != MISSING)
            .collect();
        computed.push(summarize(&input.catalog[col].name, &values));
    }

    // Listing output.
    if let Some(title) = &env.title {
        list.write_line(title);
    }
    let mut headers = vec!["Variable".to_string()];
    headers.extend(stats.iter().map(|s| s.label().to_string()));
    let table_rows: Vec<Vec<String>> = computed
        .iter()
        .map(|vs| {
            let mut row = vec![vs.name.clone()];
            row.extend(stats.iter().map(|s| fmt_stat(vs.get(*s))));
            row
        })
        .collect();
    for line in render_table(&headers, &table_rows) {
        list.write_line(&line);
    }

    // Tidy result dataset: one row per analysis variable.
    let Some(out_ref) = &means.out else {
        return Ok(None);
    };
    let libref = out_ref
        .libref
        .clone()
        .unwrap_or_else(|| sable_data::WORK_LIBREF.to_string());
    let mut out = Dataset::new(libref.clone(), out_ref.name.clone());
    let name_width = computed.iter().map(|vs| vs.name.len()).max().unwrap_or(0);
    out.add_var(VarDef::character("variable", name_width));
    for stat in &stats {
        out.add_var(VarDef::numeric(stat.label().to_ascii_lowercase()));
    }
    for vs in &computed {
        let mut row = vec![Cell::Str(vs.name.clone())];
        row.extend(stats.iter().map(|s| Cell::Num(vs.get(*s))));
        out.push_row(row);
    }

    let report = StepReport {
        dataset: out.display_name(),
        rows: out.row_count(),
        vars: out.var_count(),
    };
    env.store.put_dataset(out)?;
    env.store.save_dataset(Some(&libref), &out_ref.name)?;
    Ok(Some(report))
}

/// Summary statistics over the non-missing values of one variable.
fn summarize(name: &str, values: &[f64]) -> VarStats {
    let n = values.len();
    if n == 0 {
        return VarStats {
            name: name.to_string(),
            n: 0.0,
            mean: MISSING,
            median: MISSING,
            std: MISSING,
            min: MISSING,
            max: MISSING,
        };
    }

    let sum: f64 = values.iter().sum();
    let mean = sum / n as f64;

    let mut ordered = values.to_vec();
    ordered.sort_by(f64::total_cmp);
    let median = if n % 2 == 1 {
        ordered[n / 2]
    } else {
        (ordered[n / 2 - 1] + ordered[n / 2]) / 2.0
    };

    // Sample standard deviation, denominator N - 1.
    let std = if n > 1 {
        let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
        (ss / (n as f64 - 1.0)).sqrt()
    } else {
        MISSING
    };

    VarStats {
        name: name.to_string(),
        n: n as f64,
        mean,
        median,
        std,
        min: ordered[0],
        max: ordered[n - 1],
    }
}

/// Listing format for a statistic: missing as '.', short decimals.
fn fmt_stat(value: f64) -> String {
    if value == MISSING {
        ".".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let text = format!("{value:.6}");
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_par::DatasetRef;
    use sable_util::MemorySink;

    fn env_with_scores() -> DataEnvironment {
        let mut env = DataEnvironment::new().unwrap();
        let ds = env.store.get_or_create_dataset(None, "scores").unwrap();
        ds.add_var(VarDef::numeric("x"));
        ds.add_var(VarDef::character("who", 1));
        for (x, who) in [(2.0, "a"), (4.0, "b"), (6.0, "c"), (MISSING, "d")] {
            ds.push_row(vec![Cell::Num(x), Cell::Str(who.into())]);
        }
        env
    }

    fn means_proc(out: Option<&str>) -> MeansProc {
        MeansProc {
            data: DatasetRef::work("scores"),
            out: out.map(DatasetRef::work),
            stats: Vec::new(),
            var_variables: vec!["x".to_string()],
            where_clause: None,
        }
    }

    #[test]
    fn test_statistics_skip_missing() {
        let mut env = env_with_scores();
        let handler = Handler::new();
        let sink = MemorySink::new();
        run(&mut env, &handler, &mut sink.clone(), &means_proc(Some("stats"))).unwrap();

        let out = env.store.open_dataset(None, "stats").unwrap();
        assert_eq!(out.row_count(), 1);
        assert_eq!(out.cell_by_name(0, "variable"), Some(&Cell::Str("x".into())));
        assert_eq!(out.cell_by_name(0, "n"), Some(&Cell::Num(3.0)));
        assert_eq!(out.cell_by_name(0, "mean"), Some(&Cell::Num(4.0)));
        assert_eq!(out.cell_by_name(0, "median"), Some(&Cell::Num(4.0)));
        assert_eq!(out.cell_by_name(0, "std"), Some(&Cell::Num(2.0)));
        assert_eq!(out.cell_by_name(0, "min"), Some(&Cell::Num(2.0)));
        assert_eq!(out.cell_by_name(0, "max"), Some(&Cell::Num(6.0)));
    }

    #[test]
    fn test_even_count_median_is_midpoint() {
        let stats = summarize("x", &[1.0, 2.0, 10.0, 4.0]);
        assert_eq!(stats.median, 3.0);
    }

    #[test]
    fn test_single_value_std_is_missing() {
        let stats = summarize("x", &[5.0]);
        assert_eq!(stats.std, MISSING);
        assert_eq!(stats.mean, 5.0);
    }

    #[test]
    fn test_where_filter_applies() {
        let mut env = env_with_scores();
        let handler = Handler::new();
        let sink = MemorySink::new();
        let mut proc = means_proc(Some("stats"));

        let source = "x > 2";
        let tokens = sable_lex::tokenize(source, &handler);
        proc.where_clause = Some(
            sable_par::Parser::new(source, tokens, &handler)
                .parse_expr()
                .unwrap(),
        );
        run(&mut env, &handler, &mut sink.clone(), &proc).unwrap();

        let out = env.store.open_dataset(None, "stats").unwrap();
        assert_eq!(out.cell_by_name(0, "n"), Some(&Cell::Num(2.0)));
        assert_eq!(out.cell_by_name(0, "mean"), Some(&Cell::Num(5.0)));
    }

    #[test]
    fn test_empty_var_list_takes_all_numerics() {
        let mut env = env_with_scores();
        let handler = Handler::new();
        let sink = MemorySink::new();
        let mut proc = means_proc(None);
        proc.var_variables.clear();
        run(&mut env, &handler, &mut sink.clone(), &proc).unwrap();

        // Only the numeric column appears in the listing.
        assert!(sink.contains("x"));
        assert!(!sink.lines().iter().any(|l| l.starts_with("who")));
    }

    #[test]
    fn test_character_var_warns_and_skips() {
        let mut env = env_with_scores();
        let handler = Handler::new();
        let sink = MemorySink::new();
        let mut proc = means_proc(None);
        proc.var_variables = vec!["who".to_string()];
        run(&mut env, &handler, &mut sink.clone(), &proc).unwrap();
        assert_eq!(handler.warning_count(), 1);
    }

    #[test]
    fn test_unknown_var_errors() {
        let mut env = env_with_scores();
        let handler = Handler::new();
        let sink = MemorySink::new();
        let mut proc = means_proc(None);
        proc.var_variables = vec!["ghost".to_string()];
        let err = run(&mut env, &handler, &mut sink.clone(), &proc).unwrap_err();
        assert!(matches!(err, EngineError::UnknownColumn { .. }));
    }
}
