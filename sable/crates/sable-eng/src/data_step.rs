//! The DATA-step executor.
//!
//! Execution is two-phase. A pre-scan walks the step body once and pulls
//! out everything declarative: INPUT variables, DATALINES blocks, DROP
//! and KEEP lists, ARRAY registrations, RETAIN flags with their initial
//! values, and the SET/MERGE input resolution. What remains is the
//! per-row program.
//!
//! The row driver then runs in one of two modes: over the rows of the
//! input dataset (SET, or the virtual dataset a MERGE BY produces), or
//! over the whitespace-split lines of the datalines block. A step with
//! neither input runs its body exactly once.
//!
//! Output staging: rows are appended to a buffer and the dataset is
//! built, filtered through DROP/KEEP, and swapped into the library only
//! at step end, so a step reading and writing the same name never sees
//! its own output.

use rustc_hash::FxHashSet;

use sable_data::{Cell, Dataset, Pdv};
use sable_par::{
    AssignTarget, DataStep, DataStmt, DatasetRef, DoSpec, DoStmt, Expr, IfStmt, InputVar,
};
use sable_util::{Handler, Span};

use crate::env::DataEnvironment;
use crate::error::EngineError;
use crate::eval::{eval, ArrayTable};
use crate::merge::build_merged_input;

/// Runaway guard for DO WHILE / DO UNTIL.
pub const LOOP_GUARD_LIMIT: usize = 1000;

/// Row/column counts of a persisted step output, for the NOTE line.
#[derive(Clone, Debug, PartialEq)]
pub struct StepReport {
    pub dataset: String,
    pub rows: usize,
    pub vars: usize,
}

/// Execute one DATA step against the environment.
pub fn execute(
    env: &mut DataEnvironment,
    handler: &Handler,
    step: &DataStep,
) -> Result<StepReport, EngineError> {
    Executor {
        env,
        handler,
        pdv: Pdv::new(),
        arrays: ArrayTable::new(),
        out_rows: Vec::new(),
        emit_flag: false,
    }
    .run(step)
}

/// What the pre-scan extracted from the step body.
#[derive(Default)]
struct PreScan {
    input_vars: Vec<InputVar>,
    datalines: Vec<String>,
    drop: FxHashSet<String>,
    keep: FxHashSet<String>,
    set: Option<DatasetRef>,
    merge: Option<Vec<DatasetRef>>,
    by: Vec<String>,
}

struct Executor<'a> {
    env: &'a mut DataEnvironment,
    handler: &'a Handler,
    pdv: Pdv,
    arrays: ArrayTable,
    out_rows: Vec<Vec<Cell>>,
    emit_flag: bool,
}

impl<'a> Executor<'a> {
    fn run(mut self, step: &DataStep) -> Result<StepReport, EngineError> {
        let mut scan = PreScan::default();
        self.prescan(&step.body, &mut scan)?;

        // Input-variable slots go in first so datalines columns lead the
        // catalog in declaration order.
        for var in &scan.input_vars {
            self.pdv.add_variable(&var.name, !var.is_character);
        }

        // Resolve the input dataset and pre-populate the PDV catalog.
        let input = self.resolve_input(&scan)?;
        if let Some(dataset) = &input {
            self.pdv.init_from_dataset(dataset);
        }

        let program: Vec<&DataStmt> = step
            .body
            .iter()
            .filter(|stmt| !is_declarative(stmt))
            .collect();
        let explicit_output = stmts_contain_output(&step.body);

        match &input {
            Some(dataset) => {
                for row in 0..dataset.row_count() {
                    if row > 0 {
                        self.pdv.reset_non_retained();
                    }
                    self.pdv.load_row(dataset, row);
                    self.run_row(&program, explicit_output)?;
                }
            }
            None if scan.datalines.is_empty() => {
                // No input dataset, no datalines: the body still runs
                // once.
                self.run_row(&program, explicit_output)?;
            }
            None => {
                for line in &scan.datalines {
                    let fields: Vec<&str> = line.split_whitespace().collect();
                    if fields.is_empty() {
                        continue;
                    }
                    self.load_fields(&scan.input_vars, &fields);
                    self.run_row(&program, explicit_output)?;
                    self.pdv.reset_non_retained();
                }
            }
        }

        self.finish(step, &scan)
    }

    // ========================================================================
    // PRE-SCAN
    // ========================================================================

    fn prescan(&mut self, stmts: &[DataStmt], scan: &mut PreScan) -> Result<(), EngineError> {
        for stmt in stmts {
            match stmt {
                DataStmt::Input(vars) => scan.input_vars.extend(vars.iter().cloned()),
                DataStmt::Datalines(text) => {
                    scan.datalines.extend(text.lines().map(str::to_string));
                }
                DataStmt::Drop(names) => {
                    scan.drop
                        .extend(names.iter().map(|n| n.to_ascii_uppercase()));
                }
                DataStmt::Keep(names) => {
                    scan.keep
                        .extend(names.iter().map(|n| n.to_ascii_uppercase()));
                }
                DataStmt::Set(dataset) => scan.set = Some(dataset.clone()),
                DataStmt::Merge(datasets) => scan.merge = Some(datasets.clone()),
                DataStmt::By(vars) => scan.by = vars.clone(),
                DataStmt::Array(decl) => {
                    self.arrays.register(decl)?;
                    for var in &decl.vars {
                        self.pdv.add_variable(var, true);
                    }
                }
                DataStmt::Retain(items) => {
                    for item in items {
                        let is_numeric = !matches!(item.initial, Some(Expr::Str(_)));
                        let index = self.pdv.add_variable(&item.name, is_numeric);
                        self.pdv.set_retain_flag(&item.name, true);
                        if let Some(initial) = &item.initial {
                            let value = eval(initial, &self.pdv, &self.arrays, self.handler)?;
                            self.pdv.set(index, value);
                        }
                    }
                }
                DataStmt::If(if_stmt) => {
                    for (_, branch) in &if_stmt.branches {
                        self.prescan(std::slice::from_ref(branch.as_ref()), scan)?;
                    }
                    if let Some(branch) = &if_stmt.else_branch {
                        self.prescan(std::slice::from_ref(branch.as_ref()), scan)?;
                    }
                }
                DataStmt::Do(do_stmt) => self.prescan(&do_stmt.body, scan)?,
                DataStmt::Assign { .. } | DataStmt::Output => {}
            }
        }
        Ok(())
    }

    fn resolve_input(&mut self, scan: &PreScan) -> Result<Option<Dataset>, EngineError> {
        if let Some(refs) = &scan.merge {
            let mut inputs = Vec::with_capacity(refs.len());
            for dataset_ref in refs {
                inputs.push(self.open_snapshot(dataset_ref)?);
            }
            return Ok(Some(build_merged_input(inputs, &scan.by)?));
        }
        if let Some(dataset_ref) = &scan.set {
            return Ok(Some(self.open_snapshot(dataset_ref)?));
        }
        Ok(None)
    }

    /// Read snapshot of an input dataset. The executor never reads and
    /// writes the same dataset object.
    fn open_snapshot(&mut self, dataset_ref: &DatasetRef) -> Result<Dataset, EngineError> {
        Ok(self
            .env
            .store
            .open_dataset(dataset_ref.libref.as_deref(), &dataset_ref.name)?
            .clone())
    }

    // ========================================================================
    // ROW DRIVER
    // ========================================================================

    fn run_row(
        &mut self,
        program: &[&DataStmt],
        explicit_output: bool,
    ) -> Result<(), EngineError> {
        self.emit_flag = false;
        for stmt in program {
            self.exec_stmt(stmt)?;
        }
        if !explicit_output || self.emit_flag {
            self.out_rows.push(self.pdv.snapshot());
        }
        Ok(())
    }

    /// Assign whitespace-split datalines fields to the INPUT variables in
    /// order. Numerics that fail to parse, and absent fields, go missing.
    fn load_fields(&mut self, input_vars: &[InputVar], fields: &[&str]) {
        for (position, var) in input_vars.iter().enumerate() {
            let index = self.pdv.add_variable(&var.name, !var.is_character);
            let cell = match fields.get(position) {
                None => Cell::missing(!var.is_character),
                Some(field) if var.is_character => Cell::Str(field.to_string()),
                Some(field) => field
                    .parse::<f64>()
                    .map(Cell::Num)
                    .unwrap_or_else(|_| Cell::missing_num()),
            };
            self.pdv.set(index, cell);
        }
    }

    // ========================================================================
    // PER-ROW STATEMENTS
    // ========================================================================

    fn exec_stmt(&mut self, stmt: &DataStmt) -> Result<(), EngineError> {
        match stmt {
            DataStmt::Assign { target, expr } => {
                let value = eval(expr, &self.pdv, &self.arrays, self.handler)?;
                let name = match target {
                    AssignTarget::Var(name) => name.clone(),
                    AssignTarget::ArrayElem { array, index } => {
                        let subscript =
                            eval(index, &self.pdv, &self.arrays, self.handler)?.to_number();
                        self.arrays.resolve(array, subscript)?.to_string()
                    }
                };
                let index = self.pdv.add_variable(&name, value.is_numeric());
                self.pdv.set(index, value);
                Ok(())
            }
            DataStmt::If(if_stmt) => self.exec_if(if_stmt),
            DataStmt::Do(do_stmt) => self.exec_do(do_stmt),
            DataStmt::Output => {
                self.emit_flag = true;
                Ok(())
            }
            // Declarative statements were consumed by the pre-scan.
            DataStmt::Set(_)
            | DataStmt::Merge(_)
            | DataStmt::By(_)
            | DataStmt::Input(_)
            | DataStmt::Datalines(_)
            | DataStmt::Drop(_)
            | DataStmt::Keep(_)
            | DataStmt::Retain(_)
            | DataStmt::Array(_) => Ok(()),
        }
    }

    /// First branch whose condition is non-zero runs; ELSE when none did.
    fn exec_if(&mut self, if_stmt: &IfStmt) -> Result<(), EngineError> {
        for (cond, branch) in &if_stmt.branches {
            if eval(cond, &self.pdv, &self.arrays, self.handler)?.is_truthy() {
                return self.exec_stmt(branch);
            }
        }
        match &if_stmt.else_branch {
            Some(branch) => self.exec_stmt(branch),
            None => Ok(()),
        }
    }

    fn exec_do(&mut self, do_stmt: &DoStmt) -> Result<(), EngineError> {
        match &do_stmt.spec {
            DoSpec::Group => self.exec_body(&do_stmt.body),
            DoSpec::Iterative {
                var,
                start,
                end,
                by,
            } => {
                let start = eval(start, &self.pdv, &self.arrays, self.handler)?.to_number();
                let end = eval(end, &self.pdv, &self.arrays, self.handler)?.to_number();
                let step = match by {
                    Some(expr) => eval(expr, &self.pdv, &self.arrays, self.handler)?.to_number(),
                    None => 1.0,
                };
                if step == 0.0 {
                    return Err(EngineError::DoStepZero);
                }

                let index = self.pdv.add_variable(var, true);
                self.pdv.set(index, Cell::Num(start));
                let mut current = start;
                while (step > 0.0 && current <= end) || (step < 0.0 && current >= end) {
                    self.pdv.set(index, Cell::Num(current));
                    self.exec_body(&do_stmt.body)?;
                    // The body may reassign the loop variable.
                    current = self.pdv.get(index).to_number() + step;
                }
                // The loop variable ends one step past the last value.
                self.pdv.set(index, Cell::Num(current));
                Ok(())
            }
            DoSpec::While(cond) => {
                let mut iterations = 0usize;
                while eval(cond, &self.pdv, &self.arrays, self.handler)?.is_truthy() {
                    if iterations >= LOOP_GUARD_LIMIT {
                        self.loop_guard_tripped("WHILE");
                        break;
                    }
                    self.exec_body(&do_stmt.body)?;
                    iterations += 1;
                }
                Ok(())
            }
            DoSpec::Until(cond) => {
                let mut iterations = 0usize;
                loop {
                    self.exec_body(&do_stmt.body)?;
                    iterations += 1;
                    if eval(cond, &self.pdv, &self.arrays, self.handler)?.is_truthy() {
                        break;
                    }
                    if iterations >= LOOP_GUARD_LIMIT {
                        self.loop_guard_tripped("UNTIL");
                        break;
                    }
                }
                Ok(())
            }
        }
    }

    fn exec_body(&mut self, body: &[DataStmt]) -> Result<(), EngineError> {
        for stmt in body {
            self.exec_stmt(stmt)?;
        }
        Ok(())
    }

    fn loop_guard_tripped(&self, kind: &str) {
        self.handler.warning(
            format!("DO {kind} exceeded {LOOP_GUARD_LIMIT} iterations; loop terminated"),
            Span::DUMMY,
        );
    }

    // ========================================================================
    // STEP END
    // ========================================================================

    /// Build the output dataset from the PDV catalog and the staged rows,
    /// apply DROP/KEEP, swap it into the library and persist it.
    fn finish(self, step: &DataStep, scan: &PreScan) -> Result<StepReport, EngineError> {
        let kept: Vec<usize> = self
            .pdv
            .vars()
            .iter()
            .enumerate()
            .filter(|(_, var)| {
                let upper = var.name.to_ascii_uppercase();
                let kept_by_keep = scan.keep.is_empty() || scan.keep.contains(&upper);
                kept_by_keep && !scan.drop.contains(&upper)
            })
            .map(|(index, _)| index)
            .collect();

        let libref = step
            .output
            .libref
            .clone()
            .unwrap_or_else(|| sable_data::WORK_LIBREF.to_string());
        let mut out = Dataset::new(libref.clone(), step.output.name.clone());
        for &index in &kept {
            out.catalog.push(self.pdv.vars()[index].to_def());
        }
        for snapshot in &self.out_rows {
            let row: Vec<Cell> = kept
                .iter()
                .map(|&index| {
                    snapshot.get(index).cloned().unwrap_or_else(|| {
                        Cell::missing(self.pdv.vars()[index].is_numeric)
                    })
                })
                .collect();
            out.rows.push(row);
        }

        let report = StepReport {
            dataset: out.display_name(),
            rows: out.row_count(),
            vars: out.var_count(),
        };
        self.env.store.put_dataset(out)?;
        self.env
            .store
            .save_dataset(Some(&libref), &step.output.name)?;
        Ok(report)
    }
}

fn is_declarative(stmt: &DataStmt) -> bool {
    matches!(
        stmt,
        DataStmt::Set(_)
            | DataStmt::Merge(_)
            | DataStmt::By(_)
            | DataStmt::Input(_)
            | DataStmt::Datalines(_)
            | DataStmt::Drop(_)
            | DataStmt::Keep(_)
            | DataStmt::Retain(_)
            | DataStmt::Array(_)
    )
}

/// Does the body contain an OUTPUT statement anywhere, including inside
/// IF branches and DO bodies?
fn stmts_contain_output(stmts: &[DataStmt]) -> bool {
    stmts.iter().any(|stmt| match stmt {
        DataStmt::Output => true,
        DataStmt::Do(do_stmt) => stmts_contain_output(&do_stmt.body),
        DataStmt::If(if_stmt) => {
            if_stmt
                .branches
                .iter()
                .any(|(_, branch)| stmts_contain_output(std::slice::from_ref(branch.as_ref())))
                || if_stmt
                    .else_branch
                    .as_ref()
                    .map(|branch| stmts_contain_output(std::slice::from_ref(branch.as_ref())))
                    .unwrap_or(false)
        }
        _ => false,
    })
}
