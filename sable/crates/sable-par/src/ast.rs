//! AST node definitions for the Sable language.
//!
//! Everything is a tagged union: one enum of statement kinds, one of
//! expression kinds, each variant carrying its fields. Dispatch sites
//! match exhaustively, so adding a statement kind is a compile error
//! everywhere it matters. Children are owned by their parent node; the
//! only cross-references (macro bodies) are raw source text owned by the
//! macro store.

use sable_util::Span;

/// A parsed program: a linear sequence of top-level statements.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

/// A top-level statement with its source span.
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    /// Span of the statement's full source text, terminator included.
    pub span: Span,
    /// True when the statement's token stream contains `&name` references;
    /// the driver re-expands such statements textually before executing.
    pub uses_macro_vars: bool,
}

/// Top-level statement kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum StatementKind {
    /// A DATA step: `data out; ... run;`
    DataStep(DataStep),

    /// A whole-dataset procedure: `proc sort ...; run;`
    Proc(ProcStep),

    /// `options key=value ...;`
    Options(Vec<SessionOption>),

    /// `libname lib 'path';`
    Libname { libref: String, path: String },

    /// `title 'text';`
    Title(String),

    /// `%macro name(p1, ...); body %mend;`
    MacroDefinition(MacroDef),

    /// `%name(a1, ...);`
    MacroCall { name: String, args: Vec<String> },

    /// `%let name = value;`
    MacroLet { name: String, value: String },
}

/// One `options` item: a flag or a `key=value` pair.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionOption {
    pub name: String,
    pub value: Option<String>,
}

/// A dataset reference, `libref.name` or bare `name` (defaults to WORK).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetRef {
    pub libref: Option<String>,
    pub name: String,
}

impl DatasetRef {
    pub fn new(libref: Option<String>, name: impl Into<String>) -> Self {
        Self {
            libref,
            name: name.into(),
        }
    }

    /// Bare name in the default library.
    pub fn work(name: impl Into<String>) -> Self {
        Self {
            libref: None,
            name: name.into(),
        }
    }

    /// Canonical `LIBREF.NAME` form used in diagnostics.
    pub fn display(&self) -> String {
        let libref = self.libref.as_deref().unwrap_or("WORK");
        format!(
            "{}.{}",
            libref.to_ascii_uppercase(),
            self.name.to_ascii_uppercase()
        )
    }
}

// ============================================================================
// DATA STEP
// ============================================================================

/// A DATA step: output dataset plus the statement body.
#[derive(Clone, Debug, PartialEq)]
pub struct DataStep {
    pub output: DatasetRef,
    pub body: Vec<DataStmt>,
}

/// Statements legal inside a DATA step.
#[derive(Clone, Debug, PartialEq)]
pub enum DataStmt {
    /// `set lib.name;` - names the input dataset
    Set(DatasetRef),

    /// `merge a b ...;`
    Merge(Vec<DatasetRef>),

    /// `by k1 k2 ...;`
    By(Vec<String>),

    /// `input name $ age ...;`
    Input(Vec<InputVar>),

    /// The raw text of a datalines block
    Datalines(String),

    /// `lhs = expr;`
    Assign { target: AssignTarget, expr: Expr },

    /// `if cond then stmt [else if cond then stmt]* [else stmt]`
    If(IfStmt),

    /// `output;`
    Output,

    /// `drop v1 ...;`
    Drop(Vec<String>),

    /// `keep v1 ...;`
    Keep(Vec<String>),

    /// `retain v1 [init1] ...;`
    Retain(Vec<RetainItem>),

    /// `array name {n} v1 ... vn;`
    Array(ArrayDecl),

    /// `do ...; body end;` in any of its four forms
    Do(DoStmt),
}

/// A declared input variable: `name` or `name $`.
#[derive(Clone, Debug, PartialEq)]
pub struct InputVar {
    pub name: String,
    pub is_character: bool,
}

/// Left-hand side of an assignment.
#[derive(Clone, Debug, PartialEq)]
pub enum AssignTarget {
    /// Plain variable
    Var(String),
    /// Array element `arr[i]`
    ArrayElem { array: String, index: Expr },
}

/// An IF/ELSE-IF/ELSE chain.
///
/// `branches` holds the IF and every ELSE IF in order; the first branch
/// whose condition is truthy runs, `else_branch` runs when none fired.
#[derive(Clone, Debug, PartialEq)]
pub struct IfStmt {
    pub branches: Vec<(Expr, Box<DataStmt>)>,
    pub else_branch: Option<Box<DataStmt>>,
}

/// One item of a RETAIN statement: the variable and an optional initial
/// value literal.
#[derive(Clone, Debug, PartialEq)]
pub struct RetainItem {
    pub name: String,
    pub initial: Option<Expr>,
}

/// An ARRAY declaration. `size` must match `vars.len()`; the executor
/// checks and aborts the step otherwise.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayDecl {
    pub name: String,
    pub size: usize,
    pub vars: Vec<String>,
}

/// A DO statement with its body.
#[derive(Clone, Debug, PartialEq)]
pub struct DoStmt {
    pub spec: DoSpec,
    pub body: Vec<DataStmt>,
}

/// The four DO forms.
#[derive(Clone, Debug, PartialEq)]
pub enum DoSpec {
    /// Plain `do; ... end;` grouping (THEN/ELSE bodies)
    Group,
    /// `do var = start to end [by step];`
    Iterative {
        var: String,
        start: Expr,
        end: Expr,
        by: Option<Expr>,
    },
    /// `do while(cond);` - condition checked at the top
    While(Expr),
    /// `do until(cond);` - condition checked at the bottom
    Until(Expr),
}

// ============================================================================
// PROCS
// ============================================================================

/// A procedure step.
#[derive(Clone, Debug, PartialEq)]
pub enum ProcStep {
    Sort(SortProc),
    Means(MeansProc),
    Freq(FreqProc),
    Print(PrintProc),
    Sql(SqlProc),
}

impl ProcStep {
    /// Procedure name for diagnostics and timing lines.
    pub fn name(&self) -> &'static str {
        match self {
            ProcStep::Sort(_) => "SORT",
            ProcStep::Means(_) => "MEANS",
            ProcStep::Freq(_) => "FREQ",
            ProcStep::Print(_) => "PRINT",
            ProcStep::Sql(_) => "SQL",
        }
    }
}

/// `proc sort data= out= nodupkey; by ...;`
#[derive(Clone, Debug, PartialEq)]
pub struct SortProc {
    pub data: DatasetRef,
    pub out: Option<DatasetRef>,
    pub by: Vec<String>,
    pub nodupkey: bool,
    pub duplicates: bool,
}

/// Statistics PROC MEANS can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatKind {
    N,
    Mean,
    Median,
    Std,
    Min,
    Max,
}

impl StatKind {
    pub fn label(&self) -> &'static str {
        match self {
            StatKind::N => "N",
            StatKind::Mean => "MEAN",
            StatKind::Median => "MEDIAN",
            StatKind::Std => "STD",
            StatKind::Min => "MIN",
            StatKind::Max => "MAX",
        }
    }

    /// All six statistics, in reporting order.
    pub fn all() -> Vec<StatKind> {
        vec![
            StatKind::N,
            StatKind::Mean,
            StatKind::Median,
            StatKind::Std,
            StatKind::Min,
            StatKind::Max,
        ]
    }
}

/// `proc means data= [stats] out=; var ...; where ...;`
///
/// An empty `stats` list means all six; an empty `var_variables` list
/// means every numeric variable of the input.
#[derive(Clone, Debug, PartialEq)]
pub struct MeansProc {
    pub data: DatasetRef,
    pub out: Option<DatasetRef>,
    pub stats: Vec<StatKind>,
    pub var_variables: Vec<String>,
    pub where_clause: Option<Expr>,
}

/// One `tables` request: `var` or `var1*var2`.
#[derive(Clone, Debug, PartialEq)]
pub struct TableRequest {
    pub row: String,
    pub col: Option<String>,
}

/// `proc freq data=; tables a b*c / chisq;`
#[derive(Clone, Debug, PartialEq)]
pub struct FreqProc {
    pub data: DatasetRef,
    pub tables: Vec<TableRequest>,
    pub chisq: bool,
}

/// `proc print data= obs= noobs label; var ...;`
#[derive(Clone, Debug, PartialEq)]
pub struct PrintProc {
    pub data: DatasetRef,
    pub obs: Option<usize>,
    pub noobs: bool,
    pub label: bool,
    pub var_variables: Vec<String>,
}

/// `proc sql; <statements> quit;`
#[derive(Clone, Debug, PartialEq)]
pub struct SqlProc {
    pub statements: Vec<SqlStatement>,
}

/// SQL statement kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlStatement {
    /// `select ... from ...`
    Select(SelectStmt),
    /// `create table t (col num, name char(20))`
    CreateTable {
        table: DatasetRef,
        columns: Vec<SqlColumnDef>,
    },
    /// `create table t as select ...`
    CreateTableAs {
        table: DatasetRef,
        query: SelectStmt,
    },
    /// `insert into t values (...), (...)`
    Insert {
        table: DatasetRef,
        values: Vec<Vec<Expr>>,
    },
    /// `update t set col = expr [where ...]`
    Update {
        table: DatasetRef,
        assignments: Vec<(String, Expr)>,
        where_clause: Option<Expr>,
    },
    /// `delete from t [where ...]`
    Delete {
        table: DatasetRef,
        where_clause: Option<Expr>,
    },
}

/// Select column list: `*` or explicit names.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectColumns {
    Star,
    Names(Vec<String>),
}

/// A SELECT query.
///
/// `from` keeps every listed table so the executor can surface multi-table
/// queries as unsupported instead of silently using the first.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectStmt {
    pub columns: SelectColumns,
    pub from: Vec<DatasetRef>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<String>,
    pub having: Option<Expr>,
    pub order_by: Vec<String>,
}

/// A column definition in `create table`: `name num` or `name char(n)`.
#[derive(Clone, Debug, PartialEq)]
pub struct SqlColumnDef {
    pub name: String,
    pub is_character: bool,
    pub length: Option<usize>,
}

// ============================================================================
// MACROS
// ============================================================================

/// A `%macro` definition. The body is kept as raw source text and only
/// lexed/parsed at call time, after parameter and `&name` substitution.
#[derive(Clone, Debug, PartialEq)]
pub struct MacroDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: String,
}

// ============================================================================
// EXPRESSIONS
// ============================================================================

/// Expression kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Number literal
    Number(f64),
    /// String literal
    Str(String),
    /// The missing-value literal `.`
    Missing,
    /// Variable reference
    Var(String),
    /// Unresolved `&name` reference. The driver substitutes these away
    /// before execution; reaching the evaluator is a macro error.
    MacroVar(String),
    /// Function call `name(args)`
    FuncCall { name: String, args: Vec<Expr> },
    /// Array element `arr[i]`
    ArrayElem { array: String, index: Box<Expr> },
    /// Unary operation
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Binary operation
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    /// Numeric negation
    Neg,
}

/// Binary operators, lowest precedence first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Or => "or",
            BinOp::And => "and",
            BinOp::Eq => "=",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Pow => "**",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_ref_display() {
        assert_eq!(DatasetRef::work("out").display(), "WORK.OUT");
        assert_eq!(
            DatasetRef::new(Some("Sales".into()), "q1").display(),
            "SALES.Q1"
        );
    }

    #[test]
    fn test_stat_kind_all_in_order() {
        let all = StatKind::all();
        assert_eq!(all.len(), 6);
        assert_eq!(all[0], StatKind::N);
        assert_eq!(all[5], StatKind::Max);
    }
}
