//! Expression evaluation over a PDV.
//!
//! Conversion rules:
//! - `to_number` on strings parses as double, yielding 0.0 on failure.
//! - A value is true iff its numeric view is non-zero.
//! - Division by zero yields NaN, which is distinct from missing and
//!   compares false with everything.
//! - Missing (`-inf`) participates in arithmetic as `-inf`.
//!
//! Unknown variables are demoted to a warning plus a missing value;
//! unknown functions are hard errors that abort the step.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;

use sable_data::{Cell, Pdv, MISSING};
use sable_par::{ArrayDecl, BinOp, Expr, UnaryOp};
use sable_util::{Handler, Span};

use crate::error::EngineError;

// ============================================================================
// ARRAYS
// ============================================================================

/// Step-local array registry: array name -> ordered element variables.
/// Cleared at step entry by construction (a fresh table per step).
#[derive(Default)]
pub struct ArrayTable {
    arrays: FxHashMap<String, ArrayInfo>,
}

struct ArrayInfo {
    /// Name as declared, for diagnostics.
    name: String,
    vars: Vec<String>,
}

impl ArrayTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an ARRAY declaration. The declared size must equal the
    /// number of listed variables.
    pub fn register(&mut self, decl: &ArrayDecl) -> Result<(), EngineError> {
        if decl.size != decl.vars.len() {
            return Err(EngineError::ArrayShape {
                name: decl.name.clone(),
                size: decl.size,
                given: decl.vars.len(),
            });
        }
        self.arrays.insert(
            decl.name.to_ascii_uppercase(),
            ArrayInfo {
                name: decl.name.clone(),
                vars: decl.vars.clone(),
            },
        );
        Ok(())
    }

    /// Element variables of an array, for pre-registration in the PDV.
    pub fn element_vars(&self) -> impl Iterator<Item = &str> {
        self.arrays
            .values()
            .flat_map(|info| info.vars.iter().map(String::as_str))
    }

    /// Resolve `name[index]` to the underlying element variable name.
    /// Subscripts are 1-based; anything outside the declared range (or
    /// non-integral) is a bounds error.
    pub fn resolve(&self, name: &str, index: f64) -> Result<&str, EngineError> {
        let info = self
            .arrays
            .get(&name.to_ascii_uppercase())
            .ok_or_else(|| EngineError::UndeclaredArray(name.to_string()))?;

        let size = info.vars.len();
        if index.fract() != 0.0 || index < 1.0 || index > size as f64 {
            return Err(EngineError::ArrayBounds {
                name: info.name.clone(),
                index: index as i64,
                size,
            });
        }
        Ok(&info.vars[index as usize - 1])
    }
}

// ============================================================================
// EVALUATOR
// ============================================================================

/// Evaluate an expression against the current PDV row.
pub fn eval(
    expr: &Expr,
    pdv: &Pdv,
    arrays: &ArrayTable,
    handler: &Handler,
) -> Result<Cell, EngineError> {
    match expr {
        Expr::Number(n) => Ok(Cell::Num(*n)),
        Expr::Str(s) => Ok(Cell::Str(s.clone())),
        Expr::Missing => Ok(Cell::missing_num()),
        Expr::Var(name) => Ok(read_var(name, pdv, handler)),
        Expr::MacroVar(name) => Err(EngineError::Macro(sable_mac::MacroError::Unresolved(
            name.clone(),
        ))),
        Expr::ArrayElem { array, index } => {
            let index = eval(index, pdv, arrays, handler)?.to_number();
            let var = arrays.resolve(array, index)?;
            Ok(read_var(var, pdv, handler))
        }
        Expr::FuncCall { name, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval(arg, pdv, arrays, handler)?);
            }
            call_function(name, &values, handler)
        }
        Expr::Unary { op, operand } => {
            let value = eval(operand, pdv, arrays, handler)?;
            match op {
                UnaryOp::Neg => {
                    let n = value.to_number();
                    if n == MISSING {
                        Ok(Cell::missing_num())
                    } else {
                        Ok(Cell::Num(-n))
                    }
                }
            }
        }
        Expr::Binary { op, lhs, rhs } => {
            let left = eval(lhs, pdv, arrays, handler)?;
            let right = eval(rhs, pdv, arrays, handler)?;
            Ok(apply_binop(*op, &left, &right))
        }
    }
}

/// Read a PDV variable; unknown names warn and yield numeric missing.
fn read_var(name: &str, pdv: &Pdv, handler: &Handler) -> Cell {
    match pdv.find_index(name) {
        Some(index) => pdv.get(index).clone(),
        None => {
            handler.warning(
                format!("variable '{name}' is uninitialized; using a missing value"),
                Span::DUMMY,
            );
            Cell::missing_num()
        }
    }
}

fn apply_binop(op: BinOp, left: &Cell, right: &Cell) -> Cell {
    match op {
        BinOp::Or => Cell::Num(bool_num(left.is_truthy() || right.is_truthy())),
        BinOp::And => Cell::Num(bool_num(left.is_truthy() && right.is_truthy())),
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            Cell::Num(bool_num(compare(op, left, right)))
        }
        BinOp::Add => Cell::Num(left.to_number() + right.to_number()),
        BinOp::Sub => Cell::Num(left.to_number() - right.to_number()),
        BinOp::Mul => Cell::Num(left.to_number() * right.to_number()),
        BinOp::Div => {
            let divisor = right.to_number();
            if divisor == 0.0 {
                Cell::Num(f64::NAN)
            } else {
                Cell::Num(left.to_number() / divisor)
            }
        }
        BinOp::Pow => Cell::Num(left.to_number().powf(right.to_number())),
    }
}

/// Comparison semantics: numeric compare when both numeric (NaN false
/// with everything), byte compare when both strings, and numeric-before-
/// string across kinds.
fn compare(op: BinOp, left: &Cell, right: &Cell) -> bool {
    let ordering = match (left, right) {
        (Cell::Num(a), Cell::Num(b)) => match a.partial_cmp(b) {
            Some(ordering) => ordering,
            None => return false, // NaN involved
        },
        (Cell::Str(a), Cell::Str(b)) => a.as_bytes().cmp(b.as_bytes()),
        (Cell::Num(_), Cell::Str(_)) => Ordering::Less,
        (Cell::Str(_), Cell::Num(_)) => Ordering::Greater,
    };
    match op {
        BinOp::Eq => ordering == Ordering::Equal,
        BinOp::Ne => ordering != Ordering::Equal,
        BinOp::Lt => ordering == Ordering::Less,
        BinOp::Le => ordering != Ordering::Greater,
        BinOp::Gt => ordering == Ordering::Greater,
        BinOp::Ge => ordering != Ordering::Less,
        _ => false,
    }
}

fn bool_num(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

// ============================================================================
// BUILT-IN FUNCTIONS
// ============================================================================

/// Dispatch a built-in function call. Names are case-insensitive;
/// unknown names are an error that aborts the step.
pub fn call_function(
    name: &str,
    args: &[Cell],
    handler: &Handler,
) -> Result<Cell, EngineError> {
    let lower = name.to_ascii_lowercase();
    match lower.as_str() {
        // ---- string functions ----
        "substr" => substr(name, args),
        "trim" => Ok(Cell::Str(str1(name, args)?.trim_end().to_string())),
        "left" => Ok(Cell::Str(str1(name, args)?.trim_start().to_string())),
        "right" => Ok(Cell::Str(right_justify(&str1(name, args)?))),
        "upcase" => Ok(Cell::Str(str1(name, args)?.to_uppercase())),
        "lowcase" => Ok(Cell::Str(str1(name, args)?.to_lowercase())),
        "length" => Ok(Cell::Num(
            str1(name, args)?.trim_end().chars().count() as f64,
        )),
        "index" => {
            let (haystack, needle) = str2(name, args)?;
            let position = haystack
                .find(&needle)
                .map(|byte| haystack[..byte].chars().count() + 1)
                .unwrap_or(0);
            Ok(Cell::Num(position as f64))
        }

        // ---- numeric functions ----
        "sqrt" => math1(name, args, handler, |x, h| {
            if x < 0.0 {
                h.warning(
                    format!("sqrt of negative argument {x}"),
                    Span::DUMMY,
                );
                f64::NAN
            } else {
                x.sqrt()
            }
        }),
        "log" => math1(name, args, handler, |x, h| {
            if x <= 0.0 {
                h.warning(format!("log of non-positive argument {x}"), Span::DUMMY);
                f64::NAN
            } else {
                x.ln()
            }
        }),
        "log10" => math1(name, args, handler, |x, h| {
            if x <= 0.0 {
                h.warning(
                    format!("log10 of non-positive argument {x}"),
                    Span::DUMMY,
                );
                f64::NAN
            } else {
                x.log10()
            }
        }),
        "abs" => math1(name, args, handler, |x, _| x.abs()),
        "exp" => math1(name, args, handler, |x, _| x.exp()),
        "ceil" => math1(name, args, handler, |x, _| x.ceil()),
        "floor" => math1(name, args, handler, |x, _| x.floor()),
        "round" => {
            check_arity(name, args, 1, 2, "1 or 2")?;
            let x = args[0].to_number();
            if x == MISSING {
                return Ok(Cell::missing_num());
            }
            let decimals = args.get(1).map(Cell::to_number).unwrap_or(0.0);
            let factor = 10f64.powi(decimals as i32);
            Ok(Cell::Num((x * factor).round() / factor))
        }

        // ---- missing-aware helpers ----
        "missing" => {
            check_arity(name, args, 1, 1, "1")?;
            Ok(Cell::Num(bool_num(args[0].is_missing())))
        }
        "n" => Ok(Cell::Num(present_numbers(args).count() as f64)),
        "sum" => Ok(reduce_present(args, |acc, x| acc + x)),
        "min" => Ok(reduce_present(args, f64::min)),
        "max" => Ok(reduce_present(args, f64::max)),
        "mean" => {
            let values: Vec<f64> = present_numbers(args).collect();
            if values.is_empty() {
                Ok(Cell::missing_num())
            } else {
                Ok(Cell::Num(values.iter().sum::<f64>() / values.len() as f64))
            }
        }

        // ---- dates ----
        "today" => {
            check_arity(name, args, 0, 0, "0")?;
            let stamp = chrono::Local::now().format("%Y%m%d").to_string();
            Ok(Cell::Num(stamp.parse::<f64>().unwrap_or(MISSING)))
        }
        "intck" => {
            check_arity(name, args, 3, 3, "3")?;
            require_day_interval(&args[0])?;
            let start = args[1].to_number();
            let end = args[2].to_number();
            Ok(Cell::Num((end - start).round()))
        }
        "intnx" => {
            check_arity(name, args, 3, 4, "3 or 4")?;
            require_day_interval(&args[0])?;
            let start = args[1].to_number();
            let offset = args[2].to_number();
            Ok(Cell::Num(start + offset))
        }

        _ => Err(EngineError::UnknownFunction(name.to_string())),
    }
}

fn check_arity(
    name: &str,
    args: &[Cell],
    min: usize,
    max: usize,
    expected: &'static str,
) -> Result<(), EngineError> {
    if args.len() < min || args.len() > max {
        return Err(EngineError::FunctionArity {
            name: name.to_string(),
            expected,
            given: args.len(),
        });
    }
    Ok(())
}

/// 1-based substring; out-of-range start yields "", the length truncates
/// at the end of the string.
fn substr(name: &str, args: &[Cell]) -> Result<Cell, EngineError> {
    check_arity(name, args, 2, 3, "2 or 3")?;
    let text = args[0].to_text();
    let chars: Vec<char> = text.chars().collect();
    let start = args[1].to_number();

    if start.fract() != 0.0 || start < 1.0 || start > chars.len() as f64 {
        return Ok(Cell::Str(String::new()));
    }
    let from = start as usize - 1;
    let take = match args.get(2) {
        Some(len) => {
            let len = len.to_number();
            if len <= 0.0 {
                return Ok(Cell::Str(String::new()));
            }
            (len as usize).min(chars.len() - from)
        }
        None => chars.len() - from,
    };
    Ok(Cell::Str(chars[from..from + take].iter().collect()))
}

/// Right-justify within the value's own length: trailing blanks move to
/// the front, so `right("ab  ")` is `"  ab"`.
fn right_justify(text: &str) -> String {
    let trimmed = text.trim_end();
    let pad = text.chars().count() - trimmed.chars().count();
    let mut out = " ".repeat(pad);
    out.push_str(trimmed);
    out
}

fn str1(name: &str, args: &[Cell]) -> Result<String, EngineError> {
    check_arity(name, args, 1, 1, "1")?;
    Ok(args[0].to_text())
}

fn str2(name: &str, args: &[Cell]) -> Result<(String, String), EngineError> {
    check_arity(name, args, 2, 2, "2")?;
    Ok((args[0].to_text(), args[1].to_text()))
}

/// Unary numeric function; missing propagates without touching `f`.
fn math1(
    name: &str,
    args: &[Cell],
    handler: &Handler,
    f: impl Fn(f64, &Handler) -> f64,
) -> Result<Cell, EngineError> {
    check_arity(name, args, 1, 1, "1")?;
    let x = args[0].to_number();
    if x == MISSING {
        return Ok(Cell::missing_num());
    }
    Ok(Cell::Num(f(x, handler)))
}

fn require_day_interval(arg: &Cell) -> Result<(), EngineError> {
    let interval = arg.to_text();
    if interval.eq_ignore_ascii_case("day") {
        Ok(())
    } else {
        Err(EngineError::BadInterval(interval))
    }
}

/// Numeric views of the arguments with missing values removed.
fn present_numbers<'a>(args: &'a [Cell]) -> impl Iterator<Item = f64> + 'a {
    args.iter().map(Cell::to_number).filter(|n| *n != MISSING)
}

fn reduce_present(args: &[Cell], f: impl Fn(f64, f64) -> f64) -> Cell {
    let mut values = present_numbers(args);
    match values.next() {
        None => Cell::missing_num(),
        Some(first) => Cell::Num(values.fold(first, f)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_par::Parser;

    fn eval_str(source: &str, pdv: &Pdv) -> Cell {
        let handler = Handler::new();
        let tokens = sable_lex::tokenize(source, &handler);
        let expr = Parser::new(source, tokens, &handler)
            .parse_expr()
            .expect("expression parses");
        eval(&expr, pdv, &ArrayTable::new(), &handler).expect("expression evaluates")
    }

    fn pdv_with(vars: &[(&str, Cell)]) -> Pdv {
        let mut pdv = Pdv::new();
        for (name, cell) in vars {
            let index = pdv.add_variable(name, cell.is_numeric());
            pdv.set(index, cell.clone());
        }
        pdv
    }

    // ========================================================================
    // OPERATORS
    // ========================================================================

    #[test]
    fn test_arithmetic() {
        let pdv = pdv_with(&[("x", Cell::Num(10.0))]);
        assert_eq!(eval_str("x + 2 * 3", &pdv), Cell::Num(16.0));
        assert_eq!(eval_str("2 ** 3 ** 2", &pdv), Cell::Num(512.0));
        assert_eq!(eval_str("-x + 1", &pdv), Cell::Num(-9.0));
    }

    #[test]
    fn test_division_by_zero_is_nan() {
        let pdv = Pdv::new();
        let Cell::Num(n) = eval_str("1 / 0", &pdv) else {
            panic!("expected number");
        };
        assert!(n.is_nan());
    }

    #[test]
    fn test_nan_compares_false_with_everything() {
        let pdv = Pdv::new();
        assert_eq!(eval_str("1/0 = 1/0", &pdv), Cell::Num(0.0));
        assert_eq!(eval_str("1/0 < 5", &pdv), Cell::Num(0.0));
        assert_eq!(eval_str("1/0 > 5", &pdv), Cell::Num(0.0));
    }

    #[test]
    fn test_missing_in_arithmetic() {
        let pdv = pdv_with(&[("x", Cell::missing_num())]);
        assert_eq!(eval_str("x + 1", &pdv), Cell::Num(MISSING));
        assert_eq!(eval_str("x = .", &pdv), Cell::Num(1.0));
        assert_eq!(eval_str("x < 5", &pdv), Cell::Num(1.0));
    }

    #[test]
    fn test_string_comparison() {
        let pdv = pdv_with(&[("name", Cell::Str("ALICE".into()))]);
        assert_eq!(eval_str("name = 'ALICE'", &pdv), Cell::Num(1.0));
        assert_eq!(eval_str("name < 'BOB'", &pdv), Cell::Num(1.0));
    }

    #[test]
    fn test_mixed_kind_orders_numeric_first() {
        let pdv = Pdv::new();
        assert_eq!(eval_str("99 < 'a'", &pdv), Cell::Num(1.0));
        assert_eq!(eval_str("99 = '99'", &pdv), Cell::Num(0.0));
    }

    #[test]
    fn test_and_or_truthiness() {
        let pdv = pdv_with(&[("x", Cell::Num(3.0))]);
        assert_eq!(eval_str("x > 1 and x < 5", &pdv), Cell::Num(1.0));
        assert_eq!(eval_str("x > 5 or x = 3", &pdv), Cell::Num(1.0));
        assert_eq!(eval_str("x > 5 and x = 3", &pdv), Cell::Num(0.0));
    }

    #[test]
    fn test_unknown_variable_warns_and_is_missing() {
        let handler = Handler::new();
        let source = "ghost + 1";
        let tokens = sable_lex::tokenize(source, &handler);
        let expr = Parser::new(source, tokens, &handler).parse_expr().unwrap();
        let pdv = Pdv::new();
        let value = eval(&expr, &pdv, &ArrayTable::new(), &handler).unwrap();
        assert_eq!(value, Cell::Num(MISSING));
        assert_eq!(handler.warning_count(), 1);
    }

    // ========================================================================
    // FUNCTIONS
    // ========================================================================

    #[test]
    fn test_substr() {
        let pdv = pdv_with(&[("s", Cell::Str("DATASET".into()))]);
        assert_eq!(eval_str("substr(s, 1, 4)", &pdv), Cell::Str("DATA".into()));
        assert_eq!(eval_str("substr(s, 5)", &pdv), Cell::Str("SET".into()));
        // Length truncates at the end of the string.
        assert_eq!(eval_str("substr(s, 5, 99)", &pdv), Cell::Str("SET".into()));
        // Out-of-range start yields the empty string.
        assert_eq!(eval_str("substr(s, 0)", &pdv), Cell::Str("".into()));
        assert_eq!(eval_str("substr(s, 8)", &pdv), Cell::Str("".into()));
    }

    #[test]
    fn test_case_and_trim() {
        let pdv = pdv_with(&[("s", Cell::Str("  Bob  ".into()))]);
        assert_eq!(eval_str("trim(s)", &pdv), Cell::Str("  Bob".into()));
        assert_eq!(eval_str("left(s)", &pdv), Cell::Str("Bob  ".into()));
        assert_eq!(eval_str("upcase('bo')", &pdv), Cell::Str("BO".into()));
        assert_eq!(eval_str("lowcase('BO')", &pdv), Cell::Str("bo".into()));
    }

    #[test]
    fn test_right_justifies_within_length() {
        let pdv = pdv_with(&[("s", Cell::Str("ab  ".into()))]);
        // Trailing blanks move to the front; the length is preserved.
        assert_eq!(eval_str("right(s)", &pdv), Cell::Str("  ab".into()));
        assert_eq!(eval_str("right('cd')", &pdv), Cell::Str("cd".into()));
        // Not a synonym for trim.
        assert_eq!(eval_str("trim(s)", &pdv), Cell::Str("ab".into()));
    }

    #[test]
    fn test_length_counts_chars_without_trailing_blanks() {
        let pdv = pdv_with(&[("s", Cell::Str("café  ".into()))]);
        // Characters, not bytes, and trailing blanks do not count -
        // consistent with substr/index positions.
        assert_eq!(eval_str("length(s)", &pdv), Cell::Num(4.0));
        assert_eq!(eval_str("index(s, 'é')", &pdv), Cell::Num(4.0));
        assert_eq!(eval_str("substr(s, length(s), 1)", &pdv), Cell::Str("é".into()));
        assert_eq!(eval_str("length('')", &pdv), Cell::Num(0.0));
    }

    #[test]
    fn test_math_functions() {
        let pdv = Pdv::new();
        assert_eq!(eval_str("sqrt(9)", &pdv), Cell::Num(3.0));
        assert_eq!(eval_str("abs(-4)", &pdv), Cell::Num(4.0));
        assert_eq!(eval_str("ceil(1.2)", &pdv), Cell::Num(2.0));
        assert_eq!(eval_str("floor(1.8)", &pdv), Cell::Num(1.0));
        assert_eq!(eval_str("round(2.345, 2)", &pdv), Cell::Num(2.35));
        assert_eq!(eval_str("round(2.5)", &pdv), Cell::Num(3.0));
    }

    #[test]
    fn test_log_of_non_positive_warns_nan() {
        let handler = Handler::new();
        let result = call_function("log", &[Cell::Num(0.0)], &handler).unwrap();
        let Cell::Num(n) = result else {
            panic!("expected number");
        };
        assert!(n.is_nan());
        assert_eq!(handler.warning_count(), 1);
    }

    #[test]
    fn test_row_statistics_skip_missing() {
        let pdv = pdv_with(&[("a", Cell::Num(2.0)), ("b", Cell::missing_num())]);
        assert_eq!(eval_str("sum(a, b, 3)", &pdv), Cell::Num(5.0));
        assert_eq!(eval_str("n(a, b)", &pdv), Cell::Num(1.0));
        assert_eq!(eval_str("mean(a, b, 4)", &pdv), Cell::Num(3.0));
        assert_eq!(eval_str("min(a, b)", &pdv), Cell::Num(2.0));
        assert_eq!(eval_str("max(b, b)", &pdv), Cell::missing_num());
        assert_eq!(eval_str("missing(b)", &pdv), Cell::Num(1.0));
    }

    #[test]
    fn test_intck_intnx_day_only() {
        let pdv = Pdv::new();
        assert_eq!(
            eval_str("intck('day', 10, 14)", &pdv),
            Cell::Num(4.0)
        );
        assert_eq!(eval_str("intnx('day', 10, 3)", &pdv), Cell::Num(13.0));

        let handler = Handler::new();
        let err = call_function(
            "intck",
            &[Cell::Str("month".into()), Cell::Num(0.0), Cell::Num(1.0)],
            &handler,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::BadInterval(_)));
    }

    #[test]
    fn test_unknown_function_errors() {
        let handler = Handler::new();
        let err = call_function("frobnicate", &[], &handler).unwrap_err();
        assert!(matches!(err, EngineError::UnknownFunction(_)));
    }

    #[test]
    fn test_function_arity_errors() {
        let handler = Handler::new();
        let err = call_function("substr", &[Cell::Str("x".into())], &handler).unwrap_err();
        assert!(matches!(err, EngineError::FunctionArity { .. }));
    }

    // ========================================================================
    // ARRAYS
    // ========================================================================

    fn sample_array() -> ArrayTable {
        let mut arrays = ArrayTable::new();
        arrays
            .register(&ArrayDecl {
                name: "a".into(),
                size: 3,
                vars: vec!["a1".into(), "a2".into(), "a3".into()],
            })
            .unwrap();
        arrays
    }

    #[test]
    fn test_array_resolution() {
        let arrays = sample_array();
        assert_eq!(arrays.resolve("a", 1.0).unwrap(), "a1");
        assert_eq!(arrays.resolve("A", 3.0).unwrap(), "a3");
    }

    #[test]
    fn test_array_bounds() {
        let arrays = sample_array();
        assert!(matches!(
            arrays.resolve("a", 0.0),
            Err(EngineError::ArrayBounds { index: 0, .. })
        ));
        assert!(matches!(
            arrays.resolve("a", 4.0),
            Err(EngineError::ArrayBounds { index: 4, .. })
        ));
        assert!(matches!(
            arrays.resolve("a", 1.5),
            Err(EngineError::ArrayBounds { .. })
        ));
    }

    #[test]
    fn test_array_shape_mismatch() {
        let mut arrays = ArrayTable::new();
        let err = arrays
            .register(&ArrayDecl {
                name: "a".into(),
                size: 2,
                vars: vec!["a1".into()],
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::ArrayShape { .. }));
    }

    #[test]
    fn test_undeclared_array() {
        let arrays = ArrayTable::new();
        assert!(matches!(
            arrays.resolve("ghost", 1.0),
            Err(EngineError::UndeclaredArray(_))
        ));
    }
}
