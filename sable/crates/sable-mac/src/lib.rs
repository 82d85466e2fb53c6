//! sable-mac - The macro preprocessor.
//!
//! Two interpreter-global tables live here: macro variables (`%let`) and
//! macro definitions (`%macro ... %mend`). Substitution is textual: the
//! driver hands any statement whose tokens contain `&name` references back
//! through [`MacroProcessor::expand`] before re-lexing and executing it.
//!
//! `&name` resolution is greedy - the reference extends over the longest
//! identifier run after the sigil - and one trailing `.` is consumed as
//! the optional terminator, so `&lib.tab` resolves `lib` and leaves `tab`
//! glued to the value. An `&` not followed by an identifier start is
//! ordinary text (string literals may legitimately contain one).

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use thiserror::Error;

use sable_par::MacroDef;

/// Errors raised by the macro subsystem.
#[derive(Debug, Error)]
pub enum MacroError {
    /// A `&name` reference with no definition.
    #[error("macro variable '&{0}' is not defined")]
    Unresolved(String),

    /// A `%name(...)` call with no definition.
    #[error("macro '%{0}' is not defined")]
    UndefinedMacro(String),

    /// `%macro` for a name that already exists.
    #[error("macro '%{0}' is already defined")]
    Redefinition(String),

    /// Call arity does not match the definition.
    #[error("macro '%{name}' expects {expected} argument(s), got {given}")]
    ArityMismatch {
        name: String,
        expected: usize,
        given: usize,
    },
}

/// Saved macro-variable state, restored when a macro call finishes.
///
/// The snapshot is taken before parameter bindings are overlaid and must
/// be restored on every exit path, success or error.
#[derive(Debug)]
pub struct MacroScope {
    saved: IndexMap<String, String>,
}

/// Interpreter-global macro state.
#[derive(Default)]
pub struct MacroProcessor {
    /// `%let` variables. Keys are uppercased; insertion order is kept so
    /// diagnostics can list variables the way they were defined.
    vars: IndexMap<String, String>,

    /// `%macro` definitions, keyed by uppercased name.
    macros: FxHashMap<String, MacroDef>,
}

impl MacroProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // MACRO VARIABLES
    // ========================================================================

    /// `%let name = raw_value;` - the value is macro-expanded, then stored.
    pub fn define_var(&mut self, name: &str, raw_value: &str) -> Result<(), MacroError> {
        let value = self.expand(raw_value)?;
        log::debug!("%let {} = {}", name, value.trim());
        self.vars
            .insert(name.to_ascii_uppercase(), value.trim().to_string());
        Ok(())
    }

    /// Look up a macro variable, case-insensitively.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars
            .get(&name.to_ascii_uppercase())
            .map(String::as_str)
    }

    // ========================================================================
    // MACRO DEFINITIONS AND CALLS
    // ========================================================================

    /// Register a `%macro` definition. Redefinition is an error.
    pub fn define_macro(&mut self, def: MacroDef) -> Result<(), MacroError> {
        let key = def.name.to_ascii_uppercase();
        if self.macros.contains_key(&key) {
            return Err(MacroError::Redefinition(def.name));
        }
        log::debug!("%macro {} ({} params)", def.name, def.params.len());
        self.macros.insert(key, def);
        Ok(())
    }

    /// True if a macro of this name exists.
    pub fn has_macro(&self, name: &str) -> bool {
        self.macros.contains_key(&name.to_ascii_uppercase())
    }

    /// Begin a `%name(args)` call: check arity, expand each argument,
    /// snapshot the variable table and overlay the parameter bindings.
    ///
    /// Returns the macro's raw body text (the driver lexes, parses and
    /// executes it statement by statement) and the scope to hand back to
    /// [`MacroProcessor::end_call`] afterwards - on error paths too.
    pub fn begin_call(
        &mut self,
        name: &str,
        raw_args: &[String],
    ) -> Result<(String, MacroScope), MacroError> {
        let def = self
            .macros
            .get(&name.to_ascii_uppercase())
            .ok_or_else(|| MacroError::UndefinedMacro(name.to_string()))?
            .clone();

        if def.params.len() != raw_args.len() {
            return Err(MacroError::ArityMismatch {
                name: def.name,
                expected: def.params.len(),
                given: raw_args.len(),
            });
        }

        let mut bindings = Vec::with_capacity(raw_args.len());
        for (param, raw) in def.params.iter().zip(raw_args) {
            bindings.push((param.clone(), self.expand(raw)?));
        }

        let scope = MacroScope {
            saved: self.vars.clone(),
        };
        for (param, value) in bindings {
            self.vars.insert(param.to_ascii_uppercase(), value);
        }

        Ok((def.body, scope))
    }

    /// Restore the variable table saved at [`MacroProcessor::begin_call`].
    pub fn end_call(&mut self, scope: MacroScope) {
        self.vars = scope.saved;
    }

    // ========================================================================
    // TEXTUAL SUBSTITUTION
    // ========================================================================

    /// Replace every `&name` / `&name.` in `text` with the variable's
    /// value. Greedy: the name is the longest identifier run after `&`.
    pub fn expand(&self, text: &str) -> Result<String, MacroError> {
        let bytes = text.as_bytes();
        let mut out = String::with_capacity(text.len());
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] != b'&' {
                // Copy straight through to the next sigil. '&' is ASCII,
                // so this never splits a UTF-8 sequence.
                let run = bytes[i..]
                    .iter()
                    .position(|b| *b == b'&')
                    .map_or(bytes.len(), |p| i + p);
                out.push_str(&text[i..run]);
                i = run;
                continue;
            }

            let name_start = i + 1;
            let starts_name = bytes
                .get(name_start)
                .map(|b| b.is_ascii_alphabetic() || *b == b'_')
                .unwrap_or(false);
            if !starts_name {
                // A lone '&' (e.g. inside a string literal) is plain text.
                out.push('&');
                i = name_start;
                continue;
            }

            let mut name_end = name_start;
            while name_end < bytes.len()
                && (bytes[name_end].is_ascii_alphanumeric() || bytes[name_end] == b'_')
            {
                name_end += 1;
            }
            let name = &text[name_start..name_end];
            let value = self
                .var(name)
                .ok_or_else(|| MacroError::Unresolved(name.to_string()))?;
            out.push_str(value);

            i = name_end;
            // One trailing '.' terminates the reference and is consumed.
            if bytes.get(i) == Some(&b'.') {
                i += 1;
            }
        }

        Ok(out)
    }

    /// Drop every macro variable and definition.
    pub fn reset(&mut self) {
        self.vars.clear();
        self.macros.clear();
    }
}
