//! The Program Data Vector: the per-step row under construction.
//!
//! A PDV is an ordered variable list with a parallel cell vector and a
//! case-insensitive name index. It is created at DATA-step start and
//! discarded at step end. Between statements the cell vector is always
//! exactly as long as the variable list.

use rustc_hash::FxHashMap;

use crate::dataset::Dataset;
use crate::value::Cell;
use crate::variable::{VarDef, VarKind};

/// Metadata for one PDV slot.
#[derive(Clone, Debug, PartialEq)]
pub struct PdvVar {
    /// First-seen casing of the name.
    pub name: String,
    pub is_numeric: bool,
    /// Declared byte length (numerics 8; strings widen on assignment).
    pub length: usize,
    pub label: Option<String>,
    pub format: Option<String>,
    pub decimals: Option<u8>,
    /// Retained cells survive `reset_non_retained`.
    pub retained: bool,
}

impl PdvVar {
    fn from_def(def: &VarDef) -> Self {
        Self {
            name: def.name.clone(),
            is_numeric: def.is_numeric(),
            length: def.length,
            label: def.label.clone(),
            format: def.format.clone(),
            decimals: def.decimals,
            retained: def.retained,
        }
    }

    /// Catalog entry equivalent to this slot.
    pub fn to_def(&self) -> VarDef {
        VarDef {
            name: self.name.clone(),
            kind: if self.is_numeric {
                VarKind::Numeric
            } else {
                VarKind::Character
            },
            length: self.length,
            label: self.label.clone(),
            format: self.format.clone(),
            decimals: self.decimals,
            retained: self.retained,
        }
    }
}

/// The per-step workspace.
#[derive(Default)]
pub struct Pdv {
    vars: Vec<PdvVar>,
    cells: Vec<Cell>,
    /// Uppercased name -> slot index.
    index: FxHashMap<String, usize>,
}

impl Pdv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable if absent; an existing variable wins and its index
    /// is returned unchanged. The new cell starts missing.
    pub fn add_variable(&mut self, name: &str, is_numeric: bool) -> usize {
        if let Some(&index) = self.index.get(&name.to_ascii_uppercase()) {
            return index;
        }
        let var = if is_numeric {
            PdvVar::from_def(&VarDef::numeric(name))
        } else {
            PdvVar::from_def(&VarDef::character(name, 0))
        };
        self.push_var(var)
    }

    /// Add a variable from a catalog definition (SET/MERGE initialisation
    /// path). Idempotent by name; existing metadata wins, but character
    /// lengths may widen.
    pub fn add_from_def(&mut self, def: &VarDef) -> usize {
        if let Some(&index) = self.index.get(&def.name.to_ascii_uppercase()) {
            if !def.is_numeric() && def.length > self.vars[index].length {
                self.vars[index].length = def.length;
            }
            return index;
        }
        self.push_var(PdvVar::from_def(def))
    }

    fn push_var(&mut self, var: PdvVar) -> usize {
        let index = self.vars.len();
        self.index.insert(var.name.to_ascii_uppercase(), index);
        self.cells.push(Cell::missing(var.is_numeric));
        self.vars.push(var);
        index
    }

    /// Slot index by case-insensitive name.
    pub fn find_index(&self, name: &str) -> Option<usize> {
        self.index.get(&name.to_ascii_uppercase()).copied()
    }

    pub fn get(&self, index: usize) -> &Cell {
        &self.cells[index]
    }

    /// Write a cell, coercing it to the slot's kind: numeric slots take
    /// the numeric view of strings, character slots take the text view of
    /// numbers and widen the declared length as needed.
    pub fn set(&mut self, index: usize, value: Cell) {
        let var = &mut self.vars[index];
        let coerced = match (&value, var.is_numeric) {
            (Cell::Num(_), true) | (Cell::Str(_), false) => value,
            (Cell::Str(_), true) => Cell::Num(value.to_number()),
            (Cell::Num(_), false) => Cell::Str(value.to_text()),
        };
        if let Cell::Str(s) = &coerced {
            if s.len() > var.length {
                var.length = s.len();
            }
        }
        self.cells[index] = coerced;
    }

    /// Reset every non-retained cell to missing.
    pub fn reset_non_retained(&mut self) {
        for (var, cell) in self.vars.iter().zip(self.cells.iter_mut()) {
            if !var.retained {
                *cell = Cell::missing(var.is_numeric);
            }
        }
    }

    /// Mark a variable retained (or not). Returns false if unknown.
    pub fn set_retain_flag(&mut self, name: &str, retained: bool) -> bool {
        match self.find_index(name) {
            Some(index) => {
                self.vars[index].retained = retained;
                true
            }
            None => false,
        }
    }

    /// Pre-populate the PDV from a dataset's catalog so SET-reads find
    /// every column.
    pub fn init_from_dataset(&mut self, dataset: &Dataset) {
        for def in &dataset.catalog {
            self.add_from_def(def);
        }
    }

    /// Load one dataset row into matching slots, by name, missing-safe.
    pub fn load_row(&mut self, dataset: &Dataset, row: usize) {
        for (col, def) in dataset.catalog.iter().enumerate() {
            if let Some(index) = self.find_index(&def.name) {
                let cell = dataset.rows[row]
                    .get(col)
                    .cloned()
                    .unwrap_or_else(|| Cell::missing(def.is_numeric()));
                self.set(index, cell);
            }
        }
    }

    /// Current row as an aligned cell vector (a copy).
    pub fn snapshot(&self) -> Vec<Cell> {
        self.cells.clone()
    }

    pub fn vars(&self) -> &[PdvVar] {
        &self.vars
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
