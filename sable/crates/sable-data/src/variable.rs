//! Variable definitions - the entries of a dataset's column catalog.

use serde::{Deserialize, Serialize};

/// Variable kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarKind {
    Numeric,
    Character,
}

/// One column of a dataset.
///
/// Names are case-insensitive and canonicalised to the first-seen casing;
/// all lookups go through uppercased comparisons. The declared byte length
/// of a character variable only ever grows (widening is monotonic within
/// a step).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VarDef {
    /// First-seen casing of the name.
    pub name: String,
    pub kind: VarKind,
    /// Declared byte length: 8 for numerics, longest assigned for strings.
    pub length: usize,
    pub label: Option<String>,
    pub format: Option<String>,
    pub decimals: Option<u8>,
    pub retained: bool,
}

impl VarDef {
    /// A numeric variable (8-byte default length).
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: VarKind::Numeric,
            length: 8,
            label: None,
            format: None,
            decimals: None,
            retained: false,
        }
    }

    /// A character variable with an initial declared length.
    pub fn character(name: impl Into<String>, length: usize) -> Self {
        Self {
            name: name.into(),
            kind: VarKind::Character,
            length,
            label: None,
            format: None,
            decimals: None,
            retained: false,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.kind == VarKind::Numeric
    }

    /// Case-insensitive name match.
    pub fn named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Grow the declared length; never shrinks.
    pub fn widen(&mut self, length: usize) {
        if length > self.length {
            self.length = length;
        }
    }
}
