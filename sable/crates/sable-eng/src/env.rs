//! The session environment: libraries, options, title and macro state.
//!
//! One owned struct passed explicitly through the executors - there are
//! no hidden globals. The environment lives as long as the interpreter;
//! dropping it tears the WORK library down.

use indexmap::IndexMap;

use sable_data::{DataError, LibraryStore};
use sable_mac::MacroProcessor;

/// Everything a statement can read or mutate besides its own PDV.
pub struct DataEnvironment {
    /// Libraries and their dataset caches.
    pub store: LibraryStore,

    /// `options` values, keyed by uppercased name. Flags store an empty
    /// string.
    pub options: IndexMap<String, String>,

    /// Current `title`, if any.
    pub title: Option<String>,

    /// Macro variables and definitions.
    pub macros: MacroProcessor,
}

impl DataEnvironment {
    /// Build the environment, creating the implicit WORK library.
    pub fn new() -> Result<Self, DataError> {
        Ok(Self {
            store: LibraryStore::new()?,
            options: IndexMap::new(),
            title: None,
            macros: MacroProcessor::new(),
        })
    }

    /// Store one `options` item.
    pub fn set_option(&mut self, name: &str, value: Option<&str>) {
        self.options
            .insert(name.to_ascii_uppercase(), value.unwrap_or("").to_string());
    }

    /// Look up an option, case-insensitively.
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options
            .get(&name.to_ascii_uppercase())
            .map(String::as_str)
    }

    /// An option parsed as a row count, when present and numeric.
    pub fn option_row_count(&self, name: &str) -> Option<usize> {
        self.option(name).and_then(|v| v.parse::<usize>().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_case_insensitive() {
        let mut env = DataEnvironment::new().unwrap();
        env.set_option("Obs", Some("50"));
        env.set_option("nodate", None);

        assert_eq!(env.option("OBS"), Some("50"));
        assert_eq!(env.option("obs"), Some("50"));
        assert_eq!(env.option("NODATE"), Some(""));
        assert_eq!(env.option_row_count("obs"), Some(50));
        assert_eq!(env.option_row_count("nodate"), None);
    }
}
