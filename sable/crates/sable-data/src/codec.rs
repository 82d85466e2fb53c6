//! Persisted dataset codecs.
//!
//! The core treats the on-disk layout as opaque: a codec loads a catalog
//! plus rows and saves them back. The default backend is a small binary
//! table format (a magic/version header over a postcard-encoded body);
//! CSV is the alternative backend. Codec selection is per-library.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::value::{Cell, MISSING};
use crate::variable::{VarDef, VarKind};

/// Reader/writer interface for persisted tables.
pub trait DatasetCodec {
    /// File extension this codec owns (without the dot).
    fn extension(&self) -> &'static str;

    /// Load a table from `path`.
    fn load(&self, path: &Path) -> Result<(Vec<VarDef>, Vec<Vec<Cell>>), CodecError>;

    /// Persist a table to `path`.
    fn save(
        &self,
        path: &Path,
        catalog: &[VarDef],
        rows: &[Vec<Cell>],
    ) -> Result<(), CodecError>;
}

// ============================================================================
// BINARY BACKEND
// ============================================================================

const MAGIC: &[u8; 4] = b"SBTB";
const VERSION: u8 = 1;

/// Serialized shape of a table file body.
#[derive(Serialize, Deserialize)]
struct TableFile {
    catalog: Vec<VarDef>,
    rows: Vec<Vec<Cell>>,
}

/// The default binary table format: typed columns with lengths, labels,
/// formats and decimals.
#[derive(Default)]
pub struct BinaryTableCodec;

impl DatasetCodec for BinaryTableCodec {
    fn extension(&self) -> &'static str {
        "sbt"
    }

    fn load(&self, path: &Path) -> Result<(Vec<VarDef>, Vec<Vec<Cell>>), CodecError> {
        let bytes = fs::read(path)?;
        if bytes.len() < MAGIC.len() + 1 || &bytes[..MAGIC.len()] != MAGIC {
            return Err(CodecError::BadMagic(path.to_path_buf()));
        }
        let version = bytes[MAGIC.len()];
        if version != VERSION {
            return Err(CodecError::BadVersion(version));
        }
        let table: TableFile =
            postcard::from_bytes(&bytes[MAGIC.len() + 1..]).map_err(CodecError::Decode)?;
        Ok((table.catalog, table.rows))
    }

    fn save(
        &self,
        path: &Path,
        catalog: &[VarDef],
        rows: &[Vec<Cell>],
    ) -> Result<(), CodecError> {
        let table = TableFile {
            catalog: catalog.to_vec(),
            rows: rows.to_vec(),
        };
        let body = postcard::to_allocvec(&table).map_err(CodecError::Encode)?;
        let mut bytes = Vec::with_capacity(MAGIC.len() + 1 + body.len());
        bytes.extend_from_slice(MAGIC);
        bytes.push(VERSION);
        bytes.extend_from_slice(&body);
        fs::write(path, bytes)?;
        Ok(())
    }
}

// ============================================================================
// CSV BACKEND
// ============================================================================

/// CSV backend. The header marks character columns with a trailing `$`;
/// missing numerics round-trip as empty fields.
#[derive(Default)]
pub struct CsvCodec;

impl DatasetCodec for CsvCodec {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn load(&self, path: &Path) -> Result<(Vec<VarDef>, Vec<Vec<Cell>>), CodecError> {
        let text = fs::read_to_string(path)?;
        let mut lines = text.lines();
        let header = lines
            .next()
            .ok_or_else(|| CodecError::Malformed("empty csv file".into()))?;

        let mut catalog = Vec::new();
        for field in split_csv_line(header) {
            if let Some(name) = field.strip_suffix('$') {
                catalog.push(VarDef::character(name, 0));
            } else {
                catalog.push(VarDef::numeric(field));
            }
        }

        let mut rows = Vec::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            let fields = split_csv_line(line);
            if fields.len() != catalog.len() {
                return Err(CodecError::Malformed(format!(
                    "row has {} fields, expected {}",
                    fields.len(),
                    catalog.len()
                )));
            }
            let mut row = Vec::with_capacity(catalog.len());
            for (field, def) in fields.into_iter().zip(catalog.iter_mut()) {
                match def.kind {
                    VarKind::Numeric => {
                        let value = if field.is_empty() {
                            MISSING
                        } else {
                            field.parse::<f64>().map_err(|e| {
                                CodecError::Malformed(format!("bad number '{field}': {e}"))
                            })?
                        };
                        row.push(Cell::Num(value));
                    }
                    VarKind::Character => {
                        def.widen(field.len());
                        row.push(Cell::Str(field));
                    }
                }
            }
            rows.push(row);
        }

        Ok((catalog, rows))
    }

    fn save(
        &self,
        path: &Path,
        catalog: &[VarDef],
        rows: &[Vec<Cell>],
    ) -> Result<(), CodecError> {
        let mut out = String::new();
        let header: Vec<String> = catalog
            .iter()
            .map(|v| match v.kind {
                VarKind::Numeric => escape_csv_field(&v.name),
                VarKind::Character => format!("{}$", escape_csv_field(&v.name)),
            })
            .collect();
        out.push_str(&header.join(","));
        out.push('\n');

        for row in rows {
            let fields: Vec<String> = row
                .iter()
                .map(|cell| match cell {
                    Cell::Num(n) if *n == MISSING => String::new(),
                    Cell::Num(n) => format!("{n}"),
                    Cell::Str(s) => escape_csv_field(s),
                })
                .collect();
            out.push_str(&fields.join(","));
            out.push('\n');
        }

        fs::write(path, out)?;
        Ok(())
    }
}

/// Split one CSV line, honouring double-quoted fields.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut field));
            }
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

/// Quote a field only when it needs it.
fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_table() -> (Vec<VarDef>, Vec<Vec<Cell>>) {
        let catalog = vec![VarDef::numeric("x"), VarDef::character("name", 5)];
        let rows = vec![
            vec![Cell::Num(1.5), Cell::Str("ALICE".into())],
            vec![Cell::missing_num(), Cell::Str("BO,B".into())],
        ];
        (catalog, rows)
    }

    #[test]
    fn test_binary_save_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.sbt");
        let (catalog, rows) = sample_table();

        let codec = BinaryTableCodec;
        codec.save(&path, &catalog, &rows).unwrap();
        let (loaded_catalog, loaded_rows) = codec.load(&path).unwrap();

        assert_eq!(loaded_catalog, catalog);
        assert_eq!(loaded_rows, rows);
    }

    #[test]
    fn test_binary_rejects_foreign_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("junk.sbt");
        fs::write(&path, b"not a table").unwrap();
        let err = BinaryTableCodec.load(&path).unwrap_err();
        assert!(matches!(err, CodecError::BadMagic(_)));
    }

    #[test]
    fn test_csv_save_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let (catalog, rows) = sample_table();

        let codec = CsvCodec;
        codec.save(&path, &catalog, &rows).unwrap();
        let (loaded_catalog, loaded_rows) = codec.load(&path).unwrap();

        assert_eq!(loaded_catalog.len(), 2);
        assert_eq!(loaded_catalog[0].kind, VarKind::Numeric);
        assert_eq!(loaded_catalog[1].kind, VarKind::Character);
        assert_eq!(loaded_rows, rows);
    }

    #[test]
    fn test_csv_quoted_fields() {
        assert_eq!(
            split_csv_line("a,\"b,c\",\"say \"\"hi\"\"\""),
            vec!["a", "b,c", "say \"hi\""]
        );
    }

    #[test]
    fn test_csv_missing_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("m.csv");
        let catalog = vec![VarDef::numeric("x")];
        let rows = vec![vec![Cell::missing_num()], vec![Cell::Num(2.0)]];

        CsvCodec.save(&path, &catalog, &rows).unwrap();
        let (_, loaded) = CsvCodec.load(&path).unwrap();
        assert_eq!(loaded, rows);
    }
}
