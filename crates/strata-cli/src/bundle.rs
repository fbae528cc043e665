//! Loading of prepared dataset bundles.
//!
//! A bundle is a directory holding `meta.json` plus, for every table, a raw
//! CSV and its already transformed numeric rendition. Producing the
//! transformed CSVs is the job of an upstream pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use strata_core::{Dataset, Error as CoreError, Frame, METADATA_VERSION, Table, TableMeta, Value};

pub const MANIFEST_FILE: &str = "meta.json";

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid manifest: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("unsupported bundle version '{found}', expected '{expected}'")]
    UnsupportedVersion { found: String, expected: String },
    #[error("table '{table}' has no raw column '{column}'")]
    MissingColumn { table: String, column: String },
    #[error("invalid number '{value}' in {path} at row {row}, column '{column}'")]
    InvalidNumber {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
    },
    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type BundleResult<T> = std::result::Result<T, BundleError>;

/// Contents of `meta.json`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BundleManifest {
    #[serde(default = "default_version")]
    pub version: String,
    pub tables: Vec<BundleTable>,
}

/// One table of a bundle; CSV paths are relative to the bundle directory.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BundleTable {
    pub meta: TableMeta,
    pub raw: PathBuf,
    pub transformed: PathBuf,
}

fn default_version() -> String {
    METADATA_VERSION.to_string()
}

pub fn read_manifest(dir: &Path) -> BundleResult<BundleManifest> {
    let path = dir.join(MANIFEST_FILE);
    let content = std::fs::read_to_string(&path).map_err(|source| BundleError::Io {
        path: path.clone(),
        source,
    })?;
    let manifest: BundleManifest = serde_json::from_str(&content)?;
    if manifest.version != METADATA_VERSION {
        return Err(BundleError::UnsupportedVersion {
            found: manifest.version,
            expected: METADATA_VERSION.to_string(),
        });
    }
    Ok(manifest)
}

/// Read a bundle directory into a validated [`Dataset`].
pub fn load_bundle(dir: &Path) -> BundleResult<Dataset> {
    let manifest = read_manifest(dir)?;
    let mut tables = Vec::with_capacity(manifest.tables.len());
    let mut transformed = BTreeMap::new();

    for entry in manifest.tables {
        let data = read_raw_csv(&dir.join(&entry.raw))?;
        if let Some(column) = entry
            .meta
            .fields
            .keys()
            .find(|field| !data.has_column(field))
        {
            return Err(BundleError::MissingColumn {
                table: entry.meta.name.clone(),
                column: column.clone(),
            });
        }
        let numeric = read_transformed_csv(&dir.join(&entry.transformed))?;
        debug!(
            table = %entry.meta.name,
            rows = data.len(),
            columns = numeric.width(),
            "table loaded"
        );
        transformed.insert(entry.meta.name.clone(), numeric);
        tables.push(Table::new(data, entry.meta));
    }

    Ok(Dataset::new(tables, transformed)?)
}

fn read_csv(path: &Path) -> BundleResult<(Vec<String>, Vec<csv::StringRecord>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;
    let headers = reader
        .headers()?
        .iter()
        .map(|header| header.to_string())
        .collect();
    let records = reader.records().collect::<Result<Vec<_>, _>>()?;
    Ok((headers, records))
}

/// Raw cells are parsed into [`Value`]s; empty cells are missing.
pub fn read_raw_csv(path: &Path) -> BundleResult<Frame<Value>> {
    let (headers, records) = read_csv(path)?;
    let rows = records
        .iter()
        .map(|record| record.iter().map(Value::parse).collect())
        .collect();
    Ok(Frame::from_rows(headers, rows)?)
}

/// Transformed cells must be numeric; empty cells become `NaN`.
pub fn read_transformed_csv(path: &Path) -> BundleResult<Frame<f64>> {
    let (headers, records) = read_csv(path)?;
    let mut rows = Vec::with_capacity(records.len());
    for (row, record) in records.iter().enumerate() {
        let values = record
            .iter()
            .zip(&headers)
            .map(|(cell, column)| parse_number(cell, path, row, column))
            .collect::<BundleResult<Vec<f64>>>()?;
        rows.push(values);
    }
    Ok(Frame::from_rows(headers, rows)?)
}

fn parse_number(cell: &str, path: &Path, row: usize, column: &str) -> BundleResult<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Ok(f64::NAN);
    }
    trimmed.parse().map_err(|_| BundleError::InvalidNumber {
        path: path.to_path_buf(),
        row,
        column: column.to_string(),
        value: cell.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle_dir(files: &[(&str, &str)]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("strata_bundle_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        for (name, content) in files {
            std::fs::write(dir.join(name), content).unwrap();
        }
        dir
    }

    const MANIFEST: &str = r#"{
        "version": "0.1",
        "tables": [
            {
                "meta": {
                    "name": "users",
                    "primary_key": "id",
                    "fields": {
                        "id": {"name": "id", "type": "id", "subtype": "integer"},
                        "plan": {"name": "plan", "type": "categorical"}
                    }
                },
                "raw": "users.csv",
                "transformed": "users.transformed.csv"
            },
            {
                "meta": {
                    "name": "sessions",
                    "fields": {
                        "user_id": {"name": "user_id", "type": "id", "ref": {"table": "users", "field": "id"}},
                        "minutes": {"name": "minutes", "type": "number"}
                    }
                },
                "raw": "sessions.csv",
                "transformed": "sessions.transformed.csv"
            }
        ]
    }"#;

    #[test]
    fn loads_tables_and_relationships() {
        let dir = bundle_dir(&[
            ("meta.json", MANIFEST),
            ("users.csv", "id,plan\n1,free\n2,pro\n"),
            ("users.transformed.csv", "id,plan\n1,0.25\n2,0.75\n"),
            ("sessions.csv", "user_id,minutes\n1,10\n1,\n2,30\n"),
            (
                "sessions.transformed.csv",
                "user_id,minutes\n1,10\n1,\n2,30\n",
            ),
        ]);

        let dataset = load_bundle(&dir).unwrap();

        assert_eq!(dataset.roots(), vec!["users".to_string()]);
        assert!(dataset.get_children("users").contains("sessions"));
        let raw = &dataset.table("sessions").unwrap().data;
        assert_eq!(raw.column("minutes").unwrap()[1], Value::Null);
        assert_eq!(raw.column("user_id").unwrap()[0], Value::Int(1));
        let transformed = dataset.transformed("sessions").unwrap();
        assert!(transformed.column("minutes").unwrap()[1].is_nan());
        assert_eq!(dataset.transformed("users").unwrap().column("plan"), Some(&[0.25, 0.75][..]));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn demo_bundle_models_end_to_end() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/retail");
        let dataset = load_bundle(&dir).unwrap();
        let mut modeler =
            strata_modeler::Modeler::new(&dataset, &strata_modeler::ModelerOptions::default())
                .unwrap();

        modeler.model_database().unwrap();

        assert_eq!(modeler.models().len(), 3);
        let customers = &modeler.tables()["customers"];
        assert_eq!(customers.len(), 4);
        assert!(customers.has_column("__orders_distribs__order_total__mean"));
    }

    #[test]
    fn rejects_non_numeric_transformed_cells() {
        let dir = bundle_dir(&[("t.csv", "a,b\n1,x\n")]);

        let err = read_transformed_csv(&dir.join("t.csv")).unwrap_err();
        assert!(matches!(
            err,
            BundleError::InvalidNumber { row: 0, ref column, .. } if column == "b"
        ));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn rejects_fields_missing_from_raw_data() {
        let dir = bundle_dir(&[
            ("meta.json", MANIFEST),
            ("users.csv", "id\n1\n2\n"),
            ("users.transformed.csv", "id\n1\n2\n"),
        ]);

        let err = load_bundle(&dir).unwrap_err();
        assert!(matches!(
            err,
            BundleError::MissingColumn { ref table, ref column } if table == "users" && column == "plan"
        ));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn rejects_unknown_versions() {
        let dir = bundle_dir(&[("meta.json", r#"{"version": "9", "tables": []}"#)]);

        assert!(matches!(
            read_manifest(&dir),
            Err(BundleError::UnsupportedVersion { .. })
        ));

        std::fs::remove_dir_all(&dir).ok();
    }
}
