use std::collections::BTreeMap;
use std::fs::{OpenOptions, create_dir_all};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Serialize;

use strata_copula::ParamValue;
use strata_core::Frame;
use strata_modeler::{ExtendedTables, FittedModels, ModelerOptions, ModelingReport};

use super::{RegistryError, RegistryResult};

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub metadata_version: String,
    pub bundle: PathBuf,
    pub run_dir: PathBuf,
    pub options: ModelerOptions,
}

/// JSON config written to each run directory.
#[derive(Debug, Serialize)]
pub struct RunConfig {
    pub run_id: String,
    pub started_at: String,
    pub metadata_version: String,
    pub bundle: String,
    pub options: ModelerOptions,
    pub git: GitInfo,
}

/// Git metadata for reproducibility.
#[derive(Debug, Serialize)]
pub struct GitInfo {
    pub commit: Option<String>,
    pub dirty: Option<bool>,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub logs_path: PathBuf,
    pub models_path: PathBuf,
    pub report_path: PathBuf,
    pub extended_dir: PathBuf,
}

pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let root = ctx
        .run_dir
        .join(format!("{timestamp}__run_{}", ctx.run_id));

    create_dir_all(&root)?;

    let paths = RunPaths {
        config_path: root.join("config.json"),
        logs_path: root.join("logs.ndjson"),
        models_path: root.join("models.json"),
        report_path: root.join("report.json"),
        extended_dir: root.join("extended"),
        root,
    };

    let config = RunConfig {
        run_id: ctx.run_id.clone(),
        started_at: ctx.started_at.to_rfc3339(),
        metadata_version: ctx.metadata_version.clone(),
        bundle: ctx.bundle.display().to_string(),
        options: ctx.options.clone(),
        git: collect_git_info(),
    };

    write_json(&paths.config_path, &config)?;

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.logs_path)?;

    Ok(paths)
}

/// Write every fitted model's nested parameters, keyed by table.
pub fn write_models(paths: &RunPaths, models: &FittedModels) -> RegistryResult<()> {
    let params: BTreeMap<&str, ParamValue> = models
        .iter()
        .map(|(table, model)| (table.as_str(), model.to_dict()))
        .collect();
    write_json(&paths.models_path, &params)
}

pub fn write_report(paths: &RunPaths, report: &ModelingReport) -> RegistryResult<()> {
    write_json(&paths.report_path, report)
}

/// Write each extended table as `extended/<table>.csv`; returns rows written.
pub fn write_extended(paths: &RunPaths, tables: &ExtendedTables) -> RegistryResult<u64> {
    create_dir_all(&paths.extended_dir)?;
    let mut rows = 0;
    for (table, frame) in tables {
        let path = paths.extended_dir.join(format!("{table}.csv"));
        rows += write_frame_csv(&path, frame)?;
    }
    Ok(rows)
}

/// Row labels go first, under `index`; missing cells are left empty.
fn write_frame_csv(path: &Path, frame: &Frame<f64>) -> RegistryResult<u64> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;
    let mut writer = csv::WriterBuilder::new().from_writer(BufWriter::new(file));

    let header = std::iter::once("index").chain(frame.columns().iter().map(String::as_str));
    writer.write_record(header)?;

    for (position, label) in frame.index().iter().enumerate() {
        let mut record = vec![label.to_string()];
        for (_, values) in frame.iter_columns() {
            let value = values[position];
            record.push(if value.is_nan() {
                String::new()
            } else {
                value.to_string()
            });
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(frame.len() as u64)
}

pub fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            } else {
                None
            }
        })
        .filter(|value| !value.is_empty());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .map(|output| !output.stdout.is_empty());

    GitInfo { commit, dirty }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> RegistryResult<()> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;
    serde_json::to_writer_pretty(file, value).map_err(RegistryError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RunContext {
        RunContext {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            metadata_version: strata_core::METADATA_VERSION.to_string(),
            bundle: PathBuf::from("bundle"),
            run_dir: std::env::temp_dir().join(format!("strata_runs_{}", uuid::Uuid::new_v4())),
            options: ModelerOptions::default(),
        }
    }

    #[test]
    fn start_run_writes_config() {
        let ctx = context();
        let paths = start_run(&ctx).unwrap();

        let name = paths.root.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with(&format!("__run_{}", ctx.run_id)));
        assert!(paths.logs_path.exists());

        let config: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths.config_path).unwrap()).unwrap();
        assert_eq!(config["run_id"], ctx.run_id.as_str());
        assert_eq!(config["options"]["model"], "gaussian_multivariate");
        assert_eq!(
            config["options"]["distribution"],
            "strata_copula::univariate::GaussianUnivariate"
        );

        std::fs::remove_dir_all(&ctx.run_dir).ok();
    }

    #[test]
    fn extended_tables_leave_missing_cells_empty() {
        let ctx = context();
        let paths = start_run(&ctx).unwrap();
        let frame = Frame::with_index(
            vec![3, 7],
            vec!["a".to_string(), "__child_b".to_string()],
            vec![vec![1.5, 2.0], vec![f64::NAN, 0.25]],
        )
        .unwrap();
        let tables = ExtendedTables::from([("parent".to_string(), frame)]);

        let rows = write_extended(&paths, &tables).unwrap();

        assert_eq!(rows, 2);
        let content = std::fs::read_to_string(paths.extended_dir.join("parent.csv")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["index,a,__child_b", "3,1.5,", "7,2,0.25"]);

        std::fs::remove_dir_all(&ctx.run_dir).ok();
    }
}
