mod bundle;
mod registry;
mod settings;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use registry::{
    RunContext, init_run_logging, start_run, write_extended, write_models, write_report,
};
use strata_copula::Distribution;
use strata_core::METADATA_VERSION;
use strata_modeler::{Modeler, ModelerError};
use thiserror::Error;
use uuid::Uuid;

use bundle::{BundleError, BundleManifest, load_bundle};
use settings::{SettingsError, load_settings};

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("bundle error: {0}")]
    Bundle(#[from] BundleError),
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
    #[error("modeling error: {0}")]
    Modeler(#[from] ModelerError),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "strata", version, about = "Strata hierarchical database modeler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Model every table of a prepared bundle.
    Model(ModelArgs),
    /// Print the JSON schema of a bundle's meta.json.
    Schema,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Bundle directory holding meta.json and the table CSVs.
    #[arg(long)]
    bundle: PathBuf,
    /// Optional TOML settings file with a [modeler] table.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output directory for runs.
    #[arg(long, default_value = "runs")]
    run_dir: PathBuf,
    /// Multivariate model family.
    #[arg(long)]
    model: Option<String>,
    /// Univariate distribution for every column (alias or full name).
    #[arg(long)]
    distribution: Option<Distribution>,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Model(args) => run_model(args),
        Command::Schema => print_schema(),
    }
}

fn run_model(args: ModelArgs) -> Result<(), CliError> {
    let ModelArgs {
        bundle,
        config,
        run_dir,
        model,
        distribution,
    } = args;

    let settings = load_settings(config.as_deref())?.with_overrides(model, distribution);

    let run_id = Uuid::new_v4().to_string();
    let run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        metadata_version: METADATA_VERSION.to_string(),
        bundle: bundle.clone(),
        run_dir,
        options: settings.modeler.clone(),
    };

    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path)?;

    tracing::info!(event = "run_started", run_id = %run_id, bundle = %bundle.display());

    let timer = Instant::now();

    let dataset = load_bundle(&bundle)?;
    tracing::info!(event = "bundle_loaded", tables = dataset.table_names().count());

    let mut modeler = Modeler::new(&dataset, &settings.modeler)?;
    modeler.model_database()?;

    write_models(&run_paths, modeler.models())?;
    tracing::info!(event = "models_written", path = %run_paths.models_path.display());

    write_report(&run_paths, modeler.report())?;
    tracing::info!(event = "report_written", path = %run_paths.report_path.display());

    let (tables, _) = modeler.into_parts();
    let rows = write_extended(&run_paths, &tables)?;
    tracing::info!(
        event = "extended_written",
        path = %run_paths.extended_dir.display(),
        rows = rows
    );

    let duration_ms = timer.elapsed().as_millis();
    tracing::info!(event = "run_finished", status = "success", duration_ms = duration_ms);

    Ok(())
}

fn print_schema() -> Result<(), CliError> {
    let schema = schemars::schema_for!(BundleManifest);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
