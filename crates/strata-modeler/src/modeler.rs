use std::collections::BTreeMap;
use std::time::Instant;

use strata_copula::{
    Distribution, FittedModel, GaussianMultivariate, GaussianMultivariateFamily, ModelFamily,
    model_family,
};
use strata_core::{Dataset, Frame, TableMeta};
use tracing::{debug, info};

use crate::compact::{compact_gaussian, expand_gaussian};
use crate::errors::{ModelerError, ModelerResult};
use crate::extension::{Extension, merge_extension};
use crate::flatten::{flatten, unflatten};
use crate::impute::impute_table;
use crate::model::{ModelerOptions, ModelingReport, TableReport};

/// Extended transformed tables, keyed by table name.
pub type ExtendedTables = BTreeMap<String, Frame<f64>>;

/// Fitted models, keyed by table name.
pub type FittedModels = BTreeMap<String, Box<dyn FittedModel>>;

/// Models every table of a dataset, children before parents.
///
/// State is filled table by table: `tables` holds the (extended) transformed
/// table each model was fitted on and `models` the fitted model, both keyed
/// by table name.
#[derive(Debug)]
pub struct Modeler<'a> {
    dataset: &'a Dataset,
    family: Box<dyn ModelFamily>,
    distribution: Distribution,
    tables: ExtendedTables,
    models: FittedModels,
    report: ModelingReport,
}

impl<'a> Modeler<'a> {
    /// Create a modeler, resolving the model family named in `options`.
    pub fn new(dataset: &'a Dataset, options: &ModelerOptions) -> ModelerResult<Self> {
        let family = model_family(&options.model)?;
        Ok(Self::with_family(dataset, family, options.distribution))
    }

    /// Create a modeler around an explicit model family.
    pub fn with_family(
        dataset: &'a Dataset,
        family: Box<dyn ModelFamily>,
        distribution: Distribution,
    ) -> Self {
        let report = ModelingReport {
            model: family.name().to_string(),
            distribution: distribution.fqn().to_string(),
            ..ModelingReport::default()
        };
        Self {
            dataset,
            family,
            distribution,
            tables: BTreeMap::new(),
            models: BTreeMap::new(),
            report,
        }
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn distribution(&self) -> Distribution {
        self.distribution
    }

    /// Extended transformed tables, keyed by table name.
    pub fn tables(&self) -> &ExtendedTables {
        &self.tables
    }

    /// Fitted models, keyed by table name.
    pub fn models(&self) -> &FittedModels {
        &self.models
    }

    pub fn report(&self) -> &ModelingReport {
        &self.report
    }

    /// Hand the extended tables and fitted models to a downstream consumer.
    pub fn into_parts(self) -> (ExtendedTables, FittedModels) {
        (self.tables, self.models)
    }

    /// Fit the configured model family on a complete numeric table.
    pub fn fit_model(&self, data: &Frame<f64>) -> ModelerResult<Box<dyn FittedModel>> {
        let model = self.family.fit(data, self.distribution)?;
        Ok(model)
    }

    /// Flatten a fitted model's parameters into `key -> value` pairs.
    ///
    /// Gaussian copulas are compacted first (lower-triangular covariance,
    /// log std for Gaussian marginals). Non-finite values come out as `NaN`.
    pub fn flatten_model(&self, model: &dyn FittedModel) -> BTreeMap<String, f64> {
        let mut params = model.to_dict();
        if model.model_type() == GaussianMultivariate::TYPE_NAME {
            compact_gaussian(&mut params, model.distribution());
        }
        flatten(&params)
            .into_iter()
            .map(|(key, value)| (key, if value.is_finite() { value } else { f64::NAN }))
            .collect()
    }

    /// Rebuild a model from a flattened parameter row.
    ///
    /// `columns` lists the columns the model was fitted on.
    pub fn unflatten_model(
        &self,
        flat: &BTreeMap<String, f64>,
        columns: &[String],
    ) -> ModelerResult<Box<dyn FittedModel>> {
        let params = if self.family.name() == GaussianMultivariateFamily::NAME {
            expand_gaussian(flat, columns, self.distribution)?
        } else {
            unflatten(flat)?
        };
        Ok(self.family.from_params(&params)?)
    }

    /// Field of `child` referencing `parent.primary_key`.
    pub fn get_foreign_key(
        child: &TableMeta,
        parent: &str,
        primary_key: &str,
    ) -> ModelerResult<String> {
        child
            .references()
            .find(|(_, reference)| reference.table == parent && reference.field == primary_key)
            .map(|(field, _)| field.to_string())
            .ok_or_else(|| ModelerError::MissingForeignKey {
                child: child.name.clone(),
                parent: parent.to_string(),
                primary_key: primary_key.to_string(),
            })
    }

    /// Conditional Parameter Aggregation for one table.
    ///
    /// Builds the extensions of every child, merges them into the table and
    /// fits a model on the imputed result.
    pub fn cpa(&mut self, table: &str) -> ModelerResult<()> {
        let children = self.dataset.get_children(table);
        let extensions = if children.is_empty() {
            Vec::new()
        } else {
            let primary_key = self
                .dataset
                .meta(table)?
                .primary_key
                .clone()
                .ok_or_else(|| ModelerError::MissingPrimaryKey(table.to_string()))?;
            self.get_extensions(table, &primary_key, &children)?
        };
        self.cpa_with_extensions(table, &extensions)
    }

    /// Merge precomputed extensions into `table`, then fit and store it.
    pub fn cpa_with_extensions(
        &mut self,
        table: &str,
        extensions: &[Extension],
    ) -> ModelerResult<()> {
        let start = Instant::now();
        let original_columns = self.dataset.transformed(table)?.width();
        let extended = self.extend_table(table, extensions)?;
        let model = self.fit_model(&impute_table(&extended))?;

        let report = TableReport {
            table: table.to_string(),
            rows: extended.len() as u64,
            original_columns: original_columns as u64,
            extension_columns: extended.width().saturating_sub(original_columns) as u64,
            children: extensions.len() as u64,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        debug!(
            table = %table,
            rows = report.rows,
            columns = extended.width(),
            extension_columns = report.extension_columns,
            duration_ms = report.duration_ms,
            "table modeled"
        );

        self.report.record(report);
        self.tables.insert(table.to_string(), extended);
        self.models.insert(table.to_string(), model);
        Ok(())
    }

    /// Left-join `extensions` onto the table's current transformed data.
    ///
    /// Starts from the already extended table when one exists. Only columns
    /// are added; row count and index are preserved.
    pub fn extend_table(&self, table: &str, extensions: &[Extension]) -> ModelerResult<Frame<f64>> {
        let mut extended = match self.tables.get(table) {
            Some(current) => current.clone(),
            None => self.dataset.transformed(table)?.clone(),
        };
        if extensions.is_empty() {
            return Ok(extended);
        }

        let raw = &self.dataset.table(table)?.data;
        for extension in extensions {
            extended = merge_extension(&extended, raw, extension)?;
        }
        Ok(extended)
    }

    /// Recursive CPA: model every child not yet modeled, then `table`.
    ///
    /// Tables already modeled are skipped, so each table is fitted once.
    /// Re-entering a table that is still being processed is a cycle.
    pub fn rcpa(&mut self, table: &str) -> ModelerResult<()> {
        let mut path = Vec::new();
        self.rcpa_inner(table, &mut path)
    }

    fn rcpa_inner(&mut self, table: &str, path: &mut Vec<String>) -> ModelerResult<()> {
        if self.models.contains_key(table) {
            return Ok(());
        }
        if let Some(start) = path.iter().position(|visiting| visiting == table) {
            let mut cycle = path[start..].to_vec();
            cycle.push(table.to_string());
            return Err(ModelerError::Cycle(cycle));
        }

        path.push(table.to_string());
        for child in self.dataset.get_children(table) {
            self.rcpa_inner(&child, path)?;
        }
        path.pop();

        self.cpa(table)
    }

    /// Model the whole dataset starting from every root table.
    ///
    /// Fit errors are returned unchanged. Tables unreachable from a root
    /// lie on a cycle and are reported as such.
    pub fn model_database(&mut self) -> ModelerResult<()> {
        let start = Instant::now();
        let dataset = self.dataset;
        let roots = dataset.roots();
        info!(
            tables = dataset.table_names().count(),
            roots = roots.len(),
            model = %self.family.name(),
            distribution = %self.distribution,
            "modeling started"
        );

        for root in &roots {
            self.rcpa(root)?;
        }
        let pending: Vec<String> = dataset
            .table_names()
            .filter(|table| !self.models.contains_key(*table))
            .map(str::to_string)
            .collect();
        for table in &pending {
            self.rcpa(table)?;
        }

        if !self.tables.keys().eq(self.models.keys()) {
            return Err(ModelerError::Inconsistent(
                "modeled tables and fitted models differ".to_string(),
            ));
        }

        self.report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            tables = self.models.len(),
            duration_ms = self.report.duration_ms,
            "modeling completed"
        );
        Ok(())
    }
}
