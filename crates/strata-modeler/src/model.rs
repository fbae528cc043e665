use serde::{Deserialize, Serialize};
use strata_copula::{Distribution, GaussianMultivariateFamily};

/// Options for the modeler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelerOptions {
    /// Multivariate model family, by short or fully-qualified name.
    pub model: String,
    /// Univariate family used for every column's marginal.
    pub distribution: Distribution,
}

impl Default for ModelerOptions {
    fn default() -> Self {
        Self {
            model: GaussianMultivariateFamily::NAME.to_string(),
            distribution: Distribution::Gaussian,
        }
    }
}

/// Summary of one modeled table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,
    pub rows: u64,
    pub original_columns: u64,
    pub extension_columns: u64,
    pub children: u64,
    pub duration_ms: u64,
}

/// Report for a modeling run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelingReport {
    pub model: String,
    pub distribution: String,
    pub tables: Vec<TableReport>,
    pub duration_ms: u64,
}

impl ModelingReport {
    /// Record a table, replacing an earlier entry for the same table.
    pub fn record(&mut self, report: TableReport) {
        match self
            .tables
            .iter_mut()
            .find(|existing| existing.table == report.table)
        {
            Some(existing) => *existing = report,
            None => self.tables.push(report),
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|report| report.table == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_report(table: &str, rows: u64) -> TableReport {
        TableReport {
            table: table.to_string(),
            rows,
            original_columns: 2,
            extension_columns: 0,
            children: 0,
            duration_ms: 1,
        }
    }

    #[test]
    fn options_default_missing_fields() {
        let options: ModelerOptions =
            serde_json::from_str(r#"{"distribution": "uniform"}"#).unwrap();
        assert_eq!(options.model, GaussianMultivariateFamily::NAME);
        assert_eq!(options.distribution, Distribution::Uniform);

        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(
            json["distribution"],
            "strata_copula::univariate::UniformUnivariate"
        );
    }

    #[test]
    fn record_replaces_earlier_entries() {
        let mut report = ModelingReport::default();
        report.record(table_report("users", 3));
        report.record(table_report("sessions", 7));
        report.record(table_report("users", 4));

        assert_eq!(report.tables.len(), 2);
        assert_eq!(report.table("users").map(|entry| entry.rows), Some(4));
        assert!(report.table("missing").is_none());
    }
}
