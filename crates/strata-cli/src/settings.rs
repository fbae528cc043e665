use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use strata_copula::Distribution;
use strata_modeler::ModelerOptions;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Contents of a `strata.toml` settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub modeler: ModelerOptions,
}

impl Settings {
    /// Command-line values win over the settings file.
    pub fn with_overrides(mut self, model: Option<String>, distribution: Option<Distribution>) -> Self {
        if let Some(model) = model {
            self.modeler.model = model;
        }
        if let Some(distribution) = distribution {
            self.modeler.distribution = distribution;
        }
        self
    }
}

/// Read settings from `path`, or defaults when no file is given.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, SettingsError> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modeler_table() {
        let settings: Settings = toml::from_str(
            r#"
            [modeler]
            distribution = "uniform"
            "#,
        )
        .unwrap();

        assert_eq!(settings.modeler.model, "gaussian_multivariate");
        assert_eq!(settings.modeler.distribution, Distribution::Uniform);
    }

    #[test]
    fn accepts_fully_qualified_distribution_names() {
        let settings: Settings = toml::from_str(
            r#"
            [modeler]
            model = "strata_copula::multivariate::GaussianMultivariate"
            distribution = "strata_copula::univariate::GaussianUnivariate"
            "#,
        )
        .unwrap();

        assert_eq!(settings.modeler.distribution, Distribution::Gaussian);
    }

    #[test]
    fn rejects_unknown_distributions() {
        let result: Result<Settings, _> = toml::from_str("[modeler]\ndistribution = \"kde\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn flags_override_file_values() {
        let settings = Settings::default()
            .with_overrides(Some("custom".to_string()), Some(Distribution::Uniform));

        assert_eq!(settings.modeler.model, "custom");
        assert_eq!(settings.modeler.distribution, Distribution::Uniform);
        assert_eq!(
            Settings::default().with_overrides(None, None),
            Settings::default()
        );
    }

    #[test]
    fn missing_path_gives_defaults() {
        assert_eq!(load_settings(None).unwrap(), Settings::default());
    }
}
