use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat, FileSourceFile};
use miette::Diagnostic;
use thiserror::Error;

use crate::query::DEFAULT_READINGS_PER_DAY;

/// Environment variable pointing at an explicit configuration file.
pub const CONFIG_PATH_VAR: &str = "WEATHERDATA_CONFIG";
/// Prefix of the environment variables overriding single settings,
/// e.g. `WEATHERDATA_DATA_FILE`.
pub const ENV_PREFIX: &str = "WEATHERDATA";

const DEFAULT_CONFIG_NAME: &str = "weatherdata";
const DEFAULT_DATA_FILE: &str = "smhi-opendata.csv";

#[derive(serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_file: PathBuf,
    pub readings_per_day: u32,
}

#[derive(Debug, Error, Diagnostic)]
pub enum SettingsError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("readings_per_day must be greater than zero")]
    #[diagnostic(help("a day of hourly readings has 24 values"))]
    NoReadingsPerDay,
}

impl Settings {
    /// Defaults, overridden by `weatherdata.toml` in the working directory (or
    /// the file named by `WEATHERDATA_CONFIG`), overridden by `WEATHERDATA_*`
    /// environment variables.
    pub fn load() -> Result<Self, SettingsError> {
        let file = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => File::from(PathBuf::from(path)).required(true),
            Err(_) => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };
        Self::build(
            file,
            Some(Environment::with_prefix(ENV_PREFIX).try_parsing(true)),
        )
    }

    /// Defaults overridden by the given file only.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        Self::build(File::from(path).required(true), None)
    }

    fn build(
        file: File<FileSourceFile, FileFormat>,
        environment: Option<Environment>,
    ) -> Result<Self, SettingsError> {
        let mut builder = Config::builder()
            .set_default("data_file", DEFAULT_DATA_FILE)?
            .set_default("readings_per_day", i64::from(DEFAULT_READINGS_PER_DAY))?
            .add_source(file);
        if let Some(environment) = environment {
            builder = builder.add_source(environment);
        }

        let settings: Self = builder.build()?.try_deserialize()?;
        if settings.readings_per_day == 0 {
            return Err(SettingsError::NoReadingsPerDay);
        }
        Ok(settings)
    }
}
