//! Configuration Loader
//!
//! Environment-aware configuration loading. Handles YAML file discovery,
//! environment detection, overlay merging and environment variable overrides.

use super::OrchestratorConfig;
use crate::error::Result;
use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const CONFIG_FILE_STEM: &str = "farm-orchestrator";

/// Loaded, validated configuration together with where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: OrchestratorConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> Result<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> Result<Arc<ConfigManager>> {
        let environment = crate::logging::get_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> Result<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            environment = %environment,
            directory = %config_directory.display(),
            "Loading orchestrator configuration"
        );

        let config = Self::build(&config_directory, environment)?;
        config.validate()?;

        tracing::info!(
            environment = %environment,
            parallelism_hint = config.pipeline.parallelism_hint,
            aggregation_procedure = %config.pipeline.aggregation_procedure,
            manual_program = %config.manual_tasks.program,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    fn build(config_directory: &Path, environment: &str) -> Result<OrchestratorConfig> {
        let base = config_directory.join(format!("{CONFIG_FILE_STEM}.yaml"));
        let overlay = config_directory.join(format!("{CONFIG_FILE_STEM}.{environment}.yaml"));

        let config: OrchestratorConfig = Config::builder()
            .add_source(File::from(base).format(FileFormat::Yaml).required(false))
            .add_source(File::from(overlay).format(FileFormat::Yaml).required(false))
            .add_source(
                Environment::with_prefix("FARM")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    fn default_config_directory() -> PathBuf {
        std::env::var("FARM_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }
}
