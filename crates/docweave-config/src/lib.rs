use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file at the project root
pub const CONFIG_FILE_NAME: &str = "docweave.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Directory names and file-name prefixes of the project tree
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub assemblies_dir: String,
    pub modules_dir: String,
    pub images_dir: String,
    pub assembly_prefix: String,
    pub procedure_prefix: String,
    pub concept_prefix: String,
    pub reference_prefix: String,
    pub book_file: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            assemblies_dir: "assemblies".to_string(),
            modules_dir: "modules".to_string(),
            images_dir: "images".to_string(),
            assembly_prefix: "assembly_".to_string(),
            procedure_prefix: "proc_".to_string(),
            concept_prefix: "con_".to_string(),
            reference_prefix: "ref_".to_string(),
            book_file: "master.adoc".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Prepended (with a dash) to every generated category
    pub category_prefix: Option<String>,
    /// Derive categories from source directories below this path
    pub legacy_base_dir: Option<PathBuf>,
    /// Stamp generated files with a ConversionDate
    pub timestamp: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    /// Anchor root ID → full ID to pick when the root is ambiguous
    pub preferred: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Files whose `:name: value` lines seed every resolution pass
    pub attribute_files: Vec<PathBuf>,
    /// Condition attributes treated as set when filtering `ifdef`/`ifndef`
    pub conditions: Vec<String>,
    pub layout: LayoutConfig,
    pub split: SplitConfig,
    pub links: LinksConfig,
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in path settings
        for file in &mut config.attribute_files {
            if let Some(expanded) = Self::expand_path(file) {
                *file = expanded;
            }
        }
        if let Some(base) = &config.split.legacy_base_dir {
            config.split.legacy_base_dir = Some(Self::expand_path(base).unwrap_or_else(|| base.clone()));
        }

        Ok(Some(config))
    }

    /// Configuration of the project at `project_dir`; defaults when the
    /// project has no config file
    pub fn load_from_dir<P: AsRef<Path>>(project_dir: P) -> Result<Self, ConfigError> {
        let config_path = Self::config_path(project_dir.as_ref());
        Ok(Self::load_from_path(config_path)?.unwrap_or_default())
    }

    pub fn config_path(project_dir: &Path) -> PathBuf {
        project_dir.join(CONFIG_FILE_NAME)
    }

    /// Relative attribute files are taken relative to the project directory
    pub fn attribute_files_in(&self, project_dir: &Path) -> Vec<PathBuf> {
        self.attribute_files
            .iter()
            .map(|file| project_dir.join(file))
            .collect()
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}
