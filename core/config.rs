use crate::error::{AppError, Result};
use byte_unit::Byte;
use log;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_CONFIG_FILENAME: &str = "jsmashy.toml";
pub const DEFAULT_INSTRUCTIONS_FILE: &str = "AGENTS.md";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub skeleton: SkeletonConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    #[serde(default = "default_true")]
    pub use_gitignore: bool,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub max_file_size: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SkeletonConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_instructions_file")]
    pub instructions_file: String,
    #[serde(default)]
    pub include_timestamp: bool,
}

fn default_true() -> bool {
    true
}
fn default_instructions_file() -> String {
    DEFAULT_INSTRUCTIONS_FILE.to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            use_gitignore: default_true(),
            exclude: Vec::new(),
            max_file_size: None,
        }
    }
}
impl Default for SkeletonConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}
impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            instructions_file: default_instructions_file(),
            include_timestamp: false,
        }
    }
}

impl Config {
    /// Resolves the directory to scan. A missing or unreadable root is fatal.
    pub fn determine_project_root(cli_project_root: Option<&PathBuf>) -> Result<PathBuf> {
        let path_to_resolve = match cli_project_root {
            Some(p) => PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).as_ref()),
            None => env::current_dir().map_err(AppError::Io)?,
        };

        let canonical =
            path_to_resolve
                .canonicalize()
                .map_err(|e| AppError::RootNotFound {
                    path: path_to_resolve.clone(),
                    source: e,
                })?;
        if !canonical.is_dir() {
            return Err(AppError::RootNotDirectory(canonical));
        }
        Ok(canonical)
    }

    pub fn resolve_config_path(
        project_root: &Path,
        cli_config_file: Option<&PathBuf>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }

        match cli_config_file {
            Some(p) => {
                let path = PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).as_ref());
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Specified config file not found at path: {}",
                        path.display()
                    )));
                }
                log::debug!("Using specified config file path: {}", path.display());
                Ok(Some(path))
            }
            None => {
                let default_path = project_root.join(DEFAULT_CONFIG_FILENAME);
                if default_path.is_file() {
                    log::debug!("Using default config file path: {}", default_path.display());
                    Ok(Some(default_path))
                } else {
                    log::debug!(
                        "No config file specified and default not found at: {}",
                        default_path.display()
                    );
                    Ok(None)
                }
            }
        }
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&toml_content).map_err(|e| match e {
            AppError::TomlParse(msg) => AppError::TomlParse(format!(
                "Error parsing config file '{}': {}",
                config_path.display(),
                msg
            )),
            other => other,
        })
    }

    pub fn from_toml_str(toml_content: &str) -> Result<Self> {
        toml::from_str::<Config>(toml_content).map_err(|e| {
            AppError::TomlParse(format!("{}. Check TOML syntax and structure.", e))
        })
    }

    /// Parses `general.max_file_size` ("512KB", "2MB", ...) into bytes.
    pub fn max_file_size_bytes(&self) -> Result<Option<u64>> {
        let Some(size_str) = self.general.max_file_size.as_deref() else {
            return Ok(None);
        };
        let byte_value = Byte::from_str(size_str).map_err(|e| {
            AppError::SizeParse(format!(
                "Invalid max_file_size '{}': {}. Use KB, MB, etc.",
                size_str, e
            ))
        })?;
        let bytes = byte_value.as_u64();
        if bytes == 0 {
            return Err(AppError::InvalidArgument(
                "max_file_size must be greater than 0 bytes".to_string(),
            ));
        }
        Ok(Some(bytes))
    }
}
