use crate::executor::IsolationKind;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "fuzzreplay.toml";

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct ExecutorConfig {
    #[serde(default)]
    pub isolation: IsolationKind,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct DriverSettings {
    #[serde(default)]
    pub wait_for_debugger: bool,
    /// Replayed before any inputs named on the command line.
    #[serde(default)]
    pub inputs: Vec<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct ReplayConfig {
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub driver: DriverSettings,
}

impl ReplayConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file at {:?}: {}", path, e))?;

        Self::from_toml_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse TOML from config file {:?}: {}", path, e)
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Loads `explicit` if given, else [`DEFAULT_CONFIG_FILE`] from the working
    /// directory if it exists, else the built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, anyhow::Error> {
        match explicit {
            Some(path) => {
                tracing::info!(?path, "loading configuration");
                Self::load_from_file(path)
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    tracing::info!(path = ?default_path, "loading default configuration");
                    Self::load_from_file(&default_path)
                } else {
                    tracing::debug!("no configuration file, using built-in defaults");
                    Ok(Self::default())
                }
            }
        }
    }
}
