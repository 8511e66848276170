use selser_dom::config::DEFAULT_CONFIG_NAME;
use selser_dom::SelserConfig;
use selser_engine::NormalizeOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// `selser.config.json`: the engine configuration plus CLI defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(flatten)]
    pub selser: SelserConfig,

    /// Defaults for `selser normalize`
    #[serde(default)]
    pub normalize: NormalizeOptions,

    /// Defaults for `selser fuzz`
    #[serde(default)]
    pub fuzz: FuzzDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FuzzDefaults {
    pub runs: usize,
    pub seed: String,
}

impl Default for FuzzDefaults {
    fn default() -> Self {
        Self {
            runs: 20,
            seed: String::new(),
        }
    }
}

impl Config {
    /// Load config from `explicit`, or from the working directory if it has one
    pub fn load(cwd: &str, explicit: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = match explicit {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            debug!(path = %config_path.display(), "loaded config");
            Ok(config)
        } else if explicit.is_some() {
            Err(anyhow::anyhow!(
                "Config file does not exist: {}",
                config_path.display()
            ))
        } else {
            debug!("no config file, using defaults");
            Ok(Config::default())
        }
    }
}
