//! Layered configuration loading
//!
//! Priority (highest to lowest):
//! 1. Environment variables with the given prefix (`CALC_TICK_MS`, nested keys
//!    separated by `__`, e.g. `CALC_LOG__LEVEL`)
//! 2. Config file (TOML, YAML or JSON, chosen by extension)
//! 3. `T::default()`

use crate::{Error, Result};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn file_provider(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::config("Config file must have an extension"))?;

    match extension {
        "toml" => Ok(figment.merge(Toml::file(path))),
        "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
        "json" => Ok(figment.merge(Json::file(path))),
        _ => Err(Error::config(format!(
            "Unsupported config file format: {}",
            extension
        ))),
    }
}

/// Load `T` from defaults, an optional file and prefixed environment variables
///
/// A named file that does not exist is an error.
pub fn load_config<T>(file: Option<&Path>, env_prefix: &str) -> Result<T>
where
    T: Serialize + for<'de> Deserialize<'de> + Default,
{
    let mut figment = Figment::from(Serialized::defaults(T::default()));

    if let Some(path) = file {
        if !path.exists() {
            return Err(Error::config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        figment = file_provider(figment, path)?;
    }

    figment = figment.merge(Env::prefixed(env_prefix).split("__"));

    Ok(figment.extract()?)
}

/// Load configuration from a specific file
pub fn load_config_from_file<T, P>(path: P) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let figment = file_provider(Figment::new(), path.as_ref())?;
    figment
        .extract()
        .map_err(|e| Error::config(format!("Failed to load configuration from file: {}", e)))
}
