//! calcctl configuration: calculator options and logging

use anyhow::{Context, Result};
use common::LogConfig;
use reactive_calc::CalculatorOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment prefix, e.g. `CALC_CALCULATOR__TICK_MS=50`
pub const ENV_PREFIX: &str = "CALC_";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalcctlConfig {
    pub calculator: CalculatorOptions,
    pub log: LogConfig,
}

pub fn load(path: Option<&Path>) -> Result<CalcctlConfig> {
    common::load_config(path, ENV_PREFIX).with_context(|| match path {
        Some(path) => format!("Failed to load {}", path.display()),
        None => "Failed to load configuration".to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use common::LogFormat;

    #[test]
    fn test_load_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calcctl.yaml");
        std::fs::write(
            &path,
            "calculator:\n  tick_ms: 20\n  fix_values_on_blur: false\nlog:\n  format: json\n",
        )
        .unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.calculator.tick_ms, 20);
        assert!(!config.calculator.fix_values_on_blur);
        assert!(config.calculator.populate_fields_data);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.level, "info");
    }
}
