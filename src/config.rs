//! Bridge configuration, loadable from JSON.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Names and limits used when wiring the two runtimes together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Script namespace holding the bridge commands.
    pub namespace: String,
    /// Package name child interpreters `package require`.
    pub package: String,
    /// Object-runtime module exposing the bridge API.
    pub module: String,
    /// Exception class raised for script errors, looked up in `module`.
    pub error_class: String,
    /// Callable in `module` turning an exception into error code and info.
    pub exception_handler: String,
    /// Maximum script evaluation nesting depth.
    pub max_depth: usize,
    pub prompt: String,
    pub continuation_prompt: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            namespace: "::twine".to_string(),
            package: "twine".to_string(),
            module: "twine".to_string(),
            error_class: "ScriptError".to_string(),
            exception_handler: "handle_exception".to_string(),
            max_depth: 1000,
            prompt: ">>> ".to_string(),
            continuation_prompt: "... ".to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        BridgeConfig::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.namespace.starts_with("::") {
            return Err(ConfigError::Invalid(format!(
                "namespace \"{}\" must be fully qualified",
                self.namespace
            )));
        }
        let names = [
            ("package", &self.package),
            ("module", &self.module),
            ("error_class", &self.error_class),
            ("exception_handler", &self.exception_handler),
        ];
        for (field, value) in names {
            if value.is_empty() {
                return Err(ConfigError::Invalid(format!("{field} must not be empty")));
            }
        }
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be positive".to_string()));
        }
        Ok(())
    }

    /// `name` qualified with the bridge namespace.
    pub fn command(&self, name: &str) -> String {
        format!("{}::{name}", self.namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = BridgeConfig::from_json(r#"{"error_class": "TclError"}"#).unwrap();
        assert_eq!(config.error_class, "TclError");
        assert_eq!(config.namespace, "::twine");
        assert_eq!(config.command("eval"), "::twine::eval");
    }

    #[test]
    fn invalid_configurations_are_rejected() {
        let error = BridgeConfig::from_json(r#"{"namespace": "twine"}"#).unwrap_err();
        assert_eq!(
            error.to_string(),
            "invalid configuration: namespace \"twine\" must be fully qualified"
        );
        assert!(BridgeConfig::from_json(r#"{"module": ""}"#).is_err());
        assert!(matches!(
            BridgeConfig::from_json("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_reports_the_path() {
        let error = BridgeConfig::load(Path::new("/nonexistent/twine.json")).unwrap_err();
        assert!(error.to_string().starts_with("cannot read /nonexistent/twine.json"));
    }
}
