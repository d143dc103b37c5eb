//! Per-environment connection settings read from `db/config.json`.
//!
//! ```json
//! {
//!   "development": { "driver": "sqlite3", "source": "db/development.sqlite" },
//!   "production": { "driver": "postgres", "source": "postgres://localhost/app" }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HoodError, Result};

/// Environment variable selecting the active environment.
pub const ENV_VAR: &str = "HOOD_ENV";

/// Environment used when [`ENV_VAR`] is unset or empty.
pub const DEFAULT_ENV: &str = "development";

/// Default location of the config file, relative to the project root.
pub const CONFIG_PATH: &str = "db/config.json";

/// Connection settings for one environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Registered dialect name, e.g. `postgres` or `sqlite3`.
    pub driver: String,
    /// Driver specific data source.
    pub source: String,
}

/// All environments of a config file, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environments(BTreeMap<String, Config>);

impl Environments {
    /// Reads and parses a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| HoodError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parses config JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid config.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Returns the settings of one environment.
    ///
    /// # Errors
    ///
    /// Returns [`HoodError::UnknownEnvironment`] if there is no such entry.
    pub fn get(&self, env: &str) -> Result<&Config> {
        self.0
            .get(env)
            .ok_or_else(|| HoodError::UnknownEnvironment(env.to_string()))
    }

    pub fn insert(&mut self, env: impl Into<String>, config: Config) {
        self.0.insert(env.into(), config);
    }

    /// Environment names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// The skeleton written by `hood create:config`: empty `development`,
    /// `production` and `test` entries.
    #[must_use]
    pub fn template() -> Self {
        let mut envs = Self::default();
        for env in ["development", "production", "test"] {
            envs.insert(env, Config::default());
        }
        envs
    }

    /// Serializes as indented JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Returns the environment named by `HOOD_ENV`, or `development`.
#[must_use]
pub fn current_env() -> String {
    std::env::var(ENV_VAR)
        .ok()
        .filter(|env| !env.is_empty())
        .unwrap_or_else(|| DEFAULT_ENV.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_get() {
        let envs = Environments::parse(
            r#"{
                "development": { "driver": "sqlite3", "source": "dev.db" },
                "production": { "driver": "postgres", "source": "postgres://db/app" }
            }"#,
        )
        .unwrap();
        assert_eq!(
            envs.get("development").unwrap(),
            &Config {
                driver: "sqlite3".into(),
                source: "dev.db".into()
            }
        );
        assert_eq!(envs.names().collect::<Vec<_>>(), ["development", "production"]);
    }

    #[test]
    fn test_unknown_environment() {
        let envs = Environments::template();
        assert!(matches!(
            envs.get("staging"),
            Err(HoodError::UnknownEnvironment(env)) if env == "staging"
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            Environments::parse("{ not json"),
            Err(HoodError::Config(_))
        ));
    }

    #[test]
    fn test_template_round_trips() {
        let json = Environments::template().to_json().unwrap();
        assert!(json.contains("\"production\""));
        assert_eq!(Environments::parse(&json).unwrap(), Environments::template());
    }
}
