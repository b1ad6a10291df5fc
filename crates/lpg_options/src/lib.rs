//! lpg_options: lpg.json parsing and transformation options.
//!
//! Every option is optional in the file; accessors supply the defaults so
//! that an empty `{}` configures the stock behavior of every handler.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The configuration file name searched for by [`find_config`].
pub const CONFIG_FILE_NAME: &str = "lpg.json";

pub const DEFAULT_ENTRY_METHOD: &str = "create";
pub const DEFAULT_READ_WRITE_LOCK_NAME: &str = "$readWriteLock";
pub const DEFAULT_LOCK_NAME: &str = "$lock";
pub const DEFAULT_INDENT: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid lpg.json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("option '{option}' must be a Java identifier, got '{value}'")]
    InvalidIdentifier { option: &'static str, value: String },
}

/// Handler options, matching the `transformOptions` object of lpg.json.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformOptions {
    /// Handler names (`Builder`, `Yield`, ...) to skip entirely.
    pub disabled_handlers: Option<Vec<String>>,
    pub builder: Option<BuilderOptions>,
    #[serde(rename = "yield")]
    pub yield_: Option<YieldOptions>,
    pub singleton: Option<SingletonOptions>,
    pub locks: Option<LockOptions>,
    pub printer: Option<PrinterConfig>,
}

/// Defaults for `@Builder` members that the annotation does not set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderOptions {
    pub entry_method: Option<String>,
    pub prefix: Option<String>,
    pub convenient_methods: Option<bool>,
    pub allow_reset: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YieldOptions {
    pub optimize_states: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingletonOptions {
    pub style: Option<SingletonStyle>,
}

/// Lock field names used when an annotation does not name one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockOptions {
    pub read_write_lock_name: Option<String>,
    pub lock_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterConfig {
    pub indent: Option<usize>,
}

/// Singleton implementation strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SingletonStyle {
    /// Single-element enum.
    #[default]
    Enum,
    /// Static nested holder class.
    Holder,
}

impl SingletonStyle {
    /// Parse an annotation constant such as `Singleton.Style.HOLDER`.
    pub fn from_constant(name: &str) -> Option<Self> {
        match name.rsplit('.').next().unwrap_or(name) {
            "ENUM" => Some(SingletonStyle::Enum),
            "HOLDER" => Some(SingletonStyle::Holder),
            _ => None,
        }
    }
}

impl TransformOptions {
    pub fn is_handler_disabled(&self, handler: &str) -> bool {
        self.disabled_handlers
            .as_deref()
            .is_some_and(|names| names.iter().any(|n| n.eq_ignore_ascii_case(handler)))
    }

    pub fn builder_entry_method(&self) -> &str {
        self.builder
            .as_ref()
            .and_then(|b| b.entry_method.as_deref())
            .unwrap_or(DEFAULT_ENTRY_METHOD)
    }

    pub fn builder_prefix(&self) -> &str {
        self.builder.as_ref().and_then(|b| b.prefix.as_deref()).unwrap_or("")
    }

    pub fn builder_convenient_methods(&self) -> bool {
        self.builder
            .as_ref()
            .and_then(|b| b.convenient_methods)
            .unwrap_or(true)
    }

    pub fn builder_allow_reset(&self) -> bool {
        self.builder.as_ref().and_then(|b| b.allow_reset).unwrap_or(false)
    }

    pub fn optimize_states(&self) -> bool {
        self.yield_.as_ref().and_then(|y| y.optimize_states).unwrap_or(true)
    }

    pub fn singleton_style(&self) -> SingletonStyle {
        self.singleton.as_ref().and_then(|s| s.style).unwrap_or_default()
    }

    pub fn read_write_lock_name(&self) -> &str {
        self.locks
            .as_ref()
            .and_then(|l| l.read_write_lock_name.as_deref())
            .unwrap_or(DEFAULT_READ_WRITE_LOCK_NAME)
    }

    pub fn lock_name(&self) -> &str {
        self.locks
            .as_ref()
            .and_then(|l| l.lock_name.as_deref())
            .unwrap_or(DEFAULT_LOCK_NAME)
    }

    pub fn indent(&self) -> usize {
        self.printer.as_ref().and_then(|p| p.indent).unwrap_or(DEFAULT_INDENT)
    }

    /// Check that configured member names can be emitted as Java identifiers.
    pub fn validate(&self) -> Result<(), OptionsError> {
        let names = [
            ("builder.entryMethod", self.builder_entry_method()),
            ("locks.readWriteLockName", self.read_write_lock_name()),
            ("locks.lockName", self.lock_name()),
        ];
        for (option, value) in names {
            if !lpg_core::names::is_java_identifier(value) {
                return Err(OptionsError::InvalidIdentifier {
                    option,
                    value: value.to_string(),
                });
            }
        }
        let prefix = self.builder_prefix();
        if !prefix.is_empty() && !lpg_core::names::is_java_identifier(prefix) {
            return Err(OptionsError::InvalidIdentifier {
                option: "builder.prefix",
                value: prefix.to_string(),
            });
        }
        Ok(())
    }
}

/// The lpg.json file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LpgConfig {
    pub transform_options: Option<TransformOptions>,
    /// Input unit files or directories, relative to the config file.
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub out_dir: Option<String>,
}

impl LpgConfig {
    pub fn options(&self) -> TransformOptions {
        self.transform_options.clone().unwrap_or_default()
    }
}

/// Parse an lpg.json file from a string.
pub fn parse_config(content: &str) -> Result<LpgConfig, OptionsError> {
    let config: LpgConfig = serde_json::from_str(content)?;
    if let Some(options) = &config.transform_options {
        options.validate()?;
    }
    Ok(config)
}

/// Parse an lpg.json file from a path.
pub fn parse_config_file(path: &Path) -> Result<LpgConfig, OptionsError> {
    let content = std::fs::read_to_string(path).map_err(|source| OptionsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

/// Search `start` and its ancestors for lpg.json.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let options = parse_config("{}").unwrap().options();
        assert_eq!(options.builder_entry_method(), "create");
        assert_eq!(options.builder_prefix(), "");
        assert!(options.builder_convenient_methods());
        assert!(!options.builder_allow_reset());
        assert!(options.optimize_states());
        assert_eq!(options.singleton_style(), SingletonStyle::Enum);
        assert_eq!(options.read_write_lock_name(), "$readWriteLock");
        assert_eq!(options.lock_name(), "$lock");
        assert_eq!(options.indent(), 4);
    }

    #[test]
    fn test_parse_camel_case_options() {
        let config = parse_config(
            r#"{
                "transformOptions": {
                    "disabledHandlers": ["yield"],
                    "builder": { "entryMethod": "builder", "prefix": "with", "allowReset": true },
                    "yield": { "optimizeStates": false },
                    "singleton": { "style": "HOLDER" },
                    "locks": { "lockName": "$mutex" }
                },
                "outDir": "out"
            }"#,
        )
        .unwrap();
        let options = config.options();
        assert!(options.is_handler_disabled("Yield"));
        assert!(!options.is_handler_disabled("Builder"));
        assert_eq!(options.builder_entry_method(), "builder");
        assert_eq!(options.builder_prefix(), "with");
        assert!(options.builder_allow_reset());
        assert!(!options.optimize_states());
        assert_eq!(options.singleton_style(), SingletonStyle::Holder);
        assert_eq!(options.lock_name(), "$mutex");
        assert_eq!(config.out_dir.as_deref(), Some("out"));
    }

    #[test]
    fn test_invalid_identifier_rejected() {
        let err = parse_config(r#"{ "transformOptions": { "locks": { "lockName": "my lock" } } }"#).unwrap_err();
        assert!(matches!(err, OptionsError::InvalidIdentifier { option: "locks.lockName", .. }));
    }

    #[test]
    fn test_singleton_style_from_constant() {
        assert_eq!(SingletonStyle::from_constant("Singleton.Style.HOLDER"), Some(SingletonStyle::Holder));
        assert_eq!(SingletonStyle::from_constant("ENUM"), Some(SingletonStyle::Enum));
        assert_eq!(SingletonStyle::from_constant("LAZY"), None);
    }

    #[test]
    fn test_find_config_searches_ancestors() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        assert!(find_config(&nested).is_none() || !find_config(&nested).unwrap().starts_with(dir.path()));
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{}").unwrap();
        assert_eq!(find_config(&nested), Some(dir.path().join(CONFIG_FILE_NAME)));
        assert!(parse_config_file(&dir.path().join(CONFIG_FILE_NAME)).is_ok());
    }
}
