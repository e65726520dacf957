//! Layered configuration loading with provenance
//!
//! A build variant is usually described by a shared base file plus a small
//! per-platform overlay. Layers are merged in order (see [`super::merge`])
//! and the result is deserialized into a [`BuildConfig`]. Each contributing
//! layer is recorded with its path and a SHA-256 digest of its raw bytes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use super::merge::merge_layers;
use super::model::BuildConfig;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unsupported config format: {0} (expected .toml or .json)")]
    UnsupportedFormat(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// On-disk configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Json,
}

impl Format {
    /// Pick a format from the file extension
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(Format::Toml),
            Some("json") => Ok(Format::Json),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Where a layer came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    File,
    Inline,
}

/// A contributing layer with provenance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for inline layers)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the raw file bytes (None for inline layers)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

#[derive(Debug, Clone)]
enum Layer {
    File(PathBuf),
    Inline(Value),
}

/// Ordered list of configuration layers; later layers win
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    layers: Vec<Layer>,
}

/// A merged configuration and the layers it was built from
#[derive(Debug, Clone, Serialize)]
pub struct LoadedConfig {
    pub config: BuildConfig,

    /// Contributing layers in precedence order (lowest first)
    pub sources: Vec<ConfigSource>,

    pub loaded_at: DateTime<Utc>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file layer
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.layers.push(Layer::File(path.into()));
        self
    }

    /// Add several file layers in order
    pub fn files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.layers
            .extend(paths.into_iter().map(|p| Layer::File(p.into())));
        self
    }

    /// Add an in-memory layer
    pub fn value(mut self, value: Value) -> Self {
        self.layers.push(Layer::Inline(value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Read, merge and validate every layer
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let mut values = Vec::with_capacity(self.layers.len());
        let mut sources = Vec::with_capacity(self.layers.len());

        for layer in &self.layers {
            match layer {
                Layer::File(path) => {
                    let (value, digest) = load_file(path)?;
                    tracing::debug!(path = %path.display(), %digest, "loaded config layer");
                    values.push(value);
                    sources.push(ConfigSource {
                        origin: ConfigOrigin::File,
                        path: Some(path.to_string_lossy().to_string()),
                        digest: Some(digest),
                    });
                }
                Layer::Inline(value) => {
                    values.push(value.clone());
                    sources.push(ConfigSource {
                        origin: ConfigOrigin::Inline,
                        path: None,
                        digest: None,
                    });
                }
            }
        }

        let merged = merge_layers(values);
        let config = BuildConfig::from_value(merged)?;

        Ok(LoadedConfig {
            config,
            sources,
            loaded_at: Utc::now(),
        })
    }
}

/// Load and parse one file, returning the value and digest
fn load_file(path: &Path) -> Result<(Value, String), ConfigError> {
    let format = Format::from_path(path)?;
    let bytes =
        fs::read(path).map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());

    let contents = String::from_utf8(bytes).map_err(|e| {
        ConfigError::ParseError(format!("{}: invalid UTF-8: {}", path.display(), e))
    })?;

    let value = match format {
        Format::Toml => {
            let toml_value: toml::Value = toml::from_str(&contents).map_err(|e| {
                ConfigError::ParseError(format!("{}: {}", path.display(), e))
            })?;
            toml_to_json(toml_value)
        }
        Format::Json => serde_json::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?,
    };

    if !value.is_object() {
        return Err(ConfigError::ValidationError(format!(
            "{}: top level must be a table",
            path.display()
        )));
    }

    Ok((value, digest))
}

/// Convert a TOML value into the JSON model used for merging
pub(crate) fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use std::io::Write;
    use tempfile::Builder;

    fn temp_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_single_toml_layer() {
        let base = temp_file(
            ".toml",
            r#"
            default_actions = ["clobber", "build"]
            [env]
            TINDERBOX_OUTPUT = "1"
            "#,
        );

        let loaded = ConfigLoader::new().file(base.path()).load().unwrap();

        assert_eq!(loaded.sources.len(), 1);
        assert_eq!(loaded.sources[0].origin, ConfigOrigin::File);
        assert_eq!(loaded.sources[0].digest.as_ref().unwrap().len(), 64);
        assert_eq!(loaded.config.env["TINDERBOX_OUTPUT"], "1");
    }

    #[test]
    fn test_overlay_replaces_actions_and_merges_env() {
        let base = temp_file(
            ".toml",
            r#"
            default_actions = ["clobber", "clone-tools", "build", "check-test"]
            [env]
            MOZ_OBJDIR = "%(abs_obj_dir)s"
            TOOLTOOL_CACHE = "c:/builds/tooltool_cache"
            "#,
        );
        let overlay = temp_file(
            ".json",
            r#"{
                "default_actions": ["build"],
                "env": {"TOOLTOOL_CACHE": "/builds/tooltool_cache"}
            }"#,
        );

        let loaded = ConfigLoader::new()
            .files([base.path(), overlay.path()])
            .load()
            .unwrap();

        assert_eq!(
            loaded.config.default_actions,
            Some(vec![Action::new("build").unwrap()])
        );
        assert_eq!(loaded.config.env["MOZ_OBJDIR"], "%(abs_obj_dir)s");
        assert_eq!(loaded.config.env["TOOLTOOL_CACHE"], "/builds/tooltool_cache");
        assert_eq!(loaded.sources.len(), 2);
    }

    #[test]
    fn test_inline_layer_last_wins() {
        let base = temp_file(".toml", "branch = \"mozilla-central\"");

        let loaded = ConfigLoader::new()
            .file(base.path())
            .value(serde_json::json!({"branch": "mozilla-beta"}))
            .load()
            .unwrap();

        assert_eq!(loaded.config.branch.as_deref(), Some("mozilla-beta"));
        assert_eq!(loaded.sources[1].origin, ConfigOrigin::Inline);
        assert!(loaded.sources[1].path.is_none());
    }

    #[test]
    fn test_same_bytes_same_digest() {
        let a = temp_file(".toml", "platform = \"win64\"");
        let b = temp_file(".toml", "platform = \"win64\"");

        let loaded = ConfigLoader::new().file(a.path()).file(b.path()).load().unwrap();
        assert_eq!(loaded.sources[0].digest, loaded.sources[1].digest);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = temp_file(".py", "config = {}");
        let err = ConfigLoader::new().file(file.path()).load().unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::new()
            .file("/nonexistent/releng/config.toml")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn test_parse_error_names_file() {
        let file = temp_file(".toml", "default_actions = [");
        let err = ConfigLoader::new().file(file.path()).load().unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn test_json_top_level_must_be_table() {
        let file = temp_file(".json", "[1, 2, 3]");
        let err = ConfigLoader::new().file(file.path()).load().unwrap_err();
        assert!(err.to_string().contains("top level must be a table"));
    }

    #[test]
    fn test_empty_loader_gives_empty_config() {
        let loaded = ConfigLoader::new().load().unwrap();
        assert_eq!(loaded.config, BuildConfig::default());
        assert!(loaded.sources.is_empty());
    }
}
