//! Typed build configuration
//!
//! One struct field per known section. Keys the resolver does not interpret
//! (credentials, tooltool settings, timeouts, ...) are kept verbatim in
//! `extra` so that loading never drops data.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use releng_template::{Context, TemplateError};

use super::loader::{toml_to_json, ConfigError};
use crate::action::{Action, ActionRegistry};
use crate::env::EnvSection;

/// A source-control repository to check out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoDescriptor {
    /// Version control system (e.g., "hg", "git")
    pub vcs: String,

    /// Repository URL
    pub repo: String,

    /// Branch or revision to check out; may hold `%(revision)s`
    pub branch: String,

    /// Local checkout path
    pub dest: String,

    /// Upstream to seed a shared clone from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone_upstream_url: Option<String>,
}

/// An executable entry under `exes`
///
/// Either a single path or a full argv prefix (interpreter plus script).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Exe {
    Path(String),
    Argv(Vec<String>),
}

impl Exe {
    pub fn parts(&self) -> Vec<&str> {
        match self {
            Exe::Path(p) => vec![p.as_str()],
            Exe::Argv(argv) => argv.iter().map(String::as_str).collect(),
        }
    }

    /// Render every part against a context
    pub fn render(&self, context: &Context) -> Result<Vec<String>, TemplateError> {
        self.parts()
            .into_iter()
            .map(|p| releng_template::render(p, context))
            .collect()
    }
}

/// Configuration for one build variant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Ordered actions to run; required at resolution time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_actions: Option<Vec<Action>>,

    /// Every action the runner knows; used as registry in strict mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_actions: Option<Vec<Action>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub upload_env: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub check_test_env: BTreeMap<String, String>,

    /// Explicit action to env-section bindings, replacing the built-in ones
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub action_env: BTreeMap<Action, Vec<EnvSection>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub exes: BTreeMap<String, Exe>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repos: Vec<RepoDescriptor>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_platform: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mozconfig_variant: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mozconfig_platform: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_type: Option<String>,

    /// Display name; usually carries `%(branch)s`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_ini_path: Option<String>,

    /// Everything else, uninterpreted
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl BuildConfig {
    /// Parse from a TOML string
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let value: toml::Value =
            toml::from_str(s).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Self::from_value(toml_to_json(value))
    }

    /// Parse from a JSON string
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let value: Value =
            serde_json::from_str(s).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Self::from_value(value)
    }

    /// Build from an already-merged JSON value
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Load a single file; format chosen by extension
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;
        match super::loader::Format::from_path(path)? {
            super::loader::Format::Toml => Self::from_toml_str(&contents),
            super::loader::Format::Json => Self::from_json_str(&contents),
        }
    }

    /// Registry built from `all_actions`, if the configuration declares one
    pub fn registry(&self) -> Option<ActionRegistry> {
        self.all_actions
            .as_ref()
            .map(|all| all.iter().collect())
    }

    /// The mapping behind an env section
    pub fn section(&self, section: EnvSection) -> &BTreeMap<String, String> {
        match section {
            EnvSection::Build => &self.env,
            EnvSection::Upload => &self.upload_env,
            EnvSection::CheckTest => &self.check_test_env,
        }
    }

    /// Every string value that may carry placeholders, with its key path
    ///
    /// Covers env sections, repos, exes and the templated scalar keys.
    pub fn templated_values(&self) -> Vec<(String, &str)> {
        let mut values = Vec::new();

        for section in EnvSection::ALL {
            for (k, v) in self.section(section) {
                values.push((format!("{}.{}", section.key(), k), v.as_str()));
            }
        }

        for (i, repo) in self.repos.iter().enumerate() {
            values.push((format!("repos[{}].repo", i), repo.repo.as_str()));
            values.push((format!("repos[{}].branch", i), repo.branch.as_str()));
            values.push((format!("repos[{}].dest", i), repo.dest.as_str()));
            if let Some(ref upstream) = repo.clone_upstream_url {
                values.push((
                    format!("repos[{}].clone_upstream_url", i),
                    upstream.as_str(),
                ));
            }
        }

        for (name, exe) in &self.exes {
            for (i, part) in exe.parts().into_iter().enumerate() {
                values.push((format!("exes.{}[{}]", name, i), part));
            }
        }

        for (key, value) in [
            ("base_name", &self.base_name),
            ("app_ini_path", &self.app_ini_path),
        ] {
            if let Some(v) = value {
                values.push((key.to_string(), v.as_str()));
            }
        }

        values
    }
}
