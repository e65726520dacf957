//! Action-pipeline resolver
//!
//! Turns a configuration, a runtime context and optional overrides into
//! the ordered list of actions to run, each paired with its fully rendered
//! environment. Resolution is a pure function of its inputs: the same
//! inputs always yield the same plan and the same digest.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use releng_template::{Context, Template, TemplateError};

use crate::action::{Action, ActionError, ActionOverrides, ActionRegistry};
use crate::config::BuildConfig;
use crate::env::{render_env, sections_for, EnvSection};

/// Resolution errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("missing required configuration key '{0}'")]
    MissingKey(String),

    #[error("{key}: no context value for placeholder '%({token})s'")]
    MissingContextKey { key: String, token: String },

    #[error("{key}: {reason}")]
    Malformed { key: String, reason: String },

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("invalid action name '{0}'")]
    InvalidAction(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<ActionError> for ResolveError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::UnknownAction(name) => ResolveError::UnknownAction(name),
            ActionError::InvalidName(name) => ResolveError::InvalidAction(name),
        }
    }
}

/// Render one configuration value, attributing failures to `key`
pub(crate) fn render_value(
    key: &str,
    raw: &str,
    context: &Context,
) -> Result<String, ResolveError> {
    releng_template::render(raw, context).map_err(|e| attribute(key, e))
}

fn attribute(key: &str, err: TemplateError) -> ResolveError {
    match err {
        TemplateError::MissingContextKey { token } => ResolveError::MissingContextKey {
            key: key.to_string(),
            token,
        },
        err @ TemplateError::Malformed { .. } => ResolveError::Malformed {
            key: key.to_string(),
            reason: err.to_string(),
        },
    }
}

/// One scheduled action and the environment it runs with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAction {
    pub action: Action,

    /// Sections overlaid to build `env`, in order
    pub sections: Vec<EnvSection>,

    pub env: BTreeMap<String, String>,
}

/// The ordered result of resolution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPlan {
    pub steps: Vec<ResolvedAction>,
}

impl ResolvedPlan {
    /// Action names in execution order
    pub fn actions(&self) -> Vec<&Action> {
        self.steps.iter().map(|s| &s.action).collect()
    }

    /// Look up the step for an action
    pub fn step(&self, action: &Action) -> Option<&ResolvedAction> {
        self.steps.iter().find(|s| &s.action == action)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// SHA-256 hex digest of the RFC 8785 canonical JSON of this plan
    pub fn digest(&self) -> Result<String, ResolveError> {
        let jcs_bytes = serde_json_canonicalizer::to_vec(self)
            .map_err(|e| ResolveError::Serialization(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(&jcs_bytes);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Serialize to JSON (pretty printed)
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Resolver with an optional registry of known actions
///
/// Without a registry no action name is rejected; with one, every scheduled
/// action and every action an override mentions must be registered.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    registry: Option<ActionRegistry>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(mut self, registry: ActionRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Enforce the configuration's own `all_actions`, when present
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            registry: config.registry(),
        }
    }

    pub fn registry(&self) -> Option<&ActionRegistry> {
        self.registry.as_ref()
    }

    /// Resolve the plan
    pub fn resolve(
        &self,
        config: &BuildConfig,
        context: &Context,
        overrides: Option<&ActionOverrides>,
    ) -> Result<ResolvedPlan, ResolveError> {
        let defaults = config
            .default_actions
            .as_ref()
            .ok_or_else(|| ResolveError::MissingKey("default_actions".to_string()))?;

        if let Some(registry) = &self.registry {
            defaults.iter().try_for_each(|a| registry.check(a))?;
            if let Some(overrides) = overrides {
                overrides.validate(registry)?;
            }
        }

        let actions = match overrides {
            Some(overrides) => overrides.apply(defaults)?,
            None => ActionOverrides::default().apply(defaults)?,
        };

        tracing::debug!(
            actions = ?actions.iter().map(Action::as_str).collect::<Vec<_>>(),
            "scheduled actions"
        );

        let steps = actions
            .into_iter()
            .map(|action| -> Result<ResolvedAction, ResolveError> {
                let sections = sections_for(config, &action);
                let env = render_env(config, &sections, context)?;
                tracing::debug!(
                    action = %action,
                    sections = ?sections,
                    vars = env.len(),
                    "resolved action environment"
                );
                Ok(ResolvedAction {
                    action,
                    sections,
                    env,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ResolvedPlan { steps })
    }
}

/// Resolve without a registry
pub fn resolve(
    config: &BuildConfig,
    context: &Context,
    overrides: Option<&ActionOverrides>,
) -> Result<ResolvedPlan, ResolveError> {
    Resolver::new().resolve(config, context, overrides)
}

/// Render every `exes` entry into an argv prefix
pub fn resolve_exes(
    config: &BuildConfig,
    context: &Context,
) -> Result<BTreeMap<String, Vec<String>>, ResolveError> {
    config
        .exes
        .iter()
        .map(|(name, exe)| {
            exe.render(context)
                .map(|argv| (name.clone(), argv))
                .map_err(|e| attribute(&format!("exes.{}", name), e))
        })
        .collect()
}

/// A placeholder the context cannot fill
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unresolved {
    /// Key path of the value holding the placeholder
    pub key: String,
    pub token: String,
}

/// Scan every templated value for placeholders the context lacks
///
/// Unlike [`resolve`] this does not stop at the first gap, and it covers
/// sections and keys no scheduled action touches.
pub fn missing_placeholders(
    config: &BuildConfig,
    context: &Context,
) -> Result<Vec<Unresolved>, ResolveError> {
    let mut missing = Vec::new();
    for (key, raw) in config.templated_values() {
        let template = Template::parse(raw).map_err(|e| attribute(&key, e))?;
        for token in template.placeholders() {
            if !context.contains(token) {
                missing.push(Unresolved {
                    key: key.clone(),
                    token: token.to_string(),
                });
            }
        }
    }
    Ok(missing)
}
