//! Build actions
//!
//! An action is an opaque name for a unit of work the external runner knows
//! how to perform (`clobber`, `build`, `check-test`, ...). This module owns
//! name validation, the optional registry of known actions, and the override
//! layer applied on top of `default_actions`.

mod overrides;

pub use overrides::{ActionInsert, ActionOverrides, Placement};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex_lite::Regex;

/// Action errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("invalid action name '{0}': expected lowercase letters, digits, '-' or '_'")]
    InvalidName(String),

    #[error("unknown action '{0}'")]
    UnknownAction(String),
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("valid action name pattern"))
}

/// A named unit of build/release work
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Action(String);

impl Action {
    /// Create an action, validating the name
    pub fn new(name: impl Into<String>) -> Result<Self, ActionError> {
        let name = name.into();
        if !name_pattern().is_match(&name) {
            return Err(ActionError::InvalidName(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Action {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Action {
    type Error = ActionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.0
    }
}

impl AsRef<str> for Action {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Action {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Action {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Set of actions a runner recognizes
///
/// Enforcement is the caller's choice: the resolver only consults a registry
/// when one is supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionRegistry {
    known: BTreeSet<Action>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action
    pub fn register(&mut self, action: Action) -> bool {
        self.known.insert(action)
    }

    pub fn contains(&self, action: &Action) -> bool {
        self.known.contains(action)
    }

    /// Fail with `UnknownAction` if the action is not registered
    pub fn check(&self, action: &Action) -> Result<(), ActionError> {
        if self.contains(action) {
            Ok(())
        } else {
            Err(ActionError::UnknownAction(action.to_string()))
        }
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.known.iter()
    }
}

impl FromIterator<Action> for ActionRegistry {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        Self {
            known: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<&'a Action> for ActionRegistry {
    fn from_iter<I: IntoIterator<Item = &'a Action>>(iter: I) -> Self {
        iter.into_iter().cloned().collect()
    }
}

/// Parse a list of names into actions
pub fn parse_actions<I, S>(names: I) -> Result<Vec<Action>, ActionError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Action::new).collect()
}
