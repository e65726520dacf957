//! Override layer over `default_actions`
//!
//! Overrides never mutate the configured list; `apply` returns a new
//! sequence. Order of application:
//! 1. `default_actions`, first occurrence of each name kept
//! 2. `add` entries inserted in the order given, no duplicates
//! 3. `only`, when non-empty, restricts the sequence
//! 4. `skip` removes; it wins over `add` and `only`

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{Action, ActionError, ActionRegistry};

/// Where an added action goes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    #[default]
    Append,
    Before(Action),
    After(Action),
}

impl Placement {
    fn anchor(&self) -> Option<&Action> {
        match self {
            Placement::Append => None,
            Placement::Before(a) | Placement::After(a) => Some(a),
        }
    }
}

/// An action to add, with its placement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionInsert {
    pub action: Action,
    #[serde(default)]
    pub placement: Placement,
}

/// Actions to add, restrict to, or skip
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOverrides {
    #[serde(default)]
    pub only: Vec<Action>,

    #[serde(default)]
    pub add: Vec<ActionInsert>,

    #[serde(default)]
    pub skip: BTreeSet<Action>,
}

impl ActionOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip(mut self, action: Action) -> Self {
        self.skip.insert(action);
        self
    }

    /// Append an action after the configured ones
    pub fn add(self, action: Action) -> Self {
        self.add_at(action, Placement::Append)
    }

    pub fn add_before(self, action: Action, anchor: Action) -> Self {
        self.add_at(action, Placement::Before(anchor))
    }

    pub fn add_after(self, action: Action, anchor: Action) -> Self {
        self.add_at(action, Placement::After(anchor))
    }

    pub fn add_at(mut self, action: Action, placement: Placement) -> Self {
        self.add.push(ActionInsert { action, placement });
        self
    }

    pub fn only(mut self, action: Action) -> Self {
        if !self.only.contains(&action) {
            self.only.push(action);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.only.is_empty() && self.add.is_empty() && self.skip.is_empty()
    }

    /// Every action these overrides refer to, anchors included
    pub fn named_actions(&self) -> impl Iterator<Item = &Action> {
        self.only
            .iter()
            .chain(self.skip.iter())
            .chain(
                self.add
                    .iter()
                    .flat_map(|i| std::iter::once(&i.action).chain(i.placement.anchor())),
            )
    }

    /// Check every referenced action against a registry
    pub fn validate(&self, registry: &ActionRegistry) -> Result<(), ActionError> {
        self.named_actions().try_for_each(|a| registry.check(a))
    }

    /// Apply to a configured action list
    pub fn apply(&self, defaults: &[Action]) -> Result<Vec<Action>, ActionError> {
        let mut sequence: Vec<Action> = Vec::with_capacity(defaults.len() + self.add.len());
        for action in defaults {
            if !sequence.contains(action) {
                sequence.push(action.clone());
            }
        }

        for insert in &self.add {
            // Anchors must exist even when the insert itself is a no-op
            let pos = match &insert.placement {
                Placement::Append => sequence.len(),
                Placement::Before(anchor) => position(&sequence, anchor)?,
                Placement::After(anchor) => position(&sequence, anchor)? + 1,
            };
            if !sequence.contains(&insert.action) {
                sequence.insert(pos, insert.action.clone());
            }
        }

        if !self.only.is_empty() {
            sequence.retain(|a| self.only.contains(a));
            for action in &self.only {
                if !sequence.contains(action) {
                    sequence.push(action.clone());
                }
            }
        }

        sequence.retain(|a| !self.skip.contains(a));
        Ok(sequence)
    }
}

fn position(sequence: &[Action], anchor: &Action) -> Result<usize, ActionError> {
    sequence
        .iter()
        .position(|a| a == anchor)
        .ok_or_else(|| ActionError::UnknownAction(anchor.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::parse_actions;

    fn a(name: &str) -> Action {
        Action::new(name).unwrap()
    }

    fn names(actions: &[Action]) -> Vec<&str> {
        actions.iter().map(Action::as_str).collect()
    }

    fn defaults() -> Vec<Action> {
        parse_actions(["clobber", "build", "check-test"]).unwrap()
    }

    #[test]
    fn test_no_overrides_is_identity() {
        let result = ActionOverrides::new().apply(&defaults()).unwrap();
        assert_eq!(names(&result), vec!["clobber", "build", "check-test"]);
    }

    #[test]
    fn test_skip() {
        let result = ActionOverrides::new()
            .skip(a("check-test"))
            .apply(&defaults())
            .unwrap();
        assert_eq!(names(&result), vec!["clobber", "build"]);
    }

    #[test]
    fn test_skip_absent_is_noop() {
        let result = ActionOverrides::new()
            .skip(a("sendchange"))
            .apply(&defaults())
            .unwrap();
        assert_eq!(result, defaults());
    }

    #[test]
    fn test_add_appends() {
        let result = ActionOverrides::new()
            .add(a("upload-files"))
            .apply(&defaults())
            .unwrap();
        assert_eq!(
            names(&result),
            vec!["clobber", "build", "check-test", "upload-files"]
        );
    }

    #[test]
    fn test_add_before_and_after() {
        let result = ActionOverrides::new()
            .add_before(a("clone-tools"), a("build"))
            .add_after(a("upload-files"), a("build"))
            .apply(&defaults())
            .unwrap();
        assert_eq!(
            names(&result),
            vec!["clobber", "clone-tools", "build", "upload-files", "check-test"]
        );
    }

    #[test]
    fn test_add_anchor_may_be_previous_insert() {
        let result = ActionOverrides::new()
            .add(a("upload-files"))
            .add_before(a("package"), a("upload-files"))
            .apply(&defaults())
            .unwrap();
        assert_eq!(
            names(&result),
            vec!["clobber", "build", "check-test", "package", "upload-files"]
        );
    }

    #[test]
    fn test_add_existing_not_duplicated() {
        let result = ActionOverrides::new()
            .add(a("build"))
            .apply(&defaults())
            .unwrap();
        assert_eq!(result, defaults());
    }

    #[test]
    fn test_add_missing_anchor() {
        let err = ActionOverrides::new()
            .add_after(a("upload-files"), a("package"))
            .apply(&defaults())
            .unwrap_err();
        assert_eq!(err, ActionError::UnknownAction("package".to_string()));
    }

    #[test]
    fn test_add_scheduled_action_still_checks_anchor() {
        let err = ActionOverrides::new()
            .add_after(a("build"), a("chekc-test"))
            .apply(&defaults())
            .unwrap_err();
        assert_eq!(err, ActionError::UnknownAction("chekc-test".to_string()));

        let result = ActionOverrides::new()
            .add_before(a("build"), a("clobber"))
            .apply(&defaults())
            .unwrap();
        assert_eq!(result, defaults());
    }

    #[test]
    fn test_only_keeps_configured_order() {
        let result = ActionOverrides::new()
            .only(a("check-test"))
            .only(a("clobber"))
            .apply(&defaults())
            .unwrap();
        assert_eq!(names(&result), vec!["clobber", "check-test"]);
    }

    #[test]
    fn test_only_appends_unscheduled() {
        let result = ActionOverrides::new()
            .only(a("build"))
            .only(a("summary"))
            .apply(&defaults())
            .unwrap();
        assert_eq!(names(&result), vec!["build", "summary"]);
    }

    #[test]
    fn test_skip_wins_over_add() {
        let result = ActionOverrides::new()
            .add(a("upload-files"))
            .skip(a("upload-files"))
            .apply(&defaults())
            .unwrap();
        assert_eq!(names(&result), vec!["clobber", "build", "check-test"]);
    }

    #[test]
    fn test_duplicate_defaults_collapse() {
        let with_dup = parse_actions(["clobber", "build", "clobber"]).unwrap();
        let result = ActionOverrides::new().apply(&with_dup).unwrap();
        assert_eq!(names(&result), vec!["clobber", "build"]);
    }

    #[test]
    fn test_defaults_untouched() {
        let configured = defaults();
        let _ = ActionOverrides::new()
            .skip(a("build"))
            .apply(&configured)
            .unwrap();
        assert_eq!(names(&configured), vec!["clobber", "build", "check-test"]);
    }

    #[test]
    fn test_validate_against_registry() {
        let registry: ActionRegistry = defaults().into_iter().collect();

        assert!(ActionOverrides::new()
            .skip(a("build"))
            .validate(&registry)
            .is_ok());

        let err = ActionOverrides::new()
            .add_after(a("build"), a("setup-mock"))
            .validate(&registry)
            .unwrap_err();
        assert_eq!(err, ActionError::UnknownAction("setup-mock".to_string()));
    }

    #[test]
    fn test_deserialize_from_toml() {
        let overrides: ActionOverrides = toml::from_str(
            r#"
            skip = ["check-test"]

            [[add]]
            action = "upload-files"
            placement = { after = "build" }

            [[add]]
            action = "summary"
            "#,
        )
        .unwrap();

        assert!(overrides.skip.contains(&a("check-test")));
        assert_eq!(overrides.add[0].placement, Placement::After(a("build")));
        assert_eq!(overrides.add[1].placement, Placement::Append);

        let result = overrides.apply(&defaults()).unwrap();
        assert_eq!(
            names(&result),
            vec!["clobber", "build", "upload-files", "summary"]
        );
    }
}
