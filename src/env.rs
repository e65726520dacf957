//! Per-action environment
//!
//! Every action runs with the base `env` section. Some actions also pull in
//! a dedicated section: uploads get `upload_env`, `check-test` gets
//! `check_test_env`. Sections are overlaid in order and later ones win on
//! key collision. A configuration may rebind an action's extra sections via
//! `action_env`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use releng_template::Context;

use crate::action::Action;
use crate::config::BuildConfig;
use crate::resolver::{render_value, ResolveError};

/// Actions that receive `upload_env` by default.
const UPLOAD_ACTIONS: &[&str] = &["upload-files", "upload", "taskcluster-upload"];

/// Actions that receive `check_test_env` by default.
const CHECK_TEST_ACTIONS: &[&str] = &["check-test"];

/// A named environment mapping in the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EnvSection {
    #[serde(rename = "env")]
    Build,
    #[serde(rename = "upload_env")]
    Upload,
    #[serde(rename = "check_test_env")]
    CheckTest,
}

impl EnvSection {
    pub const ALL: [EnvSection; 3] = [EnvSection::Build, EnvSection::Upload, EnvSection::CheckTest];

    /// The configuration key for this section
    pub fn key(&self) -> &'static str {
        match self {
            EnvSection::Build => "env",
            EnvSection::Upload => "upload_env",
            EnvSection::CheckTest => "check_test_env",
        }
    }
}

impl fmt::Display for EnvSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Sections an action runs with, in overlay order
///
/// `Build` is always first and never repeated.
pub fn sections_for(config: &BuildConfig, action: &Action) -> Vec<EnvSection> {
    let mut sections = vec![EnvSection::Build];

    let extra: Vec<EnvSection> = match config.action_env.get(action) {
        Some(bound) => bound.clone(),
        None => default_extra_sections(action).to_vec(),
    };

    for section in extra {
        if !sections.contains(&section) {
            sections.push(section);
        }
    }
    sections
}

fn default_extra_sections(action: &Action) -> &'static [EnvSection] {
    if UPLOAD_ACTIONS.contains(&action.as_str()) {
        &[EnvSection::Upload]
    } else if CHECK_TEST_ACTIONS.contains(&action.as_str()) {
        &[EnvSection::CheckTest]
    } else {
        &[]
    }
}

/// Overlay sections without rendering
///
/// Each entry remembers which section supplied the winning value so
/// rendering errors can name the right key.
pub fn merge_env<'a>(
    config: &'a BuildConfig,
    sections: &[EnvSection],
) -> BTreeMap<&'a str, (EnvSection, &'a str)> {
    let mut merged = BTreeMap::new();
    for &section in sections {
        for (key, value) in config.section(section) {
            merged.insert(key.as_str(), (section, value.as_str()));
        }
    }
    merged
}

/// Overlay sections and render every value against the context
pub fn render_env(
    config: &BuildConfig,
    sections: &[EnvSection],
    context: &Context,
) -> Result<BTreeMap<String, String>, ResolveError> {
    merge_env(config, sections)
        .into_iter()
        .map(|(key, (section, raw))| {
            let path = format!("{}.{}", section.key(), key);
            render_value(&path, raw, context).map(|v| (key.to_string(), v))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(name: &str) -> Action {
        Action::new(name).unwrap()
    }

    fn config() -> BuildConfig {
        BuildConfig::from_toml_str(
            r#"
            default_actions = ["build", "upload-files", "check-test"]
            [env]
            A = "1"
            MOZ_OBJDIR = "%(abs_obj_dir)s"
            SHARED = "from-env"
            [upload_env]
            UPLOAD_HOST = "localhost"
            SHARED = "from-upload"
            [check_test_env]
            B = "2"
            MINIDUMP_SAVE_PATH = "%(abs_work_dir)s/public/build"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_default_sections() {
        let cfg = config();
        assert_eq!(sections_for(&cfg, &a("build")), vec![EnvSection::Build]);
        assert_eq!(
            sections_for(&cfg, &a("upload-files")),
            vec![EnvSection::Build, EnvSection::Upload]
        );
        assert_eq!(
            sections_for(&cfg, &a("taskcluster-upload")),
            vec![EnvSection::Build, EnvSection::Upload]
        );
        assert_eq!(
            sections_for(&cfg, &a("check-test")),
            vec![EnvSection::Build, EnvSection::CheckTest]
        );
    }

    #[test]
    fn test_action_env_rebinds() {
        let mut cfg = config();
        cfg.action_env
            .insert(a("package"), vec![EnvSection::Upload, EnvSection::Build]);
        cfg.action_env.insert(a("check-test"), vec![]);

        assert_eq!(
            sections_for(&cfg, &a("package")),
            vec![EnvSection::Build, EnvSection::Upload]
        );
        assert_eq!(sections_for(&cfg, &a("check-test")), vec![EnvSection::Build]);
    }

    #[test]
    fn test_later_section_wins() {
        let cfg = config();
        let merged = merge_env(&cfg, &[EnvSection::Build, EnvSection::Upload]);
        assert_eq!(merged["SHARED"], (EnvSection::Upload, "from-upload"));
        assert_eq!(merged["A"], (EnvSection::Build, "1"));
    }

    #[test]
    fn test_render_check_test_env() {
        let mut cfg = BuildConfig::default();
        cfg.env.insert("A".to_string(), "1".to_string());
        cfg.check_test_env.insert("B".to_string(), "2".to_string());

        let env = render_env(
            &cfg,
            &sections_for(&cfg, &a("check-test")),
            &Context::new(),
        )
        .unwrap();

        let expected: BTreeMap<String, String> = [("A", "1"), ("B", "2")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(env, expected);
    }

    #[test]
    fn test_render_reports_section_key() {
        let cfg = config();
        let ctx = Context::new().with("abs_obj_dir", "/builds/obj");

        let err = render_env(
            &cfg,
            &[EnvSection::Build, EnvSection::CheckTest],
            &ctx,
        )
        .unwrap_err();

        assert_eq!(
            err,
            ResolveError::MissingContextKey {
                key: "check_test_env.MINIDUMP_SAVE_PATH".to_string(),
                token: "abs_work_dir".to_string(),
            }
        );
    }

    #[test]
    fn test_section_serde_names() {
        let json = serde_json::to_string(&EnvSection::ALL).unwrap();
        assert_eq!(json, r#"["env","upload_env","check_test_env"]"#);
        assert_eq!(EnvSection::CheckTest.to_string(), "check_test_env");
    }
}
