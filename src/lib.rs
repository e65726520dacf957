//! releng-plan - build-action pipeline resolution
//!
//! Release-engineering build variants are described by declarative
//! configuration: an ordered `default_actions` list, environment sections,
//! repository lists and executable paths, with `%(name)s` placeholders
//! filled in by the runner. This crate loads that configuration and
//! resolves it into the concrete ordered list of actions to run, each with
//! its fully rendered environment.
//!
//! It never runs anything: cloning, building, uploading and signing belong
//! to the external runner that consumes the plan.

pub mod action;
pub mod config;
pub mod context;
pub mod env;
pub mod repos;
pub mod resolver;

pub use action::{Action, ActionError, ActionInsert, ActionOverrides, ActionRegistry, Placement};
pub use config::{BuildConfig, ConfigError, ConfigLoader, LoadedConfig, RepoDescriptor};
pub use context::RuntimeContext;
pub use env::EnvSection;
pub use releng_template::{Context, Template, TemplateError};
pub use repos::resolve_repos;
pub use resolver::{
    missing_placeholders, resolve, resolve_exes, ResolveError, ResolvedAction, ResolvedPlan,
    Resolver, Unresolved,
};
