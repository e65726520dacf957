//! Repository descriptor resolution
//!
//! Descriptors are read once at load time and never mutated; resolution
//! returns rendered copies for the source-control collaborator.

use releng_template::Context;

use crate::config::{BuildConfig, RepoDescriptor};
use crate::resolver::{render_value, ResolveError};

/// Render every templated field of every repository
pub fn resolve_repos(
    config: &BuildConfig,
    context: &Context,
) -> Result<Vec<RepoDescriptor>, ResolveError> {
    config
        .repos
        .iter()
        .enumerate()
        .map(|(i, repo)| resolve_repo(i, repo, context))
        .collect()
}

fn resolve_repo(
    index: usize,
    repo: &RepoDescriptor,
    context: &Context,
) -> Result<RepoDescriptor, ResolveError> {
    let field = |name: &str, value: &str| {
        render_value(&format!("repos[{}].{}", index, name), value, context)
    };

    Ok(RepoDescriptor {
        vcs: repo.vcs.clone(),
        repo: field("repo", &repo.repo)?,
        branch: field("branch", &repo.branch)?,
        dest: field("dest", &repo.dest)?,
        clone_upstream_url: repo
            .clone_upstream_url
            .as_deref()
            .map(|url| field("clone_upstream_url", url))
            .transpose()?,
    })
}
