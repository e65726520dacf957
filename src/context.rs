//! Runtime context for placeholder substitution
//!
//! The runner knows where it is working and what it is building; the
//! resolver does not look any of it up. `RuntimeContext` turns those inputs
//! into the standard substitution names:
//!
//! | input       | names                          |
//! |-------------|--------------------------------|
//! | `work_dir`  | `abs_work_dir`                 |
//! | `obj_dir`   | `obj_dir`, `abs_obj_dir`       |
//! | `tools_dir` | `abs_tools_dir`                |
//! | `branch`    | `branch`                       |
//! | `revision`  | `revision`                     |
//!
//! Relative `obj_dir`/`tools_dir` are joined onto `work_dir`. When no work
//! dir is known the `abs_*` name is left unset so that any use of it fails
//! resolution instead of producing a relative path.

use std::path::{Path, PathBuf};

use releng_template::Context;

/// Standard runner inputs plus free-form values
#[derive(Debug, Clone, Default)]
pub struct RuntimeContext {
    work_dir: Option<PathBuf>,
    obj_dir: Option<PathBuf>,
    tools_dir: Option<PathBuf>,
    branch: Option<String>,
    revision: Option<String>,
    values: Context,
}

impl RuntimeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn work_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(path.into());
        self
    }

    pub fn obj_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.obj_dir = Some(path.into());
        self
    }

    pub fn tools_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.tools_dir = Some(path.into());
        self
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    /// Set an arbitrary value; these win over derived names
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name, value);
        self
    }

    fn absolute(&self, path: &Path) -> Option<PathBuf> {
        if path.is_absolute() {
            Some(path.to_path_buf())
        } else {
            self.work_dir.as_ref().map(|w| w.join(path))
        }
    }

    /// Build the substitution context
    pub fn to_context(&self) -> Context {
        let mut ctx = Context::new();

        if let Some(ref work) = self.work_dir {
            ctx.insert("abs_work_dir", path_string(work));
        }
        if let Some(ref obj) = self.obj_dir {
            ctx.insert("obj_dir", path_string(obj));
            if let Some(abs) = self.absolute(obj) {
                ctx.insert("abs_obj_dir", path_string(&abs));
            }
        }
        if let Some(abs) = self.tools_dir.as_deref().and_then(|t| self.absolute(t)) {
            ctx.insert("abs_tools_dir", path_string(&abs));
        }
        if let Some(ref branch) = self.branch {
            ctx.insert("branch", branch.clone());
        }
        if let Some(ref revision) = self.revision {
            ctx.insert("revision", revision.clone());
        }

        ctx.extend(self.values.clone());
        ctx
    }
}

impl From<RuntimeContext> for Context {
    fn from(runtime: RuntimeContext) -> Self {
        runtime.to_context()
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
