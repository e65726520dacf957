//! Shared fixture paths for integration tests
//!
//! Configuration fixtures mirror real release-engineering variants: a shared
//! Windows base plus a 64 bit add-on-devel overlay, a standalone
//! buildbot-era variant, and a JSON single-locale repack config.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

pub fn config_path(name: &str) -> PathBuf {
    fixtures_dir().join("configs").join(name)
}

pub fn windows_base() -> PathBuf {
    config_path("windows_base.toml")
}

pub fn win64_addondevel() -> PathBuf {
    config_path("win64_addondevel.toml")
}

pub fn releng_win64_addondevel() -> PathBuf {
    config_path("releng_win64_addondevel.toml")
}

pub fn beta_devedition() -> PathBuf {
    config_path("beta_devedition.json")
}

pub fn nightly_overrides() -> PathBuf {
    fixtures_dir().join("overrides_nightly.toml")
}
