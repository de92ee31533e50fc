//! Preflight checks.
//!
//! Validates that the host has the download and unpack tools before any
//! step runs. Lookups use the `PATH` captured at startup, and names with a
//! path separator resolve against the install working directory.
//!
//! # Example
//!
//! ```rust
//! use std::path::Path;
//! use ghc_wasm_setup::config::InheritedEnv;
//! use ghc_wasm_setup::preflight::{check_required_tools, command_exists};
//!
//! let env = InheritedEnv::from_process();
//! let workdir = Path::new(".");
//! if !command_exists(&env, workdir, "xz") {
//!     println!("xz-utils not installed");
//! }
//!
//! let tools = &[("curl", "curl"), ("unzip", "unzip")];
//! if let Err(e) = check_required_tools(&env, workdir, tools) {
//!     eprintln!("{}", e);
//! }
//! ```

use anyhow::{bail, Result};
use std::path::Path;

use crate::config::InheritedEnv;

/// Check if a command exists on the inherited `PATH`.
pub fn command_exists(env: &InheritedEnv, cwd: &Path, cmd: &str) -> bool {
    let Some(path) = env.path() else {
        return false;
    };
    which::which_in(cmd, Some(path), cwd).is_ok()
}

/// Host tools every install needs.
///
/// Each tuple is (command_name, package_name).
pub const REQUIRED_TOOLS: &[(&str, &str)] = &[
    ("curl", "curl"),
    ("unzip", "unzip"),
    ("tar", "tar"),
    ("xz", "xz-utils"),
];

/// Check that specific tools are available.
///
/// Fails with the list of missing tools and their packages.
pub fn check_required_tools(
    env: &InheritedEnv,
    cwd: &Path,
    tools: &[(&str, &str)],
) -> Result<()> {
    let mut missing = Vec::new();

    for (tool, package) in tools {
        if !command_exists(env, cwd, tool) {
            missing.push((*tool, *package));
        }
    }

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|(t, p)| format!("  {} (install: {})", t, p))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Missing required host tools:\n{}", msg);
    }

    Ok(())
}

/// Check every tool in [`REQUIRED_TOOLS`].
pub fn check_host_tools(env: &InheritedEnv, cwd: &Path) -> Result<()> {
    check_required_tools(env, cwd, REQUIRED_TOOLS)
}
