//! The `<prefix>/env` file.
//!
//! A POSIX-shell-sourceable file that puts the toolchain on `PATH` and
//! exports the resolved tool paths plus GHC's cross-compilation flags.
//! It is rewritten from scratch on every run.

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::InheritedEnv;
use crate::process::{quote_path, shell_quote};

const CC_OPTS: &str =
    "-Wno-error=int-conversion -O3 -mcpu=lime1 -mreference-types -msimd128 -mtail-call";
const CXX_OPTS: &str = "-fno-exceptions -Wno-error=int-conversion -O3 -mcpu=lime1 -mreference-types -msimd128 -mtail-call";
const LD_OPTS: &str = "-Wl,--error-limit=0,--keep-section=ghc_wasm_jsffi,--keep-section=target_features,--stack-first,--strip-debug ";

/// GHC configure flag variables and their defaults.
pub const COMPILER_FLAGS: [(&str, &str); 6] = [
    ("CONF_CC_OPTS_STAGE2", CC_OPTS),
    ("CONF_CXX_OPTS_STAGE2", CXX_OPTS),
    ("CONF_GCC_LINKER_OPTS_STAGE2", LD_OPTS),
    ("CONF_CC_OPTS_STAGE1", CC_OPTS),
    ("CONF_CXX_OPTS_STAGE1", CXX_OPTS),
    ("CONF_GCC_LINKER_OPTS_STAGE1", LD_OPTS),
];

/// Prepends to `PATH` only when missing; shells without `[[` always prepend.
const PREPEND_PATH_FN: &str = r#"prepend_path() {
if ! (eval '[[ 1 ]]' 2>/dev/null) || [[ ":$PATH:" != *":$1:"* ]]; then
  export PATH="$1:$PATH"
fi
}
"#;

/// Ordered variable name → value mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentRecord {
    entries: Vec<(String, String)>,
}

impl EnvironmentRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name`, replacing an earlier value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compiler flags with overrides from the invoking environment applied.
pub fn compiler_flags(inherited: &InheritedEnv) -> EnvironmentRecord {
    let mut flags = EnvironmentRecord::new();
    for (name, default) in COMPILER_FLAGS {
        flags.insert(name, inherited.get(name).unwrap_or(default));
    }
    flags
}

/// Everything that goes into the env file.
#[derive(Debug, Clone)]
pub struct EnvFile {
    /// Directories prepended to `PATH`, in file order.
    pub path_prepends: Vec<PathBuf>,
    /// Resolved tool paths.
    pub tools: EnvironmentRecord,
    /// Flag variables, already merged with overrides.
    pub flags: EnvironmentRecord,
}

impl EnvFile {
    pub fn render(&self) -> Result<String> {
        let mut out = String::from(PREPEND_PATH_FN);
        for dir in &self.path_prepends {
            writeln!(out, "prepend_path {}", quote_path(dir)?)?;
        }
        for (name, value) in self.tools.iter().chain(self.flags.iter()) {
            writeln!(out, "export {}={}", name, shell_quote(value)?)?;
        }
        Ok(out)
    }

    /// Render and overwrite `path`.
    pub fn write(&self, path: &Path) -> Result<()> {
        let contents = self.render()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating env file directory '{}'", parent.display()))?;
        }
        fs::write(path, contents)
            .with_context(|| format!("writing env file '{}'", path.display()))?;
        Ok(())
    }
}
