//! Installer configuration.
//!
//! [`InstallConfig`] is built once at startup and handed by reference to
//! every step. Values come from, in order of precedence:
//!
//! 1. command-line flags and their environment variables (`PREFIX`,
//!    `FLAVOUR`, `UPSTREAM_WASI_SDK_PIPELINE_ID`, ...), collected into
//!    [`Overrides`] by the CLI;
//! 2. an optional `ghc-wasm-setup.toml` in the working directory;
//! 3. built-in defaults.
//!
//! The invoking environment (`PATH` and flag overrides such as
//! `CONF_CC_OPTS_STAGE2`) is snapshotted into [`InheritedEnv`] so later
//! steps never read process globals.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::host::DEFAULT_FLAVOUR;

/// Config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "ghc-wasm-setup.toml";

/// Default curl `--retry` count.
pub const DEFAULT_RETRIES: u32 = 5;

/// Install prefix relative to `$HOME` when none is configured.
pub const DEFAULT_PREFIX_DIR: &str = ".ghc-wasm";

/// Network retrieval knobs passed through to curl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    pub retries: u32,
    pub connect_timeout: Option<Duration>,
    pub max_time: Option<Duration>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            connect_timeout: None,
            max_time: None,
        }
    }
}

/// Snapshot of the environment the installer was started from.
#[derive(Debug, Clone, Default)]
pub struct InheritedEnv {
    path: Option<OsString>,
    vars: BTreeMap<String, String>,
}

impl InheritedEnv {
    /// Capture the current process environment.
    pub fn from_process() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self {
            path: std::env::var_os("PATH"),
            vars,
        }
    }

    /// Build a snapshot from explicit values.
    pub fn from_pairs<I, K, V>(path: Option<OsString>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            path,
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn path(&self) -> Option<&OsString> {
        self.path.as_ref()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

/// Values supplied on the command line or through environment variables.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub prefix: Option<PathBuf>,
    pub flavour: Option<String>,
    pub upstream_wasi_sdk_pipeline_id: Option<String>,
    pub workdir: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub retries: Option<u32>,
    pub connect_timeout_secs: Option<u64>,
    pub skip_ghc: bool,
}

/// Immutable configuration for one installer run.
#[derive(Debug, Clone)]
pub struct InstallConfig {
    /// Root of everything installed (`$HOME/.ghc-wasm` by default).
    pub prefix: PathBuf,
    /// Directory holding `autogen.json` and the cabal config templates.
    /// Downloads that are not installed into the prefix land here too.
    pub workdir: PathBuf,
    pub flavour: String,
    pub upstream_wasi_sdk_pipeline_id: Option<String>,
    pub fetch: FetchOptions,
    pub skip_ghc: bool,
    pub inherited: InheritedEnv,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    #[serde(default)]
    install: InstallToml,
    #[serde(default)]
    fetch: FetchToml,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct InstallToml {
    prefix: Option<PathBuf>,
    flavour: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FetchToml {
    retries: Option<u32>,
    connect_timeout_secs: Option<u64>,
    max_time_secs: Option<u64>,
}

impl InstallConfig {
    /// Merge overrides, the optional config file and defaults.
    pub fn resolve(overrides: Overrides, inherited: InheritedEnv) -> Result<Self> {
        let cwd = std::env::current_dir().context("resolving current directory")?;
        let home = dirs::home_dir();
        Self::resolve_from(overrides, inherited, &cwd, home.as_deref())
    }

    fn resolve_from(
        overrides: Overrides,
        inherited: InheritedEnv,
        cwd: &Path,
        home: Option<&Path>,
    ) -> Result<Self> {
        let workdir = absolutize(cwd, overrides.workdir.unwrap_or_else(|| cwd.to_path_buf()));

        let file = match overrides.config_file {
            Some(path) => {
                let path = absolutize(cwd, path);
                if !path.is_file() {
                    bail!("config file not found: {}", path.display());
                }
                load_config_file(&path)?
            }
            None => {
                let path = workdir.join(CONFIG_FILE_NAME);
                if path.is_file() {
                    load_config_file(&path)?
                } else {
                    ConfigToml::default()
                }
            }
        };

        let prefix = match overrides.prefix.or(file.install.prefix) {
            Some(prefix) => absolutize(cwd, prefix),
            None => {
                let Some(home) = home else {
                    bail!("cannot determine home directory; set PREFIX or pass --prefix");
                };
                home.join(DEFAULT_PREFIX_DIR)
            }
        };

        let flavour = overrides
            .flavour
            .or(file.install.flavour)
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| DEFAULT_FLAVOUR.to_string());

        let fetch = FetchOptions {
            retries: overrides
                .retries
                .or(file.fetch.retries)
                .unwrap_or(DEFAULT_RETRIES),
            connect_timeout: overrides
                .connect_timeout_secs
                .or(file.fetch.connect_timeout_secs)
                .map(Duration::from_secs),
            max_time: file.fetch.max_time_secs.map(Duration::from_secs),
        };

        Ok(Self {
            prefix,
            workdir,
            flavour,
            upstream_wasi_sdk_pipeline_id: overrides
                .upstream_wasi_sdk_pipeline_id
                .filter(|id| !id.trim().is_empty()),
            fetch,
            skip_ghc: overrides.skip_ghc,
            inherited,
        })
    }
}

fn load_config_file(path: &Path) -> Result<ConfigToml> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading installer config '{}'", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing installer config '{}'", path.display()))
}

fn absolutize(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
