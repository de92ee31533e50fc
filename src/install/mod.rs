//! Toolchain installation pipeline.
//!
//! The steps run in a fixed order and every external command failure aborts
//! the run:
//!
//! 1. WASI SDK ([`sdk`])
//! 2. libffi-wasm, copied into the SDK sysroot on every run
//! 3. binaryen's `wasm-opt`
//! 4. compiler probe ([`compilers`]), aborting before any further side effect
//!    when something is missing
//! 5. `<prefix>/env` ([`crate::env_file`])
//! 6. GHC configure + install ([`ghc`]), unless skipped
//! 7. cabal and its wasm wrapper ([`cabal`])
//!
//! Download steps are gated on marker paths through a
//! [`FreshnessGate`]; nothing is rolled back when a step fails.

pub mod cabal;
pub mod compilers;
pub mod ghc;
pub mod layout;
pub mod sdk;

pub use compilers::CompilerReport;
pub use layout::InstallLayout;

use anyhow::Result;
use thiserror::Error;

use crate::config::InstallConfig;
use crate::env_file::{compiler_flags, EnvFile, EnvironmentRecord};
use crate::fetch::{ArtifactCatalog, Fetcher, CATALOG_FILE_NAME};
use crate::freshness::{FreshnessGate, HostFs, MarkerFs};
use crate::host::HostProfile;
use crate::process::CommandRunner;

/// Installer failures that are not external command errors.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("missing required executables: {}", .missing.join(", "))]
    MissingTools { missing: Vec<String> },

    #[error(
        "No prebuilt GHC wasm bindist with flavour \"{flavour}\" on {host}. \
         You can still skip GHC and complete the setup."
    )]
    UnsupportedFlavour { flavour: String, host: String },
}

/// Runs the pipeline for one configuration and host.
pub struct Installer<'a, F = HostFs> {
    config: &'a InstallConfig,
    profile: &'a HostProfile,
    layout: InstallLayout,
    catalog: ArtifactCatalog,
    runner: &'a dyn CommandRunner,
    gate: FreshnessGate<F>,
}

impl<'a> Installer<'a, HostFs> {
    /// Load the artifact catalog from the working directory.
    pub fn new(
        config: &'a InstallConfig,
        profile: &'a HostProfile,
        runner: &'a dyn CommandRunner,
    ) -> Result<Self> {
        let catalog = ArtifactCatalog::load(&config.workdir.join(CATALOG_FILE_NAME))?;
        Ok(Self::with_catalog(config, profile, runner, catalog))
    }

    pub fn with_catalog(
        config: &'a InstallConfig,
        profile: &'a HostProfile,
        runner: &'a dyn CommandRunner,
        catalog: ArtifactCatalog,
    ) -> Self {
        Self {
            config,
            profile,
            layout: InstallLayout::new(&config.prefix, &config.workdir, profile.flavour.name()),
            catalog,
            runner,
            gate: FreshnessGate::default(),
        }
    }
}

impl<'a, F: MarkerFs> Installer<'a, F> {
    /// Swap the marker lookup, e.g. for an in-memory set.
    pub fn with_markers<G: MarkerFs>(self, markers: G) -> Installer<'a, G> {
        Installer {
            config: self.config,
            profile: self.profile,
            layout: self.layout,
            catalog: self.catalog,
            runner: self.runner,
            gate: FreshnessGate::new(markers),
        }
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    fn fetcher(&self) -> Fetcher<'_> {
        Fetcher::new(self.runner, &self.config.fetch)
    }

    /// Full install.
    pub fn run(&self) -> Result<()> {
        self.prepare_environment()?;

        if self.config.skip_ghc {
            println!("--- Skipping ghc ---");
        } else {
            self.install_ghc()?;
        }
        self.setup_cabal()?;

        println!(
            "All set! Source \"{}\" to update your environment.",
            self.layout.env_file.display()
        );
        println!("Done.");
        Ok(())
    }

    /// Steps 1–5 only, then print how to configure GHC by hand.
    pub fn run_env_only(&self) -> Result<()> {
        self.prepare_environment()?;
        println!(
            "Source \"{}\" and then configure ghc with:",
            self.layout.env_file.display()
        );
        println!("    ./configure {}", self.profile.configure_args());
        println!("Done.");
        Ok(())
    }

    /// SDK setup, compiler probe and env file.
    pub fn prepare_environment(&self) -> Result<EnvironmentRecord> {
        self.setup_wasi_sdk()?;
        self.setup_libffi()?;
        self.setup_binaryen()?;

        let report = self.check_compilers()?;
        report.print();
        let tools = match report.into_record() {
            Ok(tools) => tools,
            Err(err) => {
                println!("Aborting due to missing executables.");
                return Err(err.into());
            }
        };

        self.write_env_file(&tools)?;
        Ok(tools)
    }

    fn write_env_file(&self, tools: &EnvironmentRecord) -> Result<()> {
        println!("--- Writing the env file ---");
        EnvFile {
            path_prepends: self.layout.path_prepends(),
            tools: tools.clone(),
            flags: compiler_flags(&self.config.inherited),
        }
        .write(&self.layout.env_file)
    }
}
