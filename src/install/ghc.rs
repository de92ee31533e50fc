//! GHC bindist download and install.

use anyhow::{Context, Result};
use std::fs;

use super::{InstallError, Installer};
use crate::fetch::Extract;
use crate::freshness::MarkerFs;
use crate::host::Flavour;
use crate::process::{quote_path, Cmd};

/// Log file written inside the GHC work directory.
pub const GHC_LOG: &str = "ghc.log";

const CONFIGURE_STATUS: &str = ".configure.status";
const MAKE_STATUS: &str = ".make.status";

impl<F: MarkerFs> Installer<'_, F> {
    /// Download the bindist for the selected flavour, then configure and
    /// `make install` it into `<prefix>/wasm32-wasi-ghc`.
    pub fn install_ghc(&self) -> Result<()> {
        if let Flavour::Unsupported { requested } = &self.profile.flavour {
            return Err(InstallError::UnsupportedFlavour {
                flavour: requested.clone(),
                host: self.profile.triple.to_string(),
            }
            .into());
        }

        println!("--- Downloading ghc ---");
        let work = &self.layout.ghc_work;
        if self.gate.needs_run(work) {
            let url = self.catalog.url(&self.profile.ghc)?;
            println!("Installing wasm32-wasi-ghc from {url}");
            fs::create_dir_all(work)
                .with_context(|| format!("Failed to create directory: {}", work.display()))?;
            self.fetcher().download_into(url, work, &Extract::TarXz)?;
        }

        println!("--- Configuring ghc ---");
        self.runner
            .run(&Cmd::shell(self.ghc_build_script()?), Some(work))?;
        Ok(())
    }

    /// Sources the env file, then runs configure and `make install`, each
    /// appending to a log that is emptied first.
    ///
    /// A pipeline into `tee` reports tee's status, so every stage records
    /// its own exit code in a side file and the script exits with it.
    fn ghc_build_script(&self) -> Result<String> {
        let env = quote_path(&self.layout.env_file)?;
        let prefix = quote_path(&self.layout.ghc_prefix)?;
        let configure = format!(
            "./configure {} --prefix={prefix}",
            self.profile.configure_args()
        );
        let install = "RelocatableBuild=YES make install";

        let mut script = format!(". {env} || exit $?\n: > {GHC_LOG} || exit $?\n");
        for (stage, status) in [(configure.as_str(), CONFIGURE_STATUS), (install, MAKE_STATUS)] {
            script.push_str(&format!(
                "{{ {stage}; echo $? > {status}; }} | tee -a {GHC_LOG}\n\
                 s=$(cat {status}) && rm -f {status}\n\
                 [ \"$s\" -eq 0 ] || exit \"$s\"\n"
            ));
        }
        Ok(script)
    }
}
