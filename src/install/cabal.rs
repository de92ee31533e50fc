//! cabal-install and the `wasm32-wasi-cabal` wrapper.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::{InstallLayout, Installer};
use crate::fetch::Extract;
use crate::filesystem::write_file_mode;
use crate::freshness::MarkerFs;
use crate::process::{ensure_exists, quote_path, Cmd};

/// Which bundled cabal config a flavour gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CabalConfigTemplate {
    Head,
    Th,
    Legacy,
}

impl CabalConfigTemplate {
    pub fn for_flavour(flavour: &str) -> Self {
        match flavour {
            "9.10" | "9.12" => Self::Th,
            "9.6" | "9.8" => Self::Legacy,
            _ => Self::Head,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Th => "th",
            Self::Legacy => "legacy",
        }
    }

    /// Template file name in the working directory.
    pub fn file_name(self) -> String {
        format!("cabal.{}.config", self.name())
    }
}

/// Wrapper script running cabal against the wasm GHC.
pub fn wrapper_script(layout: &InstallLayout) -> Result<String> {
    let lines = [
        format!("CABAL_DIR={} ", quote_path(&layout.cabal_dir)?),
        "exec ".to_string(),
        format!("{} ", quote_path(&layout.cabal_exe())?),
        format!(
            "--with-compiler={} ",
            quote_path(&layout.ghc_bin("wasm32-wasi-ghc"))?
        ),
        format!(
            "--with-hc-pkg={} ",
            quote_path(&layout.ghc_bin("wasm32-wasi-ghc-pkg"))?
        ),
        format!(
            "--with-hsc2hs={} ",
            quote_path(&layout.ghc_bin("wasm32-wasi-hsc2hs"))?
        ),
        r#"${1+"$@"}"#.to_string(),
    ];
    Ok(format!("#!/bin/sh\n{}\n", lines.join("\\\n")))
}

impl<F: MarkerFs> Installer<'_, F> {
    /// Install cabal, write the wrapper and config, then `cabal update`.
    pub fn setup_cabal(&self) -> Result<()> {
        let layout = &self.layout;

        println!("--- Downloading cabal ---");
        if self.gate.needs_run(&layout.cabal_exe()) {
            fs::create_dir_all(&layout.cabal_bin_dir).with_context(|| {
                format!("Failed to create directory: {}", layout.cabal_bin_dir.display())
            })?;
            let url = self.catalog.url(self.profile.cabal)?;
            self.fetcher().download_into(
                url,
                &layout.cabal_bin_dir,
                &Extract::TarXzMember("cabal".to_string()),
            )?;
        }

        println!("--- Configuring cabal wrapper for WASM ---");
        let wrapper = layout.cabal_wrapper();
        if self.gate.is_step_complete(&wrapper) {
            println!("Found \"{}\". Skip writing cabal wrapper...", wrapper.display());
        } else {
            write_file_mode(&wrapper, &wrapper_script(layout)?, 0o755)?;
        }

        self.install_cabal_config()?;

        println!("Updating cabal...");
        let cwd = if self.gate.is_step_complete(&layout.ghc_work) {
            &layout.ghc_work
        } else {
            &layout.workdir
        };
        let wrapper = wrapper
            .to_str()
            .with_context(|| format!("non UTF-8 path '{}'", wrapper.display()))?;
        self.runner.run(&Cmd::args([wrapper, "update"]), Some(cwd))?;
        Ok(())
    }

    fn install_cabal_config(&self) -> Result<()> {
        let layout = &self.layout;
        let config = layout.cabal_config();
        if self.gate.is_step_complete(&config) {
            println!(
                "Cabal dir \"{}\" is already configured. Skipping...",
                layout.cabal_dir.display()
            );
            return Ok(());
        }

        let flavour = self.profile.flavour.name();
        let template = CabalConfigTemplate::for_flavour(flavour);
        println!(
            "Cabal with flavour {} uses \"{}\" config",
            flavour,
            template.name()
        );
        let source = layout.workdir.join(template.file_name());
        ensure_exists(&source, "cabal config template")?;
        copy_config(&source, &config)
    }
}

fn copy_config(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::copy(source, dest).with_context(|| {
        format!(
            "Failed to copy '{}' to '{}'",
            source.display(),
            dest.display()
        )
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::freshness::MemoryMarkers;
    use crate::host::{Arch, Os};
    use crate::process::testing::RecordingRunner;
    use crate::process::{CommandRunner, SystemRunner};

    #[test]
    fn template_selection() {
        assert_eq!(CabalConfigTemplate::for_flavour("9.12"), CabalConfigTemplate::Th);
        assert_eq!(CabalConfigTemplate::for_flavour("9.10"), CabalConfigTemplate::Th);
        assert_eq!(CabalConfigTemplate::for_flavour("9.8"), CabalConfigTemplate::Legacy);
        assert_eq!(CabalConfigTemplate::for_flavour("9.6"), CabalConfigTemplate::Legacy);
        assert_eq!(CabalConfigTemplate::for_flavour("9.14"), CabalConfigTemplate::Head);
        assert_eq!(CabalConfigTemplate::for_flavour("gmp"), CabalConfigTemplate::Head);
        assert_eq!(CabalConfigTemplate::Legacy.file_name(), "cabal.legacy.config");
    }

    #[test]
    fn wrapper_script_shape() {
        let layout = InstallLayout::new(Path::new("/opt/w"), Path::new("/src"), "9.12");
        let script = wrapper_script(&layout).unwrap();
        assert_eq!(
            script,
            "#!/bin/sh\n\
             CABAL_DIR=/opt/w/.cabal \\\n\
             exec \\\n\
             /opt/w/cabal/bin/cabal \\\n\
             --with-compiler=/opt/w/wasm32-wasi-ghc/bin/wasm32-wasi-ghc \\\n\
             --with-hc-pkg=/opt/w/wasm32-wasi-ghc/bin/wasm32-wasi-ghc-pkg \\\n\
             --with-hsc2hs=/opt/w/wasm32-wasi-ghc/bin/wasm32-wasi-hsc2hs \\\n\
             ${1+\"$@\"}\n"
        );
    }

    #[test]
    fn wrapper_forwards_arguments_to_cabal() {
        let sandbox = Sandbox::new("9.12");
        let layout = sandbox.layout();
        write_file_mode(
            &layout.cabal_exe(),
            "#!/bin/sh\nprintf '%s\\n' \"$CABAL_DIR\" \"$@\"\n",
            0o755,
        )
        .unwrap();
        write_file_mode(&layout.cabal_wrapper(), &wrapper_script(&layout).unwrap(), 0o755)
            .unwrap();

        let out = SystemRunner
            .capture(
                &Cmd::args([layout.cabal_wrapper().to_str().unwrap(), "--version", "a b"]),
                None,
            )
            .unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], layout.cabal_dir.to_str().unwrap());
        assert!(lines[1].starts_with("--with-compiler="));
        assert_eq!(lines[4], "--version");
        assert_eq!(lines[5], "a b");
    }

    #[test]
    fn existing_wrapper_and_config_are_kept() {
        let sandbox = Sandbox::new("9.8");
        let profile = sandbox.profile(Os::Linux, Arch::X86_64);
        let layout = sandbox.layout();
        write_file_mode(&layout.cabal_exe(), "#!/bin/sh\n", 0o755).unwrap();
        write_file_mode(&layout.cabal_wrapper(), "#!/bin/sh\n# custom\n", 0o755).unwrap();
        fs::create_dir_all(&layout.cabal_dir).unwrap();
        fs::write(layout.cabal_config(), "-- mine\n").unwrap();

        let runner = RecordingRunner::silent();
        Installer::new(&sandbox.config, &profile, &runner)
            .unwrap()
            .setup_cabal()
            .unwrap();

        assert_eq!(
            fs::read_to_string(layout.cabal_wrapper()).unwrap(),
            "#!/bin/sh\n# custom\n"
        );
        assert_eq!(fs::read_to_string(layout.cabal_config()).unwrap(), "-- mine\n");
        assert_eq!(runner.commands().len(), 1);
    }

    #[test]
    fn in_memory_markers_skip_wrapper_and_config() {
        let sandbox = Sandbox::new("9.12");
        let profile = sandbox.profile(Os::Linux, Arch::X86_64);
        let layout = sandbox.layout();
        let mut markers = MemoryMarkers::new();
        markers.insert(layout.cabal_exe());
        markers.insert(layout.cabal_wrapper());
        markers.insert(layout.cabal_config());
        markers.insert(layout.ghc_work.clone());

        let runner = RecordingRunner::silent();
        Installer::new(&sandbox.config, &profile, &runner)
            .unwrap()
            .with_markers(markers)
            .setup_cabal()
            .unwrap();

        assert!(!exists(&layout.cabal_wrapper()), "wrapper must not be written");
        assert!(!exists(&layout.cabal_config()), "config must not be copied");
        assert_eq!(runner.commands().len(), 1);
        assert_eq!(runner.count_containing("wasm32-wasi-cabal update"), 1);
        assert_eq!(runner.cwds(), vec![Some(layout.ghc_work.clone())]);
    }

    #[test]
    fn update_runs_in_workdir_without_ghc_marker() {
        let sandbox = Sandbox::new("9.12");
        let profile = sandbox.profile(Os::Linux, Arch::X86_64);
        let layout = sandbox.layout();
        fs::create_dir_all(&layout.ghc_work).unwrap();
        let mut markers = MemoryMarkers::new();
        markers.insert(layout.cabal_exe());

        let runner = RecordingRunner::silent();
        Installer::new(&sandbox.config, &profile, &runner)
            .unwrap()
            .with_markers(markers)
            .setup_cabal()
            .unwrap();

        assert!(exists(&layout.cabal_wrapper()));
        assert_eq!(
            fs::read_to_string(layout.cabal_config()).unwrap(),
            "-- th config\n"
        );
        assert_eq!(runner.cwds(), vec![Some(sandbox.config.workdir.clone())]);
    }

    #[test]
    fn legacy_flavour_copies_legacy_config() {
        let sandbox = Sandbox::new("9.8");
        let profile = sandbox.profile(Os::Linux, Arch::X86_64);
        let runner = sandbox.runner(true);
        Installer::new(&sandbox.config, &profile, &runner)
            .unwrap()
            .setup_cabal()
            .unwrap();

        let layout = sandbox.layout();
        assert_eq!(
            fs::read_to_string(layout.cabal_config()).unwrap(),
            "-- legacy config\n"
        );
        assert_eq!(runner.count_containing("cabal.tar.xz | tar xJ --no-same-owner -C "), 1);
    }

    #[test]
    fn missing_template_is_reported() {
        let sandbox = Sandbox::new("9.14");
        fs::remove_file(sandbox.config.workdir.join("cabal.head.config")).unwrap();
        let profile = sandbox.profile(Os::Linux, Arch::X86_64);
        let runner = sandbox.runner(true);

        let err = Installer::new(&sandbox.config, &profile, &runner)
            .unwrap()
            .setup_cabal()
            .unwrap_err();
        assert!(err.to_string().starts_with("cabal config template not found at"));
        assert_eq!(runner.count_containing(" update"), 0);
    }
}
