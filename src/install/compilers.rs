//! Cross-toolchain probe.
//!
//! Every tool GHC's configure expects is looked up on the SDK `bin`
//! directory followed by the inherited `PATH`. Missing tools are
//! collected rather than failing on the first one so the full report can
//! be printed.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::{InstallError, Installer};
use crate::env_file::EnvironmentRecord;
use crate::freshness::MarkerFs;

/// How one variable is resolved.
#[derive(Debug, Clone, Copy)]
enum Probe {
    /// Searched on SDK bin + inherited `PATH`.
    Sdk(&'static str),
    /// Used verbatim.
    Literal(&'static str),
    /// Searched on the inherited `PATH` only.
    Host(&'static str),
}

const TOOLS: [(&str, Probe); 14] = [
    ("AR", Probe::Sdk("llvm-ar")),
    ("CC", Probe::Sdk("wasm32-wasi-clang")),
    ("CC_FOR_BUILD", Probe::Literal("cc")),
    ("CXX", Probe::Sdk("wasm32-wasi-clang++")),
    ("LD", Probe::Sdk("wasm-ld")),
    ("NM", Probe::Sdk("llvm-nm")),
    ("OBJCOPY", Probe::Sdk("llvm-objcopy")),
    ("OBJDUMP", Probe::Sdk("llvm-objdump")),
    ("RANLIB", Probe::Sdk("llvm-ranlib")),
    ("SIZE", Probe::Sdk("llvm-size")),
    ("STRINGS", Probe::Sdk("llvm-strings")),
    ("STRIP", Probe::Sdk("llvm-strip")),
    // GHC must not pick up a host LLVM for these.
    ("LLC", Probe::Host("false")),
    ("OPT", Probe::Host("false")),
];

/// Result of probing every tool, in a fixed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerReport {
    entries: Vec<(&'static str, Option<String>)>,
}

impl CompilerReport {
    pub fn print(&self) {
        println!("--- Checking compilers ---");
        for (name, path) in &self.entries {
            println!("Checking {:14}: {}", name, path.as_deref().unwrap_or("[N/A]"));
        }
    }

    pub fn missing(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, path)| path.is_none())
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// All tool paths, or the list of missing variables.
    pub fn into_record(self) -> Result<EnvironmentRecord, InstallError> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(InstallError::MissingTools { missing });
        }

        let mut record = EnvironmentRecord::new();
        for (name, path) in self.entries.into_iter() {
            if let Some(path) = path {
                record.insert(name, path);
            }
        }
        Ok(record)
    }
}

fn lookup(tool: &str, paths: Option<&OsString>, cwd: &Path) -> Option<String> {
    let paths = paths?;
    which::which_in(tool, Some(paths), cwd)
        .ok()
        .map(|path| path.display().to_string())
}

impl<F: MarkerFs> Installer<'_, F> {
    /// Resolve every tool variable for the env file.
    pub fn check_compilers(&self) -> Result<CompilerReport> {
        let inherited = self.config.inherited.path();
        let mut dirs: Vec<PathBuf> = vec![self.layout.wasi_sdk_bin()];
        if let Some(path) = inherited {
            dirs.extend(std::env::split_paths(path));
        }
        let sdk_path = std::env::join_paths(&dirs)
            .context("SDK bin directory cannot be placed on PATH")?;

        let cwd = &self.layout.workdir;
        let entries = TOOLS
            .iter()
            .map(|&(name, probe)| {
                let resolved = match probe {
                    Probe::Sdk(tool) => lookup(tool, Some(&sdk_path), cwd),
                    Probe::Literal(value) => Some(value.to_string()),
                    Probe::Host(tool) => lookup(tool, inherited, cwd),
                };
                (name, resolved)
            })
            .collect();

        Ok(CompilerReport { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::filesystem::write_file_mode;
    use crate::host::{Arch, Os};
    use crate::process::testing::RecordingRunner;

    #[test]
    fn finds_sdk_tools_before_path() {
        let sandbox = Sandbox::new("9.12");
        let profile = sandbox.profile(Os::Linux, Arch::X86_64);
        let layout = sandbox.layout();
        for tool in SDK_TOOLS {
            write_file_mode(&layout.wasi_sdk_bin().join(tool), "#!/bin/sh\n", 0o755).unwrap();
        }

        let runner = RecordingRunner::silent();
        let report = Installer::new(&sandbox.config, &profile, &runner)
            .unwrap()
            .check_compilers()
            .unwrap();
        assert!(report.missing().is_empty(), "{report:?}");

        let record = report.into_record().unwrap();
        assert_eq!(record.len(), TOOLS.len());
        assert_eq!(
            record.get("CC"),
            Some(layout.wasi_sdk_bin().join("wasm32-wasi-clang").to_str().unwrap())
        );
        assert_eq!(record.get("CC_FOR_BUILD"), Some("cc"));
        assert!(record.get("LLC").unwrap().ends_with("/false"));
        let names: Vec<_> = record.iter().map(|(n, _)| n).collect();
        assert_eq!(names[..3], ["AR", "CC", "CC_FOR_BUILD"]);
    }

    #[test]
    fn non_executable_files_do_not_count() {
        let sandbox = Sandbox::new("9.12");
        let profile = sandbox.profile(Os::Linux, Arch::X86_64);
        let layout = sandbox.layout();
        for tool in SDK_TOOLS {
            write_file_mode(&layout.wasi_sdk_bin().join(tool), "#!/bin/sh\n", 0o755).unwrap();
        }
        write_file_mode(&layout.wasi_sdk_bin().join("wasm32-wasi-clang"), "", 0o644).unwrap();

        let runner = RecordingRunner::silent();
        let report = Installer::new(&sandbox.config, &profile, &runner)
            .unwrap()
            .check_compilers()
            .unwrap();

        assert_eq!(report.missing(), ["CC"]);
        match report.into_record() {
            Err(InstallError::MissingTools { missing }) => assert_eq!(missing, ["CC"]),
            other => panic!("expected missing tools, got {other:?}"),
        }
    }

    #[test]
    fn empty_sdk_reports_every_sdk_tool() {
        let sandbox = Sandbox::new("9.12");
        let profile = sandbox.profile(Os::Linux, Arch::X86_64);
        let runner = RecordingRunner::silent();
        let report = Installer::new(&sandbox.config, &profile, &runner)
            .unwrap()
            .check_compilers()
            .unwrap();

        let missing = report.missing();
        assert!(missing.contains(&"CC".to_string()));
        assert!(missing.contains(&"CXX".to_string()));
        assert!(!missing.contains(&"CC_FOR_BUILD".to_string()));
    }
}
