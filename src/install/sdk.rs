//! WASI SDK, libffi-wasm and binaryen.

use anyhow::{Context, Result};
use std::fs;

use super::Installer;
use crate::fetch::Extract;
use crate::filesystem::{copy_dir_contents, copy_into_dir};
use crate::freshness::MarkerFs;
use crate::process::Cmd;

impl<F: MarkerFs> Installer<'_, F> {
    /// Unpack the SDK into `<prefix>/wasi-sdk` unless it is already there.
    pub fn setup_wasi_sdk(&self) -> Result<()> {
        println!("--- Setting up WASI SDK ---");
        let root = &self.layout.wasi_sdk;
        if !self.gate.needs_run(root) {
            return Ok(());
        }

        let url = self.wasi_sdk_url()?;
        println!("Installing wasi-sdk from {url}");
        fs::create_dir_all(root)
            .with_context(|| format!("Failed to create directory: {}", root.display()))?;
        self.fetcher().download_into(&url, root, &Extract::TarGz)?;
        Ok(())
    }

    fn wasi_sdk_url(&self) -> Result<String> {
        match &self.config.upstream_wasi_sdk_pipeline_id {
            Some(pipeline) => Ok(self.fetcher().upstream_wasi_sdk_url(
                pipeline,
                self.profile.wasi_sdk_job_name,
                self.profile.wasi_sdk_artifact_path,
            )?),
            None => Ok(self.catalog.url(self.profile.wasi_sdk)?.to_string()),
        }
    }

    /// Fetch libffi-wasm and copy it into the SDK sysroot.
    ///
    /// Only the download is gated; the copy runs every time.
    pub fn setup_libffi(&self) -> Result<()> {
        println!("--- Setting up ffi-wasm ---");
        let layout = &self.layout;
        if self.gate.needs_run(&layout.libffi) {
            let url = self.catalog.url("libffi-wasm")?;
            self.fetcher().download_to(url, &layout.libffi_zip)?;
            let zip = layout
                .libffi_zip
                .to_str()
                .with_context(|| format!("non UTF-8 path '{}'", layout.libffi_zip.display()))?;
            self.runner
                .run(&Cmd::args(["unzip", "-o", zip]), Some(&layout.workdir))?;
        }

        copy_dir_contents(&layout.libffi.join("include"), &layout.sysroot_include())?;
        copy_dir_contents(&layout.libffi.join("lib"), &layout.sysroot_lib())?;
        Ok(())
    }

    /// Fetch binaryen and put `wasm-opt` next to the SDK tools.
    pub fn setup_binaryen(&self) -> Result<()> {
        println!("--- Setting up binaryen ---");
        let layout = &self.layout;
        if !self.gate.needs_run(&layout.binaryen_bin()) {
            return Ok(());
        }

        fs::create_dir_all(&layout.binaryen)
            .with_context(|| format!("Failed to create directory: {}", layout.binaryen.display()))?;
        let url = self.catalog.url(self.profile.binaryen)?;
        self.fetcher()
            .download_into(url, &layout.binaryen, &Extract::TarGz)?;
        copy_into_dir(&layout.binaryen_bin().join("wasm-opt"), &layout.wasi_sdk_bin())
    }
}
