//! Path definitions for an installation.
//!
//! This module only defines WHERE things go. Everything under the prefix
//! is the installed toolchain; everything under the working directory is
//! download scratch that doubles as a freshness marker.

use std::path::{Path, PathBuf};

/// Every path the installer reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    pub prefix: PathBuf,
    pub workdir: PathBuf,
    /// WASI SDK root (`<prefix>/wasi-sdk`).
    pub wasi_sdk: PathBuf,
    /// Where GHC is installed (`<prefix>/wasm32-wasi-ghc`).
    pub ghc_prefix: PathBuf,
    /// Directory holding the cabal wrapper.
    pub cabal_prefix: PathBuf,
    /// Directory holding the unwrapped cabal binary.
    pub cabal_bin_dir: PathBuf,
    /// `CABAL_DIR` used by the wrapper.
    pub cabal_dir: PathBuf,
    pub env_file: PathBuf,
    /// Unpacked libffi-wasm (`<workdir>/out/libffi-wasm`).
    pub libffi: PathBuf,
    pub libffi_zip: PathBuf,
    pub binaryen: PathBuf,
    /// GHC bindist unpack and build directory for one flavour.
    pub ghc_work: PathBuf,
}

impl InstallLayout {
    pub fn new(prefix: &Path, workdir: &Path, flavour: &str) -> Self {
        Self {
            prefix: prefix.to_path_buf(),
            workdir: workdir.to_path_buf(),
            wasi_sdk: prefix.join("wasi-sdk"),
            ghc_prefix: prefix.join("wasm32-wasi-ghc"),
            cabal_prefix: prefix.join("wasm32-wasi-cabal"),
            cabal_bin_dir: prefix.join("cabal/bin"),
            cabal_dir: prefix.join(".cabal"),
            env_file: prefix.join("env"),
            libffi: workdir.join("out/libffi-wasm"),
            libffi_zip: workdir.join("libffi-wasm.zip"),
            binaryen: workdir.join("binaryen"),
            ghc_work: workdir.join(format!("ghc.{flavour}")),
        }
    }

    pub fn wasi_sdk_bin(&self) -> PathBuf {
        self.wasi_sdk.join("bin")
    }

    pub fn sysroot_include(&self) -> PathBuf {
        self.wasi_sdk.join("share/wasi-sysroot/include/wasm32-wasi")
    }

    pub fn sysroot_lib(&self) -> PathBuf {
        self.wasi_sdk.join("share/wasi-sysroot/lib/wasm32-wasi")
    }

    pub fn binaryen_bin(&self) -> PathBuf {
        self.binaryen.join("bin")
    }

    pub fn cabal_exe(&self) -> PathBuf {
        self.cabal_bin_dir.join("cabal")
    }

    pub fn cabal_wrapper(&self) -> PathBuf {
        self.cabal_prefix.join("wasm32-wasi-cabal")
    }

    pub fn cabal_config(&self) -> PathBuf {
        self.cabal_dir.join("config")
    }

    pub fn ghc_bin(&self, tool: &str) -> PathBuf {
        self.ghc_prefix.join("bin").join(tool)
    }

    /// Directories the env file prepends to `PATH`, in order.
    pub fn path_prepends(&self) -> Vec<PathBuf> {
        vec![
            self.cabal_prefix.clone(),
            self.wasi_sdk_bin(),
            self.ghc_prefix.join("bin"),
        ]
    }
}
