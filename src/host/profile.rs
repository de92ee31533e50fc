//! Per-host artifact table.
//!
//! A [`HostProfile`] is resolved once at startup and never mutated. It
//! names every catalog entry and target string later steps need.

use std::fmt;

use super::{Arch, HostPlatform, Os};

/// Flavour used when neither `--flavour` nor `FLAVOUR` is given.
pub const DEFAULT_FLAVOUR: &str = "9.12";

/// Flavours with prebuilt GMP bindists on the non-x86_64-linux hosts.
const GMP_FLAVOURS: &[&str] = &["9.10", "9.12"];

/// Requested compiler flavour, tagged with whether this host has a
/// prebuilt GHC for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flavour {
    Supported(String),
    /// Kept rather than rejected so environment-only runs still work; the
    /// GHC step fails when it reaches this.
    Unsupported { requested: String },
}

impl Flavour {
    fn gate(requested: &str, supported: bool) -> Self {
        if supported {
            Self::Supported(requested.to_string())
        } else {
            Self::Unsupported {
                requested: requested.to_string(),
            }
        }
    }

    /// The flavour string as the user requested it.
    pub fn name(&self) -> &str {
        match self {
            Self::Supported(name) => name,
            Self::Unsupported { requested } => requested,
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Supported(_))
    }
}

impl fmt::Display for Flavour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Supported(name) => f.write_str(name),
            Self::Unsupported { requested } => write!(f, "{requested} (unsupported)"),
        }
    }
}

/// Everything host-specific the installer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostProfile {
    pub platform: HostPlatform,
    /// Value passed to GHC's `./configure --host=`.
    pub triple: &'static str,
    /// Catalog key of the WASI SDK archive.
    pub wasi_sdk: &'static str,
    /// Job name inside an upstream wasi-sdk CI pipeline.
    pub wasi_sdk_job_name: &'static str,
    /// Path of the SDK tarball inside that job's artifacts.
    pub wasi_sdk_artifact_path: &'static str,
    pub wasmtime: &'static str,
    pub nodejs: &'static str,
    pub cabal: &'static str,
    pub binaryen: &'static str,
    /// Catalog key of the GHC bindist.
    pub ghc: String,
    pub flavour: Flavour,
}

impl HostProfile {
    /// Resolve the profile for `platform` and the requested flavour.
    pub fn resolve(platform: HostPlatform, requested_flavour: &str) -> Self {
        let flavour_supported = GMP_FLAVOURS.contains(&requested_flavour);

        match (platform.os, platform.arch) {
            (Os::Linux, Arch::X86_64) => Self {
                platform,
                triple: "x86_64-linux",
                wasi_sdk: "wasi-sdk",
                wasi_sdk_job_name: "x86_64-linux",
                wasi_sdk_artifact_path: "dist/wasi-sdk-26.0-x86_64-linux.tar.gz",
                wasmtime: "wasmtime",
                nodejs: "nodejs",
                cabal: "cabal",
                binaryen: "binaryen",
                ghc: format!("wasm32-wasi-ghc-{requested_flavour}"),
                flavour: Flavour::gate(requested_flavour, true),
            },
            (Os::Linux, Arch::Aarch64) => Self {
                platform,
                triple: "aarch64-linux",
                wasi_sdk: "wasi-sdk-aarch64-linux",
                wasi_sdk_job_name: "aarch64-linux",
                wasi_sdk_artifact_path: "dist/wasi-sdk-26.0-aarch64-linux.tar.gz",
                wasmtime: "wasmtime_aarch64_linux",
                nodejs: "nodejs_aarch64_linux",
                cabal: "cabal_aarch64_linux",
                binaryen: "binaryen_aarch64_linux",
                ghc: format!("wasm32-wasi-ghc-gmp-aarch64-linux-{requested_flavour}"),
                flavour: Flavour::gate(requested_flavour, flavour_supported),
            },
            (Os::Darwin, Arch::Aarch64) => Self {
                platform,
                triple: "aarch64-apple-darwin",
                wasi_sdk: "wasi-sdk-aarch64-darwin",
                wasi_sdk_job_name: "aarch64-darwin",
                wasi_sdk_artifact_path: "dist/wasi-sdk-26.0-arm64-macos.tar.gz",
                wasmtime: "wasmtime_aarch64_darwin",
                nodejs: "nodejs_aarch64_darwin",
                cabal: "cabal_aarch64_darwin",
                binaryen: "binaryen_aarch64_darwin",
                ghc: format!("wasm32-wasi-ghc-gmp-aarch64-darwin-{requested_flavour}"),
                flavour: Flavour::gate(requested_flavour, flavour_supported),
            },
            // No prebuilt GHC exists for Intel macs at all.
            (Os::Darwin, Arch::X86_64) => Self {
                platform,
                triple: "x86_64-apple-darwin",
                wasi_sdk: "wasi-sdk-x86_64-darwin",
                wasi_sdk_job_name: "x86_64-darwin",
                wasi_sdk_artifact_path: "dist/wasi-sdk-26.0-arm64-macos.tar.gz",
                wasmtime: "wasmtime_x86_64_darwin",
                nodejs: "nodejs_x86_64_darwin",
                cabal: "cabal_x86_64_darwin",
                binaryen: "binaryen_x86_64_darwin",
                ghc: "wasm32-wasi-ghc-gmp-x86_64-darwin".to_string(),
                flavour: Flavour::gate(requested_flavour, false),
            },
        }
    }

    /// Arguments for GHC's `./configure`, excluding `--prefix`.
    pub fn configure_args(&self) -> String {
        format!(
            "--host={} --target=wasm32-wasi --with-intree-gmp --with-system-libffi",
            self.triple
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_HOSTS: [(Os, Arch); 4] = [
        (Os::Linux, Arch::X86_64),
        (Os::Linux, Arch::Aarch64),
        (Os::Darwin, Arch::Aarch64),
        (Os::Darwin, Arch::X86_64),
    ];

    #[test]
    fn every_host_has_complete_profile() {
        for (os, arch) in ALL_HOSTS {
            let profile = HostProfile::resolve(HostPlatform::new(os, arch), DEFAULT_FLAVOUR);
            for field in [
                profile.triple,
                profile.wasi_sdk,
                profile.wasi_sdk_job_name,
                profile.wasi_sdk_artifact_path,
                profile.wasmtime,
                profile.nodejs,
                profile.cabal,
                profile.binaryen,
                profile.ghc.as_str(),
                profile.flavour.name(),
            ] {
                assert!(!field.is_empty(), "empty field for {os}/{arch}: {profile:?}");
            }
        }
    }

    #[test]
    fn linux_x86_64_accepts_any_flavour() {
        let profile = HostProfile::resolve(HostPlatform::new(Os::Linux, Arch::X86_64), "9.6");
        assert_eq!(profile.flavour, Flavour::Supported("9.6".to_string()));
        assert_eq!(profile.ghc, "wasm32-wasi-ghc-9.6");
    }

    #[test]
    fn aarch64_linux_gates_flavour() {
        let platform = HostPlatform::new(Os::Linux, Arch::Aarch64);

        let ok = HostProfile::resolve(platform, "9.10");
        assert!(ok.flavour.is_supported());
        assert_eq!(ok.ghc, "wasm32-wasi-ghc-gmp-aarch64-linux-9.10");

        let gated = HostProfile::resolve(platform, "9.8");
        assert_eq!(
            gated.flavour,
            Flavour::Unsupported {
                requested: "9.8".to_string()
            }
        );
        assert_eq!(gated.flavour.name(), "9.8");
    }

    #[test]
    fn intel_darwin_never_has_ghc() {
        let profile =
            HostProfile::resolve(HostPlatform::new(Os::Darwin, Arch::X86_64), DEFAULT_FLAVOUR);
        assert!(!profile.flavour.is_supported());
        assert_eq!(profile.ghc, "wasm32-wasi-ghc-gmp-x86_64-darwin");
    }

    #[test]
    fn configure_args_name_the_host_triple() {
        let profile =
            HostProfile::resolve(HostPlatform::new(Os::Darwin, Arch::Aarch64), DEFAULT_FLAVOUR);
        assert_eq!(
            profile.configure_args(),
            "--host=aarch64-apple-darwin --target=wasm32-wasi --with-intree-gmp --with-system-libffi"
        );
    }
}
