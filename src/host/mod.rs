//! Host platform detection.
//!
//! The installer only knows how to provision a handful of hosts. Platform
//! names are parsed into closed enums up front so the per-host artifact
//! table in [`profile`] can be an exhaustive `match`.
//!
//! Names are accepted in `uname` form (`Linux`, `Darwin`, `x86_64`,
//! `aarch64`, `arm64`) as well as the Rust target form (`linux`, `macos`).

pub mod profile;

pub use profile::{Flavour, HostProfile, DEFAULT_FLAVOUR};

use std::fmt;
use thiserror::Error;

/// Errors raised while resolving the host.
#[derive(Debug, Error)]
pub enum HostError {
    /// The (OS, architecture) pair has no prebuilt toolchain.
    #[error("Host not supported: ({os}, {arch}, {flavour})")]
    Unsupported {
        os: String,
        arch: String,
        flavour: String,
    },
}

/// Operating systems with prebuilt artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Linux,
    Darwin,
}

impl Os {
    /// Parse a `uname -s` or `std::env::consts::OS` style name.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "linux" => Some(Self::Linux),
            "darwin" | "macos" => Some(Self::Darwin),
            _ => None,
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => f.write_str("Linux"),
            Self::Darwin => f.write_str("Darwin"),
        }
    }
}

/// CPU architectures with prebuilt artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86_64,
    Aarch64,
}

impl Arch {
    /// Parse a `uname -m` or `std::env::consts::ARCH` style name.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "x86_64" | "amd64" => Some(Self::X86_64),
            "aarch64" | "arm64" => Some(Self::Aarch64),
            _ => None,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X86_64 => f.write_str("x86_64"),
            Self::Aarch64 => f.write_str("aarch64"),
        }
    }
}

/// A supported (OS, architecture) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostPlatform {
    pub os: Os,
    pub arch: Arch,
}

impl HostPlatform {
    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Parse raw OS and architecture names.
    ///
    /// `flavour` is only used to make the error message complete.
    pub fn parse(os: &str, arch: &str, flavour: &str) -> Result<Self, HostError> {
        match (Os::parse(os), Arch::parse(arch)) {
            (Some(os), Some(arch)) => Ok(Self { os, arch }),
            _ => Err(HostError::Unsupported {
                os: os.to_string(),
                arch: arch.to_string(),
                flavour: flavour.to_string(),
            }),
        }
    }

    /// The platform this binary was compiled for.
    pub fn detect(flavour: &str) -> Result<Self, HostError> {
        Self::parse(std::env::consts::OS, std::env::consts::ARCH, flavour)
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.os, self.arch) {
            // uname -m spelling on macOS
            (Os::Darwin, Arch::Aarch64) => write!(f, "{}, arm64", self.os),
            (os, arch) => write!(f, "{os}, {arch}"),
        }
    }
}
