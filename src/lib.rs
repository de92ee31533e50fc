//! Installer for the GHC wasm32-wasi cross toolchain.
//!
//! Provisions a prefix (`$HOME/.ghc-wasm` by default) with:
//!
//! - **WASI SDK** - clang, wasm-ld and the LLVM binutils, plus the sysroot
//! - **libffi-wasm** - headers and libraries copied into the sysroot
//! - **binaryen** - `wasm-opt` placed next to the SDK tools
//! - **GHC** - a prebuilt bindist configured and installed for the host
//! - **cabal** - cabal-install plus a `wasm32-wasi-cabal` wrapper
//! - **env file** - `<prefix>/env`, sourceable from POSIX shells
//!
//! # Architecture
//!
//! ```text
//! ghc-wasm-setup (binary)
//!     │
//!     ├── config::InstallConfig  (flags, env vars, ghc-wasm-setup.toml)
//!     ├── host::HostProfile      (per-host artifact names)
//!     ├── preflight              (curl, unzip, tar, xz)
//!     └── install::Installer
//!             ├── fetch          (autogen.json catalog, curl | tar)
//!             ├── freshness      (marker paths gate re-downloads)
//!             ├── process        (CommandRunner seam)
//!             └── env_file       (<prefix>/env)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use ghc_wasm_setup::config::{InheritedEnv, InstallConfig, Overrides};
//! use ghc_wasm_setup::host::{HostPlatform, HostProfile};
//! use ghc_wasm_setup::install::Installer;
//! use ghc_wasm_setup::process::SystemRunner;
//!
//! let config = InstallConfig::resolve(Overrides::default(), InheritedEnv::from_process())?;
//! let platform = HostPlatform::detect(&config.flavour)?;
//! let profile = HostProfile::resolve(platform, &config.flavour);
//! Installer::new(&config, &profile, &SystemRunner)?.run()?;
//! ```

pub mod config;
pub mod env_file;
pub mod fetch;
pub mod filesystem;
pub mod freshness;
pub mod host;
pub mod install;
pub mod preflight;
pub mod process;

pub use config::{InheritedEnv, InstallConfig, Overrides};
pub use host::{HostPlatform, HostProfile};
pub use install::{InstallError, Installer};
pub use process::{CommandRunner, ProcessError, SystemRunner};
