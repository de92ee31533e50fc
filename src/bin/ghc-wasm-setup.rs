use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use ghc_wasm_setup::config::{InheritedEnv, InstallConfig, Overrides};
use ghc_wasm_setup::fetch::FetchError;
use ghc_wasm_setup::host::{HostError, HostPlatform, HostProfile};
use ghc_wasm_setup::install::Installer;
use ghc_wasm_setup::preflight::check_host_tools;
use ghc_wasm_setup::process::{ProcessError, SystemRunner};

const DEFAULT_LOG_FILTER: &str = "ghc_wasm_setup=info";

/// Install the GHC wasm32-wasi cross toolchain.
#[derive(Debug, Parser)]
#[command(name = "ghc-wasm-setup", version, about)]
struct Cli {
    /// Installation prefix [default: $HOME/.ghc-wasm]
    #[arg(long, env = "PREFIX", global = true)]
    prefix: Option<PathBuf>,

    /// GHC flavour to install [default: 9.12]
    #[arg(long, env = "FLAVOUR", global = true)]
    flavour: Option<String>,

    /// Take the WASI SDK from this upstream CI pipeline instead of autogen.json
    #[arg(long, env = "UPSTREAM_WASI_SDK_PIPELINE_ID", global = true)]
    upstream_wasi_sdk_pipeline_id: Option<String>,

    /// Directory holding autogen.json and the cabal config templates [default: .]
    #[arg(long, global = true)]
    workdir: Option<PathBuf>,

    /// Installer config file [default: <workdir>/ghc-wasm-setup.toml]
    #[arg(long = "config", global = true)]
    config_file: Option<PathBuf>,

    /// curl --retry count
    #[arg(long, env = "GHC_WASM_SETUP_RETRIES", global = true)]
    retries: Option<u32>,

    /// curl --connect-timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    connect_timeout: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Install everything (default)
    Install {
        /// Set up the SDK, env file and cabal without building GHC
        #[arg(long)]
        skip_ghc: bool,
    },
    /// Set up the SDK and env file only, then print GHC's configure arguments
    Env,
    /// Print the resolved host profile
    Host,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

fn main() -> ExitCode {
    init_tracing();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

/// A failed child's own exit code, or 1.
fn exit_code(err: &anyhow::Error) -> u8 {
    let process = err.chain().find_map(|cause| {
        cause.downcast_ref::<ProcessError>().or_else(|| {
            match cause.downcast_ref::<FetchError>() {
                Some(FetchError::Process(inner)) => Some(inner),
                _ => None,
            }
        })
    });
    process
        .and_then(ProcessError::exit_code)
        .and_then(|code| u8::try_from(code).ok())
        .filter(|code| *code != 0)
        .unwrap_or(1)
}

fn run(cli: Cli) -> Result<()> {
    run_on(cli, HostPlatform::detect)
}

/// Everything after argument parsing, with host detection passed in.
///
/// Host detection runs before any preflight or install step, so an
/// unsupported platform leaves the filesystem untouched.
fn run_on(
    cli: Cli,
    detect: impl FnOnce(&str) -> Result<HostPlatform, HostError>,
) -> Result<()> {
    let command = cli.command.unwrap_or(Command::Install { skip_ghc: false });
    let skip_ghc = matches!(command, Command::Install { skip_ghc: true });

    let inherited = InheritedEnv::from_process();
    let config = InstallConfig::resolve(
        Overrides {
            prefix: cli.prefix,
            flavour: cli.flavour,
            upstream_wasi_sdk_pipeline_id: cli.upstream_wasi_sdk_pipeline_id,
            workdir: cli.workdir,
            config_file: cli.config_file,
            retries: cli.retries,
            connect_timeout_secs: cli.connect_timeout,
            skip_ghc,
        },
        inherited,
    )?;

    let platform = detect(&config.flavour)?;
    println!(
        "Selecting Host: ({}) with flavour: \"{}\"",
        platform, config.flavour
    );
    let profile = HostProfile::resolve(platform, &config.flavour);

    if let Command::Host = command {
        print_profile(&profile);
        return Ok(());
    }

    check_host_tools(&config.inherited, &config.workdir)?;

    let runner = SystemRunner;
    let installer = Installer::new(&config, &profile, &runner)?;
    match command {
        Command::Env => installer.run_env_only(),
        _ => installer.run(),
    }
}

fn print_profile(profile: &HostProfile) {
    println!("host        : {}", profile.triple);
    println!("flavour     : {}", profile.flavour);
    println!("wasi-sdk    : {}", profile.wasi_sdk);
    println!("wasi-sdk job: {} ({})", profile.wasi_sdk_job_name, profile.wasi_sdk_artifact_path);
    println!("binaryen    : {}", profile.binaryen);
    println!("cabal       : {}", profile.cabal);
    println!("ghc         : {}", profile.ghc);
    println!("wasmtime    : {}", profile.wasmtime);
    println!("nodejs      : {}", profile.nodejs);
    println!("configure   : {}", profile.configure_args());
}
