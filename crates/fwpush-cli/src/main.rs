#![deny(unsafe_code)]

//! fwpush CLI — firmware versioning and post-build OTA upload.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use fwpush_config::AppConfig;
use fwpush_core::hook::{self, PostBuildContext, ProjectOptions};
use fwpush_core::{Credentials, UploadOutcome, UploadRequest, Uploader};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// fwpush — version firmware from git and push it to a device over HTTP.
#[derive(Parser)]
#[command(name = "fwpush", version = fwpush_core::build_info::LONG_VERSION, about, long_about = None)]
struct Cli {
    /// Path to the project configuration file.
    #[arg(short, long, default_value = fwpush_config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a firmware image to a device.
    Upload {
        /// Device address (host or host:port).
        ip: String,
        /// Basic-auth username.
        username: String,
        /// Basic-auth password.
        password: String,
        /// Firmware image to upload.
        firmware: PathBuf,
    },

    /// Upload the build output using the project configuration.
    PostBuild {
        /// Build output directory (overrides `build.build_dir`).
        #[arg(long)]
        build_dir: Option<PathBuf>,
        /// Program name (overrides `build.program_name`).
        #[arg(long)]
        program_name: Option<String>,
    },

    /// Derive the firmware version from git.
    Version {
        /// Print the `AUTO_VERSION` compiler flag.
        #[arg(long, conflicts_with = "cargo")]
        flag: bool,
        /// Print a Cargo build-script `rustc-env` directive.
        #[arg(long)]
        cargo: bool,
        /// Repository directory (defaults to the working directory).
        #[arg(short = 'C', long)]
        dir: Option<PathBuf>,
    },

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },
}

impl Commands {
    fn uses_config(&self) -> bool {
        matches!(self, Commands::PostBuild { .. } | Commands::Config { .. })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return usage_error(e),
    };

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Help and version go out as clap renders them; every other parse error
/// prints usage to stdout and exits 1.
fn usage_error(e: clap::Error) -> ExitCode {
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = e.print();
            ExitCode::SUCCESS
        }
        _ => {
            println!("{}", e.render());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = if cli.command.uses_config() {
        read_config(&cli.config).await?
    } else {
        None
    };
    init_tracing(
        cli.verbose,
        config.as_ref().map(|c| c.logging.level.as_str()),
    );
    if cli.command.uses_config() && config.is_none() {
        info!(path = %cli.config.display(), "Config file not found, using defaults");
    }
    let config = config.unwrap_or_default();

    match cli.command {
        Commands::Upload {
            ip,
            username,
            password,
            firmware,
        } => {
            let request = UploadRequest::new(ip, Credentials::new(username, password), firmware);
            cmd_upload(&request).await
        }
        Commands::PostBuild {
            build_dir,
            program_name,
        } => cmd_post_build(&config, build_dir, program_name).await,
        Commands::Version { flag, cargo, dir } => cmd_version(flag, cargo, dir.as_deref()),
        Commands::Config { show } => cmd_config(&cli.config, &config, show),
    }
}

fn init_tracing(verbose: u8, configured: Option<&str>) {
    // Logs go to stderr so stdout stays usable as a build-flag list.
    let filter = match verbose {
        0 => configured.unwrap_or("info"),
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn cmd_upload(request: &UploadRequest) -> Result<ExitCode> {
    println!("Custom HTTP Upload Script");
    println!(
        "Uploading {} to {} ...",
        request.firmware().display(),
        request.url()
    );

    let outcome = Uploader::new()?.upload(request).await?;
    Ok(report(&outcome))
}

async fn cmd_post_build(
    config: &AppConfig,
    build_dir: Option<PathBuf>,
    program_name: Option<String>,
) -> Result<ExitCode> {
    let ctx = PostBuildContext::new(
        build_dir.unwrap_or_else(|| config.build.build_dir.clone()),
        program_name.unwrap_or_else(|| config.build.program_name.clone()),
    );
    let options = ProjectOptions::from(&config.project);

    let request = hook::prepare(&ctx, &options)?;
    println!(
        "Uploading {} to {} ...",
        request.firmware().display(),
        request.url()
    );

    let uploader = Uploader::new()?;
    let result = hook::deliver(&request, &uploader).await;
    let code = hook::hook_exit_code(&result);
    report(&result?);
    Ok(ExitCode::from(code))
}

fn report(outcome: &UploadOutcome) -> ExitCode {
    println!("{}", outcome.summary());
    println!("{}", outcome.body);
    ExitCode::from(outcome.exit_code())
}

fn cmd_version(flag: bool, cargo: bool, dir: Option<&Path>) -> Result<ExitCode> {
    let version = match dir {
        Some(dir) => fwpush_version::derive_version_in(dir),
        None => fwpush_version::derive_version(),
    }
    .context("cannot derive firmware version")?;

    eprintln!("Firmware Revision: {version}");
    if flag {
        println!("{}", version.build_flag());
    } else if cargo {
        println!("{}", version.cargo_rustc_env());
    } else {
        println!("{version}");
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_config(config_path: &Path, config: &AppConfig, show: bool) -> Result<ExitCode> {
    if show {
        let toml_str = toml::to_string_pretty(config).context("TOML error")?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
    }
    Ok(ExitCode::SUCCESS)
}

/// Load the config file if it exists.
async fn read_config(path: &Path) -> Result<Option<AppConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let config = AppConfig::load(path)
        .await
        .with_context(|| format!("invalid config '{}'", path.display()))?;
    Ok(Some(config))
}
