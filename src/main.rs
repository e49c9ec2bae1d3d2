use anyhow::Context;
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error};

use ssb_runtime_host::browser::{LaunchServicesResolver, UrlOpener};
use ssb_runtime_host::{telemetry, Dispatcher, HostConfig, IdentityInfo};

/// Native messaging host for SSB apps.
///
/// Started by the browser; speaks length-prefixed JSON on stdin/stdout.
#[derive(Debug, Parser)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Print the app version and exit.
    #[arg(short = 'v', long = "version")]
    print_version: bool,

    /// Config file (defaults to $SSB_HOST_CONFIG).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Arguments the browser appends (caller origin, manifest path, ...).
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    caller: Vec<String>,
}

fn bootstrap(cli: &Cli) -> anyhow::Result<(HostConfig, IdentityInfo)> {
    let config = HostConfig::load(cli.config.as_deref()).context("loading config")?;
    let identity = IdentityInfo::load(&config.identity).context("resolving app identity")?;
    Ok((config, identity))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Version mode prints to stdout and skips logging setup entirely.
    if cli.print_version {
        return match bootstrap(&cli) {
            Ok((_, identity)) => {
                println!("{}", identity.app_version);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{e:#}");
                ExitCode::FAILURE
            }
        };
    }

    let config = match HostConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut logging = match telemetry::init(&config.log, config.identity.app_id.as_deref()) {
        Ok(t) => {
            debug!(log_file = ?t.log_file(), "logging initialised");
            Some(t)
        }
        Err(e) => {
            eprintln!("{e}");
            None
        }
    };

    if !cli.caller.is_empty() {
        debug!(args = ?cli.caller, "launched by browser");
    }

    let identity = match IdentityInfo::load(&config.identity) {
        Ok(id) => id,
        Err(e) => {
            error!(error = %e, "unable to resolve app identity");
            return ExitCode::FAILURE;
        }
    };
    debug!(
        version = %identity.app_version,
        id = %identity.app_id,
        name = %identity.app_short_name,
        display_name = %identity.app_display_name,
        "app info set"
    );
    if let Some(t) = logging.as_mut() {
        t.follow_app(&config.log, Some(&identity.app_id));
        debug!(log_file = ?t.log_file(), "app log selected");
    }

    let opener = UrlOpener::system(LaunchServicesResolver::new(&config.browser), &config.browser);
    let mut dispatcher =
        Dispatcher::new(identity, opener).with_max_send_failures(config.transport.max_send_failures);

    let outcome = dispatcher.run(&mut io::stdin().lock(), &mut io::stdout().lock());
    ExitCode::from(outcome.exit_code() as u8)
}
