//! `pynetinstall`: unattended netinstall host for Mikrotik RouterBOARD
//! devices. See [`netinstall`] for the library this binary wires together.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use netinstall::config::{self, Config};
use netinstall::error::{FatalError, InstallError};
use netinstall::session::SessionConfig;
use netinstall::signal::Signals;
use netinstall::transport::{Interface, Transport};
use netinstall::{provider, supervisor};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Receive timeout applied to every socket read; a full 60 seconds tolerates
/// a slow or busy RouterBOARD without the session aborting spuriously.
const RECV_TIMEOUT: Duration = Duration::from_secs(60);

/// Unattended netinstall host for Mikrotik RouterBOARD devices.
#[derive(Debug, Parser)]
#[command(name = "pynetinstall", version, about)]
struct Args {
    /// Path to the INI configuration file.
    #[arg(short = 'c', long = "config", default_value_os_t = config::default_path())]
    config: PathBuf,

    /// Network interface name (e.g. `eth0`) or literal MAC address
    /// (`aa:bb:cc:dd:ee:ff`) to listen and broadcast on.
    #[arg(short = 'i', long = "interface")]
    interface: String,

    /// Path to a logging configuration file: extra `tracing` filter
    /// directives, one per line, layered on top of `-v`/`RUST_LOG`.
    #[arg(short = 'l', long = "logging")]
    logging: Option<PathBuf>,

    /// Raise the log level; repeatable (`-v` = debug, `-vv` = trace).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Flash exactly one device, then exit with its outcome.
    #[arg(short = '1', long = "oneshot")]
    oneshot: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.logging.as_deref());

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "exiting");
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn run(args: &Args) -> Result<(), InstallError> {
    let config = Config::load(&args.config)?;
    let interface = parse_interface(&args.interface)
        .map_err(|name| InstallError::Fatal(FatalError::InterfaceUnusable { name }))?;

    let transport = Transport::open(&interface, RECV_TIMEOUT)?;
    let signals = Signals::install().map_err(|source| {
        InstallError::Fatal(FatalError::FileUnreadable { path: "<signal handler>".into(), source })
    })?;
    let file_provider = provider::resolve(&config);

    supervisor::run(&transport, file_provider.as_ref(), &signals, SessionConfig::default(), args.oneshot)
}

/// Parse `--interface` as a literal MAC address if it looks like one
/// (`aa:bb:cc:dd:ee:ff`), otherwise as an OS interface name.
fn parse_interface(raw: &str) -> Result<Interface, String> {
    let octets: Vec<&str> = raw.split(':').collect();
    if octets.len() == 6 {
        let mut mac = [0u8; 6];
        for (slot, octet) in mac.iter_mut().zip(octets.iter()) {
            *slot = u8::from_str_radix(octet, 16).map_err(|_| raw.to_string())?;
        }
        return Ok(Interface::Mac(mac));
    }
    Ok(Interface::Name(raw.to_string()))
}

fn init_logging(verbose: u8, logging_file: Option<&std::path::Path>) {
    let base_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let mut directives = format!("netinstall={base_level},pynetinstall={base_level}");
    let mut unreadable_logging_file = None;
    if let Some(path) = logging_file {
        match std::fs::read_to_string(path) {
            Ok(extra) => {
                for line in extra.lines().map(str::trim).filter(|line| !line.is_empty()) {
                    directives.push(',');
                    directives.push_str(line);
                }
            }
            Err(err) => unreadable_logging_file = Some((path.to_path_buf(), err)),
        }
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Some((path, err)) = unreadable_logging_file {
        tracing::warn!(?path, %err, "could not read extra logging directives");
    }
}
