use raw_ping::icmp::v4::RawSocket;
use raw_ping::{Cancellation, MonotonicClock, PingConfig, PingError, PingLoop};
use std::io::Write;
use std::process::ExitCode;
use tracing::Level;

/// Exit status after an interrupt, distinct from usage/setup failures (1).
const EXIT_CANCELLED: u8 = 42;
const EXIT_SETUP_FAILURE: u8 = 1;

const LOG_LEVEL_ENV: &str = "RAW_PING_LOG";

#[derive(argh::FromArgs)]
/// raw-ping - send ICMP ECHO_REQUEST packets to a host until interrupted
struct Args {
    #[argh(positional)]
    /// hostname or IPv4 address
    host: String,
}

fn main() -> ExitCode {
    let max_level = std::env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|level| level.parse::<Level>().ok())
        .unwrap_or(Level::WARN);
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(max_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(error) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("could not install log subscriber: {error}");
    }

    // argh exits with status 1 on usage errors.
    let args: Args = argh::from_env();

    let status = conclude(run(&args.host), &mut std::io::stdout(), &mut std::io::stderr());
    ExitCode::from(status)
}

/// Prints the exit notice or the setup error and picks the exit status.
fn conclude(result: Result<(), PingError>, out: &mut impl Write, err: &mut impl Write) -> u8 {
    // the process ends either way; a failed write has nowhere to be reported
    match result {
        Ok(()) => {
            let _ = write!(out, "\nExiting Ping Program\n");
            let _ = out.flush();
            EXIT_CANCELLED
        }
        Err(error) => {
            let _ = writeln!(err, "{error}");
            EXIT_SETUP_FAILURE
        }
    }
}

/// Runs a session against `host` until it is interrupted. The socket is
/// closed before returning.
fn run(host: &str) -> Result<(), PingError> {
    let cancellation = Cancellation::new();
    cancellation.install_interrupt_handler()?;

    let config = PingConfig::default();
    let socket = RawSocket::create(config.recv_buffer_size, config.poll_interval).map_err(|error| PingError {
        message: format!("socket error: {error}"),
        source: Some(Box::new(error)),
    })?;
    let target = raw_ping::lookup_host_v4(host)?;
    tracing::debug!("pinging {host} at {target}");

    let mut ping_loop = PingLoop::new(
        socket,
        target,
        raw_ping::process_identifier(),
        config,
        cancellation,
        MonotonicClock::new(),
        std::io::stdout(),
    );
    let counters = ping_loop.run()?;
    tracing::debug!("session ended: {counters:?}");
    Ok(())
}
