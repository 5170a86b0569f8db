#![warn(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

//! ICMP echo ("ping") over a raw IPv4 socket: one request in flight at a time,
//! running statistics, and a drain-then-report shutdown on interrupt.

pub use cancellation::Cancellation;
pub use ping_config::PingConfig;
pub use ping_error::{GenericError, PingError};
pub use ping_loop::{PingLoop, State};
pub use resolve::lookup_host_v4;
pub use statistics::{summary, SessionCounters, Summary, SummaryKind};
pub use timing::{Clock, MonotonicClock, Timestamp, TimingTracker};

pub mod checksum;
pub mod icmp;
pub mod timing;

mod cancellation;
mod ping_config;
mod ping_error;
mod ping_loop;
mod resolve;
mod statistics;

/// ICMP identifier for this process: the low 16 bits of its id.
pub fn process_identifier() -> u16 {
    let [_, _, hi, lo] = std::process::id().to_be_bytes();
    u16::from_be_bytes([hi, lo])
}
