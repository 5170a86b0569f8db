use crate::icmp::v4::SequenceNumber;
use std::time::Instant;

const NANOS_PER_SEC: i64 = 1_000_000_000;
const NANOS_PER_MILLI: f64 = 1_000_000.0;
const MILLIS_PER_SEC: f64 = 1_000.0;

/// A monotonic clock reading split into seconds and nanoseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timestamp {
    pub secs: i64,
    pub nanos: i64,
}

impl Timestamp {
    pub fn new(secs: i64, nanos: i64) -> Self {
        Timestamp { secs, nanos }
    }
}

/// Milliseconds from `begin` to `end`.
///
/// A negative nanosecond difference borrows one second. The result is
/// negative only if `end` really precedes `begin`.
#[allow(clippy::cast_precision_loss)]
pub fn elapsed_millis(begin: Timestamp, end: Timestamp) -> f64 {
    let mut secs = end.secs - begin.secs;
    let mut nanos = end.nanos - begin.nanos;
    if nanos < 0 {
        secs -= 1;
        nanos += NANOS_PER_SEC;
    }
    secs as f64 * MILLIS_PER_SEC + nanos as f64 / NANOS_PER_MILLI
}

pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Monotonic clock measured from its own creation.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        let elapsed = self.origin.elapsed();
        Timestamp {
            secs: i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX),
            nanos: i64::from(elapsed.subsec_nanos()),
        }
    }
}

/// Round-trip timing for the single request in flight.
#[derive(Debug, Default)]
pub struct TimingTracker {
    in_flight: Option<(SequenceNumber, Timestamp)>,
    rtt_sum: f64,
    anomaly_count: u32,
}

impl TimingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the send time of `sequence_number`, replacing any earlier request.
    pub fn start(&mut self, sequence_number: SequenceNumber, begin: Timestamp) {
        self.in_flight = Some((sequence_number, begin));
    }

    /// Completes the request in flight and returns its RTT in milliseconds.
    ///
    /// A negative RTT counts as an anomaly: it is reported as zero and left
    /// out of the running sum. Returns `None` if nothing is in flight.
    pub fn stop(&mut self, end: Timestamp) -> Option<f64> {
        let (sequence_number, begin) = self.in_flight.take()?;
        let rtt = elapsed_millis(begin, end);
        if rtt < 0.0 {
            tracing::warn!("negative round-trip time {rtt} ms for sequence {sequence_number}");
            self.anomaly_count += 1;
            return Some(0.0);
        }
        self.rtt_sum += rtt;
        Some(rtt)
    }

    /// Forgets the request in flight when it never left.
    pub fn abandon(&mut self) {
        self.in_flight = None;
    }

    pub fn in_flight(&self) -> Option<SequenceNumber> {
        self.in_flight.map(|(sequence_number, _)| sequence_number)
    }

    pub fn rtt_sum(&self) -> f64 {
        self.rtt_sum
    }

    pub fn anomaly_count(&self) -> u32 {
        self.anomaly_count
    }
}
