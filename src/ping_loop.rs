use crate::icmp::v4::{build_echo_request, parse_reply, SequenceNumber, Socket, PAYLOAD_SIZE};
use crate::statistics::{SessionCounters, Summary, SummaryKind};
use crate::timing::{Clock, TimingTracker};
use crate::{Cancellation, PingError, PingConfig};
use rand::Rng;
use std::io::{self, Write};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

// Room for a maximal IPv4 header in front of the echo reply.
const RECV_BUFFER_LEN: usize = 256;

// Interrupt counts at which a wait gives up.
const ABORT_WAIT: u32 = 1;
const ABORT_DRAIN: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Idle,
    Sending,
    WaitingReply,
    Reporting,
    Pacing,
    Draining,
    FinalReport,
    Terminated,
}

#[derive(PartialEq, Eq)]
enum Wait {
    Replied,
    Interrupted,
}

/// Sends one echo request at a time to a single target and waits,
/// without a deadline, for its reply.
///
/// Report lines go to `out`. The loop only ends through `cancellation`.
pub struct PingLoop<S, C, W> {
    socket: S,
    target: Ipv4Addr,
    identifier: u16,
    payload: [u8; PAYLOAD_SIZE],
    config: PingConfig,
    cancellation: Cancellation,
    clock: C,
    out: W,
    tracker: TimingTracker,
    packets_sent: u32,
    packets_received: u32,
    state: State,
}

impl<S, C, W> PingLoop<S, C, W>
where
    S: Socket,
    C: Clock,
    W: Write,
{
    pub fn new(
        socket: S,
        target: Ipv4Addr,
        identifier: u16,
        config: PingConfig,
        cancellation: Cancellation,
        clock: C,
        out: W,
    ) -> Self {
        let mut payload = [0u8; PAYLOAD_SIZE];
        rand::thread_rng().fill(&mut payload[..]);
        PingLoop {
            socket,
            target,
            identifier,
            payload,
            config,
            cancellation,
            clock,
            out,
            tracker: TimingTracker::new(),
            packets_sent: 0,
            packets_received: 0,
            state: State::Idle,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn counters(&self) -> SessionCounters {
        SessionCounters {
            packets_sent: self.packets_sent,
            packets_received: self.packets_received,
            rtt_sum: self.tracker.rtt_sum(),
            anomaly_count: self.tracker.anomaly_count(),
        }
    }

    /// Pings until cancelled, then drains the request in flight and prints
    /// the final summary. Returns the final counters.
    pub fn run(&mut self) -> Result<SessionCounters, PingError> {
        let mut retry: Option<SequenceNumber> = None;
        while !self.cancellation.is_cancelled() {
            self.enter(State::Sending);
            let sequence_number = retry.take().unwrap_or_else(|| {
                self.packets_sent += 1;
                SequenceNumber::for_request(self.packets_sent)
            });

            match self.send(sequence_number) {
                Err(error) => {
                    tracing::warn!("could not send echo request {sequence_number}: {error}");
                    retry = Some(sequence_number);
                }
                Ok(()) => {
                    self.enter(State::WaitingReply);
                    if self.await_reply(ABORT_WAIT)? == Wait::Interrupted {
                        break;
                    }
                    self.enter(State::Reporting);
                    self.report(SummaryKind::Running)?;
                }
            }

            self.enter(State::Pacing);
            if self.cancellation.wait_timeout(self.config.interval) {
                break;
            }
        }

        self.drain()?;
        self.enter(State::FinalReport);
        self.report(SummaryKind::Final)?;
        self.enter(State::Terminated);
        Ok(self.counters())
    }

    fn send(&mut self, sequence_number: SequenceNumber) -> io::Result<()> {
        let packet = build_echo_request(sequence_number, self.identifier, &self.payload);
        self.tracker.start(sequence_number, self.clock.now());
        let addr: socket2::SockAddr = SocketAddr::new(IpAddr::V4(self.target), 0).into();
        if let Err(error) = self.socket.send_to(&packet, &addr) {
            self.tracker.abandon();
            return Err(error);
        }
        tracing::trace!("sent echo request {sequence_number} to {}", self.target);
        Ok(())
    }

    /// Reads datagrams until one is a reply to this session or the
    /// interrupt count reaches `abort_at`.
    fn await_reply(&mut self, abort_at: u32) -> Result<Wait, PingError> {
        let mut buf = [0u8; RECV_BUFFER_LEN];
        loop {
            if self.cancellation.interrupts() >= abort_at {
                return Ok(Wait::Interrupted);
            }
            let n = match self.socket.recv(&mut buf) {
                Ok(n) => n,
                Err(error) if is_retry(&error) => continue,
                Err(error) => {
                    tracing::error!("could not receive: {error}");
                    continue;
                }
            };
            let received_at = self.clock.now();

            let Some(reply) = parse_reply(&buf[..n], self.identifier) else {
                tracing::trace!("ignoring {n} byte datagram");
                continue;
            };
            if !reply.sequence_number.was_sent(self.packets_sent) {
                tracing::trace!("ignoring reply {} to a request never sent", reply.sequence_number);
                continue;
            }
            let Some(rtt) = self.tracker.stop(received_at) else {
                continue;
            };

            self.packets_received += 1;
            write!(
                self.out,
                "Reply from {}: packet_count={} RTT={rtt:.3} ms",
                reply.source, reply.sequence_number
            )?;
            self.out.flush()?;
            return Ok(Wait::Replied);
        }
    }

    fn drain(&mut self) -> Result<(), PingError> {
        self.enter(State::Draining);
        if self.tracker.in_flight().is_some() && self.packets_received < self.packets_sent {
            self.await_reply(ABORT_DRAIN)?;
        }
        Ok(())
    }

    fn report(&mut self, kind: SummaryKind) -> Result<(), PingError> {
        let counters = self.counters();
        write!(self.out, "{}", Summary { counters: &counters, kind })?;
        self.out.flush()?;
        Ok(())
    }

    fn enter(&mut self, state: State) {
        tracing::trace!("{:?} -> {:?}", self.state, state);
        self.state = state;
    }
}

// A poll expiry or EINTR is not an error; the read is simply repeated.
fn is_retry(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icmp::v4::echo_codec::tests::{echo_datagram, echo_reply_datagram};
    use crate::icmp::v4::socket::tests::{OnReceive, OnSend, SocketMock};
    use crate::timing::tests::SteppingClock;
    use crate::timing::Timestamp;
    use pnet_packet::icmp::IcmpTypes;
    use std::time::{Duration, Instant};

    const ID: u16 = 0x1234;
    const TARGET: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 7);
    const MILLI: i64 = 1_000_000;

    fn reply(sequence_number: u16) -> OnReceive {
        OnReceive::Datagram(echo_reply_datagram(ID, sequence_number, TARGET))
    }

    fn config(interval: Duration) -> PingConfig {
        PingConfig {
            interval,
            ..PingConfig::default()
        }
    }

    fn run_session(
        on_send: OnSend,
        script: Vec<OnReceive>,
        step_nanos: i64,
    ) -> (SocketMock, SessionCounters, String, State) {
        let cancellation = Cancellation::new();
        let socket = SocketMock::new(on_send, script, cancellation.clone());
        let clock = SteppingClock::new(Timestamp::new(100, 0), step_nanos);
        let mut out = Vec::new();
        let mut ping_loop = PingLoop::new(
            socket.clone(),
            TARGET,
            ID,
            config(Duration::ZERO),
            cancellation,
            clock,
            &mut out,
        );
        let counters = ping_loop.run().unwrap();
        let state = ping_loop.state();
        drop(ping_loop);
        (socket, counters, String::from_utf8(out).unwrap(), state)
    }

    fn sequence_of(packet: &[u8]) -> u16 {
        u16::from_be_bytes([packet[6], packet[7]])
    }

    #[test]
    fn session_ignores_strays_and_reports_every_exchange() {
        let script = vec![
            // request 1: a reply for another process first
            OnReceive::Datagram(echo_reply_datagram(ID + 1, 1, TARGET)),
            reply(1),
            // request 2
            OnReceive::WouldBlock,
            reply(2),
            // request 3: our own request looped back
            OnReceive::Datagram(echo_datagram(IcmpTypes::EchoRequest, ID, 3, TARGET, 0)),
            reply(3),
            // request 4
            OnReceive::Interrupted,
            OnReceive::Error,
            reply(4),
            // request 5: a sequence number never sent, then silence
            reply(9),
            OnReceive::WouldBlock,
        ];

        let (socket, counters, output, state) = run_session(OnSend::ReturnDefault, script, MILLI);

        assert_eq!(5, counters.packets_sent);
        assert_eq!(4, counters.packets_received);
        assert_eq!(20, counters.loss_percent());
        assert_eq!(State::Terminated, state);
        assert_eq!(4, output.matches("Reply from ").count());
        assert_eq!(4, output.matches("-PING SUMMARY-").count());
        assert_eq!(1, output.matches("FINAL PING SUMMARY").count());
        assert!(output.contains("Reply from 192.0.2.7: packet_count=1 RTT=2.000 ms\n"));
        assert!(output.ends_with(
            "5 packets sent, 4 received , 20% lost, average RTT = 1.500000\n\
             -------------------------------------------------------------------\n\n"
        ));
        socket
            .should_send_number_of_messages(5)
            .should_send_to_address(&IpAddr::V4(TARGET));
        let sequences: Vec<u16> = socket.sent().iter().map(|(packet, _)| sequence_of(packet)).collect();
        assert_eq!(vec![1, 2, 3, 4, 5], sequences);
    }

    #[test]
    fn cancellation_while_waiting_drains_once() {
        let script = vec![OnReceive::WouldBlock, OnReceive::Interrupt, reply(1)];

        let (socket, counters, output, state) = run_session(OnSend::ReturnDefault, script, MILLI);

        assert_eq!(1, counters.packets_sent);
        assert_eq!(1, counters.packets_received);
        assert_eq!(State::Terminated, state);
        assert_eq!(0, output.matches("-PING SUMMARY-").count());
        let reply_at = output.find("Reply from 192.0.2.7: packet_count=1").unwrap();
        let final_at = output.find("FINAL PING SUMMARY").unwrap();
        more_asserts::assert_lt!(reply_at, final_at);
        assert!(output.contains("1 packets sent, 1 received , 0% lost"));
        assert_eq!(3, socket.recv_calls());
        assert_eq!(0, socket.remaining_script_len());
        socket.should_deliver_number_of_datagrams(1);
    }

    #[test]
    fn second_interrupt_abandons_the_drain() {
        let (socket, counters, output, _) = run_session(OnSend::ReturnDefault, vec![], MILLI);

        // first recv interrupts the wait, second one the drain
        assert_eq!(2, socket.recv_calls());
        assert_eq!(1, counters.packets_sent);
        assert_eq!(0, counters.packets_received);
        assert!(output.contains("1 packets sent, 0 received , 100% lost, average RTT = 0.000000"));
    }

    #[test]
    fn failed_send_is_retried_with_the_same_sequence_number() {
        let (socket, counters, output, _) = run_session(OnSend::ReturnErrTimes(2), vec![reply(1)], MILLI);

        assert_eq!(2, counters.packets_sent);
        assert_eq!(1, counters.packets_received);
        let sequences: Vec<u16> = socket.sent().iter().map(|(packet, _)| sequence_of(packet)).collect();
        assert_eq!(vec![1, 2], sequences);
        assert_eq!(1, output.matches("-PING SUMMARY-").count());
        assert!(output.contains("2 packets sent, 1 received , 50% lost"));
    }

    #[test]
    fn cancelled_before_first_request() {
        let cancellation = Cancellation::new();
        let socket = SocketMock::new(OnSend::ReturnDefault, vec![], cancellation.clone());
        let clock = SteppingClock::new(Timestamp::new(0, 0), MILLI);
        let mut out = Vec::new();
        cancellation.interrupt();

        let counters = PingLoop::new(socket.clone(), TARGET, ID, config(Duration::ZERO), cancellation, clock, &mut out)
            .run()
            .unwrap();

        assert_eq!(0, counters.packets_sent);
        socket.should_send_number_of_messages(0);
        assert_eq!(0, socket.recv_calls());
        assert!(String::from_utf8(out).unwrap().contains("0 packets sent, 0 received , 0% lost"));
    }

    #[test]
    fn cancellation_while_pacing_skips_the_drain() {
        let cancellation = Cancellation::new();
        let socket = SocketMock::new(OnSend::ReturnDefault, vec![reply(1)], cancellation.clone());
        let clock = SteppingClock::new(Timestamp::new(0, 0), MILLI);
        let mut out = Vec::new();
        let interrupter = cancellation.clone();
        let start = Instant::now();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            interrupter.interrupt();
        });

        let counters = PingLoop::new(socket.clone(), TARGET, ID, config(Duration::from_secs(30)), cancellation, clock, &mut out)
            .run()
            .unwrap();
        handle.join().unwrap();

        more_asserts::assert_lt!(start.elapsed(), Duration::from_secs(10));
        assert_eq!(1, counters.packets_sent);
        assert_eq!(1, counters.packets_received);
        assert_eq!(1, socket.recv_calls());
    }

    #[test]
    fn clock_going_backwards_is_an_anomaly() {
        let (_, counters, output, _) = run_session(OnSend::ReturnDefault, vec![reply(1)], -MILLI);

        assert_eq!(1, counters.anomaly_count);
        assert_eq!(0.0, counters.rtt_sum);
        assert!(output.contains("packet_count=1 RTT=0.000 ms"));
        assert!(output.contains("1 packets sent, 1 received , 0% lost, average RTT = 0.000000"));
    }

    #[test]
    fn late_reply_to_an_earlier_request_is_counted() {
        // request 2 is answered by a delayed reply to request 1
        let script = vec![reply(1), reply(1)];

        let (_, counters, output, _) = run_session(OnSend::ReturnDefault, script, MILLI);

        assert_eq!(3, counters.packets_sent);
        assert_eq!(2, counters.packets_received);
        assert_eq!(2, output.matches("packet_count=1 ").count());
    }

    #[test]
    fn replies_to_unsent_sequence_numbers_are_ignored() {
        let script = vec![reply(0), reply(40_000), reply(2), reply(u16::MAX)];

        let (socket, counters, output, _) = run_session(OnSend::ReturnDefault, script, MILLI);

        assert_eq!(1, counters.packets_sent);
        assert_eq!(0, counters.packets_received);
        assert_eq!(0, output.matches("Reply from ").count());
        assert!(output.contains("1 packets sent, 0 received , 100% lost"));
        socket.should_deliver_number_of_datagrams(4);
    }

    #[test]
    fn starts_idle_with_zero_counters() {
        let cancellation = Cancellation::new();
        let socket = SocketMock::new(OnSend::ReturnDefault, vec![], cancellation.clone());
        let ping_loop = PingLoop::new(
            socket,
            TARGET,
            ID,
            PingConfig::default(),
            cancellation,
            SteppingClock::new(Timestamp::new(0, 0), MILLI),
            io::sink(),
        );
        assert_eq!(State::Idle, ping_loop.state());
        assert_eq!(SessionCounters::default(), ping_loop.counters());
    }
}
