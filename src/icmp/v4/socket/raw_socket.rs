use super::Socket;
use socket2::{Domain, Protocol, Type};
use std::io::{self, Read};
use std::time::Duration;

/// Raw ICMPv4 socket. Reads return whole IPv4 datagrams, header included.
pub struct RawSocket {
    socket: socket2::Socket,
}

impl RawSocket {
    /// Opens the socket. Fails without `CAP_NET_RAW` or root.
    ///
    /// `poll_interval` bounds each individual read so the caller can observe
    /// cancellation; an expired read surfaces as `WouldBlock`/`TimedOut`.
    pub fn create(recv_buffer_size: usize, poll_interval: Duration) -> io::Result<Self> {
        tracing::trace!("creating raw ICMPv4 socket");
        let socket = socket2::Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))?;
        socket.set_recv_buffer_size(recv_buffer_size)?;
        socket.set_read_timeout(Some(poll_interval))?;
        Ok(RawSocket { socket })
    }
}

impl Socket for RawSocket {
    fn send_to(&self, buf: &[u8], addr: &socket2::SockAddr) -> io::Result<usize> {
        self.socket.send_to(buf, addr)
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        (&self.socket).read(buf)
    }
}
