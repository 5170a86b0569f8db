use std::io;

pub mod raw_socket;

/// Transport used by the ping loop.
///
/// `recv` returns one raw IPv4 datagram. Implementations may return
/// `WouldBlock`, `TimedOut` or `Interrupted` from `recv` to hand control back
/// to the caller without data; the caller retries.
pub trait Socket {
    fn send_to(&self, buf: &[u8], addr: &socket2::SockAddr) -> io::Result<usize>;
    fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;
}
