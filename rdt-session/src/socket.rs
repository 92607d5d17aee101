use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

/// The transport's view of a datagram socket.
///
/// Sender and receiver are written against this trait rather than
/// `std::net::UdpSocket` directly so tests can swap in an in-memory channel
/// that drops and corrupts datagrams deterministically, without touching a
/// real network interface. Implementations must be safe to share between the
/// session thread and the keep-alive thread via `Arc`.
pub trait DatagramSocket: Send + Sync {
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize>;
    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

impl DatagramSocket for UdpSocket {
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, buf, addr)
    }

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::recv_from(self, buf)
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        UdpSocket::set_read_timeout(self, timeout)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        UdpSocket::local_addr(self)
    }
}

/// Returns `true` if `err` represents a read timing out rather than a real
/// I/O failure. Platforms disagree on which kind a blocking-socket deadline
/// surfaces as, so both are treated as "no datagram arrived in time".
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}
