use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use rdt_session::DatagramSocket;

/// Wraps a real loopback `UdpSocket` and silently drops sends at specific
/// call indices, so tests can force the NAK/retry path deterministically
/// instead of relying on real network loss.
pub struct LossySocket {
    inner: UdpSocket,
    send_count: AtomicUsize,
    drop_sends_at: Mutex<Vec<usize>>,
}

impl LossySocket {
    pub fn bind(addr: &str, drop_sends_at: Vec<usize>) -> io::Result<Self> {
        Ok(Self {
            inner: UdpSocket::bind(addr)?,
            send_count: AtomicUsize::new(0),
            drop_sends_at: Mutex::new(drop_sends_at),
        })
    }

    pub fn local_addr_unwrap(&self) -> SocketAddr {
        self.inner.local_addr().unwrap()
    }
}

impl DatagramSocket for LossySocket {
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize> {
        let index = self.send_count.fetch_add(1, Ordering::SeqCst);
        if self.drop_sends_at.lock().unwrap().contains(&index) {
            return Ok(buf.len());
        }
        self.inner.send_to(buf, addr)
    }

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.inner.recv_from(buf)
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.inner.set_read_timeout(timeout)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}
