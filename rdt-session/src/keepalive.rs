use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, trace};
use rdt_proto::encode_keepalive;

use crate::socket::DatagramSocket;

/// Handle to the background thread that keeps a session alive once a
/// transfer completes (§4.5).
///
/// The original tool cancelled its keep-alive thread with a shared
/// `threading.Event`; the same shape here is an `Arc<AtomicBool>` the thread
/// polls between sends.
pub struct KeepAliveHandle {
    cancel: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl KeepAliveHandle {
    /// Starts sending a KEEPALIVE fragment to `peer` every `interval` until
    /// cancelled.
    pub fn spawn(
        socket: Arc<dyn DatagramSocket>,
        peer: SocketAddr,
        interval: Duration,
    ) -> KeepAliveHandle {
        let cancel = Arc::new(AtomicBool::new(false));
        let thread_cancel = Arc::clone(&cancel);
        let poll = Duration::from_millis(100).min(interval);

        let join = thread::spawn(move || {
            let mut last_sent = Instant::now();
            while !thread_cancel.load(Ordering::Relaxed) {
                thread::sleep(poll);
                if thread_cancel.load(Ordering::Relaxed) {
                    break;
                }
                if last_sent.elapsed() >= interval {
                    trace!("sending keep-alive to {peer}");
                    if let Err(err) = socket.send_to(&encode_keepalive(), peer) {
                        debug!("keep-alive send to {peer} failed: {err}");
                    }
                    last_sent = Instant::now();
                }
            }
        });

        KeepAliveHandle {
            cancel,
            join: Some(join),
        }
    }

    /// Stops the keep-alive thread and waits for it to exit.
    pub fn cancel(mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for KeepAliveHandle {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}
