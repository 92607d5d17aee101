//! Sender and receiver state machines for a reliable datagram transport.
//!
//! `rdt-proto` owns the wire format; this crate owns everything stateful
//! built on top of it: the handshake, batched selective-repeat delivery,
//! keep-alives, and the fault-injection hooks used to exercise recovery.

mod error;
mod inject;
mod keepalive;
mod receiver;
mod sender;
mod socket;
mod timing;

pub use error::{ReceiverError, SenderError};
pub use inject::CorruptionConfig;
pub use keepalive::KeepAliveHandle;
pub use receiver::{Delivery, PostDelivery, Receiver, ReceiverConfig};
pub use sender::{Payload, Sender, SenderConfig, TransferOptions};
pub use socket::DatagramSocket;
pub use timing::{
    HANDSHAKE_TIMEOUT, INTER_FRAGMENT_TIMEOUT, KEEPALIVE_INTERVAL, POST_DELIVERY_IDLE_TIMEOUT,
};
