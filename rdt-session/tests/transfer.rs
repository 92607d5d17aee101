mod support;

use std::net::UdpSocket;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rdt_session::{
    CorruptionConfig, Delivery, Payload, Receiver, ReceiverConfig, Sender, SenderConfig,
    SenderError, TransferOptions,
};
use support::LossySocket;

fn fast_receiver_config() -> ReceiverConfig {
    ReceiverConfig {
        inter_fragment_timeout: Duration::from_millis(200),
        idle_timeout: Duration::from_millis(300),
    }
}

fn fast_sender_config() -> SenderConfig {
    SenderConfig {
        handshake_timeout: Duration::from_millis(500),
        keepalive_interval: Duration::from_millis(50),
    }
}

fn options_with(corruption: CorruptionConfig) -> TransferOptions {
    TransferOptions {
        fragment_size: 0,
        corruption,
    }
}

#[test]
fn message_round_trip() {
    let receiver_socket = Arc::new(UdpSocket::bind("127.0.0.1:0").unwrap());
    let receiver_addr = receiver_socket.local_addr().unwrap();
    let receiver = Receiver::new(receiver_socket, fast_receiver_config());

    let receiver_thread = thread::spawn(move || receiver.run_once().unwrap());

    let sender_socket = Arc::new(UdpSocket::bind("127.0.0.1:0").unwrap());
    let sender = Sender::new(sender_socket, receiver_addr, fast_sender_config());
    let keepalive = sender
        .send(
            Payload::Message(b"hello reliable world".to_vec()),
            options_with(CorruptionConfig::default()),
        )
        .unwrap();

    let delivery = receiver_thread.join().unwrap();
    assert_eq!(delivery, Delivery::Message("hello reliable world".to_string()));
    keepalive.cancel();
}

#[test]
fn file_round_trip() {
    let receiver_socket = Arc::new(UdpSocket::bind("127.0.0.1:0").unwrap());
    let receiver_addr = receiver_socket.local_addr().unwrap();
    let receiver = Receiver::new(receiver_socket, fast_receiver_config());

    let receiver_thread = thread::spawn(move || receiver.run_once().unwrap());

    let sender_socket = Arc::new(UdpSocket::bind("127.0.0.1:0").unwrap());
    let sender = Sender::new(sender_socket, receiver_addr, fast_sender_config());
    let bytes = vec![0xABu8; 4096];
    let keepalive = sender
        .send(
            Payload::File {
                name: "payload.bin".to_string(),
                bytes: bytes.clone(),
            },
            options_with(CorruptionConfig::default()),
        )
        .unwrap();

    let delivery = receiver_thread.join().unwrap();
    assert_eq!(
        delivery,
        Delivery::File {
            name: "payload.bin".to_string(),
            bytes,
        }
    );
    keepalive.cancel();
}

#[test]
fn continuing_transfer_skips_the_handshake() {
    let receiver_socket = Arc::new(UdpSocket::bind("127.0.0.1:0").unwrap());
    let receiver_addr = receiver_socket.local_addr().unwrap();
    let receiver = Receiver::new(receiver_socket, fast_receiver_config());

    let receiver_thread = thread::spawn(move || {
        let peer = receiver.await_handshake().unwrap();
        let first = receiver.receive_transfer(peer, None).unwrap();
        let second = match receiver.await_post_delivery(peer).unwrap() {
            rdt_session::PostDelivery::ContinuingTransfer(metadata) => {
                receiver.receive_transfer(peer, Some(metadata)).unwrap()
            }
            rdt_session::PostDelivery::Idle => panic!("expected a continuing transfer"),
        };
        (first, second)
    });

    let sender_socket = Arc::new(UdpSocket::bind("127.0.0.1:0").unwrap());
    let sender = Sender::new(sender_socket, receiver_addr, fast_sender_config());
    let keepalive = sender
        .send(Payload::Message(b"first".to_vec()), options_with(CorruptionConfig::default()))
        .unwrap();
    let second_keepalive = sender
        .continue_transfer(
            Payload::Message(b"second".to_vec()),
            options_with(CorruptionConfig::default()),
        )
        .unwrap();

    let (first, second) = receiver_thread.join().unwrap();
    assert_eq!(first, Delivery::Message("first".to_string()));
    assert_eq!(second, Delivery::Message("second".to_string()));
    keepalive.cancel();
    second_keepalive.cancel();
}

#[test]
fn recovers_a_dropped_fragment_via_nak() {
    let receiver_socket = Arc::new(UdpSocket::bind("127.0.0.1:0").unwrap());
    let receiver_addr = receiver_socket.local_addr().unwrap();
    let receiver = Receiver::new(receiver_socket, fast_receiver_config());

    let receiver_thread = thread::spawn(move || receiver.run_once().unwrap());

    // Call 0 is the INIT handshake, call 1 is the metadata fragment, call 2
    // is the sole DATA fragment for this short message: drop it once so the
    // receiver's inter-fragment timeout has to synthesize the NAK itself.
    let sender_socket = Arc::new(LossySocket::bind("127.0.0.1:0", vec![2]).unwrap());
    let sender = Sender::new(sender_socket, receiver_addr, fast_sender_config());
    let keepalive = sender
        .send(Payload::Message(b"short".to_vec()), options_with(CorruptionConfig::default()))
        .unwrap();

    let delivery = receiver_thread.join().unwrap();
    assert_eq!(delivery, Delivery::Message("short".to_string()));
    keepalive.cancel();
}

#[test]
fn recovers_from_injected_corruption() {
    let receiver_socket = Arc::new(UdpSocket::bind("127.0.0.1:0").unwrap());
    let receiver_addr = receiver_socket.local_addr().unwrap();
    let receiver = Receiver::new(receiver_socket, fast_receiver_config());

    let receiver_thread = thread::spawn(move || receiver.run_once().unwrap());

    let sender_socket = Arc::new(UdpSocket::bind("127.0.0.1:0").unwrap());
    let sender = Sender::new(sender_socket, receiver_addr, fast_sender_config());
    let keepalive = sender
        .send(
            Payload::Message(b"this message keeps getting mangled".to_vec()),
            options_with(CorruptionConfig::new(true, false)),
        )
        .unwrap();

    let delivery = receiver_thread.join().unwrap();
    assert_eq!(
        delivery,
        Delivery::Message("this message keeps getting mangled".to_string())
    );
    keepalive.cancel();
}

#[test]
fn handshake_times_out_when_nothing_is_listening() {
    let dead_end = {
        let probe = UdpSocket::bind("127.0.0.1:0").unwrap();
        probe.local_addr().unwrap()
    };

    let sender_socket = Arc::new(UdpSocket::bind("127.0.0.1:0").unwrap());
    let sender = Sender::new(sender_socket, dead_end, fast_sender_config());

    let result = sender.send(
        Payload::Message(b"nobody home".to_vec()),
        options_with(CorruptionConfig::default()),
    );
    assert!(matches!(result, Err(SenderError::HandshakeTimeout)));
}
