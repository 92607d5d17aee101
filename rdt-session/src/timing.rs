use std::time::Duration;

/// How long a client waits for its INIT echo before giving up (§4.1/§7).
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a receiver waits for the next fragment of a batch before
/// synthesizing a NAK for the remainder (§4.3).
pub const INTER_FRAGMENT_TIMEOUT: Duration = Duration::from_secs(1);

/// Keep-alive emission interval while a session is otherwise idle (§4.5).
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(25);

/// How long a receiver waits after delivering a payload before treating the
/// session as over (§4.3, post-delivery phase).
pub const POST_DELIVERY_IDLE_TIMEOUT: Duration = Duration::from_secs(30);
