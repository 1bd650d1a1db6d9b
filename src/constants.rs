// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 4000;
pub const WS_PATH: &str = "ws";

// Heartbeat sweep period; a connection that stays silent for one full
// interval is evicted on the next sweep
pub const DEFAULT_HEARTBEAT_SECS: u64 = 30;

// Inbound envelope size cap in bytes
pub const MAX_ENVELOPE_BYTES: usize = 65536;
