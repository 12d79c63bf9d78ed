//! Remote access to the command processing core.
//!
//! Each accepted TCP connection gets its own thread and its own
//! [`Session`](termcore_terminal::Session); the processor (registry and
//! translator) is shared read-only between them.

mod listener;

/// Accepts connections and serves one session per client.
pub use listener::RemoteListener;
