//! Reconnect policy and connection state machine
//!
//! The retry policy is a fixed delay, and the phase transitions are a pure
//! function over typed events, so both are testable without a network.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use contracts::{ConnectionPhase, ConnectionState};

use crate::error::ConnectionError;

/// Fixed-delay reconnect policy
///
/// Deliberately not exponential: recovery here happens at human scale and
/// a constant delay keeps worst-case reconnect latency predictable.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    /// Delay before each reconnect attempt
    pub backoff: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(5),
        }
    }
}

impl ReconnectPolicy {
    /// Create a policy with the given backoff
    pub fn new(backoff: Duration) -> Self {
        Self { backoff }
    }
}

/// Event driving the connection state machine
#[derive(Debug)]
pub enum ConnectionEvent {
    /// A connect attempt has started
    AttemptStarted,
    /// Both legs are live
    Established,
    /// A transport error occurred (connect, recv or publish)
    TransportError(ConnectionError),
    /// Clean shutdown requested
    Closed,
}

/// Pure phase transition function
///
/// Transitions depend only on the event today; the current phase stays in
/// the signature so the retry policy remains testable as a state machine.
pub fn next_phase(_current: ConnectionPhase, event: &ConnectionEvent) -> ConnectionPhase {
    match event {
        ConnectionEvent::AttemptStarted => ConnectionPhase::Connecting,
        ConnectionEvent::Established => ConnectionPhase::Connected,
        ConnectionEvent::TransportError(_) | ConnectionEvent::Closed => ConnectionPhase::Disconnected,
    }
}

/// Shared, read-mostly view of a connection pair's state
///
/// Only the owning reconnect loop writes; health reporting reads.
#[derive(Debug, Clone, Default)]
pub struct ConnectionStateHandle {
    inner: Arc<RwLock<ConnectionState>>,
}

impl ConnectionStateHandle {
    /// Create a handle in the Disconnected phase
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an event, updating phase and last error
    pub fn apply(&self, event: &ConnectionEvent) {
        let mut state = self.inner.write().unwrap_or_else(|e| e.into_inner());
        state.phase = next_phase(state.phase, event);
        if let ConnectionEvent::TransportError(err) = event {
            state.last_error = Some(err.to_string());
        }
    }

    /// Current state snapshot
    pub fn snapshot(&self) -> ConnectionState {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Whether the connection pair is currently usable
    pub fn is_connected(&self) -> bool {
        self.snapshot().is_connected()
    }
}
