//! Connection state and quality-of-service contracts
//!
//! The reconnect loop is the only writer of ConnectionState; health
//! reporting reads it through a shared handle.

use serde::{Deserialize, Serialize};

/// Phase of a bus connection as driven by the reconnect loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPhase {
    /// Not connected; a reconnect attempt is pending
    #[default]
    Disconnected,
    /// Connect in progress
    Connecting,
    /// Both legs live, message loop running
    Connected,
}

/// Observable state of a bridge/intake connection pair
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionState {
    /// Current phase
    pub phase: ConnectionPhase,

    /// Last transport error message, if any
    pub last_error: Option<String>,
}

impl ConnectionState {
    /// Whether the connection is currently usable
    pub fn is_connected(&self) -> bool {
        self.phase == ConnectionPhase::Connected
    }
}

/// Publish/subscribe quality-of-service level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum QosLevel {
    /// Fire and forget
    AtMostOnce,
    /// Acknowledged delivery
    #[default]
    AtLeastOnce,
    /// Exactly-once handshake
    ExactlyOnce,
}

impl QosLevel {
    /// Numeric wire level (0/1/2)
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::AtMostOnce => 0,
            Self::AtLeastOnce => 1,
            Self::ExactlyOnce => 2,
        }
    }
}

impl TryFrom<u8> for QosLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            other => Err(format!("qos must be 0, 1 or 2, got {other}")),
        }
    }
}

impl From<QosLevel> for u8 {
    fn from(qos: QosLevel) -> u8 {
        qos.as_u8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qos_roundtrip() {
        for level in [0u8, 1, 2] {
            let qos = QosLevel::try_from(level).unwrap();
            assert_eq!(qos.as_u8(), level);
        }
        assert!(QosLevel::try_from(3).is_err());
    }

    #[test]
    fn test_qos_serde_numeric() {
        let qos: QosLevel = serde_json::from_str("2").unwrap();
        assert_eq!(qos, QosLevel::ExactlyOnce);
        assert_eq!(serde_json::to_string(&qos).unwrap(), "2");
    }

    #[test]
    fn test_default_phase_is_disconnected() {
        let state = ConnectionState::default();
        assert_eq!(state.phase, ConnectionPhase::Disconnected);
        assert!(!state.is_connected());
    }
}
