//! RawMessage / CuratedMessage - the pipeline's in-flight units
//!
//! A RawMessage is created on receipt, consumed once by the batch worker
//! and never mutated. A CuratedMessage is created once per successful
//! transform and republished downstream.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::TopicPath;

/// Raw, unvalidated message as received from the uncurated bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    /// Bus topic the message arrived on
    pub topic: TopicPath,

    /// Payload bytes as published (zero copy)
    pub payload: Bytes,

    /// Publishing client identity, when the topic namespace carries one
    pub publisher_id: String,

    /// Receipt timestamp (UTC wall clock)
    pub received_at: DateTime<Utc>,
}

impl RawMessage {
    /// Create a RawMessage stamped with the current time
    pub fn new(topic: impl Into<TopicPath>, payload: impl Into<Bytes>, publisher_id: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            publisher_id: publisher_id.into(),
            received_at: Utc::now(),
        }
    }

    /// Payload size in bytes
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

/// Normalized message derived from a RawMessage via an approved mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuratedMessage {
    /// Target topic on the curated bus
    pub curated_topic: TopicPath,

    /// Transformed payload (always a JSON object)
    pub payload: Value,

    /// Identifier of the mapping that produced this message
    pub source_mapping_id: String,

    /// Production timestamp (UTC wall clock)
    pub produced_at: DateTime<Utc>,
}

impl CuratedMessage {
    /// Create a CuratedMessage stamped with the current time
    pub fn new(
        curated_topic: impl Into<TopicPath>,
        payload: Value,
        source_mapping_id: impl Into<String>,
    ) -> Self {
        Self {
            curated_topic: curated_topic.into(),
            payload,
            source_mapping_id: source_mapping_id.into(),
            produced_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_message_construction() {
        let msg = RawMessage::new("plant/line1/temp", &b"{\"v\":1}"[..], "sensor-7");
        assert_eq!(msg.topic, "plant/line1/temp");
        assert_eq!(msg.payload_len(), 7);
        assert_eq!(msg.publisher_id, "sensor-7");
    }

    #[test]
    fn test_curated_message_serde() {
        let msg = CuratedMessage::new(
            "curated/plant/line1/temp",
            serde_json::json!({"temperature": 21.5}),
            "map-42",
        );
        let json = serde_json::to_string(&msg).unwrap();
        let back: CuratedMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.curated_topic, msg.curated_topic);
        assert_eq!(back.source_mapping_id, "map-42");
    }
}
