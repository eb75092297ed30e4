//! Store record types - Batch Worker / lineage output
//!
//! Grouped-write payloads handed to the persistent store: topic hierarchy
//! nodes and edges, per-message records with conformance attached, and
//! bridge lineage rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ConformanceStatus, TopicPath};

/// One node of the topic hierarchy (a path prefix)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopicNode {
    /// Full path of the node (unique key)
    pub path: String,

    /// Final segment of the path
    pub segment: String,

    /// Segment depth, root = 1
    pub depth: u32,
}

/// Parent to child edge in the topic hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopicEdge {
    /// Parent node path
    pub parent: String,

    /// Child node path
    pub child: String,
}

/// Persistent record of one ingested message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Topic the message arrived on
    pub topic: TopicPath,

    /// Publishing client identity
    pub publisher_id: String,

    /// Canonical display/embedding text of the payload
    pub canonical_text: String,

    /// Payload size in bytes
    pub payload_bytes: usize,

    /// Conformance outcome at ingest time
    pub conformance: ConformanceStatus,

    /// Violations recorded alongside the status (may be empty)
    pub violations: Vec<String>,

    /// Receipt timestamp
    pub received_at: DateTime<Utc>,
}

/// Lineage row linking a raw message to its curated republication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageRecord {
    /// Source raw topic
    pub raw_topic: TopicPath,

    /// Curated topic the message was republished to
    pub curated_topic: TopicPath,

    /// Mapping that produced the republication
    pub mapping_id: String,

    /// Republication timestamp
    pub produced_at: DateTime<Utc>,
}

impl TopicNode {
    /// Decompose a topic into its hierarchy nodes, root first.
    ///
    /// `"a/b/c"` yields nodes for `a`, `a/b` and `a/b/c`.
    pub fn nodes_for(topic: &TopicPath) -> Vec<TopicNode> {
        let mut out = Vec::new();
        let mut acc = String::new();
        for (idx, segment) in topic.segments().enumerate() {
            if !acc.is_empty() {
                acc.push('/');
            }
            acc.push_str(segment);
            out.push(TopicNode {
                path: acc.clone(),
                segment: segment.to_string(),
                depth: idx as u32 + 1,
            });
        }
        out
    }

    /// Parent-child edges between consecutive hierarchy nodes of a topic.
    pub fn edges_for(topic: &TopicPath) -> Vec<TopicEdge> {
        let nodes = Self::nodes_for(topic);
        nodes
            .windows(2)
            .map(|pair| TopicEdge {
                parent: pair[0].path.clone(),
                child: pair[1].path.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nodes_for_topic() {
        let topic = TopicPath::new("plant/line1/temp");
        let nodes = TopicNode::nodes_for(&topic);
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].path, "plant");
        assert_eq!(nodes[0].depth, 1);
        assert_eq!(nodes[2].path, "plant/line1/temp");
        assert_eq!(nodes[2].segment, "temp");
        assert_eq!(nodes[2].depth, 3);
    }

    #[test]
    fn test_edges_for_topic() {
        let topic = TopicPath::new("a/b/c");
        let edges = TopicNode::edges_for(&topic);
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].parent, "a");
        assert_eq!(edges[0].child, "a/b");
        assert_eq!(edges[1].parent, "a/b");
        assert_eq!(edges[1].child, "a/b/c");
    }

    #[test]
    fn test_single_segment_has_no_edges() {
        let topic = TopicPath::new("root");
        assert_eq!(TopicNode::nodes_for(&topic).len(), 1);
        assert!(TopicNode::edges_for(&topic).is_empty());
    }
}
