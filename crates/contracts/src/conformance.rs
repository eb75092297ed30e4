//! ConformanceResult - schema validation outcome
//!
//! Computed fresh per message and forwarded to the writer; never persisted
//! by the checker itself. All three states are routine outcomes, not errors.

use serde::{Deserialize, Serialize};

/// Conformance status of a payload against its bound expected schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConformanceStatus {
    /// Top-level keys are a superset of the expected schema
    Conformant,
    /// Expected keys missing or payload not an object
    NonConformant,
    /// No binding exists for the topic (normal for most raw topics)
    Unbound,
}

impl ConformanceStatus {
    /// Stable lowercase label, used for store columns and metric tags
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conformant => "conformant",
            Self::NonConformant => "non_conformant",
            Self::Unbound => "unbound",
        }
    }
}

/// Result of checking one payload against its binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConformanceResult {
    /// Overall status
    pub status: ConformanceStatus,

    /// One entry per missing expected key, or a single parse-failure note
    pub violations: Vec<String>,

    /// Proposal id of the binding that was checked, if any
    pub bound_id: Option<String>,
}

impl ConformanceResult {
    /// Unbound result (no binding for the topic)
    pub fn unbound() -> Self {
        Self {
            status: ConformanceStatus::Unbound,
            violations: Vec::new(),
            bound_id: None,
        }
    }

    /// Conformant result for the given binding
    pub fn conformant(bound_id: impl Into<String>) -> Self {
        Self {
            status: ConformanceStatus::Conformant,
            violations: Vec::new(),
            bound_id: Some(bound_id.into()),
        }
    }

    /// Non-conformant result with its violations
    pub fn non_conformant(bound_id: Option<String>, violations: Vec<String>) -> Self {
        Self {
            status: ConformanceStatus::NonConformant,
            violations,
            bound_id,
        }
    }
}
