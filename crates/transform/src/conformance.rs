//! Conformance checker
//!
//! Validates a decoded payload against its bound expected schema. The
//! schema is a lower bound on top-level keys: missing keys are violations,
//! extra keys are tolerated.

use contracts::{Binding, ConformanceResult};
use serde_json::Value;

/// Check a decoded payload against its binding.
///
/// - No binding for the topic: `Unbound`, empty violations
/// - Payload not a JSON object: `NonConformant` with one violation
/// - Otherwise conformant iff top-level keys are a superset of the
///   expected schema; each missing key yields a distinct violation
pub fn check(payload: &Value, binding: Option<&Binding>) -> ConformanceResult {
    let Some(binding) = binding else {
        return ConformanceResult::unbound();
    };

    let Some(object) = payload.as_object() else {
        return ConformanceResult::non_conformant(
            Some(binding.proposal_id.clone()),
            vec![format!("payload is not a JSON object: {payload}")],
        );
    };

    let violations: Vec<String> = binding
        .expected_schema
        .iter()
        .filter(|key| !object.contains_key(*key))
        .map(|key| format!("missing expected key '{key}'"))
        .collect();

    if violations.is_empty() {
        ConformanceResult::conformant(binding.proposal_id.clone())
    } else {
        ConformanceResult::non_conformant(Some(binding.proposal_id.clone()), violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ConformanceStatus;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn binding(keys: &[&str]) -> Binding {
        Binding {
            topic: "raw/x".into(),
            expected_schema: keys.iter().map(|k| k.to_string()).collect::<BTreeSet<_>>(),
            proposal_id: "p-1".into(),
        }
    }

    #[test]
    fn test_no_binding_is_unbound() {
        let result = check(&json!({"a": 1}), None);
        assert_eq!(result.status, ConformanceStatus::Unbound);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_superset_is_conformant() {
        let payload = json!({"a": 1, "b": 2, "c": 3});
        let result = check(&payload, Some(&binding(&["a", "b"])));
        assert_eq!(result.status, ConformanceStatus::Conformant);
        assert!(result.violations.is_empty());
        assert_eq!(result.bound_id.as_deref(), Some("p-1"));
    }

    #[test]
    fn test_missing_key_is_single_violation() {
        let payload = json!({"a": 1, "b": 2, "c": 3});
        let result = check(&payload, Some(&binding(&["a", "b", "d"])));
        assert_eq!(result.status, ConformanceStatus::NonConformant);
        assert_eq!(result.violations.len(), 1);
        assert!(result.violations[0].contains("'d'"));
    }

    #[test]
    fn test_each_missing_key_reported() {
        let payload = json!({"a": 1});
        let result = check(&payload, Some(&binding(&["a", "b", "c"])));
        assert_eq!(result.violations.len(), 2);
    }

    #[test]
    fn test_non_object_payload_non_conformant() {
        let payload = json!([1, 2, 3]);
        let result = check(&payload, Some(&binding(&["a"])));
        assert_eq!(result.status, ConformanceStatus::NonConformant);
        assert_eq!(result.violations.len(), 1);
        assert!(result.violations[0].contains("not a JSON object"));
    }

    #[test]
    fn test_empty_schema_always_conformant() {
        let result = check(&json!({}), Some(&binding(&[])));
        assert_eq!(result.status, ConformanceStatus::Conformant);
    }
}
