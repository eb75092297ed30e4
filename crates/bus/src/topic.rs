//! Topic filter matching
//!
//! MQTT-style wildcard semantics: `+` matches exactly one path segment,
//! `#` matches any number of trailing segments (including zero) and must
//! be the final segment of the filter.

/// Whether a concrete topic matches a subscription filter.
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_segments = filter.split('/');
    let mut topic_segments = topic.split('/');

    loop {
        match (filter_segments.next(), topic_segments.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => continue,
            (Some(f), Some(t)) if f == t => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}
