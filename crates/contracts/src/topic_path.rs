//! TopicPath - Cheap-to-clone topic identifier
//!
//! Uses Arc<str> internally for O(1) clone operations.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Slash-separated bus topic with cheap cloning.
///
/// Internally uses `Arc<str>` so cloning only increments a reference count
/// instead of allocating new memory. Topics are created once at receipt and
/// cloned on every cache lookup, batch record and lineage write, so the
/// cheap clone matters on the hot path.
///
/// # Examples
/// ```
/// use contracts::TopicPath;
///
/// let topic: TopicPath = "plant/line1/temperature".into();
/// let t2 = topic.clone();  // O(1) - just increments ref count
/// assert_eq!(topic, t2);
/// assert_eq!(topic.segments().count(), 3);
/// ```
#[derive(Clone, Default)]
pub struct TopicPath(Arc<str>);

impl TopicPath {
    /// Create a new TopicPath from a string slice.
    #[inline]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// Get the underlying string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate the slash-separated path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// First path segment, if any.
    pub fn first_segment(&self) -> Option<&str> {
        self.segments().next()
    }

    /// All ancestor paths from the root down, excluding the full path.
    ///
    /// `"a/b/c"` yields `"a"` then `"a/b"`.
    pub fn ancestors(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut acc = String::new();
        let segments: Vec<&str> = self.segments().collect();
        if segments.len() < 2 {
            return out;
        }
        for segment in &segments[..segments.len() - 1] {
            if !acc.is_empty() {
                acc.push('/');
            }
            acc.push_str(segment);
            out.push(acc.clone());
        }
        out
    }

    /// Whether this topic starts with the given path prefix.
    ///
    /// Matches whole segments only: `"curated/x"` has prefix `"curated"`
    /// but `"curatedx"` does not.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        let prefix = prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return false;
        }
        match self.0.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

// Deref to &str for easy string operations
impl Deref for TopicPath {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for TopicPath {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TopicPath {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TopicPath {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for TopicPath {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<&String> for TopicPath {
    #[inline]
    fn from(s: &String) -> Self {
        Self(Arc::from(s.as_str()))
    }
}

impl PartialEq for TopicPath {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for TopicPath {}

impl PartialEq<str> for TopicPath {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for TopicPath {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl Hash for TopicPath {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl fmt::Display for TopicPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TopicPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TopicPath({:?})", &*self.0)
    }
}

impl Serialize for TopicPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TopicPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_segments() {
        let topic = TopicPath::new("plant/line1/temperature");
        let segments: Vec<&str> = topic.segments().collect();
        assert_eq!(segments, vec!["plant", "line1", "temperature"]);
    }

    #[test]
    fn test_ancestors() {
        let topic = TopicPath::new("a/b/c");
        assert_eq!(topic.ancestors(), vec!["a".to_string(), "a/b".to_string()]);

        let single = TopicPath::new("a");
        assert!(single.ancestors().is_empty());
    }

    #[test]
    fn test_has_prefix_segment_aligned() {
        let topic = TopicPath::new("curated/plant/line1");
        assert!(topic.has_prefix("curated"));
        assert!(topic.has_prefix("curated/"));
        assert!(topic.has_prefix("curated/plant"));
        assert!(!topic.has_prefix("cur"));
        assert!(!topic.has_prefix("plant"));
        assert!(!topic.has_prefix(""));
    }

    #[test]
    fn test_map_lookup_by_str() {
        let mut map: HashMap<TopicPath, u32> = HashMap::new();
        map.insert("a/b".into(), 1);
        // Borrow<str> allows lookup without allocating a TopicPath
        assert_eq!(map.get("a/b"), Some(&1));
        assert_eq!(map.get("a/c"), None);
    }

    #[test]
    fn test_serde_roundtrip() {
        let topic = TopicPath::new("x/y");
        let json = serde_json::to_string(&topic).unwrap();
        assert_eq!(json, "\"x/y\"");
        let back: TopicPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, topic);
    }
}
