//! Paths identifying where a binary leaf was removed from a state tree.
//!
//! On the wire a buffer path is a JSON array mixing string keys and integer
//! indexes, e.g. `["x", "ar"]` or `["y", 0]`. The front end walks the plain
//! state with these segments to splice each out-of-band buffer back in.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One step of a buffer path: a map key or a sequence index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Index into a sequence.
    Index(usize),
    /// Key into a map.
    Key(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Location of one extracted buffer, positionally aligned with the buffer
/// list it was extracted into.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BufferPath(Vec<PathSegment>);

impl BufferPath {
    /// Create an empty path (the state root).
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Return a new path with `segment` appended.
    #[must_use]
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    /// The path's segments, root first.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// `true` if the path has no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<PathSegment>> for BufferPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for BufferPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form_mixes_keys_and_indexes() {
        let path = BufferPath::from(vec![
            PathSegment::Key("y".to_string()),
            PathSegment::Index(1),
        ]);
        let json = serde_json::to_value(&path).unwrap();
        assert_eq!(json, serde_json::json!(["y", 1]));
    }

    #[test]
    fn parses_from_wire_form() {
        let path: BufferPath = serde_json::from_value(serde_json::json!(["x", "ar"])).unwrap();
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Key("x".to_string()),
                PathSegment::Key("ar".to_string())
            ]
        );
    }

    #[test]
    fn integer_segment_parses_as_index() {
        let path: BufferPath = serde_json::from_value(serde_json::json!([0])).unwrap();
        assert_eq!(path.segments(), &[PathSegment::Index(0)]);
    }
}
