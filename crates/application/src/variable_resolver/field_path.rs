//! Field path accessors for `${name.path}` references.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// A parsed path such as `labels.instance` or `values[0]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// Parses dotted keys and bracketed indexes.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let mut segments = Vec::new();
        for part in path.split('.').filter(|p| !p.is_empty()) {
            let (key, mut rest) = part.find('[').map_or((part, ""), |i| part.split_at(i));
            if !key.is_empty() {
                segments.push(Segment::Key(key.to_string()));
            }
            while let Some(stripped) = rest.strip_prefix('[') {
                let Some(end) = stripped.find(']') else {
                    break;
                };
                let inner = stripped[..end].trim_matches(|c| c == '"' || c == '\'');
                segments.push(
                    inner
                        .parse()
                        .map_or_else(|_| Segment::Key(inner.to_string()), Segment::Index),
                );
                rest = &stripped[end + 1..];
            }
        }
        Self { segments }
    }

    /// Follows the path into `value`.
    #[must_use]
    pub fn get<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        self.segments
            .iter()
            .try_fold(value, |current, segment| match (segment, current) {
                (Segment::Key(key), Value::Object(map)) => map.get(key),
                (Segment::Key(key), Value::Array(items)) => {
                    key.parse::<usize>().ok().and_then(|i| items.get(i))
                }
                (Segment::Index(i), Value::Array(items)) => items.get(*i),
                (Segment::Index(i), Value::Object(map)) => map.get(&i.to_string()),
                _ => None,
            })
    }
}

/// Parsed paths keyed by their source text, so each path is parsed once.
#[derive(Debug, Default)]
pub struct FieldPathCache {
    paths: Mutex<HashMap<String, Arc<FieldPath>>>,
}

impl FieldPathCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the accessor for `path`, parsing it on first use.
    pub fn accessor(&self, path: &str) -> Arc<FieldPath> {
        let mut paths = self.paths.lock();
        Arc::clone(
            paths
                .entry(path.to_string())
                .or_insert_with(|| Arc::new(FieldPath::parse(path))),
        )
    }

    /// Number of cached paths.
    pub fn len(&self) -> usize {
        self.paths.lock().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
