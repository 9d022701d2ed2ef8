// URL pattern compilation and matching

use std::collections::HashMap;

/// One segment of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
}

/// A URL pattern compiled from a derived route path.
///
/// Patterns are plain segment sequences: `/users/:id` has a static
/// `users` segment followed by a named parameter. Matching a concrete
/// request path yields the captured parameter values, or `None` when the
/// path does not fit. Compilation assumes the pattern has already passed
/// derivation (no `?` markers); it never fails.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn compile(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Static(s.to_string()),
            })
            .collect();
        Self {
            raw: pattern.to_string(),
            segments,
        }
    }

    /// The pattern string this was compiled from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a concrete request path (no query string) against this
    /// pattern. Trailing slashes on the request path are ignored.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts.iter()) {
            match segment {
                Segment::Param(name) => {
                    params.insert(name.clone(), (*part).to_string());
                }
                Segment::Static(expected) => {
                    if expected != part {
                        return None;
                    }
                }
            }
        }

        Some(params)
    }
}
