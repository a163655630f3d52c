//! Path pattern matching.
//!
//! # Responsibilities
//! - Parse `/literal/:param` patterns into segments
//! - Match request paths with exact arity
//! - Fall back to a trailing wildcard for the last `:param`
//!
//! # Design Decisions
//! - Empty segments are ignored on both sides (`//a/` == `/a`)
//! - Request segments are percent-decoded before comparison and capture
//! - Literal comparison is case-sensitive

use percent_encoding::percent_decode_str;

use crate::registry::Captures;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled route pattern such as `/time/:timezone`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        let segments = split(pattern)
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) if !name.is_empty() => Segment::Param(name.to_string()),
                _ => Segment::Literal(segment.to_string()),
            })
            .collect();
        Self { segments }
    }

    /// Parameter names in declaration order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match `path`, returning the captured parameters.
    pub fn matches(&self, path: &str) -> Option<Captures> {
        let segments: Vec<String> = split(path).map(decode).collect();
        self.match_exact(&segments)
            .or_else(|| self.match_trailing(&segments))
    }

    fn match_exact(&self, segments: &[String]) -> Option<Captures> {
        if segments.len() != self.segments.len() {
            return None;
        }
        Self::match_prefix(&self.segments, segments)
    }

    fn match_trailing(&self, segments: &[String]) -> Option<Captures> {
        let (Segment::Param(name), head) = self.segments.split_last()? else {
            return None;
        };
        // At least one remainder segment. `/time/` stays unmatched (404), so
        // an empty identifier never reaches a handler through routing.
        if segments.len() <= head.len() {
            return None;
        }

        let (prefix, rest) = segments.split_at(head.len());
        let mut captures = Self::match_prefix(head, prefix)?;
        captures.push(name.as_str(), rest.join("/"));
        Some(captures)
    }

    fn match_prefix(pattern: &[Segment], segments: &[String]) -> Option<Captures> {
        let mut captures = Captures::new();
        for (expected, actual) in pattern.iter().zip(segments) {
            match expected {
                Segment::Literal(literal) if literal == actual => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => captures.push(name.as_str(), actual.as_str()),
            }
        }
        Some(captures)
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn decode(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match() {
        let pattern = PathPattern::parse("/healthcheck");
        assert_eq!(pattern.matches("/healthcheck"), Some(Captures::new()));
        assert_eq!(pattern.matches("/healthcheck/"), Some(Captures::new()));
        assert_eq!(pattern.matches("/Healthcheck"), None);
        assert_eq!(pattern.matches("/healthcheck/extra"), None);
    }

    #[test]
    fn test_root_pattern_only_matches_root() {
        let pattern = PathPattern::parse("/");
        assert!(pattern.matches("/").is_some());
        assert!(pattern.matches("").is_some());
        assert!(pattern.matches("/anything").is_none());
    }

    #[test]
    fn test_exact_arity_capture() {
        let pattern = PathPattern::parse("/users/:id/posts/:post");
        let captures = pattern.matches("/users/42/posts/7").unwrap();
        assert_eq!(captures.get("id"), Some("42"));
        assert_eq!(captures.get("post"), Some("7"));
    }

    #[test]
    fn test_trailing_wildcard_captures_remainder() {
        let pattern = PathPattern::parse("/time/:timezone");
        let captures = pattern
            .matches("/time/America/Argentina/Buenos_Aires")
            .unwrap();
        assert_eq!(captures.get("timezone"), Some("America/Argentina/Buenos_Aires"));
    }

    #[test]
    fn test_trailing_wildcard_requires_one_segment() {
        let pattern = PathPattern::parse("/time/:timezone");
        assert!(pattern.matches("/time").is_none());
        assert!(pattern.matches("/time/").is_none());
    }

    #[test]
    fn test_literal_prefix_must_match_for_wildcard() {
        let pattern = PathPattern::parse("/time/:timezone");
        assert!(pattern.matches("/clock/Europe/Paris").is_none());
    }

    #[test]
    fn test_percent_decoding() {
        let pattern = PathPattern::parse("/time/:timezone");
        let encoded = pattern.matches("/time/America%2FNew_York").unwrap();
        let plain = pattern.matches("/time/America/New_York").unwrap();
        assert_eq!(encoded, plain);
        assert_eq!(encoded.get("timezone"), Some("America/New_York"));

        let spaced = pattern.matches("/time/Not%20A%20Zone").unwrap();
        assert_eq!(spaced.get("timezone"), Some("Not A Zone"));
    }

    #[test]
    fn test_wildcard_only_applies_to_trailing_param() {
        let pattern = PathPattern::parse("/zones/:zone/info");
        assert!(pattern.matches("/zones/Europe/Paris/info").is_none());
        assert!(pattern.matches("/zones/UTC/info").is_some());
    }

    #[test]
    fn test_param_names_in_order() {
        let pattern = PathPattern::parse("/a/:first/b/:second");
        assert_eq!(pattern.param_names().collect::<Vec<_>>(), vec!["first", "second"]);
    }
}
