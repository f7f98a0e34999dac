//! Route pattern parsing.
//!
//! A pattern such as `/users/:id/files/*path` is split on `/` into segments.
//! Empty segments (leading, trailing or doubled slashes) are dropped, so
//! `/users/`, `users` and `//users` all describe the same route.
//!
//! Request paths go through the same split, then each segment is
//! percent-decoded on its own. An encoded `%2F` therefore stays inside its
//! segment and never creates a new one.

use std::borrow::Cow;

use smallvec::SmallVec;

use crate::error::{PatternError, PatternErrorKind};

/// Most request paths have ≤8 segments; deeper paths spill to the heap.
pub const MAX_INLINE_SEGMENTS: usize = 8;

/// Borrowed segments of a concrete request path.
pub type PathSegments<'a> = SmallVec<[&'a str; MAX_INLINE_SEGMENTS]>;

/// Percent-decoded segments of a request path. Segments without escapes
/// stay borrowed.
pub type DecodedSegments<'a> = SmallVec<[Cow<'a, str>; MAX_INLINE_SEGMENTS]>;

/// One `/`-delimited component of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Matched by exact, case-sensitive string equality
    Literal(String),
    /// `:name`, matches exactly one path segment
    Param(String),
    /// `*name`, matches the rest of the path (one or more segments)
    CatchAll(String),
}

impl Segment {
    fn classify(raw: &str) -> Segment {
        if let Some(name) = raw.strip_prefix(':') {
            Segment::Param(name.to_string())
        } else if let Some(name) = raw.strip_prefix('*') {
            Segment::CatchAll(name.to_string())
        } else {
            Segment::Literal(raw.to_string())
        }
    }
}

/// A validated route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parse and validate a route pattern.
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] when a segment is a bare `:` or `*`, or when
    /// a catch-all segment is followed by further segments.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let parts = split_path(raw);
        let mut segments = Vec::with_capacity(parts.len());

        for (i, part) in parts.iter().enumerate() {
            if *part == ":" || *part == "*" {
                return Err(PatternError::new(
                    raw,
                    PatternErrorKind::EmptyWildcardName {
                        segment: (*part).to_string(),
                    },
                ));
            }
            let segment = Segment::classify(part);
            if matches!(segment, Segment::CatchAll(_)) && i + 1 != parts.len() {
                return Err(PatternError::new(
                    raw,
                    PatternErrorKind::CatchAllNotLast {
                        segment: (*part).to_string(),
                    },
                ));
            }
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The pattern text as registered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

/// Split a concrete path into its non-empty segments.
///
/// No wildcard interpretation happens here: a request for `/files/:x` looks
/// up the literal text `:x`.
#[must_use]
pub fn split_path(path: &str) -> PathSegments<'_> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Split a request path and percent-decode each segment.
///
/// Invalid UTF-8 after decoding is replaced lossily rather than rejected, so
/// such a request still reaches the 404 handler.
#[must_use]
pub fn decode_path(path: &str) -> DecodedSegments<'_> {
    split_path(path).into_iter().map(decode_segment).collect()
}

/// The decoded path rebuilt as `/seg/seg`, or `/` when it has no segments.
///
/// Group prefixes are matched against this form so that doubled slashes or
/// escaped letters select the same groups as the route they reach.
#[must_use]
pub fn canonical_path(path: &str) -> String {
    let segments = decode_path(path);
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut out = String::with_capacity(path.len());
    for segment in &segments {
        out.push('/');
        out.push_str(segment);
    }
    out
}

fn decode_segment(segment: &str) -> Cow<'_, str> {
    if !segment.contains('%') {
        return Cow::Borrowed(segment);
    }
    match urlencoding::decode(segment) {
        Ok(decoded) => decoded,
        Err(_) => Cow::Owned(
            String::from_utf8_lossy(&urlencoding::decode_binary(segment.as_bytes())).into_owned(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_segments() {
        let p = Pattern::parse("/users/:id/files/*path").unwrap();
        assert_eq!(
            p.segments(),
            &[
                Segment::Literal("users".into()),
                Segment::Param("id".into()),
                Segment::Literal("files".into()),
                Segment::CatchAll("path".into()),
            ]
        );
        assert_eq!(p.as_str(), "/users/:id/files/*path");
    }

    #[test]
    fn test_slashes_are_normalized() {
        let a = Pattern::parse("/users/").unwrap();
        let b = Pattern::parse("users").unwrap();
        let c = Pattern::parse("//users//").unwrap();
        assert_eq!(a.segments(), b.segments());
        assert_eq!(b.segments(), c.segments());
    }

    #[test]
    fn test_root_has_no_segments() {
        assert!(Pattern::parse("/").unwrap().segments().is_empty());
        assert!(Pattern::parse("").unwrap().segments().is_empty());
    }

    #[test]
    fn test_bare_param_rejected() {
        let err = Pattern::parse("/a/:/ b").unwrap_err();
        assert_eq!(
            err.kind,
            PatternErrorKind::EmptyWildcardName {
                segment: ":".into()
            }
        );
        assert_eq!(err.pattern, "/a/:/ b");
    }

    #[test]
    fn test_bare_catch_all_rejected() {
        let err = Pattern::parse("/static/*").unwrap_err();
        assert_eq!(
            err.kind,
            PatternErrorKind::EmptyWildcardName {
                segment: "*".into()
            }
        );
    }

    #[test]
    fn test_catch_all_must_be_last() {
        let err = Pattern::parse("/static/*path/more").unwrap_err();
        assert_eq!(
            err.kind,
            PatternErrorKind::CatchAllNotLast {
                segment: "*path".into()
            }
        );
    }

    #[test]
    fn test_split_path_keeps_wildcard_text_literal() {
        let parts = split_path("/files/:x/*y/");
        assert_eq!(parts.as_slice(), &["files", ":x", "*y"]);
    }

    #[test]
    fn test_decode_path_decodes_each_segment() {
        let parts = decode_path("/users/john%20doe//a%2Fb/plain");
        assert_eq!(parts.as_slice(), &["users", "john doe", "a/b", "plain"]);
        assert!(matches!(parts[0], Cow::Borrowed(_)));
    }

    #[test]
    fn test_decode_path_tolerates_bad_escapes() {
        assert_eq!(decode_path("/100%").as_slice(), &["100%"]);
        assert_eq!(decode_path("/%ff").as_slice(), &["\u{fffd}"]);
    }

    #[test]
    fn test_canonical_path() {
        assert_eq!(canonical_path("//api/users"), "/api/users");
        assert_eq!(canonical_path("/%61pi/users/"), "/api/users");
        assert_eq!(canonical_path("///"), "/");
        assert_eq!(canonical_path(""), "/");
    }
}
