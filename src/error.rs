//! Registration-time errors.
//!
//! Every error here is raised while the server is being set up and is meant
//! to abort startup. Runtime outcomes such as "no route matched" are
//! not errors; they flow through [`Context::fail`](crate::context::Context::fail).

use std::fmt;
use std::path::PathBuf;

use http::Method;

/// What was wrong with a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternErrorKind {
    /// A `:` or `*` segment without a name after it.
    EmptyWildcardName {
        /// The offending segment (`":"` or `"*"`)
        segment: String,
    },
    /// A `*name` segment followed by more segments.
    CatchAllNotLast {
        /// The catch-all segment that was not last
        segment: String,
    },
}

/// Malformed route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternError {
    /// The pattern as given to the router
    pub pattern: String,
    /// The reason it was rejected
    pub kind: PatternErrorKind,
}

impl PatternError {
    pub(crate) fn new(pattern: &str, kind: PatternErrorKind) -> Self {
        Self {
            pattern: pattern.to_string(),
            kind,
        }
    }
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            PatternErrorKind::EmptyWildcardName { segment } => write!(
                f,
                "invalid route pattern '{}': segment '{}' needs a name after the wildcard",
                self.pattern, segment
            ),
            PatternErrorKind::CatchAllNotLast { segment } => write!(
                f,
                "invalid route pattern '{}': catch-all segment '{}' must be the last segment",
                self.pattern, segment
            ),
        }
    }
}

impl std::error::Error for PatternError {}

/// Two patterns resolved to the same trie node.
///
/// The first registration stays in place and remains resolvable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteConflictError {
    /// HTTP method both routes were registered under
    pub method: Method,
    /// Pattern that already owns the node
    pub existing: String,
    /// Pattern whose registration was rejected
    pub attempted: String,
}

impl fmt::Display for RouteConflictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "route conflict for {}: '{}' resolves to the same node as the already registered '{}'",
            self.method, self.attempted, self.existing
        )
    }
}

impl std::error::Error for RouteConflictError {}

/// Any failure raised by the registration API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The route pattern is malformed
    Pattern(PatternError),
    /// The route collides with an earlier registration
    Conflict(RouteConflictError),
    /// A group prefix that would cover everything (`""` or `"/"`)
    InvalidPrefix {
        /// The prefix as given
        prefix: String,
    },
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::Pattern(e) => e.fmt(f),
            RegistrationError::Conflict(e) => e.fmt(f),
            RegistrationError::InvalidPrefix { prefix } => write!(
                f,
                "invalid group prefix '{}': a group prefix needs at least one character after '/'",
                prefix
            ),
        }
    }
}

impl std::error::Error for RegistrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegistrationError::Pattern(e) => Some(e),
            RegistrationError::Conflict(e) => Some(e),
            RegistrationError::InvalidPrefix { .. } => None,
        }
    }
}

impl From<PatternError> for RegistrationError {
    fn from(e: PatternError) -> Self {
        RegistrationError::Pattern(e)
    }
}

impl From<RouteConflictError> for RegistrationError {
    fn from(e: RouteConflictError) -> Self {
        RegistrationError::Conflict(e)
    }
}

/// Failure while loading HTML templates from disk.
#[derive(Debug)]
pub enum TemplateError {
    /// The directory or a template file could not be read
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A template failed to parse
    Syntax(minijinja::Error),
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::Io { path, source } => {
                write!(f, "failed to read template '{}': {}", path.display(), source)
            }
            TemplateError::Syntax(e) => write!(f, "invalid template: {e}"),
        }
    }
}

impl std::error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TemplateError::Io { source, .. } => Some(source),
            TemplateError::Syntax(e) => Some(e),
        }
    }
}

impl From<minijinja::Error> for TemplateError {
    fn from(e: minijinja::Error) -> Self {
        TemplateError::Syntax(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_message_names_both_patterns() {
        let err = RouteConflictError {
            method: Method::GET,
            existing: "/users/:id".into(),
            attempted: "/users/:uid".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/users/:id"));
        assert!(msg.contains("/users/:uid"));
        assert!(msg.contains("GET"));
    }

    #[test]
    fn test_registration_error_wraps_source() {
        let err: RegistrationError = PatternError::new(
            "/a/:",
            PatternErrorKind::EmptyWildcardName {
                segment: ":".into(),
            },
        )
        .into();
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("/a/:"));
    }
}
