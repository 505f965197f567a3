//! Error types and handling for configuration resolution

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for configuration resolution
#[derive(Debug, Error)]
pub enum CascadeError {
    /// An `extends` reference could not be located by any fragment source
    #[error("Unresolved reference '{reference}'{}", format_referrer(.referenced_from))]
    UnresolvedReference {
        reference: String,
        referenced_from: Option<String>,
    },

    /// The `extends` graph loops back onto a fragment that is still being resolved
    #[error("Cyclic inheritance: {}", .chain.join(" -> "))]
    CyclicInheritance { chain: Vec<String> },

    /// A rule id is not registered under any enabled namespace
    #[error("Unknown rule '{rule_id}': {reason}")]
    UnknownRule { rule_id: String, reason: String },

    /// A severity token outside {off, warn, error} / {0, 1, 2}
    #[error("Invalid severity '{value}' for rule '{rule_id}'")]
    InvalidSeverity { rule_id: String, value: String },

    /// Rule options that do not fit the rule's declared arity/shape
    #[error("Invalid options for rule '{rule_id}': {reason}")]
    InvalidRuleOptions { rule_id: String, reason: String },

    /// A glob pattern that cannot be compiled
    #[error("Malformed glob pattern '{pattern}'{}: {reason}", format_origin(.origin))]
    MalformedGlobPattern {
        pattern: String,
        origin: Option<String>,
        reason: String,
    },

    /// A fragment or manifest document that does not deserialize
    #[error("Parse error in '{identity}': {message}")]
    ParseError { identity: String, message: String },

    /// File system I/O errors
    #[error("IO error for path '{path}': {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The engine has no usable configuration (e.g. after a failed reload)
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    InternalError { message: String },
}

fn format_referrer(referrer: &Option<String>) -> String {
    referrer
        .as_ref()
        .map(|from| format!(" (extended from '{from}')"))
        .unwrap_or_default()
}

fn format_origin(origin: &Option<String>) -> String {
    origin
        .as_ref()
        .map(|origin| format!(" in '{origin}'"))
        .unwrap_or_default()
}

/// Error kind enumeration for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnresolvedReference,
    CyclicInheritance,
    UnknownRule,
    InvalidSeverity,
    InvalidRuleOptions,
    MalformedGlobPattern,
    Parse,
    Io,
    Config,
    Internal,
}

impl CascadeError {
    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CascadeError::UnresolvedReference { .. } => ErrorKind::UnresolvedReference,
            CascadeError::CyclicInheritance { .. } => ErrorKind::CyclicInheritance,
            CascadeError::UnknownRule { .. } => ErrorKind::UnknownRule,
            CascadeError::InvalidSeverity { .. } => ErrorKind::InvalidSeverity,
            CascadeError::InvalidRuleOptions { .. } => ErrorKind::InvalidRuleOptions,
            CascadeError::MalformedGlobPattern { .. } => ErrorKind::MalformedGlobPattern,
            CascadeError::ParseError { .. } => ErrorKind::Parse,
            CascadeError::IoError { .. } => ErrorKind::Io,
            CascadeError::ConfigError { .. } => ErrorKind::Config,
            CascadeError::InternalError { .. } => ErrorKind::Internal,
        }
    }

    /// Check if this error is recoverable (other files can still be resolved)
    ///
    /// Errors that break the inheritance graph itself are fatal; errors that
    /// only concern one file's view of the configuration are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::UnknownRule
                | ErrorKind::InvalidSeverity
                | ErrorKind::InvalidRuleOptions
                | ErrorKind::MalformedGlobPattern
        )
    }

    /// Create an unresolved reference error
    pub fn unresolved_reference(
        reference: impl Into<String>,
        referenced_from: Option<impl Into<String>>,
    ) -> Self {
        Self::UnresolvedReference {
            reference: reference.into(),
            referenced_from: referenced_from.map(Into::into),
        }
    }

    /// Create a cyclic inheritance error from the offending chain
    pub fn cyclic_inheritance(chain: Vec<String>) -> Self {
        Self::CyclicInheritance { chain }
    }

    /// Create an unknown rule error
    pub fn unknown_rule(rule_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnknownRule {
            rule_id: rule_id.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid severity error
    pub fn invalid_severity(rule_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidSeverity {
            rule_id: rule_id.into(),
            value: value.into(),
        }
    }

    /// Create an invalid rule options error
    pub fn invalid_rule_options(rule_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRuleOptions {
            rule_id: rule_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed glob pattern error
    pub fn malformed_glob(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedGlobPattern {
            pattern: pattern.into(),
            origin: None,
            reason: reason.into(),
        }
    }

    /// Create a parse error for a document
    pub fn parse_error(identity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            identity: identity.into(),
            message: message.into(),
        }
    }

    /// Create an IO error with path context
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Attach the fragment or override that declared a malformed pattern
    pub fn with_origin(self, origin: impl Into<String>) -> Self {
        match self {
            Self::MalformedGlobPattern {
                pattern, reason, ..
            } => Self::MalformedGlobPattern {
                pattern,
                origin: Some(origin.into()),
                reason,
            },
            other => other,
        }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for CascadeError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError {
            path: PathBuf::new(),
            source: err,
        }
    }
}
