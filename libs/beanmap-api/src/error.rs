use std::fmt;

/// Error kind for mapping errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required argument was absent.
    NullArgument,
    /// No map definition and no any-by-convention fallback applies.
    NoMatchingMap,
    /// The destination type cannot be instantiated.
    NotConstructible,
    /// Invalid builder call order, duplicate registration, unknown member.
    MapConfiguration,
    /// Value is not assignable to the destination member and no converter applies.
    IncompatibleBinding,
    /// A declared but unimplemented convention option was enabled.
    UnsupportedConventionOption,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NullArgument => "null argument",
            ErrorKind::NoMatchingMap => "no matching map",
            ErrorKind::NotConstructible => "not constructible",
            ErrorKind::MapConfiguration => "map configuration",
            ErrorKind::IncompatibleBinding => "incompatible binding",
            ErrorKind::UnsupportedConventionOption => "unsupported convention option",
        };
        f.write_str(name)
    }
}

/// Mapping error, returned by every fallible operation of the mapper,
/// its builder and the member accessors.
///
/// None of these are transient: a failure means a configuration or data
/// defect, so nothing in the workspace retries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct MapperError {
    pub kind: ErrorKind,
    pub message: String,
}

impl MapperError {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
        }
    }

    /// `parameter` was required but absent.
    pub fn null_argument(parameter: &str) -> Self {
        Self::new(
            ErrorKind::NullArgument,
            format!("null not allowed for '{parameter}'"),
        )
    }

    pub fn no_matching_map(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoMatchingMap, msg)
    }

    pub fn not_constructible(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotConstructible, msg)
    }

    pub fn map_configuration(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::MapConfiguration, msg)
    }

    pub fn incompatible_binding(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::IncompatibleBinding, msg)
    }

    pub fn unsupported_convention_option(option: &str) -> Self {
        Self::new(
            ErrorKind::UnsupportedConventionOption,
            format!("convention option '{option}' is not supported"),
        )
    }

    /// Add context to the error, preserving the original ErrorKind.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}
