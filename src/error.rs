//! Error and warning types for Texast
//!
//! Errors represent contract violations (malformed signature strings,
//! processing an environment that has no table entry). Everything that can
//! happen with well-formed input but imperfect data is a warning: it is
//! recorded and the operation degrades gracefully.

use std::fmt;

/// Error type for operations that can fail on bad caller input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A signature string could not be parsed
    BadSignature {
        signature: String,
        message: String,
        offset: usize,
    },
    /// An environment was processed without a matching table entry
    UnknownEnvironment { name: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadSignature {
                signature,
                message,
                offset,
            } => {
                write!(
                    f,
                    "Bad argument signature '{}' at offset {}: {}",
                    signature, offset, message
                )
            }
            Error::UnknownEnvironment { name } => {
                write!(f, "Environment '{}' has no table entry", name)
            }
        }
    }
}

impl std::error::Error for Error {}

// Convenience constructors for errors
impl Error {
    pub fn bad_signature(
        signature: impl Into<String>,
        message: impl Into<String>,
        offset: usize,
    ) -> Self {
        Error::BadSignature {
            signature: signature.into(),
            message: message.into(),
            offset,
        }
    }

    pub fn unknown_environment(name: impl Into<String>) -> Self {
        Error::UnknownEnvironment { name: name.into() }
    }
}

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Warning System
// =============================================================================

/// Kind of warning generated while gobbling or attaching arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// An `until` stop that the gobbler does not support (multi-token,
    /// multi-character, or alphanumeric stops)
    UnsupportedUntilStop,
    /// An embellishment token that is not a single character or a single
    /// control sequence; the token is dropped from the match set
    MalformedEmbellishmentToken,
    /// An argument kind the gobbler never matches (verbatim arguments)
    UnsupportedArgumentKind,
    /// A macro's declared signature failed to parse during attachment
    InvalidSignature,
    /// Tree recursion stopped at the configured depth limit
    RecursionLimit,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::UnsupportedUntilStop => write!(f, "unsupported until stop"),
            WarningKind::MalformedEmbellishmentToken => {
                write!(f, "malformed embellishment token")
            }
            WarningKind::UnsupportedArgumentKind => write!(f, "unsupported argument kind"),
            WarningKind::InvalidSignature => write!(f, "invalid signature"),
            WarningKind::RecursionLimit => write!(f, "recursion limit"),
        }
    }
}

/// A warning generated during argument gobbling or attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// The kind of warning
    pub kind: WarningKind,
    /// Human-readable message
    pub message: String,
    /// Location context (e.g. a macro name or a signature fragment)
    pub location: Option<String>,
}

impl Warning {
    /// Create a new warning
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Warning {
            kind,
            message: message.into(),
            location: None,
        }
    }

    /// Add location context to the warning
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Create an unsupported until-stop warning
    pub fn unsupported_until_stop(stop: &str) -> Self {
        Warning::new(
            WarningKind::UnsupportedUntilStop,
            format!(
                "Until-stop '{}' is not supported (only single punctuation or \
                 whitespace characters are matched); treating as no match",
                stop
            ),
        )
        .with_location(stop.to_string())
    }

    /// Create a malformed embellishment-token warning
    pub fn malformed_embellishment_token(token: &str) -> Self {
        Warning::new(
            WarningKind::MalformedEmbellishmentToken,
            format!(
                "Embellishment token '{}' is not a single character or control \
                 sequence; dropping it from the match set",
                token
            ),
        )
        .with_location(token.to_string())
    }

    /// Create an unsupported argument-kind warning
    pub fn unsupported_argument_kind(kind: &str) -> Self {
        Warning::new(
            WarningKind::UnsupportedArgumentKind,
            format!("Arguments of kind '{}' are never gobbled", kind),
        )
        .with_location(kind.to_string())
    }

    /// Create an invalid-signature warning
    pub fn invalid_signature(name: &str, error: &Error) -> Self {
        Warning::new(
            WarningKind::InvalidSignature,
            format!("Signature for '{}' failed to parse: {}", name, error),
        )
        .with_location(name.to_string())
    }

    /// Create a recursion-limit warning
    pub fn recursion_limit(max_depth: usize) -> Self {
        Warning::new(
            WarningKind::RecursionLimit,
            format!("Stopped descending at depth {}", max_depth),
        )
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref loc) = self.location {
            write!(f, "[{}] {}: {}", self.kind, loc, self.message)
        } else {
            write!(f, "[{}] {}", self.kind, self.message)
        }
    }
}

/// Collector for warnings produced during a gobbling or attachment run
///
/// Warnings accumulate until collected with [`Diagnostics::take_warnings`].
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Create a new empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning
    pub fn push_warning(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    /// True if no warnings have been recorded
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Read the recorded warnings without consuming them
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Take all collected warnings, leaving the internal list empty
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_signature_display() {
        let err = Error::bad_signature("q", "unknown argument kind 'q'", 0);
        let msg = err.to_string();
        assert!(msg.contains("'q'"));
        assert!(msg.contains("offset 0"));
    }

    #[test]
    fn test_warning_display_with_location() {
        let warn = Warning::unsupported_until_stop("xx;");
        let msg = warn.to_string();
        assert!(msg.contains("unsupported until stop"));
        assert!(msg.contains("xx;"));
    }

    #[test]
    fn test_diagnostics_take() {
        let mut diag = Diagnostics::new();
        assert!(diag.is_empty());
        diag.push_warning(Warning::recursion_limit(256));
        assert_eq!(diag.warnings().len(), 1);
        let taken = diag.take_warnings();
        assert_eq!(taken.len(), 1);
        assert!(diag.is_empty());
    }
}
