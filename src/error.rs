use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;
use std::io;

use crate::frontend::parser::ParseError;
use crate::paths::PathError;

/// Unified error type for the semantic model builder.
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    InvalidPath(PathError),
    Manifest {
        path: String,
        message: String,
    },
    UnresolvedModule {
        import_path: String,
    },
    Parse(ParseError),
    /// Abandon the current unit of work. The cause has already been recorded in
    /// the shared diagnostics list.
    Bailout,
    Cancelled,
    Internal {
        message: String,
        backtrace: Option<Backtrace>,
    },
}

/// Convenience result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn manifest(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Manifest {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn unresolved_module(import_path: impl Into<String>) -> Self {
        Self::UnresolvedModule {
            import_path: import_path.into(),
        }
    }

    /// Construct a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            backtrace: capture_backtrace(),
        }
    }

    /// Return the captured backtrace, if any.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self {
            Error::Internal { backtrace, .. } => backtrace.as_ref(),
            _ => None,
        }
    }

    /// Whether this error abandons work rather than describing a fresh failure.
    #[must_use]
    pub fn is_abandon(&self) -> bool {
        matches!(self, Error::Bailout | Error::Cancelled)
    }
}

fn capture_backtrace() -> Option<Backtrace> {
    if cfg!(debug_assertions) {
        Some(Backtrace::force_capture())
    } else {
        None
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {err}"),
            Error::InvalidPath(err) => write!(f, "{err}"),
            Error::Manifest { path, message } => write!(f, "{path}: {message}"),
            Error::UnresolvedModule { import_path } => {
                write!(f, "cannot find module providing package {import_path}")
            }
            Error::Parse(err) => write!(f, "parse error: {err}"),
            Error::Bailout => f.write_str("analysis abandoned; see diagnostics"),
            Error::Cancelled => f.write_str("analysis cancelled"),
            Error::Internal { message, .. } => write!(f, "internal error: {message}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::InvalidPath(err) => Some(err),
            Error::Parse(err) => Some(err),
            Error::Manifest { .. }
            | Error::UnresolvedModule { .. }
            | Error::Bailout
            | Error::Cancelled
            | Error::Internal { .. } => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::Io(error)
    }
}

impl From<PathError> for Error {
    fn from(error: PathError) -> Self {
        Error::InvalidPath(error)
    }
}

impl From<ParseError> for Error {
    fn from(error: ParseError) -> Self {
        Error::Parse(error)
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::internal(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostic;
    use crate::paths::PkgPath;

    #[test]
    fn display_formats_variants() {
        let io_error = Error::from(io::Error::new(io::ErrorKind::Other, "disk error"));
        assert_eq!(io_error.to_string(), "I/O error: disk error");

        let manifest = Error::manifest("/app/go.mod", "unknown directive: frob");
        assert_eq!(manifest.to_string(), "/app/go.mod: unknown directive: frob");

        let unresolved = Error::unresolved_module("unrelated/pkg");
        assert_eq!(
            unresolved.to_string(),
            "cannot find module providing package unrelated/pkg"
        );

        let parse_error = Error::from(ParseError::new(
            "unexpected token",
            vec![Diagnostic::error("bad token", None)],
        ));
        assert_eq!(parse_error.to_string(), "parse error: unexpected token");

        assert_eq!(Error::Cancelled.to_string(), "analysis cancelled");
        assert_eq!(Error::internal("panic").to_string(), "internal error: panic");
    }

    #[test]
    fn source_exposes_wrapped_errors() {
        let io_error = Error::from(io::Error::new(io::ErrorKind::Other, "boom"));
        let source = io_error.source().unwrap();
        assert!(source.downcast_ref::<io::Error>().is_some());

        let path_error = Error::from(PkgPath::new("").unwrap_err());
        let source = path_error.source().unwrap();
        assert!(source.downcast_ref::<PathError>().is_some());

        assert!(Error::Bailout.source().is_none());
        assert!(Error::Bailout.is_abandon());
        assert!(!Error::internal("x").is_abandon());
    }

    #[test]
    fn debug_builds_capture_backtrace() {
        if cfg!(debug_assertions) {
            let err = Error::internal("capture");
            assert!(err.backtrace().is_some());
        }
    }
}
