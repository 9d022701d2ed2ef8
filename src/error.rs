// Error types for the trellis router

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while building a router or raised by user handlers.
///
/// Build-time variants are fatal: the router is never constructed from a
/// partially assembled route table. "No matching route" and "no handler
/// for this method" are deliberately absent - both are fall-through to the
/// outer chain, not errors.
#[derive(Error, Debug)]
pub enum Error {
    /// A derived URL pattern contains the optional-parameter marker `?`.
    /// Optional segments cannot be expressed through filenames because
    /// their precedence against static routes would be ambiguous.
    #[error("unsupported pattern {pattern:?} derived from {source_path:?}: optional parameters in filenames are not supported")]
    UnsupportedPattern {
        pattern: String,
        source_path: PathBuf,
    },

    /// A route module could not be loaded for a discovered source file.
    #[error("failed to load route module for {source_path:?}: {reason}")]
    ModuleLoad { source_path: PathBuf, reason: String },

    /// Two source files collapse to the same URL pattern after
    /// normalization (for example `a.rs` and `a/index.rs`).
    #[error("duplicate route pattern {uri_path:?}: derived from both {first:?} and {second:?}")]
    DuplicateRoute {
        uri_path: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Two route files in the same directory both declared scoped
    /// middleware for the same phase.
    #[error("conflicting {phase} middleware scope for directory {dir:?}: at most one route file per directory may declare it")]
    ScopeConflict { dir: PathBuf, phase: &'static str },

    /// The directory walk yielded a file that is not under the routes
    /// root, or a registered manifest path escapes the root.
    #[error("path {path:?} is outside the routes root")]
    OutsideRoot { path: PathBuf },

    /// A route file path contains a component that is not valid UTF-8,
    /// so no URL pattern can be derived from it.
    #[error("path {path:?} contains a non-UTF-8 component")]
    NonUtf8Path { path: PathBuf },

    /// Filesystem error while walking the routes root.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Free-form failure raised by user middleware or handlers. The
    /// dispatcher never constructs this itself; it propagates whatever a
    /// handler returns, unmodified.
    #[error("handler error: {0}")]
    Handler(String),
}
