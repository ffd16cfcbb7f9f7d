//! Encoder error types.

use thiserror::Error;

/// Errors that can occur while serializing a module to the binary format.
///
/// Every error is fatal at the point of detection: the encoder never returns
/// partial output. The front-end is expected to reject modules that would
/// trigger these, so reaching one indicates a malformed input module.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// A referenced function, local, or global is not in the index maps.
    #[error("unresolved name: {0}")]
    UnresolvedName(String),

    /// A branch targets a label with no enclosing loop or block of that name.
    #[error("unresolved label: {0}")]
    UnresolvedLabel(String),

    /// A builtin call names neither a numeric instruction nor one of the
    /// `dataoffset`/`datasize`/`unreachable` specials.
    #[error("unknown builtin: {0}")]
    UnknownBuiltin(String),

    /// A signature uses a type name other than `i32` or `i64`.
    #[error("unsupported value type: {0}")]
    UnsupportedType(String),

    /// A construct appeared somewhere it cannot be encoded.
    #[error("unsupported construct: {0}")]
    Unsupported(String),

    /// The module does not define or import a function named `main`.
    #[error("module has no \"main\" function to export")]
    MissingMain,

    /// `dataoffset`/`datasize` names a sub-module that was never embedded.
    #[error("unknown sub-module: {0}")]
    MissingSubModule(String),
}

/// Encoder result type alias.
pub type EncodeResult<T> = Result<T, EncodeError>;
