//! Error types for policy construction and variable resolution.
//!
//! These errors cover the construction-time channel only: malformed function
//! applications, unknown identifiers, bad lexical forms, variable cycles.
//! Request-time failures are never surfaced here; they travel through the
//! tree as [`crate::result::EvaluationResult::Indeterminate`] values.

use thiserror::Error;

/// Result type for construction and resolution operations.
pub type Result<T> = std::result::Result<T, PolicyError>;

/// Errors that can occur while building or resolving a policy tree.
#[derive(Debug, Clone, Error)]
pub enum PolicyError {
    /// A function was applied to the wrong number of arguments.
    #[error("function '{function}' expects {expected} arguments, got {actual}")]
    InvalidArity {
        function: String,
        expected: String,
        actual: usize,
    },

    /// An argument had the wrong datatype.
    #[error("function '{function}' argument {position} must be {expected}, got {actual}")]
    TypeMismatch {
        function: String,
        position: usize,
        expected: String,
        actual: String,
    },

    /// An argument was a bag where a scalar was required, or vice versa.
    #[error("function '{function}' argument {position}: {message}")]
    BagMismatch {
        function: String,
        position: usize,
        message: String,
    },

    /// No function is registered under the given identifier.
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// The identifier names an abstract function; it cannot be created
    /// through the concrete lookup path.
    #[error("function '{0}' is abstract; use create_abstract_function")]
    AbstractFunction(String),

    /// The identifier names a concrete function; it cannot be created
    /// through the abstract lookup path.
    #[error("function '{0}' is concrete; use create_function")]
    ConcreteFunction(String),

    /// A function identifier was registered twice within one factory chain.
    #[error("function '{0}' is already registered")]
    DuplicateFunction(String),

    /// A condition root was not a boolean, non-bag expression.
    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    /// A variable reference names an identifier with no definition and no
    /// unparsed source to resolve it from.
    #[error("variable '{0}' is not supported")]
    UnsupportedVariable(String),

    /// Variable resolution re-entered an identifier that is already being
    /// resolved: the definition graph is circular.
    #[error("processing error: circular reference involving variable '{0}'")]
    CircularVariable(String),

    /// A lexical value form could not be parsed.
    #[error("syntax error: {0}")]
    SyntaxError(String),

    /// A structural validation failed (mixed-type bag, empty signature, ...).
    #[error("validation error: {0}")]
    ValidationError(String),
}
