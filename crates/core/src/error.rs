//! Error type shared by registration, lookup and invocation

/// Errors produced by the registry and by typed access to dynamic values
///
/// The soft entry points (`invoke`, `get_field`, `new_object`, ...) turn
/// these into a diagnostic plus a null value; the strict ones (`call`,
/// `try_get_field`, `try_new`, ...) return them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReflectError {
    #[error("unable to init an unregistered class: {0}")]
    UnregisteredClass(String),

    #[error("alias chain starting at {0} loops back on itself")]
    AliasCycle(String),

    #[error("no matching field found: {class}::{field}")]
    FieldNotFound { class: String, field: String },

    #[error("no method named {method} on {class} or its bases")]
    MethodNotFound { class: String, method: String },

    #[error("no matching method found: {class}::{method}({args})")]
    NoMatchingOverload {
        class: String,
        method: String,
        args: String,
    },

    #[error("same type of function already registered: {signature}")]
    DuplicateMethod { signature: String },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("value of type {0} is no longer alive")]
    DanglingValue(String),

    #[error("value of type {0} is already borrowed")]
    ValueBusy(String),

    #[error("operation on a null value")]
    NullValue,

    #[error("missing argument #{index}, expected {expected}")]
    MissingArgument { index: usize, expected: String },

    #[error("{class}::{method} needs an instance")]
    NotStatic { class: String, method: String },

    #[error("{op} on {ty} overflowed or divided by zero")]
    ArithmeticFault { op: String, ty: String },

    #[error("cannot convert {from} to {to}")]
    ConversionFailed { from: String, to: String },
}

/// Result type for reflection operations
pub type ReflectResult<T> = Result<T, ReflectError>;

impl ReflectError {
    pub(crate) fn mismatch(expected: impl ToString, found: impl ToString) -> Self {
        ReflectError::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}
