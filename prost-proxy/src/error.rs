//! Errors raised by message and container proxies.

use thiserror::Error;

/// An error surfaced synchronously by a proxy operation.
///
/// Every variant corresponds to one class of protocol violation observable by the
/// scripting host. Operations either fully succeed or leave the message unchanged,
/// with the exception of multi-element container operations such as
/// [`RepeatedField::extend`](crate::RepeatedField::extend), which stop at the
/// first rejected element.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ProxyError {
    /// The name is not a field declared on the message type.
    #[error("message `{message}` has no field named `{field}`")]
    UnknownField { message: String, field: String },

    /// A bad field or oneof name passed to a presence operation, or an
    /// unrecognized configuration key.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The value's kind is incompatible with the field, key or value kind, or a
    /// message of the wrong type was supplied.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Attempted wholesale replacement of a message, repeated or map field.
    #[error("field `{field}` of `{message}` cannot be assigned; modify it in place")]
    ImmutableFieldAssignment { message: String, field: String },

    /// Attempted replacement of a message-valued map entry by indexed assignment.
    #[error("entries of message-valued map `{field}` cannot be replaced; modify them in place")]
    InvalidEntryReplacement { field: String },

    /// Container index outside `[0, len)`.
    #[error("index {index} out of range for container of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Malformed binary or text input.
    #[error("failed to parse `{message}`: {reason}")]
    Parse { message: String, reason: String },

    /// The message class has no constructor.
    #[error("class `{0}` has no constructor; it is not a registered message type")]
    NotConstructible(String),

    /// A different descriptor is already registered under the same name.
    #[error("a different message type is already registered as `{0}`")]
    AlreadyRegisteredMismatch(String),

    /// The type name is not known to the descriptor pool.
    #[error("message type `{0}` is not present in the descriptor pool")]
    UnknownType(String),
}

impl ProxyError {
    pub(crate) fn unknown_field(message: &str, field: &str) -> Self {
        ProxyError::UnknownField {
            message: message.to_owned(),
            field: field.to_owned(),
        }
    }

    pub(crate) fn immutable(message: &str, field: &str) -> Self {
        ProxyError::ImmutableFieldAssignment {
            message: message.to_owned(),
            field: field.to_owned(),
        }
    }

    pub(crate) fn mismatch(reason: impl Into<String>) -> Self {
        ProxyError::TypeMismatch(reason.into())
    }

    pub(crate) fn parse(message: &str, reason: impl ToString) -> Self {
        ProxyError::Parse {
            message: message.to_owned(),
            reason: reason.to_string(),
        }
    }
}
