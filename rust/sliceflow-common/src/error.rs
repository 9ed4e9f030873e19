use std::sync::Arc;

use thiserror::Error;

/// The error type shared by all sliceflow crates.
///
/// `Error` is a cheap handle (a single `Arc`) so that an operator can cache the
/// first fatal error it observes and hand out the very same error on every
/// subsequent pull.
#[derive(Debug, Clone, Error)]
#[error(transparent)]
pub struct Error(Arc<ErrorKind>);

pub type StdErrorShared = Arc<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    /// Returns `true` if both handles refer to the same error instance.
    pub fn is_same(&self, other: &Error) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind(), ErrorKind::Cancelled)
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        ErrorKind::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
        .into()
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        ErrorKind::InvalidOperation { name: name.into() }.into()
    }

    /// Construction-time type error: mismatched signatures, unsupported key
    /// types, wrong column counts.
    pub fn type_mismatch(message: impl Into<String>) -> Error {
        ErrorKind::Type {
            message: message.into(),
        }
        .into()
    }

    /// Wraps an opaque error raised by an upstream reader (transport, I/O).
    pub fn upstream<E>(context: impl Into<String>, source: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ErrorKind::Upstream {
            context: context.into(),
            source: Arc::new(source),
        }
        .into()
    }

    pub fn cancelled() -> Error {
        ErrorKind::Cancelled.into()
    }

    pub fn resource_exhausted(resource: impl Into<String>, limit: usize) -> Error {
        ErrorKind::ResourceExhausted {
            resource: resource.into(),
            limit,
        }
        .into()
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("type error: {message}")]
    Type { message: String },

    #[error("upstream error for '{context}': {source}")]
    Upstream {
        context: String,
        source: StdErrorShared,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("{resource} exceeded the configured limit of {limit}")]
    ResourceExhausted { resource: String, limit: usize },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(Arc::new(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_preserves_identity() {
        let err = Error::upstream("shuffle", std::io::Error::other("connection reset"));
        let cached = err.clone();
        assert!(err.is_same(&cached));
        assert!(!err.is_same(&Error::cancelled()));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_kinds() {
        assert!(Error::cancelled().is_cancelled());
        assert!(matches!(
            Error::type_mismatch("bad").kind(),
            ErrorKind::Type { .. }
        ));
        let err = Error::resource_exhausted("combined keys", 10);
        assert_eq!(
            err.to_string(),
            "combined keys exceeded the configured limit of 10"
        );
    }
}
