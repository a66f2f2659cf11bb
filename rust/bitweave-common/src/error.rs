use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Invalid configuration or argument: bad sizes, widths out of range, values
    /// violating an ordering or bound contract.
    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    /// The object is not in a state that permits the operation (e.g. appending to a
    /// frozen buffer or a finished writer).
    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    pub fn unsupported(operation: impl Into<String>) -> Error {
        Error(
            ErrorKind::Unsupported {
                operation: operation.into(),
            }
            .into(),
        )
    }

    /// Persisted data does not follow the expected layout.
    pub fn invalid_format(element: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidFormat {
                element: element.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn end_of_stream(context: impl Into<String>) -> Error {
        Error(
            ErrorKind::EndOfStream {
                context: context.into(),
            }
            .into(),
        )
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }

    pub fn is_end_of_stream(&self) -> bool {
        matches!(self.kind(), ErrorKind::EndOfStream { .. })
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("unsupported operation: {operation}")]
    Unsupported { operation: String },

    #[error("invalid data format for '{element}': {message}")]
    InvalidFormat { element: String, message: String },

    #[error("unexpected end of stream: {context}")]
    EndOfStream { context: String },

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::end_of_stream(e.to_string())
        } else {
            Error::io("", e)
        }
    }
}
