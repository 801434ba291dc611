#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum DataError {
    /// A relationship or cardinality rule was violated while constructing objects.
    #[error("provision error: {0}")]
    Provision(String),
    /// A lookup by id did not resolve.
    #[error("not found: {0}")]
    NotFound(String),
    /// The operation is not supported by the object it was invoked on.
    #[error("type error: {0}")]
    Type(String),
}

impl DataError {
    pub(crate) fn provision(message: impl Into<String>) -> Self {
        Self::Provision(message.into())
    }

    pub(crate) fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound(format!("{collection} with id `{id}` does not exist"))
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }
}

pub type DataResult<T> = Result<T, DataError>;
