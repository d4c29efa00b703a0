/// Failure taxonomy shared by every owner-scoped operation.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Not authenticated")]
    Unauthenticated,

    /// Also returned for records owned by someone else, so existence is not leaked.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<rusqlite::Error> for DomainError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Internal(value.into())
    }
}

pub type DomainResult<T> = std::result::Result<T, DomainError>;

/// A stored or submitted enum value that does not name a known variant.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
