use crate::error::{DomainError, DomainResult};
use serde::Serialize;
use std::fmt;

pub const OWNER_HEADER: &str = "x-owner-id";

/// Identity every record is scoped to. Passed explicitly into each operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Owner(String);

impl Owner {
    pub fn new(raw: &str) -> DomainResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::Unauthenticated);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The acting identity of a request, possibly absent.
///
/// Reads degrade to empty results for an anonymous caller, writes go through
/// [`Caller::require`] and are rejected.
#[derive(Debug, Clone, Default)]
pub struct Caller(Option<Owner>);

impl Caller {
    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn from_header(value: Option<&str>) -> Self {
        Self(value.and_then(|raw| Owner::new(raw).ok()))
    }

    pub fn owner(&self) -> Option<&Owner> {
        self.0.as_ref()
    }

    pub fn require(&self) -> DomainResult<&Owner> {
        self.0.as_ref().ok_or(DomainError::Unauthenticated)
    }
}

impl From<Owner> for Caller {
    fn from(value: Owner) -> Self {
        Self(Some(value))
    }
}
