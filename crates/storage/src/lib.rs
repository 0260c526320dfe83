#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

use overload_domain as domain;
use serde_json::Value;

pub mod document;
pub mod memory;

/// Fields of a stored document.
pub type Document = serde_json::Map<String, Value>;

/// Field changes of a partial update, applied in order.
pub type Changes = Vec<(String, Change)>;

#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Set(Value),
    /// Append the value to an array field unless it is already contained.
    ArrayUnion(Value),
    ArrayRemove(Value),
}

/// Turn every field of `document` into a `Change::Set`.
#[must_use]
pub fn set_fields(document: Document) -> Changes {
    document
        .into_iter()
        .map(|(field, value)| (field, Change::Set(value)))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Equal(String, Value),
}

impl Filter {
    pub fn equal(field: &str, value: impl Into<Value>) -> Self {
        Filter::Equal(field.to_string(), value.into())
    }

    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Equal(field, value) => document.get(field) == Some(value),
        }
    }
}

/// Schemaless store of documents grouped into named collections.
#[allow(async_fn_in_trait)]
pub trait DocumentStore {
    /// Add a document and return the identifier assigned by the store.
    async fn create(&self, collection: &str, document: Document) -> Result<String, BackendError>;
    /// Write a document under a caller-chosen identifier, replacing any existing one.
    async fn set(&self, collection: &str, id: &str, document: Document)
    -> Result<(), BackendError>;
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, BackendError>;
    async fn query(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<(String, Document)>, BackendError>;
    /// Merge changes into an existing document. Fields not named stay untouched.
    async fn update(&self, collection: &str, id: &str, changes: Changes)
    -> Result<(), BackendError>;
    /// Deleting a missing document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), BackendError>;
}

#[allow(async_fn_in_trait)]
pub trait BlobStore {
    async fn put(&self, key: &str, content: Vec<u8>) -> Result<(), BackendError>;
    fn url(&self, key: &str) -> String;
}

#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("document not found")]
    NotFound,
    #[error("backend unavailable")]
    Unavailable,
    #[error("permission denied")]
    PermissionDenied,
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<BackendError> for domain::StorageError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::Unavailable => domain::StorageError::NoConnection,
            BackendError::PermissionDenied => domain::StorageError::PermissionDenied,
            err => domain::StorageError::Other(Box::new(err)),
        }
    }
}

impl From<BackendError> for domain::ReadError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::NotFound => domain::ReadError::NotFound,
            err => domain::ReadError::Storage(err.into()),
        }
    }
}

impl From<BackendError> for domain::CreateError {
    fn from(value: BackendError) -> Self {
        domain::CreateError::Storage(value.into())
    }
}

impl From<BackendError> for domain::UpdateError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::NotFound => domain::UpdateError::NotFound,
            err => domain::UpdateError::Storage(err.into()),
        }
    }
}

impl From<BackendError> for domain::DeleteError {
    fn from(value: BackendError) -> Self {
        domain::DeleteError::Storage(value.into())
    }
}
