use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Record body as stored by the backend
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// An authenticated identity in the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: String,
    pub identity: String,
}

/// Identifier of a record inside a collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to an uploaded blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    pub path: String,
}

impl BlobRef {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
        }
    }
}

/// Failure kinds a backend call can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    DuplicateIdentity,
    InvalidCredential,
    PermissionDenied,
    NotFound,
    Unavailable,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::DuplicateIdentity => "DuplicateIdentity",
            ErrorKind::InvalidCredential => "InvalidCredential",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Unavailable => "Unavailable",
        }
    }

    /// Build an error of this kind with the given message
    pub fn error(self, message: impl Into<String>) -> BackendError {
        let message = message.into();
        match self {
            ErrorKind::DuplicateIdentity => BackendError::DuplicateIdentity(message),
            ErrorKind::InvalidCredential => BackendError::InvalidCredential(message),
            ErrorKind::PermissionDenied => BackendError::PermissionDenied(message),
            ErrorKind::NotFound => BackendError::NotFound(message),
            ErrorKind::Unavailable => BackendError::Unavailable(message),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.to_lowercase().replace(['_', '-'], "").as_str() {
            "duplicateidentity" => ErrorKind::DuplicateIdentity,
            "invalidcredential" => ErrorKind::InvalidCredential,
            "permissiondenied" => ErrorKind::PermissionDenied,
            "notfound" => ErrorKind::NotFound,
            "unavailable" => ErrorKind::Unavailable,
            _ => anyhow::bail!("Unknown error kind: {}", s),
        };
        Ok(kind)
    }
}

/// Error returned by every backend capability
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("DuplicateIdentity: {0}")]
    DuplicateIdentity(String),
    #[error("InvalidCredential: {0}")]
    InvalidCredential(String),
    #[error("PermissionDenied: {0}")]
    PermissionDenied(String),
    #[error("NotFound: {0}")]
    NotFound(String),
    #[error("Unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BackendError::DuplicateIdentity(_) => ErrorKind::DuplicateIdentity,
            BackendError::InvalidCredential(_) => ErrorKind::InvalidCredential,
            BackendError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            BackendError::NotFound(_) => ErrorKind::NotFound,
            BackendError::Unavailable(_) => ErrorKind::Unavailable,
        }
    }
}

/// Backend operations, used to target failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateActor,
    Authenticate,
    Deauthenticate,
    CreateRecord,
    ReadRecord,
    UpdateRecord,
    DeleteRecord,
    ListRecords,
    UploadBlob,
    GetBlobUrl,
    DeleteBlob,
}

impl FromStr for Operation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.to_lowercase().replace(['_', '-'], "").as_str() {
            "createactor" | "signup" => Operation::CreateActor,
            "authenticate" | "signin" => Operation::Authenticate,
            "deauthenticate" | "signout" => Operation::Deauthenticate,
            "createrecord" => Operation::CreateRecord,
            "readrecord" => Operation::ReadRecord,
            "updaterecord" => Operation::UpdateRecord,
            "deleterecord" => Operation::DeleteRecord,
            "listrecords" => Operation::ListRecords,
            "uploadblob" => Operation::UploadBlob,
            "getbloburl" => Operation::GetBlobUrl,
            "deleteblob" => Operation::DeleteBlob,
            _ => anyhow::bail!("Unknown backend operation: {}", s),
        };
        Ok(op)
    }
}

/// Capability interface of the remote app backend
///
/// Checks reach the backend only through this trait. Implementations own
/// their session state (the signed-in actor) and must be safe to share
/// behind an `Arc` across the runner and its checks.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short backend name (e.g., "memory")
    fn backend_name(&self) -> &str;

    /// Register a new actor and sign it in
    async fn create_actor(&self, identity: &str, credential: &str) -> Result<Actor, BackendError>;

    /// Sign in an existing actor
    async fn authenticate(&self, identity: &str, credential: &str) -> Result<Actor, BackendError>;

    /// Sign out the current actor
    async fn deauthenticate(&self) -> Result<(), BackendError>;

    /// Actor holding the session right now. Never fails and never consumes
    /// injected failures.
    async fn current_actor(&self) -> Option<Actor>;

    /// Insert a record with a backend-assigned id
    async fn create_record(
        &self,
        collection: &str,
        payload: Payload,
    ) -> Result<RecordId, BackendError>;

    /// Read a record. `Ok(None)` means the record does not exist.
    async fn read_record(
        &self,
        collection: &str,
        id: &RecordId,
    ) -> Result<Option<Payload>, BackendError>;

    /// Merge top-level fields of `partial` into an existing record
    async fn update_record(
        &self,
        collection: &str,
        id: &RecordId,
        partial: Payload,
    ) -> Result<(), BackendError>;

    async fn delete_record(&self, collection: &str, id: &RecordId) -> Result<(), BackendError>;

    /// List up to `limit` records in insertion order
    async fn list_records(&self, collection: &str, limit: usize)
        -> Result<Vec<Payload>, BackendError>;

    async fn upload_blob(&self, path: &str, bytes: Vec<u8>) -> Result<BlobRef, BackendError>;

    async fn get_blob_url(&self, blob: &BlobRef) -> Result<String, BackendError>;

    async fn delete_blob(&self, blob: &BlobRef) -> Result<(), BackendError>;
}
