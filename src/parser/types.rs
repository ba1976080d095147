use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A parsed checklist file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistFile {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Variables for `${...}` substitution
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Default per-check timeout
    #[serde(default, alias = "timeout")]
    pub timeout_ms: Option<u64>,

    /// Bound for the whole run
    #[serde(default, alias = "runTimeout")]
    pub run_timeout_ms: Option<u64>,

    /// Parsed separately, see `parser::yaml`
    #[serde(skip)]
    pub checks: Vec<CheckSpec>,
}

/// One declared check
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckSpec {
    pub name: String,
    pub requires: Vec<Requirement>,
    pub timeout_ms: Option<u64>,
    /// `None` when the check declares no step
    pub step: Option<Step>,
}

/// Declarative precondition of a check
#[derive(Debug, Clone, PartialEq)]
pub enum Requirement {
    Authenticated,
    Passed(String),
    Var(String),
}

/// Backend or filesystem step a check performs
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    CreateActor(CreateActorParams),
    Authenticate(CredentialsParams),
    Deauthenticate,
    CreateRecord(CreateRecordParams),
    ReadRecord(ReadRecordParams),
    UpdateRecord(UpdateRecordParams),
    DeleteRecord(RecordRefParams),
    ListRecords(ListRecordsParams),
    UploadBlob(UploadBlobParams),
    GetBlobUrl(BlobParams),
    DeleteBlob(BlobParams),
    FileExists(FileExistsParams),
    FileContains(FileContainsParams),
}

impl Step {
    /// YAML key of this step
    pub fn keyword(&self) -> &'static str {
        match self {
            Step::CreateActor(_) => "createActor",
            Step::Authenticate(_) => "authenticate",
            Step::Deauthenticate => "deauthenticate",
            Step::CreateRecord(_) => "createRecord",
            Step::ReadRecord(_) => "readRecord",
            Step::UpdateRecord(_) => "updateRecord",
            Step::DeleteRecord(_) => "deleteRecord",
            Step::ListRecords(_) => "listRecords",
            Step::UploadBlob(_) => "uploadBlob",
            Step::GetBlobUrl(_) => "getBlobUrl",
            Step::DeleteBlob(_) => "deleteBlob",
            Step::FileExists(_) => "fileExists",
            Step::FileContains(_) => "fileContains",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateActorParams {
    pub identity: String,
    pub credential: String,
    /// Fall back to signing in when the identity is already registered
    #[serde(default)]
    pub sign_in_if_exists: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsParams {
    pub identity: String,
    pub credential: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordParams {
    pub collection: String,
    pub payload: serde_json::Value,
    /// Variable receiving the new record id
    #[serde(default)]
    pub save_as: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Expectation {
    #[default]
    Present,
    Absent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadRecordParams {
    pub collection: String,
    pub id: String,
    #[serde(default)]
    pub expect: Expectation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecordParams {
    pub collection: String,
    pub id: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordRefParams {
    pub collection: String,
    pub id: String,
}

fn default_limit() -> usize {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListRecordsParams {
    pub collection: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub min_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadBlobParams {
    pub path: String,
    /// UTF-8 text content
    #[serde(default)]
    pub content: Option<String>,
    /// Binary content, standard base64
    #[serde(default)]
    pub content_base64: Option<String>,
    #[serde(default)]
    pub save_as: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlobParams {
    pub blob: String,
    #[serde(default)]
    pub save_as: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileExistsParams {
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileContainsParams {
    pub path: String,
    pub patterns: Vec<String>,
}
