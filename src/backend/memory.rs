use super::traits::{
    Actor, Backend, BackendError, BlobRef, ErrorKind, Operation, Payload, RecordId,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    /// identity -> (actor, credential)
    actors: HashMap<String, (Actor, String)>,
    session: Option<Actor>,
    /// collection -> records in insertion order
    collections: HashMap<String, Vec<(RecordId, Payload)>>,
    /// path -> (bytes, download token)
    blobs: HashMap<String, (Vec<u8>, String)>,
    injected: HashMap<Operation, VecDeque<BackendError>>,
    unavailable: bool,
}

/// In-process backend with the same access rules as the hosted one
///
/// Writes require a signed-in actor, reads are public. Intended for local
/// checklist runs and tests, so it also exposes failure injection, an
/// outage switch and artificial latency.
pub struct MemoryBackend {
    bucket: String,
    latency: Option<Duration>,
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            bucket: "lumi-checklist.local".to_string(),
            latency: None,
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Delay every call by `latency` before it touches state
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make the next call of `op` fail with `error`. Injections queue up per operation.
    pub async fn inject_failure(&self, op: Operation, error: BackendError) {
        log::debug!("Injecting {} into next {:?} call", error.kind(), op);
        let mut state = self.state.lock().await;
        state.injected.entry(op).or_default().push_back(error);
    }

    /// Simulate an outage: every call fails with `Unavailable` until cleared
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }

    pub async fn record_count(&self, collection: &str) -> usize {
        self.state
            .lock()
            .await
            .collections
            .get(collection)
            .map_or(0, |records| records.len())
    }

    pub async fn blob_exists(&self, path: &str) -> bool {
        self.state.lock().await.blobs.contains_key(path)
    }

    /// Common entry for every call: latency, outage and injected failures
    async fn enter(&self, op: Operation) -> Result<MutexGuard<'_, MemoryState>, BackendError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock().await;
        if state.unavailable {
            return Err(BackendError::Unavailable("backend is offline".to_string()));
        }
        if let Some(error) = state.injected.get_mut(&op).and_then(|q| q.pop_front()) {
            log::debug!("Injected failure for {:?}: {}", op, error);
            return Err(error);
        }
        Ok(state)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn require_session(state: &MemoryState, what: &str) -> Result<(), BackendError> {
    if state.session.is_none() {
        return Err(ErrorKind::PermissionDenied.error(format!(
            "{} requires an authenticated actor",
            what
        )));
    }
    Ok(())
}

#[async_trait]
impl Backend for MemoryBackend {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn create_actor(&self, identity: &str, credential: &str) -> Result<Actor, BackendError> {
        let mut state = self.enter(Operation::CreateActor).await?;
        if state.actors.contains_key(identity) {
            return Err(BackendError::DuplicateIdentity(format!(
                "identity already registered: {}",
                identity
            )));
        }

        let actor = Actor {
            id: Uuid::new_v4().simple().to_string(),
            identity: identity.to_string(),
        };
        state
            .actors
            .insert(identity.to_string(), (actor.clone(), credential.to_string()));
        state.session = Some(actor.clone());
        Ok(actor)
    }

    async fn authenticate(&self, identity: &str, credential: &str) -> Result<Actor, BackendError> {
        let mut state = self.enter(Operation::Authenticate).await?;
        let actor = match state.actors.get(identity) {
            Some((actor, stored)) if stored == credential => actor.clone(),
            _ => {
                return Err(BackendError::InvalidCredential(format!(
                    "wrong identity or credential for {}",
                    identity
                )))
            }
        };
        state.session = Some(actor.clone());
        Ok(actor)
    }

    async fn deauthenticate(&self) -> Result<(), BackendError> {
        let mut state = self.enter(Operation::Deauthenticate).await?;
        state.session = None;
        Ok(())
    }

    async fn current_actor(&self) -> Option<Actor> {
        self.state.lock().await.session.clone()
    }

    async fn create_record(
        &self,
        collection: &str,
        payload: Payload,
    ) -> Result<RecordId, BackendError> {
        let mut state = self.enter(Operation::CreateRecord).await?;
        require_session(&state, "create_record")?;

        let id = RecordId(Uuid::new_v4().simple().to_string());
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push((id.clone(), payload));
        Ok(id)
    }

    async fn read_record(
        &self,
        collection: &str,
        id: &RecordId,
    ) -> Result<Option<Payload>, BackendError> {
        let state = self.enter(Operation::ReadRecord).await?;
        let found = state
            .collections
            .get(collection)
            .and_then(|records| records.iter().find(|(rid, _)| rid == id))
            .map(|(_, payload)| payload.clone());
        Ok(found)
    }

    async fn update_record(
        &self,
        collection: &str,
        id: &RecordId,
        partial: Payload,
    ) -> Result<(), BackendError> {
        let mut state = self.enter(Operation::UpdateRecord).await?;
        require_session(&state, "update_record")?;

        let record = state
            .collections
            .get_mut(collection)
            .and_then(|records| records.iter_mut().find(|(rid, _)| rid == id))
            .ok_or_else(|| BackendError::NotFound(format!("{}/{}", collection, id)))?;
        for (key, value) in partial {
            record.1.insert(key, value);
        }
        Ok(())
    }

    async fn delete_record(&self, collection: &str, id: &RecordId) -> Result<(), BackendError> {
        let mut state = self.enter(Operation::DeleteRecord).await?;
        require_session(&state, "delete_record")?;

        let records = state
            .collections
            .get_mut(collection)
            .ok_or_else(|| BackendError::NotFound(format!("{}/{}", collection, id)))?;
        let position = records
            .iter()
            .position(|(rid, _)| rid == id)
            .ok_or_else(|| BackendError::NotFound(format!("{}/{}", collection, id)))?;
        records.remove(position);
        Ok(())
    }

    async fn list_records(
        &self,
        collection: &str,
        limit: usize,
    ) -> Result<Vec<Payload>, BackendError> {
        let state = self.enter(Operation::ListRecords).await?;
        Ok(state
            .collections
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .take(limit)
                    .map(|(_, payload)| payload.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn upload_blob(&self, path: &str, bytes: Vec<u8>) -> Result<BlobRef, BackendError> {
        let mut state = self.enter(Operation::UploadBlob).await?;
        require_session(&state, "upload_blob")?;

        let token = Uuid::new_v4().to_string();
        state.blobs.insert(path.to_string(), (bytes, token));
        Ok(BlobRef::new(path))
    }

    async fn get_blob_url(&self, blob: &BlobRef) -> Result<String, BackendError> {
        let state = self.enter(Operation::GetBlobUrl).await?;
        let (_, token) = state
            .blobs
            .get(&blob.path)
            .ok_or_else(|| BackendError::NotFound(format!("blob {}", blob.path)))?;
        Ok(format!("memory://{}/{}?token={}", self.bucket, blob.path, token))
    }

    async fn delete_blob(&self, blob: &BlobRef) -> Result<(), BackendError> {
        let mut state = self.enter(Operation::DeleteBlob).await?;
        require_session(&state, "delete_blob")?;

        state
            .blobs
            .remove(&blob.path)
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound(format!("blob {}", blob.path)))
    }
}
