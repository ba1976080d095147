use super::check::{Check, CheckAction, Precondition};
use super::context::RunContext;
use crate::backend::{BlobRef, ErrorKind, Payload, RecordId};
use crate::parser::types::{
    BlobParams, CheckSpec, ChecklistFile, CreateActorParams, CreateRecordParams,
    CredentialsParams, Expectation, FileContainsParams, FileExistsParams, ListRecordsParams,
    ReadRecordParams, RecordRefParams, Requirement, Step, UpdateRecordParams, UploadBlobParams,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use std::time::Duration;

#[async_trait]
impl CheckAction for Step {
    async fn invoke(&self, ctx: &mut RunContext) -> Result<String> {
        match self {
            Step::CreateActor(p) => create_actor(ctx, p).await,
            Step::Authenticate(p) => authenticate(ctx, p).await,
            Step::Deauthenticate => {
                ctx.backend().deauthenticate().await?;
                ctx.set_actor(None);
                Ok("signed out".to_string())
            }
            Step::CreateRecord(p) => create_record(ctx, p).await,
            Step::ReadRecord(p) => read_record(ctx, p).await,
            Step::UpdateRecord(p) => update_record(ctx, p).await,
            Step::DeleteRecord(p) => delete_record(ctx, p).await,
            Step::ListRecords(p) => list_records(ctx, p).await,
            Step::UploadBlob(p) => upload_blob(ctx, p).await,
            Step::GetBlobUrl(p) => get_blob_url(ctx, p).await,
            Step::DeleteBlob(p) => {
                let blob = BlobRef::new(&ctx.substitute_vars(&p.blob));
                ctx.backend().delete_blob(&blob).await?;
                Ok(format!("deleted {}", blob.path))
            }
            Step::FileExists(p) => file_exists(ctx, p),
            Step::FileContains(p) => file_contains(ctx, p),
        }
    }
}

async fn create_actor(ctx: &mut RunContext, p: &CreateActorParams) -> Result<String> {
    let identity = ctx.substitute_vars(&p.identity);
    let credential = ctx.substitute_vars(&p.credential);

    let created = ctx.backend().create_actor(&identity, &credential).await;
    let (actor, detail) = match created {
        Ok(actor) => {
            let detail = format!("created actor {} ({})", actor.id, actor.identity);
            (actor, detail)
        }
        Err(e) if p.sign_in_if_exists && e.kind() == ErrorKind::DuplicateIdentity => {
            log::debug!("{} already registered, signing in instead", identity);
            let actor = ctx.backend().authenticate(&identity, &credential).await?;
            let detail = format!("identity exists, signed in actor {}", actor.id);
            (actor, detail)
        }
        Err(e) => return Err(e.into()),
    };

    ctx.set_actor(Some(actor));
    Ok(detail)
}

async fn authenticate(ctx: &mut RunContext, p: &CredentialsParams) -> Result<String> {
    let identity = ctx.substitute_vars(&p.identity);
    let credential = ctx.substitute_vars(&p.credential);

    let actor = ctx.backend().authenticate(&identity, &credential).await?;
    let detail = format!("signed in actor {} ({})", actor.id, actor.identity);
    ctx.set_actor(Some(actor));
    Ok(detail)
}

fn payload_of(ctx: &RunContext, value: &serde_json::Value) -> Result<Payload> {
    match ctx.substitute_value(value) {
        serde_json::Value::Object(map) => Ok(map),
        other => anyhow::bail!("payload must be a mapping, got: {}", other),
    }
}

async fn create_record(ctx: &mut RunContext, p: &CreateRecordParams) -> Result<String> {
    let collection = ctx.substitute_vars(&p.collection);
    let payload = payload_of(ctx, &p.payload)?;

    let id = ctx.backend().create_record(&collection, payload).await?;
    if let Some(name) = &p.save_as {
        ctx.vars.insert(name.clone(), id.to_string());
    }
    Ok(format!("created {}/{}", collection, id))
}

async fn read_record(ctx: &mut RunContext, p: &ReadRecordParams) -> Result<String> {
    let collection = ctx.substitute_vars(&p.collection);
    let id = RecordId(ctx.substitute_vars(&p.id));

    let found = ctx.backend().read_record(&collection, &id).await?;
    match (found, p.expect) {
        (Some(payload), Expectation::Present) => Ok(format!(
            "{}/{}: {}",
            collection,
            id,
            serde_json::Value::Object(payload)
        )),
        (None, Expectation::Present) => anyhow::bail!("NotFound: {}/{}", collection, id),
        (Some(_), Expectation::Absent) => anyhow::bail!("{}/{} still exists", collection, id),
        (None, Expectation::Absent) => Ok(format!("{}/{} is absent", collection, id)),
    }
}

async fn update_record(ctx: &mut RunContext, p: &UpdateRecordParams) -> Result<String> {
    let collection = ctx.substitute_vars(&p.collection);
    let id = RecordId(ctx.substitute_vars(&p.id));
    let partial = payload_of(ctx, &p.payload)?;
    let fields = partial.len();

    ctx.backend().update_record(&collection, &id, partial).await?;
    Ok(format!("updated {} fields of {}/{}", fields, collection, id))
}

async fn delete_record(ctx: &mut RunContext, p: &RecordRefParams) -> Result<String> {
    let collection = ctx.substitute_vars(&p.collection);
    let id = RecordId(ctx.substitute_vars(&p.id));

    ctx.backend().delete_record(&collection, &id).await?;
    Ok(format!("deleted {}/{}", collection, id))
}

async fn list_records(ctx: &mut RunContext, p: &ListRecordsParams) -> Result<String> {
    let collection = ctx.substitute_vars(&p.collection);

    let records = ctx.backend().list_records(&collection, p.limit).await?;
    if let Some(min) = p.min_count {
        if records.len() < min {
            anyhow::bail!(
                "expected at least {} records in {}, found {}",
                min,
                collection,
                records.len()
            );
        }
    }
    Ok(format!("{} records in {}", records.len(), collection))
}

async fn upload_blob(ctx: &mut RunContext, p: &UploadBlobParams) -> Result<String> {
    let path = ctx.substitute_vars(&p.path);
    let bytes = match (&p.content_base64, &p.content) {
        (Some(encoded), _) => base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .context("contentBase64 is not valid base64")?,
        (None, Some(text)) => ctx.substitute_vars(text).into_bytes(),
        (None, None) => anyhow::bail!("uploadBlob needs content or contentBase64"),
    };
    let size = bytes.len();

    let blob = ctx.backend().upload_blob(&path, bytes).await?;
    if let Some(name) = &p.save_as {
        ctx.vars.insert(name.clone(), blob.path.clone());
    }
    Ok(format!("uploaded {} ({} bytes)", blob.path, size))
}

async fn get_blob_url(ctx: &mut RunContext, p: &BlobParams) -> Result<String> {
    let blob = BlobRef::new(&ctx.substitute_vars(&p.blob));

    let url = ctx.backend().get_blob_url(&blob).await?;
    if let Some(name) = &p.save_as {
        ctx.vars.insert(name.clone(), url.clone());
    }
    Ok(url)
}

fn file_exists(ctx: &RunContext, p: &FileExistsParams) -> Result<String> {
    let missing: Vec<String> = p
        .paths
        .iter()
        .map(|path| ctx.substitute_vars(path))
        .filter(|path| !ctx.resolve_path(path).exists())
        .collect();

    if !missing.is_empty() {
        anyhow::bail!("missing: {}", missing.join(", "));
    }
    Ok(format!("{} files present", p.paths.len()))
}

fn file_contains(ctx: &RunContext, p: &FileContainsParams) -> Result<String> {
    let path = ctx.resolve_path(&ctx.substitute_vars(&p.path));
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let missing: Vec<&str> = p
        .patterns
        .iter()
        .map(String::as_str)
        .filter(|pattern| !content.contains(pattern))
        .collect();

    if !missing.is_empty() {
        anyhow::bail!("{} is missing: {}", p.path, missing.join(", "));
    }
    Ok(format!("{} contains all {} markers", p.path, p.patterns.len()))
}

fn precondition_of(requires: &[Requirement]) -> Option<Precondition> {
    let mut all: Vec<Precondition> = requires
        .iter()
        .map(|r| match r {
            Requirement::Authenticated => Precondition::Authenticated,
            Requirement::Passed(name) => Precondition::Passed(name.clone()),
            Requirement::Var(name) => Precondition::Var(name.clone()),
        })
        .collect();

    match all.len() {
        0 => None,
        1 => all.pop(),
        _ => Some(Precondition::All(all)),
    }
}

impl CheckSpec {
    /// Bind this declaration to a runnable check
    pub fn to_check(&self) -> Check {
        let mut check = Check::new(&self.name);
        if let Some(step) = &self.step {
            check = check.with_action(step.clone());
        }
        if let Some(precondition) = precondition_of(&self.requires) {
            check = check.requires(precondition);
        }
        if let Some(ms) = self.timeout_ms {
            check = check.with_timeout(Duration::from_millis(ms));
        }
        check
    }
}

impl ChecklistFile {
    pub fn to_checks(&self) -> Vec<Check> {
        self.checks.iter().map(CheckSpec::to_check).collect()
    }
}
