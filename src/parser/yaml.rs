use super::types::{
    BlobParams, CheckSpec, ChecklistFile, FileExistsParams, Requirement, Step,
};
use anyhow::{Context, Result};
use serde_yaml::Value;
use std::path::Path;

/// Keys of a check mapping that are not steps
const CHECK_KEYS: &[&str] = &["name", "requires", "timeoutMs", "timeout", "description"];

/// Parse a YAML checklist file
pub fn parse_checklist_file(path: &Path) -> Result<ChecklistFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let mut file = parse_checklist_content(&content)
        .with_context(|| format!("Failed to parse checklist: {}", path.display()))?;
    if file.name.is_none() {
        file.name = path.file_stem().map(|s| s.to_string_lossy().to_string());
    }
    Ok(file)
}

/// Parse checklist YAML content
///
/// Two layouts are accepted: a header mapping and a list of checks separated
/// by a `---` line, or a single mapping carrying the list under `checks`.
pub fn parse_checklist_content(content: &str) -> Result<ChecklistFile> {
    let (header, body) = split_header(content);

    let mut file = match header {
        Some(h) if !h.trim().is_empty() => {
            serde_yaml::from_str::<ChecklistFile>(h).context("Failed to parse checklist header")?
        }
        _ => ChecklistFile::default(),
    };

    let value: Value = serde_yaml::from_str(body).context("Failed to parse YAML content")?;
    match value {
        Value::Sequence(items) => {
            file.checks = parse_checks(&items)?;
        }
        Value::Mapping(ref map) => {
            let checks = map
                .get("checks")
                .or_else(|| map.get("steps"))
                .cloned()
                .unwrap_or(Value::Null);
            // A mapping body carries its own header
            file = serde_yaml::from_value(value.clone())
                .context("Failed to parse checklist header")?;

            match checks {
                Value::Sequence(items) => file.checks = parse_checks(&items)?,
                Value::Null => {}
                _ => anyhow::bail!("'checks' must be a list"),
            }
        }
        Value::Null => {}
        _ => anyhow::bail!("Expected a list of checks"),
    }

    log::debug!(
        "Parsed checklist {:?} with {} checks",
        file.name,
        file.checks.len()
    );
    Ok(file)
}

/// Split at the first line that is exactly `---`
fn split_header(content: &str) -> (Option<&str>, &str) {
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let header = &content[..offset];
            let body = &content[offset + line.len()..];
            return (Some(header), body);
        }
        offset += line.len();
    }
    (None, content)
}

fn parse_checks(items: &[Value]) -> Result<Vec<CheckSpec>> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_check_value(item).with_context(|| format!("Invalid check #{}", i + 1)))
        .collect()
}

/// Parse one check mapping
pub fn parse_check_value(value: &Value) -> Result<CheckSpec> {
    let map = value
        .as_mapping()
        .context("A check must be a mapping with a name and a step")?;

    let mut spec = CheckSpec {
        name: map
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        timeout_ms: map
            .get("timeoutMs")
            .or_else(|| map.get("timeout"))
            .and_then(|v| v.as_u64()),
        ..Default::default()
    };

    if let Some(requires) = map.get("requires") {
        parse_requirements(requires, &mut spec.requires)?;
    }

    for (key, params) in map {
        let Some(key) = key.as_str() else {
            anyhow::bail!("Check keys must be strings");
        };
        if CHECK_KEYS.contains(&key) {
            continue;
        }
        if let Some(existing) = &spec.step {
            anyhow::bail!(
                "Check '{}' declares both {} and {}",
                spec.name,
                existing.keyword(),
                key
            );
        }
        spec.step = Some(parse_step(key, params)?);
    }

    Ok(spec)
}

fn parse_requirements(value: &Value, out: &mut Vec<Requirement>) -> Result<()> {
    match value {
        Value::String(s) if s == "authenticated" => out.push(Requirement::Authenticated),
        Value::Sequence(items) => {
            for item in items {
                parse_requirements(item, out)?;
            }
        }
        Value::Mapping(map) => {
            for (key, val) in map {
                let target = val
                    .as_str()
                    .context("Requirement target must be a string")?
                    .to_string();
                match key.as_str() {
                    Some("passed") => out.push(Requirement::Passed(target)),
                    Some("var") => out.push(Requirement::Var(target)),
                    other => anyhow::bail!("Unknown requirement: {:?}", other),
                }
            }
        }
        other => anyhow::bail!("Unknown requirement: {:?}", other),
    }
    Ok(())
}

/// Parse a step from its YAML key and parameters
pub fn parse_step(key: &str, params: &Value) -> Result<Step> {
    let step = match key {
        "createActor" | "signUp" => Step::CreateActor(from_params(key, params)?),
        "authenticate" | "signIn" => Step::Authenticate(from_params(key, params)?),
        "deauthenticate" | "signOut" => Step::Deauthenticate,
        "createRecord" => Step::CreateRecord(from_params(key, params)?),
        "readRecord" => Step::ReadRecord(from_params(key, params)?),
        "updateRecord" => Step::UpdateRecord(from_params(key, params)?),
        "deleteRecord" => Step::DeleteRecord(from_params(key, params)?),
        "listRecords" => Step::ListRecords(from_params(key, params)?),
        "uploadBlob" => Step::UploadBlob(from_params(key, params)?),
        "getBlobUrl" => Step::GetBlobUrl(blob_params(key, params)?),
        "deleteBlob" => Step::DeleteBlob(blob_params(key, params)?),
        "fileExists" => Step::FileExists(match params {
            Value::String(s) => FileExistsParams {
                paths: vec![s.clone()],
            },
            Value::Sequence(_) => FileExistsParams {
                paths: from_params(key, params)?,
            },
            _ => from_params(key, params)?,
        }),
        "fileContains" => Step::FileContains(from_params(key, params)?),
        _ => anyhow::bail!("Unknown step: {}", key),
    };
    Ok(step)
}

fn from_params<T: serde::de::DeserializeOwned>(key: &str, params: &Value) -> Result<T> {
    serde_yaml::from_value(params.clone())
        .with_context(|| format!("Invalid parameters for {}", key))
}

/// Blob steps accept a bare path as shorthand
fn blob_params(key: &str, params: &Value) -> Result<BlobParams> {
    match params {
        Value::String(s) => Ok(BlobParams {
            blob: s.clone(),
            save_as: None,
        }),
        _ => from_params(key, params),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::types::Expectation;
    use serde_json::json;

    #[test]
    fn test_parse_header_and_checks() {
        let yaml = r#"
name: storage smoke
timeoutMs: 5000
env:
  PASSWORD: secret123
---
- name: sign up
  createActor:
    identity: "storage${timestamp}@example.com"
    credential: "${PASSWORD}"
- name: upload
  requires: authenticated
  uploadBlob:
    path: reviews/test.txt
    content: Hello
    saveAs: blobPath
- name: cleanup
  requires:
    - authenticated
    - var: blobPath
  deleteBlob: "${blobPath}"
"#;

        let file = parse_checklist_content(yaml).unwrap();
        assert_eq!(file.name.as_deref(), Some("storage smoke"));
        assert_eq!(file.timeout_ms, Some(5000));
        assert_eq!(file.env["PASSWORD"], "secret123");
        assert_eq!(file.checks.len(), 3);

        assert_eq!(file.checks[1].requires, vec![Requirement::Authenticated]);
        assert_eq!(
            file.checks[2].requires,
            vec![
                Requirement::Authenticated,
                Requirement::Var("blobPath".to_string())
            ]
        );
        match &file.checks[2].step {
            Some(Step::DeleteBlob(p)) => assert_eq!(p.blob, "${blobPath}"),
            other => panic!("unexpected step: {:?}", other),
        }
    }

    #[test]
    fn test_parse_mapping_layout() {
        let yaml = r#"
name: records
runTimeoutMs: 60000
checks:
  - name: create
    createRecord:
      collection: test
      payload:
        value: 42
        active: true
      saveAs: docId
  - name: read
    readRecord:
      collection: test
      id: "${docId}"
  - name: gone
    readRecord:
      collection: test
      id: "${docId}"
      expect: absent
  - name: out
    signOut:
"#;

        let file = parse_checklist_content(yaml).unwrap();
        assert_eq!(file.run_timeout_ms, Some(60000));
        assert_eq!(file.checks.len(), 4);

        match &file.checks[0].step {
            Some(Step::CreateRecord(p)) => {
                assert_eq!(p.payload, json!({"value": 42, "active": true}));
                assert_eq!(p.save_as.as_deref(), Some("docId"));
            }
            other => panic!("unexpected step: {:?}", other),
        }
        match &file.checks[2].step {
            Some(Step::ReadRecord(p)) => assert_eq!(p.expect, Expectation::Absent),
            other => panic!("unexpected step: {:?}", other),
        }
        assert_eq!(file.checks[3].step, Some(Step::Deauthenticate));
    }

    #[test]
    fn test_check_without_step_or_name() {
        let yaml = "- requires: authenticated\n- name: only a name\n";
        let file = parse_checklist_content(yaml).unwrap();
        assert_eq!(file.checks[0].name, "");
        assert!(file.checks[1].step.is_none());
    }

    #[test]
    fn test_rejects_unknown_and_double_steps() {
        let err = parse_checklist_content("- name: x\n  teleport: {}\n").unwrap_err();
        assert!(format!("{:#}", err).contains("Unknown step: teleport"));

        let yaml = "- name: x\n  signOut:\n  deauthenticate:\n";
        let err = parse_checklist_content(yaml).unwrap_err();
        assert!(format!("{:#}", err).contains("declares both"));
    }

    #[test]
    fn test_file_exists_shorthands() {
        let yaml = r#"
- name: one
  fileExists: .env
- name: many
  fileExists: [firestore.rules, package.json]
"#;
        let file = parse_checklist_content(yaml).unwrap();
        match (&file.checks[0].step, &file.checks[1].step) {
            (Some(Step::FileExists(a)), Some(Step::FileExists(b))) => {
                assert_eq!(a.paths, vec![".env"]);
                assert_eq!(b.paths, vec!["firestore.rules", "package.json"]);
            }
            other => panic!("unexpected steps: {:?}", other),
        }
    }

    #[test]
    fn test_file_name_defaults_to_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smoke.yaml");
        std::fs::write(&path, "- name: out\n  signOut:\n").unwrap();

        let file = parse_checklist_file(&path).unwrap();
        assert_eq!(file.name.as_deref(), Some("smoke"));
        assert_eq!(file.checks.len(), 1);
    }
}
