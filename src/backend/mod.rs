pub mod memory;
pub mod traits;

pub use memory::MemoryBackend;
pub use traits::{Actor, Backend, BackendError, BlobRef, ErrorKind, Operation, Payload, RecordId};

use anyhow::{Context, Result};
use std::sync::Arc;

/// Names accepted by `connect`
pub const BACKENDS: &[&str] = &["memory"];

/// A failure to inject before a run, parsed from `operation=Kind`
#[derive(Debug, Clone, PartialEq)]
pub struct Injection {
    pub operation: Operation,
    pub kind: ErrorKind,
}

impl std::str::FromStr for Injection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (op, kind) = s
            .split_once('=')
            .with_context(|| format!("Expected operation=Kind, got: {}", s))?;
        Ok(Self {
            operation: op.trim().parse()?,
            kind: kind.trim().parse()?,
        })
    }
}

/// Connect to a backend by name and arm any requested failure injections
pub async fn connect(name: &str, injections: &[Injection]) -> Result<Arc<dyn Backend>> {
    match name {
        "memory" => {
            let backend = MemoryBackend::new();
            for injection in injections {
                log::warn!(
                    "Arming injected {} failure for {:?}",
                    injection.kind,
                    injection.operation
                );
                backend
                    .inject_failure(injection.operation, injection.kind.error("injected failure"))
                    .await;
            }
            Ok(Arc::new(backend))
        }
        _ => anyhow::bail!(
            "Unknown backend: {} (available: {})",
            name,
            BACKENDS.join(", ")
        ),
    }
}
