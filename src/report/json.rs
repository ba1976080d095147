use super::types::ChecklistResults;
use anyhow::{Context, Result};
use std::path::Path;

/// Generate JSON report
pub async fn generate(results: &ChecklistResults, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(results)?;

    if let Some(path) = output {
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("JSON report saved to: {}", path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

/// Save the results file that `report` re-renders later
pub fn write_results(results: &ChecklistResults, output_dir: &Path) -> Result<std::path::PathBuf> {
    let path = output_dir.join("checklist-results.json");
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Load a saved results file
pub fn read_results(path: &Path) -> Result<ChecklistResults> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read results: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid results file: {}", path.display()))
}
