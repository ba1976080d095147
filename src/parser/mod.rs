pub mod types;
pub mod yaml;

pub use types::{CheckSpec, ChecklistFile, Requirement, Step};
pub use yaml::{parse_checklist_content, parse_checklist_file};
