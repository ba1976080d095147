pub mod backend;
pub mod parser;
pub mod report;
pub mod runner;
pub mod suites;
pub mod utils;

// Re-export common items
pub use backend::{connect, Backend, BackendError, ErrorKind, MemoryBackend};
pub use report::generate_report;
pub use runner::{run_path, run_suite, Check, ChecklistRunner, Precondition, Report, RunOptions};
pub use utils::RunnerConfig;
