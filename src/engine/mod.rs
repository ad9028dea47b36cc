//! Dispatch engine for hipops
//!
//! The engine turns a resolved configuration into playbook runs:
//! 1. Command - Resolve a playbook's fields and assemble its invocation
//! 2. Dispatcher - Run the selected playbooks one at a time, in order
//! 3. Summary - Collect per-playbook results for the final report

pub mod command;
pub mod dispatcher;
pub mod summary;

pub use command::CommandSettings;
pub use dispatcher::{DispatchOptions, Progress, dispatch};
pub use summary::{PlaybookResult, RunSummary, print_summary};
