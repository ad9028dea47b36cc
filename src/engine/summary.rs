//! Per-playbook results and the end-of-run summary

use std::fmt;
use std::time::Duration;

use colored::Colorize;

use super::command::BuildError;

/// What happened to one playbook.
#[derive(Debug)]
pub enum PlaybookResult {
    /// Process exited 0
    Succeeded,
    /// Process exited non-zero (`None` when killed by a signal)
    Failed { code: Option<i32> },
    /// Process exceeded the run timeout and was killed
    TimedOut { after: Duration },
    /// A templated field did not resolve; nothing was run
    Unresolved { error: BuildError },
    /// The process started but could not be waited on
    Lost { message: String },
    /// Not run
    Skipped { reason: String },
    /// Dry run: command assembled, not executed
    Planned,
}

impl PlaybookResult {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::Failed { .. }
                | Self::TimedOut { .. }
                | Self::Unresolved { .. }
                | Self::Lost { .. }
        )
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Succeeded | Self::Planned => "✓",
            Self::Skipped { .. } => "⊘",
            _ => "✗",
        }
    }
}

impl fmt::Display for PlaybookResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed { code: Some(code) } => write!(f, "exited with status {code}"),
            Self::Failed { code: None } => write!(f, "killed by signal"),
            Self::TimedOut { after } => write!(f, "timed out after {}s", after.as_secs_f64()),
            Self::Unresolved { error } => write!(f, "{error}"),
            Self::Lost { message } => write!(f, "{message}"),
            Self::Skipped { reason } => write!(f, "skipped: {reason}"),
            Self::Planned => write!(f, "planned"),
        }
    }
}

/// A playbook's label and result.
#[derive(Debug)]
pub struct PlaybookReport {
    pub label: String,
    pub result: PlaybookResult,
}

/// Counts and failures of a whole run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub unresolved: usize,
    pub skipped: usize,
    pub planned: usize,
    pub reports: Vec<PlaybookReport>,
}

impl RunSummary {
    pub fn record(&mut self, label: String, result: PlaybookResult) {
        match &result {
            PlaybookResult::Succeeded => self.succeeded += 1,
            PlaybookResult::Failed { .. } | PlaybookResult::Lost { .. } => self.failed += 1,
            PlaybookResult::TimedOut { .. } => self.timed_out += 1,
            PlaybookResult::Unresolved { .. } => self.unresolved += 1,
            PlaybookResult::Skipped { .. } => self.skipped += 1,
            PlaybookResult::Planned => self.planned += 1,
        }
        self.reports.push(PlaybookReport { label, result });
    }

    pub fn total(&self) -> usize {
        self.reports.len()
    }

    /// True when no playbook failed, timed out, or was left unresolved.
    pub fn is_success(&self) -> bool {
        self.failed + self.timed_out + self.unresolved == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &PlaybookReport> {
        self.reports.iter().filter(|r| r.result.is_failure())
    }
}

/// Print final summary
pub fn print_summary(summary: &RunSummary) {
    println!();
    if summary.is_success() {
        println!("  {} All playbooks completed", "✓".green().bold());
    } else {
        println!("  {} Run finished with failures", "⚠".yellow().bold());
    }

    if summary.succeeded > 0 {
        println!("    • {} succeeded", summary.succeeded);
    }
    if summary.planned > 0 {
        println!("    • {} planned (dry run)", summary.planned);
    }
    if summary.skipped > 0 {
        println!("    • {} skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {}", summary.failed, "failed".red());
    }
    if summary.timed_out > 0 {
        println!("    • {} {}", summary.timed_out, "timed out".red());
    }
    if summary.unresolved > 0 {
        println!("    • {} {}", summary.unresolved, "unresolved".red());
    }

    for report in summary.failures() {
        println!(
            "      {} {}: {}",
            report.result.symbol().red(),
            report.label,
            report.result
        );
    }
}
