//! `hipops run` - resolve the configuration and dispatch its playbooks

use std::time::Duration;

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use deployment::ConfigView;

use crate::Context;
use crate::cli::RunArgs;
use crate::engine::command::PlaybookCommand;
use crate::engine::dispatcher::select;
use crate::engine::{
    CommandSettings, DispatchOptions, PlaybookResult, Progress, dispatch, print_summary,
};
use crate::runner::ProcessRunner;
use crate::ui;

/// Run every selected playbook. Returns `false` when any of them failed.
pub fn run(ctx: &Context, args: RunArgs) -> Result<bool> {
    let mode = super::mode(args.lenient);
    let config = super::load_resolved(&args.config, mode)?;
    log::debug!(
        "loaded {} apps, {} servers, {} playbooks",
        config.apps.len(),
        config.servers.len(),
        config.playbooks.len()
    );

    for warning in config.validate() {
        ui::warn(&warning.to_string());
    }

    let opts = DispatchOptions {
        settings: CommandSettings {
            program: args.program,
            playbooks_dir: shellexpand::tilde(&args.playbook_path).into_owned(),
            hosts: args.hosts,
            private_key: shellexpand::tilde(&args.private_key).into_owned(),
            verbosity: args.verbosity,
            mode,
            raw_vars: args.raw_vars,
        },
        timeout: args.timeout.map(Duration::from_secs),
        dry_run: args.dry_run,
        only: args.only,
        fail_fast: args.fail_fast,
    };

    if !ctx.quiet {
        ui::header("hipops run");
        if !config.id.is_empty() {
            ui::kv("Id", &config.id);
        }
        if !config.env.is_empty() {
            ui::kv("Env", &config.env);
        }
        ui::kv("Hosts", &opts.settings.hosts);
        ui::kv("Playbooks", &opts.settings.playbooks_dir);
        if let Some(timeout) = opts.timeout {
            ui::kv("Timeout", &format!("{}s", timeout.as_secs()));
        }
        println!();
    }

    if args.confirm && !opts.dry_run {
        let view = ConfigView::new(&config).context("Failed to build configuration view")?;
        let count = select(&config, &view, opts.only.as_deref()).len();
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!(
                "Run {count} playbook(s) against {}?",
                opts.settings.hosts
            ))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            ui::info("Aborted");
            return Ok(true);
        }
    }

    let mut progress = UiProgress {
        quiet: ctx.quiet,
        dry_run: opts.dry_run,
    };
    let summary = dispatch(&config, &opts, &ProcessRunner, &mut progress)?;

    if summary.total() == 0 {
        match &opts.only {
            Some(only) => ui::warn(&format!("No playbook matches '{only}'")),
            None => ui::warn("Configuration has no playbooks"),
        }
        return Ok(true);
    }

    if !ctx.quiet || !summary.is_success() {
        print_summary(&summary);
    }
    Ok(summary.is_success())
}

/// Terminal progress for a dispatch run.
struct UiProgress {
    quiet: bool,
    dry_run: bool,
}

impl Progress for UiProgress {
    fn on_dispatch(&mut self, index: usize, total: usize, label: &str, command: &PlaybookCommand) {
        if self.quiet && !self.dry_run {
            return;
        }
        ui::step(index + 1, total, label);
        if self.dry_run {
            println!("  {}", command.invocation.display());
        }
    }

    fn on_result(&mut self, label: &str, result: &PlaybookResult) {
        match result {
            PlaybookResult::Succeeded if !self.quiet => {
                ui::success(&format!("{label} {result}"));
            }
            PlaybookResult::Skipped { .. } if !self.quiet => {
                ui::dim(&format!("{label} {result}"));
            }
            _ if result.is_failure() => {
                ui::error(&format!("{} {}", label.bold(), result));
            }
            _ => {}
        }
    }
}
