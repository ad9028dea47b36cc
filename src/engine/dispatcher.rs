//! Playbook dispatch - runs every playbook of a resolved configuration in order

use std::time::Duration;

use anyhow::{Context as AnyhowContext, Result};
use deployment::{ConfigView, Configuration, Playbook, playbook_label};
use template::Mode;

use super::command::{CommandSettings, PlaybookCommand, build};
use super::summary::{PlaybookResult, RunSummary};
use crate::runner::{ExitOutcome, Runner};

/// Options for one dispatch run.
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    pub settings: CommandSettings,
    /// Per-playbook timeout; `None` waits forever
    pub timeout: Option<Duration>,
    /// Assemble and report commands without running them
    pub dry_run: bool,
    /// Only dispatch playbooks whose name or play file matches
    pub only: Option<String>,
    /// Skip the remaining playbooks after the first failure
    pub fail_fast: bool,
}

/// Progress hooks for a dispatch run.
pub trait Progress {
    /// Called before a playbook's command runs (or is planned)
    fn on_dispatch(&mut self, index: usize, total: usize, label: &str, command: &PlaybookCommand);

    /// Called once a playbook has a result
    fn on_result(&mut self, label: &str, result: &PlaybookResult);
}

/// Progress sink that ignores everything
pub struct NoProgress;

impl Progress for NoProgress {
    fn on_dispatch(&mut self, _: usize, _: usize, _: &str, _: &PlaybookCommand) {}
    fn on_result(&mut self, _: &str, _: &PlaybookResult) {}
}

/// Dispatch every selected playbook of `config`, strictly in declaration order.
///
/// `config` must be the pre-passed snapshot. Per-playbook failures are
/// recorded in the summary and do not stop the run (unless `fail_fast`).
/// A program that cannot be started at all aborts the run with an error.
pub fn dispatch<R, P>(
    config: &Configuration,
    opts: &DispatchOptions,
    runner: &R,
    progress: &mut P,
) -> Result<RunSummary>
where
    R: Runner,
    P: Progress,
{
    let view = ConfigView::new(config).context("Failed to build configuration view")?;
    let selected = select(config, &view, opts.only.as_deref());

    let total = selected.len();
    let mut summary = RunSummary::default();
    let mut halted = false;

    for (n, (index, playbook)) in selected.into_iter().enumerate() {
        let label = playbook_label(index, &playbook.name, &playbook.play);

        if halted {
            let result = PlaybookResult::Skipped {
                reason: "an earlier playbook failed".to_string(),
            };
            progress.on_result(&label, &result);
            summary.record(label, result);
            continue;
        }

        let result = match build(&view, playbook, &opts.settings) {
            Err(error) => {
                log::warn!("{label}: {error}");
                PlaybookResult::Unresolved { error }
            }
            Ok(command) => {
                progress.on_dispatch(n, total, &label, &command);
                log::info!("{label}: {}", command.invocation.display());
                if opts.dry_run {
                    PlaybookResult::Planned
                } else {
                    run_command(runner, &command, opts.timeout)?
                }
            }
        };

        progress.on_result(&label, &result);
        if opts.fail_fast && result.is_failure() {
            halted = true;
        }
        summary.record(label, result);
    }

    Ok(summary)
}

fn run_command<R: Runner>(
    runner: &R,
    command: &PlaybookCommand,
    timeout: Option<Duration>,
) -> Result<PlaybookResult> {
    match runner.run(&command.invocation, timeout) {
        Ok(ExitOutcome::Success) => Ok(PlaybookResult::Succeeded),
        Ok(ExitOutcome::Failed { code }) => Ok(PlaybookResult::Failed { code }),
        Ok(ExitOutcome::TimedOut { after }) => Ok(PlaybookResult::TimedOut { after }),
        Err(e) if e.is_fatal() => Err(e).context("Cannot run playbooks"),
        Err(e) => Ok(PlaybookResult::Lost {
            message: e.to_string(),
        }),
    }
}

/// Playbooks to dispatch, with their declaration index, in declaration order.
pub fn select<'c>(
    config: &'c Configuration,
    view: &ConfigView,
    only: Option<&str>,
) -> Vec<(usize, &'c Playbook)> {
    config
        .playbooks
        .iter()
        .enumerate()
        .filter(|(i, playbook)| {
            let keep = is_selected(view, playbook, only);
            if !keep {
                log::debug!("playbook #{} not selected", i + 1);
            }
            keep
        })
        .collect()
}

/// Match `only` against the play file, the raw name, or the resolved name.
fn is_selected(view: &ConfigView, playbook: &Playbook, only: Option<&str>) -> bool {
    let Some(only) = only else {
        return true;
    };
    playbook.play == only
        || playbook.name == only
        || template::resolve_scoped(&playbook.name, &playbook.app, view, Mode::Lenient)
            .is_ok_and(|name| name == only)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{Invocation, RunError};
    use deployment::{App, DockerAction};
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Records invocations and replays scripted outcomes.
    #[derive(Default)]
    struct FakeRunner {
        calls: RefCell<Vec<Invocation>>,
        outcomes: RefCell<VecDeque<std::result::Result<ExitOutcome, RunError>>>,
    }

    impl FakeRunner {
        fn with(outcomes: Vec<std::result::Result<ExitOutcome, RunError>>) -> Self {
            Self {
                calls: RefCell::default(),
                outcomes: RefCell::new(outcomes.into()),
            }
        }
    }

    impl Runner for FakeRunner {
        fn run(
            &self,
            invocation: &Invocation,
            _timeout: Option<Duration>,
        ) -> std::result::Result<ExitOutcome, RunError> {
            self.calls.borrow_mut().push(invocation.clone());
            self.outcomes
                .borrow_mut()
                .pop_front()
                .unwrap_or(Ok(ExitOutcome::Success))
        }
    }

    #[derive(Default)]
    struct Recorder {
        dispatched: Vec<(usize, usize, String)>,
        results: Vec<String>,
    }

    impl Progress for Recorder {
        fn on_dispatch(&mut self, index: usize, total: usize, label: &str, _: &PlaybookCommand) {
            self.dispatched.push((index, total, label.to_string()));
        }

        fn on_result(&mut self, label: &str, result: &PlaybookResult) {
            self.results.push(format!("{label} {result}"));
        }
    }

    fn playbook(name: &str, app: &str, play: &str) -> Playbook {
        Playbook {
            name: name.to_string(),
            app: app.to_string(),
            play: play.to_string(),
            inventory: "local".to_string(),
            state: "started".to_string(),
            actions: vec![DockerAction {
                image: "img".to_string(),
                params: String::new(),
            }],
        }
    }

    fn config(playbooks: Vec<Playbook>) -> Configuration {
        Configuration {
            apps: vec![App {
                name: "web".to_string(),
                repo: "git://r".to_string(),
                ..Default::default()
            }],
            playbooks,
            ..Default::default()
        }
    }

    fn options() -> DispatchOptions {
        DispatchOptions {
            settings: CommandSettings {
                hosts: "local".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn play_of(invocation: &Invocation) -> &str {
        invocation.args[0].rsplit('/').next().unwrap_or_default()
    }

    #[test]
    fn test_dispatches_in_declaration_order() {
        let config = config(vec![
            playbook("provision", "", "provision.yml"),
            playbook("deploy", "web", "deploy.yml"),
            playbook("check", "web", "check.yml"),
        ]);
        let runner = FakeRunner::default();
        let summary = dispatch(&config, &options(), &runner, &mut NoProgress).unwrap();

        let plays: Vec<String> = runner
            .calls
            .borrow()
            .iter()
            .map(|c| play_of(c).to_string())
            .collect();
        assert_eq!(plays, vec!["provision.yml", "deploy.yml", "check.yml"]);
        assert_eq!(summary.succeeded, 3);
        assert!(summary.is_success());
    }

    #[test]
    fn test_failed_playbook_does_not_stop_the_run() {
        let config = config(vec![
            playbook("a", "web", "a.yml"),
            playbook("b", "web", "b.yml"),
            playbook("c", "web", "c.yml"),
        ]);
        let runner = FakeRunner::with(vec![
            Ok(ExitOutcome::Success),
            Ok(ExitOutcome::Failed { code: Some(2) }),
            Ok(ExitOutcome::Success),
        ]);
        let summary = dispatch(&config, &options(), &runner, &mut NoProgress).unwrap();

        assert_eq!(runner.calls.borrow().len(), 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert!(!summary.is_success());
        let failed: Vec<_> = summary.failures().map(|r| r.label.as_str()).collect();
        assert_eq!(failed, vec!["#2 (b)"]);
    }

    #[test]
    fn test_unresolved_playbook_is_skipped_and_reported() {
        let config = config(vec![
            playbook("a", "ghost", "a.yml"),
            playbook("b", "web", "b.yml"),
        ]);
        let runner = FakeRunner::default();
        let summary = dispatch(&config, &options(), &runner, &mut NoProgress).unwrap();

        assert_eq!(runner.calls.borrow().len(), 1);
        assert_eq!(play_of(&runner.calls.borrow()[0]), "b.yml");
        assert_eq!(summary.unresolved, 1);
        assert_eq!(summary.succeeded, 1);
        let report = &summary.reports[0];
        assert!(report.result.to_string().contains("no App named \"ghost\""));
    }

    #[test]
    fn test_start_failure_aborts_the_run() {
        let config = config(vec![playbook("a", "web", "a.yml"), playbook("b", "web", "b.yml")]);
        let runner = FakeRunner::with(vec![Err(RunError::Start {
            program: "ansible-playbook".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })]);
        let err = dispatch(&config, &options(), &runner, &mut NoProgress).unwrap_err();

        assert_eq!(runner.calls.borrow().len(), 1);
        assert!(err.downcast_ref::<RunError>().is_some_and(RunError::is_fatal));
    }

    #[test]
    fn test_wait_failure_is_local() {
        let config = config(vec![playbook("a", "web", "a.yml"), playbook("b", "web", "b.yml")]);
        let runner = FakeRunner::with(vec![Err(RunError::Wait {
            program: "ansible-playbook".to_string(),
            source: std::io::Error::other("interrupted"),
        })]);
        let summary = dispatch(&config, &options(), &runner, &mut NoProgress).unwrap();

        assert_eq!(runner.calls.borrow().len(), 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded, 1);
    }

    #[test]
    fn test_timeout_is_reported() {
        let config = config(vec![playbook("a", "web", "a.yml")]);
        let runner = FakeRunner::with(vec![Ok(ExitOutcome::TimedOut {
            after: Duration::from_secs(30),
        })]);
        let summary = dispatch(&config, &options(), &runner, &mut NoProgress).unwrap();
        assert_eq!(summary.timed_out, 1);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_fail_fast_skips_the_rest() {
        let config = config(vec![
            playbook("a", "web", "a.yml"),
            playbook("b", "web", "b.yml"),
            playbook("c", "web", "c.yml"),
        ]);
        let runner = FakeRunner::with(vec![Ok(ExitOutcome::Failed { code: Some(1) })]);
        let opts = DispatchOptions {
            fail_fast: true,
            ..options()
        };
        let summary = dispatch(&config, &opts, &runner, &mut NoProgress).unwrap();

        assert_eq!(runner.calls.borrow().len(), 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 2);
    }

    #[test]
    fn test_dry_run_runs_nothing() {
        let config = config(vec![playbook("a", "web", "a.yml"), playbook("b", "", "b.yml")]);
        let runner = FakeRunner::default();
        let opts = DispatchOptions {
            dry_run: true,
            ..options()
        };
        let mut recorder = Recorder::default();
        let summary = dispatch(&config, &opts, &runner, &mut recorder).unwrap();

        assert!(runner.calls.borrow().is_empty());
        assert_eq!(summary.planned, 2);
        assert_eq!(recorder.dispatched.len(), 2);
        assert_eq!(recorder.dispatched[1], (1, 2, "#2 (b)".to_string()));
    }

    #[test]
    fn test_only_filters_by_play_or_name() {
        let templated = playbook("deploy-{{.App.Name}}", "web", "deploy.yml");
        let config = config(vec![
            playbook("provision", "", "provision.yml"),
            templated,
            playbook("check", "web", "check.yml"),
        ]);

        let runner = FakeRunner::default();
        let opts = DispatchOptions {
            only: Some("check.yml".to_string()),
            ..options()
        };
        let summary = dispatch(&config, &opts, &runner, &mut NoProgress).unwrap();
        assert_eq!(summary.total(), 1);
        assert_eq!(play_of(&runner.calls.borrow()[0]), "check.yml");

        let runner = FakeRunner::default();
        let opts = DispatchOptions {
            only: Some("deploy-web".to_string()),
            ..options()
        };
        let summary = dispatch(&config, &opts, &runner, &mut NoProgress).unwrap();
        assert_eq!(summary.total(), 1);
        assert_eq!(play_of(&runner.calls.borrow()[0]), "deploy.yml");

        let view = ConfigView::new(&config).unwrap();
        let all = select(&config, &view, None);
        assert_eq!(all.len(), 3);
        let none = select(&config, &view, Some("missing.yml"));
        assert!(none.is_empty());
    }

    #[test]
    fn test_progress_sees_every_result() {
        let config = config(vec![playbook("a", "web", "a.yml"), playbook("b", "ghost", "b.yml")]);
        let runner = FakeRunner::default();
        let mut recorder = Recorder::default();
        dispatch(&config, &options(), &runner, &mut recorder).unwrap();

        assert_eq!(recorder.dispatched.len(), 1);
        assert_eq!(recorder.results.len(), 2);
        assert_eq!(recorder.results[0], "#1 (a) succeeded");
    }
}
