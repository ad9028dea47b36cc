//! Command assembly - turns one playbook into one `ansible-playbook` call

use std::borrow::Cow;

use deployment::{ConfigView, Playbook};
use template::Mode;
use thiserror::Error;

use crate::runner::Invocation;

/// App fields every scoped playbook run receives. `Data` is already plain
/// text after the pre-pass; the others may still be templates.
const APP_FIELDS: [(&str, &str); 3] = [
    ("App.Repo", "{{.App.Repo}}"),
    ("App.SshKey", "{{.App.SshKey}}"),
    ("App.Branch", "{{.App.Branch}}"),
];

/// Settings shared by every playbook command of a run.
#[derive(Debug, Clone)]
pub struct CommandSettings {
    /// Playbook executable, normally `ansible-playbook`
    pub program: String,
    /// Prefix joined to each play file verbatim (keep the trailing `/`)
    pub playbooks_dir: String,
    /// Inventory hosts target passed to `-i`
    pub hosts: String,
    pub private_key: String,
    /// Verbosity flag appended last, e.g. `-vvvvv`
    pub verbosity: String,
    pub mode: Mode,
    /// Format `-e` values without quoting
    pub raw_vars: bool,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            program: "ansible-playbook".to_string(),
            playbooks_dir: "../../playbooks/".to_string(),
            hosts: String::new(),
            private_key: String::new(),
            verbosity: "-vvvvv".to_string(),
            mode: Mode::Strict,
            raw_vars: false,
        }
    }
}

/// Why a playbook could not be turned into a command.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("playbook has no actions")]
    NoActions,

    #[error("field {field}: {source}")]
    Field {
        field: &'static str,
        #[source]
        source: template::Error,
    },
}

/// Resolved `-e` variables of one playbook run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraVars {
    pub inventory: String,
    pub name: String,
    pub image: String,
    pub state: String,
    pub params: String,
    pub repo: String,
    pub ssh_key: String,
    pub branch: String,
    pub path: String,
}

impl ExtraVars {
    /// Render as the single space-delimited `key=value` argument of `-e`.
    ///
    /// `params` is always double-quoted. Other values are double-quoted only
    /// when they contain whitespace, quotes or backslashes. Inside quotes `\`
    /// and `"` are backslash-escaped, the form ansible's `key=value` parser
    /// reads back. `raw` turns escaping off.
    pub fn render(&self, raw: bool) -> String {
        let v = |value: &'_ str| -> String {
            if raw {
                value.to_string()
            } else {
                quote_value(value).into_owned()
            }
        };
        let params = if raw {
            self.params.clone()
        } else {
            escape(&self.params)
        };

        format!(
            "inventory={} name={} image={} state={} params=\"{}\" repo={} sshKey={} branch={} path={}",
            v(&self.inventory),
            v(&self.name),
            v(&self.image),
            v(&self.state),
            params,
            v(&self.repo),
            v(&self.ssh_key),
            v(&self.branch),
            v(&self.path),
        )
    }
}

fn quote_value(value: &str) -> Cow<'_, str> {
    let needs_quoting = value
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '\\'));
    if needs_quoting {
        Cow::Owned(format!("\"{}\"", escape(value)))
    } else {
        Cow::Borrowed(value)
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// A fully resolved playbook run.
#[derive(Debug, Clone)]
pub struct PlaybookCommand {
    pub vars: ExtraVars,
    pub invocation: Invocation,
}

/// Resolve every templated field of `playbook` and assemble its command.
///
/// `view` must be built from the pre-passed configuration, so that app
/// names are final.
pub fn build(
    view: &ConfigView,
    playbook: &Playbook,
    settings: &CommandSettings,
) -> Result<PlaybookCommand, BuildError> {
    let action = playbook.primary_action().ok_or(BuildError::NoActions)?;
    let resolve = |field: &'static str, source: &str| {
        template::resolve_scoped(source, &playbook.app, view, settings.mode)
            .map_err(|e| BuildError::Field { field, source: e })
    };

    let mut vars = ExtraVars {
        inventory: resolve("Inventory", &playbook.inventory)?,
        name: resolve("Name", &playbook.name)?,
        image: resolve("Image", &action.image)?,
        state: playbook.state.clone(),
        params: resolve("Params", &action.params)?,
        ..Default::default()
    };

    if playbook.is_scoped() {
        let [repo, ssh_key, branch] = APP_FIELDS.map(|(field, expr)| {
            let value = resolve(field, expr)?;
            // App fields may themselves be templates; expand them once more
            resolve(field, &value)
        });
        vars.repo = repo?;
        vars.ssh_key = ssh_key?;
        vars.branch = branch?;
        vars.path = resolve("App.Data", "{{.App.Data}}")?;
    }

    let args = vec![
        format!("{}{}", settings.playbooks_dir, playbook.play),
        "-i".to_string(),
        settings.hosts.clone(),
        "--private-key".to_string(),
        settings.private_key.clone(),
        "-e".to_string(),
        vars.render(settings.raw_vars),
        settings.verbosity.clone(),
    ];

    Ok(PlaybookCommand {
        vars,
        invocation: Invocation::new(settings.program.clone(), args),
    })
}
