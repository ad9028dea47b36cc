//! Consistency checks that warn but never block a run.

use std::collections::HashSet;
use std::fmt;

use crate::types::Configuration;

/// A suspicious spot in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Two apps share a name; lookups pick the first
    DuplicateApp { name: String },
    /// Playbook has no actions to take image and params from
    NoActions { playbook: String },
    /// Playbook is scoped to an app that does not exist
    UnknownPlaybookApp { playbook: String, app: String },
    /// Server lists an app that does not exist
    UnknownServerApp { role: String, app: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateApp { name } => {
                write!(f, "app name \"{name}\" is used more than once")
            }
            Self::NoActions { playbook } => write!(f, "playbook {playbook} has no actions"),
            Self::UnknownPlaybookApp { playbook, app } => {
                write!(f, "playbook {playbook} targets unknown app \"{app}\"")
            }
            Self::UnknownServerApp { role, app } => {
                write!(f, "server {role} lists unknown app \"{app}\"")
            }
        }
    }
}

impl Configuration {
    /// Check a resolved configuration for references that will not work.
    ///
    /// Meant for the output of [`crate::prepass`]; on a raw document app
    /// names may still be templates.
    pub fn validate(&self) -> Vec<Warning> {
        let mut warnings = Vec::new();

        let mut seen = HashSet::new();
        for app in &self.apps {
            if !seen.insert(app.name.as_str()) {
                warnings.push(Warning::DuplicateApp {
                    name: app.name.clone(),
                });
            }
        }

        for (i, playbook) in self.playbooks.iter().enumerate() {
            let label = playbook_label(i, &playbook.name, &playbook.play);
            if playbook.actions.is_empty() {
                warnings.push(Warning::NoActions {
                    playbook: label.clone(),
                });
            }
            if playbook.is_scoped() && self.find_app(&playbook.app).is_none() {
                warnings.push(Warning::UnknownPlaybookApp {
                    playbook: label,
                    app: playbook.app.clone(),
                });
            }
        }

        for server in &self.servers {
            for app in &server.apps {
                if self.find_app(app).is_none() {
                    warnings.push(Warning::UnknownServerApp {
                        role: server.role.clone(),
                        app: app.clone(),
                    });
                }
            }
        }

        warnings
    }
}

/// Human label for a playbook: `#<n> (<name or play>)`.
pub fn playbook_label(index: usize, name: &str, play: &str) -> String {
    let what = if name.is_empty() { play } else { name };
    format!("#{} ({})", index + 1, what)
}
