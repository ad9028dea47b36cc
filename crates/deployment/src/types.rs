//! Configuration document types.
//!
//! Field names are PascalCase on the wire (`Apps`, `SshKey`, ...) and every
//! field is optional; missing ones load as empty values.

use serde::{Deserialize, Serialize};

/// Root deployment document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Configuration {
    pub apps: Vec<App>,
    pub env: String,
    pub id: String,
    pub playbooks: Vec<Playbook>,
    pub servers: Vec<Server>,
}

/// One deployable unit.
///
/// `name` and `data` may be templates; they are plain text after the
/// pre-pass. The other fields stay templates until a playbook needs them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct App {
    pub branch: String,
    pub config: String,
    pub data: String,
    pub host: String,
    pub image: String,
    pub name: String,
    pub repo: String,
    pub ports: Vec<i64>,
    pub start: String,
    pub ssh_key: String,
    #[serde(rename = "Type")]
    pub kind: String,
}

/// A host role and the apps it runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Server {
    pub apps: Vec<String>,
    pub role: String,
    #[serde(rename = "Type")]
    pub kind: String,
}

/// One orchestration unit, dispatched as a single playbook run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Playbook {
    /// Only the first action is used
    pub actions: Vec<DockerAction>,
    /// App the playbook is scoped to; empty means unscoped
    pub app: String,
    pub inventory: String,
    pub name: String,
    /// Play file, relative to the playbooks directory
    pub play: String,
    /// Passed through verbatim, never templated
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DockerAction {
    pub image: String,
    pub params: String,
}

impl Configuration {
    /// Find an app by name.
    pub fn find_app(&self, name: &str) -> Option<&App> {
        self.apps.iter().find(|a| a.name == name)
    }

    /// Servers that list `app` among their apps.
    pub fn servers_hosting<'a>(&'a self, app: &'a str) -> impl Iterator<Item = &'a Server> + 'a {
        self.servers
            .iter()
            .filter(move |s| s.apps.iter().any(|a| a == app))
    }
}

impl Playbook {
    /// The action consulted at dispatch time.
    pub fn primary_action(&self) -> Option<&DockerAction> {
        self.actions.first()
    }

    /// True when the playbook is bound to a specific app.
    pub fn is_scoped(&self) -> bool {
        !self.app.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_are_pascal_case() {
        let json = r#"{
            "Apps": [{"Name": "web", "SshKey": "/k", "Type": "web", "Ports": [80, 443]}],
            "Env": "prod",
            "Id": "42",
            "Playbooks": [{"App": "web", "Play": "deploy.yml", "Actions": [{"Image": "nginx", "Params": "p=1"}]}],
            "Servers": [{"Apps": ["web"], "Role": "front", "Type": "vm"}]
        }"#;
        let config: Configuration = serde_json::from_str(json).unwrap();

        assert_eq!(config.env, "prod");
        assert_eq!(config.id, "42");
        let app = &config.apps[0];
        assert_eq!(app.ssh_key, "/k");
        assert_eq!(app.kind, "web");
        assert_eq!(app.ports, vec![80, 443]);
        assert_eq!(config.playbooks[0].primary_action().unwrap().image, "nginx");
        assert_eq!(config.servers[0].kind, "vm");
    }

    #[test]
    fn test_lowercase_keys_are_ignored() {
        let config: Configuration = serde_json::from_str(r#"{"env": "prod"}"#).unwrap();
        assert_eq!(config.env, "");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let config: Configuration = serde_json::from_str(r#"{"Playbooks": [{}]}"#).unwrap();
        assert!(config.apps.is_empty());
        assert!(!config.playbooks[0].is_scoped());
        assert!(config.playbooks[0].primary_action().is_none());
    }

    #[test]
    fn test_servers_hosting() {
        let config = Configuration {
            servers: vec![
                Server {
                    apps: vec!["web".to_string(), "api".to_string()],
                    role: "front".to_string(),
                    ..Default::default()
                },
                Server {
                    apps: vec!["db".to_string()],
                    role: "back".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let roles: Vec<_> = config.servers_hosting("api").map(|s| s.role.as_str()).collect();
        assert_eq!(roles, vec!["front"]);
        assert_eq!(config.servers_hosting("cache").count(), 0);
    }
}
