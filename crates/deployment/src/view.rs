//! Read-only template view over a [`Configuration`].

use serde_json::Value;
use template::Context;

use crate::error::{Error, Result};
use crate::types::{App, Configuration};

/// Root field that holds the "current app" while one is bound.
const CURRENT_APP: &str = "App";

/// A configuration rendered as a JSON tree for template evaluation.
///
/// `lookup` supports three kinds:
///
/// | kind       | collection  | key    |
/// |------------|-------------|--------|
/// | `App`      | `Apps`      | `Name` |
/// | `Playbook` | `Playbooks` | `Name` |
/// | `Server`   | `Servers`   | `Role` |
#[derive(Debug, Clone)]
pub struct ConfigView {
    root: Value,
}

impl ConfigView {
    pub fn new(config: &Configuration) -> Result<Self> {
        let root = serde_json::to_value(config).map_err(Error::View)?;
        Ok(Self { root })
    }

    /// Bind `.App` to the given app, replacing any previous binding.
    pub fn bind_app(&mut self, app: &App) -> Result<()> {
        let value = serde_json::to_value(app).map_err(Error::View)?;
        if let Value::Object(map) = &mut self.root {
            map.insert(CURRENT_APP.to_string(), value);
        }
        Ok(())
    }

    /// Replace entry `index` of `.Apps` with the given app.
    pub fn update_app(&mut self, index: usize, app: &App) -> Result<()> {
        let value = serde_json::to_value(app).map_err(Error::View)?;
        if let Some(slot) = self
            .root
            .get_mut("Apps")
            .and_then(Value::as_array_mut)
            .and_then(|apps| apps.get_mut(index))
        {
            *slot = value;
        }
        Ok(())
    }
}

impl Context for ConfigView {
    fn root(&self) -> &Value {
        &self.root
    }

    fn lookup(&self, kind: &str, key: &str) -> Option<&Value> {
        let (collection, key_field) = match kind {
            "App" => ("Apps", "Name"),
            "Playbook" => ("Playbooks", "Name"),
            "Server" => ("Servers", "Role"),
            _ => return None,
        };
        self.root
            .get(collection)?
            .as_array()?
            .iter()
            .find(|entry| entry.get(key_field).and_then(Value::as_str) == Some(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Server;
    use template::{Mode, resolve, resolve_scoped};

    fn config() -> Configuration {
        Configuration {
            env: "prod".to_string(),
            apps: vec![
                App {
                    name: "web-1".to_string(),
                    repo: "git://r".to_string(),
                    ports: vec![80],
                    ..Default::default()
                },
                App {
                    name: "api".to_string(),
                    repo: "git://api".to_string(),
                    ..Default::default()
                },
            ],
            servers: vec![Server {
                role: "front".to_string(),
                kind: "vm".to_string(),
                apps: vec!["web-1".to_string()],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_root_fields() {
        let view = ConfigView::new(&config()).unwrap();
        assert_eq!(resolve("{{.Env}}", &view).unwrap(), "prod");
        assert_eq!(resolve("{{(index .Apps 1).Name}}", &view).unwrap(), "api");
    }

    #[test]
    fn test_lookup_app_by_name() {
        let view = ConfigView::new(&config()).unwrap();
        let repo = resolve_scoped("{{.App.Repo}}", "web-1", &view, Mode::Strict).unwrap();
        assert_eq!(repo, "git://r");
        let ports = resolve_scoped("{{.App.Ports}}", "web-1", &view, Mode::Strict).unwrap();
        assert_eq!(ports, "[80]");
    }

    #[test]
    fn test_lookup_server_by_role() {
        let view = ConfigView::new(&config()).unwrap();
        let kind = resolve(r#"{{(lookup "Server" "front").Type}}"#, &view).unwrap();
        assert_eq!(kind, "vm");
    }

    #[test]
    fn test_unbound_app_is_missing() {
        let view = ConfigView::new(&config()).unwrap();
        assert!(matches!(
            resolve("{{.App.Repo}}", &view),
            Err(template::Error::MissingField { .. })
        ));
    }

    #[test]
    fn test_bind_app() {
        let config = config();
        let mut view = ConfigView::new(&config).unwrap();
        view.bind_app(&config.apps[1]).unwrap();
        assert_eq!(resolve("{{.App.Repo}}", &view).unwrap(), "git://api");
        view.bind_app(&config.apps[0]).unwrap();
        assert_eq!(resolve("{{.App.Repo}}", &view).unwrap(), "git://r");
    }
}
