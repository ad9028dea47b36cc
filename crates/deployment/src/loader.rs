//! Reading configuration documents from disk.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::Configuration;

/// On-disk format of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// Pick the format from a file extension; anything but `.toml` is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

impl Configuration {
    /// Load a configuration file, choosing the parser by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let origin = path.display().to_string();
        let config = Self::parse(&content, ConfigFormat::from_path(path), &origin)?;

        log::debug!(
            "loaded {}: {} apps, {} playbooks, {} servers",
            origin,
            config.apps.len(),
            config.playbooks.len(),
            config.servers.len()
        );
        Ok(config)
    }

    /// Parse a document held in memory. `origin` names it in errors.
    pub fn parse(content: &str, format: ConfigFormat, origin: &str) -> Result<Self> {
        match format {
            ConfigFormat::Json => serde_json::from_str(content).map_err(|source| Error::Json {
                origin: origin.to_string(),
                source,
            }),
            ConfigFormat::Toml => toml::from_str(content).map_err(|source| Error::Toml {
                origin: origin.to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.TOML")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("config")), ConfigFormat::Json);
    }

    #[test]
    fn test_load_json() {
        let file = write_temp(
            ".json",
            r#"{"Env": "prod", "Apps": [{"Name": "web"}], "Playbooks": []}"#,
        );
        let config = Configuration::load(file.path()).unwrap();
        assert_eq!(config.env, "prod");
        assert_eq!(config.apps[0].name, "web");
    }

    #[test]
    fn test_load_toml() {
        let file = write_temp(
            ".toml",
            r#"
Env = "staging"

[[Apps]]
Name = "api"
Ports = [8080]

[[Playbooks]]
App = "api"
Play = "deploy.yml"

[[Playbooks.Actions]]
Image = "api:latest"
"#,
        );
        let config = Configuration::load(file.path()).unwrap();
        assert_eq!(config.env, "staging");
        assert_eq!(config.apps[0].ports, vec![8080]);
        assert_eq!(config.playbooks[0].actions[0].image, "api:latest");
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Configuration::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(err.is_load_error());
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let file = write_temp(".json", r#"{"Apps": [}"#);
        let err = Configuration::load(file.path()).unwrap_err();
        assert!(err.is_parse_error());
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[test]
    fn test_ports_are_not_range_checked() {
        let config = Configuration::parse(
            r#"{"Apps": [{"Name": "web", "Ports": [-1, 70000]}]}"#,
            ConfigFormat::Json,
            "inline",
        )
        .unwrap();
        assert_eq!(config.apps[0].ports, vec![-1, 70000]);
    }

    #[test]
    fn test_wrong_type_is_parse_error() {
        let err = Configuration::parse(r#"{"Apps": "web"}"#, ConfigFormat::Json, "inline")
            .unwrap_err();
        assert!(err.is_parse_error());
    }
}
