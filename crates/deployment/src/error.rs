use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or pre-resolving a configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file could not be read
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid JSON for the schema
    #[error("invalid JSON in {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file is not valid TOML for the schema
    #[error("invalid TOML in {origin}: {source}")]
    Toml {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    /// Configuration could not be turned into a template view
    #[error("could not build template view: {0}")]
    View(#[source] serde_json::Error),

    /// A self-referencing app field failed to resolve during the pre-pass
    #[error("app #{index} field {field}: {source}")]
    Prepass {
        index: usize,
        field: &'static str,
        #[source]
        source: template::Error,
    },
}

impl Error {
    /// True for errors raised before any content was parsed.
    pub fn is_load_error(&self) -> bool {
        matches!(self, Error::Read { .. })
    }

    /// True for malformed documents.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Error::Json { .. } | Error::Toml { .. })
    }
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let read = Error::Read {
            path: PathBuf::from("/missing.json"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(read.is_load_error());
        assert!(!read.is_parse_error());

        let json = Error::Json {
            origin: "config.json".to_string(),
            source: serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
        };
        assert!(json.is_parse_error());
        assert!(!json.is_load_error());
    }

    #[test]
    fn test_prepass_error_names_app_and_field() {
        let err = Error::Prepass {
            index: 2,
            field: "Data",
            source: template::Error::UnknownFunction("printf".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "app #2 field Data: function \"printf\" not defined"
        );
    }
}
