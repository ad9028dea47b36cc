//! # deployment
//!
//! Declarative deployment configuration: apps, the servers that host them,
//! and the playbooks that deploy them.
//!
//! Fields may refer to other fields of the same document through `{{ }}`
//! templates. Loading is a two-stage flow:
//!
//! 1. [`Configuration::load`] reads the raw document (JSON, or TOML by
//!    extension)
//! 2. [`prepass`] returns a resolved copy where every app `Name` and `Data`
//!    is plain text
//!
//! The resolved snapshot is then shared read-only through a [`ConfigView`].
//!
//! ```
//! use deployment::{Configuration, ConfigFormat, prepass};
//! use template::Mode;
//!
//! let raw = Configuration::parse(
//!     r#"{"Apps": [{"Name": "{{.App.Type}}-1", "Type": "web"}]}"#,
//!     ConfigFormat::Json,
//!     "inline",
//! ).unwrap();
//! let resolved = prepass(&raw, Mode::Strict).unwrap();
//! assert_eq!(resolved.apps[0].name, "web-1");
//! ```

#![deny(unsafe_code)]

pub mod error;
pub mod loader;
pub mod prepass;
pub mod types;
pub mod validate;
pub mod view;

pub use error::{Error, Result};
pub use loader::ConfigFormat;
pub use prepass::prepass;
pub use types::{App, Configuration, DockerAction, Playbook, Server};
pub use validate::{Warning, playbook_label};
pub use view::ConfigView;
