//! Single-pass resolution of self-referencing app fields.
//!
//! App `Name` and `Data` may refer to other fields (`"{{.App.Type}}-1"`,
//! `"/data/{{.App.Name}}"`). The pre-pass turns them into plain text so that
//! playbooks can look apps up by their final name.
//!
//! Resolution rules:
//! - `.App` is bound to the app being resolved
//! - apps are resolved in document order and written back as they go, so
//!   `.Apps` shows earlier apps resolved and later apps as loaded
//! - `Name` is resolved before `Data`, and `Data` sees the resolved `Name`

use template::Mode;

use crate::error::{Error, Result};
use crate::types::Configuration;
use crate::view::ConfigView;

/// Produce a resolved copy of `raw`. The input is left untouched.
pub fn prepass(raw: &Configuration, mode: Mode) -> Result<Configuration> {
    let mut view = ConfigView::new(raw)?;
    let mut resolved = raw.clone();

    for (index, app) in resolved.apps.iter_mut().enumerate() {
        view.bind_app(app)?;
        let name = resolve_field(&app.name, &view, mode, index, "Name")?;
        if name != app.name {
            log::debug!("app #{index} Name: {:?} -> {:?}", app.name, name);
        }
        app.name = name;
        view.update_app(index, app)?;

        view.bind_app(app)?;
        let data = resolve_field(&app.data, &view, mode, index, "Data")?;
        if data != app.data {
            log::debug!("app #{index} Data: {:?} -> {:?}", app.data, data);
        }
        app.data = data;
        view.update_app(index, app)?;
    }

    Ok(resolved)
}

fn resolve_field(
    source: &str,
    view: &ConfigView,
    mode: Mode,
    index: usize,
    field: &'static str,
) -> Result<String> {
    template::resolve_with(source, view, mode).map_err(|e| Error::Prepass {
        index,
        field,
        source: e,
    })
}
