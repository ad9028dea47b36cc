//! Rebinding of `{{.App...}}` references to a named app.
//!
//! Playbook templates are written against a generic "current app"
//! (`{{.App.Repo}}`). At dispatch time the app is known by name, so the
//! reference is rewritten into a lookup: `{{(lookup "App" "web1").Repo}}`.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::parser::quote;

/// Entry kind that scoped references look up.
pub const APP_KIND: &str = "App";

/// Matches an action whose whole body is `.App` plus an optional field chain.
static APP_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{(\s*)\.App((?:\.[A-Za-z_][A-Za-z0-9_]*)*)(\s*)\}\}")
        .expect("app reference pattern is valid")
});

/// Rewrite `{{.App<chain>}}` so it resolves against the app named `app`.
///
/// An empty `app` leaves the text untouched.
pub fn rewrite_scope<'a>(text: &'a str, app: &str) -> Cow<'a, str> {
    if app.is_empty() {
        return Cow::Borrowed(text);
    }

    let target = format!("(lookup {} {})", quote(APP_KIND), quote(app));
    APP_REF.replace_all(text, |caps: &Captures<'_>| {
        format!("{{{{{}{}{}{}}}}}", &caps[1], target, &caps[2], &caps[3])
    })
}
