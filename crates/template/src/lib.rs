//! # template
//!
//! A tiny `{{ }}` template language for configuration documents that refer
//! to themselves.
//!
//! ## Expressions
//!
//! - `{{.Env}}`, `{{.App.Repo}}` - dotted field walk from the context root
//! - `{{(lookup "App" "web1").Repo}}` - named entry supplied by the context
//! - `{{(index .Apps 0).Name}}` - array position or object key
//!
//! ## Example
//!
//! ```
//! use serde_json::json;
//!
//! let ctx = json!({"App": {"Type": "web"}});
//! let name = template::resolve("{{.App.Type}}-1", &ctx).unwrap();
//! assert_eq!(name, "web-1");
//!
//! let scoped = template::rewrite_scope("{{.App.Repo}}", "web-1");
//! assert_eq!(scoped, r#"{{(lookup "App" "web-1").Repo}}"#);
//! ```
//!
//! Resolution is strict by default. [`Mode::Lenient`] swallows errors and
//! keeps the text rendered before the first failing action, for
//! configurations written against older tooling that never reported them.

#![deny(unsafe_code)]

pub mod error;
pub mod eval;
pub mod parser;
pub mod scope;

pub use error::{Error, Result};
pub use eval::Context;
pub use scope::{APP_KIND, rewrite_scope};

use parser::{Segment, parse_segments};

/// How resolution failures are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Return the first error
    #[default]
    Strict,
    /// Stop at the first failing action and keep the text before it
    Lenient,
}

/// A parsed template, reusable across contexts.
#[derive(Debug, Clone)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse template source.
    pub fn parse(source: &str) -> Result<Self> {
        Ok(Self {
            segments: parse_segments(source)?,
        })
    }

    /// Render against a context, stopping at the first failing action.
    pub fn render<C: Context + ?Sized>(&self, ctx: &C) -> Result<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Action { expr, .. } => {
                    let value = eval::eval(expr, ctx)?;
                    out.push_str(&eval::render(&value, expr)?);
                }
            }
        }
        Ok(out)
    }

    /// Render against a context, stopping quietly at the first failing action.
    ///
    /// Returns the text rendered before the failure.
    pub fn render_lenient<C: Context + ?Sized>(&self, ctx: &C) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Action { source, expr } => {
                    match eval::eval(expr, ctx).and_then(|v| eval::render(&v, expr)) {
                        Ok(text) => out.push_str(&text),
                        Err(e) => {
                            log::debug!("{{{{{source}}}}} failed, keeping {out:?} ({e})");
                            break;
                        }
                    }
                }
            }
        }
        out
    }
}

/// Resolve template text against a context.
///
/// Text without `{{` is returned as is, without parsing.
pub fn resolve<C: Context + ?Sized>(source: &str, ctx: &C) -> Result<String> {
    resolve_with(source, ctx, Mode::Strict)
}

/// Resolve template text with an explicit [`Mode`].
///
/// In lenient mode this never fails; a template that does not parse
/// resolves to the empty string.
pub fn resolve_with<C: Context + ?Sized>(source: &str, ctx: &C, mode: Mode) -> Result<String> {
    if !source.contains("{{") {
        return Ok(source.to_string());
    }

    match mode {
        Mode::Strict => Template::parse(source)?.render(ctx),
        Mode::Lenient => match Template::parse(source) {
            Ok(template) => Ok(template.render_lenient(ctx)),
            Err(e) => {
                log::debug!("unparseable template {source:?} -> empty ({e})");
                Ok(String::new())
            }
        },
    }
}

/// Scope `source` to `app`, then resolve it.
pub fn resolve_scoped<C: Context + ?Sized>(
    source: &str,
    app: &str,
    ctx: &C,
    mode: Mode,
) -> Result<String> {
    resolve_with(&rewrite_scope(source, app), ctx, mode)
}
