//! Expression evaluation against a [`Context`].

use std::borrow::Cow;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::parser::Expr;

/// Read-only data a template is evaluated against.
///
/// `.Field` paths walk [`Context::root`]; `lookup "<Kind>" "<key>"` calls are
/// answered by [`Context::lookup`].
pub trait Context {
    /// Value that `.` refers to.
    fn root(&self) -> &Value;

    /// Find a named entry of the given kind.
    fn lookup(&self, _kind: &str, _key: &str) -> Option<&Value> {
        None
    }
}

impl Context for Value {
    fn root(&self) -> &Value {
        self
    }
}

/// Evaluate an expression to a value.
pub fn eval<'c, C: Context + ?Sized>(expr: &Expr, ctx: &'c C) -> Result<Cow<'c, Value>> {
    match expr {
        Expr::Dot => Ok(Cow::Borrowed(ctx.root())),
        Expr::Str(s) => Ok(Cow::Owned(Value::String(s.clone()))),
        Expr::Int(n) => Ok(Cow::Owned(Value::from(*n))),
        Expr::Field { base, name } => {
            let value = eval(base, ctx)?;
            field(value, name).ok_or_else(|| Error::MissingField {
                field: name.clone(),
                path: expr.to_string(),
            })
        }
        Expr::Call { func, args } => call(func, args, ctx),
    }
}

fn field<'c>(value: Cow<'c, Value>, name: &str) -> Option<Cow<'c, Value>> {
    match value {
        Cow::Borrowed(v) => v.as_object()?.get(name).map(Cow::Borrowed),
        Cow::Owned(Value::Object(mut map)) => map.remove(name).map(Cow::Owned),
        Cow::Owned(_) => None,
    }
}

fn call<'c, C: Context + ?Sized>(func: &str, args: &[Expr], ctx: &'c C) -> Result<Cow<'c, Value>> {
    match func {
        "lookup" => {
            let [kind, key] = args else {
                return Err(bad_args(func, format!("want 2 arguments, got {}", args.len())));
            };
            let kind = eval_str(func, kind, ctx)?;
            let key = eval_str(func, key, ctx)?;
            ctx.lookup(&kind, &key)
                .map(Cow::Borrowed)
                .ok_or(Error::UnknownEntry { kind, key })
        }
        "index" => {
            let [collection, key] = args else {
                return Err(bad_args(func, format!("want 2 arguments, got {}", args.len())));
            };
            let collection = eval(collection, ctx)?;
            let key = eval(key, ctx)?;
            index(collection, &key)
        }
        other => Err(Error::UnknownFunction(other.to_string())),
    }
}

fn index<'c>(collection: Cow<'c, Value>, key: &Value) -> Result<Cow<'c, Value>> {
    match key {
        Value::Number(n) if collection.is_array() => {
            let len = collection.as_array().map_or(0, Vec::len);
            let i = n
                .as_i64()
                .ok_or_else(|| bad_args("index", format!("bad index {n}")))?;
            let pos = usize::try_from(i)
                .ok()
                .filter(|p| *p < len)
                .ok_or(Error::IndexOutOfRange { index: i, len })?;
            Ok(match collection {
                Cow::Borrowed(items) => Cow::Borrowed(&items[pos]),
                Cow::Owned(mut items) => Cow::Owned(items[pos].take()),
            })
        }
        Value::String(name) if collection.is_object() => {
            field(collection, name).ok_or_else(|| Error::MissingField {
                field: name.clone(),
                path: format!("index \"{name}\""),
            })
        }
        other => Err(bad_args(
            "index",
            format!(
                "cannot index {} with {}",
                type_name(&collection),
                type_name(other)
            ),
        )),
    }
}

fn eval_str<C: Context + ?Sized>(func: &str, expr: &Expr, ctx: &C) -> Result<String> {
    match eval(expr, ctx)?.as_ref() {
        Value::String(s) => Ok(s.clone()),
        other => Err(bad_args(
            func,
            format!("{expr} is {}, want string", type_name(other)),
        )),
    }
}

fn bad_args(func: &str, message: String) -> Error {
    Error::BadArguments {
        func: func.to_string(),
        message,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Render a value the way it appears in template output.
///
/// Arrays print as `[a b c]`; objects have no text form.
pub fn render(value: &Value, expr: &Expr) -> Result<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        Value::Array(items) => {
            let parts = items
                .iter()
                .map(|item| render(item, expr))
                .collect::<Result<Vec<_>>>()?;
            Ok(format!("[{}]", parts.join(" ")))
        }
        Value::Object(_) => Err(Error::NotScalar {
            path: expr.to_string(),
        }),
    }
}
