//! Function library injected into every compiled template.
//!
//! A [`FunctionLibrary`] is a named set of Tera filters and functions. The
//! engine registers the whole library on each artifact it creates, so every
//! definition merged into a template sees the same helpers.
//!
//! [`FunctionLibrary::builtins`] carries the stock helpers:
//!
//! | name         | kind   | example                                            |
//! |--------------|--------|----------------------------------------------------|
//! | `has_prefix` | filter | `{% if path | has_prefix(prefix="/docs") %}`        |
//! | `has_suffix` | filter | `{% if file | has_suffix(suffix=".md") %}`          |
//! | `keys`       | filter | `{{ settings | keys | join(sep=",") }}`             |
//! | `sort_desc`  | filter | `{{ scores | sort_desc | first }}`                 |
//! | `sub`        | filter | `{{ items | length | sub }}`, `{{ n | sub(n=3) }}` |
//! | `json_decode`| filter | `{% set cfg = raw | json_decode %}`                 |
//! | `to_json`    | filter | `{{ cfg | to_json(indent="  ") }}`                 |
//! | `prefix`     | filter | `{{ title | prefix(n=10) }}`                       |
//! | `suffix`     | filter | `{{ sha | suffix(n=7) }}`                          |
//! | `equals`     | filter | `{% if role | equals(values=["admin","owner"]) %}` |
//!
//! Tera's own filters (`upper`, `join`, `length`, `sort`, ...) stay available.

use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tera::{Filter, Function, Tera};

/// Named filters and functions shared by every template of a runtime.
///
/// Cloning is cheap: entries are reference counted.
#[derive(Clone, Default)]
pub struct FunctionLibrary {
    filters: BTreeMap<String, Arc<dyn Filter>>,
    functions: BTreeMap<String, Arc<dyn Function>>,
}

impl fmt::Debug for FunctionLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionLibrary")
            .field("filters", &self.filters.keys().collect::<Vec<_>>())
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FunctionLibrary {
    /// An empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock helper set described in the module documentation.
    pub fn builtins() -> Self {
        let mut library = Self::new();
        library
            .register_filter("has_prefix", has_prefix)
            .register_filter("has_suffix", has_suffix)
            .register_filter("keys", keys)
            .register_filter("sort_desc", sort_desc)
            .register_filter("sub", sub)
            .register_filter("json_decode", json_decode)
            .register_filter("to_json", to_json)
            .register_filter("prefix", prefix)
            .register_filter("suffix", suffix)
            .register_filter("equals", equals);
        library
    }

    /// Add or replace a filter.
    pub fn register_filter(
        &mut self,
        name: impl Into<String>,
        filter: impl Filter + 'static,
    ) -> &mut Self {
        self.filters.insert(name.into(), Arc::new(filter));
        self
    }

    /// Add or replace a global function.
    pub fn register_function(
        &mut self,
        name: impl Into<String>,
        function: impl Function + 'static,
    ) -> &mut Self {
        self.functions.insert(name.into(), Arc::new(function));
        self
    }

    /// Names of the registered filters, sorted.
    pub fn filter_names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    /// Names of the registered functions, sorted.
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// Register every entry on a Tera instance.
    pub(crate) fn install(&self, tera: &mut Tera) {
        for (name, filter) in &self.filters {
            tera.register_filter(name, SharedFilter(Arc::clone(filter)));
        }
        for (name, function) in &self.functions {
            tera.register_function(name, SharedFunction(Arc::clone(function)));
        }
    }
}

struct SharedFilter(Arc<dyn Filter>);

impl Filter for SharedFilter {
    fn filter(&self, value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
        self.0.filter(value, args)
    }

    fn is_safe(&self) -> bool {
        self.0.is_safe()
    }
}

struct SharedFunction(Arc<dyn Function>);

impl Function for SharedFunction {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        self.0.call(args)
    }

    fn is_safe(&self) -> bool {
        self.0.is_safe()
    }
}

fn str_value<'a>(filter: &str, value: &'a Value) -> tera::Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| tera::Error::msg(format!("`{filter}` filter expects a string value")))
}

fn str_arg<'a>(
    filter: &str,
    args: &'a HashMap<String, Value>,
    name: &str,
) -> tera::Result<&'a str> {
    args.get(name).and_then(Value::as_str).ok_or_else(|| {
        tera::Error::msg(format!("`{filter}` filter requires a string `{name}` argument"))
    })
}

fn int_arg(
    filter: &str,
    args: &HashMap<String, Value>,
    name: &str,
    default: Option<i64>,
) -> tera::Result<i64> {
    match args.get(name) {
        Some(value) => value.as_i64().ok_or_else(|| {
            tera::Error::msg(format!("`{filter}` filter requires an integer `{name}` argument"))
        }),
        None => default.ok_or_else(|| {
            tera::Error::msg(format!("`{filter}` filter requires an integer `{name}` argument"))
        }),
    }
}

fn has_prefix(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = str_value("has_prefix", value)?;
    let prefix = str_arg("has_prefix", args, "prefix")?;
    Ok(Value::Bool(s.starts_with(prefix)))
}

fn has_suffix(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = str_value("has_suffix", value)?;
    let suffix = str_arg("has_suffix", args, "suffix")?;
    Ok(Value::Bool(s.ends_with(suffix)))
}

/// Object keys, or array indices.
fn keys(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    match value {
        Value::Object(map) => {
            let mut names: Vec<&String> = map.keys().collect();
            names.sort();
            Ok(Value::Array(names.into_iter().cloned().map(Value::String).collect()))
        }
        Value::Array(items) => Ok(Value::Array((0..items.len()).map(Value::from).collect())),
        _ => Err(tera::Error::msg("`keys` filter expects an object or an array")),
    }
}

/// Numbers compare numerically and strings lexically; anything else keeps its
/// relative position.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn sort_desc(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let mut items = value
        .as_array()
        .cloned()
        .ok_or_else(|| tera::Error::msg("`sort_desc` filter expects an array"))?;
    items.sort_by(|a, b| compare_values(b, a));
    Ok(Value::Array(items))
}

/// `value - n`, with `n` defaulting to 1.
fn sub(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let n = int_arg("sub", args, "n", Some(1))?;
    if let Some(v) = value.as_i64() {
        return v
            .checked_sub(n)
            .map(Value::from)
            .ok_or_else(|| tera::Error::msg("`sub` filter overflowed"));
    }
    match value.as_f64() {
        Some(v) => Ok(Value::from(v - n as f64)),
        None => Err(tera::Error::msg("`sub` filter expects a number")),
    }
}

fn json_decode(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let source = str_value("json_decode", value)?;
    serde_json::from_str(source)
        .map_err(|e| tera::Error::msg(format!("`json_decode` filter could not parse input: {e}")))
}

fn to_json(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let encoded = match args.get("indent") {
        None => serde_json::to_string(value).map_err(tera::Error::json)?,
        Some(indent) => {
            let indent = indent.as_str().ok_or_else(|| {
                tera::Error::msg("`to_json` filter requires a string `indent` argument")
            })?;
            let mut buf = Vec::new();
            let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
            let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
            value.serialize(&mut serializer).map_err(tera::Error::json)?;
            String::from_utf8(buf).map_err(|e| tera::Error::msg(e.to_string()))?
        }
    };
    Ok(Value::String(encoded))
}

/// First `n` characters.
fn prefix(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = str_value("prefix", value)?;
    let n = int_arg("prefix", args, "n", None)?;
    let taken: String = s.chars().take(usize::try_from(n).unwrap_or(0)).collect();
    Ok(Value::String(taken))
}

/// Last `n` characters.
fn suffix(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = str_value("suffix", value)?;
    let n = usize::try_from(int_arg("suffix", args, "n", None)?).unwrap_or(0);
    let total = s.chars().count();
    let taken: String = s.chars().skip(total.saturating_sub(n)).collect();
    Ok(Value::String(taken))
}

/// True when the value equals any entry of `values`.
fn equals(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let candidates = args.get("values").and_then(Value::as_array).ok_or_else(|| {
        tera::Error::msg("`equals` filter requires an array `values` argument")
    })?;
    Ok(Value::Bool(candidates.iter().any(|candidate| candidate == value)))
}
