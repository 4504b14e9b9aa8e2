//! Log message model
//!
//! The pipeline treats messages as opaque except for one question the
//! sampler asks: does the message have a canonical text form? Encoders render
//! messages through [`Message::write_text`] and [`Message::to_json_value`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;

/// Value type for structured logging fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(fl) => write!(f, "{}", fl),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Null => write!(f, "null"),
        }
    }
}

impl FieldValue {
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            FieldValue::String(s) => serde_json::Value::String(s.clone()),
            FieldValue::Int(i) => serde_json::Value::Number((*i).into()),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            FieldValue::Null => serde_json::Value::Null,
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<u32> for FieldValue {
    fn from(i: u32) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// Ordered key/value payload of a structured message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fields(Vec<(String, FieldValue)>);

impl Fields {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Add a field
    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.0.push((key.into(), value.into()));
        self
    }

    /// Add a field (mutable version)
    pub fn add_field<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.0.push((key.into(), value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Format fields as key=value pairs
    pub fn format_fields(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        let map = self
            .0
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json_value()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_fields())
    }
}

/// A log message
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Plain text
    Text(String),
    /// `{}` placeholders filled positionally from `args` at render time
    Template {
        template: String,
        args: Vec<FieldValue>,
    },
    /// Text with a structured payload
    Structured { text: String, fields: Fields },
    /// Pre-built JSON document; has no canonical text
    Json(serde_json::Value),
}

impl Default for Message {
    fn default() -> Self {
        Message::Text(String::new())
    }
}

impl Message {
    pub fn template(template: impl Into<String>, args: Vec<FieldValue>) -> Self {
        Message::Template {
            template: template.into(),
            args,
        }
    }

    pub fn structured(text: impl Into<String>, fields: Fields) -> Self {
        Message::Structured {
            text: text.into(),
            fields,
        }
    }

    /// Canonical text used to bucket repeated messages
    ///
    /// Templates answer with the template itself, so every rendering of the
    /// same call site lands in the same sampler bucket.
    pub fn sample_text(&self) -> Option<&str> {
        match self {
            Message::Text(text) => Some(text),
            Message::Template { template, .. } => Some(template),
            Message::Structured { text, .. } => Some(text),
            Message::Json(_) => None,
        }
    }

    /// Render the human-readable form into `out`
    pub fn write_text(&self, out: &mut String) {
        match self {
            Message::Text(text) => out.push_str(text),
            Message::Template { template, args } => render_template(out, template, args),
            Message::Structured { text, fields } => {
                out.push_str(text);
                if !fields.is_empty() {
                    out.push(' ');
                    out.push_str(&fields.format_fields());
                }
            }
            Message::Json(value) => {
                let _ = write!(out, "{}", value);
            }
        }
    }

    /// Rendered text without the structured payload
    pub fn text(&self) -> String {
        match self {
            Message::Structured { text, .. } => text.clone(),
            _ => {
                let mut out = String::new();
                self.write_text(&mut out);
                out
            }
        }
    }

    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            Message::Json(value) => value.clone(),
            _ => serde_json::Value::String(self.text()),
        }
    }

    /// Structured payload, if any
    pub fn fields(&self) -> Option<&Fields> {
        match self {
            Message::Structured { fields, .. } => Some(fields),
            _ => None,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_text(&mut out);
        f.write_str(&out)
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::Text(text)
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::Text(text.to_string())
    }
}

impl From<serde_json::Value> for Message {
    fn from(value: serde_json::Value) -> Self {
        Message::Json(value)
    }
}

/// Replace each `{}` in `template` with the next argument
///
/// Placeholders without a matching argument are kept verbatim.
fn render_template(out: &mut String, template: &str, args: &[FieldValue]) {
    let mut args = args.iter();
    let mut rest = template;

    while let Some(pos) = rest.find("{}") {
        out.push_str(&rest[..pos]);
        match args.next() {
            Some(arg) => {
                let _ = write!(out, "{}", arg);
            }
            None => out.push_str("{}"),
        }
        rest = &rest[pos + 2..];
    }

    out.push_str(rest);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_text() {
        assert_eq!(Message::from("hello").sample_text(), Some("hello"));

        let template = Message::template("user {} logged in", vec![42.into()]);
        assert_eq!(template.sample_text(), Some("user {} logged in"));

        let structured = Message::structured("request", Fields::new().with_field("id", 7));
        assert_eq!(structured.sample_text(), Some("request"));

        let json = Message::from(serde_json::json!({"k": 1}));
        assert_eq!(json.sample_text(), None);
    }

    #[test]
    fn test_template_rendering() {
        let message = Message::template("{} + {} = {}", vec![1.into(), 2.into()]);
        assert_eq!(message.to_string(), "1 + 2 = {}");

        let message = Message::template("no placeholders", vec![1.into()]);
        assert_eq!(message.to_string(), "no placeholders");
    }

    #[test]
    fn test_structured_rendering() {
        let fields = Fields::new().with_field("user_id", 123).with_field("ok", true);
        let message = Message::structured("login", fields);

        assert_eq!(message.to_string(), "login user_id=123 ok=true");
        assert_eq!(message.text(), "login");
        assert_eq!(
            message.fields().and_then(|f| f.get("user_id")),
            Some(&FieldValue::Int(123))
        );
    }

    #[test]
    fn test_fields_json() {
        let fields = Fields::new().with_field("a", "x").with_field("b", 1.5);
        let value = fields.to_json_value();
        assert_eq!(value["a"], "x");
        assert_eq!(value["b"], 1.5);
    }
}
