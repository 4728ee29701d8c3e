//! The protobuf text format.
//!
//! Rendering follows the canonical layout: populated fields in declaration order,
//! enums by name, map entries sorted by key with both key and value printed, and
//! strings C-escaped. Parsing is delegated to `prost-reflect`.

use std::fmt::Write as _;

use log::trace;
use prost_reflect::{ReflectMessage, DynamicMessage, FieldDescriptor, Kind, Value};

use crate::value;
use crate::{ProxyError, ProxyMessage};

/// How a message is laid out as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextFormat {
    /// One field per line, nested messages indented by two spaces.
    #[default]
    MultiLine,
    /// All fields on one line, separated by spaces.
    SingleLine,
}

pub(crate) fn render(message: &DynamicMessage, format: TextFormat) -> String {
    let mut printer = Printer {
        out: String::new(),
        format,
        depth: 0,
    };
    printer.message(message);
    printer.out
}

/// Renders a single value the way it appears inside a container rendering.
pub(crate) fn short_value(kind: &Kind, value: &Value) -> String {
    match value {
        Value::Message(message) => render(message, TextFormat::SingleLine),
        _ => scalar(kind, value),
    }
}

/// Replaces the contents of `target` with the message parsed from `text`.
///
/// On error, `target` is left unchanged.
pub fn parse_text(text: &str, target: &ProxyMessage) -> Result<(), ProxyError> {
    trace!("parsing text into {}", target.full_name());
    let message = DynamicMessage::parse_text_format(target.descriptor().clone(), text)
        .map_err(|err| ProxyError::parse(target.full_name(), err))?;
    target.replace(message)
}

/// Merges the message parsed from `text` into `target`.
///
/// On error, `target` is left unchanged.
pub fn merge_text(text: &str, target: &ProxyMessage) -> Result<(), ProxyError> {
    trace!("merging text into {}", target.full_name());
    let mut message = target.to_dynamic()?;
    message
        .merge_text_format(text)
        .map_err(|err| ProxyError::parse(target.full_name(), err))?;
    target.replace(message)
}

struct Printer {
    out: String,
    format: TextFormat,
    depth: usize,
}

impl Printer {
    fn message(&mut self, message: &DynamicMessage) {
        for field in message.descriptor().fields() {
            if !value::is_populated(message, &field) {
                continue;
            }
            match &*message.get_field(&field) {
                Value::List(items) => {
                    for item in items {
                        self.field(&field, item);
                    }
                }
                Value::Map(entries) => {
                    let mut sorted: Vec<_> = entries.iter().collect();
                    sorted.sort_by(|a, b| value::cmp_map_keys(a.0, b.0));
                    let Kind::Message(entry) = field.kind() else {
                        continue;
                    };
                    let key_field = entry.map_entry_key_field();
                    let value_field = entry.map_entry_value_field();
                    for (key, item) in sorted {
                        self.open(field.name());
                        self.field(&key_field, &value::map_key_to_value(key));
                        self.field(&value_field, item);
                        self.close();
                    }
                }
                item => self.field(&field, item),
            }
        }
    }

    fn field(&mut self, field: &FieldDescriptor, item: &Value) {
        match item {
            Value::Message(message) => {
                self.open(field.name());
                self.message(message);
                self.close();
            }
            _ => {
                let rendered = scalar(&field.kind(), item);
                self.start();
                let _ = write!(self.out, "{}: {}", field.name(), rendered);
                self.end();
            }
        }
    }

    fn open(&mut self, name: &str) {
        self.start();
        let _ = write!(self.out, "{} {{", name);
        self.end();
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth -= 1;
        self.start();
        self.out.push('}');
        self.end();
    }

    fn start(&mut self) {
        match self.format {
            TextFormat::MultiLine => {
                for _ in 0..self.depth {
                    self.out.push_str("  ");
                }
            }
            TextFormat::SingleLine => {
                if !self.out.is_empty() {
                    self.out.push(' ');
                }
            }
        }
    }

    fn end(&mut self) {
        if self.format == TextFormat::MultiLine {
            self.out.push('\n');
        }
    }
}

fn scalar(kind: &Kind, value: &Value) -> String {
    match value {
        Value::Bool(value) => value.to_string(),
        Value::I32(value) => value.to_string(),
        Value::I64(value) => value.to_string(),
        Value::U32(value) => value.to_string(),
        Value::U64(value) => value.to_string(),
        Value::F32(value) => format_float(value.to_string(), format!("{:e}", value), f64::from(*value)),
        Value::F64(value) => format_f64(*value),
        Value::String(value) => quote(value.as_bytes()),
        Value::Bytes(value) => quote(value),
        Value::EnumNumber(number) => match kind {
            Kind::Enum(enum_ty) => enum_ty
                .get_value(*number)
                .map(|value| value.name().to_owned())
                .unwrap_or_else(|| number.to_string()),
            _ => number.to_string(),
        },
        Value::Message(message) => render(message, TextFormat::SingleLine),
        Value::List(_) | Value::Map(_) => String::new(),
    }
}

/// Formats a double the way the text format prints it: the shortest
/// representation that round-trips, switching to exponent notation for very
/// large or very small magnitudes.
pub(crate) fn format_f64(value: f64) -> String {
    format_float(value.to_string(), format!("{:e}", value), value)
}

fn format_float(plain: String, exponent: String, value: f64) -> String {
    if value.is_nan() {
        return "nan".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_owned();
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e15).contains(&magnitude) {
        // `1e20` becomes `1e+20`.
        match exponent.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => exponent,
        }
    } else {
        plain
    }
}

/// Quotes and C-escapes a string or bytes value.
pub(crate) fn quote(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');
    for &byte in bytes {
        match byte {
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            b'"' => out.push_str("\\\""),
            b'\'' => out.push_str("\\'"),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(char::from(byte)),
            _ => {
                let _ = write!(out, "\\{:03o}", byte);
            }
        }
    }
    out.push('"');
    out
}
