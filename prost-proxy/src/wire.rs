//! Binary wire format encoding options.

use bytes::BufMut;
use prost::encoding::{encode_key, encode_varint, WireType};
use prost::Message as _;
use prost_reflect::{ReflectMessage, DynamicMessage, FieldDescriptor, Kind, Value};

use crate::value;
use crate::{Kwargs, Object, ProxyError};

/// Options for [`ProxyMessage::serialize`](crate::ProxyMessage::serialize).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerializeOptions {
    deterministic: bool,
}

impl SerializeOptions {
    pub fn new() -> SerializeOptions {
        SerializeOptions::default()
    }

    /// Configures whether the encoding is canonical.
    ///
    /// Deterministic output emits fields in field-number order and map entries
    /// sorted by key, so equal messages always encode to equal bytes. Unknown
    /// fields are not preserved in deterministic output.
    pub fn deterministic(&mut self, enabled: bool) -> &mut Self {
        self.deterministic = enabled;
        self
    }

    pub fn is_deterministic(&self) -> bool {
        self.deterministic
    }

    /// Reads options from keyword arguments.
    ///
    /// The only recognized keyword is `deterministic`, which takes a bool.
    pub fn from_kwargs(kwargs: Kwargs<'_>) -> Result<SerializeOptions, ProxyError> {
        let mut options = SerializeOptions::new();
        for (name, object) in kwargs {
            match (*name, object) {
                ("deterministic", Object::Bool(enabled)) => {
                    options.deterministic(*enabled);
                }
                ("deterministic", other) => {
                    return Err(ProxyError::mismatch(format!(
                        "`deterministic` must be a bool, got {}",
                        other.kind_name()
                    )))
                }
                (name, _) => {
                    return Err(ProxyError::InvalidArgument(format!(
                        "unexpected serialization option `{}`",
                        name
                    )))
                }
            }
        }
        Ok(options)
    }
}

pub(crate) fn encode(message: &DynamicMessage, deterministic: bool) -> Vec<u8> {
    if !deterministic {
        return message.encode_to_vec();
    }
    let mut buf = Vec::with_capacity(message.encoded_len());
    encode_deterministic(message, &mut buf);
    buf
}

fn encode_deterministic(message: &DynamicMessage, buf: &mut Vec<u8>) {
    let descriptor = message.descriptor();
    let mut fields: Vec<FieldDescriptor> = descriptor
        .fields()
        .filter(|field| message.has_field(field))
        .collect();
    fields.sort_by_key(FieldDescriptor::number);

    for field in fields {
        match &*message.get_field(&field) {
            Value::Message(child) => encode_nested(field.number(), child, buf),
            Value::List(items) if matches!(field.kind(), Kind::Message(_)) => {
                for item in items {
                    if let Value::Message(child) = item {
                        encode_nested(field.number(), child, buf);
                    }
                }
            }
            Value::Map(entries) => {
                let Kind::Message(entry) = field.kind() else {
                    continue;
                };
                let key_field = entry.map_entry_key_field();
                let value_field = entry.map_entry_value_field();
                let mut sorted: Vec<_> = entries.iter().collect();
                sorted.sort_by(|a, b| value::cmp_map_keys(a.0, b.0));
                for (key, item) in sorted {
                    let mut body = DynamicMessage::new(entry.clone());
                    body.set_field(&key_field, value::map_key_to_value(key));
                    let mut encoded = body.encode_to_vec();
                    match item {
                        Value::Message(child) => encode_nested(value_field.number(), child, &mut encoded),
                        scalar => {
                            body.clear_field(&key_field);
                            body.set_field(&value_field, scalar.clone());
                            encoded.extend_from_slice(&body.encode_to_vec());
                        }
                    }
                    encode_key(field.number(), WireType::LengthDelimited, buf);
                    encode_varint(encoded.len() as u64, buf);
                    buf.put_slice(&encoded);
                }
            }
            other => {
                let mut single = DynamicMessage::new(descriptor.clone());
                single.set_field(&field, other.clone());
                buf.put_slice(&single.encode_to_vec());
            }
        }
    }
}

fn encode_nested(number: u32, message: &DynamicMessage, buf: &mut Vec<u8>) {
    let mut body = Vec::new();
    encode_deterministic(message, &mut body);
    encode_key(number, WireType::LengthDelimited, buf);
    encode_varint(body.len() as u64, buf);
    buf.put_slice(&body);
}
