//! Conversions between host objects and reflected field values.

use std::borrow::Cow;
use std::cmp::Ordering;

use prost_reflect::{ReflectMessage, DynamicMessage, FieldDescriptor, Kind, MapKey, MessageDescriptor, Value};

use crate::{Object, ProxyError};

/// Human-readable name of a field kind.
pub(crate) fn kind_name(kind: &Kind) -> String {
    let name = match kind {
        Kind::Double => "double",
        Kind::Float => "float",
        Kind::Int32 => "int32",
        Kind::Int64 => "int64",
        Kind::Uint32 => "uint32",
        Kind::Uint64 => "uint64",
        Kind::Sint32 => "sint32",
        Kind::Sint64 => "sint64",
        Kind::Fixed32 => "fixed32",
        Kind::Fixed64 => "fixed64",
        Kind::Sfixed32 => "sfixed32",
        Kind::Sfixed64 => "sfixed64",
        Kind::Bool => "bool",
        Kind::String => "string",
        Kind::Bytes => "bytes",
        Kind::Message(message) => return message.full_name().to_owned(),
        Kind::Enum(enum_ty) => return enum_ty.full_name().to_owned(),
    };
    name.to_owned()
}

fn expected(kind: &Kind, object: &Object) -> ProxyError {
    ProxyError::mismatch(format!(
        "expected a value of type {}, got {}",
        kind_name(kind),
        object.kind_name()
    ))
}

fn integer<T>(kind: &Kind, object: &Object) -> Result<T, ProxyError>
where
    T: TryFrom<i128>,
{
    let value = match *object {
        Object::Int(value) => i128::from(value),
        Object::UInt(value) => i128::from(value),
        _ => return Err(expected(kind, object)),
    };
    T::try_from(value).map_err(|_| {
        ProxyError::mismatch(format!(
            "value {} is out of range for {}",
            value,
            kind_name(kind)
        ))
    })
}

/// Converts a host object to a singular value of `kind`.
///
/// Message kinds are never converted here; message values are copied by the
/// callers that accept them.
pub(crate) fn to_value(kind: &Kind, object: &Object) -> Result<Value, ProxyError> {
    let value = match kind {
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => Value::I32(integer(kind, object)?),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => Value::I64(integer(kind, object)?),
        Kind::Uint32 | Kind::Fixed32 => Value::U32(integer(kind, object)?),
        Kind::Uint64 | Kind::Fixed64 => Value::U64(integer(kind, object)?),
        Kind::Float => Value::F32(object.as_float().ok_or_else(|| expected(kind, object))? as f32),
        Kind::Double => Value::F64(object.as_float().ok_or_else(|| expected(kind, object))?),
        Kind::Bool => match *object {
            Object::Bool(value) => Value::Bool(value),
            _ => return Err(expected(kind, object)),
        },
        Kind::String => match object {
            Object::Str(value) => Value::String(value.clone()),
            _ => return Err(expected(kind, object)),
        },
        Kind::Bytes => match object {
            Object::Bytes(value) => Value::Bytes(value.clone()),
            _ => return Err(expected(kind, object)),
        },
        Kind::Enum(enum_ty) => {
            let found = match object {
                Object::Str(name) => enum_ty.get_value_by_name(name),
                _ => enum_ty.get_value(integer(kind, object)?),
            };
            let value = found.ok_or_else(|| {
                ProxyError::mismatch(format!(
                    "{} is not a value of enum {}",
                    object,
                    enum_ty.full_name()
                ))
            })?;
            Value::EnumNumber(value.number())
        }
        Kind::Message(_) => return Err(expected(kind, object)),
    };
    Ok(value)
}

/// Snapshot of a singular value. Composite values have no scalar snapshot and
/// read as `None`.
pub(crate) fn scalar_to_object(value: &Value) -> Object {
    match value {
        Value::Bool(value) => Object::Bool(*value),
        Value::I32(value) => Object::Int(i64::from(*value)),
        Value::I64(value) => Object::Int(*value),
        Value::U32(value) => Object::Int(i64::from(*value)),
        Value::U64(value) => Object::from(*value),
        Value::F32(value) => Object::Float(f64::from(*value)),
        Value::F64(value) => Object::Float(*value),
        Value::String(value) => Object::Str(value.clone()),
        Value::Bytes(value) => Object::Bytes(value.clone()),
        Value::EnumNumber(value) => Object::Int(i64::from(*value)),
        Value::Message(_) | Value::List(_) | Value::Map(_) => Object::None,
    }
}

pub(crate) fn to_map_key(kind: &Kind, object: &Object) -> Result<MapKey, ProxyError> {
    let key = match to_value(kind, object)? {
        Value::Bool(value) => MapKey::Bool(value),
        Value::I32(value) => MapKey::I32(value),
        Value::I64(value) => MapKey::I64(value),
        Value::U32(value) => MapKey::U32(value),
        Value::U64(value) => MapKey::U64(value),
        Value::String(value) => MapKey::String(value),
        _ => {
            return Err(ProxyError::mismatch(format!(
                "{} cannot be used as a map key",
                kind_name(kind)
            )))
        }
    };
    Ok(key)
}

pub(crate) fn map_key_to_object(key: &MapKey) -> Object {
    match key {
        MapKey::Bool(value) => Object::Bool(*value),
        MapKey::I32(value) => Object::Int(i64::from(*value)),
        MapKey::I64(value) => Object::Int(*value),
        MapKey::U32(value) => Object::Int(i64::from(*value)),
        MapKey::U64(value) => Object::from(*value),
        MapKey::String(value) => Object::Str(value.clone()),
    }
}

pub(crate) fn map_key_to_value(key: &MapKey) -> Value {
    match key {
        MapKey::Bool(value) => Value::Bool(*value),
        MapKey::I32(value) => Value::I32(*value),
        MapKey::I64(value) => Value::I64(*value),
        MapKey::U32(value) => Value::U32(*value),
        MapKey::U64(value) => Value::U64(*value),
        MapKey::String(value) => Value::String(value.clone()),
    }
}

/// Total order over map keys: by key kind, then by value.
pub(crate) fn cmp_map_keys(a: &MapKey, b: &MapKey) -> Ordering {
    fn rank(key: &MapKey) -> u8 {
        match key {
            MapKey::Bool(_) => 0,
            MapKey::I32(_) => 1,
            MapKey::I64(_) => 2,
            MapKey::U32(_) => 3,
            MapKey::U64(_) => 4,
            MapKey::String(_) => 5,
        }
    }
    match (a, b) {
        (MapKey::Bool(a), MapKey::Bool(b)) => a.cmp(b),
        (MapKey::I32(a), MapKey::I32(b)) => a.cmp(b),
        (MapKey::I64(a), MapKey::I64(b)) => a.cmp(b),
        (MapKey::U32(a), MapKey::U32(b)) => a.cmp(b),
        (MapKey::U64(a), MapKey::U64(b)) => a.cmp(b),
        (MapKey::String(a), MapKey::String(b)) => a.cmp(b),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// The proto3 zero value of a field without presence tracking.
pub(crate) fn is_default(value: &Value) -> bool {
    match value {
        Value::Bool(value) => !*value,
        Value::I32(value) => *value == 0,
        Value::I64(value) => *value == 0,
        Value::U32(value) => *value == 0,
        Value::U64(value) => *value == 0,
        Value::F32(value) => value.to_bits() == 0,
        Value::F64(value) => value.to_bits() == 0,
        Value::String(value) => value.is_empty(),
        Value::Bytes(value) => value.is_empty(),
        Value::EnumNumber(value) => *value == 0,
        Value::List(items) => items.is_empty(),
        Value::Map(entries) => entries.is_empty(),
        Value::Message(_) => false,
    }
}

/// Whether `field` is set on `message`, counting zero values of fields without
/// presence tracking as unset.
pub(crate) fn is_populated(message: &DynamicMessage, field: &FieldDescriptor) -> bool {
    if !message.has_field(field) {
        return false;
    }
    if field.supports_presence() {
        return true;
    }
    !is_default(&message.get_field(field))
}

/// Re-expresses `message` against `descriptor` when the two descriptors come from
/// different pools but name the same type.
pub(crate) fn conform<'a>(
    message: &'a DynamicMessage,
    descriptor: &MessageDescriptor,
) -> Result<Cow<'a, DynamicMessage>, ProxyError> {
    if message.descriptor() == *descriptor {
        return Ok(Cow::Borrowed(message));
    }
    let bytes = prost::Message::encode_to_vec(message);
    DynamicMessage::decode(descriptor.clone(), bytes.as_slice())
        .map(Cow::Owned)
        .map_err(|err| ProxyError::parse(descriptor.full_name(), err))
}

/// Field-by-field structural equality.
pub(crate) fn messages_equal(a: &DynamicMessage, b: &DynamicMessage) -> bool {
    let descriptor = a.descriptor();
    if descriptor.full_name() != b.descriptor().full_name() {
        return false;
    }
    let b = match conform(b, &descriptor) {
        Ok(b) => b,
        Err(_) => return false,
    };
    let equal = descriptor.fields().all(|field| {
        is_populated(a, &field) == is_populated(&b, &field)
            && values_equal(&a.get_field(&field), &b.get_field(&field))
    });
    equal
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Message(a), Value::Message(b)) => messages_equal(a, b),
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| values_equal(a, b))
        }
        (Value::Map(a), Value::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, a)| b.get(key).map_or(false, |b| values_equal(a, b)))
        }
        _ => a == b,
    }
}
