//! The dynamic value model shared with the scripting host.

use std::fmt;
use std::rc::Rc;

use bytes::Bytes;

use crate::native::NativeMessage;
use crate::text;
use crate::{MapField, ProxyMessage, RepeatedField};

/// Keyword arguments, in call order.
pub type Kwargs<'a> = &'a [(&'a str, Object)];

/// A dynamically-typed host value.
///
/// Scalar variants are snapshots: mutating an `Object` never affects the message it
/// was read from. The `Message`, `Repeated` and `Map` variants are live proxies that
/// share storage with the message they were obtained from.
#[derive(Clone)]
pub enum Object {
    None,
    Bool(bool),
    Int(i64),
    /// Unsigned values that do not fit in an `i64`.
    UInt(u64),
    Float(f64),
    Str(String),
    Bytes(Bytes),
    List(Vec<Object>),
    /// An insertion-ordered mapping.
    Dict(Vec<(Object, Object)>),
    Message(ProxyMessage),
    /// A message owned by a statically-typed runtime rather than by a proxy.
    Native(Rc<dyn NativeMessage>),
    Repeated(RepeatedField),
    Map(MapField),
}

impl Object {
    /// Wraps a statically-typed message without converting it.
    pub fn native<M>(message: M) -> Object
    where
        M: NativeMessage + 'static,
    {
        Object::Native(Rc::new(message))
    }

    /// Builds a mapping from key/value pairs.
    pub fn dict<K, V, I>(pairs: I) -> Object
    where
        K: Into<Object>,
        V: Into<Object>,
        I: IntoIterator<Item = (K, V)>,
    {
        Object::Dict(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn bytes(value: impl Into<Bytes>) -> Object {
        Object::Bytes(value.into())
    }

    /// A short name for the value's kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Object::None => "none",
            Object::Bool(_) => "bool",
            Object::Int(_) | Object::UInt(_) => "int",
            Object::Float(_) => "float",
            Object::Str(_) => "str",
            Object::Bytes(_) => "bytes",
            Object::List(_) => "list",
            Object::Dict(_) => "dict",
            Object::Message(_) => "message",
            Object::Native(_) => "native message",
            Object::Repeated(_) => "repeated field",
            Object::Map(_) => "map field",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Object::None)
    }

    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Object::Int(value) => Some(value),
            Object::UInt(value) => i64::try_from(value).ok(),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match *self {
            Object::Float(value) => Some(value),
            Object::Int(value) => Some(value as f64),
            Object::UInt(value) => Some(value as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Object::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&ProxyMessage> {
        match self {
            Object::Message(message) => Some(message),
            _ => None,
        }
    }

    /// Unwraps a message proxy, or returns the value unchanged.
    pub fn into_message(self) -> Result<ProxyMessage, Object> {
        match self {
            Object::Message(message) => Ok(message),
            other => Err(other),
        }
    }

    pub fn into_repeated(self) -> Result<RepeatedField, Object> {
        match self {
            Object::Repeated(field) => Ok(field),
            other => Err(other),
        }
    }

    pub fn into_map(self) -> Result<MapField, Object> {
        match self {
            Object::Map(field) => Ok(field),
            other => Err(other),
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::None, Object::None) => true,
            (Object::Bool(a), Object::Bool(b)) => a == b,
            (Object::Int(a), Object::Int(b)) => a == b,
            (Object::UInt(a), Object::UInt(b)) => a == b,
            (Object::Int(a), Object::UInt(b)) | (Object::UInt(b), Object::Int(a)) => {
                u64::try_from(*a).map_or(false, |a| a == *b)
            }
            (Object::Float(_), _) | (_, Object::Float(_)) => {
                match (self.as_float(), other.as_float()) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
            (Object::Str(a), Object::Str(b)) => a == b,
            (Object::Bytes(a), Object::Bytes(b)) => a == b,
            (Object::List(a), Object::List(b)) => a == b,
            (Object::Dict(a), Object::Dict(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.iter().any(|(k2, v2)| k == k2 && v == v2))
            }
            (Object::Message(a), Object::Message(b)) => a == b,
            (Object::Native(a), Object::Native(b)) => {
                a.type_name() == b.type_name() && a.encode_native() == b.encode_native()
            }
            (Object::Repeated(a), Object::Repeated(b)) => {
                match (a.to_vec(), b.to_vec()) {
                    (Ok(a), Ok(b)) => a == b,
                    _ => false,
                }
            }
            (Object::Repeated(a), Object::List(b)) | (Object::List(b), Object::Repeated(a)) => {
                a.to_vec().map_or(false, |a| &a == b)
            }
            (Object::Map(a), Object::Map(b)) => match (a.to_dict(), b.to_dict()) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            },
            (Object::Map(a), dict @ Object::Dict(_)) | (dict @ Object::Dict(_), Object::Map(a)) => {
                a.to_dict().map_or(false, |a| &a == dict)
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::None => f.write_str("None"),
            Object::Bool(value) => write!(f, "Bool({})", value),
            Object::Int(value) => write!(f, "Int({})", value),
            Object::UInt(value) => write!(f, "UInt({})", value),
            Object::Float(value) => write!(f, "Float({})", value),
            Object::Str(value) => write!(f, "Str({:?})", value),
            Object::Bytes(value) => write!(f, "Bytes({:?})", value),
            Object::List(items) => f.debug_list().entries(items).finish(),
            Object::Dict(pairs) => f
                .debug_map()
                .entries(pairs.iter().map(|(k, v)| (k, v)))
                .finish(),
            Object::Message(message) => fmt::Debug::fmt(message, f),
            Object::Native(message) => fmt::Debug::fmt(message, f),
            Object::Repeated(field) => fmt::Debug::fmt(field, f),
            Object::Map(field) => fmt::Debug::fmt(field, f),
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::None => f.write_str("None"),
            Object::Bool(value) => write!(f, "{}", value),
            Object::Int(value) => write!(f, "{}", value),
            Object::UInt(value) => write!(f, "{}", value),
            Object::Float(value) => f.write_str(&text::format_f64(*value)),
            Object::Str(value) => f.write_str(&text::quote(value.as_bytes())),
            Object::Bytes(value) => f.write_str(&text::quote(value)),
            Object::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    fmt::Display::fmt(item, f)?;
                }
                f.write_str("]")
            }
            Object::Dict(pairs) => {
                f.write_str("{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str("}")
            }
            Object::Message(message) => f.write_str(&message.to_short_text()),
            Object::Native(message) => write!(f, "<native {}>", message.type_name()),
            Object::Repeated(field) => fmt::Display::fmt(field, f),
            Object::Map(field) => fmt::Display::fmt(field, f),
        }
    }
}

macro_rules! from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Object {
                fn from(value: $ty) -> Object {
                    Object::Int(i64::from(value))
                }
            }
        )*
    };
}

from_int!(i32, i64, u32);

impl From<u64> for Object {
    fn from(value: u64) -> Object {
        match i64::try_from(value) {
            Ok(value) => Object::Int(value),
            Err(_) => Object::UInt(value),
        }
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Object {
        Object::Bool(value)
    }
}

impl From<f32> for Object {
    fn from(value: f32) -> Object {
        Object::Float(f64::from(value))
    }
}

impl From<f64> for Object {
    fn from(value: f64) -> Object {
        Object::Float(value)
    }
}

impl From<&str> for Object {
    fn from(value: &str) -> Object {
        Object::Str(value.to_owned())
    }
}

impl From<String> for Object {
    fn from(value: String) -> Object {
        Object::Str(value)
    }
}

impl From<Bytes> for Object {
    fn from(value: Bytes) -> Object {
        Object::Bytes(value)
    }
}

impl From<ProxyMessage> for Object {
    fn from(value: ProxyMessage) -> Object {
        Object::Message(value)
    }
}

impl From<RepeatedField> for Object {
    fn from(value: RepeatedField) -> Object {
        Object::Repeated(value)
    }
}

impl From<MapField> for Object {
    fn from(value: MapField) -> Object {
        Object::Map(value)
    }
}

impl<T> From<Vec<T>> for Object
where
    T: Into<Object>,
{
    fn from(values: Vec<T>) -> Object {
        Object::List(values.into_iter().map(Into::into).collect())
    }
}
