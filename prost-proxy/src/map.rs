use std::collections::HashMap;
use std::fmt;

use prost_reflect::{DynamicMessage, Kind, MapKey, MessageDescriptor, Value};

use crate::accessor::{map_value_message, FieldAccessor};
use crate::registry::MessageClass;
use crate::storage::{Handle, Segment};
use crate::text;
use crate::value;
use crate::{Kwargs, Object, ProxyError, ProxyMessage};

/// A live view of a map field.
///
/// Scalar-valued maps behave like a dictionary of snapshots. In message-valued
/// maps, looking up a missing key creates a default entry, and entries are only
/// ever modified in place.
#[derive(Clone)]
pub struct MapField {
    handle: Handle,
    accessor: FieldAccessor,
    entry: MessageDescriptor,
}

impl MapField {
    pub(crate) fn new(handle: Handle, accessor: FieldAccessor, entry: MessageDescriptor) -> MapField {
        MapField {
            handle,
            accessor,
            entry,
        }
    }

    pub fn accessor(&self) -> &FieldAccessor {
        &self.accessor
    }

    /// The synthetic key/value entry class of this map.
    pub fn entry_class(&self) -> MessageClass {
        MessageClass::MapEntry(self.entry.clone())
    }

    fn key_kind(&self) -> Kind {
        self.entry.map_entry_key_field().kind()
    }

    fn value_kind(&self) -> Kind {
        self.entry.map_entry_value_field().kind()
    }

    fn value_type(&self) -> Option<MessageDescriptor> {
        map_value_message(self.accessor.field())
    }

    fn key(&self, object: &Object) -> Result<MapKey, ProxyError> {
        value::to_map_key(&self.key_kind(), object)
    }

    fn read<R>(
        &self,
        f: impl FnOnce(&HashMap<MapKey, Value>) -> Result<R, ProxyError>,
    ) -> Result<R, ProxyError> {
        let field = self.accessor.field();
        self.handle.read(|message| match &*message.get_field(field) {
            Value::Map(entries) => f(entries),
            _ => Err(self.not_a_map()),
        })
    }

    fn write<R>(
        &self,
        f: impl FnOnce(&mut HashMap<MapKey, Value>) -> Result<R, ProxyError>,
    ) -> Result<R, ProxyError> {
        let field = self.accessor.field();
        self.handle.write(|message| match message.get_field_mut(field) {
            Value::Map(entries) => f(entries),
            _ => Err(self.not_a_map()),
        })
    }

    fn not_a_map(&self) -> ProxyError {
        ProxyError::mismatch(format!("`{}` is not a map field", self.accessor.name()))
    }

    fn entry_proxy(&self, descriptor: MessageDescriptor, key: MapKey) -> ProxyMessage {
        ProxyMessage::from_handle(
            self.handle
                .child(Segment::Entry(self.accessor.field().clone(), key)),
            descriptor,
        )
    }

    pub fn len(&self) -> Result<usize, ProxyError> {
        self.read(|entries| Ok(entries.len()))
    }

    pub fn is_empty(&self) -> Result<bool, ProxyError> {
        self.len().map(|len| len == 0)
    }

    pub fn contains(&self, key: impl Into<Object>) -> Result<bool, ProxyError> {
        let key = self.key(&key.into())?;
        self.read(|entries| Ok(entries.contains_key(&key)))
    }

    /// Looks up `key`.
    ///
    /// A missing key in a scalar-valued map is a miss. In a message-valued map the
    /// entry is created, as with [`entry`](Self::entry).
    pub fn get(&self, key: impl Into<Object>) -> Result<Option<Object>, ProxyError> {
        let key = key.into();
        if self.value_type().is_some() {
            return self.entry(key).map(|entry| Some(Object::Message(entry)));
        }
        let key = self.key(&key)?;
        self.read(|entries| Ok(entries.get(&key).map(value::scalar_to_object)))
    }

    /// The value message stored under `key`, inserting a default one if absent.
    pub fn entry(&self, key: impl Into<Object>) -> Result<ProxyMessage, ProxyError> {
        let descriptor = self.value_type().ok_or_else(|| {
            ProxyError::mismatch(format!(
                "`{}` does not hold message values",
                self.accessor.name()
            ))
        })?;
        let key = self.key(&key.into())?;
        let default = Value::Message(DynamicMessage::new(descriptor.clone()));
        self.write(|entries| {
            entries.entry(key.clone()).or_insert(default);
            Ok(())
        })?;
        Ok(self.entry_proxy(descriptor, key))
    }

    /// Stores `value` under `key` in a scalar-valued map.
    ///
    /// Entries of message-valued maps cannot be replaced and fail with
    /// [`ProxyError::InvalidEntryReplacement`].
    pub fn set(&self, key: impl Into<Object>, value: impl Into<Object>) -> Result<(), ProxyError> {
        let key = self.key(&key.into())?;
        if self.value_type().is_some() {
            return Err(ProxyError::InvalidEntryReplacement {
                field: self.accessor.field().full_name().to_owned(),
            });
        }
        let value = value::to_value(&self.value_kind(), &value.into())?;
        self.write(|entries| {
            entries.insert(key, value);
            Ok(())
        })
    }

    /// Removes `key`, returning whether it was present.
    pub fn remove(&self, key: impl Into<Object>) -> Result<bool, ProxyError> {
        let key = self.key(&key.into())?;
        self.write(|entries| Ok(entries.remove(&key).is_some()))
    }

    pub fn clear(&self) -> Result<(), ProxyError> {
        self.write(|entries| {
            entries.clear();
            Ok(())
        })
    }

    /// Inserts every pair of a dictionary or another map field.
    ///
    /// Message values are copied into the (possibly new) entry under their key.
    pub fn update(&self, object: &Object) -> Result<(), ProxyError> {
        let pairs = match object {
            Object::Dict(pairs) => pairs.clone(),
            Object::Map(other) => match other.to_dict()? {
                Object::Dict(pairs) => pairs,
                _ => Vec::new(),
            },
            other => {
                return Err(ProxyError::mismatch(format!(
                    "cannot update `{}` from {}",
                    self.accessor.name(),
                    other.kind_name()
                )))
            }
        };
        for (key, value) in pairs {
            self.store(key, &value)?;
        }
        Ok(())
    }

    /// Inserts keyword arguments, using their names as string keys.
    pub fn update_kwargs(&self, kwargs: Kwargs<'_>) -> Result<(), ProxyError> {
        for (key, value) in kwargs {
            self.store(Object::from(*key), value)?;
        }
        Ok(())
    }

    fn store(&self, key: Object, value: &Object) -> Result<(), ProxyError> {
        match self.value_type() {
            Some(_) => self.entry(key)?.copy_from(value),
            None => self.set(key, value.clone()),
        }
    }

    fn sorted_keys(&self) -> Result<Vec<MapKey>, ProxyError> {
        let mut keys = self.read(|entries| Ok(entries.keys().cloned().collect::<Vec<_>>()))?;
        keys.sort_by(value::cmp_map_keys);
        Ok(keys)
    }

    /// The keys present when called, in key order.
    pub fn keys(&self) -> Result<impl Iterator<Item = Object>, ProxyError> {
        Ok(self.sorted_keys()?.into_iter().map(|key| value::map_key_to_object(&key)))
    }

    /// The values of the keys present when called; each value is read when reached.
    pub fn values(&self) -> Result<impl Iterator<Item = Object>, ProxyError> {
        Ok(self.items()?.map(|(_, value)| value))
    }

    /// The entries of the keys present when called; each value is read when reached.
    pub fn items(&self) -> Result<Items, ProxyError> {
        Ok(Items {
            map: self.clone(),
            keys: self.sorted_keys()?.into_iter(),
        })
    }

    fn value_at(&self, key: &MapKey) -> Result<Option<Object>, ProxyError> {
        let present = self.read(|entries| Ok(entries.get(key).map(value::scalar_to_object)))?;
        Ok(match (present, self.value_type()) {
            (None, _) => None,
            (Some(_), Some(descriptor)) => {
                Some(Object::Message(self.entry_proxy(descriptor, key.clone())))
            }
            (Some(object), None) => Some(object),
        })
    }

    /// A dictionary of the current entries, in key order.
    ///
    /// Message values remain live proxies into this map.
    pub fn to_dict(&self) -> Result<Object, ProxyError> {
        Ok(Object::Dict(self.items()?.collect()))
    }
}

/// Iterator over the entries of a [`MapField`].
pub struct Items {
    map: MapField,
    keys: std::vec::IntoIter<MapKey>,
}

impl Iterator for Items {
    type Item = (Object, Object);

    fn next(&mut self) -> Option<(Object, Object)> {
        for key in self.keys.by_ref() {
            // Entries removed since the snapshot are skipped.
            if let Ok(Some(value)) = self.map.value_at(&key) {
                return Some((value::map_key_to_object(&key), value));
            }
        }
        None
    }
}

impl fmt::Display for MapField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key_kind = self.key_kind();
        let value_kind = self.value_kind();
        let rendered = self.read(|entries| {
            let mut sorted: Vec<_> = entries.iter().collect();
            sorted.sort_by(|a, b| value::cmp_map_keys(a.0, b.0));
            Ok(sorted
                .into_iter()
                .map(|(key, value)| {
                    format!(
                        "{}: {}",
                        text::short_value(&key_kind, &value::map_key_to_value(key)),
                        text::short_value(&value_kind, value)
                    )
                })
                .collect::<Vec<_>>())
        });
        match rendered {
            Ok(entries) => write!(f, "{{{}}}", entries.join(", ")),
            Err(err) => write!(f, "<{}: {}>", self.accessor.name(), err),
        }
    }
}

impl fmt::Debug for MapField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MapField({}: {})", self.accessor.name(), self)
    }
}
