//! Per-field access strategies.
//!
//! Every attribute access on a message proxy is routed through a [`FieldAccessor`],
//! which pairs a field descriptor with the [`Strategy`] that governs how the field
//! is read, assigned and initialized. Registered message types compute their
//! accessors once, at registration time; unregistered types compute them from the
//! descriptor on each access.

use prost_reflect::{DynamicMessage, FieldDescriptor, Kind, MessageDescriptor, Value};

use crate::storage::{clear_oneof_siblings, Handle, Segment};
use crate::value;
use crate::{MapField, Object, ProxyError, ProxyMessage, RepeatedField};

/// How a field is exposed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Scalar,
    Enum,
    Message,
    RepeatedScalar,
    RepeatedEnum,
    RepeatedMessage,
    MapScalar,
    MapMessage,
}

impl Strategy {
    /// Whether the field may be replaced by attribute assignment.
    pub fn is_assignable(self) -> bool {
        matches!(self, Strategy::Scalar | Strategy::Enum)
    }
}

/// A field descriptor together with its access strategy.
#[derive(Debug, Clone)]
pub struct FieldAccessor {
    field: FieldDescriptor,
    strategy: Strategy,
}

impl FieldAccessor {
    pub fn new(field: FieldDescriptor) -> FieldAccessor {
        let strategy = if field.is_map() {
            match map_value_message(&field) {
                Some(_) => Strategy::MapMessage,
                None => Strategy::MapScalar,
            }
        } else {
            match (field.is_list(), field.kind()) {
                (false, Kind::Message(_)) => Strategy::Message,
                (false, Kind::Enum(_)) => Strategy::Enum,
                (false, _) => Strategy::Scalar,
                (true, Kind::Message(_)) => Strategy::RepeatedMessage,
                (true, Kind::Enum(_)) => Strategy::RepeatedEnum,
                (true, _) => Strategy::RepeatedScalar,
            }
        };
        FieldAccessor { field, strategy }
    }

    pub fn field(&self) -> &FieldDescriptor {
        &self.field
    }

    pub fn name(&self) -> &str {
        self.field.name()
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// The message type held by a message or repeated-message field.
    pub(crate) fn message_type(&self) -> Option<MessageDescriptor> {
        match (self.strategy, self.field.kind()) {
            (Strategy::Message | Strategy::RepeatedMessage, Kind::Message(message)) => {
                Some(message)
            }
            _ => None,
        }
    }

    fn immutable(&self) -> ProxyError {
        ProxyError::immutable(self.field.parent_message().full_name(), self.field.name())
    }

    /// Reads the field: a snapshot for scalars, a live proxy otherwise.
    pub(crate) fn get(&self, handle: &Handle) -> Result<Object, ProxyError> {
        match self.strategy {
            Strategy::Scalar | Strategy::Enum => handle.read(|message| {
                Ok(value::scalar_to_object(&message.get_field(&self.field)))
            }),
            Strategy::Message => {
                let descriptor = self.message_type().ok_or_else(|| {
                    ProxyError::mismatch(format!("`{}` is not a message field", self.name()))
                })?;
                let child = handle.child(Segment::Field(self.field.clone()));
                Ok(Object::Message(ProxyMessage::from_handle(child, descriptor)))
            }
            Strategy::RepeatedScalar | Strategy::RepeatedEnum | Strategy::RepeatedMessage => Ok(
                Object::Repeated(RepeatedField::new(handle.clone(), self.clone())),
            ),
            Strategy::MapScalar | Strategy::MapMessage => match self.field.kind() {
                Kind::Message(entry) => Ok(Object::Map(MapField::new(
                    handle.clone(),
                    self.clone(),
                    entry,
                ))),
                _ => Err(ProxyError::mismatch(format!(
                    "`{}` is not a map field",
                    self.name()
                ))),
            },
        }
    }

    /// Assigns the field. Only scalar and enum fields are assignable.
    pub(crate) fn set(&self, handle: &Handle, object: &Object) -> Result<(), ProxyError> {
        if !self.strategy.is_assignable() {
            return Err(self.immutable());
        }
        let value = value::to_value(&self.field.kind(), object)?;
        handle.write(|message| {
            store(message, &self.field, value);
            Ok(())
        })
    }

    /// Initializes the field from a constructor keyword argument.
    ///
    /// Unlike [`set`](Self::set), composite fields are accepted: message values are
    /// copied in, sequences extend repeated fields and mappings update map fields.
    pub(crate) fn init(&self, handle: &Handle, object: &Object) -> Result<(), ProxyError> {
        match self.get(handle)? {
            Object::Message(child) => child.copy_from(object),
            Object::Repeated(field) => field.extend_from(object),
            Object::Map(field) => field.update(object),
            _ => self.set(handle, object),
        }
    }
}

/// Stores a validated singular value, keeping oneof and proto3 zero-value rules.
pub(crate) fn store(message: &mut DynamicMessage, field: &FieldDescriptor, value: Value) {
    clear_oneof_siblings(message, field);
    if !field.supports_presence() && value::is_default(&value) {
        message.clear_field(field);
    } else {
        message.set_field(field, value);
    }
}

/// The value message type of a message-valued map field.
pub(crate) fn map_value_message(field: &FieldDescriptor) -> Option<MessageDescriptor> {
    match field.kind() {
        Kind::Message(entry) if entry.is_map_entry() => {
            match entry.map_entry_value_field().kind() {
                Kind::Message(value) => Some(value),
                _ => None,
            }
        }
        _ => None,
    }
}
