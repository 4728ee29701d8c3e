use std::fmt;
use std::sync::Arc;

use log::trace;
use prost::Message as _;
use prost_reflect::{ReflectMessage, DynamicMessage, FieldDescriptor, Kind, MessageDescriptor, OneofDescriptor, Value};

use crate::accessor::FieldAccessor;
use crate::native;
use crate::registry::{self, MessageClass, Registration};
use crate::storage::{Handle, Ownership, Root};
use crate::text::{self, TextFormat};
use crate::value;
use crate::wire::{self, SerializeOptions};
use crate::{Kwargs, MapField, Object, ProxyError, RepeatedField};

/// A handle to one protobuf message, exposing its fields by name.
///
/// Cloning a `ProxyMessage` clones the handle, not the message: both clones observe
/// the same storage. Use [`copy`](Self::copy) for an independent duplicate.
#[derive(Clone)]
pub struct ProxyMessage {
    handle: Handle,
    descriptor: MessageDescriptor,
    // Dispatch table of the registered type, if `descriptor` is the registered one.
    registration: Option<Arc<Registration>>,
}

impl ProxyMessage {
    pub(crate) fn from_handle(handle: Handle, descriptor: MessageDescriptor) -> ProxyMessage {
        let registration = registry::lookup_by_descriptor(&descriptor)
            .filter(|registration| *registration.descriptor() == descriptor);
        ProxyMessage {
            handle,
            descriptor,
            registration,
        }
    }

    /// Creates an owning proxy over a new, empty message of type `descriptor`.
    pub fn new(descriptor: MessageDescriptor) -> ProxyMessage {
        ProxyMessage::from_dynamic(DynamicMessage::new(descriptor))
    }

    /// Takes ownership of `message`.
    pub fn from_dynamic(message: DynamicMessage) -> ProxyMessage {
        let descriptor = message.descriptor();
        ProxyMessage::from_handle(Handle::owned(message), descriptor)
    }

    /// Wraps storage that the caller keeps a reference to.
    ///
    /// Every proxy created from the same `root` observes the same contents.
    pub fn from_shared(root: Root) -> ProxyMessage {
        let descriptor = root.borrow().descriptor();
        ProxyMessage::from_handle(Handle::shared(root), descriptor)
    }

    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.descriptor
    }

    pub fn full_name(&self) -> &str {
        self.descriptor.full_name()
    }

    /// The runtime class of this proxy, determined by the message type alone.
    pub fn class(&self) -> MessageClass {
        if self.descriptor.is_map_entry() {
            MessageClass::MapEntry(self.descriptor.clone())
        } else {
            MessageClass::for_descriptor(&self.descriptor)
        }
    }

    pub fn ownership(&self) -> Ownership {
        self.handle.ownership()
    }

    /// Whether both proxies keep the same top-level message alive.
    pub fn shares_storage_with(&self, other: &ProxyMessage) -> bool {
        self.handle.same_root(&other.handle)
    }

    pub(crate) fn handle(&self) -> &Handle {
        &self.handle
    }

    fn accessor(&self, name: &str) -> Result<FieldAccessor, ProxyError> {
        if let Some(accessor) = self
            .registration
            .as_ref()
            .and_then(|registration| registration.accessor(name))
        {
            return Ok(accessor.clone());
        }
        self.descriptor
            .get_field_by_name(name)
            .map(FieldAccessor::new)
            .ok_or_else(|| ProxyError::unknown_field(self.full_name(), name))
    }

    fn oneof(&self, name: &str) -> Option<OneofDescriptor> {
        match &self.registration {
            Some(registration) => registration.oneof(name).cloned(),
            None => self.descriptor.oneofs().find(|oneof| oneof.name() == name),
        }
    }

    /// Reads the field `name`.
    ///
    /// Scalar and enum fields are returned as snapshots. Message, repeated and map
    /// fields are returned as live proxies that keep this message alive.
    pub fn get(&self, name: &str) -> Result<Object, ProxyError> {
        self.accessor(name)?.get(&self.handle)
    }

    /// Assigns the scalar or enum field `name`.
    pub fn set(&self, name: &str, object: impl Into<Object>) -> Result<(), ProxyError> {
        self.accessor(name)?.set(&self.handle, &object.into())
    }

    pub fn message(&self, name: &str) -> Result<ProxyMessage, ProxyError> {
        self.get(name)?
            .into_message()
            .map_err(|_| ProxyError::mismatch(format!("`{}` is not a message field", name)))
    }

    pub fn repeated(&self, name: &str) -> Result<RepeatedField, ProxyError> {
        self.get(name)?
            .into_repeated()
            .map_err(|_| ProxyError::mismatch(format!("`{}` is not a repeated field", name)))
    }

    pub fn map(&self, name: &str) -> Result<MapField, ProxyError> {
        self.get(name)?
            .into_map()
            .map_err(|_| ProxyError::mismatch(format!("`{}` is not a map field", name)))
    }

    /// The symbolic name of the singular enum field `name`.
    ///
    /// Numbers without a declared name are rendered as decimal.
    pub fn enum_name(&self, name: &str) -> Result<String, ProxyError> {
        let accessor = self.accessor(name)?;
        let field = accessor.field();
        let enum_ty = match field.kind() {
            Kind::Enum(enum_ty) if !field.is_list() => enum_ty,
            _ => {
                return Err(ProxyError::mismatch(format!(
                    "`{}` is not a singular enum field",
                    name
                )))
            }
        };
        let number = self.handle.read(|message| match &*message.get_field(field) {
            Value::EnumNumber(number) => Ok(*number),
            _ => Err(ProxyError::mismatch(format!("`{}` does not hold an enum", name))),
        })?;
        Ok(enum_ty
            .get_value(number)
            .map(|value| value.name().to_owned())
            .unwrap_or_else(|| number.to_string()))
    }

    fn presence_field(&self, name: &str) -> Option<FieldDescriptor> {
        self.descriptor.get_field_by_name(name)
    }

    fn invalid_name(&self, name: &str) -> ProxyError {
        ProxyError::InvalidArgument(format!(
            "`{}` is neither a field nor a oneof of `{}`",
            name,
            self.full_name()
        ))
    }

    /// Whether the field, or some member of the oneof, `name` is set.
    ///
    /// Fields without presence tracking count as set when they hold a non-default
    /// value.
    pub fn has_field(&self, name: &str) -> Result<bool, ProxyError> {
        if let Some(field) = self.presence_field(name) {
            return self
                .handle
                .read(|message| Ok(value::is_populated(message, &field)));
        }
        if self.oneof(name).is_some() {
            return Ok(self.which_oneof(name)?.is_some());
        }
        Err(self.invalid_name(name))
    }

    /// Resets the field, or every member of the oneof, `name`.
    pub fn clear_field(&self, name: &str) -> Result<(), ProxyError> {
        let fields: Vec<FieldDescriptor> = match self.presence_field(name) {
            Some(field) => vec![field],
            None => match self.oneof(name) {
                Some(oneof) => oneof.fields().collect(),
                None => return Err(self.invalid_name(name)),
            },
        };
        self.handle.write(|message| {
            for field in &fields {
                message.clear_field(field);
            }
            Ok(())
        })
    }

    /// The name of the member of oneof `group` that is currently set.
    pub fn which_oneof(&self, group: &str) -> Result<Option<String>, ProxyError> {
        let oneof = self.oneof(group).ok_or_else(|| {
            ProxyError::InvalidArgument(format!(
                "`{}` is not a oneof of `{}`",
                group,
                self.full_name()
            ))
        })?;
        self.handle.read(|message| {
            Ok(oneof
                .fields()
                .find(|field| message.has_field(field))
                .map(|field| field.name().to_owned()))
        })
    }

    /// The populated fields, in field-number order.
    pub fn list_fields(&self) -> Result<Vec<(FieldDescriptor, Object)>, ProxyError> {
        let mut fields: Vec<FieldDescriptor> = self.handle.read(|message| {
            Ok(self
                .descriptor
                .fields()
                .filter(|field| value::is_populated(message, field))
                .collect())
        })?;
        fields.sort_by_key(FieldDescriptor::number);
        fields
            .into_iter()
            .map(|field| {
                let object = self.get(field.name())?;
                Ok((field, object))
            })
            .collect()
    }

    /// Resets every field.
    pub fn clear(&self) -> Result<(), ProxyError> {
        self.handle.write(|message| {
            message.clear();
            Ok(())
        })
    }

    /// Replaces the contents of this message with those of `source`, which must be
    /// a message of the same type.
    pub fn copy_from(&self, source: &Object) -> Result<(), ProxyError> {
        let source = native::message_of_type(source, &self.descriptor)?;
        self.replace(source)
    }

    /// Merges `source`, which must be a message of the same type, into this
    /// message.
    ///
    /// Set scalars overwrite, repeated fields are concatenated and map entries are
    /// overlaid by key.
    pub fn merge_from(&self, source: &Object) -> Result<(), ProxyError> {
        let source = native::message_of_type(source, &self.descriptor)?;
        let bytes = source.encode_to_vec();
        self.merge_bytes(&bytes)
    }

    pub(crate) fn replace(&self, contents: DynamicMessage) -> Result<(), ProxyError> {
        self.handle.write(|message| {
            *message = contents;
            Ok(())
        })
    }

    fn merge_bytes(&self, bytes: &[u8]) -> Result<(), ProxyError> {
        let mut merged = self.to_dynamic()?;
        merged
            .merge(bytes)
            .map_err(|err| ProxyError::parse(self.full_name(), err))?;
        self.replace(merged)
    }

    /// An independent, owning duplicate of this message.
    pub fn copy(&self) -> Result<ProxyMessage, ProxyError> {
        self.to_dynamic().map(ProxyMessage::from_dynamic)
    }

    /// Same as [`copy`](Self::copy); message contents never alias other storage.
    pub fn deep_copy(&self) -> Result<ProxyMessage, ProxyError> {
        self.copy()
    }

    /// A snapshot of the message contents.
    pub fn to_dynamic(&self) -> Result<DynamicMessage, ProxyError> {
        self.handle.read(|message| Ok(message.clone()))
    }

    /// Initializes fields from keyword arguments, in order.
    ///
    /// Composite fields are accepted here: message values are copied in,
    /// sequences extend repeated fields and mappings update map fields.
    pub fn apply_kwargs(&self, kwargs: Kwargs<'_>) -> Result<(), ProxyError> {
        for (name, object) in kwargs {
            self.accessor(name)?.init(&self.handle, object)?;
        }
        Ok(())
    }

    /// The canonical multi-line text format rendering.
    pub fn to_text(&self) -> Result<String, ProxyError> {
        self.to_text_with(TextFormat::MultiLine)
    }

    pub fn to_text_with(&self, format: TextFormat) -> Result<String, ProxyError> {
        self.handle.read(|message| Ok(text::render(message, format)))
    }

    /// The single-line rendering used inside container renderings.
    pub fn to_short_text(&self) -> String {
        self.to_text_with(TextFormat::SingleLine)
            .unwrap_or_else(|err| format!("<{}: {}>", self.full_name(), err))
    }

    /// Encodes the message in the binary wire format.
    pub fn serialize(&self, options: &SerializeOptions) -> Result<Vec<u8>, ProxyError> {
        trace!(
            "serializing {} (deterministic: {})",
            self.full_name(),
            options.is_deterministic()
        );
        self.handle
            .read(|message| Ok(wire::encode(message, options.is_deterministic())))
    }

    /// Encodes the message with options given as keyword arguments.
    pub fn serialize_with(&self, kwargs: Kwargs<'_>) -> Result<Vec<u8>, ProxyError> {
        let options = SerializeOptions::from_kwargs(kwargs)?;
        self.serialize(&options)
    }

    /// Replaces the message contents with the decoded `bytes`.
    ///
    /// On malformed input the message is left unchanged.
    pub fn parse(&self, bytes: &[u8]) -> Result<(), ProxyError> {
        trace!("parsing {} bytes into {}", bytes.len(), self.full_name());
        let message = DynamicMessage::decode(self.descriptor.clone(), bytes)
            .map_err(|err| ProxyError::parse(self.full_name(), err))?;
        self.replace(message)
    }

    /// Merges the decoded `bytes` into the message.
    pub fn merge_from_bytes(&self, bytes: &[u8]) -> Result<(), ProxyError> {
        trace!("merging {} bytes into {}", bytes.len(), self.full_name());
        self.merge_bytes(bytes)
    }

    pub fn byte_size(&self) -> Result<usize, ProxyError> {
        self.handle.read(|message| Ok(message.encoded_len()))
    }
}

impl PartialEq for ProxyMessage {
    fn eq(&self, other: &ProxyMessage) -> bool {
        match (self.to_dynamic(), other.to_dynamic()) {
            (Ok(a), Ok(b)) => value::messages_equal(&a, &b),
            _ => false,
        }
    }
}

impl fmt::Debug for ProxyMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{ {} }}", self.full_name(), self.to_short_text())
    }
}

impl fmt::Display for ProxyMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Ok(text) => f.write_str(&text),
            Err(err) => write!(f, "<{}: {}>", self.full_name(), err),
        }
    }
}
