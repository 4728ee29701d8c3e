use prost_reflect::MessageDescriptor;

use crate::native::NativeMessage;
use crate::registry::{self, MessageClass};
use crate::{Kwargs, Object, ProxyError, ProxyMessage};

/// Anything that designates a message type.
#[derive(Debug, Clone, Copy)]
pub enum TypeSource<'a> {
    /// A fully-qualified type name.
    Name(&'a str),
    Descriptor(&'a MessageDescriptor),
    /// The type of a wrapped or native message.
    Object(&'a Object),
    Class(&'a MessageClass),
}

impl<'a> From<&'a str> for TypeSource<'a> {
    fn from(name: &'a str) -> Self {
        TypeSource::Name(name)
    }
}

impl<'a> From<&'a MessageDescriptor> for TypeSource<'a> {
    fn from(descriptor: &'a MessageDescriptor) -> Self {
        TypeSource::Descriptor(descriptor)
    }
}

impl<'a> From<&'a Object> for TypeSource<'a> {
    fn from(object: &'a Object) -> Self {
        TypeSource::Object(object)
    }
}

impl<'a> From<&'a MessageClass> for TypeSource<'a> {
    fn from(class: &'a MessageClass) -> Self {
        TypeSource::Class(class)
    }
}

/// Creates a new message of the designated type, initialized from `kwargs`.
///
/// Unlike a class constructor, this works for unregistered types too, except when
/// the source is the generic class itself.
pub fn make_message<'a>(
    source: impl Into<TypeSource<'a>>,
    kwargs: Kwargs<'_>,
) -> Result<ProxyMessage, ProxyError> {
    let descriptor = match source.into() {
        TypeSource::Name(name) => registry::descriptor_for(name)?,
        TypeSource::Descriptor(descriptor) => descriptor.clone(),
        TypeSource::Object(Object::Message(message)) => message.descriptor().clone(),
        TypeSource::Object(Object::Native(message)) => {
            registry::descriptor_for(&message.type_name())?
        }
        TypeSource::Object(other) => {
            return Err(ProxyError::mismatch(format!(
                "cannot make a message from {}",
                other.kind_name()
            )))
        }
        TypeSource::Class(class) => return class.construct(kwargs),
    };
    let message = ProxyMessage::new(descriptor);
    message.apply_kwargs(kwargs)?;
    Ok(message)
}

/// Whether `object` is a message proxy.
pub fn is_wrapped_message(object: &Object) -> bool {
    matches!(object, Object::Message(_))
}
