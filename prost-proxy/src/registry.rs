//! The process-wide registry of concrete message types.
//!
//! Registering a message type gives every proxy over an instance of that type a
//! concrete class with a constructor and a precomputed field dispatch table.
//! Which class a proxy gets depends only on the runtime type of the message it
//! wraps, never on how the proxy was produced.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::{debug, trace};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use prost_reflect::{ReflectMessage, DescriptorPool, DynamicMessage, MessageDescriptor, OneofDescriptor};

use crate::accessor::FieldAccessor;
use crate::{Kwargs, ProxyError, ProxyMessage};

/// Name of the class shared by all unregistered message types.
pub const GENERIC_CLASS_NAME: &str = "ProtoMessage";

static REGISTRY: Lazy<RwLock<HashMap<String, Arc<Registration>>>> = Lazy::new(Default::default);

/// A registered concrete message type.
pub struct Registration {
    descriptor: MessageDescriptor,
    accessors: HashMap<String, FieldAccessor>,
    oneofs: HashMap<String, OneofDescriptor>,
}

impl Registration {
    fn new(descriptor: MessageDescriptor) -> Registration {
        let accessors = descriptor
            .fields()
            .map(|field| (field.name().to_owned(), FieldAccessor::new(field)))
            .collect();
        let oneofs = descriptor
            .oneofs()
            .map(|oneof| (oneof.name().to_owned(), oneof))
            .collect();
        Registration {
            descriptor,
            accessors,
            oneofs,
        }
    }

    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.descriptor
    }

    pub fn full_name(&self) -> &str {
        self.descriptor.full_name()
    }

    pub fn accessor(&self, name: &str) -> Option<&FieldAccessor> {
        self.accessors.get(name)
    }

    pub fn oneof(&self, name: &str) -> Option<&OneofDescriptor> {
        self.oneofs.get(name)
    }

    /// Constructs a new owning instance, applying `kwargs` in order.
    pub fn construct(&self, kwargs: Kwargs<'_>) -> Result<ProxyMessage, ProxyError> {
        let message = ProxyMessage::new(self.descriptor.clone());
        message.apply_kwargs(kwargs)?;
        Ok(message)
    }

    fn conflicts_with(&self, descriptor: &MessageDescriptor) -> bool {
        self.descriptor != *descriptor
            && self.descriptor.descriptor_proto() != descriptor.descriptor_proto()
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("full_name", &self.full_name())
            .field("fields", &self.accessors.len())
            .finish()
    }
}

/// Registers `descriptor` as a concrete type.
///
/// Registration is idempotent. Registering a different message definition under an
/// already registered name fails with [`ProxyError::AlreadyRegisteredMismatch`].
pub fn register(descriptor: MessageDescriptor) -> Result<Arc<Registration>, ProxyError> {
    let mut registry = REGISTRY.write();
    if let Some(existing) = registry.get(descriptor.full_name()) {
        if existing.conflicts_with(&descriptor) {
            return Err(ProxyError::AlreadyRegisteredMismatch(
                descriptor.full_name().to_owned(),
            ));
        }
        return Ok(Arc::clone(existing));
    }
    debug!("registering concrete message type {}", descriptor.full_name());
    let registration = Arc::new(Registration::new(descriptor));
    registry.insert(registration.full_name().to_owned(), Arc::clone(&registration));
    Ok(registration)
}

/// Registers the statically-typed message `M`, resolving its descriptor by name.
pub fn register_type<M>() -> Result<Arc<Registration>, ProxyError>
where
    M: prost::Name,
{
    let name = M::full_name();
    let descriptor = DescriptorPool::global()
        .get_message_by_name(&name)
        .ok_or(ProxyError::UnknownType(name))?;
    register(descriptor)
}

pub fn lookup_by_name(name: &str) -> Option<Arc<Registration>> {
    REGISTRY.read().get(name).cloned()
}

pub fn lookup_by_descriptor(descriptor: &MessageDescriptor) -> Option<Arc<Registration>> {
    lookup_by_name(descriptor.full_name())
}

pub fn lookup_by_instance(message: &DynamicMessage) -> Option<Arc<Registration>> {
    lookup_by_descriptor(&message.descriptor())
}

/// Resolves a message type by full name: registered types first, then the global
/// descriptor pool.
pub fn descriptor_for(name: &str) -> Result<MessageDescriptor, ProxyError> {
    if let Some(registration) = lookup_by_name(name) {
        return Ok(registration.descriptor().clone());
    }
    trace!("resolving {} from the global descriptor pool", name);
    DescriptorPool::global()
        .get_message_by_name(name)
        .ok_or_else(|| ProxyError::UnknownType(name.to_owned()))
}

/// The runtime class of a message proxy.
#[derive(Debug, Clone)]
pub enum MessageClass {
    /// The shared class of unregistered types. It has no descriptor and no
    /// constructor.
    Generic,
    /// A registered concrete type.
    Concrete(Arc<Registration>),
    /// The synthetic key/value record type of a map field.
    MapEntry(MessageDescriptor),
}

impl MessageClass {
    pub fn for_descriptor(descriptor: &MessageDescriptor) -> MessageClass {
        match lookup_by_descriptor(descriptor) {
            Some(registration) => MessageClass::Concrete(registration),
            None => MessageClass::Generic,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            MessageClass::Generic => GENERIC_CLASS_NAME,
            MessageClass::Concrete(registration) => registration.full_name(),
            MessageClass::MapEntry(descriptor) => descriptor.full_name(),
        }
    }

    /// The class-level descriptor. Only concrete and map-entry classes have one.
    pub fn descriptor(&self) -> Option<MessageDescriptor> {
        match self {
            MessageClass::Generic => None,
            MessageClass::Concrete(registration) => Some(registration.descriptor().clone()),
            MessageClass::MapEntry(descriptor) => Some(descriptor.clone()),
        }
    }

    pub fn is_concrete(&self) -> bool {
        matches!(self, MessageClass::Concrete(_))
    }

    pub fn construct(&self, kwargs: Kwargs<'_>) -> Result<ProxyMessage, ProxyError> {
        match self {
            MessageClass::Generic => Err(ProxyError::NotConstructible(GENERIC_CLASS_NAME.to_owned())),
            MessageClass::Concrete(registration) => registration.construct(kwargs),
            MessageClass::MapEntry(descriptor) => {
                let entry = ProxyMessage::new(descriptor.clone());
                entry.apply_kwargs(kwargs)?;
                Ok(entry)
            }
        }
    }
}

impl PartialEq for MessageClass {
    fn eq(&self, other: &MessageClass) -> bool {
        match (self, other) {
            (MessageClass::Generic, MessageClass::Generic) => true,
            (MessageClass::Concrete(a), MessageClass::Concrete(b)) => Arc::ptr_eq(a, b),
            (MessageClass::MapEntry(a), MessageClass::MapEntry(b)) => a.full_name() == b.full_name(),
            _ => false,
        }
    }
}
