//! Conversions between proxies and statically-typed `prost` messages.
//!
//! Statically-typed messages interoperate with proxies through their wire
//! encoding; the descriptor of a message type is found by its full name.

use std::fmt;

use prost::Message as _;
use prost_reflect::{DynamicMessage, MessageDescriptor};

use crate::registry;
use crate::storage::Root;
use crate::value;
use crate::{Object, ProxyError, ProxyMessage};

/// A message owned by a statically-typed runtime.
pub trait NativeMessage: fmt::Debug {
    /// The fully-qualified protobuf name of the message type.
    fn type_name(&self) -> String;

    fn encode_native(&self) -> Vec<u8>;
}

impl<M> NativeMessage for M
where
    M: prost::Message + prost::Name,
{
    fn type_name(&self) -> String {
        M::full_name()
    }

    fn encode_native(&self) -> Vec<u8> {
        self.encode_to_vec()
    }
}

/// Wraps a copy of `message` in an owning proxy.
pub fn wrap<M>(message: &M) -> Result<ProxyMessage, ProxyError>
where
    M: prost::Message + prost::Name,
{
    let descriptor = registry::descriptor_for(&M::full_name())?;
    let message = DynamicMessage::decode(descriptor, message.encode_to_vec().as_slice())
        .map_err(|err| ProxyError::parse(&M::full_name(), err))?;
    Ok(ProxyMessage::from_dynamic(message))
}

/// Transfers ownership of `message` to a new proxy.
pub fn wrap_dynamic(message: DynamicMessage) -> ProxyMessage {
    ProxyMessage::from_dynamic(message)
}

/// Wraps storage shared with the caller.
pub fn wrap_shared(root: Root) -> ProxyMessage {
    ProxyMessage::from_shared(root)
}

/// Copies a wrapped or native message of exactly type `M` into an `M`.
pub fn extract<M>(object: &Object) -> Result<M, ProxyError>
where
    M: prost::Message + prost::Name + Default,
{
    let name = M::full_name();
    let bytes = match object {
        Object::Message(message) if message.full_name() == name => {
            message.to_dynamic()?.encode_to_vec()
        }
        Object::Native(message) if message.type_name() == name => message.encode_native(),
        other => return Err(expected_message(&name, other)),
    };
    M::decode(bytes.as_slice()).map_err(|err| ProxyError::parse(&name, err))
}

/// Runs `f` on a typed view of a wrapped message and writes the result back.
///
/// Native messages are rejected: they cannot be mutated through this path.
pub fn with_native_mut<M, R>(object: &Object, f: impl FnOnce(&mut M) -> R) -> Result<R, ProxyError>
where
    M: prost::Message + prost::Name + Default,
{
    let message = match object {
        Object::Message(message) => message,
        other => {
            return Err(ProxyError::mismatch(format!(
                "expected a wrapped {}, got {}",
                M::full_name(),
                other.kind_name()
            )))
        }
    };
    let mut native: M = extract(object)?;
    let result = f(&mut native);
    message.parse(&native.encode_to_vec())?;
    Ok(result)
}

/// Runs `f` on a snapshot of any message argument, viewed as a generic message.
///
/// `f` may freely mutate proxies over the same message; the snapshot does not
/// observe those writes.
pub fn with_dynamic<R>(object: &Object, f: impl FnOnce(&DynamicMessage) -> R) -> Result<R, ProxyError> {
    dynamic_from_object(object).map(|message| f(&message))
}

/// A snapshot of any message argument.
pub(crate) fn dynamic_from_object(object: &Object) -> Result<DynamicMessage, ProxyError> {
    match object {
        Object::Message(message) => message.to_dynamic(),
        Object::Native(message) => {
            let name = message.type_name();
            let descriptor = registry::descriptor_for(&name)?;
            DynamicMessage::decode(descriptor, message.encode_native().as_slice())
                .map_err(|err| ProxyError::parse(&name, err))
        }
        other => Err(ProxyError::mismatch(format!(
            "expected a message, got {}",
            other.kind_name()
        ))),
    }
}

/// A snapshot of a message argument that must be of type `descriptor`.
pub(crate) fn message_of_type(
    object: &Object,
    descriptor: &MessageDescriptor,
) -> Result<DynamicMessage, ProxyError> {
    let name = match object {
        Object::Message(message) => message.full_name().to_owned(),
        Object::Native(message) => message.type_name(),
        other => return Err(expected_message(descriptor.full_name(), other)),
    };
    if name != descriptor.full_name() {
        return Err(ProxyError::mismatch(format!(
            "expected a message of type {}, got {}",
            descriptor.full_name(),
            name
        )));
    }
    let message = dynamic_from_object(object)?;
    Ok(value::conform(&message, descriptor)?.into_owned())
}

fn expected_message(name: &str, object: &Object) -> ProxyError {
    let found = match object {
        Object::Message(message) => message.full_name().to_owned(),
        Object::Native(message) => message.type_name(),
        other => other.kind_name().to_owned(),
    };
    ProxyError::mismatch(format!("expected a message of type {}, got {}", name, found))
}
