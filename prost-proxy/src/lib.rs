//! Dynamic proxies over reflection-driven Protocol Buffers messages.
//!
//! A [`ProxyMessage`] exposes the fields of a [`prost_reflect::DynamicMessage`] by
//! name, with the presence, oneof, repeated and map semantics of protobuf. Reading
//! a message, repeated or map field returns a live proxy that shares storage with
//! the top-level message and keeps it alive, so a sub-message obtained from a
//! message remains usable after every other reference to that message is dropped.
//!
//! Message types registered with [`register`] get a concrete [`MessageClass`] with
//! a constructor and a precomputed field table; all other types share the generic
//! class. Which class a proxy has depends only on its message type.

// Re-export prost-reflect for use by callers building descriptors.
pub use prost_reflect;

mod accessor;
mod any;
mod error;
mod factory;
mod map;
mod message;
mod native;
mod object;
mod pickle;
mod registry;
mod repeated;
mod storage;
mod text;
mod value;
mod wire;

pub use crate::accessor::{FieldAccessor, Strategy};
pub use crate::error::ProxyError;
pub use crate::factory::{is_wrapped_message, make_message, TypeSource};
pub use crate::map::{Items, MapField};
pub use crate::message::ProxyMessage;
pub use crate::native::{
    extract, with_dynamic, with_native_mut, wrap, wrap_dynamic, wrap_shared, NativeMessage,
};
pub use crate::object::{Kwargs, Object};
pub use crate::pickle::unpickle;
pub use crate::registry::{
    descriptor_for, lookup_by_descriptor, lookup_by_instance, lookup_by_name, register,
    register_type, MessageClass, Registration, GENERIC_CLASS_NAME,
};
pub use crate::repeated::{Iter, RepeatedField};
pub use crate::storage::{Ownership, Root};
pub use crate::text::{merge_text, parse_text, TextFormat};
pub use crate::wire::SerializeOptions;
