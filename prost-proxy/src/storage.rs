//! Ownership and keep-alive tracking for message storage.
//!
//! Every proxy holds a [`Handle`]: a strong reference to the *root* message
//! allocation plus a path from the root down to the message or field it denotes.
//! The root is released only when the last handle into it is dropped, so a
//! sub-message or container proxy keeps its top-level message alive for exactly as
//! long as the proxy itself is reachable.
//!
//! Paths are re-resolved against the live root on every access; nothing below the
//! root is cached across mutations.

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use prost_reflect::{DynamicMessage, FieldDescriptor, MapKey, Value};

use crate::ProxyError;

/// Shared storage of a top-level message.
pub type Root = Rc<RefCell<DynamicMessage>>;

/// How a proxy relates to the message storage it exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The proxy created the storage; it is freed with the last proxy referring to it.
    Owned,
    /// The storage was handed in by the caller, who may hold and mutate it too.
    Shared,
    /// The proxy exposes a field of another message and keeps that message's root
    /// alive.
    Borrowed,
}

/// One step from a message to a sub-message.
#[derive(Debug, Clone)]
pub(crate) enum Segment {
    /// A singular message field.
    Field(FieldDescriptor),
    /// An element of a repeated message field.
    Element(FieldDescriptor, usize),
    /// The value of an entry in a message-valued map field.
    Entry(FieldDescriptor, MapKey),
}

#[derive(Debug, Clone)]
pub(crate) struct Handle {
    root: Root,
    path: Rc<[Segment]>,
    shared: bool,
}

impl Handle {
    pub(crate) fn owned(message: DynamicMessage) -> Handle {
        Handle {
            root: Rc::new(RefCell::new(message)),
            path: Rc::from(Vec::new()),
            shared: false,
        }
    }

    pub(crate) fn shared(root: Root) -> Handle {
        Handle {
            root,
            path: Rc::from(Vec::new()),
            shared: true,
        }
    }

    /// A handle to a sub-message of this one, keeping the same root alive.
    pub(crate) fn child(&self, segment: Segment) -> Handle {
        let mut path = self.path.to_vec();
        path.push(segment);
        Handle {
            root: Rc::clone(&self.root),
            path: Rc::from(path),
            shared: self.shared,
        }
    }

    pub(crate) fn ownership(&self) -> Ownership {
        if !self.path.is_empty() {
            Ownership::Borrowed
        } else if self.shared {
            Ownership::Shared
        } else {
            Ownership::Owned
        }
    }

    /// Whether both handles keep the same root allocation alive.
    pub(crate) fn same_root(&self, other: &Handle) -> bool {
        Rc::ptr_eq(&self.root, &other.root)
    }

    /// Runs `f` against the message this handle denotes.
    ///
    /// Unset sub-messages along the path read as their default value; reading never
    /// marks a field as present.
    pub(crate) fn read<R>(
        &self,
        f: impl FnOnce(&DynamicMessage) -> Result<R, ProxyError>,
    ) -> Result<R, ProxyError> {
        let root = self.root.borrow();
        let message = resolve(&root, &self.path)?;
        f(&message)
    }

    /// Runs `f` against the message this handle denotes, creating any unset
    /// sub-messages along the path.
    pub(crate) fn write<R>(
        &self,
        f: impl FnOnce(&mut DynamicMessage) -> Result<R, ProxyError>,
    ) -> Result<R, ProxyError> {
        let mut root = self.root.borrow_mut();
        let message = resolve_mut(&mut root, &self.path)?;
        f(message)
    }
}

fn resolve<'a>(
    message: &'a DynamicMessage,
    path: &[Segment],
) -> Result<Cow<'a, DynamicMessage>, ProxyError> {
    let Some((segment, rest)) = path.split_first() else {
        return Ok(Cow::Borrowed(message));
    };
    match segment.lookup(message)? {
        Cow::Borrowed(child) => resolve(child, rest),
        Cow::Owned(child) => resolve(&child, rest).map(|m| Cow::Owned(m.into_owned())),
    }
}

fn resolve_mut<'a>(
    message: &'a mut DynamicMessage,
    path: &[Segment],
) -> Result<&'a mut DynamicMessage, ProxyError> {
    let Some((segment, rest)) = path.split_first() else {
        return Ok(message);
    };
    let child = segment.lookup_mut(message)?;
    resolve_mut(child, rest)
}

impl Segment {
    fn field(&self) -> &FieldDescriptor {
        match self {
            Segment::Field(field) | Segment::Element(field, _) | Segment::Entry(field, _) => field,
        }
    }

    fn lookup<'a>(&self, message: &'a DynamicMessage) -> Result<Cow<'a, DynamicMessage>, ProxyError> {
        let field = self.field();
        let value = message.get_field(field);
        match (self, value) {
            (Segment::Field(_), Cow::Borrowed(Value::Message(child))) => Ok(Cow::Borrowed(child)),
            (Segment::Field(_), Cow::Owned(Value::Message(child))) => Ok(Cow::Owned(child)),
            (Segment::Element(_, index), Cow::Borrowed(Value::List(items))) => {
                match items.get(*index) {
                    Some(Value::Message(child)) => Ok(Cow::Borrowed(child)),
                    Some(_) => Err(not_a_message(field)),
                    None => Err(ProxyError::IndexOutOfRange {
                        index: *index,
                        len: items.len(),
                    }),
                }
            }
            (Segment::Element(_, index), Cow::Owned(Value::List(items))) => {
                Err(ProxyError::IndexOutOfRange {
                    index: *index,
                    len: items.len(),
                })
            }
            (Segment::Entry(_, key), Cow::Borrowed(Value::Map(entries))) => {
                match entries.get(key) {
                    Some(Value::Message(child)) => Ok(Cow::Borrowed(child)),
                    Some(_) => Err(not_a_message(field)),
                    None => Ok(Cow::Owned(default_entry_value(field)?)),
                }
            }
            (Segment::Entry(..), Cow::Owned(Value::Map(_))) => {
                Ok(Cow::Owned(default_entry_value(field)?))
            }
            _ => Err(not_a_message(field)),
        }
    }

    fn lookup_mut<'a>(&self, message: &'a mut DynamicMessage) -> Result<&'a mut DynamicMessage, ProxyError> {
        match self {
            Segment::Field(field) => {
                clear_oneof_siblings(message, field);
                match message.get_field_mut(field) {
                    Value::Message(child) => Ok(child),
                    _ => Err(not_a_message(field)),
                }
            }
            Segment::Element(field, index) => match message.get_field_mut(field) {
                Value::List(items) => {
                    let len = items.len();
                    match items.get_mut(*index) {
                        Some(Value::Message(child)) => Ok(child),
                        Some(_) => Err(not_a_message(field)),
                        None => Err(ProxyError::IndexOutOfRange { index: *index, len }),
                    }
                }
                _ => Err(not_a_message(field)),
            },
            Segment::Entry(field, key) => {
                let default = default_entry_value(field)?;
                match message.get_field_mut(field) {
                    Value::Map(entries) => {
                        match entries
                            .entry(key.clone())
                            .or_insert_with(|| Value::Message(default))
                        {
                            Value::Message(child) => Ok(child),
                            _ => Err(not_a_message(field)),
                        }
                    }
                    _ => Err(not_a_message(field)),
                }
            }
        }
    }
}

/// Clears the other members of `field`'s oneof, if it belongs to one.
pub(crate) fn clear_oneof_siblings(message: &mut DynamicMessage, field: &FieldDescriptor) {
    if let Some(oneof) = field.containing_oneof() {
        for sibling in oneof.fields() {
            if sibling != *field && message.has_field(&sibling) {
                message.clear_field(&sibling);
            }
        }
    }
}

fn default_entry_value(field: &FieldDescriptor) -> Result<DynamicMessage, ProxyError> {
    crate::accessor::map_value_message(field)
        .map(DynamicMessage::new)
        .ok_or_else(|| not_a_message(field))
}

fn not_a_message(field: &FieldDescriptor) -> ProxyError {
    ProxyError::mismatch(format!("field `{}` does not hold messages", field.full_name()))
}
