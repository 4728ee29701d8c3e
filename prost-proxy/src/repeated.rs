use std::fmt;

use prost_reflect::{MessageDescriptor, Value};

use crate::accessor::{FieldAccessor, Strategy};
use crate::native;
use crate::storage::{Handle, Segment};
use crate::text;
use crate::value;
use crate::{Kwargs, Object, ProxyError, ProxyMessage};

/// A live view of a repeated field.
///
/// The view owns no elements. Every operation resolves the field against the
/// current contents of the message, which the view keeps alive.
#[derive(Clone)]
pub struct RepeatedField {
    handle: Handle,
    accessor: FieldAccessor,
}

impl RepeatedField {
    pub(crate) fn new(handle: Handle, accessor: FieldAccessor) -> RepeatedField {
        RepeatedField { handle, accessor }
    }

    pub fn accessor(&self) -> &FieldAccessor {
        &self.accessor
    }

    fn read<R>(&self, f: impl FnOnce(&[Value]) -> Result<R, ProxyError>) -> Result<R, ProxyError> {
        let field = self.accessor.field();
        self.handle.read(|message| match &*message.get_field(field) {
            Value::List(items) => f(items),
            _ => Err(self.not_repeated()),
        })
    }

    fn write<R>(
        &self,
        f: impl FnOnce(&mut Vec<Value>) -> Result<R, ProxyError>,
    ) -> Result<R, ProxyError> {
        let field = self.accessor.field();
        self.handle.write(|message| match message.get_field_mut(field) {
            Value::List(items) => f(items),
            _ => Err(self.not_repeated()),
        })
    }

    fn not_repeated(&self) -> ProxyError {
        ProxyError::mismatch(format!("`{}` is not a repeated field", self.accessor.name()))
    }

    fn element_type(&self) -> Option<MessageDescriptor> {
        self.accessor.message_type()
    }

    /// Converts a host value into an element, copying message values.
    fn to_element(&self, object: &Object) -> Result<Value, ProxyError> {
        match self.element_type() {
            Some(descriptor) => {
                native::message_of_type(object, &descriptor).map(Value::Message)
            }
            None => value::to_value(&self.accessor.field().kind(), object),
        }
    }

    fn element(&self, index: usize, item: &Value) -> Object {
        match self.element_type() {
            Some(descriptor) => Object::Message(ProxyMessage::from_handle(
                self.handle
                    .child(Segment::Element(self.accessor.field().clone(), index)),
                descriptor,
            )),
            None => value::scalar_to_object(item),
        }
    }

    pub fn len(&self) -> Result<usize, ProxyError> {
        self.read(|items| Ok(items.len()))
    }

    pub fn is_empty(&self) -> Result<bool, ProxyError> {
        self.len().map(|len| len == 0)
    }

    /// The element at `index`. Message elements are returned as live proxies.
    pub fn get(&self, index: usize) -> Result<Object, ProxyError> {
        self.read(|items| match items.get(index) {
            Some(item) => Ok(self.element(index, item)),
            None => Err(ProxyError::IndexOutOfRange {
                index,
                len: items.len(),
            }),
        })
    }

    /// Replaces the element at `index`. Message values are copied into the slot.
    pub fn set(&self, index: usize, object: impl Into<Object>) -> Result<(), ProxyError> {
        let element = self.to_element(&object.into())?;
        self.write(|items| {
            let len = items.len();
            match items.get_mut(index) {
                Some(slot) => {
                    *slot = element;
                    Ok(())
                }
                None => Err(ProxyError::IndexOutOfRange { index, len }),
            }
        })
    }

    /// Appends a copy of `object`.
    pub fn append(&self, object: impl Into<Object>) -> Result<(), ProxyError> {
        let element = self.to_element(&object.into())?;
        self.write(|items| {
            items.push(element);
            Ok(())
        })
    }

    /// Inserts a copy of `object` before `index`; `index == len` appends.
    pub fn insert(&self, index: usize, object: impl Into<Object>) -> Result<(), ProxyError> {
        let element = self.to_element(&object.into())?;
        self.write(|items| {
            if index > items.len() {
                return Err(ProxyError::IndexOutOfRange {
                    index,
                    len: items.len(),
                });
            }
            items.insert(index, element);
            Ok(())
        })
    }

    /// Appends every item in order.
    ///
    /// Stops at the first item that cannot be converted; items appended before it
    /// are kept.
    pub fn extend<I>(&self, items: I) -> Result<(), ProxyError>
    where
        I: IntoIterator,
        I::Item: Into<Object>,
    {
        for item in items {
            self.append(item)?;
        }
        Ok(())
    }

    /// Extends from a host sequence: a list or another repeated field.
    pub fn extend_from(&self, object: &Object) -> Result<(), ProxyError> {
        match object {
            Object::List(items) => self.extend(items.iter().cloned()),
            Object::Repeated(other) => self.extend(other.to_vec()?),
            other => Err(ProxyError::mismatch(format!(
                "cannot extend `{}` from {}",
                self.accessor.name(),
                other.kind_name()
            ))),
        }
    }

    /// Removes the element at `index`, shifting later elements down.
    pub fn remove(&self, index: usize) -> Result<(), ProxyError> {
        self.write(|items| {
            if index >= items.len() {
                return Err(ProxyError::IndexOutOfRange {
                    index,
                    len: items.len(),
                });
            }
            items.remove(index);
            Ok(())
        })
    }

    pub fn clear(&self) -> Result<(), ProxyError> {
        self.write(|items| {
            items.clear();
            Ok(())
        })
    }

    /// Appends a new message element initialized from `kwargs` and returns a proxy
    /// to it.
    ///
    /// If a keyword argument is rejected, nothing is appended.
    pub fn add(&self, kwargs: Kwargs<'_>) -> Result<ProxyMessage, ProxyError> {
        let descriptor = self.element_type().ok_or_else(|| {
            ProxyError::mismatch(format!(
                "`{}` does not hold messages",
                self.accessor.name()
            ))
        })?;
        let element = ProxyMessage::new(descriptor.clone());
        element.apply_kwargs(kwargs)?;
        let element = element.to_dynamic()?;
        let index = self.write(|items| {
            items.push(Value::Message(element));
            Ok(items.len() - 1)
        })?;
        Ok(ProxyMessage::from_handle(
            self.handle
                .child(Segment::Element(self.accessor.field().clone(), index)),
            descriptor,
        ))
    }

    /// Iterates over the elements, reading each one as it is reached.
    pub fn iter(&self) -> Iter {
        Iter {
            field: self.clone(),
            index: 0,
        }
    }

    pub fn to_vec(&self) -> Result<Vec<Object>, ProxyError> {
        self.read(|items| {
            Ok(items
                .iter()
                .enumerate()
                .map(|(index, item)| self.element(index, item))
                .collect())
        })
    }
}

impl IntoIterator for &RepeatedField {
    type Item = Object;
    type IntoIter = Iter;

    fn into_iter(self) -> Iter {
        self.iter()
    }
}

/// Iterator over the elements of a [`RepeatedField`].
pub struct Iter {
    field: RepeatedField,
    index: usize,
}

impl Iterator for Iter {
    type Item = Object;

    fn next(&mut self) -> Option<Object> {
        let item = self.field.get(self.index).ok()?;
        self.index += 1;
        Some(item)
    }
}

impl fmt::Display for RepeatedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.accessor.field().kind();
        let rendered = self.read(|items| {
            Ok(items
                .iter()
                .map(|item| text::short_value(&kind, item))
                .collect::<Vec<_>>())
        });
        match rendered {
            Ok(items) => write!(f, "[{}]", items.join(", ")),
            Err(err) => write!(f, "<{}: {}>", self.accessor.name(), err),
        }
    }
}

impl fmt::Debug for RepeatedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RepeatedField({}: {})", self.accessor.name(), self)
    }
}

impl PartialEq for RepeatedField {
    fn eq(&self, other: &RepeatedField) -> bool {
        Object::Repeated(self.clone()) == Object::Repeated(other.clone())
    }
}
