//! `google.protobuf.Any` helpers.

use prost_reflect::{ReflectMessage, FieldDescriptor, MessageDescriptor, Value};

use crate::native::{self, NativeMessage};
use crate::wire;
use crate::{Object, ProxyError, ProxyMessage};

const ANY_NAME: &str = "google.protobuf.Any";
const TYPE_URL_PREFIX: &str = "type.googleapis.com/";

/// URL/resource name that uniquely identifies the type of a packed message, e.g.
/// `type.googleapis.com/google.protobuf.Duration`.
///
/// The last segment of the URL's path is the fully qualified name of the type, in
/// canonical form (no leading ".").
#[derive(Debug, Eq, PartialEq)]
pub(crate) struct TypeUrl<'a> {
    pub(crate) full_name: &'a str,
}

impl<'a> TypeUrl<'a> {
    pub(crate) fn new(s: &'a str) -> Option<Self> {
        let slash_pos = s.rfind('/')?;
        let full_name = s.get((slash_pos + 1)..)?;
        if full_name.is_empty() || full_name.starts_with('.') {
            return None;
        }
        Some(Self { full_name })
    }
}

pub(crate) fn type_url_for(full_name: &str) -> String {
    format!("{}{}", TYPE_URL_PREFIX, full_name)
}

impl ProxyMessage {
    fn any_fields(&self) -> Result<(FieldDescriptor, FieldDescriptor), ProxyError> {
        let fields = if self.full_name() == ANY_NAME {
            self.descriptor()
                .get_field_by_name("type_url")
                .zip(self.descriptor().get_field_by_name("value"))
        } else {
            None
        };
        fields.ok_or_else(|| {
            ProxyError::mismatch(format!("expected a {}, got {}", ANY_NAME, self.full_name()))
        })
    }

    fn any_contents(&self) -> Result<(String, Vec<u8>), ProxyError> {
        let (type_url, value) = self.any_fields()?;
        self.handle().read(|message| {
            let url = match &*message.get_field(&type_url) {
                Value::String(url) => url.clone(),
                _ => String::new(),
            };
            let bytes = match &*message.get_field(&value) {
                Value::Bytes(bytes) => bytes.to_vec(),
                _ => Vec::new(),
            };
            Ok((url, bytes))
        })
    }

    /// Stores `message`, a wrapped or native message, in this `Any`.
    ///
    /// The payload is the deterministic encoding of `message`.
    pub fn pack(&self, message: &Object) -> Result<(), ProxyError> {
        let (type_url, value) = self.any_fields()?;
        let (name, bytes) = match message {
            Object::Native(native) => (native.type_name(), native.encode_native()),
            _ => {
                let dynamic = native::dynamic_from_object(message)?;
                let name = dynamic.descriptor().full_name().to_owned();
                (name, wire::encode(&dynamic, true))
            }
        };
        self.handle().write(|any| {
            any.set_field(&type_url, Value::String(type_url_for(&name)));
            any.set_field(&value, Value::Bytes(bytes.into()));
            Ok(())
        })
    }

    /// The type URL of the packed message.
    pub fn type_url(&self) -> Result<String, ProxyError> {
        self.any_contents().map(|(url, _)| url)
    }

    /// The full name of the packed message type.
    pub fn any_type_name(&self) -> Result<String, ProxyError> {
        let url = self.type_url()?;
        TypeUrl::new(&url)
            .map(|url| url.full_name.to_owned())
            .ok_or_else(|| ProxyError::parse(ANY_NAME, format!("invalid type URL `{}`", url)))
    }

    /// Whether the packed message is of type `descriptor`.
    pub fn is(&self, descriptor: &MessageDescriptor) -> Result<bool, ProxyError> {
        let url = self.type_url()?;
        Ok(TypeUrl::new(&url).map_or(false, |url| url.full_name == descriptor.full_name()))
    }

    /// Parses the packed message into `target`.
    ///
    /// Returns `false`, leaving `target` untouched, if the packed type is not
    /// `target`'s type.
    pub fn unpack(&self, target: &ProxyMessage) -> Result<bool, ProxyError> {
        if !self.is(target.descriptor())? {
            return Ok(false);
        }
        let (_, bytes) = self.any_contents()?;
        target.parse(&bytes)?;
        Ok(true)
    }

    /// Decodes the packed message into the statically-typed `target`.
    pub fn unpack_into<M>(&self, target: &mut M) -> Result<bool, ProxyError>
    where
        M: prost::Message + prost::Name + Default,
    {
        let name = M::full_name();
        let (url, bytes) = self.any_contents()?;
        if TypeUrl::new(&url).map_or(true, |url| url.full_name != name) {
            return Ok(false);
        }
        *target = M::decode(bytes.as_slice()).map_err(|err| ProxyError::parse(&name, err))?;
        Ok(true)
    }
}
