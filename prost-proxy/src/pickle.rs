//! Type-tagged serialization of arbitrary messages.

use log::debug;
use prost::Message as _;

use crate::registry::{self, GENERIC_CLASS_NAME};
use crate::wire::SerializeOptions;
use crate::{ProxyError, ProxyMessage};

const PICKLE: &str = "pickled message";

#[derive(Clone, PartialEq, prost::Message)]
struct PickledMessage {
    #[prost(string, tag = "1")]
    type_name: String,
    #[prost(bytes = "vec", tag = "2")]
    payload: Vec<u8>,
}

impl ProxyMessage {
    /// Encodes the message together with its type name.
    pub fn pickle(&self) -> Result<Vec<u8>, ProxyError> {
        let pickled = PickledMessage {
            type_name: self.full_name().to_owned(),
            payload: self.serialize(&SerializeOptions::new())?,
        };
        Ok(pickled.encode_to_vec())
    }
}

/// Reconstructs a message from the output of [`ProxyMessage::pickle`].
pub fn unpickle(bytes: &[u8]) -> Result<ProxyMessage, ProxyError> {
    let pickled = PickledMessage::decode(bytes).map_err(|err| ProxyError::parse(PICKLE, err))?;
    if registry::lookup_by_name(&pickled.type_name).is_none() {
        debug!(
            "unpickling unregistered type {} as {}",
            pickled.type_name, GENERIC_CLASS_NAME
        );
    }
    let descriptor = registry::descriptor_for(&pickled.type_name)?;
    let message = ProxyMessage::new(descriptor);
    message.parse(&pickled.payload)?;
    Ok(message)
}
