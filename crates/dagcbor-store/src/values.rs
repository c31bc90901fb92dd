//! Capability implementations for the value types the store knows about.

use std::any::Any;

use dagcbor_codec::{CodecError, Transcoder};
use dagcbor_hash::CidPrefix;
use dagcbor_node::DagNode;
use dagcbor_types::{Cid, Node};

use crate::error::BoxError;
use crate::traits::{CborMarshaler, CborUnmarshaler, Loadable, Storable};

/// A byte string that serializes itself as a single CBOR byte string.
///
/// Self-describing: its identifier is the sha2-256 DAG-CBOR identifier of
/// that encoding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CborBytes(pub Vec<u8>);

impl CborBytes {
    /// Create a new byte value.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self(data.into())
    }

    /// The wrapped bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl CborMarshaler for CborBytes {
    fn marshal_cbor(&self) -> Result<Vec<u8>, BoxError> {
        Ok(Transcoder::shared().encode(&Node::Bytes(self.0.clone()))?)
    }
}

impl CborUnmarshaler for CborBytes {
    fn unmarshal_cbor(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        match Transcoder::shared().decode(bytes)? {
            Node::Bytes(data) => {
                self.0 = data;
                Ok(())
            }
            other => Err(CodecError::UnexpectedKind {
                expected: "byte string",
                found: other.kind(),
            }
            .into()),
        }
    }
}

impl Storable for CborBytes {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_marshaler(&self) -> Option<&dyn CborMarshaler> {
        Some(self)
    }

    fn cid(&self) -> Option<Cid> {
        let raw = self.marshal_cbor().ok()?;
        CidPrefix::default().sum(&raw).ok()
    }
}

impl Loadable for CborBytes {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_unmarshaler(&mut self) -> Option<&mut dyn CborUnmarshaler> {
        Some(self)
    }
}

impl Storable for Node {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Loadable for Node {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A wrapped object stores its canonical bytes under its own identifier.
impl CborMarshaler for DagNode {
    fn marshal_cbor(&self) -> Result<Vec<u8>, BoxError> {
        Ok(self.raw_data().to_vec())
    }
}

impl Storable for DagNode {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_marshaler(&self) -> Option<&dyn CborMarshaler> {
        Some(self)
    }

    fn cid(&self) -> Option<Cid> {
        Some(*DagNode::cid(self))
    }
}

/// Adapter for host types that go through the transcoder's rule set.
///
/// ```
/// use dagcbor_store::Registered;
///
/// let value = Registered("hello".to_owned());
/// assert_eq!(value.into_inner(), "hello");
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Registered<T>(pub T);

impl<T> Registered<T> {
    /// Unwrap the host value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Any + Send + Sync> Storable for Registered<T> {
    fn as_any(&self) -> &dyn Any {
        &self.0
    }
}

impl<T: Any + Send> Loadable for Registered<T> {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        &mut self.0
    }
}
