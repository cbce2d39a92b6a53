//! Content addressing and block encoding.
//!
//! Structured objects (trees, file manifests, commits) are DAG-CBOR encoded
//!  before they reach the block store; their [`ObjectId`] is the digest of
//!  that encoding. DAG-CBOR is deterministic for the types we store (maps are
//!  `BTreeMap`s, no floats), which is what makes the ids stable.

mod object_id;

use ipld_core::codec::Codec;
use serde::{de::DeserializeOwned, Serialize};
pub use serde_ipld_dagcbor::codec::DagCborCodec;

pub use object_id::{
    BlockId, CommitId, FileId, ObjectId, ObjectIdError, TreeId, OBJECT_ID_SIZE,
};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to encode block: {0}")]
    Encode(String),
    #[error("failed to decode block: {0}")]
    Decode(String),
}

/// Types that are stored as a single DAG-CBOR block
pub trait BlockEncoded: Serialize + DeserializeOwned + Sized {
    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        <DagCborCodec as Codec<Self>>::encode_to_vec(self)
            .map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        <DagCborCodec as Codec<Self>>::decode_from_slice(bytes)
            .map_err(|e| CodecError::Decode(e.to_string()))
    }

    /// The id this value would be stored under
    fn object_id(&self) -> Result<ObjectId, CodecError> {
        Ok(ObjectId::of(&self.encode()?))
    }
}
