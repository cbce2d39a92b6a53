use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Size of a BLAKE3 digest in bytes
pub const OBJECT_ID_SIZE: usize = 32;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ObjectIdError {
    #[error("invalid object id length: expected {expected} hex chars, got {got}")]
    Length { expected: usize, got: usize },
    #[error("invalid object id hex: {0}")]
    Hex(String),
}

/// Content address of anything stored in the object store.
///
/// The id is the BLAKE3 digest of the exact bytes handed to the block store,
///  so identical bytes always map to the same id, regardless of who wrote
///  them or when. Blocks, files, trees and commits all share this one
///  keyspace; the aliases below only document intent at call sites.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_SIZE]);

pub type BlockId = ObjectId;
pub type FileId = ObjectId;
pub type TreeId = ObjectId;
pub type CommitId = ObjectId;

impl ObjectId {
    /// Hash the given bytes into their content address
    pub fn of(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    pub fn from_bytes(bytes: [u8; OBJECT_ID_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, ObjectIdError> {
        if s.len() != OBJECT_ID_SIZE * 2 {
            return Err(ObjectIdError::Length {
                expected: OBJECT_ID_SIZE * 2,
                got: s.len(),
            });
        }
        let mut buff = [0; OBJECT_ID_SIZE];
        hex::decode_to_slice(s, &mut buff).map_err(|e| ObjectIdError::Hex(e.to_string()))?;
        Ok(Self(buff))
    }

    /// Abbreviated form used in log lines
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// NOTE: ids serialize as hex strings so they read the same in
//  CBOR blocks, SQLite rows and JSON payloads
impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ObjectId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
