use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What a transfer token authorizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Download,
    Upload,
    Update,
    /// Upload of client-encrypted blocks
    UploadBlocks,
    /// Update with client-encrypted blocks
    UpdateBlocks,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Download => "download",
            Operation::Upload => "upload",
            Operation::Update => "update",
            Operation::UploadBlocks => "upload-blocks",
            Operation::UpdateBlocks => "update-blocks",
        }
    }

    /// Path segment the file server serves this operation under
    pub fn url_name(&self) -> &'static str {
        match self {
            Operation::Download => "files",
            Operation::Upload => "upload",
            Operation::Update => "update",
            Operation::UploadBlocks => "upload-blks",
            Operation::UpdateBlocks => "update-blks",
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, Operation::Download)
    }

    pub fn is_block_level(&self) -> bool {
        matches!(self, Operation::UploadBlocks | Operation::UpdateBlocks)
    }

    /// The block-level counterpart of a write; downloads stay as they are
    pub fn to_block_level(self) -> Self {
        match self {
            Operation::Upload => Operation::UploadBlocks,
            Operation::Update => Operation::UpdateBlocks,
            other => other,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown operation {0:?}")]
pub struct ParseOperationError(String);

impl FromStr for Operation {
    type Err = ParseOperationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "download" => Ok(Operation::Download),
            "upload" => Ok(Operation::Upload),
            "update" => Ok(Operation::Update),
            "upload-blocks" | "upload-blks" => Ok(Operation::UploadBlocks),
            "update-blocks" | "update-blks" => Ok(Operation::UpdateBlocks),
            other => Err(ParseOperationError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_level_routing() {
        assert_eq!(Operation::Upload.to_block_level(), Operation::UploadBlocks);
        assert_eq!(Operation::Update.to_block_level(), Operation::UpdateBlocks);
        assert_eq!(Operation::Download.to_block_level(), Operation::Download);
        assert!(Operation::UploadBlocks.is_block_level());
        assert!(!Operation::Download.is_write());
    }

    #[test]
    fn test_wire_names() {
        for op in [
            Operation::Download,
            Operation::Upload,
            Operation::Update,
            Operation::UploadBlocks,
            Operation::UpdateBlocks,
        ] {
            assert_eq!(op.as_str().parse::<Operation>().unwrap(), op);
            assert_eq!(
                serde_json::to_string(&op).unwrap(),
                format!("\"{}\"", op.as_str())
            );
        }
        assert_eq!("upload-blks".parse::<Operation>().unwrap(), Operation::UploadBlocks);
        assert!("delete".parse::<Operation>().is_err());
    }
}
