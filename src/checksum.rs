//! Content fingerprints for detecting edits made behind a loaded document

use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// SHA256 checksum of a schema file's raw bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute checksum of a file's current contents
    pub fn of_file(path: &Path) -> io::Result<Self> {
        Ok(Self::from_bytes(&fs::read(path)?))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Verify that content matches this checksum
    pub fn verify(&self, data: &[u8]) -> bool {
        Self::from_bytes(data) == *self
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_consistency() {
        let content = b"<Schema name=\"Monza\"/>";
        assert_eq!(Checksum::from_bytes(content), Checksum::from_bytes(content));
        assert_eq!(Checksum::from_bytes(content).as_str().len(), 64);
    }

    #[test]
    fn test_checksum_verification() {
        let checksum = Checksum::from_bytes(b"<Schema/>");
        assert!(checksum.verify(b"<Schema/>"));
        assert!(!checksum.verify(b"<Schema />"));
    }

    #[test]
    fn test_checksum_of_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.xml");
        fs::write(&path, "<Schema/>").unwrap();
        assert_eq!(Checksum::of_file(&path).unwrap(), Checksum::from_bytes(b"<Schema/>"));
    }
}
