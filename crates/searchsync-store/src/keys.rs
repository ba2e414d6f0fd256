//! Key encoding and decoding for the storage layer.
//!
//! Key format: `{prefix}:{record_id}` with the id zero-padded to 20 digits
//! so lexicographic iteration order matches numeric id order.

use searchsync_types::RecordId;

use crate::error::StoreError;

/// Key for catalog records.
/// Format: rec:{record_id:020}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordKey {
    /// Catalog record id
    pub record_id: RecordId,
}

impl RecordKey {
    /// Create a record key for the given id
    pub fn new(record_id: RecordId) -> Self {
        Self { record_id }
    }

    /// Encode key to bytes for storage
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("rec:{:020}", self.record_id).into_bytes()
    }

    /// Decode key from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        let record_id = parse_suffix(bytes, "rec")?;
        Ok(Self { record_id })
    }
}

/// Key for sync state rows.
/// Format: st:{record_id:020}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateKey {
    /// Catalog record id the state row tracks
    pub record_id: RecordId,
}

impl StateKey {
    /// Create a state key for the given id
    pub fn new(record_id: RecordId) -> Self {
        Self { record_id }
    }

    /// Encode key to bytes for storage
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("st:{:020}", self.record_id).into_bytes()
    }

    /// Decode key from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        let record_id = parse_suffix(bytes, "st")?;
        Ok(Self { record_id })
    }
}

fn parse_suffix(bytes: &[u8], prefix: &str) -> Result<RecordId, StoreError> {
    let s = std::str::from_utf8(bytes)
        .map_err(|e| StoreError::Key(format!("Invalid UTF-8: {}", e)))?;

    let mut parts = s.splitn(2, ':');
    let head = parts.next().unwrap_or_default();
    let tail = parts
        .next()
        .ok_or_else(|| StoreError::Key(format!("Invalid key format: {}", s)))?;

    if head != prefix {
        return Err(StoreError::Key(format!(
            "Expected prefix {}, got key: {}",
            prefix, s
        )));
    }

    tail.parse()
        .map_err(|e| StoreError::Key(format!("Invalid record id: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_key_roundtrip() {
        let key = StateKey::new(42);
        let bytes = key.to_bytes();
        assert_eq!(bytes, b"st:00000000000000000042");

        let decoded = StateKey::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn test_record_key_roundtrip() {
        let key = RecordKey::new(u64::MAX);
        let decoded = RecordKey::from_bytes(&key.to_bytes()).unwrap();
        assert_eq!(decoded.record_id, u64::MAX);
    }

    #[test]
    fn test_keys_sort_numerically() {
        assert!(StateKey::new(9).to_bytes() < StateKey::new(10).to_bytes());
        assert!(StateKey::new(99).to_bytes() < StateKey::new(100).to_bytes());
    }

    #[test]
    fn test_wrong_prefix_rejected() {
        let bytes = RecordKey::new(1).to_bytes();
        assert!(StateKey::from_bytes(&bytes).is_err());
    }
}
