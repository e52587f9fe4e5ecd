//! SourceId - integer identifier of a telemetry source
//!
//! Sources are not required to be contiguous or known in advance.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a physical or logical sensor.
///
/// Serialized transparently as the integer `id` field of the wire record.
///
/// # Examples
/// ```
/// use contracts::SourceId;
///
/// let id = SourceId::from(42);
/// assert_eq!(id.get(), 42);
/// assert_eq!(id.to_string(), "42");
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SourceId(i64);

impl SourceId {
    /// Create a new SourceId
    #[inline]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw integer value
    #[inline]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for SourceId {
    #[inline]
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<i32> for SourceId {
    #[inline]
    fn from(id: i32) -> Self {
        Self(i64::from(id))
    }
}

impl From<SourceId> for i64 {
    #[inline]
    fn from(id: SourceId) -> Self {
        id.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_ordering_follows_integer() {
        let mut map: BTreeMap<SourceId, &str> = BTreeMap::new();
        map.insert(SourceId::new(7), "b");
        map.insert(SourceId::new(-1), "a");
        map.insert(SourceId::new(100), "c");

        let order: Vec<i64> = map.keys().map(|id| id.get()).collect();
        assert_eq!(order, vec![-1, 7, 100]);
    }

    #[test]
    fn test_serde_transparent() {
        let id = SourceId::new(3);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "3");

        let parsed: SourceId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
