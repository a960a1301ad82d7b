//! Identifiers and simple allocators for coordinator entities.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// String key naming a clip in the clip table (e.g. "animation3").
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipKey(pub String);

impl ClipKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClipKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClipKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Borrow<str> for ClipKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Scene entity handle handed to the renderer host.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Correlates an asynchronous host request (asset load, hit-test source) with its completion.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u32);

/// Host-side hit-test source handle, valid for one AR session.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct HitTestSourceId(pub u32);

/// Monotonic allocator for EntityId and RequestId.
/// Request ids are never reused so late completions cannot alias a newer request.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_entity: u32,
    next_request: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_entity(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity = self.next_entity.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_request(&mut self) -> RequestId {
        let id = RequestId(self.next_request);
        self.next_request = self.next_request.wrapping_add(1);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_monotonic() {
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.alloc_entity(), EntityId(0));
        assert_eq!(alloc.alloc_entity(), EntityId(1));
        assert_eq!(alloc.alloc_request(), RequestId(0));
        assert_eq!(alloc.alloc_request(), RequestId(1));
    }

    #[test]
    fn clip_key_serializes_as_plain_string() {
        let key = ClipKey::from("animation3");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"animation3\"");
        assert_eq!(key.to_string(), "animation3");
    }
}
