//! Clip library: lazily loaded, immutable clips cached by key.

use std::sync::Arc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::ids::{ClipKey, RequestId};

/// Opaque reference into a host-loaded asset (asset handle + clip index within it).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceHandle {
    pub asset: u32,
    pub clip_index: u32,
}

/// One animation track group as reported by the asset loader.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClipInfo {
    #[serde(default)]
    pub name: String,
    /// Seconds.
    pub duration: f32,
}

/// Payload of a successful asset load: `{ model, clips[] }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoadedAsset {
    /// Host handle for the loaded scene graph.
    pub model: u32,
    #[serde(default)]
    pub clips: Vec<ClipInfo>,
}

/// A loaded clip. Immutable once built; shared by reference across play requests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    pub key: ClipKey,
    pub source: SourceHandle,
    /// Seconds.
    pub duration: f32,
}

impl AnimationClip {
    /// Build a clip from the first animation in a loaded asset.
    pub fn from_asset(key: ClipKey, path: &str, asset: &LoadedAsset) -> Result<Self, LoadError> {
        let info = asset
            .clips
            .first()
            .ok_or_else(|| LoadError::new(path, "asset contains no animation clips"))?;
        if !info.duration.is_finite() || info.duration < 0.0 {
            return Err(LoadError::new(
                path,
                format!("clip '{}' has invalid duration {}", info.name, info.duration),
            ));
        }
        Ok(Self {
            key,
            source: SourceHandle {
                asset: asset.model,
                clip_index: 0,
            },
            duration: info.duration,
        })
    }
}

/// Per-key load state.
#[derive(Clone, Debug)]
enum Slot {
    Loading { request: RequestId },
    Ready(Arc<AnimationClip>),
    Failed(LoadError),
}

/// Result of a non-blocking library lookup.
#[derive(Clone, Debug, PartialEq)]
pub enum ClipStatus {
    /// A load is in flight (or the key has not been requested yet).
    Loading,
    Ready(Arc<AnimationClip>),
    Failed(LoadError),
}

/// Mapping from clip key to load state, filled in as background loads complete.
#[derive(Debug, Default)]
pub struct ClipLibrary {
    slots: HashMap<ClipKey, Slot>,
}

impl ClipLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a load for `key` was issued under `request`.
    /// A key that already resolved keeps its result; loads are fired once per key.
    pub fn begin_load(&mut self, key: ClipKey, request: RequestId) -> bool {
        if self.slots.contains_key(&key) {
            return false;
        }
        self.slots.insert(key, Slot::Loading { request });
        true
    }

    /// Settle the load issued under `request`. Returns the key it belonged to,
    /// or `None` when the request is unknown or already settled.
    pub fn complete(
        &mut self,
        request: RequestId,
        result: Result<AnimationClip, LoadError>,
    ) -> Option<ClipKey> {
        let key = self.slots.iter().find_map(|(k, slot)| match slot {
            Slot::Loading { request: r } if *r == request => Some(k.clone()),
            _ => None,
        })?;
        let slot = match result {
            Ok(clip) => Slot::Ready(Arc::new(clip)),
            Err(err) => Slot::Failed(err),
        };
        self.slots.insert(key.clone(), slot);
        Some(key)
    }

    /// Non-blocking lookup. Never suspends; a pending or unknown key reports `Loading`.
    pub fn request(&self, key: &str) -> ClipStatus {
        match self.slots.get(key) {
            Some(Slot::Ready(clip)) => ClipStatus::Ready(Arc::clone(clip)),
            Some(Slot::Failed(err)) => ClipStatus::Failed(err.clone()),
            Some(Slot::Loading { .. }) | None => ClipStatus::Loading,
        }
    }

    /// The clip for `key` if it is ready.
    pub fn get(&self, key: &str) -> Option<Arc<AnimationClip>> {
        match self.slots.get(key) {
            Some(Slot::Ready(clip)) => Some(Arc::clone(clip)),
            _ => None,
        }
    }

    pub fn ready_keys(&self) -> Vec<ClipKey> {
        let mut keys: Vec<ClipKey> = self
            .slots
            .iter()
            .filter(|(_, s)| matches!(s, Slot::Ready(_)))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }
}
