use bevy::prelude::*;
use arstage_core::{ClipKey, EntityId, EntityKind, SourceHandle};

/// Links a Bevy entity to the coordinator entity it mirrors.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArStageEntity {
    pub id: EntityId,
    pub kind: EntityKind,
}

/// Clip driven on a mirrored model entity. The app's animation layer reads
/// `source` and `elapsed` to pose the model.
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct ClipPlayer {
    pub active: Option<PlayingClip>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayingClip {
    pub key: ClipKey,
    pub source: SourceHandle,
    /// Seconds since the clip started; looping is left to the animation layer.
    pub elapsed: f32,
}
