//! Output contracts from the coordinator.
//!
//! Outputs carry the commands the host must apply (scene, mixer, session, UI)
//! in emission order, and a separate list of semantic events.
//! Adapters (Bevy/WASM) apply commands to the host and forward events.

use serde::{Deserialize, Serialize};

use crate::camera::OrbitState;
use crate::clip::SourceHandle;
use crate::error::{LoadError, SessionError};
use crate::ids::{ClipKey, EntityId, HitTestSourceId, RequestId};
use crate::mode::{ModelSlot, SessionMode};
use crate::placement::PlacementState;
use crate::pose::Pose;

/// What a scene entity represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Model { slot: ModelSlot },
    Reticle,
    ScanIndicator,
}

/// UI surface shown for a mode: clip buttons in normal view, reticle overlay in AR.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    NormalView,
    Ar,
}

/// Features requested for an immersive AR session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFeatures {
    pub required: Vec<String>,
    pub optional: Vec<String>,
}

/// One instruction for the host, applied in order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum HostCommand {
    AddEntity {
        entity: EntityId,
        kind: EntityKind,
    },
    SetEntityVisible {
        entity: EntityId,
        visible: bool,
    },
    SetEntityTransform {
        entity: EntityId,
        pose: Pose,
    },
    /// Uniform scale of the entity (1.0 = authored size).
    SetEntityScale {
        entity: EntityId,
        scale: f32,
    },
    /// Fetch an asset; completion comes back through `on_load_complete(request, ..)`.
    LoadAsset {
        request: RequestId,
        path: String,
    },
    /// Bind a loaded scene graph to a model entity.
    AttachModel {
        entity: EntityId,
        model: u32,
    },
    /// Stop every clip action on the entity's mixer.
    StopAllClips {
        entity: EntityId,
    },
    /// Start a clip from time zero.
    StartClip {
        entity: EntityId,
        key: ClipKey,
        source: SourceHandle,
    },
    /// Advance the entity's mixer by the frame's wall-clock delta (seconds).
    AdvanceMixer {
        entity: EntityId,
        dt: f32,
    },
    SetCamera {
        orbit: OrbitState,
    },
    RequestSession {
        features: SessionFeatures,
    },
    RequestHitTestSource {
        request: RequestId,
    },
    CancelHitTestSource {
        source: HitTestSourceId,
    },
    EndSession,
    ShowSurface {
        surface: Surface,
    },
    SetLoadingIndicator {
        visible: bool,
    },
    /// Human-readable status line.
    Status {
        message: String,
    },
    /// Blocking notice (permission problems).
    Notice {
        message: String,
    },
    Render {
        mode: SessionMode,
    },
}

/// Discrete semantic signals emitted by the coordinator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum ViewerEvent {
    ModelLoaded {
        slot: ModelSlot,
    },
    ModelLoadFailed {
        slot: ModelSlot,
        error: LoadError,
    },
    ClipLoaded {
        slot: ModelSlot,
        key: ClipKey,
    },
    ClipLoadFailed {
        slot: ModelSlot,
        key: ClipKey,
        error: LoadError,
    },
    ClipStarted {
        slot: ModelSlot,
        key: ClipKey,
    },
    ClipPending {
        slot: ModelSlot,
        key: ClipKey,
        attempt: u32,
    },
    ClipUnavailable {
        slot: ModelSlot,
        key: ClipKey,
        reason: String,
    },
    ClipRetriesExhausted {
        slot: ModelSlot,
        key: ClipKey,
        attempts: u32,
    },
    /// A load or hit-test completion arrived for state that no longer exists.
    StaleCompletionDiscarded {
        request: RequestId,
    },
    PlacementChanged {
        from: PlacementState,
        to: PlacementState,
    },
    Placed {
        anchor: Pose,
    },
    ModeChanged {
        mode: SessionMode,
    },
    SessionFailed {
        error: SessionError,
    },
    PermissionDenied {
        capability: String,
    },
}

/// Outputs drained by the host each frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Outputs {
    #[serde(default)]
    pub commands: Vec<HostCommand>,
    #[serde(default)]
    pub events: Vec<ViewerEvent>,
}

impl Outputs {
    #[inline]
    pub fn clear(&mut self) {
        self.commands.clear();
        self.events.clear();
    }

    #[inline]
    pub fn push_command(&mut self, command: HostCommand) {
        self.commands.push(command);
    }

    #[inline]
    pub fn push_event(&mut self, event: ViewerEvent) {
        self.events.push(event);
    }

    #[inline]
    pub fn status(&mut self, message: impl Into<String>) {
        self.commands.push(HostCommand::Status {
            message: message.into(),
        });
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.events.is_empty()
    }

    /// Latest status line in this batch, if any.
    pub fn last_status(&self) -> Option<&str> {
        self.commands.iter().rev().find_map(|c| match c {
            HostCommand::Status { message } => Some(message.as_str()),
            _ => None,
        })
    }
}
