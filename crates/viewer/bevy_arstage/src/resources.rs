use bevy::prelude::*;
use hashbrown::HashMap;

use arstage_core::{EntityId, FrameInput, HostCommand, OrbitState};

/// Coordinator entity id -> spawned Bevy entity.
#[derive(Resource, Default)]
pub struct EntityIndex {
    pub map: HashMap<EntityId, Entity>,
}

/// Pose samples for the next frame. Written by the XR/sensor layer, consumed once per update.
#[derive(Resource, Default)]
pub struct FrameSamples(pub FrameInput);

/// Commands the plugin does not apply itself: asset loads, model attachment and
/// session control. Each follows a discrete input or load, never a frame tick.
/// The app's loader/XR layer drains this queue.
#[derive(Resource, Default)]
pub struct HostRequests {
    pub commands: Vec<HostCommand>,
}

impl HostRequests {
    pub fn drain(&mut self) -> Vec<HostCommand> {
        std::mem::take(&mut self.commands)
    }
}

/// Latest status line and blocking notice.
#[derive(Resource, Default, Debug, Clone, PartialEq)]
pub struct StatusLine {
    pub message: Option<String>,
    pub notice: Option<String>,
    pub loading: bool,
}

/// Current orbit camera parameters in normal view.
#[derive(Resource, Default, Debug, Clone, Copy)]
pub struct CameraOrbit(pub Option<OrbitState>);

/// Scene writes staged between the compute and apply systems.
#[derive(Resource, Default)]
pub struct SceneCommands(pub Vec<HostCommand>);
