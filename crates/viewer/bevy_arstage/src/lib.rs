use bevy::prelude::*;

use arstage_core::{Config, Coordinator, ViewerEvent};

pub mod components;
pub mod resources;
pub mod systems;

pub use components::{ArStageEntity, ClipPlayer, PlayingClip};
pub use resources::{
    CameraOrbit, EntityIndex, FrameSamples, HostRequests, SceneCommands, StatusLine,
};

#[derive(Resource)]
pub struct ArStageCore(pub Coordinator);

/// Select a clip on the active model.
#[derive(Event, Debug, Clone)]
pub struct PlayClip(pub String);

/// Anchor the AR model at the reticle.
#[derive(Event, Debug, Clone, Copy)]
pub struct PlaceModel;

/// Single-finger drag in pixels.
#[derive(Event, Debug, Clone, Copy)]
pub struct DragInput {
    pub dx: f32,
    pub dy: f32,
}

/// Pinch zoom factor (`> 1` moves closer).
#[derive(Event, Debug, Clone, Copy)]
pub struct ZoomInput(pub f32);

/// Coordinator events re-published into the ECS.
#[derive(Event, Debug, Clone)]
pub struct ArStageEvent(pub ViewerEvent);

/// System sets in execution order.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArStageSet {
    Input,
    Compute,
    Apply,
}

#[derive(Default)]
pub struct ArStagePlugin {
    pub config: Config,
}

impl Plugin for ArStagePlugin {
    fn build(&self, app: &mut App) {
        let mut core = match Coordinator::new(self.config.clone()) {
            Ok(core) => core,
            Err(err) => {
                log::error!("invalid arstage config ({err}); falling back to defaults");
                match Coordinator::new(Config::default()) {
                    Ok(core) => core,
                    Err(_) => return,
                }
            }
        };
        core.start();

        app.insert_resource(ArStageCore(core))
            .init_resource::<EntityIndex>()
            .init_resource::<FrameSamples>()
            .init_resource::<HostRequests>()
            .init_resource::<StatusLine>()
            .init_resource::<CameraOrbit>()
            .init_resource::<SceneCommands>()
            .add_event::<PlayClip>()
            .add_event::<PlaceModel>()
            .add_event::<DragInput>()
            .add_event::<ZoomInput>()
            .add_event::<ArStageEvent>()
            .configure_sets(
                Update,
                (ArStageSet::Input, ArStageSet::Compute, ArStageSet::Apply).chain(),
            )
            .add_systems(Update, systems::input_system.in_set(ArStageSet::Input))
            .add_systems(Update, systems::update_core_system.in_set(ArStageSet::Compute))
            .add_systems(Update, systems::apply_commands_system.in_set(ArStageSet::Apply));
    }
}
