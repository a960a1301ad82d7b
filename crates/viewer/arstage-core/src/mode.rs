//! Mode multiplexer: exactly one of {normal view, immersive AR} is active, each
//! with its own model, clip library and playback controller.

use serde::{Deserialize, Serialize};

use crate::camera::OrbitState;
use crate::clip::ClipLibrary;
use crate::config::Config;
use crate::ids::EntityId;
use crate::placement::{PlacementCoordinator, PlacementEntities};
use crate::playback::PlaybackController;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[default]
    NormalView,
    ImmersiveAr,
}

/// Which model instance a library/controller belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSlot {
    Normal,
    Ar,
}

/// A model entity with its own clip library and mixer driver.
#[derive(Debug)]
pub struct ModelInstance {
    pub slot: ModelSlot,
    pub entity: EntityId,
    pub library: ClipLibrary,
    pub playback: PlaybackController,
    pub model_loaded: bool,
}

impl ModelInstance {
    pub fn new(slot: ModelSlot, entity: EntityId, cfg: &Config) -> Self {
        Self {
            slot,
            entity,
            library: ClipLibrary::new(),
            playback: PlaybackController::new(entity, slot, cfg.retry, cfg.loop_clips),
            model_loaded: false,
        }
    }
}

/// State owned by one AR session. Dropped wholesale when the session ends.
#[derive(Debug)]
pub struct ArInstance {
    /// Distinguishes this session's async completions from earlier sessions'.
    pub generation: u64,
    pub model: ModelInstance,
    pub placement: PlacementCoordinator,
}

impl ArInstance {
    pub fn new(generation: u64, entities: PlacementEntities, cfg: &Config) -> Self {
        Self {
            generation,
            model: ModelInstance::new(ModelSlot::Ar, entities.model, cfg),
            placement: PlacementCoordinator::new(entities, cfg.drag_sensitivity),
        }
    }
}

/// Owns both modes' state. The active mode is derived from whether an AR
/// instance exists, so the two can never be active together.
#[derive(Debug)]
pub struct ModeMultiplexer {
    pub normal: ModelInstance,
    pub orbit: OrbitState,
    ar: Option<ArInstance>,
    last_generation: u64,
}

impl ModeMultiplexer {
    pub fn new(normal: ModelInstance, orbit: OrbitState) -> Self {
        Self {
            normal,
            orbit,
            ar: None,
            last_generation: 0,
        }
    }

    pub fn mode(&self) -> SessionMode {
        if self.ar.is_some() {
            SessionMode::ImmersiveAr
        } else {
            SessionMode::NormalView
        }
    }

    /// Next AR generation number.
    pub fn next_generation(&mut self) -> u64 {
        self.last_generation += 1;
        self.last_generation
    }

    /// Switch to AR. Returns `false` (and keeps the current session) if already in AR.
    pub fn enter_ar(&mut self, instance: ArInstance) -> bool {
        if self.ar.is_some() {
            return false;
        }
        self.ar = Some(instance);
        true
    }

    /// Switch back to normal view, handing back the torn-down AR state.
    pub fn exit_ar(&mut self) -> Option<ArInstance> {
        self.ar.take()
    }

    pub fn ar(&self) -> Option<&ArInstance> {
        self.ar.as_ref()
    }

    pub fn ar_mut(&mut self) -> Option<&mut ArInstance> {
        self.ar.as_mut()
    }

    /// The AR instance if it belongs to `generation`.
    pub fn ar_for(&mut self, generation: u64) -> Option<&mut ArInstance> {
        self.ar.as_mut().filter(|ar| ar.generation == generation)
    }

    /// The model instance driven by the active render loop.
    pub fn active_model_mut(&mut self) -> &mut ModelInstance {
        match &mut self.ar {
            Some(ar) => &mut ar.model,
            None => &mut self.normal,
        }
    }
}
