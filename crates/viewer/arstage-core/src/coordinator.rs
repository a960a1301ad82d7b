//! Coordinator: the single owner of viewer state.
//!
//! Hosts call the discrete operations (`play`, `place`, session callbacks, load
//! completions) as events arrive and `update` once per rendered frame. Every
//! operation appends host commands to a buffer that `update` (or `take_outputs`)
//! drains, so no collaborator is ever called from inside the core.

use hashbrown::HashMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::camera::OrbitState;
use crate::clip::{AnimationClip, LoadedAsset};
use crate::config::{Capabilities, Config};
use crate::error::{LoadError, PermissionError, SessionError, ViewerError};
use crate::ids::{ClipKey, EntityId, HitTestSourceId, IdAllocator, RequestId};
use crate::mode::{ArInstance, ModeMultiplexer, ModelInstance, ModelSlot, SessionMode};
use crate::outputs::{EntityKind, HostCommand, Outputs, SessionFeatures, Surface, ViewerEvent};
use crate::placement::{PlaceOutcome, PlacementEntities, PlacementState};
use crate::playback::{PendingPlay, PlayOutcome};
use crate::pose::{first_hit, Orientation, Pose};
use crate::status;

/// Per-frame samples delivered by the host alongside `dt`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameInput {
    /// Hit-test results for this frame, in host order. The first one wins.
    #[serde(default)]
    pub hit_results: Vec<Pose>,
    /// Latest device-orientation sample, if any arrived this frame.
    #[serde(default)]
    pub orientation: Option<Orientation>,
}

#[derive(Clone, Debug)]
enum RequestTarget {
    Model,
    Clip(ClipKey),
    HitTestSource,
}

/// Outstanding async request. `generation` is `None` for the normal-view
/// instance and the AR session generation otherwise.
#[derive(Clone, Debug)]
struct RequestRecord {
    generation: Option<u64>,
    target: RequestTarget,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub model_loaded: bool,
    pub active_clip: Option<ClipKey>,
    pub clip_time: Option<f32>,
    pub pending: Option<PendingPlay>,
    pub ready_clips: Vec<ClipKey>,
}

impl PlaybackSnapshot {
    fn of(instance: &ModelInstance) -> Self {
        Self {
            model_loaded: instance.model_loaded,
            active_clip: instance.playback.active_key().cloned(),
            clip_time: instance.playback.active_time(),
            pending: instance.playback.pending().cloned(),
            ready_clips: instance.library.ready_keys(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArSnapshot {
    pub generation: u64,
    pub playback: PlaybackSnapshot,
    pub placement: PlacementState,
    pub anchor: Option<Pose>,
    pub scale: f32,
    pub reticle: Option<Pose>,
    pub has_hit_test_source: bool,
}

/// Serializable view of the whole coordinator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewerSnapshot {
    pub mode: SessionMode,
    pub normal: PlaybackSnapshot,
    pub orbit: OrbitState,
    pub ar: Option<ArSnapshot>,
    pub session_requested: bool,
}

#[derive(Debug)]
pub struct Coordinator {
    cfg: Config,
    ids: IdAllocator,
    mux: ModeMultiplexer,
    ar_entities: PlacementEntities,
    requests: HashMap<RequestId, RequestRecord>,
    session_requested: bool,
    started: bool,
    outputs: Outputs,
}

impl Coordinator {
    /// Create a coordinator. Nothing is emitted until `start`.
    pub fn new(cfg: Config) -> Result<Self, ViewerError> {
        cfg.validate()?;
        let mut ids = IdAllocator::new();
        let normal_entity = ids.alloc_entity();
        let ar_entities = PlacementEntities {
            model: ids.alloc_entity(),
            reticle: ids.alloc_entity(),
            scan_indicator: ids.alloc_entity(),
        };
        let mux = ModeMultiplexer::new(
            ModelInstance::new(ModelSlot::Normal, normal_entity, &cfg),
            OrbitState::new(&cfg.orbit),
        );
        Ok(Self {
            cfg,
            ids,
            mux,
            ar_entities,
            requests: HashMap::new(),
            session_requested: false,
            started: false,
            outputs: Outputs::default(),
        })
    }

    /// Create the scene entities and pre-fetch the model and every clip for the normal view.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;

        let normal = self.mux.normal.entity;
        let ar = self.ar_entities;
        let entities = [
            (normal, EntityKind::Model { slot: ModelSlot::Normal }),
            (ar.model, EntityKind::Model { slot: ModelSlot::Ar }),
            (ar.reticle, EntityKind::Reticle),
            (ar.scan_indicator, EntityKind::ScanIndicator),
        ];
        for (entity, kind) in entities {
            self.outputs
                .push_command(HostCommand::AddEntity { entity, kind });
            self.outputs.push_command(HostCommand::SetEntityVisible {
                entity,
                visible: false,
            });
        }
        self.outputs.push_command(HostCommand::ShowSurface {
            surface: Surface::NormalView,
        });
        self.outputs.push_command(HostCommand::SetCamera {
            orbit: self.mux.orbit,
        });
        self.outputs
            .push_command(HostCommand::SetLoadingIndicator { visible: true });
        self.outputs.status(status::MODEL_LOADING);
        self.prefetch(None);
    }

    /// Fire one load per asset for the instance identified by `generation`.
    fn prefetch(&mut self, generation: Option<u64>) {
        let model_request = self.ids.alloc_request();
        self.requests.insert(
            model_request,
            RequestRecord {
                generation,
                target: RequestTarget::Model,
            },
        );
        self.outputs.push_command(HostCommand::LoadAsset {
            request: model_request,
            path: self.cfg.model_path.clone(),
        });

        for spec in &self.cfg.clips {
            let instance = match generation {
                None => &mut self.mux.normal,
                Some(g) => match self.mux.ar_for(g) {
                    Some(ar) => &mut ar.model,
                    None => return,
                },
            };
            let request = self.ids.alloc_request();
            if !instance.library.begin_load(spec.key.clone(), request) {
                continue;
            }
            self.requests.insert(
                request,
                RequestRecord {
                    generation,
                    target: RequestTarget::Clip(spec.key.clone()),
                },
            );
            self.outputs.push_command(HostCommand::LoadAsset {
                request,
                path: spec.path.clone(),
            });
        }
    }

    /// Loading progress for an outstanding asset request, `0.0..=1.0`.
    /// Only the active mode's model load, or the clip a pending `play` waits
    /// on, reaches the status line.
    pub fn on_load_progress(&mut self, request: RequestId, fraction: f32) {
        let Some(record) = self.requests.get(&request) else {
            return;
        };
        let instance = match self.mux.ar() {
            Some(ar) if record.generation == Some(ar.generation) => &ar.model,
            None if record.generation.is_none() => &self.mux.normal,
            _ => return,
        };
        let message = match &record.target {
            RequestTarget::Model if !instance.model_loaded => status::load_progress(fraction),
            RequestTarget::Clip(key)
                if instance.playback.pending().is_some_and(|p| &p.key == key) =>
            {
                let label = self
                    .cfg
                    .clip_spec(key.as_str())
                    .map_or(key.as_str(), |s| s.label.as_str());
                status::clip_progress(label, fraction)
            }
            _ => None,
        };
        if let Some(message) = message {
            self.outputs.status(message);
        }
    }

    /// Settle an asset load. Completions for a torn-down AR session are discarded.
    pub fn on_load_complete(&mut self, request: RequestId, result: Result<LoadedAsset, LoadError>) {
        let Some(record) = self.requests.remove(&request) else {
            warn!("load completion for unknown request {:?}", request);
            return;
        };
        let mode = self.mux.mode();
        let instance = match record.generation {
            None => &mut self.mux.normal,
            Some(g) => match self.mux.ar_for(g) {
                Some(ar) => &mut ar.model,
                None => {
                    debug!("discarding load {:?} from ended AR session {}", request, g);
                    self.outputs
                        .push_event(ViewerEvent::StaleCompletionDiscarded { request });
                    return;
                }
            },
        };
        let generation = record.generation;
        let slot = instance.slot;
        let active = matches!(
            (slot, mode),
            (ModelSlot::Normal, SessionMode::NormalView) | (ModelSlot::Ar, SessionMode::ImmersiveAr)
        );

        match record.target {
            RequestTarget::Model => match result {
                Ok(asset) => {
                    instance.model_loaded = true;
                    self.outputs.push_command(HostCommand::AttachModel {
                        entity: instance.entity,
                        model: asset.model,
                    });
                    self.outputs.push_event(ViewerEvent::ModelLoaded { slot });
                    // The AR model stays hidden until placed.
                    if slot == ModelSlot::Normal && active {
                        self.outputs.push_command(HostCommand::SetEntityVisible {
                            entity: instance.entity,
                            visible: true,
                        });
                        self.outputs
                            .push_command(HostCommand::SetLoadingIndicator { visible: false });
                        self.outputs.status(status::MODEL_READY);
                    }
                }
                Err(err) => {
                    warn!("[{:?}] model load failed: {}", slot, err);
                    self.outputs
                        .push_event(ViewerEvent::ModelLoadFailed { slot, error: err });
                    if active {
                        self.outputs
                            .push_command(HostCommand::SetLoadingIndicator { visible: false });
                        self.outputs.status(status::LOAD_FAILED);
                    }
                }
            },
            RequestTarget::Clip(key) => {
                let path = self
                    .cfg
                    .clip_spec(key.as_str())
                    .map(|s| s.path.as_str())
                    .unwrap_or_default();
                let clip =
                    result.and_then(|asset| AnimationClip::from_asset(key.clone(), path, &asset));
                let failure = clip.as_ref().err().cloned();
                instance.library.complete(request, clip);
                match failure {
                    None => {
                        debug!("[{:?}] clip '{}' ready", slot, key);
                        self.outputs
                            .push_event(ViewerEvent::ClipLoaded { slot, key });
                    }
                    Some(err) => {
                        warn!("[{:?}] clip '{}' failed to load: {}", slot, key, err);
                        self.outputs.push_event(ViewerEvent::ClipLoadFailed {
                            slot,
                            key,
                            error: err,
                        });
                    }
                }
            }
            RequestTarget::HitTestSource => {
                warn!("asset completion delivered for hit-test request {:?}", request);
            }
        }
        self.autoplay(generation);
    }

    /// Start `initial_clip` on an instance once its model and that clip are
    /// both ready, unless a clip was already requested there.
    fn autoplay(&mut self, generation: Option<u64>) {
        let Some(key) = self.cfg.initial_clip.clone() else {
            return;
        };
        let instance = match generation {
            None => &mut self.mux.normal,
            Some(g) => match self.mux.ar_for(g) {
                Some(ar) => &mut ar.model,
                None => return,
            },
        };
        if !instance.model_loaded
            || !instance.playback.is_idle()
            || instance.library.get(key.as_str()).is_none()
        {
            return;
        }
        debug!("[{:?}] autoplaying '{}'", instance.slot, key);
        instance
            .playback
            .play(&key, &instance.library, &mut self.outputs);
    }

    /// Switch the active mode's model to clip `key`.
    pub fn play(&mut self, key: &str) -> PlayOutcome {
        let key = ClipKey::from(key);
        if self.cfg.clip_spec(key.as_str()).is_none() {
            warn!("play requested for unknown clip '{}'", key);
            return PlayOutcome::Unknown { key };
        }
        let instance = self.mux.active_model_mut();
        let outcome = instance
            .playback
            .play(&key, &instance.library, &mut self.outputs);
        self.report_play(&outcome);
        outcome
    }

    /// Status line and loading indicator for a play outcome.
    fn report_play(&mut self, outcome: &PlayOutcome) {
        let label = self
            .cfg
            .clip_spec(outcome.key().as_str())
            .map(|s| s.label.clone())
            .unwrap_or_else(|| outcome.key().to_string());
        match outcome {
            PlayOutcome::Started { .. } => {
                self.outputs
                    .push_command(HostCommand::SetLoadingIndicator { visible: false });
                self.outputs.status(status::clip_ready(&label));
            }
            PlayOutcome::Pending { attempt: 1, .. } => {
                self.outputs
                    .push_command(HostCommand::SetLoadingIndicator { visible: true });
                self.outputs.status(status::clip_loading(&label));
            }
            PlayOutcome::Pending { .. } | PlayOutcome::Unknown { .. } => {}
            PlayOutcome::Unavailable { .. } => {
                self.outputs
                    .push_command(HostCommand::SetLoadingIndicator { visible: false });
                self.outputs.status(status::LOAD_FAILED);
            }
            PlayOutcome::RetriesExhausted { .. } => {
                self.outputs
                    .push_command(HostCommand::SetLoadingIndicator { visible: false });
                self.outputs.status(status::clip_timed_out(&label));
            }
        }
    }

    /// Anchor the AR model at the reticle.
    pub fn place(&mut self) -> PlaceOutcome {
        let Some(ar) = self.mux.ar_mut() else {
            return PlaceOutcome::NotInAr;
        };
        let outcome = ar.placement.place(&mut self.outputs);
        if matches!(outcome, PlaceOutcome::Placed { .. }) {
            self.outputs.status(status::PLACED);
        }
        outcome
    }

    /// Single-finger drag in pixels. Orbits in normal view, slides the placed model in AR.
    pub fn drag(&mut self, dx: f32, dy: f32) {
        if let Some(ar) = self.mux.ar_mut() {
            ar.placement.drag(dx, dy, &mut self.outputs);
            return;
        }
        if !(dx.is_finite() && dy.is_finite()) {
            return;
        }
        self.mux.orbit.rotate(dx, dy, &self.cfg.orbit);
        self.outputs.push_command(HostCommand::SetCamera {
            orbit: self.mux.orbit,
        });
    }

    /// Pinch. Normal view: orbit zoom, `factor > 1` moves closer.
    /// AR: scales the placed model, `factor > 1` grows it.
    pub fn zoom(&mut self, factor: f32) {
        if let Some(ar) = self.mux.ar_mut() {
            ar.placement
                .scale_by(factor, &self.cfg.ar_scale, &mut self.outputs);
            return;
        }
        self.mux.orbit.zoom(factor, &self.cfg.orbit);
        self.outputs.push_command(HostCommand::SetCamera {
            orbit: self.mux.orbit,
        });
    }

    /// Ask the host for an immersive AR session.
    pub fn request_ar_session(&mut self) -> Result<(), SessionError> {
        let caps = self.cfg.capabilities;
        if !caps.has_ar || !caps.can_track() {
            let err = SessionError::Unsupported;
            self.report_session_error(&err);
            return Err(err);
        }
        if self.mux.mode() == SessionMode::ImmersiveAr || self.session_requested {
            return Ok(());
        }
        self.session_requested = true;
        self.outputs.push_command(HostCommand::RequestSession {
            features: session_features(&caps),
        });
        Ok(())
    }

    /// Ask the host to end the running AR session; `on_session_ended` follows.
    pub fn end_ar_session(&mut self) {
        if self.mux.mode() == SessionMode::ImmersiveAr {
            self.outputs.push_command(HostCommand::EndSession);
        }
    }

    /// The host started an AR session: switch to AR with a fresh model, library and placement.
    pub fn on_session_started(&mut self) {
        self.session_requested = false;
        if self.mux.mode() == SessionMode::ImmersiveAr {
            warn!("session start signalled while already in AR; ignoring");
            return;
        }
        let generation = self.mux.next_generation();
        let mut ar = ArInstance::new(generation, self.ar_entities, &self.cfg);
        debug!("entering AR (generation {})", generation);

        self.outputs.push_command(HostCommand::SetEntityVisible {
            entity: self.mux.normal.entity,
            visible: false,
        });
        self.outputs
            .push_command(HostCommand::SetLoadingIndicator { visible: false });
        ar.placement.begin(&mut self.outputs);
        if self.cfg.capabilities.has_hit_test {
            let request = self.ids.alloc_request();
            self.requests.insert(
                request,
                RequestRecord {
                    generation: Some(generation),
                    target: RequestTarget::HitTestSource,
                },
            );
            ar.placement.source_requested(request);
            self.outputs
                .push_command(HostCommand::RequestHitTestSource { request });
        }
        self.mux.enter_ar(ar);
        self.outputs.push_command(HostCommand::ShowSurface {
            surface: Surface::Ar,
        });
        self.prefetch(Some(generation));
        self.outputs.status(status::AR_ON);
        self.outputs.push_event(ViewerEvent::ModeChanged {
            mode: SessionMode::ImmersiveAr,
        });
    }

    /// The host reports the session ended (user exit or system). Tears down all AR state.
    pub fn on_session_ended(&mut self) {
        self.session_requested = false;
        let Some(mut ar) = self.mux.exit_ar() else {
            debug!("session end signalled outside AR; ignoring");
            return;
        };
        debug!("leaving AR (generation {})", ar.generation);
        ar.placement.reset(&mut self.outputs);
        ar.model.playback.cancel_pending();
        self.outputs.push_command(HostCommand::StopAllClips {
            entity: ar.model.entity,
        });
        drop(ar);

        if self.mux.normal.model_loaded {
            self.outputs.push_command(HostCommand::SetEntityVisible {
                entity: self.mux.normal.entity,
                visible: true,
            });
        }
        self.outputs.push_command(HostCommand::ShowSurface {
            surface: Surface::NormalView,
        });
        self.outputs.push_command(HostCommand::SetCamera {
            orbit: self.mux.orbit,
        });
        self.outputs.status(status::AR_OFF);
        self.outputs.push_event(ViewerEvent::ModeChanged {
            mode: SessionMode::NormalView,
        });
    }

    /// Session negotiation failed; stay in normal view.
    pub fn on_session_failed(&mut self, err: SessionError) {
        self.session_requested = false;
        self.report_session_error(&err);
    }

    /// Camera/AR permission refused: blocking notice, no session.
    pub fn on_permission_denied(&mut self, err: PermissionError) {
        self.session_requested = false;
        warn!("{}", err);
        self.outputs.push_command(HostCommand::Notice {
            message: status::permission_denied(&err),
        });
        self.outputs.push_event(ViewerEvent::PermissionDenied {
            capability: err.capability,
        });
    }

    fn report_session_error(&mut self, err: &SessionError) {
        warn!("{}", err);
        self.outputs.status(status::session_failed(err));
        self.outputs
            .push_event(ViewerEvent::SessionFailed { error: err.clone() });
    }

    /// Completion of a hit-test source request. Sources for ended sessions are cancelled.
    pub fn on_hit_test_source(
        &mut self,
        request: RequestId,
        result: Result<HitTestSourceId, SessionError>,
    ) {
        let record = match self.requests.remove(&request) {
            Some(record @ RequestRecord {
                target: RequestTarget::HitTestSource,
                ..
            }) => record,
            Some(other) => {
                warn!("hit-test completion delivered for asset request {:?}", request);
                self.requests.insert(request, other);
                return;
            }
            None => {
                warn!("hit-test completion for unknown request {:?}", request);
                if let Ok(source) = result {
                    self.outputs
                        .push_command(HostCommand::CancelHitTestSource { source });
                }
                return;
            }
        };
        let has_orientation = self.cfg.capabilities.has_orientation;
        let ar = match record.generation.and_then(|g| self.mux.ar_for(g)) {
            Some(ar) => ar,
            None => {
                debug!("discarding hit-test source {:?} from ended session", request);
                self.outputs
                    .push_event(ViewerEvent::StaleCompletionDiscarded { request });
                if let Ok(source) = result {
                    self.outputs
                        .push_command(HostCommand::CancelHitTestSource { source });
                }
                return;
            }
        };
        match result {
            Ok(source) => {
                if ar.placement.source_ready(request, source) {
                    self.outputs.status(status::AR_SCANNING);
                } else {
                    self.outputs
                        .push_command(HostCommand::CancelHitTestSource { source });
                }
            }
            Err(err) => {
                ar.placement.source_failed(request);
                // Orientation tracking still drives the reticle without a source.
                if has_orientation {
                    warn!("hit-test source unavailable, using orientation: {}", err);
                } else {
                    self.report_session_error(&err);
                    self.outputs.push_command(HostCommand::EndSession);
                }
            }
        }
    }

    /// One rendered frame: reticle from this frame's pose sample, due retries,
    /// clip clock advance, then render. Returns every command buffered since the last drain.
    pub fn update(&mut self, dt: f32, frame: FrameInput) -> Outputs {
        let mode = self.mux.mode();

        if let Some(ar) = self.mux.ar_mut() {
            let sample = if ar.placement.has_source() {
                first_hit(&frame.hit_results)
            } else if self.cfg.capabilities.has_orientation {
                frame
                    .orientation
                    .and_then(|o| o.ground_pose(&self.cfg.orientation))
            } else {
                None
            };
            ar.placement.on_frame(sample, &mut self.outputs);
        }

        let instance = self.mux.active_model_mut();
        let retried = instance
            .playback
            .tick(dt, &instance.library, &mut self.outputs);
        if let Some(outcome) = retried {
            self.report_play(&outcome);
        }

        self.outputs.push_command(HostCommand::Render { mode });
        self.take_outputs()
    }

    /// Drain buffered outputs without advancing a frame.
    pub fn take_outputs(&mut self) -> Outputs {
        std::mem::take(&mut self.outputs)
    }

    pub fn snapshot(&self) -> ViewerSnapshot {
        ViewerSnapshot {
            mode: self.mux.mode(),
            normal: PlaybackSnapshot::of(&self.mux.normal),
            orbit: self.mux.orbit,
            ar: self.mux.ar().map(|ar| ArSnapshot {
                generation: ar.generation,
                playback: PlaybackSnapshot::of(&ar.model),
                placement: ar.placement.state(),
                anchor: ar.placement.anchor(),
                scale: ar.placement.scale(),
                reticle: ar.placement.reticle(),
                has_hit_test_source: ar.placement.has_source(),
            }),
            session_requested: self.session_requested,
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mux.mode()
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn normal_model_entity(&self) -> EntityId {
        self.mux.normal.entity
    }

    pub fn ar_entities(&self) -> PlacementEntities {
        self.ar_entities
    }
}

fn session_features(caps: &Capabilities) -> SessionFeatures {
    let mut features = SessionFeatures {
        required: Vec::new(),
        optional: vec!["dom-overlay".to_string(), "local-floor".to_string()],
    };
    if caps.has_hit_test {
        features.required.push("hit-test".to_string());
    }
    features
}
