//! AR placement: reticle tracking, one-shot anchoring, ground-plane drag.
//!
//! State machine: `Unplaced -> Tracking -> Placed -> (session end) -> Unplaced`.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::ArScaleConfig;
use crate::ids::{EntityId, HitTestSourceId, RequestId};
use crate::outputs::{HostCommand, Outputs, ViewerEvent};
use crate::pose::Pose;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementState {
    #[default]
    Unplaced,
    Tracking,
    Placed,
}

/// Result of a placement command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PlaceOutcome {
    Placed { anchor: Pose },
    /// Already anchored; nothing changed.
    AlreadyPlaced,
    /// No visible reticle this frame.
    NoReticle,
    /// Placement only exists in immersive AR.
    NotInAr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SourceState {
    None,
    Requested(RequestId),
    Ready(HitTestSourceId),
}

/// Scene entities the placement drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementEntities {
    pub model: EntityId,
    pub reticle: EntityId,
    pub scan_indicator: EntityId,
}

#[derive(Debug)]
pub struct PlacementCoordinator {
    state: PlacementState,
    /// Visible reticle pose; `None` means hidden.
    reticle: Option<Pose>,
    anchor: Option<Pose>,
    /// Uniform scale of the placed model.
    scale: f32,
    source: SourceState,
    drag_sensitivity: f32,
    entities: PlacementEntities,
}

impl PlacementCoordinator {
    pub fn new(entities: PlacementEntities, drag_sensitivity: f32) -> Self {
        Self {
            state: PlacementState::Unplaced,
            reticle: None,
            anchor: None,
            scale: 1.0,
            source: SourceState::None,
            drag_sensitivity,
            entities,
        }
    }

    fn transition(&mut self, to: PlacementState, out: &mut Outputs) {
        if self.state == to {
            return;
        }
        debug!("placement {:?} -> {:?}", self.state, to);
        out.push_event(ViewerEvent::PlacementChanged {
            from: self.state,
            to,
        });
        self.state = to;
    }

    fn set_visible(&self, entity: EntityId, visible: bool, out: &mut Outputs) {
        out.push_command(HostCommand::SetEntityVisible { entity, visible });
    }

    /// Session start: model and reticle hidden, scanning indicator shown.
    pub fn begin(&mut self, out: &mut Outputs) {
        self.set_visible(self.entities.model, false, out);
        self.set_visible(self.entities.reticle, false, out);
        self.set_visible(self.entities.scan_indicator, true, out);
    }

    /// Feed this frame's pose sample (at most once per frame).
    /// Ignored once placed; otherwise the reticle follows the sample or hides.
    pub fn on_frame(&mut self, sample: Option<Pose>, out: &mut Outputs) {
        if self.state == PlacementState::Placed {
            return;
        }
        match sample {
            Some(pose) => {
                if self.state == PlacementState::Unplaced {
                    self.transition(PlacementState::Tracking, out);
                }
                out.push_command(HostCommand::SetEntityTransform {
                    entity: self.entities.reticle,
                    pose,
                });
                if self.reticle.is_none() {
                    self.set_visible(self.entities.reticle, true, out);
                }
                self.reticle = Some(pose);
            }
            None => {
                if self.reticle.take().is_some() {
                    self.set_visible(self.entities.reticle, false, out);
                }
            }
        }
    }

    /// Anchor the model at the reticle. Accepted once per session.
    pub fn place(&mut self, out: &mut Outputs) -> PlaceOutcome {
        if self.state == PlacementState::Placed {
            return PlaceOutcome::AlreadyPlaced;
        }
        let anchor = match (self.state, self.reticle) {
            (PlacementState::Tracking, Some(pose)) => pose,
            _ => return PlaceOutcome::NoReticle,
        };
        self.anchor = Some(anchor);
        self.reticle = None;
        out.push_command(HostCommand::SetEntityTransform {
            entity: self.entities.model,
            pose: anchor,
        });
        out.push_command(HostCommand::SetEntityScale {
            entity: self.entities.model,
            scale: self.scale,
        });
        self.set_visible(self.entities.model, true, out);
        self.set_visible(self.entities.reticle, false, out);
        self.set_visible(self.entities.scan_indicator, false, out);
        self.transition(PlacementState::Placed, out);
        out.push_event(ViewerEvent::Placed { anchor });
        PlaceOutcome::Placed { anchor }
    }

    /// Move the placed model along the ground: screen x to world x, screen y to depth.
    pub fn drag(&mut self, dx: f32, dy: f32, out: &mut Outputs) -> bool {
        if self.state != PlacementState::Placed || !(dx.is_finite() && dy.is_finite()) {
            return false;
        }
        let Some(anchor) = self.anchor else {
            return false;
        };
        let moved =
            anchor.translated_on_ground(dx * self.drag_sensitivity, dy * self.drag_sensitivity);
        self.anchor = Some(moved);
        out.push_command(HostCommand::SetEntityTransform {
            entity: self.entities.model,
            pose: moved,
        });
        true
    }

    /// Pinch on the placed model. `factor > 1` grows it, clamped to `limits`.
    pub fn scale_by(&mut self, factor: f32, limits: &ArScaleConfig, out: &mut Outputs) -> bool {
        if self.state != PlacementState::Placed || !(factor.is_finite() && factor > 0.0) {
            return false;
        }
        let scale = (self.scale * factor).clamp(limits.min, limits.max);
        if scale == self.scale {
            return false;
        }
        self.scale = scale;
        out.push_command(HostCommand::SetEntityScale {
            entity: self.entities.model,
            scale,
        });
        true
    }

    /// Session end: back to `Unplaced`, everything hidden, hit-test source released.
    pub fn reset(&mut self, out: &mut Outputs) {
        if let SourceState::Ready(source) = self.source {
            out.push_command(HostCommand::CancelHitTestSource { source });
        }
        self.source = SourceState::None;
        self.anchor = None;
        self.scale = 1.0;
        self.reticle = None;
        self.set_visible(self.entities.model, false, out);
        self.set_visible(self.entities.reticle, false, out);
        self.set_visible(self.entities.scan_indicator, false, out);
        self.transition(PlacementState::Unplaced, out);
    }

    pub fn source_requested(&mut self, request: RequestId) {
        self.source = SourceState::Requested(request);
    }

    /// Accept a hit-test source. `false` when it does not answer the outstanding request.
    pub fn source_ready(&mut self, request: RequestId, source: HitTestSourceId) -> bool {
        if self.source != SourceState::Requested(request) {
            return false;
        }
        self.source = SourceState::Ready(source);
        true
    }

    /// Forget a source request that failed.
    pub fn source_failed(&mut self, request: RequestId) -> bool {
        if self.source != SourceState::Requested(request) {
            return false;
        }
        self.source = SourceState::None;
        true
    }

    pub fn has_source(&self) -> bool {
        matches!(self.source, SourceState::Ready(_))
    }

    pub fn state(&self) -> PlacementState {
        self.state
    }

    pub fn anchor(&self) -> Option<Pose> {
        self.anchor
    }

    pub fn reticle(&self) -> Option<Pose> {
        self.reticle
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }
}
