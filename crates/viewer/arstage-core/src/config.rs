//! Coordinator configuration.
//!
//! Every field has a default so hosts can pass a partial JSON object.

use serde::{Deserialize, Serialize};

use crate::error::ViewerError;
use crate::ids::ClipKey;

/// One selectable clip: the key UI buttons send, the asset holding it and its display label.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClipSpec {
    pub key: ClipKey,
    pub path: String,
    pub label: String,
}

impl ClipSpec {
    pub fn new(key: &str, path: &str, label: &str) -> Self {
        Self {
            key: ClipKey::from(key),
            path: path.to_string(),
            label: label.to_string(),
        }
    }
}

/// What the host platform can do. Replaces per-variant forks of the viewer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// Immersive AR sessions can be requested.
    pub has_ar: bool,
    /// The AR session supports hit-test sources.
    pub has_hit_test: bool,
    /// Device-orientation samples are delivered.
    pub has_orientation: bool,
}

impl Capabilities {
    /// Normal view only.
    pub fn view_only() -> Self {
        Self::default()
    }

    /// Full WebXR AR with hit testing.
    pub fn webxr() -> Self {
        Self {
            has_ar: true,
            has_hit_test: true,
            has_orientation: false,
        }
    }

    /// Camera passthrough with orientation tracking instead of hit testing.
    pub fn passthrough_orientation() -> Self {
        Self {
            has_ar: true,
            has_hit_test: false,
            has_orientation: true,
        }
    }

    /// Whether an AR session has any pose source to drive the reticle.
    pub fn can_track(&self) -> bool {
        self.has_hit_test || self.has_orientation
    }
}

/// Retry schedule for `play` requests whose clip is still loading.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub delay_ms: u32,
    /// Multiplier applied to the delay after each retry (1.0 = fixed delay).
    pub backoff: f32,
    /// Total attempts including the initial call. `None` retries until the load settles.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay_ms: 500,
            backoff: 1.0,
            max_attempts: Some(20),
        }
    }
}

impl RetryPolicy {
    /// Delay in seconds before retry number `attempt` (1-based attempt that just failed).
    pub fn delay_after(&self, attempt: u32) -> f64 {
        let base = self.delay_ms as f64 / 1000.0;
        let factor = (self.backoff.max(1.0) as f64).powi(attempt.saturating_sub(1) as i32);
        base * factor
    }

    /// Whether another attempt may follow `attempts` already made.
    pub fn allows_another(&self, attempts: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempts < max,
            None => true,
        }
    }
}

/// Orbit camera limits for the normal view.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    pub target: [f32; 3],
    pub distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Radians per pixel of drag.
    pub rotate_speed: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            target: [0.0, 1.0, 0.0],
            distance: 3.0,
            min_distance: 0.5,
            max_distance: 10.0,
            rotate_speed: 0.005,
        }
    }
}

/// Geometry for the orientation-derived reticle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    /// Viewer eye height above the ground plane, meters.
    pub eye_height: f32,
    /// Ground hits farther than this are rejected.
    pub max_distance: f32,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            eye_height: 1.5,
            max_distance: 5.0,
        }
    }
}

/// Pinch-to-scale limits for the placed AR model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArScaleConfig {
    pub min: f32,
    pub max: f32,
}

impl Default for ArScaleConfig {
    fn default() -> Self {
        Self { min: 0.25, max: 4.0 }
    }
}

/// Configuration for a coordinator instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Character model asset shown in both modes.
    pub model_path: String,
    /// Clip table; order is the UI button order.
    pub clips: Vec<ClipSpec>,
    pub capabilities: Capabilities,
    pub retry: RetryPolicy,
    /// Meters of anchor translation per pixel of drag in AR.
    pub drag_sensitivity: f32,
    pub orbit: OrbitConfig,
    pub orientation: OrientationConfig,
    /// Wrap the active clip clock at the clip duration.
    pub loop_clips: bool,
    /// Clip started automatically once a model and this clip are both loaded,
    /// unless a clip was already selected on that model.
    pub initial_clip: Option<ClipKey>,
    pub ar_scale: ArScaleConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: "model.glb".to_string(),
            clips: vec![
                ClipSpec::new("tpose", "T.fbx", "T (Pose)"),
                ClipSpec::new("animation1", "MOVIMIENTO1.fbx", "Movement 1"),
                ClipSpec::new("animation2", "MOVIMIENTO2.fbx", "Movement 2"),
                ClipSpec::new("animation3", "MOVIMIENTO3.fbx", "Movement 3"),
            ],
            capabilities: Capabilities::webxr(),
            retry: RetryPolicy::default(),
            drag_sensitivity: 0.01,
            orbit: OrbitConfig::default(),
            orientation: OrientationConfig::default(),
            loop_clips: true,
            initial_clip: None,
            ar_scale: ArScaleConfig::default(),
        }
    }
}

impl Config {
    /// Parse a (possibly partial) JSON config and validate it.
    pub fn from_json(json: &str) -> Result<Self, ViewerError> {
        let cfg: Config = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configs the coordinator cannot run with.
    pub fn validate(&self) -> Result<(), ViewerError> {
        for (i, clip) in self.clips.iter().enumerate() {
            if clip.key.as_str().is_empty() {
                return Err(ViewerError::InvalidConfig {
                    reason: format!("clip #{i} has an empty key"),
                });
            }
            if self.clips[..i].iter().any(|c| c.key == clip.key) {
                return Err(ViewerError::InvalidConfig {
                    reason: format!("duplicate clip key '{}'", clip.key),
                });
            }
        }
        if !(self.drag_sensitivity.is_finite() && self.drag_sensitivity >= 0.0) {
            return Err(ViewerError::InvalidConfig {
                reason: "drag_sensitivity must be finite and non-negative".into(),
            });
        }
        if self.orbit.min_distance <= 0.0 || self.orbit.min_distance > self.orbit.max_distance {
            return Err(ViewerError::InvalidConfig {
                reason: "orbit distance limits must satisfy 0 < min <= max".into(),
            });
        }
        if !(self.ar_scale.min > 0.0 && self.ar_scale.min <= self.ar_scale.max) {
            return Err(ViewerError::InvalidConfig {
                reason: "ar_scale limits must satisfy 0 < min <= max".into(),
            });
        }
        if let Some(key) = &self.initial_clip {
            if self.clip_spec(key.as_str()).is_none() {
                return Err(ViewerError::InvalidConfig {
                    reason: format!("initial_clip '{key}' is not in the clip table"),
                });
            }
        }
        if self.retry.max_attempts == Some(0) {
            return Err(ViewerError::InvalidConfig {
                reason: "retry.max_attempts must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn clip_spec(&self, key: &str) -> Option<&ClipSpec> {
        self.clips.iter().find(|c| c.key.as_str() == key)
    }
}
