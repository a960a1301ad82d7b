//! Normal-view orbit camera (drag to rotate, pinch to zoom).

use serde::{Deserialize, Serialize};

use crate::config::OrbitConfig;

const MIN_POLAR: f32 = 0.05;
const MAX_POLAR: f32 = std::f32::consts::PI - 0.05;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrbitState {
    pub target: [f32; 3],
    pub distance: f32,
    /// Radians around the vertical axis, 0 = looking down -Z.
    pub azimuth: f32,
    /// Radians from the up axis.
    pub polar: f32,
}

impl OrbitState {
    pub fn new(cfg: &OrbitConfig) -> Self {
        Self {
            target: cfg.target,
            distance: cfg.distance.clamp(cfg.min_distance, cfg.max_distance),
            azimuth: 0.0,
            polar: std::f32::consts::FRAC_PI_2,
        }
    }

    pub fn rotate(&mut self, dx: f32, dy: f32, cfg: &OrbitConfig) {
        self.azimuth -= dx * cfg.rotate_speed;
        self.polar = (self.polar - dy * cfg.rotate_speed).clamp(MIN_POLAR, MAX_POLAR);
    }

    /// `factor > 1` moves closer (pinch out).
    pub fn zoom(&mut self, factor: f32, cfg: &OrbitConfig) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        self.distance = (self.distance / factor).clamp(cfg.min_distance, cfg.max_distance);
    }

    /// Camera position for the current orbit.
    pub fn eye(&self) -> [f32; 3] {
        let [tx, ty, tz] = self.target;
        let (sp, cp) = self.polar.sin_cos();
        let (sa, ca) = self.azimuth.sin_cos();
        [
            tx + self.distance * sp * sa,
            ty + self.distance * cp,
            tz + self.distance * sp * ca,
        ]
    }
}
