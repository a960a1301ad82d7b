//! Status-line text shown to the user.

use crate::error::{PermissionError, SessionError};

pub const LOAD_FAILED: &str = "Error loading the model. Check that the asset files exist.";
pub const MODEL_LOADING: &str = "Loading model...";
pub const MODEL_READY: &str = "Model loaded. Interact with it or enter AR";
pub const AR_ON: &str = "AR mode on - place the model where you want";
pub const AR_OFF: &str = "AR mode off";
pub const AR_SCANNING: &str = "Move your device slowly to find a surface";
pub const PLACED: &str = "Model placed. Drag to move it";

pub fn clip_loading(label: &str) -> String {
    format!("Loading {label}...")
}

pub fn clip_ready(label: &str) -> String {
    format!("{label} loaded. Ready for AR")
}

pub fn clip_timed_out(label: &str) -> String {
    format!("{label} is taking too long to load")
}

fn percent(fraction: f32) -> Option<u32> {
    if !fraction.is_finite() {
        return None;
    }
    let pct = (fraction.clamp(0.0, 1.0) * 100.0).round() as u32;
    (pct < 100).then_some(pct)
}

/// `None` once the load has reached 100%.
pub fn load_progress(fraction: f32) -> Option<String> {
    percent(fraction).map(|pct| format!("Loading model: {pct}%"))
}

/// Progress of the clip a pending `play` is waiting on.
pub fn clip_progress(label: &str, fraction: f32) -> Option<String> {
    percent(fraction).map(|pct| format!("Loading {label}: {pct}%"))
}

pub fn session_failed(err: &SessionError) -> String {
    match err {
        SessionError::Permission => {
            "AR permission was denied. Allow camera access to use AR".to_string()
        }
        SessionError::Unsupported => "AR is not supported on this device".to_string(),
        SessionError::InsecureContext => "AR requires HTTPS. Open this page over https://".to_string(),
        SessionError::Other { reason } => format!("Could not start AR: {reason}"),
    }
}

pub fn permission_denied(err: &PermissionError) -> String {
    format!(
        "Access to the {} was denied. Enable it in your browser settings and reload",
        err.capability
    )
}
