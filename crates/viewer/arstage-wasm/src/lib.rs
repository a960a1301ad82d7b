use js_sys::Float32Array;
use serde_wasm_bindgen as swb;
use wasm_bindgen::prelude::*;

use arstage_core::{
    Config, Coordinator, FrameInput, HitTestSourceId, LoadError, LoadedAsset, PermissionError,
    Pose, RequestId, SessionError,
};

#[wasm_bindgen]
pub struct ArStage {
    core: Coordinator,
}

fn jsvalue_is_undefined_or_null(v: &JsValue) -> bool {
    v.is_undefined() || v.is_null()
}

fn to_js<T: serde::Serialize>(value: &T, what: &str) -> Result<JsValue, JsError> {
    value
        .serialize(&swb::Serializer::json_compatible())
        .map_err(|e| JsError::new(&format!("{what} error: {e}")))
}

#[wasm_bindgen]
impl ArStage {
    /// Create a viewer coordinator. Pass a (partial) config object or undefined/null for defaults.
    /// Example:
    ///   new ArStage({ model_path: "model.glb", capabilities: { has_ar: true, has_hit_test: true } })
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<ArStage, JsError> {
        console_error_panic_hook::set_once();

        let cfg: Config = if jsvalue_is_undefined_or_null(&config) {
            Config::default()
        } else {
            swb::from_value(config).map_err(|e| JsError::new(&format!("config error: {e}")))?
        };
        let core = Coordinator::new(cfg).map_err(|e| JsError::new(&e.to_string()))?;
        Ok(ArStage { core })
    }

    /// Create scene entities and queue the initial asset loads.
    #[wasm_bindgen]
    pub fn start(&mut self) {
        self.core.start();
    }

    /// Select clip `key` on the active model. Returns the PlayOutcome object.
    #[wasm_bindgen]
    pub fn play(&mut self, key: String) -> Result<JsValue, JsError> {
        let outcome = self.core.play(&key);
        to_js(&outcome, "play outcome")
    }

    /// Anchor the AR model at the reticle. Returns the PlaceOutcome object.
    #[wasm_bindgen]
    pub fn place(&mut self) -> Result<JsValue, JsError> {
        let outcome = self.core.place();
        to_js(&outcome, "place outcome")
    }

    #[wasm_bindgen]
    pub fn drag(&mut self, dx: f32, dy: f32) {
        self.core.drag(dx, dy);
    }

    #[wasm_bindgen]
    pub fn zoom(&mut self, factor: f32) {
        self.core.zoom(factor);
    }

    #[wasm_bindgen(js_name = on_load_progress)]
    pub fn on_load_progress(&mut self, request: u32, fraction: f32) {
        self.core.on_load_progress(RequestId(request), fraction);
    }

    /// Report a finished load: `{ model: number, clips: [{ name, duration }] }`.
    #[wasm_bindgen(js_name = on_load_complete)]
    pub fn on_load_complete(&mut self, request: u32, asset: JsValue) -> Result<(), JsError> {
        let asset: LoadedAsset = swb::from_value(asset)
            .map_err(|e| JsError::new(&format!("loaded asset parse error: {e}")))?;
        self.core.on_load_complete(RequestId(request), Ok(asset));
        Ok(())
    }

    #[wasm_bindgen(js_name = on_load_failed)]
    pub fn on_load_failed(&mut self, request: u32, path: String, cause: String) {
        self.core
            .on_load_complete(RequestId(request), Err(LoadError::new(path, cause)));
    }

    /// Queue a session request. Throws when the platform cannot run AR at all.
    #[wasm_bindgen(js_name = request_ar_session)]
    pub fn request_ar_session(&mut self) -> Result<(), JsError> {
        self.core
            .request_ar_session()
            .map_err(|e| JsError::new(&e.to_string()))
    }

    #[wasm_bindgen(js_name = end_ar_session)]
    pub fn end_ar_session(&mut self) {
        self.core.end_ar_session();
    }

    #[wasm_bindgen(js_name = on_session_started)]
    pub fn on_session_started(&mut self) {
        self.core.on_session_started();
    }

    #[wasm_bindgen(js_name = on_session_ended)]
    pub fn on_session_ended(&mut self) {
        self.core.on_session_ended();
    }

    /// `name` is the DOMException name (`NotAllowedError`, `NotSupportedError`, `SecurityError`, ...).
    #[wasm_bindgen(js_name = on_session_failed)]
    pub fn on_session_failed(&mut self, name: String, message: String) {
        self.core
            .on_session_failed(SessionError::from_host_name(&name, &message));
    }

    #[wasm_bindgen(js_name = on_permission_denied)]
    pub fn on_permission_denied(&mut self, capability: String) {
        self.core
            .on_permission_denied(PermissionError { capability });
    }

    #[wasm_bindgen(js_name = on_hit_test_source)]
    pub fn on_hit_test_source(&mut self, request: u32, source: u32) {
        self.core
            .on_hit_test_source(RequestId(request), Ok(HitTestSourceId(source)));
    }

    #[wasm_bindgen(js_name = on_hit_test_source_failed)]
    pub fn on_hit_test_source_failed(&mut self, request: u32, name: String, message: String) {
        self.core.on_hit_test_source(
            RequestId(request),
            Err(SessionError::from_host_name(&name, &message)),
        );
    }

    /// Advance one frame. `frame` is `{ hit_results?: Pose[], orientation?: {alpha, beta, gamma} }`
    /// or undefined/null. Returns the Outputs JSON (`{ commands, events }`).
    #[wasm_bindgen]
    pub fn update(&mut self, dt: f32, frame: JsValue) -> Result<JsValue, JsError> {
        let frame: FrameInput = if jsvalue_is_undefined_or_null(&frame) {
            FrameInput::default()
        } else {
            swb::from_value(frame).map_err(|e| JsError::new(&format!("frame error: {e}")))?
        };
        let out = self.core.update(dt, frame);
        to_js(&out, "outputs")
    }

    /// Drain queued outputs without advancing time.
    #[wasm_bindgen(js_name = take_outputs)]
    pub fn take_outputs(&mut self) -> Result<JsValue, JsError> {
        let out = self.core.take_outputs();
        to_js(&out, "outputs")
    }

    #[wasm_bindgen]
    pub fn snapshot(&self) -> Result<JsValue, JsError> {
        to_js(&self.core.snapshot(), "snapshot")
    }
}

/// Convert a column-major 4x4 transform (e.g. `XRPose.transform.matrix`) into a Pose object.
#[wasm_bindgen(js_name = pose_from_matrix)]
pub fn pose_from_matrix(matrix: Float32Array) -> Result<JsValue, JsError> {
    if matrix.length() != 16 {
        return Err(JsError::new(&format!(
            "pose_from_matrix: expected 16 elements, got {}",
            matrix.length()
        )));
    }
    let mut m = [0.0f32; 16];
    matrix.copy_to(&mut m);
    to_js(&Pose::from_matrix(&m), "pose")
}

/// Numeric ABI version for compatibility checks at init.
#[wasm_bindgen]
pub fn abi_version() -> u32 {
    1
}
