//! Host-side collaborator traits and a dispatcher that applies `Outputs` to them.
//!
//! Adapters may consume `HostCommand`s directly (the WASM and Bevy crates do);
//! native hosts can instead implement these traits and call `dispatch`.

use crate::camera::OrbitState;
use crate::clip::SourceHandle;
use crate::ids::{ClipKey, EntityId, HitTestSourceId, RequestId};
use crate::mode::SessionMode;
use crate::outputs::{EntityKind, HostCommand, Outputs, SessionFeatures, Surface};
use crate::pose::Pose;

/// Scene graph and renderer.
pub trait SceneHost {
    fn add_entity(&mut self, entity: EntityId, kind: EntityKind);
    fn set_visible(&mut self, entity: EntityId, visible: bool);
    fn set_transform(&mut self, entity: EntityId, pose: Pose);
    fn set_scale(&mut self, entity: EntityId, scale: f32);
    fn attach_model(&mut self, entity: EntityId, model: u32);
    fn set_camera(&mut self, orbit: &OrbitState);
    fn show_surface(&mut self, surface: Surface);
    fn render(&mut self, mode: SessionMode);
}

/// Per-entity animation mixer.
pub trait ClipMixer {
    fn stop_all(&mut self, entity: EntityId);
    fn start(&mut self, entity: EntityId, key: &ClipKey, source: SourceHandle);
    fn advance(&mut self, entity: EntityId, dt: f32);
}

/// Asynchronous asset fetcher. Completion is reported back through
/// `Coordinator::on_load_complete` with the same `request`.
pub trait AssetLoader {
    fn load(&mut self, request: RequestId, path: &str);
}

/// Immersive session provider.
pub trait ArSessionHost {
    fn request_session(&mut self, features: &SessionFeatures);
    fn request_hit_test_source(&mut self, request: RequestId);
    fn cancel_hit_test_source(&mut self, source: HitTestSourceId);
    fn end_session(&mut self);
}

/// Status line, blocking notices and the loading indicator.
pub trait StatusSink {
    fn status(&mut self, message: &str);
    fn notice(&mut self, message: &str);
    fn set_loading_indicator(&mut self, visible: bool);
}

/// Everything `dispatch` needs.
pub trait Host: SceneHost + ClipMixer + AssetLoader + ArSessionHost + StatusSink {}

impl<T> Host for T where T: SceneHost + ClipMixer + AssetLoader + ArSessionHost + StatusSink {}

/// Apply every command in `outputs`, in order.
pub fn dispatch<H: Host + ?Sized>(outputs: &Outputs, host: &mut H) {
    for command in &outputs.commands {
        apply(command, host);
    }
}

fn apply<H: Host + ?Sized>(command: &HostCommand, host: &mut H) {
    match command {
        HostCommand::AddEntity { entity, kind } => host.add_entity(*entity, *kind),
        HostCommand::SetEntityVisible { entity, visible } => host.set_visible(*entity, *visible),
        HostCommand::SetEntityTransform { entity, pose } => host.set_transform(*entity, *pose),
        HostCommand::SetEntityScale { entity, scale } => host.set_scale(*entity, *scale),
        HostCommand::LoadAsset { request, path } => host.load(*request, path),
        HostCommand::AttachModel { entity, model } => host.attach_model(*entity, *model),
        HostCommand::StopAllClips { entity } => host.stop_all(*entity),
        HostCommand::StartClip {
            entity,
            key,
            source,
        } => host.start(*entity, key, *source),
        HostCommand::AdvanceMixer { entity, dt } => host.advance(*entity, *dt),
        HostCommand::SetCamera { orbit } => host.set_camera(orbit),
        HostCommand::RequestSession { features } => host.request_session(features),
        HostCommand::RequestHitTestSource { request } => host.request_hit_test_source(*request),
        HostCommand::CancelHitTestSource { source } => host.cancel_hit_test_source(*source),
        HostCommand::EndSession => host.end_session(),
        HostCommand::ShowSurface { surface } => host.show_surface(*surface),
        HostCommand::SetLoadingIndicator { visible } => host.set_loading_indicator(*visible),
        HostCommand::Status { message } => StatusSink::status(host, message),
        HostCommand::Notice { message } => host.notice(message),
        HostCommand::Render { mode } => host.render(*mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log(Vec<String>);

    impl SceneHost for Log {
        fn add_entity(&mut self, entity: EntityId, _kind: EntityKind) {
            self.0.push(format!("add {}", entity.0));
        }
        fn set_visible(&mut self, entity: EntityId, visible: bool) {
            self.0.push(format!("visible {} {visible}", entity.0));
        }
        fn set_transform(&mut self, entity: EntityId, _pose: Pose) {
            self.0.push(format!("transform {}", entity.0));
        }
        fn set_scale(&mut self, entity: EntityId, scale: f32) {
            self.0.push(format!("scale {} {scale}", entity.0));
        }
        fn attach_model(&mut self, entity: EntityId, model: u32) {
            self.0.push(format!("attach {} {model}", entity.0));
        }
        fn set_camera(&mut self, _orbit: &OrbitState) {
            self.0.push("camera".into());
        }
        fn show_surface(&mut self, surface: Surface) {
            self.0.push(format!("surface {surface:?}"));
        }
        fn render(&mut self, mode: SessionMode) {
            self.0.push(format!("render {mode:?}"));
        }
    }

    impl ClipMixer for Log {
        fn stop_all(&mut self, entity: EntityId) {
            self.0.push(format!("stop {}", entity.0));
        }
        fn start(&mut self, entity: EntityId, key: &ClipKey, _source: SourceHandle) {
            self.0.push(format!("start {} {key}", entity.0));
        }
        fn advance(&mut self, entity: EntityId, _dt: f32) {
            self.0.push(format!("advance {}", entity.0));
        }
    }

    impl AssetLoader for Log {
        fn load(&mut self, request: RequestId, path: &str) {
            self.0.push(format!("load {} {path}", request.0));
        }
    }

    impl ArSessionHost for Log {
        fn request_session(&mut self, _features: &SessionFeatures) {
            self.0.push("session".into());
        }
        fn request_hit_test_source(&mut self, request: RequestId) {
            self.0.push(format!("hit-test {}", request.0));
        }
        fn cancel_hit_test_source(&mut self, source: HitTestSourceId) {
            self.0.push(format!("cancel {}", source.0));
        }
        fn end_session(&mut self) {
            self.0.push("end".into());
        }
    }

    impl StatusSink for Log {
        fn status(&mut self, message: &str) {
            self.0.push(format!("status {message}"));
        }
        fn notice(&mut self, message: &str) {
            self.0.push(format!("notice {message}"));
        }
        fn set_loading_indicator(&mut self, visible: bool) {
            self.0.push(format!("spinner {visible}"));
        }
    }

    #[test]
    fn dispatch_preserves_command_order() {
        let mut outputs = Outputs::default();
        outputs.push_command(HostCommand::StopAllClips {
            entity: EntityId(0),
        });
        outputs.push_command(HostCommand::StartClip {
            entity: EntityId(0),
            key: "walk".into(),
            source: SourceHandle {
                asset: 3,
                clip_index: 0,
            },
        });
        outputs.status("hello");
        outputs.push_command(HostCommand::Render {
            mode: SessionMode::NormalView,
        });

        let mut log = Log::default();
        dispatch(&outputs, &mut log);
        assert_eq!(
            log.0,
            vec!["stop 0", "start 0 walk", "status hello", "render NormalView"]
        );
    }
}
