//! arstage core (host-agnostic)
//!
//! Frame-driven coordinator for a 3D model viewer with an immersive AR mode.
//! The crate owns clip loading/selection, AR placement and mode switching; the
//! host owns rendering, asset decoding and the XR session. Hosts feed events in
//! and apply the `HostCommand`s drained from `Coordinator::update`.

pub mod camera;
pub mod clip;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod host;
pub mod ids;
pub mod mode;
pub mod outputs;
pub mod placement;
pub mod playback;
pub mod pose;
pub mod status;

// Re-exports for consumers (adapters)
pub use camera::OrbitState;
pub use clip::{AnimationClip, ClipInfo, ClipLibrary, ClipStatus, LoadedAsset, SourceHandle};
pub use config::{ArScaleConfig, Capabilities, ClipSpec, Config, OrbitConfig, OrientationConfig, RetryPolicy};
pub use coordinator::{ArSnapshot, Coordinator, FrameInput, PlaybackSnapshot, ViewerSnapshot};
pub use error::{LoadError, PermissionError, SessionError, ViewerError};
pub use host::{dispatch, ArSessionHost, AssetLoader, ClipMixer, Host, SceneHost, StatusSink};
pub use ids::{ClipKey, EntityId, HitTestSourceId, IdAllocator, RequestId};
pub use mode::{ModelSlot, SessionMode};
pub use outputs::{EntityKind, HostCommand, Outputs, SessionFeatures, Surface, ViewerEvent};
pub use placement::{PlaceOutcome, PlacementEntities, PlacementState};
pub use playback::{PendingPlay, PlayOutcome};
pub use pose::{first_hit, Orientation, Pose};
