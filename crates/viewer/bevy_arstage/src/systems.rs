use bevy::prelude::*;

use arstage_core::{EntityId, EntityKind, HostCommand, Pose};

use crate::components::{ArStageEntity, ClipPlayer, PlayingClip};
use crate::resources::{
    CameraOrbit, EntityIndex, FrameSamples, HostRequests, SceneCommands, StatusLine,
};
use crate::{ArStageCore, ArStageEvent, DragInput, PlaceModel, PlayClip, ZoomInput};

fn to_transform(pose: &Pose) -> Transform {
    let [x, y, z] = pose.position;
    let [qx, qy, qz, qw] = pose.orientation;
    Transform::from_xyz(x, y, z).with_rotation(Quat::from_xyzw(qx, qy, qz, qw).normalize())
}

/// Forward UI input events to the coordinator.
pub fn input_system(
    mut core: ResMut<ArStageCore>,
    mut plays: EventReader<PlayClip>,
    mut places: EventReader<PlaceModel>,
    mut drags: EventReader<DragInput>,
    mut zooms: EventReader<ZoomInput>,
) {
    for PlayClip(key) in plays.read() {
        match core.0.play(key).into_result() {
            Ok(started) => debug!("playing '{started}'"),
            Err(err) if err.is_recoverable() => debug!("{err}"),
            Err(err) => warn!("[{}] {err}", err.category()),
        }
    }
    for _ in places.read() {
        let outcome = core.0.place();
        debug!("place: {outcome:?}");
    }
    for d in drags.read() {
        core.0.drag(d.dx, d.dy);
    }
    for z in zooms.read() {
        core.0.zoom(z.0);
    }
}

/// Advance the coordinator by the frame delta and route its commands: UI state
/// into resources, scene and mixer writes into `SceneCommands`, everything else
/// into `HostRequests`.
#[allow(clippy::too_many_arguments)]
pub fn update_core_system(
    time: Res<Time>,
    mut core: ResMut<ArStageCore>,
    mut samples: ResMut<FrameSamples>,
    mut events: EventWriter<ArStageEvent>,
    mut scene: ResMut<SceneCommands>,
    mut requests: ResMut<HostRequests>,
    mut status: ResMut<StatusLine>,
    mut orbit: ResMut<CameraOrbit>,
) {
    let frame = std::mem::take(&mut samples.0);
    let out = core.0.update(time.delta_seconds(), frame);
    for ev in out.events {
        events.send(ArStageEvent(ev));
    }
    for cmd in out.commands {
        match cmd {
            HostCommand::AddEntity { .. }
            | HostCommand::SetEntityVisible { .. }
            | HostCommand::SetEntityTransform { .. }
            | HostCommand::SetEntityScale { .. }
            | HostCommand::StopAllClips { .. }
            | HostCommand::StartClip { .. }
            | HostCommand::AdvanceMixer { .. } => scene.0.push(cmd),
            HostCommand::Status { message } => status.message = Some(message),
            HostCommand::Notice { message } => status.notice = Some(message),
            HostCommand::SetLoadingIndicator { visible } => status.loading = visible,
            HostCommand::SetCamera { orbit: o } => orbit.0 = Some(o),
            HostCommand::Render { .. } => {}
            other => requests.commands.push(other),
        }
    }
}

/// Spawn mirrored entities and apply staged visibility, transform and mixer writes.
pub fn apply_commands_system(world: &mut World) {
    let staged = match world.get_resource_mut::<SceneCommands>() {
        Some(mut scene) => std::mem::take(&mut scene.0),
        None => return,
    };
    if staged.is_empty() {
        return;
    }
    world.resource_scope(|world, mut index: Mut<EntityIndex>| {
        for cmd in staged {
            match cmd {
                HostCommand::AddEntity { entity, kind } => {
                    let mut spawned = world.spawn((
                        SpatialBundle {
                            visibility: Visibility::Hidden,
                            ..default()
                        },
                        ArStageEntity { id: entity, kind },
                    ));
                    if matches!(kind, EntityKind::Model { .. }) {
                        spawned.insert(ClipPlayer::default());
                    }
                    let spawned = spawned.id();
                    index.map.insert(entity, spawned);
                }
                HostCommand::SetEntityVisible { entity, visible } => {
                    let Some(&e) = index.map.get(&entity) else {
                        warn!("visibility write for unknown entity {:?}", entity);
                        continue;
                    };
                    if let Some(mut vis) = world.get_mut::<Visibility>(e) {
                        *vis = if visible {
                            Visibility::Visible
                        } else {
                            Visibility::Hidden
                        };
                    }
                }
                HostCommand::SetEntityTransform { entity, pose } => {
                    let Some(&e) = index.map.get(&entity) else {
                        warn!("transform write for unknown entity {:?}", entity);
                        continue;
                    };
                    if let Some(mut tf) = world.get_mut::<Transform>(e) {
                        let scale = tf.scale;
                        *tf = to_transform(&pose).with_scale(scale);
                    }
                }
                HostCommand::SetEntityScale { entity, scale } => {
                    let Some(&e) = index.map.get(&entity) else {
                        warn!("scale write for unknown entity {:?}", entity);
                        continue;
                    };
                    if let Some(mut tf) = world.get_mut::<Transform>(e) {
                        tf.scale = Vec3::splat(scale);
                    }
                }
                HostCommand::StopAllClips { entity } => {
                    if let Some(mut player) = clip_player(world, &index, entity) {
                        player.active = None;
                    }
                }
                HostCommand::StartClip {
                    entity,
                    key,
                    source,
                } => {
                    if let Some(mut player) = clip_player(world, &index, entity) {
                        player.active = Some(PlayingClip {
                            key,
                            source,
                            elapsed: 0.0,
                        });
                    }
                }
                HostCommand::AdvanceMixer { entity, dt } => {
                    if let Some(mut player) = clip_player(world, &index, entity) {
                        if let Some(active) = player.active.as_mut() {
                            active.elapsed += dt;
                        }
                    }
                }
                _ => {}
            }
        }
    });
}

fn clip_player<'w>(
    world: &'w mut World,
    index: &EntityIndex,
    entity: EntityId,
) -> Option<Mut<'w, ClipPlayer>> {
    let Some(&e) = index.map.get(&entity) else {
        warn!("mixer write for unknown entity {:?}", entity);
        return None;
    };
    world.get_mut::<ClipPlayer>(e)
}
