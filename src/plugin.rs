//! Bevy integration: per-entity texturing state, commands and automatic
//! reprojection.

use bevy::prelude::*;

use crate::dispatch::{ApplyMode, ApplyTrigger, AutoApply, GeometryEvent};
use crate::error::{UvError, UvResult};
use crate::mesh::{is_tagged, MeshHost, PolyMesh};
use crate::ops;
use crate::prefs::Preferences;
use crate::texture::PartialTextureConfig;

/// Operation id used for object transform changes picked up from
/// `GlobalTransform`.
pub const OBJECT_MOVED: u64 = u64::MAX;

/// Texturing state of an entity's mesh.
#[derive(Component, Debug, Clone)]
pub struct UvMesh {
    pub mesh: PolyMesh,
}

impl UvMesh {
    pub fn new(mesh: PolyMesh) -> Self {
        Self { mesh }
    }

    /// Build from a triangle-list Bevy mesh.
    pub fn from_bevy_mesh(mesh: &Mesh) -> Option<Self> {
        PolyMesh::from_bevy_mesh(mesh).map(Self::new)
    }
}

/// Debounced auto-apply state keyed by entity.
#[derive(Resource, Default, Deref, DerefMut)]
pub struct UvDispatcher(pub AutoApply<Entity>);

/// The host changed an entity's geometry while `operation` was active.
#[derive(Message, Debug, Clone, Copy)]
pub struct GeometryChanged {
    pub entity: Entity,
    pub operation: u64,
}

/// Texturing operation on the selection of one entity.
#[derive(Message, Debug, Clone)]
pub enum UvCommand {
    MarkFace(Entity),
    ClearFace(Entity),
    Edit {
        entity: Entity,
        config: PartialTextureConfig,
    },
    Reset(Entity),
    /// Reproject the faces the current mode covers.
    Reapply(Entity),
    CopyActiveToSelected(Entity),
    /// Texture-locked move of the selection by precomputed matrices.
    LockedTransform {
        entity: Entity,
        mat_obj: Mat4,
        mat_world: Mat4,
    },
}

impl UvCommand {
    pub fn entity(&self) -> Entity {
        match self {
            UvCommand::MarkFace(entity)
            | UvCommand::ClearFace(entity)
            | UvCommand::Reset(entity)
            | UvCommand::Reapply(entity)
            | UvCommand::CopyActiveToSelected(entity) => *entity,
            UvCommand::Edit { entity, .. } | UvCommand::LockedTransform { entity, .. } => *entity,
        }
    }

    /// Run the command against `mesh`. Returns the number of faces affected.
    pub fn run<M: MeshHost + ?Sized>(&self, mesh: &mut M, prefs: &Preferences) -> UvResult<usize> {
        match self {
            UvCommand::MarkFace(_) => ops::mark_face(mesh, prefs),
            UvCommand::ClearFace(_) => ops::clear_face(mesh),
            UvCommand::Edit { config, .. } => ops::edit(mesh, config, prefs),
            UvCommand::Reset(_) => ops::reset(mesh, prefs),
            UvCommand::Reapply(_) => {
                let mode = ApplyMode::for_context(mesh.is_edit_mode(), ApplyTrigger::User);
                ops::reapply(mesh, mode, prefs)
            }
            UvCommand::CopyActiveToSelected(_) => ops::copy_active_to_selected(mesh, prefs),
            UvCommand::LockedTransform {
                mat_obj, mat_world, ..
            } => ops::apply_locked_transform(mesh, mat_obj, mat_world, prefs),
        }
    }
}

/// A command or an automatic reprojection failed.
#[derive(Message, Debug, Clone)]
pub struct UvCommandFailed {
    pub entity: Entity,
    pub error: UvError,
}

pub struct AlignUvPlugin;

impl Plugin for AlignUvPlugin {
    fn build(&self, app: &mut App) {
        // Load preferences on startup unless the app provides its own
        if !app.world().contains_resource::<Preferences>() {
            app.insert_resource(Preferences::load());
        }
        app.init_resource::<UvDispatcher>()
            .add_message::<GeometryChanged>()
            .add_message::<UvCommand>()
            .add_message::<UvCommandFailed>()
            .add_systems(
                Update,
                (
                    collect_geometry_changes.run_if(dispatcher_awake),
                    sync_object_frames,
                    execute_uv_commands,
                    track_tagged_meshes,
                    run_auto_apply.run_if(dispatcher_awake),
                    upload_mesh_data.run_if(dispatcher_awake),
                    end_uv_writes,
                )
                    .chain(),
            )
            .add_systems(Last, save_changed_preferences);
    }
}

fn dispatcher_awake(dispatcher: Res<UvDispatcher>) -> bool {
    !dispatcher.is_idle()
}

fn report_failure(entity: Entity, error: UvError, failures: &mut MessageWriter<UvCommandFailed>) {
    if error.is_user_warning() {
        warn!("UV operation on {:?}: {}", entity, error);
    } else {
        error!("UV operation on {:?} failed: {}", entity, error);
    }
    failures.write(UvCommandFailed { entity, error });
}

/// Feed host geometry events into the dispatcher.
fn collect_geometry_changes(
    mut events: MessageReader<GeometryChanged>,
    mut dispatcher: ResMut<UvDispatcher>,
) {
    for event in events.read() {
        dispatcher.push(GeometryEvent {
            mesh: event.entity,
            operation: event.operation,
        });
    }
}

/// Copy moved object transforms into the meshes and queue a reprojection.
///
/// Runs while the dispatcher is idle too, so the first command on an entity
/// already projects with its real transform.
fn sync_object_frames(
    mut query: Query<(Entity, &mut UvMesh, &GlobalTransform), Changed<GlobalTransform>>,
    mut dispatcher: ResMut<UvDispatcher>,
) {
    for (entity, mut uv_mesh, global) in &mut query {
        let world = Mat4::from(global.affine());
        if uv_mesh.mesh.world == world {
            continue;
        }
        uv_mesh.mesh.world = world;
        if is_tagged(&uv_mesh.mesh) {
            dispatcher.push(GeometryEvent {
                mesh: entity,
                operation: OBJECT_MOVED,
            });
        }
    }
}

fn execute_uv_commands(
    mut commands: MessageReader<UvCommand>,
    mut meshes: Query<&mut UvMesh>,
    mut dispatcher: ResMut<UvDispatcher>,
    mut failures: MessageWriter<UvCommandFailed>,
    prefs: Res<Preferences>,
) {
    for command in commands.read() {
        let entity = command.entity();
        let Ok(mut uv_mesh) = meshes.get_mut(entity) else {
            warn!("UV command for {:?}, which has no UvMesh", entity);
            continue;
        };

        dispatcher.begin_write(entity);
        match command.run(&mut uv_mesh.mesh, &prefs) {
            Ok(count) => debug!("{:?} on {:?}: {} faces", command, entity, count),
            Err(error) => report_failure(entity, error, &mut failures),
        }
    }
}

/// Wake the dispatcher when tagged meshes appear, put it to sleep when the
/// last one goes away.
fn track_tagged_meshes(
    changed: Query<(), Changed<UvMesh>>,
    mut removed: RemovedComponents<UvMesh>,
    meshes: Query<&UvMesh>,
    mut dispatcher: ResMut<UvDispatcher>,
) {
    let removed_any = removed.read().count() > 0;
    if changed.is_empty() && !removed_any {
        return;
    }
    let tagged = meshes.iter().filter(|m| is_tagged(&m.mesh)).count();
    dispatcher.set_tagged_count(tagged);
}

fn run_auto_apply(
    time: Res<Time>,
    prefs: Res<Preferences>,
    mut dispatcher: ResMut<UvDispatcher>,
    mut meshes: Query<&mut UvMesh>,
    mut failures: MessageWriter<UvCommandFailed>,
) {
    for entity in dispatcher.update(time.elapsed(), &prefs) {
        let Ok(mut uv_mesh) = meshes.get_mut(entity) else {
            continue;
        };
        if !is_tagged(&uv_mesh.mesh) {
            continue;
        }

        dispatcher.begin_write(entity);
        let mode = ApplyMode::for_context(uv_mesh.mesh.edit_mode, ApplyTrigger::Auto);
        match ops::reapply(&mut uv_mesh.mesh, mode, &prefs) {
            Ok(_) | Err(UvError::EmptySelection) => {}
            Err(error) => report_failure(entity, error, &mut failures),
        }
    }
}

/// Write positions and UVs of changed tagged meshes into their render meshes.
fn upload_mesh_data(
    query: Query<(Entity, &UvMesh, &Mesh3d), Changed<UvMesh>>,
    mut assets: ResMut<Assets<Mesh>>,
) {
    for (entity, uv_mesh, mesh3d) in &query {
        if !is_tagged(&uv_mesh.mesh) {
            continue;
        }
        let Some(mut mesh) = assets.get_mut(&mesh3d.0) else {
            continue;
        };
        if !uv_mesh.mesh.write_to_bevy(&mut mesh) {
            warn!("Mesh of {:?} no longer matches its UvMesh", entity);
        }
    }
}

/// Write marks only cover the frame the write happened in.
fn end_uv_writes(mut dispatcher: ResMut<UvDispatcher>) {
    if dispatcher.is_writing_any() {
        dispatcher.finish_writes();
    }
}

/// Persist preferences whenever the app changes them.
fn save_changed_preferences(prefs: Res<Preferences>) {
    if prefs.is_changed() && !prefs.is_added() {
        prefs.save();
    }
}
