//! Operations exposed to the host editor.
//!
//! Every operation works on the selected faces of one mesh, takes the
//! preferences explicitly and commits the mesh at most once.

use bevy::log::debug;
use bevy::math::Mat4;

use crate::dispatch::{select_faces, selected_faces, selected_vertices, ApplyMode};
use crate::error::{UvError, UvResult};
use crate::mesh::{check_tagged, ensure_tagged, FaceIndex, MeshHost, MeshReader, MeshWriter};
use crate::prefs::Preferences;
use crate::texture::{
    apply_faces, locked_transform, PartialTextureConfig, ProjectionSettings, TexFlags,
    TextureConfig,
};

fn require_selection<M: MeshHost + ?Sized>(mesh: &M) -> UvResult<Vec<FaceIndex>> {
    let faces = selected_faces(mesh);
    if faces.is_empty() {
        return Err(UvError::EmptySelection);
    }
    Ok(faces)
}

/// Rewrite the configuration of `faces` with `f`, reproject them and commit.
fn rewrite_faces<M, F>(
    mesh: &mut M,
    faces: &[FaceIndex],
    prefs: &Preferences,
    mut f: F,
) -> UvResult<usize>
where
    M: MeshHost + ?Sized,
    F: FnMut(&TextureConfig) -> TextureConfig,
{
    let mut writer = MeshWriter::open(mesh)?;
    for &face in faces {
        let config = f(&writer.config(face));
        writer.set_config(face, &config);
    }
    let applied = apply_faces(&mut writer, faces, ProjectionSettings::from(prefs));
    writer.commit();
    Ok(applied)
}

/// Enable world-aligned texturing on the selected faces, tagging the mesh
/// first if needed. Returns the number of faces projected.
pub fn mark_face<M: MeshHost + ?Sized>(mesh: &mut M, prefs: &Preferences) -> UvResult<usize> {
    let faces = require_selection(mesh)?;
    ensure_tagged(mesh)?;
    let applied = rewrite_faces(mesh, &faces, prefs, |config| TextureConfig {
        flags: config.flags | TexFlags::ENABLED,
        ..*config
    })?;
    debug!("Marked {} faces", applied);
    Ok(applied)
}

/// Disable texturing on the selected faces. Their UVs are left as they are.
///
/// A mesh without texture attributes has nothing to clear.
pub fn clear_face<M: MeshHost + ?Sized>(mesh: &mut M) -> UvResult<usize> {
    let faces = require_selection(mesh)?;
    if !check_tagged(mesh)? {
        return Ok(0);
    }

    let mut writer = MeshWriter::open(mesh)?;
    let mut cleared = 0;
    for &face in &faces {
        let mut config = writer.config(face);
        if config.is_enabled() {
            config.flags -= TexFlags::ENABLED;
            writer.set_config(face, &config);
            cleared += 1;
        }
    }
    writer.commit();
    debug!("Cleared {} faces", cleared);
    Ok(cleared)
}

/// Merge the fields `edit` sets into every selected face and reproject.
pub fn edit<M: MeshHost + ?Sized>(
    mesh: &mut M,
    edit: &PartialTextureConfig,
    prefs: &Preferences,
) -> UvResult<usize> {
    let faces = require_selection(mesh)?;
    let enables =
        edit.flags_set.contains(TexFlags::ENABLED) && edit.flags.contains(TexFlags::ENABLED);
    if enables {
        ensure_tagged(mesh)?;
    }
    let applied = rewrite_faces(mesh, &faces, prefs, |config| edit.apply_to(config))?;
    debug!("Edited {} faces, {} projected", faces.len(), applied);
    Ok(applied)
}

/// Restore default shift, scale, rotation and alignment on the selected faces.
pub fn reset<M: MeshHost + ?Sized>(mesh: &mut M, prefs: &Preferences) -> UvResult<usize> {
    let faces = require_selection(mesh)?;
    let applied = rewrite_faces(mesh, &faces, prefs, TextureConfig::reset)?;
    debug!("Reset {} faces", faces.len());
    Ok(applied)
}

/// Re-run the projection on the faces covered by `mode`.
pub fn reapply<M: MeshHost + ?Sized>(
    mesh: &mut M,
    mode: ApplyMode,
    prefs: &Preferences,
) -> UvResult<usize> {
    let faces = select_faces(mesh, mode);
    if faces.is_empty() && mode != ApplyMode::Full {
        return Err(UvError::EmptySelection);
    }

    let mut writer = MeshWriter::open(mesh)?;
    let applied = apply_faces(&mut writer, &faces, ProjectionSettings::from(prefs));
    writer.commit();
    debug!("Reapplied {:?}: {} faces", mode, applied);
    Ok(applied)
}

/// Copy the active face's configuration onto the other selected faces.
///
/// Each target keeps its own `ENABLED` bit.
pub fn copy_active_to_selected<M: MeshHost + ?Sized>(
    mesh: &mut M,
    prefs: &Preferences,
) -> UvResult<usize> {
    let Some(active) = mesh.active_face() else {
        return Err(UvError::EmptySelection);
    };
    let targets: Vec<FaceIndex> = require_selection(mesh)?
        .into_iter()
        .filter(|&face| face != active)
        .collect();
    if targets.is_empty() {
        return Err(UvError::EmptySelection);
    }

    if !check_tagged(&*mesh)? {
        return Err(UvError::NotTagged);
    }
    let source = MeshReader::open(&*mesh)?.config(active);
    let applied = rewrite_faces(mesh, &targets, prefs, |target| TextureConfig {
        flags: (source.flags - TexFlags::ENABLED) | (target.flags & TexFlags::ENABLED),
        ..source
    })?;
    debug!("Copied face {} onto {} faces", active, targets.len());
    Ok(applied)
}

/// Merged configuration of the selected faces, for display.
///
/// Untagged meshes and selections without enabled faces yield an empty summary.
pub fn read_selection_config<M: MeshHost + ?Sized>(mesh: &M) -> UvResult<PartialTextureConfig> {
    let mut merged = PartialTextureConfig::new();
    if !check_tagged(mesh)? {
        return Ok(merged);
    }
    let reader = MeshReader::open(mesh)?;
    for face in selected_faces(mesh) {
        merged.merge_face(&reader.config(face));
    }
    Ok(merged)
}

/// Move the selection by `mat_obj` with the texture locked in place.
///
/// `mat_world` is the same transform in world space. The selected faces'
/// configurations are rewritten, the selected vertices moved, and, with
/// auto-apply on, the selection and its neighbours reprojected. Everything is
/// committed once. Untagged meshes only move.
pub fn apply_locked_transform<M: MeshHost + ?Sized>(
    mesh: &mut M,
    mat_obj: &Mat4,
    mat_world: &Mat4,
    prefs: &Preferences,
) -> UvResult<usize> {
    let faces = require_selection(mesh)?;
    let vertices = selected_vertices(mesh);

    if !check_tagged(mesh)? {
        move_vertices(mesh, &vertices, mat_obj);
        mesh.geometry_updated();
        debug!("Moved {} vertices on an untagged mesh", vertices.len());
        return Ok(0);
    }

    let mut writer = MeshWriter::open(mesh)?;
    let locked = locked_transform(&mut writer, mat_obj, mat_world, &faces);
    move_vertices(writer.mesh_mut(), &vertices, mat_obj);
    if prefs.auto_apply {
        let touched = select_faces(writer.mesh(), ApplyMode::SelectedPlusIncident);
        apply_faces(&mut writer, &touched, ProjectionSettings::from(prefs));
    }
    writer.commit();
    debug!("Locked transform: {} faces, {} vertices", locked, vertices.len());
    Ok(locked)
}

fn move_vertices<M: MeshHost + ?Sized>(mesh: &mut M, vertices: &[usize], matrix: &Mat4) {
    for &vertex in vertices {
        let moved = matrix.transform_point3(mesh.vertex_position(vertex));
        mesh.set_vertex_position(vertex, moved);
    }
    mesh.recalc_face_normals();
}
