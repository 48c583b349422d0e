//! Texture-locked modal transforms.
//!
//! The host starts a transform with [`begin_locked_transform`], drives the
//! interaction itself and ends it with exactly one of
//! [`TransformHandle::finalise`] or [`TransformHandle::discard`].

use bevy::log::debug;
use bevy::math::{Mat3, Mat4, Vec3};
use std::fmt;

use super::selected_vertices;
use crate::error::{UvError, UvResult};
use crate::mesh::MeshHost;
use crate::ops::apply_locked_transform;
use crate::prefs::Preferences;
use crate::texture::projection::face_positions;

/// Kind of modal transform reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformKind {
    Translate,
    Rotate,
    Resize,
    Shear,
    EdgeSlide,
    VertexSlide,
    Other(String),
}

impl TransformKind {
    /// Whether the transform can be expressed as one affine matrix.
    pub fn is_affine(&self) -> bool {
        matches!(
            self,
            TransformKind::Translate
                | TransformKind::Rotate
                | TransformKind::Resize
                | TransformKind::Shear
        )
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformKind::Translate => write!(f, "translate"),
            TransformKind::Rotate => write!(f, "rotate"),
            TransformKind::Resize => write!(f, "resize"),
            TransformKind::Shear => write!(f, "shear"),
            TransformKind::EdgeSlide => write!(f, "edge slide"),
            TransformKind::VertexSlide => write!(f, "vertex slide"),
            TransformKind::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Where rotations and scales are centred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PivotMode {
    #[default]
    BoundingBoxCenter,
    Cursor,
    Median,
    ActiveElement,
    IndividualOrigins,
}

impl fmt::Display for PivotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PivotMode::BoundingBoxCenter => "bounding box center",
            PivotMode::Cursor => "3D cursor",
            PivotMode::Median => "median point",
            PivotMode::ActiveElement => "active element",
            PivotMode::IndividualOrigins => "individual origins",
        };
        f.write_str(name)
    }
}

fn selected_world_positions<M: MeshHost + ?Sized>(meshes: &[&M]) -> Vec<Vec3> {
    meshes
        .iter()
        .filter(|mesh| mesh.is_edit_mode())
        .flat_map(|mesh| {
            let world = mesh.world_matrix();
            selected_vertices(*mesh)
                .into_iter()
                .map(move |v| world.transform_point3(mesh.vertex_position(v)))
        })
        .collect()
}

fn active_face_center<M: MeshHost + ?Sized>(meshes: &[&M]) -> Option<Vec3> {
    meshes
        .iter()
        .filter(|mesh| mesh.is_edit_mode())
        .find_map(|mesh| {
            let face = mesh.active_face()?;
            let positions = face_positions(*mesh, face);
            if positions.is_empty() {
                return None;
            }
            let center = positions.iter().sum::<Vec3>() / positions.len() as f32;
            Some(mesh.world_matrix().transform_point3(center))
        })
}

/// World-space pivot of the selection over all edit-mode meshes.
pub fn compute_pivot<M: MeshHost + ?Sized>(
    meshes: &[&M],
    mode: PivotMode,
    cursor: Vec3,
) -> UvResult<Vec3> {
    let median = |points: &[Vec3]| points.iter().sum::<Vec3>() / points.len() as f32;

    match mode {
        PivotMode::Cursor => Ok(cursor),
        PivotMode::IndividualOrigins => Err(UvError::UnsupportedPivot {
            mode: mode.to_string(),
        }),
        PivotMode::ActiveElement => match active_face_center(meshes) {
            Some(center) => Ok(center),
            None => compute_pivot(meshes, PivotMode::Median, cursor),
        },
        PivotMode::Median => {
            let points = selected_world_positions(meshes);
            if points.is_empty() {
                return Err(UvError::EmptySelection);
            }
            Ok(median(&points))
        }
        PivotMode::BoundingBoxCenter => {
            let points = selected_world_positions(meshes);
            if points.is_empty() {
                return Err(UvError::EmptySelection);
            }
            let (min, max) = points.iter().fold(
                (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
                |(min, max), &p| (min.min(p), max.max(p)),
            );
            Ok((min + max) * 0.5)
        }
    }
}

/// Build `(mat_obj, mat_world)` for one object.
///
/// `world` is the object-to-world matrix, `pivot` the world-space pivot,
/// `orientation` the world-space transform orientation and `op` the operator's
/// raw transform expressed in that orientation.
pub fn compose_transforms(world: &Mat4, pivot: Vec3, orientation: Mat3, op: &Mat4) -> (Mat4, Mat4) {
    let around = |point: Vec3, basis: Mat3| {
        let basis = Mat4::from_mat3(basis);
        Mat4::from_translation(point)
            * basis
            * *op
            * basis.inverse()
            * Mat4::from_translation(-point)
    };

    let mat_world = around(pivot, orientation);

    let to_object = world.inverse();
    let pivot_obj = to_object.transform_point3(pivot);
    let orientation_obj = Mat3::from_mat4(to_object) * orientation;
    let mat_obj = around(pivot_obj, orientation_obj);

    (mat_obj, mat_world)
}

/// An in-progress texture-locked transform.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformHandle {
    kind: TransformKind,
    pivot: PivotMode,
    orientation: Mat3,
}

/// Start a texture-locked transform.
///
/// Transforms that are not a single affine matrix, and per-island pivots, are
/// rejected before anything is touched.
pub fn begin_locked_transform(
    kind: TransformKind,
    pivot: PivotMode,
    orientation: Mat3,
) -> UvResult<TransformHandle> {
    if !kind.is_affine() {
        return Err(UvError::UnsupportedModalTransform {
            kind: kind.to_string(),
        });
    }
    if pivot == PivotMode::IndividualOrigins {
        return Err(UvError::UnsupportedPivot {
            mode: pivot.to_string(),
        });
    }
    debug!("Begin locked {} around {}", kind, pivot);
    Ok(TransformHandle {
        kind,
        pivot,
        orientation,
    })
}

impl TransformHandle {
    pub fn kind(&self) -> &TransformKind {
        &self.kind
    }

    pub fn pivot_mode(&self) -> PivotMode {
        self.pivot
    }

    /// Apply the final operator matrix `op` to every edit-mode mesh with a
    /// selection. Returns the number of face configurations rewritten.
    ///
    /// Meshes are committed one by one; an error stops at the failing mesh
    /// and earlier meshes keep their changes.
    pub fn finalise<M: MeshHost + ?Sized>(
        self,
        meshes: &mut [&mut M],
        op: &Mat4,
        cursor: Vec3,
        prefs: &Preferences,
    ) -> UvResult<usize> {
        let pivot = {
            let views: Vec<&M> = meshes.iter().map(|mesh| &**mesh).collect();
            compute_pivot(&views, self.pivot, cursor)?
        };

        let mut locked = 0;
        let mut moved_any = false;
        for mesh in meshes.iter_mut() {
            if !mesh.is_edit_mode() {
                continue;
            }
            let (mat_obj, mat_world) =
                compose_transforms(&mesh.world_matrix(), pivot, self.orientation, op);
            match apply_locked_transform(&mut **mesh, &mat_obj, &mat_world, prefs) {
                Ok(count) => {
                    locked += count;
                    moved_any = true;
                }
                Err(UvError::EmptySelection) => {}
                Err(e) => return Err(e),
            }
        }

        if !moved_any {
            return Err(UvError::EmptySelection);
        }
        debug!("Finished locked {}: {} faces", self.kind, locked);
        Ok(locked)
    }

    /// Cancel the transform. Nothing was written, so nothing is undone.
    pub fn discard(self) {
        debug!("Discarded locked {}", self.kind);
    }
}
