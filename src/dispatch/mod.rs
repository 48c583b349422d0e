//! Which faces an operation touches, automatic reprojection, and the
//! texture-locked modal transforms.

pub mod auto_apply;
pub mod transform;

pub use auto_apply::{AutoApply, GeometryEvent, IMMEDIATE_THRESHOLD};
pub use transform::{
    begin_locked_transform, compose_transforms, compute_pivot, PivotMode, TransformHandle,
    TransformKind,
};

use crate::mesh::{FaceIndex, MeshHost, VertexIndex};

/// Set of faces an operation is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ApplyMode {
    /// Every face of the mesh.
    #[default]
    Full,
    /// Selected faces.
    SelectedOnly,
    /// Selected faces and faces touching a selected vertex.
    SelectedPlusIncident,
}

/// What started an apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyTrigger {
    /// An operator invoked by the user.
    User,
    /// Automatic reprojection after a geometry change.
    Auto,
}

impl ApplyMode {
    pub fn for_context(edit_mode: bool, trigger: ApplyTrigger) -> Self {
        match (edit_mode, trigger) {
            (false, _) => ApplyMode::Full,
            (true, ApplyTrigger::User) => ApplyMode::SelectedOnly,
            // a moved vertex changes the normals of every face around it
            (true, ApplyTrigger::Auto) => ApplyMode::SelectedPlusIncident,
        }
    }
}

fn touches_selected_vertex<M: MeshHost + ?Sized>(mesh: &M, face: FaceIndex) -> bool {
    mesh.face_corners(face)
        .any(|corner| mesh.vertex_selected(mesh.corner_vertex(corner)))
}

/// Faces of `mesh` covered by `mode`, in ascending order.
pub fn select_faces<M: MeshHost + ?Sized>(mesh: &M, mode: ApplyMode) -> Vec<FaceIndex> {
    let faces = 0..mesh.face_count();
    match mode {
        ApplyMode::Full => faces.collect(),
        ApplyMode::SelectedOnly => faces.filter(|&f| mesh.face_selected(f)).collect(),
        ApplyMode::SelectedPlusIncident => faces
            .filter(|&f| mesh.face_selected(f) || touches_selected_vertex(mesh, f))
            .collect(),
    }
}

/// Selected faces of `mesh`.
pub fn selected_faces<M: MeshHost + ?Sized>(mesh: &M) -> Vec<FaceIndex> {
    select_faces(mesh, ApplyMode::SelectedOnly)
}

/// Vertices moved by a transform of the selection: selected vertices and
/// every vertex of a selected face, in ascending order.
pub fn selected_vertices<M: MeshHost + ?Sized>(mesh: &M) -> Vec<VertexIndex> {
    let mut moving = vec![false; mesh.vertex_count()];
    for (vertex, slot) in moving.iter_mut().enumerate() {
        *slot = mesh.vertex_selected(vertex);
    }
    for face in selected_faces(mesh) {
        for corner in mesh.face_corners(face) {
            if let Some(slot) = moving.get_mut(mesh.corner_vertex(corner)) {
                *slot = true;
            }
        }
    }
    moving
        .iter()
        .enumerate()
        .filter_map(|(vertex, &on)| on.then_some(vertex))
        .collect()
}
