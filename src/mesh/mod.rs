//! Host mesh capabilities and the attribute schema used to store texture
//! configurations on faces.
//!
//! The texturing engine never owns mesh storage. Hosts implement [`MeshHost`]
//! and the engine goes through [`MeshReader`]/[`MeshWriter`] for all reads and
//! writes, so the on-mesh packing stays a concern of this module alone.

mod access;
pub mod poly_mesh;

use bevy::log::debug;
use bevy::math::{Mat4, Vec2, Vec3};
use std::fmt;
use std::ops::Range;

use crate::error::{UvError, UvResult};
use crate::texture::TextureConfig;

pub use access::{MeshReader, MeshWriter};
pub use poly_mesh::PolyMesh;

/// Index of a face in the host mesh.
pub type FaceIndex = usize;
/// Index of a face corner (loop) in the host mesh.
pub type CornerIndex = usize;
/// Index of a vertex in the host mesh.
pub type VertexIndex = usize;

/// `(shift.x, shift.y, flags)` per face.
pub const ATTR_SHIFT_FLAGS: &str = "AlignUV_ShiftFlags";
/// `(scale.x, scale.y, rotation)` per face.
pub const ATTR_SCALE_ROT: &str = "AlignUV_ScaleRot";
/// Locked U axis per face.
pub const ATTR_LOCK_U_AXIS: &str = "AlignUV_LockUAxis";
/// Locked V axis per face.
pub const ATTR_LOCK_V_AXIS: &str = "AlignUV_LockVAxis";

/// Every attribute a tagged mesh carries, in storage order.
pub const FACE_ATTRIBUTES: [&str; 4] = [
    ATTR_SHIFT_FLAGS,
    ATTR_SCALE_ROT,
    ATTR_LOCK_U_AXIS,
    ATTR_LOCK_V_AXIS,
];

/// Name given to the UV layer created when a mesh has none.
pub const DEFAULT_UV_LAYER: &str = "UVMap";

/// Mesh element an attribute is stored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeDomain {
    Point,
    Face,
    Corner,
}

/// Element type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Float,
    Float2,
    Float3,
    Color,
    Int,
    Bool,
}

/// Domain and element type of a named attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeInfo {
    pub domain: AttributeDomain,
    pub kind: AttributeKind,
}

impl AttributeInfo {
    /// The layout every texture attribute must have.
    pub const FACE_FLOAT3: AttributeInfo = AttributeInfo {
        domain: AttributeDomain::Face,
        kind: AttributeKind::Float3,
    };
}

impl fmt::Display for AttributeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {:?}", self.domain, self.kind)
    }
}

/// Capabilities the texturing engine needs from a host mesh.
///
/// Corners of a face are contiguous, so a face is described by a corner range.
/// UVs are read and written per corner on the active UV layer.
pub trait MeshHost {
    fn face_count(&self) -> usize;
    fn face_corners(&self, face: FaceIndex) -> Range<CornerIndex>;
    fn corner_vertex(&self, corner: CornerIndex) -> VertexIndex;
    /// Unit face normal in object space. Flat shading is assumed.
    fn face_normal(&self, face: FaceIndex) -> Vec3;
    fn face_selected(&self, face: FaceIndex) -> bool;
    fn active_face(&self) -> Option<FaceIndex>;

    fn vertex_count(&self) -> usize;
    fn vertex_position(&self, vertex: VertexIndex) -> Vec3;
    fn set_vertex_position(&mut self, vertex: VertexIndex, position: Vec3);
    fn vertex_selected(&self, vertex: VertexIndex) -> bool;
    /// Recompute face normals after vertices moved.
    fn recalc_face_normals(&mut self);

    /// Object-to-world transform.
    fn world_matrix(&self) -> Mat4;
    fn is_edit_mode(&self) -> bool;

    fn attribute_info(&self, name: &str) -> Option<AttributeInfo>;
    fn add_attribute(&mut self, name: &str, info: AttributeInfo);
    fn read_face_vec3(&self, name: &str) -> Option<Vec<Vec3>>;
    fn write_face_vec3(&mut self, name: &str, values: &[Vec3]);

    fn uv_layer_count(&self) -> usize;
    fn add_uv_layer(&mut self, name: &str);
    fn active_uv_layer(&self) -> Option<usize>;
    /// Per-corner UVs of the active layer.
    fn read_uvs(&self) -> Option<Vec<Vec2>>;
    fn write_uvs(&mut self, uvs: &[Vec2]);

    /// Called once after a writer flushed its buffers.
    fn geometry_updated(&mut self) {}
}

/// Check the texture attributes on `mesh`.
///
/// Returns `Ok(true)` when every attribute exists with the right layout and a
/// UV layer is present, `Ok(false)` when the mesh is (partially) untagged, and
/// an error when a texture attribute name is taken by a wrong-typed attribute.
pub fn check_tagged<M: MeshHost + ?Sized>(mesh: &M) -> UvResult<bool> {
    let mut tagged = mesh.uv_layer_count() > 0;
    for name in FACE_ATTRIBUTES {
        match mesh.attribute_info(name) {
            Some(info) if info == AttributeInfo::FACE_FLOAT3 => {}
            Some(found) => {
                return Err(UvError::AttributeConflict {
                    name: name.to_string(),
                    found,
                });
            }
            None => tagged = false,
        }
    }
    Ok(tagged)
}

/// Whether `mesh` carries the full attribute set. Conflicts count as untagged.
pub fn is_tagged<M: MeshHost + ?Sized>(mesh: &M) -> bool {
    check_tagged(mesh).unwrap_or(false)
}

/// Create whichever texture attributes and UV layer are missing.
///
/// Fails without touching the mesh when any name collides with a
/// wrong-typed attribute.
pub fn ensure_tagged<M: MeshHost + ?Sized>(mesh: &mut M) -> UvResult<()> {
    if check_tagged(mesh)? {
        return Ok(());
    }

    // new columns start out holding the default configuration
    let defaults = TextureConfig::default().encode();
    for (name, default) in FACE_ATTRIBUTES.into_iter().zip(defaults) {
        if mesh.attribute_info(name).is_none() {
            mesh.add_attribute(name, AttributeInfo::FACE_FLOAT3);
            let values = vec![default; mesh.face_count()];
            mesh.write_face_vec3(name, &values);
            debug!("Created face attribute {name}");
        }
    }
    if mesh.uv_layer_count() == 0 {
        mesh.add_uv_layer(DEFAULT_UV_LAYER);
        debug!("Created UV layer {DEFAULT_UV_LAYER}");
    }
    Ok(())
}
