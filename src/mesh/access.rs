//! Scoped read-only and read-write access to the texture attributes of a mesh.
//!
//! Opening copies the attribute columns and the active UV layer into local
//! buffers. A [`MeshWriter`] only flushes them back on [`MeshWriter::commit`];
//! dropping it releases the buffers without touching the mesh.

use bevy::math::{Vec2, Vec3};

use super::{check_tagged, CornerIndex, FaceIndex, MeshHost, FACE_ATTRIBUTES};
use crate::error::{UvError, UvResult};
use crate::texture::TextureConfig;

struct FaceBuffers {
    columns: [Vec<Vec3>; 4],
    uvs: Vec<Vec2>,
}

impl FaceBuffers {
    fn load<M: MeshHost + ?Sized>(mesh: &M) -> UvResult<Self> {
        let face_count = mesh.face_count();
        let mut columns: [Vec<Vec3>; 4] = Default::default();
        for (column, name) in columns.iter_mut().zip(FACE_ATTRIBUTES) {
            let values = mesh
                .read_face_vec3(name)
                .filter(|values| values.len() == face_count)
                .ok_or_else(|| UvError::MissingAttribute {
                    name: name.to_string(),
                })?;
            *column = values;
        }

        if mesh.active_uv_layer().is_none() {
            return Err(UvError::NoActiveUvLayer);
        }
        let corner_count = (0..face_count)
            .map(|face| mesh.face_corners(face).end)
            .max()
            .unwrap_or(0);
        let uvs = mesh
            .read_uvs()
            .filter(|uvs| uvs.len() >= corner_count)
            .ok_or(UvError::NoActiveUvLayer)?;

        Ok(Self { columns, uvs })
    }

    fn config(&self, face: FaceIndex) -> TextureConfig {
        TextureConfig::decode([
            self.columns[0][face],
            self.columns[1][face],
            self.columns[2][face],
            self.columns[3][face],
        ])
    }
}

/// Read-only view of a tagged mesh.
pub struct MeshReader<'m, M: MeshHost + ?Sized> {
    mesh: &'m M,
    buffers: FaceBuffers,
}

impl<'m, M: MeshHost + ?Sized> MeshReader<'m, M> {
    /// Open a tagged mesh for reading.
    ///
    /// Opening an untagged mesh read-only is a programming error and reported
    /// as [`UvError::MisuseOfReadonly`].
    pub fn open(mesh: &'m M) -> UvResult<Self> {
        if !check_tagged(mesh)? {
            return Err(UvError::MisuseOfReadonly);
        }
        let buffers = FaceBuffers::load(mesh)?;
        Ok(Self { mesh, buffers })
    }

    pub fn mesh(&self) -> &M {
        self.mesh
    }

    pub fn config(&self, face: FaceIndex) -> TextureConfig {
        self.buffers.config(face)
    }

    pub fn uv(&self, corner: CornerIndex) -> Vec2 {
        self.buffers.uvs[corner]
    }

    pub fn face_uvs(&self, face: FaceIndex) -> &[Vec2] {
        &self.buffers.uvs[self.mesh.face_corners(face)]
    }
}

/// Read-write view of a tagged mesh.
///
/// Holding the mesh mutably for the writer's lifetime rules out overlapping
/// writers on the same mesh.
pub struct MeshWriter<'m, M: MeshHost + ?Sized> {
    mesh: &'m mut M,
    buffers: FaceBuffers,
    configs_dirty: bool,
    uvs_dirty: bool,
    geometry_dirty: bool,
}

impl<'m, M: MeshHost + ?Sized> MeshWriter<'m, M> {
    /// Open a tagged mesh for writing. Use [`crate::mesh::ensure_tagged`] first
    /// on meshes that may not carry the attributes yet.
    pub fn open(mesh: &'m mut M) -> UvResult<Self> {
        if !check_tagged(&*mesh)? {
            return Err(UvError::NotTagged);
        }
        let buffers = FaceBuffers::load(&*mesh)?;
        Ok(Self {
            mesh,
            buffers,
            configs_dirty: false,
            uvs_dirty: false,
            geometry_dirty: false,
        })
    }

    pub fn mesh(&self) -> &M {
        &*self.mesh
    }

    /// Geometry access for operations that move vertices under an open writer.
    /// Texture attributes and UVs must go through the writer's buffers.
    pub(crate) fn mesh_mut(&mut self) -> &mut M {
        self.geometry_dirty = true;
        &mut *self.mesh
    }

    pub fn config(&self, face: FaceIndex) -> TextureConfig {
        self.buffers.config(face)
    }

    pub fn set_config(&mut self, face: FaceIndex, config: &TextureConfig) {
        for (column, value) in self.buffers.columns.iter_mut().zip(config.encode()) {
            column[face] = value;
        }
        self.configs_dirty = true;
    }

    pub fn uv(&self, corner: CornerIndex) -> Vec2 {
        self.buffers.uvs[corner]
    }

    pub fn face_uvs(&self, face: FaceIndex) -> &[Vec2] {
        &self.buffers.uvs[self.mesh.face_corners(face)]
    }

    /// Overwrite the UVs of every corner of `face`, in corner order.
    pub fn set_face_uvs(&mut self, face: FaceIndex, uvs: &[Vec2]) {
        let corners = self.mesh.face_corners(face);
        for (slot, uv) in self.buffers.uvs[corners].iter_mut().zip(uvs) {
            *slot = *uv;
        }
        self.uvs_dirty = true;
    }

    /// Flush modified buffers back to the mesh.
    ///
    /// The host is notified once, and only if something was written.
    pub fn commit(self) -> bool {
        let Self {
            mesh,
            buffers,
            configs_dirty,
            uvs_dirty,
            geometry_dirty,
        } = self;

        if configs_dirty {
            for (column, name) in buffers.columns.iter().zip(FACE_ATTRIBUTES) {
                mesh.write_face_vec3(name, column);
            }
        }
        if uvs_dirty {
            mesh.write_uvs(&buffers.uvs);
        }
        let written = configs_dirty || uvs_dirty || geometry_dirty;
        if written {
            mesh.geometry_updated();
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::poly_mesh::tests::unit_cube;
    use crate::mesh::{ensure_tagged, AttributeInfo, ATTR_SHIFT_FLAGS};
    use crate::texture::TexFlags;

    fn tagged_cube() -> crate::mesh::PolyMesh {
        let mut mesh = unit_cube();
        ensure_tagged(&mut mesh).unwrap();
        mesh
    }

    #[test]
    fn reader_rejects_untagged_mesh() {
        let mesh = unit_cube();
        assert!(matches!(
            MeshReader::open(&mesh),
            Err(UvError::MisuseOfReadonly)
        ));
    }

    #[test]
    fn writer_rejects_untagged_mesh() {
        let mut mesh = unit_cube();
        assert!(matches!(MeshWriter::open(&mut mesh), Err(UvError::NotTagged)));
    }

    #[test]
    fn missing_active_uv_layer() {
        let mut mesh = tagged_cube();
        mesh.active_uv = None;
        assert!(matches!(
            MeshWriter::open(&mut mesh),
            Err(UvError::NoActiveUvLayer)
        ));
    }

    #[test]
    fn short_attribute_column_is_an_error() {
        let mut mesh = tagged_cube();
        mesh.write_face_vec3(ATTR_SHIFT_FLAGS, &[Vec3::ZERO; 4]);
        assert_eq!(
            MeshReader::open(&mesh).err(),
            Some(UvError::MissingAttribute {
                name: ATTR_SHIFT_FLAGS.to_string(),
            })
        );
    }

    #[test]
    fn short_uv_layer_is_an_error() {
        let mut mesh = tagged_cube();
        mesh.uv_layers[0].uvs.truncate(10);
        assert!(matches!(
            MeshWriter::open(&mut mesh),
            Err(UvError::NoActiveUvLayer)
        ));
    }

    #[test]
    fn dropped_writer_does_not_flush() {
        let mut mesh = tagged_cube();
        {
            let mut writer = MeshWriter::open(&mut mesh).unwrap();
            let config = TextureConfig {
                flags: TexFlags::ENABLED,
                ..Default::default()
            };
            writer.set_config(0, &config);
            writer.set_face_uvs(0, &[Vec2::ONE; 4]);
        }
        assert_eq!(mesh.update_count, 0);
        let reader = MeshReader::open(&mesh).unwrap();
        assert!(!reader.config(0).is_enabled());
        assert_eq!(reader.face_uvs(0), &[Vec2::ZERO; 4]);
    }

    #[test]
    fn commit_flushes_once() {
        let mut mesh = tagged_cube();
        let mut writer = MeshWriter::open(&mut mesh).unwrap();
        let config = TextureConfig {
            shift: Vec2::new(0.25, 0.5),
            flags: TexFlags::ENABLED | TexFlags::OBJECT_SPACE,
            ..Default::default()
        };
        writer.set_config(2, &config);
        writer.set_face_uvs(2, &[Vec2::new(0.5, 0.5); 4]);
        assert!(writer.commit());
        assert_eq!(mesh.update_count, 1);

        let stored = mesh.read_face_vec3(ATTR_SHIFT_FLAGS).unwrap();
        assert_eq!(stored[2], Vec3::new(0.25, 0.5, 3.0));

        let reader = MeshReader::open(&mesh).unwrap();
        assert_eq!(reader.config(2), config);
        assert_eq!(reader.face_uvs(2), &[Vec2::new(0.5, 0.5); 4]);
        assert_eq!(mesh.attribute_info(ATTR_SHIFT_FLAGS), Some(AttributeInfo::FACE_FLOAT3));
    }

    #[test]
    fn clean_commit_does_not_notify() {
        let mut mesh = tagged_cube();
        let writer = MeshWriter::open(&mut mesh).unwrap();
        assert!(!writer.commit());
        assert_eq!(mesh.update_count, 0);
    }
}
