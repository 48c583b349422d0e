//! World-aligned UV projection.
//!
//! For every enabled face the UV axes are picked from the face normal (or the
//! locked axes), each corner position is projected onto them, and the result
//! is rotated, scaled and shifted by the face's texture configuration.

use bevy::math::{Mat3, Mat4, Vec2, Vec3};

use super::config::{AlignMode, TextureConfig};
use crate::math::{clamp_scale, frac, rotation_part, rotate_uv};
use crate::mesh::{FaceIndex, MeshHost, MeshWriter};
use crate::orientation::FaceOrientation;
use crate::prefs::Preferences;

/// Object-to-world transform of the mesh being projected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectFrame {
    pub world: Mat4,
    /// Rotation part of `world` used for normals.
    pub world_rotation: Mat3,
}

impl ObjectFrame {
    pub fn new(world: Mat4) -> Self {
        Self {
            world,
            world_rotation: rotation_part(&world),
        }
    }
}

impl Default for ObjectFrame {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY)
    }
}

/// Projection options taken from the preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionSettings {
    /// Move each face's UV island so its first corner lands in the unit square.
    pub wrap_uvs: bool,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self { wrap_uvs: true }
    }
}

impl From<&Preferences> for ProjectionSettings {
    fn from(prefs: &Preferences) -> Self {
        Self {
            wrap_uvs: prefs.wrap_uvs,
        }
    }
}

/// Face normal in the space the face is projected in.
pub fn working_normal(config: &TextureConfig, face_normal: Vec3, frame: &ObjectFrame) -> Vec3 {
    if config.object_space() {
        face_normal
    } else {
        frame.world_rotation * face_normal
    }
}

/// Canonical axes of the nearest world axis.
pub fn axis_aligned_axes(normal: Vec3) -> (Vec3, Vec3) {
    let o = FaceOrientation::from_normal(normal);
    (o.right(), o.up())
}

/// Axes following the face plane, with V kept as close to the canonical up as
/// the plane allows.
pub fn face_aligned_axes(normal: Vec3) -> (Vec3, Vec3) {
    let up = FaceOrientation::from_normal(normal).up();
    let u = normal.cross(up).normalize_or_zero();
    let v = u.cross(normal).normalize_or_zero();
    (-u, v)
}

/// UV axes for a face whose working normal is `normal`.
pub fn uv_axes(config: &TextureConfig, normal: Vec3) -> (Vec3, Vec3) {
    match config.align_mode() {
        AlignMode::Locked => config.locked_axes(),
        AlignMode::Face => face_aligned_axes(normal),
        AlignMode::World => axis_aligned_axes(normal),
    }
}

/// Translate a UV island so its first corner lies in `[0, 1)²`.
pub fn wrap_island(uvs: &mut [Vec2]) {
    let Some(&first) = uvs.first() else {
        return;
    };
    let delta = Vec2::new(frac(first.x), frac(first.y)) - first;
    for uv in uvs {
        *uv += delta;
    }
}

/// Project one face.
///
/// `positions` are the object-space corner positions in corner order.
/// Returns `None` for disabled faces and faces without corners.
pub fn project_face(
    config: &TextureConfig,
    face_normal: Vec3,
    positions: &[Vec3],
    frame: &ObjectFrame,
    settings: ProjectionSettings,
) -> Option<Vec<Vec2>> {
    if !config.is_enabled() || positions.is_empty() {
        return None;
    }

    let scale = clamp_scale(config.scale);
    let normal = working_normal(config, face_normal, frame);
    let (u, v) = uv_axes(config, normal);
    let object_space = config.object_space();

    let mut uvs: Vec<Vec2> = positions
        .iter()
        .map(|&p| {
            let p = if object_space {
                p
            } else {
                frame.world.transform_point3(p)
            };
            let uv = Vec2::new(p.dot(u), p.dot(v));
            rotate_uv(uv, config.rotation) / scale + config.shift
        })
        .collect();

    if settings.wrap_uvs {
        wrap_island(&mut uvs);
    }
    Some(uvs)
}

/// Object-space corner positions of a face.
pub fn face_positions<M: MeshHost + ?Sized>(mesh: &M, face: FaceIndex) -> Vec<Vec3> {
    mesh.face_corners(face)
        .map(|corner| mesh.vertex_position(mesh.corner_vertex(corner)))
        .collect()
}

/// Reproject `faces` into the writer's UV buffer. Returns how many faces got UVs.
pub fn apply_faces<M: MeshHost + ?Sized>(
    writer: &mut MeshWriter<'_, M>,
    faces: &[FaceIndex],
    settings: ProjectionSettings,
) -> usize {
    let frame = ObjectFrame::new(writer.mesh().world_matrix());
    let mut applied = 0;

    for &face in faces {
        let config = writer.config(face);
        let mesh = writer.mesh();
        let positions = face_positions(mesh, face);
        let normal = mesh.face_normal(face);
        let Some(uvs) = project_face(&config, normal, &positions, &frame, settings) else {
            continue;
        };
        writer.set_face_uvs(face, &uvs);
        applied += 1;
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::poly_mesh::tests::unit_cube;
    use crate::mesh::{ensure_tagged, MeshReader};
    use crate::texture::TexFlags;
    use bevy::math::Quat;
    use std::f32::consts::FRAC_PI_2;

    const NO_WRAP: ProjectionSettings = ProjectionSettings { wrap_uvs: false };
    const WRAP: ProjectionSettings = ProjectionSettings { wrap_uvs: true };

    fn enabled() -> TextureConfig {
        TextureConfig {
            flags: TexFlags::ENABLED,
            ..Default::default()
        }
    }

    fn top_face() -> (Vec3, Vec<Vec3>) {
        let mesh = unit_cube();
        (mesh.face_normal(0), face_positions(&mesh, 0))
    }

    #[test]
    fn disabled_or_empty_faces_are_skipped() {
        let (normal, positions) = top_face();
        let frame = ObjectFrame::default();
        assert!(project_face(&TextureConfig::default(), normal, &positions, &frame, WRAP).is_none());
        assert!(project_face(&enabled(), normal, &[], &frame, WRAP).is_none());
    }

    #[test]
    fn top_face_projects_onto_canonical_axes() {
        let (normal, positions) = top_face();
        let uvs = project_face(&enabled(), normal, &positions, &ObjectFrame::default(), NO_WRAP)
            .unwrap();
        for (p, uv) in positions.iter().zip(&uvs) {
            assert_eq!(*uv, Vec2::new(-p.x, p.y));
        }
    }

    #[test]
    fn top_face_wraps_into_unit_square() {
        let (normal, positions) = top_face();
        let frame = ObjectFrame::default();
        let raw = project_face(&enabled(), normal, &positions, &frame, NO_WRAP).unwrap();
        let wrapped = project_face(&enabled(), normal, &positions, &frame, WRAP).unwrap();

        let first = wrapped[0];
        assert!((0.0..1.0).contains(&first.x) && (0.0..1.0).contains(&first.y));
        let delta = wrapped[0] - raw[0];
        for (w, r) in wrapped.iter().zip(&raw) {
            assert!((*w - *r).abs_diff_eq(delta, 1e-6));
        }
        // integer corners all land on the lattice
        for uv in &wrapped {
            assert_eq!(*uv, uv.round());
        }
    }

    #[test]
    fn shift_offsets_every_corner() {
        let (normal, positions) = top_face();
        let frame = ObjectFrame::default();
        let base = project_face(&enabled(), normal, &positions, &frame, NO_WRAP).unwrap();
        let shifted_config = TextureConfig {
            shift: Vec2::splat(0.25),
            ..enabled()
        };
        let shifted = project_face(&shifted_config, normal, &positions, &frame, NO_WRAP).unwrap();
        for (a, b) in base.iter().zip(&shifted) {
            assert_eq!(*b, *a + Vec2::splat(0.25));
        }
    }

    #[test]
    fn scale_shrinks_uvs() {
        let (normal, positions) = top_face();
        let frame = ObjectFrame::default();
        let config = TextureConfig {
            scale: Vec2::splat(2.0),
            ..enabled()
        };
        let uvs = project_face(&config, normal, &positions, &frame, NO_WRAP).unwrap();
        // a 2-unit edge spans one UV unit
        assert_eq!((uvs[1] - uvs[0]).length(), 1.0);
        for (p, uv) in positions.iter().zip(&uvs) {
            assert_eq!(*uv, Vec2::new(-p.x, p.y) / 2.0);
        }
    }

    #[test]
    fn zero_scale_is_treated_as_one() {
        let (normal, positions) = top_face();
        let frame = ObjectFrame::default();
        let config = TextureConfig {
            scale: Vec2::ZERO,
            ..enabled()
        };
        assert_eq!(
            project_face(&config, normal, &positions, &frame, NO_WRAP),
            project_face(&enabled(), normal, &positions, &frame, NO_WRAP)
        );
    }

    #[test]
    fn rotation_turns_uvs() {
        let (normal, positions) = top_face();
        let frame = ObjectFrame::default();
        let config = TextureConfig {
            rotation: FRAC_PI_2,
            ..enabled()
        };
        let uvs = project_face(&config, normal, &positions, &frame, NO_WRAP).unwrap();
        for (p, uv) in positions.iter().zip(&uvs) {
            let expected = Vec2::new(-p.y, -p.x);
            assert!(uv.abs_diff_eq(expected, 1e-6), "{uv} vs {expected}");
        }
    }

    #[test]
    fn world_space_ignores_object_rotation() {
        let (normal, positions) = top_face();
        let rotated = ObjectFrame::new(Mat4::from_quat(Quat::from_rotation_z(FRAC_PI_2)));
        let a = project_face(&enabled(), normal, &positions, &ObjectFrame::default(), NO_WRAP).unwrap();
        let b = project_face(&enabled(), normal, &positions, &rotated, NO_WRAP).unwrap();

        // same UV set, assigned to different corners
        for uv in &b {
            assert!(a.iter().any(|x| x.abs_diff_eq(*uv, 1e-5)), "{uv} missing");
        }
        assert!(!a[0].abs_diff_eq(b[0], 1e-5));
    }

    #[test]
    fn object_space_follows_object() {
        let (normal, positions) = top_face();
        let config = TextureConfig {
            flags: TexFlags::ENABLED | TexFlags::OBJECT_SPACE,
            ..Default::default()
        };
        let rotated = ObjectFrame::new(Mat4::from_quat(Quat::from_rotation_z(FRAC_PI_2)));
        let a = project_face(&config, normal, &positions, &ObjectFrame::default(), WRAP);
        let b = project_face(&config, normal, &positions, &rotated, WRAP);
        assert_eq!(a, b);
    }

    #[test]
    fn world_space_follows_translation() {
        let (normal, positions) = top_face();
        let moved = ObjectFrame::new(Mat4::from_translation(Vec3::new(0.5, 0.0, 0.0)));
        let a = project_face(&enabled(), normal, &positions, &ObjectFrame::default(), NO_WRAP).unwrap();
        let b = project_face(&enabled(), normal, &positions, &moved, NO_WRAP).unwrap();
        for (a, b) in a.iter().zip(&b) {
            assert!((*b - *a).abs_diff_eq(Vec2::new(-0.5, 0.0), 1e-6));
        }
    }

    #[test]
    fn face_aligned_axes_lie_in_plane() {
        let normal = Vec3::new(0.3, 0.2, 0.9).normalize();
        let (u, v) = face_aligned_axes(normal);
        assert!((u.length() - 1.0).abs() < 1e-5);
        assert!((v.length() - 1.0).abs() < 1e-5);
        assert!(u.dot(v).abs() < 1e-5);
        assert!(u.dot(normal).abs() < 1e-5);
        assert!(v.dot(normal).abs() < 1e-5);
        // V leans towards the canonical up of the dominant axis
        assert!(v.dot(Vec3::Y) > 0.9);
    }

    #[test]
    fn locked_axes_are_used_verbatim() {
        let (normal, positions) = top_face();
        let config = TextureConfig {
            flags: TexFlags::ENABLED | TexFlags::ALIGN_LOCKED,
            lock_u: Vec3::X,
            lock_v: Vec3::Z,
            ..Default::default()
        };
        let uvs = project_face(&config, normal, &positions, &ObjectFrame::default(), NO_WRAP).unwrap();
        for (p, uv) in positions.iter().zip(&uvs) {
            assert_eq!(*uv, Vec2::new(p.x, p.z));
        }
    }

    #[test]
    fn projection_is_deterministic_and_idempotent() {
        let mut mesh = unit_cube();
        ensure_tagged(&mut mesh).unwrap();
        mesh.world = Mat4::from_rotation_translation(
            Quat::from_rotation_y(0.3),
            Vec3::new(0.1, 2.0, -3.0),
        );
        let faces: Vec<FaceIndex> = (0..mesh.faces.len()).collect();
        {
            let mut writer = MeshWriter::open(&mut mesh).unwrap();
            for &face in &faces {
                let config = TextureConfig {
                    shift: Vec2::new(0.1, 0.7),
                    scale: Vec2::new(0.5, 3.0),
                    rotation: 0.4,
                    flags: TexFlags::ENABLED,
                    ..Default::default()
                };
                writer.set_config(face, &config);
            }
            assert_eq!(apply_faces(&mut writer, &faces, WRAP), 6);
            writer.commit();
        }
        let first = mesh.read_uvs().unwrap();

        let mut writer = MeshWriter::open(&mut mesh).unwrap();
        apply_faces(&mut writer, &faces, WRAP);
        writer.commit();
        let second = mesh.read_uvs().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn disabled_faces_keep_their_uvs() {
        let mut mesh = unit_cube();
        ensure_tagged(&mut mesh).unwrap();
        let marker = vec![Vec2::splat(7.5); mesh.corner_verts.len()];
        mesh.write_uvs(&marker);

        let mut writer = MeshWriter::open(&mut mesh).unwrap();
        writer.set_config(0, &enabled());
        assert_eq!(apply_faces(&mut writer, &[0, 1, 2], WRAP), 1);
        writer.commit();

        let reader = MeshReader::open(&mesh).unwrap();
        assert_ne!(reader.face_uvs(0), &marker[0..4]);
        assert_eq!(reader.face_uvs(1), &marker[4..8]);
        assert_eq!(reader.face_uvs(2), &marker[8..12]);
    }
}
