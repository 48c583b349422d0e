//! Texture-locked transforms.
//!
//! Before selected faces are moved, their configurations are rewritten so the
//! next projection puts the texture exactly where it was relative to the
//! surface. Shear is not compensated: the recorded axes stop being orthogonal
//! and the texture shears with them.

use bevy::math::{Mat4, Vec2, Vec3};

use super::config::{AlignMode, TextureConfig};
use super::projection::{
    axis_aligned_axes, face_aligned_axes, uv_axes, working_normal, ObjectFrame,
};
use crate::math::{clamp_scale, frac_signed, is_identity, rotate_uv, split_affine, AXIS_EPSILON};
use crate::mesh::{FaceIndex, MeshHost, MeshWriter};

fn same_basis(a: (Vec3, Vec3), b: (Vec3, Vec3)) -> bool {
    a.0.abs_diff_eq(b.0, AXIS_EPSILON) && a.1.abs_diff_eq(b.1, AXIS_EPSILON)
}

/// Rewrite one face's configuration for the transform `mat_obj` (object
/// space) / `mat_world` (world space).
///
/// Disabled faces are returned unchanged.
pub fn lock_config(
    config: &TextureConfig,
    face_normal: Vec3,
    frame: &ObjectFrame,
    mat_obj: &Mat4,
    mat_world: &Mat4,
) -> TextureConfig {
    if !config.is_enabled() {
        return *config;
    }

    let mut out = *config;
    let matrix = if config.object_space() {
        mat_obj
    } else {
        mat_world
    };
    let (translation, rotation_scale) = split_affine(matrix);

    let mut scale = clamp_scale(config.scale);
    let normal = working_normal(config, face_normal, frame);
    let (mut u, mut v) = uv_axes(config, normal);

    if !is_identity(&rotation_scale) {
        let u_moved = rotation_scale * u;
        let v_moved = rotation_scale * v;
        scale.x *= u_moved.length();
        scale.y *= v_moved.length();
        u = u_moved.normalize_or_zero();
        v = v_moved.normalize_or_zero();

        let normal = (rotation_scale * normal).normalize_or_zero();
        let mode = if same_basis((u, v), axis_aligned_axes(normal)) {
            AlignMode::World
        } else if same_basis((u, v), face_aligned_axes(normal)) {
            AlignMode::Face
        } else {
            AlignMode::Locked
        };

        out.flags = out.flags.with_align_mode(mode);
        if mode == AlignMode::Locked {
            out.lock_u = u;
            out.lock_v = v;
        }
        out.scale = scale;
        scale = clamp_scale(scale);
    }

    let along = Vec2::new(translation.dot(u), translation.dot(v));
    let delta = rotate_uv(along, config.rotation) / scale;
    out.shift = Vec2::new(
        frac_signed(config.shift.x - delta.x),
        frac_signed(config.shift.y - delta.y),
    );
    out
}

/// Rewrite the configurations of `faces` in the writer for a locked transform.
///
/// The caller moves the vertices afterwards. Returns how many faces changed.
pub fn locked_transform<M: MeshHost + ?Sized>(
    writer: &mut MeshWriter<'_, M>,
    mat_obj: &Mat4,
    mat_world: &Mat4,
    faces: &[FaceIndex],
) -> usize {
    let frame = ObjectFrame::new(writer.mesh().world_matrix());
    let mut changed = 0;
    for &face in faces {
        let config = writer.config(face);
        if !config.is_enabled() {
            continue;
        }
        let normal = writer.mesh().face_normal(face);
        let locked = lock_config(&config, normal, &frame, mat_obj, mat_world);
        writer.set_config(face, &locked);
        changed += 1;
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::poly_mesh::tests::unit_cube;
    use crate::texture::projection::{face_positions, project_face, ProjectionSettings};
    use crate::texture::TexFlags;
    use bevy::math::Quat;
    use std::f32::consts::FRAC_PI_2;

    const NO_WRAP: ProjectionSettings = ProjectionSettings { wrap_uvs: false };

    fn config(extra: TexFlags) -> TextureConfig {
        TextureConfig {
            shift: Vec2::new(0.3, 0.6),
            scale: Vec2::new(1.0, 1.0),
            flags: TexFlags::ENABLED | extra,
            ..Default::default()
        }
    }

    fn assert_same_mod_one(a: &[Vec2], b: &[Vec2]) {
        assert_eq!(a.len(), b.len());
        for (a, b) in a.iter().zip(b) {
            let d = *a - *b;
            let off = d - d.round();
            assert!(off.abs().max_element() < 1e-4, "{a} vs {b}");
        }
    }

    /// Project `face` before and after moving it by `mat_obj` with texture lock.
    fn round_trip(
        config: TextureConfig,
        face: FaceIndex,
        world: Mat4,
        mat_obj: Mat4,
    ) -> (TextureConfig, Vec<Vec2>, Vec<Vec2>) {
        let mesh = unit_cube();
        let frame = ObjectFrame::new(world);
        let mat_world = world * mat_obj * world.inverse();
        let normal = mesh.face_normal(face);
        let positions = face_positions(&mesh, face);
        let before = project_face(&config, normal, &positions, &frame, NO_WRAP).unwrap();

        let locked = lock_config(&config, normal, &frame, &mat_obj, &mat_world);
        let moved: Vec<Vec3> = positions.iter().map(|&p| mat_obj.transform_point3(p)).collect();
        let moved_normal = mat_obj.transform_vector3(normal).normalize();
        let after = project_face(&locked, moved_normal, &moved, &frame, NO_WRAP).unwrap();
        (locked, before, after)
    }

    #[test]
    fn translation_only_updates_shift() {
        let mat = Mat4::from_translation(Vec3::new(0.5, 0.25, 0.0));
        let (locked, before, after) = round_trip(config(TexFlags::empty()), 0, Mat4::IDENTITY, mat);
        assert_eq!(locked.flags, TexFlags::ENABLED);
        assert_eq!(locked.scale, Vec2::ONE);
        // u = -x, v = y on the top face
        assert!(locked.shift.abs_diff_eq(Vec2::new(0.8, 0.35), 1e-6));
        assert_same_mod_one(&before, &after);
    }

    #[test]
    fn disabled_face_is_untouched() {
        let disabled = TextureConfig::default();
        let mat = Mat4::from_translation(Vec3::X);
        let frame = ObjectFrame::default();
        assert_eq!(lock_config(&disabled, Vec3::Z, &frame, &mat, &mat), disabled);
    }

    #[test]
    fn quarter_turn_stays_axis_aligned() {
        let mat = Mat4::from_quat(Quat::from_rotation_z(FRAC_PI_2));
        // +X wall turns into the +Y wall
        let (locked, before, after) = round_trip(config(TexFlags::empty()), 2, Mat4::IDENTITY, mat);
        assert_eq!(locked.flags.align_mode(), AlignMode::World);
        assert_same_mod_one(&before, &after);
    }

    #[test]
    fn arbitrary_rotation_locks_axes() {
        let mat = Mat4::from_quat(Quat::from_rotation_z(0.5));
        let (locked, before, after) = round_trip(config(TexFlags::empty()), 2, Mat4::IDENTITY, mat);
        assert_eq!(locked.flags.align_mode(), AlignMode::Locked);
        assert!((locked.lock_u.length() - 1.0).abs() < 1e-5);
        assert!((locked.lock_v.length() - 1.0).abs() < 1e-5);
        assert!(locked.lock_u.dot(locked.lock_v).abs() < 1e-5);
        assert_same_mod_one(&before, &after);
    }

    #[test]
    fn rotation_about_pivot_keeps_texture() {
        let pivot = Vec3::new(3.0, -2.0, 1.0);
        let mat = Mat4::from_translation(pivot)
            * Mat4::from_quat(Quat::from_rotation_x(0.7))
            * Mat4::from_translation(-pivot);
        let rotated = TextureConfig {
            rotation: 0.9,
            ..config(TexFlags::empty())
        };
        let (locked, before, after) = round_trip(rotated, 0, Mat4::IDENTITY, mat);
        assert_eq!(locked.flags.align_mode(), AlignMode::Locked);
        assert_same_mod_one(&before, &after);
    }

    #[test]
    fn uniform_scale_scales_texture() {
        let mat = Mat4::from_scale(Vec3::splat(2.0));
        let (locked, before, after) = round_trip(config(TexFlags::empty()), 0, Mat4::IDENTITY, mat);
        assert!(locked.scale.abs_diff_eq(Vec2::splat(2.0), 1e-6));
        assert_eq!(locked.flags.align_mode(), AlignMode::World);
        assert_same_mod_one(&before, &after);
    }

    #[test]
    fn face_aligned_face_stays_face_aligned() {
        let mat = Mat4::from_translation(Vec3::new(0.0, 0.0, 0.4))
            * Mat4::from_quat(Quat::from_rotation_x(0.2));
        let (locked, before, after) =
            round_trip(config(TexFlags::ALIGN_FACE), 0, Mat4::IDENTITY, mat);
        assert_eq!(locked.flags.align_mode(), AlignMode::Face);
        assert_same_mod_one(&before, &after);
    }

    #[test]
    fn world_space_with_transformed_object() {
        let world = Mat4::from_rotation_translation(
            Quat::from_rotation_z(FRAC_PI_2),
            Vec3::new(5.0, 1.0, 0.0),
        );
        let mat_obj = Mat4::from_translation(Vec3::new(0.3, 0.0, 0.1));
        let (_, before, after) = round_trip(config(TexFlags::empty()), 2, world, mat_obj);
        assert_same_mod_one(&before, &after);

        let mat_obj = Mat4::from_quat(Quat::from_rotation_y(0.4));
        let (_, before, after) = round_trip(config(TexFlags::empty()), 0, world, mat_obj);
        assert_same_mod_one(&before, &after);
    }

    #[test]
    fn object_space_uses_object_matrix() {
        let world = Mat4::from_quat(Quat::from_rotation_x(1.0));
        let mat_obj = Mat4::from_translation(Vec3::new(0.2, 0.0, 0.0))
            * Mat4::from_quat(Quat::from_rotation_z(0.3));
        let (locked, before, after) =
            round_trip(config(TexFlags::OBJECT_SPACE), 0, world, mat_obj);
        assert!(locked.object_space());
        assert_same_mod_one(&before, &after);
    }

    #[test]
    fn shift_stays_in_range() {
        let mat = Mat4::from_translation(Vec3::new(-13.7, 42.2, 0.0));
        let (locked, before, after) = round_trip(config(TexFlags::empty()), 0, Mat4::IDENTITY, mat);
        assert!(locked.shift.x.abs() < 1.0 && locked.shift.y.abs() < 1.0);
        assert_same_mod_one(&before, &after);
    }
}
