//! Small vector helpers shared by the projection and locked-transform engines.
//!
//! Everything here operates on `bevy::math` (glam) types.

use bevy::math::{Mat3, Mat4, Vec2, Vec3};

/// Scale components with a magnitude below this are treated as 1.
pub const SCALE_EPSILON: f32 = 1e-6;

/// Tolerance used when comparing UV bases against the canonical ones.
pub const AXIS_EPSILON: f32 = 1e-4;

/// Tolerance used when testing a rotation-scale block for identity.
pub const IDENTITY_EPSILON: f32 = 1e-6;

/// Fractional part in `[0, 1)`.
#[inline]
pub fn frac(f: f32) -> f32 {
    f - f.floor()
}

/// Fractional part keeping the sign of `f`, so `-1.2` becomes `-0.2`.
///
/// Values already inside `(-1, 1)` come back unchanged. Negative zero is
/// normalised to positive zero.
#[inline]
pub fn frac_signed(f: f32) -> f32 {
    f.fract() + 0.0
}

/// Index of the largest `|v[i]|` plus the two remaining indices in ascending order.
///
/// Ties resolve in favour of X, then Y, then Z.
pub fn dominant_axis(v: Vec3) -> (usize, usize, usize) {
    let a = v.abs();
    if a.x >= a.y && a.x >= a.z {
        (0, 1, 2)
    } else if a.y >= a.z {
        (1, 0, 2)
    } else {
        (2, 0, 1)
    }
}

/// Rotate a UV coordinate counter-clockwise by `radians`.
#[inline]
pub fn rotate_uv(uv: Vec2, radians: f32) -> Vec2 {
    if radians == 0.0 {
        return uv;
    }
    let (sin, cos) = radians.sin_cos();
    Vec2::new(uv.x * cos - uv.y * sin, uv.x * sin + uv.y * cos)
}

/// Replace any scale component that is (nearly) zero with 1.
#[inline]
pub fn clamp_scale(scale: Vec2) -> Vec2 {
    Vec2::new(clamp_scale_component(scale.x), clamp_scale_component(scale.y))
}

#[inline]
fn clamp_scale_component(s: f32) -> f32 {
    if s.abs() < SCALE_EPSILON || !s.is_finite() {
        1.0
    } else {
        s
    }
}

/// Split an affine 4x4 matrix into its translation and its rotation-scale block.
#[inline]
pub fn split_affine(m: &Mat4) -> (Vec3, Mat3) {
    (m.w_axis.truncate(), Mat3::from_mat4(*m))
}

/// Whether a rotation-scale block is the identity within [`IDENTITY_EPSILON`].
pub fn is_identity(m: &Mat3) -> bool {
    m.abs_diff_eq(Mat3::IDENTITY, IDENTITY_EPSILON)
}

/// Rotation part of an object-to-world matrix, with scale and translation removed.
pub fn rotation_part(m: &Mat4) -> Mat3 {
    let (_, rotation, _) = m.to_scale_rotation_translation();
    Mat3::from_quat(rotation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn frac_signed_keeps_sign() {
        assert_eq!(frac_signed(0.25), 0.25);
        assert_eq!(frac_signed(-0.75), -0.75);
        assert!((frac_signed(-1.2) - -0.2).abs() < 1e-6);
        assert!((frac_signed(3.5) - 0.5).abs() < 1e-6);
        let zero = frac_signed(-1.0);
        assert_eq!(zero, 0.0);
        assert!(zero.is_sign_positive());
    }

    #[test]
    fn frac_is_positive() {
        assert_eq!(frac(-1.0), 0.0);
        assert!((frac(-0.25) - 0.75).abs() < 1e-6);
        assert!((frac(2.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn dominant_axis_tie_break() {
        assert_eq!(dominant_axis(Vec3::new(0.0, 0.0, -1.0)), (2, 0, 1));
        assert_eq!(dominant_axis(Vec3::new(0.0, 2.0, 1.0)), (1, 0, 2));
        // X wins ties against Y and Z, Y wins against Z
        assert_eq!(dominant_axis(Vec3::new(1.0, -1.0, 1.0)), (0, 1, 2));
        assert_eq!(dominant_axis(Vec3::new(0.0, 1.0, -1.0)), (1, 0, 2));
    }

    #[test]
    fn rotate_quarter_turn() {
        let r = rotate_uv(Vec2::X, FRAC_PI_2);
        assert!(r.abs_diff_eq(Vec2::Y, 1e-6));
    }

    #[test]
    fn zero_scale_clamps_to_one() {
        assert_eq!(clamp_scale(Vec2::new(0.0, 2.0)), Vec2::new(1.0, 2.0));
        assert_eq!(clamp_scale(Vec2::new(-0.5, 1e-9)), Vec2::new(-0.5, 1.0));
    }

    #[test]
    fn split_affine_parts() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)) * Mat4::from_scale(Vec3::splat(2.0));
        let (t, rs) = split_affine(&m);
        assert_eq!(t, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(rs, Mat3::from_diagonal(Vec3::splat(2.0)));
        assert!(!is_identity(&rs));
        assert!(is_identity(&Mat3::IDENTITY));
    }

    #[test]
    fn rotation_part_drops_scale() {
        let m = Mat4::from_scale_rotation_translation(
            Vec3::splat(3.0),
            bevy::math::Quat::from_rotation_z(FRAC_PI_2),
            Vec3::ONE,
        );
        let r = rotation_part(&m);
        assert!((r * Vec3::X).abs_diff_eq(Vec3::Y, 1e-5));
    }
}
