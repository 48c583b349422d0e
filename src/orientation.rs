//! Face orientation classifier.
//!
//! Maps a face normal to one of the six axis directions and provides the
//! canonical texture axes for each, following the Hammer convention where
//! `right × up` points into the face.

use bevy::math::Vec3;

use crate::math::dominant_axis;

/// One of the six axis-aligned face directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceOrientation {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl FaceOrientation {
    pub const ALL: [FaceOrientation; 6] = [
        FaceOrientation::PosX,
        FaceOrientation::NegX,
        FaceOrientation::PosY,
        FaceOrientation::NegY,
        FaceOrientation::PosZ,
        FaceOrientation::NegZ,
    ];

    /// Classify a normal by its dominant axis and that axis' sign.
    ///
    /// A zero component counts as positive.
    pub fn from_normal(normal: Vec3) -> Self {
        let (d, _, _) = dominant_axis(normal);
        let positive = normal[d] >= 0.0;
        match (d, positive) {
            (0, true) => FaceOrientation::PosX,
            (0, false) => FaceOrientation::NegX,
            (1, true) => FaceOrientation::PosY,
            (1, false) => FaceOrientation::NegY,
            (_, true) => FaceOrientation::PosZ,
            (_, false) => FaceOrientation::NegZ,
        }
    }

    /// Canonical texture right vector (U axis).
    pub fn right(self) -> Vec3 {
        match self {
            FaceOrientation::PosX => Vec3::NEG_Y,
            FaceOrientation::NegX => Vec3::Y,
            FaceOrientation::PosY => Vec3::X,
            FaceOrientation::NegY => Vec3::NEG_X,
            FaceOrientation::PosZ => Vec3::NEG_X,
            FaceOrientation::NegZ => Vec3::X,
        }
    }

    /// Canonical texture up vector (V axis). Walls use world Z, floors and
    /// ceilings use world Y.
    pub fn up(self) -> Vec3 {
        match self {
            FaceOrientation::PosX
            | FaceOrientation::NegX
            | FaceOrientation::PosY
            | FaceOrientation::NegY => Vec3::Z,
            FaceOrientation::PosZ | FaceOrientation::NegZ => Vec3::Y,
        }
    }

    /// Outward axis direction of this orientation.
    pub fn axis(self) -> Vec3 {
        match self {
            FaceOrientation::PosX => Vec3::X,
            FaceOrientation::NegX => Vec3::NEG_X,
            FaceOrientation::PosY => Vec3::Y,
            FaceOrientation::NegY => Vec3::NEG_Y,
            FaceOrientation::PosZ => Vec3::Z,
            FaceOrientation::NegZ => Vec3::NEG_Z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_axes() {
        for o in FaceOrientation::ALL {
            assert_eq!(FaceOrientation::from_normal(o.axis()), o);
        }
        assert_eq!(
            FaceOrientation::from_normal(Vec3::new(0.2, -0.9, 0.1)),
            FaceOrientation::NegY
        );
    }

    #[test]
    fn ties_prefer_x_then_y() {
        let n = Vec3::new(1.0, 1.0, 1.0).normalize();
        assert_eq!(FaceOrientation::from_normal(n), FaceOrientation::PosX);
        let n = Vec3::new(0.0, -1.0, 1.0).normalize();
        assert_eq!(FaceOrientation::from_normal(n), FaceOrientation::NegY);
    }

    #[test]
    fn canonical_axes_are_orthonormal_and_face_inward() {
        for o in FaceOrientation::ALL {
            let r = o.right();
            let u = o.up();
            assert!((r.length() - 1.0).abs() < 1e-6);
            assert!((u.length() - 1.0).abs() < 1e-6);
            assert_eq!(r.dot(u), 0.0);
            assert_eq!(r.cross(u), -o.axis(), "{o:?}");
        }
    }

    #[test]
    fn pos_x_matches_hammer() {
        assert_eq!(FaceOrientation::PosX.right(), Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(FaceOrientation::PosX.up(), Vec3::new(0.0, 0.0, 1.0));
    }
}
