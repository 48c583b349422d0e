//! Per-face texture configuration.
//!
//! [`TextureConfig`] is the decoded form of the four face attributes.
//! [`PartialTextureConfig`] represents an edit where any field may be left
//! unset, and doubles as the "common values" summary of a face selection.

use bevy::math::{Vec2, Vec3};
use bitflags::bitflags;

use crate::math::frac_signed;
use crate::orientation::FaceOrientation;

bitflags! {
    /// Flag bits stored in the Z component of the shift attribute.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TexFlags: u32 {
        /// Face participates in projection.
        const ENABLED = 0b0001;
        /// Project in object space instead of world space.
        const OBJECT_SPACE = 0b0010;
        /// UV axes follow the face normal.
        const ALIGN_FACE = 0b0100;
        /// UV axes are the stored locked axes.
        const ALIGN_LOCKED = 0b1000;
    }
}

impl TexFlags {
    /// Both alignment bits.
    pub const ALIGN: TexFlags = TexFlags::ALIGN_FACE.union(TexFlags::ALIGN_LOCKED);

    /// Encode as the float stored in the attribute.
    pub fn to_float(self) -> f32 {
        self.bits() as f32
    }

    /// Decode the float stored in the attribute. Unknown bits are dropped.
    pub fn from_float(value: f32) -> Self {
        if !value.is_finite() || value <= 0.0 {
            return TexFlags::empty();
        }
        TexFlags::from_bits_truncate(value.round() as u32)
    }

    /// Drop `ALIGN_FACE` when both alignment bits are present.
    pub fn sanitized(self) -> Self {
        if self.contains(TexFlags::ALIGN) {
            self - TexFlags::ALIGN_FACE
        } else {
            self
        }
    }

    pub fn align_mode(self) -> AlignMode {
        if self.contains(TexFlags::ALIGN_LOCKED) {
            AlignMode::Locked
        } else if self.contains(TexFlags::ALIGN_FACE) {
            AlignMode::Face
        } else {
            AlignMode::World
        }
    }

    pub fn with_align_mode(self, mode: AlignMode) -> Self {
        let base = self - TexFlags::ALIGN;
        match mode {
            AlignMode::World => base,
            AlignMode::Face => base | TexFlags::ALIGN_FACE,
            AlignMode::Locked => base | TexFlags::ALIGN_LOCKED,
        }
    }
}

/// How a face picks its UV axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlignMode {
    /// Canonical axes of the nearest world axis.
    #[default]
    World,
    /// Axes derived from the face normal.
    Face,
    /// Stored locked axes.
    Locked,
}

/// Decoded texture configuration of one face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureConfig {
    pub shift: Vec2,
    pub scale: Vec2,
    /// Rotation in radians.
    pub rotation: f32,
    pub flags: TexFlags,
    pub lock_u: Vec3,
    pub lock_v: Vec3,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            shift: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            flags: TexFlags::empty(),
            lock_u: Vec3::ZERO,
            lock_v: Vec3::ZERO,
        }
    }
}

impl TextureConfig {
    /// Decode from the four attribute slots in [`crate::mesh::FACE_ATTRIBUTES`] order.
    pub fn decode(slots: [Vec3; 4]) -> Self {
        let [shift_flags, scale_rot, lock_u, lock_v] = slots;
        Self {
            shift: shift_flags.truncate(),
            scale: scale_rot.truncate(),
            rotation: scale_rot.z,
            flags: TexFlags::from_float(shift_flags.z).sanitized(),
            lock_u,
            lock_v,
        }
    }

    /// Encode into the four attribute slots.
    ///
    /// The shift is wrapped into `(-1, 1)` and the locked axes are renormalised.
    pub fn encode(&self) -> [Vec3; 4] {
        let flags = self.flags.sanitized();
        [
            Vec3::new(
                frac_signed(self.shift.x),
                frac_signed(self.shift.y),
                flags.to_float(),
            ),
            Vec3::new(self.scale.x, self.scale.y, self.rotation),
            self.lock_u.normalize_or_zero(),
            self.lock_v.normalize_or_zero(),
        ]
    }

    pub fn is_enabled(&self) -> bool {
        self.flags.contains(TexFlags::ENABLED)
    }

    pub fn object_space(&self) -> bool {
        self.flags.contains(TexFlags::OBJECT_SPACE)
    }

    pub fn align_mode(&self) -> AlignMode {
        self.flags.align_mode()
    }

    /// Locked axes, with unset (zero) axes falling back to the +X canonical pair.
    pub fn locked_axes(&self) -> (Vec3, Vec3) {
        let u = if self.lock_u == Vec3::ZERO {
            FaceOrientation::PosX.right()
        } else {
            self.lock_u
        };
        let v = if self.lock_v == Vec3::ZERO {
            FaceOrientation::PosX.up()
        } else {
            self.lock_v
        };
        (u, v)
    }

    /// Defaults for everything except the `ENABLED` bit.
    pub fn reset(&self) -> Self {
        Self {
            flags: self.flags & TexFlags::ENABLED,
            ..Self::default()
        }
    }
}

/// A texture configuration where every field may be unset.
///
/// Unset scalars are `None`; flags only count where `flags_set` has the bit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PartialTextureConfig {
    pub shift_x: Option<f32>,
    pub shift_y: Option<f32>,
    pub scale_x: Option<f32>,
    pub scale_y: Option<f32>,
    pub rotation: Option<f32>,
    pub lock_u: Option<Vec3>,
    pub lock_v: Option<Vec3>,
    pub flags: TexFlags,
    pub flags_set: TexFlags,
    /// Number of enabled faces merged into this config.
    pub face_count: usize,
}

impl PartialTextureConfig {
    /// Every field unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every field set to its default, all flags set and cleared.
    pub fn cleared() -> Self {
        let defaults = TextureConfig::default();
        Self {
            shift_x: Some(defaults.shift.x),
            shift_y: Some(defaults.shift.y),
            scale_x: Some(defaults.scale.x),
            scale_y: Some(defaults.scale.y),
            rotation: Some(defaults.rotation),
            lock_u: None,
            lock_v: None,
            flags: TexFlags::empty(),
            flags_set: TexFlags::all(),
            face_count: 0,
        }
    }

    pub fn with_shift(mut self, shift: Vec2) -> Self {
        self.shift_x = Some(shift.x);
        self.shift_y = Some(shift.y);
        self
    }

    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale_x = Some(scale.x);
        self.scale_y = Some(scale.y);
        self
    }

    pub fn with_rotation(mut self, radians: f32) -> Self {
        self.rotation = Some(radians);
        self
    }

    pub fn with_flag(mut self, flag: TexFlags, on: bool) -> Self {
        self.flags.set(flag, on);
        self.flags_set |= flag;
        self
    }

    pub fn with_align_mode(self, mode: AlignMode) -> Self {
        self.with_flag(TexFlags::ALIGN_FACE, mode == AlignMode::Face)
            .with_flag(TexFlags::ALIGN_LOCKED, mode == AlignMode::Locked)
    }

    /// Leave the given flags untouched when applying.
    pub fn without_flags(mut self, flags: TexFlags) -> Self {
        self.flags_set -= flags;
        self.flags -= flags;
        self
    }

    /// Whether any enabled face has been merged.
    pub fn has_faces(&self) -> bool {
        self.face_count > 0
    }

    /// Whether more than one enabled face has been merged.
    pub fn multiple_faces(&self) -> bool {
        self.face_count > 1
    }

    /// Fold one face into the summary. Disabled faces contribute nothing.
    ///
    /// The first face sets every field; later faces unset whatever differs.
    pub fn merge_face(&mut self, face: &TextureConfig) {
        if !face.is_enabled() {
            return;
        }

        if self.face_count == 0 {
            self.flags = face.flags;
            self.flags_set = TexFlags::all();
            self.shift_x = Some(face.shift.x);
            self.shift_y = Some(face.shift.y);
            self.scale_x = Some(face.scale.x);
            self.scale_y = Some(face.scale.y);
            self.rotation = Some(face.rotation);
            self.lock_u = Some(face.lock_u);
            self.lock_v = Some(face.lock_v);
        } else {
            let differing = self.flags ^ face.flags;
            self.flags -= differing;
            self.flags_set -= differing;
            merge_value(&mut self.shift_x, face.shift.x);
            merge_value(&mut self.shift_y, face.shift.y);
            merge_value(&mut self.scale_x, face.scale.x);
            merge_value(&mut self.scale_y, face.scale.y);
            merge_value(&mut self.rotation, face.rotation);
            merge_value(&mut self.lock_u, face.lock_u);
            merge_value(&mut self.lock_v, face.lock_v);
        }
        self.face_count += 1;
    }

    /// Overwrite the fields this config sets, keep the rest of `face`.
    ///
    /// If the result would carry both alignment bits, the bit this edit turns
    /// on explicitly is kept.
    pub fn apply_to(&self, face: &TextureConfig) -> TextureConfig {
        let mut out = *face;
        out.flags = (face.flags - self.flags_set) | (self.flags & self.flags_set);
        if out.flags.contains(TexFlags::ALIGN) {
            let explicit = self.flags & self.flags_set;
            if explicit.contains(TexFlags::ALIGN_LOCKED) && !explicit.contains(TexFlags::ALIGN_FACE) {
                out.flags -= TexFlags::ALIGN_FACE;
            } else {
                out.flags -= TexFlags::ALIGN_LOCKED;
            }
        }

        if let Some(x) = self.shift_x {
            out.shift.x = x;
        }
        if let Some(y) = self.shift_y {
            out.shift.y = y;
        }
        if let Some(x) = self.scale_x {
            out.scale.x = x;
        }
        if let Some(y) = self.scale_y {
            out.scale.y = y;
        }
        if let Some(r) = self.rotation {
            out.rotation = r;
        }
        if let Some(u) = self.lock_u {
            out.lock_u = u.normalize_or_zero();
        }
        if let Some(v) = self.lock_v {
            out.lock_v = v.normalize_or_zero();
        }
        out
    }
}

fn merge_value<T: PartialEq>(slot: &mut Option<T>, value: T) {
    if slot.as_ref().is_some_and(|current| *current != value) {
        *slot = None;
    }
}
