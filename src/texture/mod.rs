//! Texture configuration, projection and texture-locked transforms.

pub mod config;
pub mod locked;
pub mod projection;

pub use config::{AlignMode, PartialTextureConfig, TexFlags, TextureConfig};
pub use locked::{lock_config, locked_transform};
pub use projection::{apply_faces, project_face, uv_axes, ObjectFrame, ProjectionSettings};
