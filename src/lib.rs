//! # Bevy Align UV
//!
//! Hammer-style world-aligned texturing for level geometry.
//!
//! Every face carries its own texture configuration (shift, scale, rotation,
//! alignment mode) stored as face attributes on the mesh. The projection
//! engine turns that configuration into per-corner UVs, and the locked
//! transform engine rewrites it when faces move so the texture stays glued to
//! the surface.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bevy::prelude::*;
//! use bevy_align_uv::AlignUvPlugin;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(AlignUvPlugin)
//!         .run();
//! }
//! ```
//!
//! Give an entity a [`UvMesh`] built from its `Mesh3d` and send
//! [`UvCommand`]s to texture its selected faces. Send [`GeometryChanged`]
//! after moving vertices so the faces are reprojected.
//!
//! ## Without Bevy's ECS
//!
//! The engine only talks to meshes through [`mesh::MeshHost`]. The operations
//! in [`ops`] work on any implementation; [`PolyMesh`] is the in-memory one.

pub mod dispatch;
pub mod error;
pub mod math;
pub mod mesh;
pub mod ops;
pub mod orientation;
pub mod plugin;
pub mod prefs;
pub mod texture;

pub use dispatch::{ApplyMode, ApplyTrigger, PivotMode, TransformHandle, TransformKind};
pub use error::{UvError, UvResult};
pub use mesh::{MeshHost, MeshReader, MeshWriter, PolyMesh};
pub use orientation::FaceOrientation;
pub use plugin::{AlignUvPlugin, GeometryChanged, UvCommand, UvCommandFailed, UvDispatcher, UvMesh};
pub use prefs::Preferences;
pub use texture::{AlignMode, PartialTextureConfig, TexFlags, TextureConfig};
