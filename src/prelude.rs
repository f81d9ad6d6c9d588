//! # Glint Prelude
//!
//! Convenient re-exports of the types most demos touch.
//!
//! ```rust
//! use glint::prelude::*;
//! ```

// Re-export graphics and scene types
pub use crate::gfx::material::{Material, ResourceCache, ShaderKind, TextureKind, TextureSlot};
pub use crate::gfx::mesh::loader::{load_mtl, load_obj, load_obj_file};
pub use crate::gfx::mesh::shapes::ShapeCache;
pub use crate::gfx::mesh::{El, Mesh};
pub use crate::gfx::scene::{ArcBall, Camera, FirstPerson, Group, Item, Light, Node, Transform, View};

// Re-export the collaborator contracts
pub use crate::backend::{NullBackend, RenderBackend, Winding};
pub use crate::img::Convert;
pub use crate::math::Polar;

pub use crate::error::{Error, Result};
