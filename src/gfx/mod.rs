//! # Graphics Module
//!
//! Everything between the demo driver and the rendering backend: the mesh
//! builder and its procedural generators and loaders, the material and
//! shader-program layer, and the retained scene graph with its cameras and
//! lights.
//!
//! - **Mesh Building** ([`mesh`]) - Indexed meshes with deduplicated buffers,
//!   derived normals/tangents, procedural shapes and an OBJ/MTL loader
//! - **Material System** ([`material`]) - Shader-kind programs compiled once
//!   and cached, material values, built-in textures
//! - **Scene Management** ([`scene`]) - Group/item hierarchy, cameras,
//!   lights and the per-frame view

pub mod material;
pub mod mesh;
pub mod scene;

// Re-export commonly used types
pub use material::{Material, ResourceCache};
pub use mesh::Mesh;
pub use scene::{Group, Item, Node};
