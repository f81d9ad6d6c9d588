// src/lib.rs
//! Glint 3D demo toolkit
//!
//! A retained-mode scene graph, procedural mesh builder and OBJ/MTL
//! pipeline for small desktop 3D demos. The host supplies a rendering
//! backend (see [`backend::RenderBackend`]) and forwards input events;
//! everything else, from face ingestion to per-draw uniform binding, lives
//! here.

pub mod backend;
pub mod error;
pub mod gfx;
pub mod img;
pub mod math;
pub mod prelude;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use gfx::material::{Material, ResourceCache};
pub use gfx::mesh::Mesh;
pub use gfx::scene::{Camera, Group, Item, Light, Node, View};
