//! Lumo Core - scene model and asset loading for the Lumo path tracer.
//!
//! This crate provides:
//!
//! - **Scene types**: `Model`, `Mesh`, `Material`, `Scene`
//! - **Assets**: textures (`Texture`, `TextureCache`) and HDR environments
//! - **Loading**: Wavefront OBJ/MTL through `tobj`, JSON documents through
//!   `serde_json`
//!
//! # Example
//!
//! ```ignore
//! use lumo_core::{load_obj, Environment};
//!
//! let model = load_obj("res/scene.obj")?;
//! let environment = Environment::load("res/sky.hdr")?;
//! println!("Loaded {} triangles", model.triangle_count());
//! ```

pub mod environment;
pub mod error;
pub mod loader;
pub mod material;
pub mod mesh;
pub mod model;
pub mod scene;
pub mod texture;

// Re-export commonly used types
pub use environment::Environment;
pub use error::{SceneError, SceneResult};
pub use loader::{load_json, load_obj};
pub use material::Material;
pub use mesh::Mesh;
pub use model::Model;
pub use scene::Scene;
pub use texture::{Texture, TextureCache};
