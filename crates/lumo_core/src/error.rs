//! Errors raised while loading scenes and their assets.

use thiserror::Error;

/// Errors that can occur while building a scene.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("OBJ loading error: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Scene contains no triangles: {0}")]
    EmptyScene(String),

    #[error("Invalid mesh '{name}': {reason}")]
    InvalidMesh { name: String, reason: String },
}

pub type SceneResult<T> = Result<T, SceneError>;
