//! A complete renderable scene.

use std::sync::Arc;

use lumo_math::Camera;

use crate::{Environment, Model};

/// Model, camera and environment handed to the renderer together.
///
/// The model and environment sit behind `Arc`s so that a render session
/// can share them with its worker thread without copying.
#[derive(Clone, Debug)]
pub struct Scene {
    pub model: Arc<Model>,
    pub camera: Camera,
    pub environment: Arc<Environment>,
}

impl Scene {
    pub fn new(model: Model, camera: Camera, environment: Environment) -> Self {
        Self {
            model: Arc::new(model),
            camera,
            environment: Arc::new(environment),
        }
    }

    /// Get total triangle count.
    pub fn triangle_count(&self) -> usize {
        self.model.triangle_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Material, Mesh};
    use lumo_math::Vec3;

    #[test]
    fn test_scene_creation() {
        let mut model = Model::new();
        let mat = model.add_material(Material::diffuse(Vec3::ONE));
        model
            .add_mesh(
                Mesh::new(
                    "tri",
                    vec![Vec3::ZERO, Vec3::X, Vec3::Y],
                    vec![0, 1, 2],
                    None,
                    None,
                    mat,
                )
                .unwrap(),
            )
            .unwrap();

        let scene = Scene::new(model, Camera::default(), Environment::uniform(Vec3::ZERO));
        assert_eq!(scene.triangle_count(), 1);

        let shared = scene.clone();
        assert!(Arc::ptr_eq(&scene.model, &shared.model));
    }
}
