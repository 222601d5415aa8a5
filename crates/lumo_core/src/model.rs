//! The renderable model: meshes plus the material table they index.

use lumo_math::Aabb;

use crate::{Material, Mesh, SceneError, SceneResult};

/// Meshes and materials of one scene.
///
/// Meshes reference materials by index. Once a model is wrapped in an `Arc`
/// and handed to the renderer it is read-only, which is what lets the BVH
/// keep plain indices into it.
#[derive(Clone, Debug, Default)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
}

impl Model {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a material and return its index.
    pub fn add_material(&mut self, material: Material) -> usize {
        let id = self.materials.len();
        self.materials.push(material);
        id
    }

    /// Add a mesh and return its index.
    ///
    /// Fails if the mesh names a material that has not been added yet.
    pub fn add_mesh(&mut self, mesh: Mesh) -> SceneResult<usize> {
        if mesh.material_index >= self.materials.len() {
            return Err(SceneError::InvalidMesh {
                name: mesh.name.clone(),
                reason: format!(
                    "material index {} out of range ({} materials)",
                    mesh.material_index,
                    self.materials.len()
                ),
            });
        }
        let id = self.meshes.len();
        self.meshes.push(mesh);
        Ok(id)
    }

    /// Get a material by index.
    pub fn material(&self, index: usize) -> Option<&Material> {
        self.materials.get(index)
    }

    /// Total triangle count across all meshes.
    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }

    /// True if there is nothing to hit.
    pub fn is_empty(&self) -> bool {
        self.triangle_count() == 0
    }

    /// Bounding box of every mesh.
    pub fn bounds(&self) -> Aabb {
        self.meshes
            .iter()
            .fold(Aabb::EMPTY, |acc, mesh| Aabb::surrounding(&acc, &mesh.bounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumo_math::Vec3;

    fn triangle_mesh(offset: Vec3, material_index: usize) -> Mesh {
        Mesh::new(
            "tri",
            vec![offset, offset + Vec3::X, offset + Vec3::Y],
            vec![0, 1, 2],
            None,
            None,
            material_index,
        )
        .unwrap()
    }

    #[test]
    fn test_model_creation() {
        let mut model = Model::new();
        assert!(model.is_empty());
        assert!(model.bounds().is_empty());

        let mat = model.add_material(Material::diffuse(Vec3::splat(0.8)));
        assert_eq!(mat, 0);
        model.add_mesh(triangle_mesh(Vec3::ZERO, mat)).unwrap();
        model.add_mesh(triangle_mesh(Vec3::new(3.0, 0.0, 0.0), mat)).unwrap();

        assert_eq!(model.triangle_count(), 2);
        assert!(!model.is_empty());

        let bounds = model.bounds();
        assert_eq!(bounds.x.min, 0.0);
        assert_eq!(bounds.x.max, 4.0);
    }

    #[test]
    fn test_model_rejects_unknown_material() {
        let mut model = Model::new();
        let result = model.add_mesh(triangle_mesh(Vec3::ZERO, 0));
        assert!(matches!(result, Err(SceneError::InvalidMesh { .. })));
    }
}
