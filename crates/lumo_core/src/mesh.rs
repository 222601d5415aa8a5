//! Triangle mesh geometry.
//!
//! Meshes are stored indexed, with one normal (and optionally one UV) per
//! vertex. The renderer reads triangles out of a mesh by index, so a mesh is
//! never mutated once it is part of a [`Model`](crate::Model).

use lumo_math::{Aabb, Triangle, Vec2, Vec3};

use crate::{SceneError, SceneResult};

/// A mesh consisting of vertex positions, normals, optional UVs and
/// triangle indices.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Name from the source file (for logging)
    pub name: String,

    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals (one per vertex)
    pub normals: Vec<Vec3>,

    /// UV coordinates (optional - one per vertex)
    pub uvs: Option<Vec<Vec2>>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    /// Index into the model's material table
    pub material_index: usize,

    /// Axis-aligned bounding box
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a mesh from indexed data.
    ///
    /// Missing normals are replaced by smooth vertex normals. Index and
    /// attribute counts are validated so that later triangle lookups cannot
    /// go out of bounds.
    pub fn new(
        name: impl Into<String>,
        positions: Vec<Vec3>,
        indices: Vec<u32>,
        normals: Option<Vec<Vec3>>,
        uvs: Option<Vec<Vec2>>,
        material_index: usize,
    ) -> SceneResult<Self> {
        let name = name.into();
        let invalid = |reason: String| SceneError::InvalidMesh {
            name: name.clone(),
            reason,
        };

        if indices.len() % 3 != 0 {
            return Err(invalid(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(invalid(format!(
                "index {} out of range for {} vertices",
                bad,
                positions.len()
            )));
        }
        if let Some(n) = &normals {
            if n.len() != positions.len() {
                return Err(invalid(format!(
                    "{} normals for {} vertices",
                    n.len(),
                    positions.len()
                )));
            }
        }
        if let Some(uv) = &uvs {
            if uv.len() != positions.len() {
                return Err(invalid(format!(
                    "{} uvs for {} vertices",
                    uv.len(),
                    positions.len()
                )));
            }
        }

        let bounds = Aabb::from_iter_points(positions.iter().copied());
        let normals = match normals {
            Some(normals) => normals,
            None => smooth_normals(&positions, &indices),
        };

        Ok(Self {
            name,
            positions,
            normals,
            uvs,
            indices,
            material_index,
            bounds,
        })
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    fn corners(&self, index: usize) -> [usize; 3] {
        let base = index * 3;
        [
            self.indices[base] as usize,
            self.indices[base + 1] as usize,
            self.indices[base + 2] as usize,
        ]
    }

    /// Positions of triangle `index`.
    pub fn triangle(&self, index: usize) -> Triangle {
        let [a, b, c] = self.corners(index);
        Triangle::new(self.positions[a], self.positions[b], self.positions[c])
    }

    /// Vertex normals of triangle `index`.
    pub fn triangle_normals(&self, index: usize) -> [Vec3; 3] {
        let [a, b, c] = self.corners(index);
        [self.normals[a], self.normals[b], self.normals[c]]
    }

    /// Vertex UVs of triangle `index`, if the mesh has texture coordinates.
    pub fn triangle_uvs(&self, index: usize) -> Option<[Vec2; 3]> {
        let uvs = self.uvs.as_ref()?;
        let [a, b, c] = self.corners(index);
        Some([uvs[a], uvs[b], uvs[c]])
    }

    /// Iterate over all triangles.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        (0..self.triangle_count()).map(move |i| self.triangle(i))
    }
}

/// Smooth vertex normals by averaging the (area weighted) face normals of
/// every triangle sharing a vertex. Counter-clockwise winding faces front.
pub fn smooth_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];

    for face in indices.chunks_exact(3) {
        let (i0, i1, i2) = (face[0] as usize, face[1] as usize, face[2] as usize);
        let p0 = positions[i0];
        let face_normal = (positions[i1] - p0).cross(positions[i2] - p0);

        normals[i0] += face_normal;
        normals[i1] += face_normal;
        normals[i2] += face_normal;
    }

    for normal in &mut normals {
        // Default up normal for unreferenced or degenerate vertices
        *normal = normal.try_normalize().unwrap_or(Vec3::Y);
    }

    normals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(normals: Option<Vec<Vec3>>) -> SceneResult<Mesh> {
        Mesh::new(
            "quad",
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
            normals,
            None,
            0,
        )
    }

    #[test]
    fn test_mesh_triangles() {
        let mesh = quad(None).unwrap();
        assert_eq!(mesh.triangle_count(), 2);

        let tri = mesh.triangle(1);
        assert_eq!(tri.a, Vec3::ZERO);
        assert_eq!(tri.b, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(tri.c, Vec3::new(0.0, 1.0, 0.0));
        assert!(mesh.triangle_uvs(0).is_none());
    }

    #[test]
    fn test_mesh_smooth_normals() {
        let mesh = quad(None).unwrap();
        for n in &mesh.normals {
            assert!((*n - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn test_mesh_bounds() {
        let mesh = quad(None).unwrap();
        assert_eq!(mesh.bounds.x.min, 0.0);
        assert_eq!(mesh.bounds.y.max, 1.0);
        // Flat mesh gets padded
        assert!(mesh.bounds.z.size() > 0.0);
    }

    #[test]
    fn test_mesh_rejects_bad_indices() {
        let result = Mesh::new(
            "broken",
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![0, 1, 5],
            None,
            None,
            0,
        );
        assert!(matches!(result, Err(SceneError::InvalidMesh { .. })));
    }

    #[test]
    fn test_mesh_rejects_mismatched_normals() {
        let result = quad(Some(vec![Vec3::Z; 3]));
        assert!(matches!(result, Err(SceneError::InvalidMesh { .. })));
    }

    #[test]
    fn test_unreferenced_vertex_gets_default_normal() {
        let normals = smooth_normals(&[Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::ONE], &[0, 1, 2]);
        assert_eq!(normals[3], Vec3::Y);
        assert!((normals[0] - Vec3::Z).length() < 1e-6);
    }
}
