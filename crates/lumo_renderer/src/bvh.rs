//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! Built once per render with a full Surface Area Heuristic sweep over all
//! three axes. Nodes live in a flat arena and are addressed by index; leaves
//! own a contiguous range of the reordered triangle list. Triangles refer
//! back into the [`Model`] by mesh/triangle/material index, and the BVH
//! keeps the model alive through an `Arc`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use lumo_core::{Material, Model};
use lumo_math::{Aabb, Ray, Triangle, Vec2, Vec3};

/// Cost of testing a ray against one child box.
const COST_AABB: f32 = 1.0;
/// Cost of testing a ray against one triangle.
const COST_TRIANGLE: f32 = 1.0;

/// Reference to one model triangle plus what the builder needs to sort it.
#[derive(Debug, Clone, Copy)]
pub struct BvhTriangle {
    pub mesh: u32,
    pub triangle: u32,
    pub material: u32,
    /// UVs are only interpolated for textured materials
    pub textured: bool,
    pub bbox: Aabb,
    pub center: Vec3,
}

/// BVH node - either an inner node with two children or a leaf with triangles.
#[derive(Debug, Clone)]
pub enum BvhNode {
    /// Internal node; `children` index the node arena.
    Inner { bbox: Aabb, children: [u32; 2] },
    /// Leaf owning `triangles[first..first + count]`.
    Leaf { bbox: Aabb, first: u32, count: u32 },
}

impl BvhNode {
    pub fn bbox(&self) -> &Aabb {
        match self {
            BvhNode::Inner { bbox, .. } | BvhNode::Leaf { bbox, .. } => bbox,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, BvhNode::Leaf { .. })
    }
}

/// Nearest intersection found by a query.
#[derive(Debug, Clone, Copy)]
pub struct Hit<'a> {
    /// Ray parameter of the hit
    pub t: f32,
    pub position: Vec3,
    /// Interpolated vertex normal, normalized
    pub normal: Vec3,
    /// Interpolated UV, present for textured materials only
    pub uv: Option<Vec2>,
    pub material: &'a Material,
}

/// Construction statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct BvhStats {
    pub triangles: usize,
    pub nodes: usize,
    pub leaves: usize,
    pub max_depth: usize,
    pub max_leaf_size: usize,
    pub build_time: Duration,
}

/// Immutable BVH over every triangle of a model.
pub struct Bvh {
    model: Arc<Model>,
    nodes: Vec<BvhNode>,
    triangles: Vec<BvhTriangle>,
    stats: BvhStats,
}

impl Bvh {
    /// Build a BVH over all triangles of `model`.
    ///
    /// An empty model yields a single empty leaf that every ray misses.
    pub fn build(model: Arc<Model>) -> Self {
        let start = Instant::now();
        let mut triangles = collect_triangles(&model);

        let mut nodes = Vec::new();
        let mut stats = BvhStats {
            triangles: triangles.len(),
            ..Default::default()
        };

        nodes.push(BvhNode::Leaf {
            bbox: Aabb::EMPTY,
            first: 0,
            count: 0,
        });
        // (node index, first, count, depth)
        let mut stack = vec![(0usize, 0usize, triangles.len(), 0usize)];

        while let Some((node_i, first, count, depth)) = stack.pop() {
            stats.max_depth = stats.max_depth.max(depth);
            let range = &mut triangles[first..first + count];
            let bbox = enclosing_box(range);

            match sah_split(range, &bbox) {
                Some(split) => {
                    let left_i = nodes.len();
                    let right_i = left_i + 1;
                    nodes.push(BvhNode::Leaf {
                        bbox: Aabb::EMPTY,
                        first: first as u32,
                        count: split as u32,
                    });
                    nodes.push(BvhNode::Leaf {
                        bbox: Aabb::EMPTY,
                        first: (first + split) as u32,
                        count: (count - split) as u32,
                    });
                    nodes[node_i] = BvhNode::Inner {
                        bbox,
                        children: [left_i as u32, right_i as u32],
                    };
                    stack.push((right_i, first + split, count - split, depth + 1));
                    stack.push((left_i, first, split, depth + 1));
                }
                None => {
                    nodes[node_i] = BvhNode::Leaf {
                        bbox,
                        first: first as u32,
                        count: count as u32,
                    };
                    stats.leaves += 1;
                    stats.max_leaf_size = stats.max_leaf_size.max(count);
                }
            }
        }

        nodes.shrink_to_fit();
        stats.nodes = nodes.len();
        stats.build_time = start.elapsed();

        log::info!(
            "BVH: {} triangles, {} nodes, {} leaves, depth {}, largest leaf {}, built in {:.2?}",
            stats.triangles,
            stats.nodes,
            stats.leaves,
            stats.max_depth,
            stats.max_leaf_size,
            stats.build_time
        );

        Self {
            model,
            nodes,
            triangles,
            stats,
        }
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn root(&self) -> &BvhNode {
        &self.nodes[0]
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    pub fn triangles(&self) -> &[BvhTriangle] {
        &self.triangles
    }

    pub fn stats(&self) -> &BvhStats {
        &self.stats
    }

    /// Nearest hit along `ray`, or `None` if it escapes.
    ///
    /// Back faces are reported only when `back_face` is set.
    pub fn intersect(&self, ray: &Ray, back_face: bool) -> Option<Hit<'_>> {
        let root_t = self.root().bbox().intersect_ray(ray)?;

        let mut best: Option<(f32, &BvhTriangle, Vec3)> = None;
        let mut stack: Vec<(usize, f32)> = Vec::with_capacity(64);
        stack.push((0, root_t));

        while let Some((node_i, entry_t)) = stack.pop() {
            if let Some((best_t, _, _)) = best {
                if entry_t > best_t {
                    continue;
                }
            }

            match &self.nodes[node_i] {
                BvhNode::Leaf { first, count, .. } => {
                    let start = *first as usize;
                    for tri in &self.triangles[start..start + *count as usize] {
                        let geometry = self.model.meshes[tri.mesh as usize].triangle(tri.triangle as usize);
                        if let Some(hit) = geometry.intersect(ray, back_face) {
                            if best.map_or(true, |(best_t, _, _)| hit.t < best_t) {
                                best = Some((hit.t, tri, hit.barycentric));
                            }
                        }
                    }
                }
                BvhNode::Inner { children, .. } => {
                    let [a, b] = children.map(|c| {
                        let c = c as usize;
                        (c, self.nodes[c].bbox().intersect_ray(ray))
                    });
                    // Push the farther child first so the nearer one is visited first
                    let (near, far) = match (a.1, b.1) {
                        (Some(ta), Some(tb)) if tb < ta => (b, a),
                        _ => (a, b),
                    };
                    if let (c, Some(t)) = far {
                        stack.push((c, t));
                    }
                    if let (c, Some(t)) = near {
                        stack.push((c, t));
                    }
                }
            }
        }

        let (t, tri, barycentric) = best?;
        Some(self.shade(ray, t, tri, barycentric))
    }

    fn shade(&self, ray: &Ray, t: f32, tri: &BvhTriangle, barycentric: Vec3) -> Hit<'_> {
        let mesh = &self.model.meshes[tri.mesh as usize];
        let index = tri.triangle as usize;
        let normal = Triangle::interpolate(mesh.triangle_normals(index), barycentric).normalize_or_zero();
        let uv = if tri.textured {
            mesh.triangle_uvs(index)
                .map(|uvs| Triangle::interpolate(uvs, barycentric))
        } else {
            None
        };

        Hit {
            t,
            position: ray.at(t),
            normal,
            uv,
            material: &self.model.materials[tri.material as usize],
        }
    }
}

/// Brute-force nearest hit: every mesh whose bounds the ray touches, then
/// every triangle of it. Same result as [`Bvh::intersect`], kept as the
/// reference query.
pub fn intersect_linear<'a>(model: &'a Model, ray: &Ray, back_face: bool) -> Option<Hit<'a>> {
    let mut best: Option<(f32, usize, usize, Vec3, Vec3)> = None;

    for (mesh_i, mesh) in model.meshes.iter().enumerate() {
        let Some(entry_t) = mesh.bounds.intersect_ray(ray) else {
            continue;
        };
        if best.map_or(false, |(best_t, ..)| entry_t > best_t) {
            continue;
        }

        for (tri_i, geometry) in mesh.triangles().enumerate() {
            if let Some(hit) = geometry.intersect(ray, back_face) {
                if best.map_or(true, |(best_t, ..)| hit.t < best_t) {
                    best = Some((hit.t, mesh_i, tri_i, hit.barycentric, hit.position));
                }
            }
        }
    }

    let (t, mesh_i, tri_i, barycentric, position) = best?;
    let mesh = &model.meshes[mesh_i];
    let material = &model.materials[mesh.material_index];
    let normal = Triangle::interpolate(mesh.triangle_normals(tri_i), barycentric).normalize_or_zero();
    let uv = if material.has_texture() {
        mesh.triangle_uvs(tri_i)
            .map(|uvs| Triangle::interpolate(uvs, barycentric))
    } else {
        None
    };

    Some(Hit {
        t,
        position,
        normal,
        uv,
        material,
    })
}

fn collect_triangles(model: &Model) -> Vec<BvhTriangle> {
    let mut triangles = Vec::with_capacity(model.triangle_count());
    for (mesh_i, mesh) in model.meshes.iter().enumerate() {
        let textured = model
            .material(mesh.material_index)
            .map_or(false, Material::has_texture);
        for (tri_i, geometry) in mesh.triangles().enumerate() {
            let bbox = geometry.bounding_box();
            triangles.push(BvhTriangle {
                mesh: mesh_i as u32,
                triangle: tri_i as u32,
                material: mesh.material_index as u32,
                textured,
                bbox,
                center: bbox.centroid(),
            });
        }
    }
    triangles
}

fn enclosing_box(triangles: &[BvhTriangle]) -> Aabb {
    triangles
        .iter()
        .fold(Aabb::EMPTY, |acc, t| Aabb::surrounding(&acc, &t.bbox))
}

/// Sort by centroid along `axis`, breaking ties by model order so that the
/// result does not depend on the incoming order.
fn sort_by_axis(triangles: &mut [BvhTriangle], axis: usize) {
    triangles.sort_unstable_by(|a, b| {
        a.center[axis]
            .total_cmp(&b.center[axis])
            .then(a.mesh.cmp(&b.mesh))
            .then(a.triangle.cmp(&b.triangle))
    });
}

/// SAH cost of splitting a node with surface area `sa_root`.
fn split_cost(sa_left: f32, n_left: usize, sa_right: f32, n_right: usize, sa_root: f32) -> f32 {
    2.0 * COST_AABB + (sa_left * n_left as f32 + sa_right * n_right as f32) * COST_TRIANGLE / sa_root
}

/// Find the cheapest split of `triangles` over all three axes.
///
/// Returns the number of triangles going left, with `triangles` sorted
/// along the winning axis, or `None` when a leaf is cheaper than any split.
fn sah_split(triangles: &mut [BvhTriangle], bbox: &Aabb) -> Option<usize> {
    let n = triangles.len();
    if n < 2 {
        return None;
    }
    let sa_root = bbox.surface_area();
    if sa_root <= 0.0 || !sa_root.is_finite() {
        return None;
    }

    let mut best_cost = COST_TRIANGLE * n as f32;
    let mut best: Option<(usize, usize)> = None;
    let mut right_sa = vec![0.0_f32; n + 1];

    for axis in 0..3 {
        sort_by_axis(triangles, axis);

        // right_sa[i]: area of triangles[i..]
        let mut right_box = Aabb::EMPTY;
        for i in (1..n).rev() {
            right_box = Aabb::surrounding(&right_box, &triangles[i].bbox);
            right_sa[i] = right_box.surface_area();
        }

        let mut left_box = Aabb::EMPTY;
        for i in 1..n {
            left_box = Aabb::surrounding(&left_box, &triangles[i - 1].bbox);
            let cost = split_cost(left_box.surface_area(), i, right_sa[i], n - i, sa_root);
            if cost < best_cost {
                best_cost = cost;
                best = Some((axis, i));
            }
        }
    }

    let (axis, split) = best?;
    sort_by_axis(triangles, axis);
    Some(split)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumo_core::Mesh;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_vec(rng: &mut StdRng, scale: f32) -> Vec3 {
        Vec3::new(
            rng.gen_range(-scale..scale),
            rng.gen_range(-scale..scale),
            rng.gen_range(-scale..scale),
        )
    }

    /// Random triangle soup split across a few meshes.
    fn random_model(seed: u64, triangle_count: usize) -> Model {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut model = Model::new();
        let material = model.add_material(Material::diffuse(Vec3::splat(0.5)));

        let mut remaining = triangle_count;
        let mut mesh_i = 0;
        while remaining > 0 {
            let count = remaining.min(rng.gen_range(1..=120));
            remaining -= count;

            let mut positions = Vec::with_capacity(count * 3);
            for _ in 0..count {
                let center = random_vec(&mut rng, 10.0);
                for _ in 0..3 {
                    positions.push(center + random_vec(&mut rng, 1.5));
                }
            }
            let indices = (0..positions.len() as u32).collect();
            let mesh = Mesh::new(format!("soup{}", mesh_i), positions, indices, None, None, material).unwrap();
            model.add_mesh(mesh).unwrap();
            mesh_i += 1;
        }
        model
    }

    /// Number of triangles below a node.
    fn subtree_count(bvh: &Bvh, node_i: usize) -> usize {
        match &bvh.nodes()[node_i] {
            BvhNode::Leaf { count, .. } => *count as usize,
            BvhNode::Inner { children, .. } => children
                .iter()
                .map(|&c| subtree_count(bvh, c as usize))
                .sum(),
        }
    }

    #[test]
    fn test_bvh_empty_model() {
        let bvh = Bvh::build(Arc::new(Model::new()));
        assert_eq!(bvh.nodes().len(), 1);
        assert!(bvh.root().is_leaf());
        assert!(bvh.root().bbox().is_empty());

        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        assert!(bvh.intersect(&ray, true).is_none());
    }

    #[test]
    fn test_bvh_single_triangle() {
        let mut model = Model::new();
        let mat = model.add_material(Material::emissive(Vec3::ONE));
        model
            .add_mesh(
                Mesh::new(
                    "tri",
                    vec![
                        Vec3::new(-1.0, -1.0, -3.0),
                        Vec3::new(1.0, -1.0, -3.0),
                        Vec3::new(0.0, 1.0, -3.0),
                    ],
                    vec![0, 1, 2],
                    None,
                    None,
                    mat,
                )
                .unwrap(),
            )
            .unwrap();
        let bvh = Bvh::build(Arc::new(model));
        assert!(bvh.root().is_leaf());

        let hit = bvh.intersect(&Ray::new(Vec3::ZERO, Vec3::NEG_Z), false).unwrap();
        assert!((hit.t - 3.0).abs() < 1e-5);
        assert!((hit.normal - Vec3::Z).length() < 1e-5);
        assert_eq!(hit.material.emissive, Vec3::ONE);
        assert!(hit.uv.is_none());
    }

    #[test]
    fn test_bvh_matches_brute_force() {
        let model = Arc::new(random_model(7, 500));
        let bvh = Bvh::build(model.clone());
        assert!(!bvh.root().is_leaf());

        let mut rng = StdRng::seed_from_u64(99);
        let mut hits = 0;
        for i in 0..1000 {
            let origin = random_vec(&mut rng, 15.0);
            // Half the rays aim at the scene so plenty of them hit
            let direction = if i % 2 == 0 {
                random_vec(&mut rng, 1.0)
            } else {
                random_vec(&mut rng, 8.0) - origin
            };
            let ray = Ray::new(origin, direction);
            let back_face = i % 3 == 0;

            let fast = bvh.intersect(&ray, back_face);
            let slow = intersect_linear(&model, &ray, back_face);
            match (fast, slow) {
                (Some(a), Some(b)) => {
                    assert!((a.t - b.t).abs() <= 1e-5 * a.t.max(1.0), "ray {}: {} vs {}", i, a.t, b.t);
                    hits += 1;
                }
                (None, None) => {}
                (a, b) => panic!("ray {}: bvh {:?} vs linear {:?}", i, a.map(|h| h.t), b.map(|h| h.t)),
            }
        }
        assert!(hits > 100);
    }

    #[test]
    fn test_bvh_covers_every_triangle_once() {
        let model = Arc::new(random_model(3, 300));
        let bvh = Bvh::build(model.clone());
        assert_eq!(subtree_count(&bvh, 0), 300);

        let mut seen: Vec<(u32, u32)> = bvh.triangles().iter().map(|t| (t.mesh, t.triangle)).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 300);
        assert_eq!(bvh.stats().triangles, 300);
        assert_eq!(bvh.stats().nodes, bvh.nodes().len());
    }

    #[test]
    fn test_sah_split_never_worse_than_leaf() {
        let bvh = Bvh::build(Arc::new(random_model(11, 400)));
        for node in bvh.nodes() {
            if let BvhNode::Inner { bbox, children } = node {
                let [l, r] = children.map(|c| c as usize);
                let n_left = subtree_count(&bvh, l);
                let n_right = subtree_count(&bvh, r);
                let cost = split_cost(
                    bvh.nodes()[l].bbox().surface_area(),
                    n_left,
                    bvh.nodes()[r].bbox().surface_area(),
                    n_right,
                    bbox.surface_area(),
                );
                assert!(cost <= COST_TRIANGLE * (n_left + n_right) as f32 + 1e-3);
                assert!(n_left > 0 && n_right > 0);
            }
        }
    }

    #[test]
    fn test_children_inside_parent() {
        let bvh = Bvh::build(Arc::new(random_model(5, 250)));
        for node in bvh.nodes() {
            if let BvhNode::Inner { bbox, children } = node {
                for &c in children {
                    let child = bvh.nodes()[c as usize].bbox();
                    assert!(bbox.contains(child.min()));
                    assert!(bbox.contains(child.max()));
                }
            }
        }
    }

    #[test]
    fn test_coincident_centroids_terminate() {
        // Many identical triangles cannot be separated; build must still finish
        let mut model = Model::new();
        let mat = model.add_material(Material::default());
        let mut positions = Vec::new();
        for _ in 0..64 {
            positions.extend([Vec3::ZERO, Vec3::X, Vec3::Y]);
        }
        let indices = (0..positions.len() as u32).collect();
        model
            .add_mesh(Mesh::new("stack", positions, indices, None, None, mat).unwrap())
            .unwrap();

        let bvh = Bvh::build(Arc::new(model));
        assert_eq!(subtree_count(&bvh, 0), 64);
        let hit = bvh.intersect(&Ray::new(Vec3::new(0.2, 0.2, 1.0), Vec3::NEG_Z), false);
        assert!((hit.unwrap().t - 1.0).abs() < 1e-5);
    }
}
