//! Wavefront OBJ/MTL scene loading.
//!
//! The OBJ is loaded triangulated and single-indexed through `tobj`. MTL
//! statements map onto [`Material`] as follows:
//!
//! | MTL      | Material field                           |
//! |----------|------------------------------------------|
//! | `Kd`     | `diffuse`                                |
//! | `Ks`     | `specular`                               |
//! | `Ns`     | `shininess`                              |
//! | `Ni`     | `ior`                                    |
//! | `Ke`     | `emissive`                               |
//! | `Kr`     | `reflective`                             |
//! | `Tf`     | `transparent` (or `1 - d` without `Tf`)  |
//! | `map_Kd` | `texture`                                |

use std::fs;
use std::path::Path;
use std::time::Instant;

use lumo_math::{Vec2, Vec3};
use serde::de::DeserializeOwned;

use crate::{Material, Mesh, Model, SceneError, SceneResult, TextureCache};

/// Load an OBJ file (and the MTL libraries it references) into a [`Model`].
///
/// Texture paths are resolved relative to the OBJ's directory. Missing
/// normals are generated, UVs are flipped vertically so that `v = 0` is the
/// top row of the texture image. Meshes without a material share an
/// appended default material.
pub fn load_obj(path: impl AsRef<Path>) -> SceneResult<Model> {
    let path = path.as_ref();
    let start = Instant::now();

    let (obj_models, obj_materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..Default::default()
        },
    )?;

    let obj_materials = obj_materials.unwrap_or_else(|e| {
        log::warn!("Failed to load materials for {}: {}", path.display(), e);
        Vec::new()
    });

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut textures = TextureCache::with_base_dir(base_dir);

    let mut model = Model::new();
    for material in &obj_materials {
        model.add_material(convert_material(material, &mut textures)?);
    }

    let mut default_material = None;
    for obj_model in &obj_models {
        let mesh = &obj_model.mesh;

        let material_index = match mesh.material_id {
            Some(id) if id < model.materials.len() => id,
            other => {
                if let Some(id) = other {
                    log::warn!(
                        "Mesh '{}' references unknown material {}, using default",
                        obj_model.name,
                        id
                    );
                }
                *default_material.get_or_insert_with(|| model.add_material(Material::default()))
            }
        };

        let positions: Vec<Vec3> = mesh
            .positions
            .chunks_exact(3)
            .map(|p| Vec3::new(p[0], p[1], p[2]))
            .collect();

        let normals = (!mesh.normals.is_empty()).then(|| {
            mesh.normals
                .chunks_exact(3)
                .map(|n| Vec3::new(n[0], n[1], n[2]))
                .collect::<Vec<_>>()
        });
        if normals.is_none() {
            log::debug!("Mesh '{}' has no normals, generating", obj_model.name);
        }

        let uvs = (!mesh.texcoords.is_empty()).then(|| {
            mesh.texcoords
                .chunks_exact(2)
                .map(|t| Vec2::new(t[0], 1.0 - t[1]))
                .collect::<Vec<_>>()
        });

        let mesh = Mesh::new(
            obj_model.name.clone(),
            positions,
            mesh.indices.clone(),
            normals,
            uvs,
            material_index,
        )?;
        log::debug!(
            "Mesh '{}': {} vertices, {} triangles, material {}",
            mesh.name,
            mesh.positions.len(),
            mesh.triangle_count(),
            material_index
        );
        model.add_mesh(mesh)?;
    }

    if model.is_empty() {
        return Err(SceneError::EmptyScene(path.display().to_string()));
    }

    log::info!(
        "Loaded {}: {} meshes, {} triangles, {} materials, {} textures in {:.2?}",
        path.display(),
        model.meshes.len(),
        model.triangle_count(),
        model.materials.len(),
        textures.len(),
        start.elapsed()
    );

    Ok(model)
}

fn convert_material(material: &tobj::Material, textures: &mut TextureCache) -> SceneResult<Material> {
    let color = |c: Option<[f32; 3]>| c.map(Vec3::from_array);
    let extra = |key: &str| {
        material
            .unknown_param
            .get(key)
            .and_then(|value| parse_color(value))
    };

    let defaults = Material::default();
    let transparent = extra("Tf")
        .or_else(|| material.dissolve.map(|d| Vec3::splat(1.0 - d)))
        .unwrap_or(defaults.transparent);

    let texture = match &material.diffuse_texture {
        Some(name) if !name.is_empty() => Some(textures.load(name)?),
        _ => None,
    };

    Ok(Material {
        name: material.name.clone(),
        diffuse: color(material.diffuse).unwrap_or(defaults.diffuse),
        specular: color(material.specular).unwrap_or(defaults.specular),
        shininess: material.shininess.unwrap_or(defaults.shininess),
        emissive: color(material.emissive)
            .or_else(|| extra("Ke"))
            .unwrap_or(defaults.emissive),
        reflective: extra("Kr").unwrap_or(defaults.reflective),
        transparent,
        ior: material.optical_density.unwrap_or(defaults.ior),
        texture,
    })
}

/// Parse an MTL color value: three floats, or one float for a gray.
fn parse_color(value: &str) -> Option<Vec3> {
    let values: Vec<f32> = value
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    match values.as_slice() {
        [v] => Some(Vec3::splat(*v)),
        [r, g, b, ..] => Some(Vec3::new(*r, *g, *b)),
        _ => None,
    }
}

/// Read and deserialize a JSON document.
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> SceneResult<T> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
