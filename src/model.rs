//! glTF model loading.
//!
//! Parsing is delegated entirely to the [`gltf`] crate; this module only
//! resolves buffer sources, walks the scene-node tree once and flattens
//! every node's mesh primitives into a list the GPU layer can upload.

use std::path::Path;
use std::sync::Arc;

use glam::{Vec2, Vec3};

use crate::abs::{Mesh, Vertex};

/// Vertex layout shared by every loaded primitive.
#[derive(Clone, Copy)]
#[repr(C, packed)]
pub struct ModelVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl Vertex for ModelVertex {
    fn vertex_attribs(gl: &glow::Context) {
        use glow::HasContext;
        unsafe {
            let stride = std::mem::size_of::<ModelVertex>() as i32;

            gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, stride, 0);
            gl.enable_vertex_attrib_array(0);

            gl.vertex_attrib_pointer_f32(
                1,
                3,
                glow::FLOAT,
                false,
                stride,
                std::mem::size_of::<Vec3>() as i32,
            );
            gl.enable_vertex_attrib_array(1);

            gl.vertex_attrib_pointer_f32(
                2,
                2,
                glow::FLOAT,
                false,
                stride,
                2 * std::mem::size_of::<Vec3>() as i32,
            );
            gl.enable_vertex_attrib_array(2);
        }
    }
}

/// CPU-side data of a single mesh primitive.
pub struct MeshData {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

/// Flat list of every mesh primitive found in a model file.
pub struct ModelData {
    pub meshes: Vec<MeshData>,
}

impl ModelData {
    /// Uploads every mesh to the GPU.
    pub fn upload(&self, gl: &Arc<glow::Context>) -> Vec<Mesh> {
        self.meshes
            .iter()
            .map(|mesh| Mesh::new(gl, &mesh.vertices, &mesh.indices, glow::TRIANGLES))
            .collect()
    }
}

/// Loads a glTF file and flattens its scene graph into a [`ModelData`].
pub fn load_model(path: impl AsRef<Path>) -> Result<ModelData, String> {
    let path = path.as_ref();
    let gltf = gltf::Gltf::open(path).map_err(|e| e.to_string())?;
    let directory = path.parent().unwrap_or_else(|| Path::new("."));

    // Buffers referenced by URI live next to the model file.
    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                let blob = gltf
                    .blob
                    .as_deref()
                    .ok_or_else(|| "Model references a missing binary chunk".to_string())?;
                buffer_data.push(blob.to_vec());
            }
            gltf::buffer::Source::Uri(uri) => {
                if uri.starts_with("data:") {
                    return Err("Embedded data URIs are not supported".to_string());
                }
                let bin_path = directory.join(uri);
                let bin = std::fs::read(&bin_path)
                    .map_err(|e| format!("Failed to read {}: {}", bin_path.display(), e))?;
                buffer_data.push(bin);
            }
        }
    }

    let mut meshes = Vec::new();
    for scene in gltf.scenes() {
        for node in scene.nodes() {
            collect_node(node, &buffer_data, &mut meshes)?;
        }
    }
    if meshes.is_empty() {
        return Err(format!("{} contains no meshes", path.display()));
    }

    Ok(ModelData { meshes })
}

fn collect_node(
    node: gltf::Node,
    buffer_data: &[Vec<u8>],
    meshes: &mut Vec<MeshData>,
) -> Result<(), String> {
    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            meshes.push(read_primitive(&primitive, buffer_data)?);
        }
    }
    for child in node.children() {
        collect_node(child, buffer_data, meshes)?;
    }
    Ok(())
}

fn read_primitive(
    primitive: &gltf::Primitive,
    buffer_data: &[Vec<u8>],
) -> Result<MeshData, String> {
    let reader = primitive.reader(|buffer| buffer_data.get(buffer.index()).map(Vec::as_slice));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or_else(|| "Primitive has no positions".to_string())?
        .collect();
    let normals: Vec<[f32; 3]> = match reader.read_normals() {
        Some(iter) => iter.collect(),
        None => vec![[0.0, 0.0, 0.0]; positions.len()],
    };
    let uvs: Vec<[f32; 2]> = match reader.read_tex_coords(0) {
        Some(read) => read.into_f32().collect(),
        None => vec![[0.0, 0.0]; positions.len()],
    };
    if normals.len() != positions.len() || uvs.len() != positions.len() {
        return Err("Primitive attribute counts do not match".to_string());
    }

    let vertices = positions
        .iter()
        .zip(&normals)
        .zip(&uvs)
        .map(|((position, normal), uv)| ModelVertex {
            position: Vec3::from_array(*position),
            normal: Vec3::from_array(*normal),
            uv: Vec2::from_array(*uv),
        })
        .collect();
    let indices: Vec<u32> = match reader.read_indices() {
        Some(read) => read.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    Ok(MeshData { vertices, indices })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn cube_path() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/models/cube.gltf")
    }

    #[test]
    fn bundled_cube_flattens_to_one_mesh() {
        // The cube mesh hangs off a child node, so this also exercises the
        // recursive traversal.
        let model = load_model(cube_path()).unwrap();
        assert_eq!(model.meshes.len(), 1);
        let mesh = &model.meshes[0];
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        assert!(
            mesh.indices
                .iter()
                .all(|&i| (i as usize) < mesh.vertices.len())
        );
    }

    #[test]
    fn cube_normals_are_unit_length() {
        let model = load_model(cube_path()).unwrap();
        for vertex in &model.meshes[0].vertices {
            let normal = vertex.normal;
            assert!((normal.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn missing_file_errors() {
        assert!(load_model("assets/models/missing.gltf").is_err());
    }

    #[test]
    fn vertex_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<ModelVertex>(), 32);
    }
}
