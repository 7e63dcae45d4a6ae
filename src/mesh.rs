//! Wavefront OBJ loading
//!
//! Produces one [`Mesh`] per `o`/`g` section. Each mesh owns a de-duplicated
//! vertex list and indices local to that list, the same shape the geometry
//! store expects from any loader.

use crate::error::LoadError;
use nalgebra::Vector3;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// A single vertex as delivered by the loader
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshVertex {
    pub position: Vector3<f32>,
    pub normal: Vector3<f32>,
}

/// One loaded sub-mesh with mesh-local triangle indices
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Corner of a face: position index and optional normal index (both 0-based)
type Corner = (usize, Option<usize>);

/// Accumulates the mesh currently being parsed
#[derive(Default)]
struct MeshBuilder {
    mesh: Mesh,
    lookup: HashMap<(usize, Option<usize>, u32), u32>,
    faces: u32,
}

impl MeshBuilder {
    fn named(name: &str) -> Self {
        Self {
            mesh: Mesh {
                name: name.to_string(),
                ..Mesh::default()
            },
            ..Self::default()
        }
    }

    /// Push a triangle, generating the face normal when a corner has none
    fn push_triangle(
        &mut self,
        corners: [Corner; 3],
        positions: &[Vector3<f32>],
        normals: &[Vector3<f32>],
    ) {
        let p: Vec<Vector3<f32>> = corners.iter().map(|(v, _)| positions[*v]).collect();
        let face_normal = (p[1] - p[0]).cross(&(p[2] - p[0]));
        let face_normal = face_normal.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros);
        let face_id = self.faces;
        self.faces += 1;

        for (position, normal) in corners {
            // Generated normals are per face, so those corners can't be shared
            let key = match normal {
                Some(_) => (position, normal, u32::MAX),
                None => (position, None, face_id),
            };
            let next = self.mesh.vertices.len() as u32;
            let index = *self.lookup.entry(key).or_insert_with(|| {
                self.mesh.vertices.push(MeshVertex {
                    position: positions[position],
                    normal: normal.map(|n| normals[n]).unwrap_or(face_normal),
                });
                next
            });
            self.mesh.indices.push(index);
        }
    }

    fn finish(self, out: &mut Vec<Mesh>) {
        if !self.mesh.indices.is_empty() {
            out.push(self.mesh);
        }
    }
}

/// Resolve a 1-based (or negative, relative) OBJ index
fn resolve_index(token: &str, count: usize, line: usize) -> Result<usize, LoadError> {
    let raw: i64 = token.parse().map_err(|_| LoadError::Parse {
        line,
        message: format!("invalid index '{}'", token),
    })?;
    let resolved = if raw > 0 {
        raw - 1
    } else if raw < 0 {
        count as i64 + raw
    } else {
        -1
    };
    if resolved < 0 || resolved as usize >= count {
        return Err(LoadError::Parse {
            line,
            message: format!("index {} out of range (have {})", raw, count),
        });
    }
    Ok(resolved as usize)
}

fn parse_vector(
    parts: &mut std::str::SplitWhitespace<'_>,
    line: usize,
) -> Result<Vector3<f32>, LoadError> {
    let mut component = |axis: &str| -> Result<f32, LoadError> {
        let token = parts.next().ok_or_else(|| LoadError::Parse {
            line,
            message: format!("missing {} coordinate", axis),
        })?;
        token.parse::<f32>().map_err(|_| LoadError::Parse {
            line,
            message: format!("invalid {} coordinate '{}'", axis, token),
        })
    };
    Ok(Vector3::new(component("x")?, component("y")?, component("z")?))
}

/// Parse OBJ text from any reader
pub fn parse_obj<R: Read>(reader: R) -> Result<Vec<Mesh>, LoadError> {
    let mut positions: Vec<Vector3<f32>> = Vec::new();
    let mut normals: Vec<Vector3<f32>> = Vec::new();
    let mut meshes = Vec::new();
    let mut current = MeshBuilder::named("unnamed");

    for (number, line_result) in BufReader::new(reader).lines().enumerate() {
        let line_no = number + 1;
        let line = line_result?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };

        match keyword {
            "v" => positions.push(parse_vector(&mut parts, line_no)?),
            "vn" => normals.push(parse_vector(&mut parts, line_no)?),
            "o" | "g" => {
                let name = parts.collect::<Vec<_>>().join(" ");
                let finished = std::mem::replace(&mut current, MeshBuilder::named(&name));
                finished.finish(&mut meshes);
            }
            "f" => {
                let mut corners: Vec<Corner> = Vec::new();
                for token in parts {
                    let mut fields = token.split('/');
                    let position = resolve_index(fields.next().unwrap_or(""), positions.len(), line_no)?;
                    let _texcoord = fields.next();
                    let normal = match fields.next() {
                        Some(n) if !n.is_empty() => Some(resolve_index(n, normals.len(), line_no)?),
                        _ => None,
                    };
                    corners.push((position, normal));
                }
                if corners.len() < 3 {
                    return Err(LoadError::Parse {
                        line: line_no,
                        message: format!("face needs at least 3 vertices, got {}", corners.len()),
                    });
                }
                // Fan triangulation for quads and larger polygons
                for i in 1..corners.len() - 1 {
                    current.push_triangle([corners[0], corners[i], corners[i + 1]], &positions, &normals);
                }
            }
            // Texture coordinates, materials and smoothing groups don't affect shading here
            _ => {}
        }
    }

    current.finish(&mut meshes);
    Ok(meshes)
}

/// Load an OBJ file from disk
pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Vec<Mesh>, LoadError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .map_err(|e| LoadError::LoadFailure(format!("{}: {}", path.display(), e)))?;
    let meshes = parse_obj(file)?;
    tracing::debug!(
        path = %path.display(),
        meshes = meshes.len(),
        "Parsed OBJ file"
    );
    Ok(meshes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
f 1//1 2//1 3//1 4//1
";

    #[test]
    fn test_quad_is_fan_triangulated() {
        let meshes = parse_obj(QUAD.as_bytes()).unwrap();
        assert_eq!(meshes.len(), 1);
        let mesh = &meshes[0];
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.vertices[0].normal, Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_missing_normals_use_face_normal() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let meshes = parse_obj(src.as_bytes()).unwrap();
        for vertex in &meshes[0].vertices {
            assert!((vertex.normal - Vector3::new(0.0, 0.0, 1.0)).norm() < 1e-6);
        }
    }

    #[test]
    fn test_full_corner_syntax_and_negative_indices() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvn 0 0 -1\nf -3/1/1 -2/1/1 -1/1/1\n";
        let meshes = parse_obj(src.as_bytes()).unwrap();
        assert_eq!(meshes[0].indices, vec![0, 1, 2]);
        assert_eq!(meshes[0].vertices[2].position, Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(meshes[0].vertices[0].normal, Vector3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_objects_split_into_meshes_with_local_indices() {
        let src = "\
o first
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
o second
v 0 0 1
v 1 0 1
v 0 1 1
f 4 5 6
";
        let meshes = parse_obj(src.as_bytes()).unwrap();
        assert_eq!(meshes.len(), 2);
        assert_eq!(meshes[0].name, "first");
        assert_eq!(meshes[1].name, "second");
        assert_eq!(meshes[1].indices, vec![0, 1, 2]);
        assert_eq!(meshes[1].vertices[0].position.z, 1.0);
    }

    #[test]
    fn test_bad_coordinate_reports_line() {
        let src = "v 0 0 0\nv 1 nope 0\n";
        let err = parse_obj(src.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_out_of_range_face_index() {
        let src = "v 0 0 0\nf 1 2 3\n";
        assert!(matches!(
            parse_obj(src.as_bytes()).unwrap_err(),
            LoadError::Parse { line: 2, .. }
        ));
    }

    #[test]
    fn test_empty_source_yields_no_meshes() {
        let meshes = parse_obj("# nothing here\n".as_bytes()).unwrap();
        assert!(meshes.is_empty());
    }

    #[test]
    fn test_missing_file_is_load_failure() {
        let err = load_obj("/nonexistent/model.obj").unwrap_err();
        assert!(matches!(err, LoadError::LoadFailure(_)));
    }
}
