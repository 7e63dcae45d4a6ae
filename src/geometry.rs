//! Flattened geometry buffers and bounding-box normalization

use crate::config::IndexMode;
use crate::error::LoadError;
use crate::mesh::Mesh;
use nalgebra::{Matrix4, Vector3};

/// Centering and uniform scale that fit a model into a unit cube
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub center: Vector3<f32>,
    pub scale: f32,
    /// Axis (0 = x, 1 = y, 2 = z) whose extent set the scale.
    /// Ties resolve to the lowest axis.
    pub dominant_axis: usize,
}

impl Normalization {
    /// Derive from an axis-aligned bounding box. `None` when the box is
    /// empty or flat in every direction.
    pub fn from_bounds(min: Vector3<f32>, max: Vector3<f32>) -> Option<Self> {
        let extent = max - min;
        let mut dominant_axis = 0;
        for axis in 1..3 {
            if extent[axis] > extent[dominant_axis] {
                dominant_axis = axis;
            }
        }
        let largest = extent[dominant_axis];
        if !(largest > 0.0) || !largest.is_finite() {
            return None;
        }
        Some(Self {
            center: (min + max) * 0.5,
            scale: 1.0 / largest,
            dominant_axis,
        })
    }

    /// `scale * translate(-center)`
    pub fn matrix(&self) -> Matrix4<f32> {
        Matrix4::new_scaling(self.scale) * Matrix4::new_translation(&-self.center)
    }
}

/// Vertex, normal and index buffers for everything that gets drawn
#[derive(Debug, Clone, Default)]
pub struct GeometryStore {
    vertices: Vec<f32>,
    normals: Vec<f32>,
    indices: Vec<u32>,
    normalization: Option<Normalization>,
}

impl GeometryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the buffers with the contents of `meshes`.
    ///
    /// Previous geometry is discarded even if this returns an error, so a
    /// failed reload never leaves half-merged buffers behind.
    pub fn load(&mut self, meshes: &[Mesh], mode: IndexMode) -> Result<(), LoadError> {
        self.vertices.clear();
        self.normals.clear();
        self.indices.clear();
        self.normalization = None;

        for mesh in meshes {
            let base = (self.vertices.len() / 3) as u32;
            for vertex in &mesh.vertices {
                self.vertices.extend_from_slice(vertex.position.as_slice());
                self.normals.extend_from_slice(vertex.normal.as_slice());
            }
            match mode {
                IndexMode::Offset => self.indices.extend(mesh.indices.iter().map(|i| i + base)),
                IndexMode::Shared => self.indices.extend_from_slice(&mesh.indices),
            }
        }

        if self.vertices.is_empty() {
            return Err(LoadError::EmptyGeometry);
        }

        let normalization = self.bounds().and_then(|(min, max)| Normalization::from_bounds(min, max));
        let Some(normalization) = normalization else {
            // Every vertex coincides; there's nothing to scale to
            self.vertices.clear();
            self.normals.clear();
            self.indices.clear();
            return Err(LoadError::EmptyGeometry);
        };
        self.normalization = Some(normalization);

        tracing::info!(
            vertices = self.vertex_count(),
            triangles = self.triangle_count(),
            center = ?normalization.center.as_slice(),
            scale = normalization.scale,
            "Geometry loaded"
        );
        Ok(())
    }

    /// Build a store straight from meshes
    pub fn from_meshes(meshes: &[Mesh], mode: IndexMode) -> Result<Self, LoadError> {
        let mut store = Self::new();
        store.load(meshes, mode)?;
        Ok(store)
    }

    fn bounds(&self) -> Option<(Vector3<f32>, Vector3<f32>)> {
        let mut points = self.vertices.chunks_exact(3).map(|p| Vector3::new(p[0], p[1], p[2]));
        let first = points.next()?;
        Some(points.fold((first, first), |(min, max), p| (min.inf(&p), max.sup(&p))))
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    pub fn normals(&self) -> &[f32] {
        &self.normals
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn normalization(&self) -> Option<Normalization> {
        self.normalization
    }

    /// Position of vertex `index`, or `None` if it is out of range
    pub fn position(&self, index: u32) -> Option<Vector3<f32>> {
        let i = index as usize * 3;
        self.vertices.get(i..i + 3).map(Vector3::from_column_slice)
    }

    pub fn normal(&self, index: u32) -> Option<Vector3<f32>> {
        let i = index as usize * 3;
        self.normals.get(i..i + 3).map(Vector3::from_column_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::MeshVertex;

    fn vertex(x: f32, y: f32, z: f32) -> MeshVertex {
        MeshVertex {
            position: Vector3::new(x, y, z),
            normal: Vector3::new(0.0, 0.0, 1.0),
        }
    }

    fn triangle_mesh(offset: f32) -> Mesh {
        Mesh {
            name: "tri".to_string(),
            vertices: vec![
                vertex(offset, 0.0, 0.0),
                vertex(offset + 1.0, 0.0, 0.0),
                vertex(offset, 1.0, 0.0),
            ],
            indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn test_normalization_from_bounds() {
        let n = Normalization::from_bounds(Vector3::new(-2.0, -1.0, 0.0), Vector3::new(2.0, 3.0, 4.0)).unwrap();
        assert_eq!(n.center, Vector3::new(0.0, 1.0, 2.0));
        assert!((n.scale - 0.25).abs() < 1e-6);
        // All three extents are 4; the tie resolves to x
        assert_eq!(n.dominant_axis, 0);
    }

    #[test]
    fn test_normalization_picks_largest_axis() {
        let n = Normalization::from_bounds(Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 2.0, 5.0)).unwrap();
        assert_eq!(n.dominant_axis, 2);
        assert!((n.scale - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_normalization_rejects_point_bounds() {
        let p = Vector3::new(1.0, 1.0, 1.0);
        assert!(Normalization::from_bounds(p, p).is_none());
    }

    #[test]
    fn test_normalization_matrix_maps_box_into_unit_cube() {
        let n = Normalization::from_bounds(Vector3::new(2.0, 2.0, 2.0), Vector3::new(4.0, 3.0, 3.0)).unwrap();
        let m = n.matrix();
        let corner = m.transform_point(&nalgebra::Point3::new(4.0, 3.0, 3.0));
        assert!((corner.x - 0.5).abs() < 1e-6);
        assert!((corner.y - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_load_empty_is_error() {
        let mut store = GeometryStore::new();
        assert!(matches!(store.load(&[], IndexMode::Offset), Err(LoadError::EmptyGeometry)));
        assert!(store.normalization().is_none());
    }

    #[test]
    fn test_load_single_point_is_error() {
        let mesh = Mesh {
            name: "p".to_string(),
            vertices: vec![vertex(1.0, 1.0, 1.0)],
            indices: vec![],
        };
        let mut store = GeometryStore::new();
        assert!(matches!(store.load(&[mesh], IndexMode::Offset), Err(LoadError::EmptyGeometry)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_offset_mode_rebases_indices() {
        let store = GeometryStore::from_meshes(&[triangle_mesh(0.0), triangle_mesh(5.0)], IndexMode::Offset).unwrap();
        assert_eq!(store.vertex_count(), 6);
        assert_eq!(store.indices(), &[0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_shared_mode_keeps_indices_verbatim() {
        let store = GeometryStore::from_meshes(&[triangle_mesh(0.0), triangle_mesh(5.0)], IndexMode::Shared).unwrap();
        assert_eq!(store.indices(), &[0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn test_reload_replaces_buffers() {
        let mut store = GeometryStore::from_meshes(&[triangle_mesh(0.0), triangle_mesh(5.0)], IndexMode::Offset).unwrap();
        store.load(&[triangle_mesh(0.0)], IndexMode::Offset).unwrap();
        assert_eq!(store.vertex_count(), 3);
        assert_eq!(store.triangle_count(), 1);
        assert_eq!(store.normalization().unwrap().center, Vector3::new(0.5, 0.5, 0.0));
    }

    #[test]
    fn test_vertex_accessors() {
        let store = GeometryStore::from_meshes(&[triangle_mesh(0.0)], IndexMode::Offset).unwrap();
        assert_eq!(store.position(1), Some(Vector3::new(1.0, 0.0, 0.0)));
        assert_eq!(store.normal(2), Some(Vector3::new(0.0, 0.0, 1.0)));
        assert_eq!(store.position(3), None);
    }

    #[test]
    fn test_buffers_are_flattened_with_stride_three() {
        let store = GeometryStore::from_meshes(&[triangle_mesh(2.0)], IndexMode::Offset).unwrap();
        assert_eq!(store.vertices(), &[2.0, 0.0, 0.0, 3.0, 0.0, 0.0, 2.0, 1.0, 0.0]);
        assert_eq!(store.normals().len(), 9);
        assert!(store.normals().chunks_exact(3).all(|n| n == [0.0, 0.0, 1.0]));
    }
}
