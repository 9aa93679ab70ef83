//! Triangle extraction from host geometry resources.
//!
//! A node either renders a whole geometry resource (model) or a sub-range of its parent
//! model's resource (mesh). Both cases reduce to the same walk:
//!
//! - vertex window: `positions[vertex_start * 3 .. (vertex_start + vertex_count) * 3]`
//! - index window:  `indices[index_start .. index_start + index_count]`
//! - every index is rebased by `vertex_start` before it addresses the vertex window
//! - indices are consumed three at a time; one or two trailing indices are dropped
//!
//! Streams are copied out while the host lends them; nothing borrowed survives the call.

use nalgebra as na;

use crate::{
    error::GeometryError,
    scene::{IndexStream, NodeId, NodeKind, ResourceId, SceneGraph},
};

pub type Point3 = na::Point3<f32>;

/// Triangles in local mesh space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriangleBuffer {
    pub triangles: Vec<[Point3; 3]>,
}

impl TriangleBuffer {
    #[inline]
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// All corners, three per triangle, in emission order.
    pub fn points(&self) -> Vec<Point3> {
        self.triangles.iter().flatten().copied().collect()
    }

    /// Unshared vertices plus one `[u32; 3]` per triangle, the layout a triangle mesh
    /// shape expects.
    pub fn to_indexed(&self) -> (Vec<Point3>, Vec<[u32; 3]>) {
        let points = self.points();
        let indices = (0..self.triangles.len() as u32)
            .map(|t| [t * 3, t * 3 + 1, t * 3 + 2])
            .collect();
        (points, indices)
    }
}

/// Where in a geometry resource a node's triangles live.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct SourceRange {
    resource: ResourceId,
    vertex_start: u32,
    vertex_count: u32,
    index_start: u32,
    index_count: u32,
}

fn resolve_range(scene: &dyn SceneGraph, node: NodeId) -> Result<SourceRange, GeometryError> {
    match scene.node_kind(node) {
        NodeKind::Mesh => {
            let resource = scene
                .parent(node)
                .and_then(|model| scene.node_geometry(model))
                .ok_or(GeometryError::MissingResource { node })?;
            let range = scene
                .mesh_range(node)
                .ok_or(GeometryError::MissingRange { node })?;
            Ok(SourceRange {
                resource,
                vertex_start: range.vertex_start,
                vertex_count: range.vertex_count(),
                index_start: range.batch_start,
                index_count: range.batch_count,
            })
        }
        NodeKind::Model => {
            let resource = scene
                .node_geometry(node)
                .ok_or(GeometryError::MissingResource { node })?;
            let counts = scene
                .geometry_counts(resource)
                .ok_or(GeometryError::MissingCounts { resource })?;
            Ok(SourceRange {
                resource,
                vertex_start: 0,
                vertex_count: counts.vertices,
                index_start: 0,
                index_count: counts.indices,
            })
        }
        kind @ NodeKind::Other => Err(GeometryError::UnsupportedNode { node, kind }),
    }
}

/// Copy `start..start + len` out of `stream`.
fn copy_window<T: Copy>(stream: &[T], start: usize, len: usize) -> Result<Vec<T>, GeometryError> {
    let end = start.saturating_add(len);
    stream
        .get(start..end)
        .map(<[T]>::to_vec)
        .ok_or(GeometryError::RangeOutOfBounds {
            start,
            end,
            len: stream.len(),
        })
}

/// Read the triangles drawn by `node` in its own local mesh space.
pub fn extract_triangles(
    scene: &dyn SceneGraph,
    node: NodeId,
) -> Result<TriangleBuffer, GeometryError> {
    let src = resolve_range(scene, node)?;

    let mut positions = None;
    let mapped = scene.with_vertex_positions(src.resource, &mut |stream: &[f32]| {
        positions = Some(copy_window(
            stream,
            src.vertex_start as usize * 3,
            src.vertex_count as usize * 3,
        ));
    });
    let positions = match positions {
        Some(window) if mapped => window?,
        _ => {
            return Err(GeometryError::MissingPositions {
                resource: src.resource,
            });
        }
    };

    let mut indices = None;
    let mapped = scene.with_index_stream(src.resource, &mut |stream: IndexStream<'_>| {
        let start = src.index_start as usize;
        let count = src.index_count as usize;
        indices = Some(
            stream
                .copy_range(start, count)
                .ok_or(GeometryError::RangeOutOfBounds {
                    start,
                    end: start.saturating_add(count),
                    len: stream.len(),
                }),
        );
    });
    let indices = match indices {
        Some(window) if mapped => window?,
        _ => {
            return Err(GeometryError::MissingIndices {
                resource: src.resource,
            });
        }
    };

    build_triangles(&positions, &indices, src.vertex_start, src.vertex_count)
}

/// Walk `indices` three at a time and look each corner up in the vertex window.
///
/// `positions` is the vertex window (starting at `vertex_start`); `indices` are absolute
/// indices into the full resource.
fn build_triangles(
    positions: &[f32],
    indices: &[u32],
    vertex_start: u32,
    vertex_count: u32,
) -> Result<TriangleBuffer, GeometryError> {
    if indices.len() < 3 {
        return Err(GeometryError::NoTriangles {
            count: indices.len(),
        });
    }

    let corner = |index: u32| -> Result<Point3, GeometryError> {
        let out_of_range = GeometryError::IndexOutOfRange {
            index,
            start: vertex_start,
            end: vertex_start.saturating_add(vertex_count),
        };
        let local = index.checked_sub(vertex_start).ok_or(out_of_range.clone())? as usize * 3;
        match positions.get(local..local + 3) {
            Some(p) => Ok(Point3::new(p[0], p[1], p[2])),
            None => Err(out_of_range),
        }
    };

    let triangles = indices
        .chunks_exact(3)
        .map(|tri| Ok([corner(tri[0])?, corner(tri[1])?, corner(tri[2])?]))
        .collect::<Result<Vec<_>, GeometryError>>()?;

    Ok(TriangleBuffer { triangles })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{GeometryData, MemoryScene, MeshRange};

    /// Two quads side by side: 8 vertices, 12 indices.
    fn two_quads() -> (Vec<f32>, Vec<u32>) {
        let mut positions = Vec::new();
        for x in 0..4 {
            positions.extend_from_slice(&[x as f32, 0.0, 0.0]);
            positions.extend_from_slice(&[x as f32, 1.0, 0.0]);
        }
        let indices = vec![0, 2, 1, 1, 2, 3, 4, 6, 5, 5, 6, 7];
        (positions, indices)
    }

    fn model_scene(data: GeometryData) -> (MemoryScene, NodeId) {
        let mut scene = MemoryScene::new();
        let res = scene.add_geometry(data);
        let model = scene.add_model(MemoryScene::ROOT, na::Matrix4::identity(), res);
        (scene, model)
    }

    #[test]
    fn model_node_uses_whole_resource() {
        let (positions, indices) = two_quads();
        let (scene, model) = model_scene(GeometryData::with_u32(positions, indices));

        let tris = extract_triangles(&scene, model).unwrap();
        assert_eq!(tris.len(), 4);
        assert_eq!(tris.triangles[0][1], Point3::new(1.0, 0.0, 0.0));
        assert_eq!(tris.triangles[3][2], Point3::new(3.0, 1.0, 0.0));
    }

    #[test]
    fn sixteen_and_thirty_two_bit_indices_agree() {
        let (positions, indices) = two_quads();
        let narrow: Vec<u16> = indices.iter().map(|&i| i as u16).collect();

        let (wide_scene, wide) = model_scene(GeometryData::with_u32(positions.clone(), indices));
        let (narrow_scene, short) = model_scene(GeometryData::with_u16(positions, narrow));

        assert_eq!(
            extract_triangles(&wide_scene, wide).unwrap(),
            extract_triangles(&narrow_scene, short).unwrap()
        );
    }

    #[test]
    fn mesh_node_honors_vertex_and_batch_offsets() {
        let (positions, indices) = two_quads();
        let mut scene = MemoryScene::new();
        let res = scene.add_geometry(GeometryData::with_u16(
            positions,
            indices.iter().map(|&i| i as u16).collect(),
        ));
        let model = scene.add_model(MemoryScene::ROOT, na::Matrix4::identity(), res);
        // Second quad only: vertices 4..=7, indices 6..12.
        let mesh = scene.add_mesh(
            model,
            na::Matrix4::identity(),
            MeshRange {
                vertex_start: 4,
                vertex_end: 7,
                batch_start: 6,
                batch_count: 6,
            },
        );

        let tris = extract_triangles(&scene, mesh).unwrap();
        assert_eq!(tris.len(), 2);
        assert_eq!(tris.triangles[0][0], Point3::new(2.0, 0.0, 0.0));
        assert_eq!(tris.triangles[1][2], Point3::new(3.0, 1.0, 0.0));
    }

    #[test]
    fn trailing_indices_are_dropped() {
        let (positions, _) = two_quads();
        for (count, expected) in [(3usize, 1usize), (5, 1), (6, 2), (7, 2), (8, 2), (9, 3)] {
            let indices: Vec<u32> = (0..count as u32).map(|i| i % 8).collect();
            let (scene, model) = model_scene(GeometryData::with_u32(positions.clone(), indices));
            let tris = extract_triangles(&scene, model).unwrap();
            assert_eq!(tris.len(), expected, "{count} indices");
        }
    }

    #[test]
    fn fewer_than_three_indices_yield_nothing() {
        let (positions, _) = two_quads();
        let (scene, model) = model_scene(GeometryData::with_u32(positions, vec![0, 1]));
        assert_eq!(
            extract_triangles(&scene, model),
            Err(GeometryError::NoTriangles { count: 2 })
        );
    }

    #[test]
    fn missing_streams_fail() {
        let (positions, indices) = two_quads();

        let (scene, model) = model_scene(GeometryData {
            positions: None,
            indices: Some(crate::scene::memory::IndexData::U32(indices)),
        });
        assert!(matches!(
            extract_triangles(&scene, model),
            Err(GeometryError::MissingPositions { .. })
        ));

        let (scene, model) = model_scene(GeometryData {
            positions: Some(positions),
            indices: None,
        });
        assert!(matches!(
            extract_triangles(&scene, model),
            Err(GeometryError::MissingIndices { .. })
        ));
    }

    #[test]
    fn unknown_resource_reports_missing_counts() {
        let mut scene = MemoryScene::new();
        let model = scene.add_model(MemoryScene::ROOT, na::Matrix4::identity(), 99);
        assert_eq!(
            extract_triangles(&scene, model),
            Err(GeometryError::MissingCounts { resource: 99 })
        );
    }

    #[test]
    fn out_of_range_index_fails_instead_of_reading_past_the_window() {
        let (positions, _) = two_quads();
        let (scene, model) = model_scene(GeometryData::with_u32(positions, vec![0, 1, 8]));
        assert!(matches!(
            extract_triangles(&scene, model),
            Err(GeometryError::IndexOutOfRange { index: 8, .. })
        ));
    }

    #[test]
    fn batch_past_end_of_stream_fails() {
        let (positions, indices) = two_quads();
        let mut scene = MemoryScene::new();
        let res = scene.add_geometry(GeometryData::with_u32(positions, indices));
        let model = scene.add_model(MemoryScene::ROOT, na::Matrix4::identity(), res);
        let mesh = scene.add_mesh(
            model,
            na::Matrix4::identity(),
            MeshRange {
                vertex_start: 0,
                vertex_end: 7,
                batch_start: 9,
                batch_count: 6,
            },
        );
        assert!(matches!(
            extract_triangles(&scene, mesh),
            Err(GeometryError::RangeOutOfBounds { .. })
        ));
    }

    #[test]
    fn group_nodes_carry_no_geometry() {
        let mut scene = MemoryScene::new();
        let group = scene.add_group(MemoryScene::ROOT, na::Matrix4::identity());
        assert!(matches!(
            extract_triangles(&scene, group),
            Err(GeometryError::UnsupportedNode { .. })
        ));
    }

    #[test]
    fn indexed_layout_matches_triangle_order() {
        let buf = TriangleBuffer {
            triangles: vec![
                [Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
                [Point3::origin(), Point3::new(0.0, 0.0, 1.0), Point3::new(0.0, 1.0, 0.0)],
            ],
        };
        let (points, idx) = buf.to_indexed();
        assert_eq!(points.len(), 6);
        assert_eq!(idx, vec![[0, 1, 2], [3, 4, 5]]);
        assert_eq!(points[4], Point3::new(0.0, 0.0, 1.0));
    }
}
