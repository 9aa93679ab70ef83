/*!
Host scene-graph seam.

The physics bridge never owns scene nodes or geometry. Everything it needs from the host
renderer goes through [`SceneGraph`]:

- node queries:   kind, parent, absolute world transform
- node updates:   parent-relative transform + "transform changed" notification
- geometry reads: vertex positions and indices of a geometry resource

Geometry access is scoped. The host lends a slice to a visitor closure for the duration of
one call and may unmap it right afterwards; the borrow cannot outlive the call, so no
pointer into host-owned storage is ever retained.

[`MemoryScene`] is a self-contained implementation used by the sample and the tests.
*/

pub mod memory;

pub use memory::{GeometryData, MemoryScene};

use nalgebra as na;

/// Handle of a node in the host scene graph.
pub type NodeId = i32;

/// Handle of a geometry resource in the host.
pub type ResourceId = i32;

/// Node kinds the bridge distinguishes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Renders a whole shared geometry resource.
    Model,
    /// Renders a vertex/index sub-range of its parent model's geometry.
    Mesh,
    /// Anything else (groups, lights, cameras, ...).
    Other,
}

/// Sub-range of a shared geometry resource drawn by a mesh node.
///
/// `vertex_end` is inclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MeshRange {
    pub vertex_start: u32,
    pub vertex_end: u32,
    pub batch_start: u32,
    pub batch_count: u32,
}

impl MeshRange {
    #[inline]
    pub fn vertex_count(&self) -> u32 {
        (self.vertex_end + 1).saturating_sub(self.vertex_start)
    }
}

/// Element counts of a whole geometry resource.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GeometryCounts {
    pub vertices: u32,
    pub indices: u32,
}

/// Borrowed view of an index stream in either width the host stores.
#[derive(Copy, Clone, Debug)]
pub enum IndexStream<'a> {
    U16(&'a [u16]),
    U32(&'a [u32]),
}

impl IndexStream<'_> {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            IndexStream::U16(s) => s.len(),
            IndexStream::U32(s) => s.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy `start..start + count` out as 32-bit indices, or `None` if out of range.
    pub fn copy_range(&self, start: usize, count: usize) -> Option<Vec<u32>> {
        let end = start.checked_add(count)?;
        match self {
            IndexStream::U16(s) => Some(s.get(start..end)?.iter().map(|&i| i as u32).collect()),
            IndexStream::U32(s) => Some(s.get(start..end)?.to_vec()),
        }
    }
}

/// Everything the physics bridge consumes from, and pushes to, the host scene graph.
///
/// Transforms are column-major 4x4 matrices (OpenGL convention).
pub trait SceneGraph {
    fn node_kind(&self, node: NodeId) -> NodeKind;

    /// Parent of `node`, `None` for the root or unknown nodes.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Absolute world transform of `node`, `None` if unavailable.
    fn world_transform(&self, node: NodeId) -> Option<na::Matrix4<f32>>;

    /// Store `relative` as the transform of `node` relative to its parent.
    fn set_relative_transform(&mut self, node: NodeId, relative: &na::Matrix4<f32>);

    /// Tell the host that `node`'s transform changed so dependent state gets recomputed.
    fn mark_transform_dirty(&mut self, node: NodeId);

    /// Geometry resource rendered by a model node.
    fn node_geometry(&self, model: NodeId) -> Option<ResourceId>;

    /// Vertex and batch range drawn by a mesh node.
    fn mesh_range(&self, mesh: NodeId) -> Option<MeshRange>;

    /// Total vertex and index counts of a geometry resource.
    fn geometry_counts(&self, resource: ResourceId) -> Option<GeometryCounts>;

    /// Lend the flat `xyz` position stream of `resource` to `visit`.
    ///
    /// Returns `false` without calling `visit` if the stream is unavailable.
    fn with_vertex_positions(&self, resource: ResourceId, visit: &mut dyn FnMut(&[f32])) -> bool;

    /// Lend the index stream of `resource`, in whatever width it is stored, to `visit`.
    ///
    /// Returns `false` without calling `visit` if the stream is unavailable.
    fn with_index_stream(
        &self,
        resource: ResourceId,
        visit: &mut dyn FnMut(IndexStream<'_>),
    ) -> bool;
}
