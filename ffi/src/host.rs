//! C callback table through which a native renderer exposes its scene graph.
//!
//! Conventions
//! - node and resource ids are the host's handles; `0` means "none"
//! - matrices are 16 column-major floats
//! - node type codes follow the renderer's numbering: `2` model, `3` mesh, anything else is
//!   neither
//! - a mapped stream stays valid until the matching `unmap_stream` call

use std::os::raw::{c_int, c_void};

use scene_physics::{
    transform::{mat4_from_column_slice, mat4_to_column_array},
    GeometryCounts, IndexStream, MeshRange, NodeId, NodeKind, ResourceId, SceneGraph,
};

type Mat4 = nalgebra::Matrix4<f32>;

pub const NODE_TYPE_MODEL: c_int = 2;
pub const NODE_TYPE_MESH: c_int = 3;

/// Stream selector passed to `map_stream`.
pub const STREAM_POSITIONS: c_int = 0;
pub const STREAM_INDICES: c_int = 1;

/// Scene access provided by the host. Every entry must be a valid function.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct HostCallbacks {
    pub node_type: extern "C" fn(node: c_int) -> c_int,
    pub node_parent: extern "C" fn(node: c_int) -> c_int,
    /// Writes 16 floats to `out`; `false` if the node is unknown.
    pub node_world_transform: extern "C" fn(node: c_int, out: *mut f32) -> bool,
    /// Reads 16 floats from `relative`.
    pub set_node_transform: extern "C" fn(node: c_int, relative: *const f32),
    pub mark_transform_dirty: extern "C" fn(node: c_int),
    pub node_geometry: extern "C" fn(model: c_int) -> c_int,
    /// Writes vertex start, vertex end (inclusive), batch start, batch count.
    pub mesh_range: extern "C" fn(mesh: c_int, out: *mut u32) -> bool,
    pub geometry_counts: extern "C" fn(resource: c_int, vertices: *mut u32, indices: *mut u32) -> bool,
    /// Maps a stream and stores its element count in `len`. Indices are 32-bit when
    /// `wide` is set, 16-bit otherwise. Null if the stream is unavailable.
    pub map_stream: extern "C" fn(
        resource: c_int,
        stream: c_int,
        len: *mut usize,
        wide: *mut bool,
    ) -> *const c_void,
    pub unmap_stream: extern "C" fn(resource: c_int, stream: c_int),
}

/// [`SceneGraph`] over a [`HostCallbacks`] table.
pub struct FfiScene {
    callbacks: HostCallbacks,
}

impl FfiScene {
    pub fn new(callbacks: HostCallbacks) -> Self {
        Self { callbacks }
    }

    /// Map `stream`, hand it to `visit`, unmap. `false` if nothing was mapped.
    fn with_stream(
        &self,
        resource: ResourceId,
        stream: c_int,
        visit: impl FnOnce(*const c_void, usize, bool),
    ) -> bool {
        let mut len = 0usize;
        let mut wide = false;
        let ptr = (self.callbacks.map_stream)(resource, stream, &mut len, &mut wide);
        if ptr.is_null() {
            return false;
        }
        visit(ptr, len, wide);
        (self.callbacks.unmap_stream)(resource, stream);
        true
    }
}

impl SceneGraph for FfiScene {
    fn node_kind(&self, node: NodeId) -> NodeKind {
        match (self.callbacks.node_type)(node) {
            NODE_TYPE_MODEL => NodeKind::Model,
            NODE_TYPE_MESH => NodeKind::Mesh,
            _ => NodeKind::Other,
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        match (self.callbacks.node_parent)(node) {
            0 => None,
            parent => Some(parent),
        }
    }

    fn world_transform(&self, node: NodeId) -> Option<Mat4> {
        let mut out = [0.0f32; 16];
        (self.callbacks.node_world_transform)(node, out.as_mut_ptr())
            .then(|| mat4_from_column_slice(&out))
    }

    fn set_relative_transform(&mut self, node: NodeId, relative: &Mat4) {
        let values = mat4_to_column_array(relative);
        (self.callbacks.set_node_transform)(node, values.as_ptr());
    }

    fn mark_transform_dirty(&mut self, node: NodeId) {
        (self.callbacks.mark_transform_dirty)(node);
    }

    fn node_geometry(&self, model: NodeId) -> Option<ResourceId> {
        match (self.callbacks.node_geometry)(model) {
            0 => None,
            resource => Some(resource),
        }
    }

    fn mesh_range(&self, mesh: NodeId) -> Option<MeshRange> {
        let mut out = [0u32; 4];
        (self.callbacks.mesh_range)(mesh, out.as_mut_ptr()).then(|| MeshRange {
            vertex_start: out[0],
            vertex_end: out[1],
            batch_start: out[2],
            batch_count: out[3],
        })
    }

    fn geometry_counts(&self, resource: ResourceId) -> Option<GeometryCounts> {
        let (mut vertices, mut indices) = (0u32, 0u32);
        (self.callbacks.geometry_counts)(resource, &mut vertices, &mut indices)
            .then_some(GeometryCounts { vertices, indices })
    }

    fn with_vertex_positions(&self, resource: ResourceId, visit: &mut dyn FnMut(&[f32])) -> bool {
        self.with_stream(resource, STREAM_POSITIONS, |ptr, len, _| {
            // SAFETY: the host keeps `len` floats mapped at `ptr` until `unmap_stream`.
            let positions = unsafe { std::slice::from_raw_parts(ptr.cast::<f32>(), len) };
            visit(positions);
        })
    }

    fn with_index_stream(
        &self,
        resource: ResourceId,
        visit: &mut dyn FnMut(IndexStream<'_>),
    ) -> bool {
        self.with_stream(resource, STREAM_INDICES, |ptr, len, wide| {
            // SAFETY: the host keeps `len` indices of the reported width mapped at `ptr`
            // until `unmap_stream`.
            let stream = unsafe {
                if wide {
                    IndexStream::U32(std::slice::from_raw_parts(ptr.cast::<u32>(), len))
                } else {
                    IndexStream::U16(std::slice::from_raw_parts(ptr.cast::<u16>(), len))
                }
            };
            visit(stream);
        })
    }
}
