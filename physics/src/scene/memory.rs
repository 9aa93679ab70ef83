//! In-memory scene graph.
//!
//! A minimal host: nodes with parent-relative transforms, shared geometry resources and
//! optional attachment markup. The sample drives the bridge through it and the tests use it
//! as a deterministic host.

use std::collections::HashMap;

use nalgebra as na;

use super::{GeometryCounts, IndexStream, MeshRange, NodeId, NodeKind, ResourceId, SceneGraph};

/// Geometry resource contents. `None` streams model a resource that failed to load.
#[derive(Clone, Debug, Default)]
pub struct GeometryData {
    /// Flat `xyz` positions.
    pub positions: Option<Vec<f32>>,
    pub indices: Option<IndexData>,
}

#[derive(Clone, Debug)]
pub enum IndexData {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexData {
    fn len(&self) -> usize {
        match self {
            IndexData::U16(v) => v.len(),
            IndexData::U32(v) => v.len(),
        }
    }
}

impl GeometryData {
    /// Geometry with 16-bit indices.
    pub fn with_u16(positions: Vec<f32>, indices: Vec<u16>) -> Self {
        Self {
            positions: Some(positions),
            indices: Some(IndexData::U16(indices)),
        }
    }

    /// Geometry with 32-bit indices.
    pub fn with_u32(positions: Vec<f32>, indices: Vec<u32>) -> Self {
        Self {
            positions: Some(positions),
            indices: Some(IndexData::U32(indices)),
        }
    }
}

#[derive(Clone, Debug)]
struct SceneNode {
    kind: NodeKind,
    parent: Option<NodeId>,
    relative: na::Matrix4<f32>,
    geometry: Option<ResourceId>,
    range: Option<MeshRange>,
    attachment: Option<String>,
    dirty: bool,
    transform_writes: u32,
}

impl SceneNode {
    fn new(kind: NodeKind, parent: Option<NodeId>, relative: na::Matrix4<f32>) -> Self {
        Self {
            kind,
            parent,
            relative,
            geometry: None,
            range: None,
            attachment: None,
            dirty: false,
            transform_writes: 0,
        }
    }
}

pub struct MemoryScene {
    nodes: HashMap<NodeId, SceneNode>,
    geometries: HashMap<ResourceId, GeometryData>,
    next_node: NodeId,
    next_resource: ResourceId,
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryScene {
    /// Id of the root node. Its transform is the identity.
    pub const ROOT: NodeId = 1;

    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            Self::ROOT,
            SceneNode::new(NodeKind::Other, None, na::Matrix4::identity()),
        );
        Self {
            nodes,
            geometries: HashMap::new(),
            next_node: Self::ROOT + 1,
            next_resource: 1,
        }
    }

    fn insert(&mut self, node: SceneNode) -> NodeId {
        let id = self.next_node;
        self.next_node += 1;
        self.nodes.insert(id, node);
        id
    }

    /// Add a plain transform node.
    pub fn add_group(&mut self, parent: NodeId, relative: na::Matrix4<f32>) -> NodeId {
        self.insert(SceneNode::new(NodeKind::Other, Some(parent), relative))
    }

    /// Add a model node rendering the whole of `geometry`.
    pub fn add_model(
        &mut self,
        parent: NodeId,
        relative: na::Matrix4<f32>,
        geometry: ResourceId,
    ) -> NodeId {
        let mut node = SceneNode::new(NodeKind::Model, Some(parent), relative);
        node.geometry = Some(geometry);
        self.insert(node)
    }

    /// Add a mesh node drawing `range` of its parent model's geometry.
    pub fn add_mesh(
        &mut self,
        model: NodeId,
        relative: na::Matrix4<f32>,
        range: MeshRange,
    ) -> NodeId {
        let mut node = SceneNode::new(NodeKind::Mesh, Some(model), relative);
        node.range = Some(range);
        self.insert(node)
    }

    pub fn add_geometry(&mut self, data: GeometryData) -> ResourceId {
        let id = self.next_resource;
        self.next_resource += 1;
        self.geometries.insert(id, data);
        id
    }

    /// Attach physics markup to `node`.
    pub fn set_attachment(&mut self, node: NodeId, markup: impl Into<String>) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.attachment = Some(markup.into());
        }
    }

    pub fn attachment(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node)?.attachment.as_deref()
    }

    /// All `(node, markup)` pairs, ordered by node id.
    pub fn attachments(&self) -> Vec<(NodeId, &str)> {
        let mut found: Vec<(NodeId, &str)> = self
            .nodes
            .iter()
            .filter_map(|(id, n)| n.attachment.as_deref().map(|a| (*id, a)))
            .collect();
        found.sort_by_key(|(id, _)| *id);
        found
    }

    pub fn relative_transform(&self, node: NodeId) -> Option<na::Matrix4<f32>> {
        self.nodes.get(&node).map(|n| n.relative)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Whether the node was marked dirty since the last call; clears the flag.
    pub fn take_dirty(&mut self, node: NodeId) -> bool {
        self.nodes
            .get_mut(&node)
            .map(|n| std::mem::take(&mut n.dirty))
            .unwrap_or(false)
    }

    /// Number of transform writes the node received through [`SceneGraph`].
    pub fn transform_writes(&self, node: NodeId) -> u32 {
        self.nodes.get(&node).map_or(0, |n| n.transform_writes)
    }

    /// Remove `node` and its whole subtree. Returns the removed ids, `node` first.
    pub fn remove_node(&mut self, node: NodeId) -> Vec<NodeId> {
        if node == Self::ROOT || !self.nodes.contains_key(&node) {
            return Vec::new();
        }
        let mut removed = vec![node];
        let mut i = 0;
        while i < removed.len() {
            let current = removed[i];
            let mut children: Vec<NodeId> = self
                .nodes
                .iter()
                .filter(|(_, n)| n.parent == Some(current))
                .map(|(id, _)| *id)
                .collect();
            children.sort_unstable();
            removed.extend(children);
            i += 1;
        }
        for id in &removed {
            self.nodes.remove(id);
        }
        removed
    }

    /// Replace the streams of an existing resource.
    pub fn geometry_mut(&mut self, resource: ResourceId) -> Option<&mut GeometryData> {
        self.geometries.get_mut(&resource)
    }
}

impl SceneGraph for MemoryScene {
    fn node_kind(&self, node: NodeId) -> NodeKind {
        self.nodes.get(&node).map_or(NodeKind::Other, |n| n.kind)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node)?.parent
    }

    fn world_transform(&self, node: NodeId) -> Option<na::Matrix4<f32>> {
        let mut current = self.nodes.get(&node)?;
        let mut world = current.relative;
        while let Some(parent) = current.parent {
            current = self.nodes.get(&parent)?;
            world = current.relative * world;
        }
        Some(world)
    }

    fn set_relative_transform(&mut self, node: NodeId, relative: &na::Matrix4<f32>) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.relative = *relative;
            n.transform_writes += 1;
        }
    }

    fn mark_transform_dirty(&mut self, node: NodeId) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.dirty = true;
        }
    }

    fn node_geometry(&self, model: NodeId) -> Option<ResourceId> {
        self.nodes.get(&model)?.geometry
    }

    fn mesh_range(&self, mesh: NodeId) -> Option<MeshRange> {
        self.nodes.get(&mesh)?.range
    }

    fn geometry_counts(&self, resource: ResourceId) -> Option<GeometryCounts> {
        let g = self.geometries.get(&resource)?;
        Some(GeometryCounts {
            vertices: g.positions.as_ref().map_or(0, |p| (p.len() / 3) as u32),
            indices: g.indices.as_ref().map_or(0, |i| i.len() as u32),
        })
    }

    fn with_vertex_positions(&self, resource: ResourceId, visit: &mut dyn FnMut(&[f32])) -> bool {
        match self.geometries.get(&resource).and_then(|g| g.positions.as_deref()) {
            Some(positions) => {
                visit(positions);
                true
            }
            None => false,
        }
    }

    fn with_index_stream(
        &self,
        resource: ResourceId,
        visit: &mut dyn FnMut(IndexStream<'_>),
    ) -> bool {
        match self.geometries.get(&resource).and_then(|g| g.indices.as_ref()) {
            Some(IndexData::U16(v)) => {
                visit(IndexStream::U16(v));
                true
            }
            Some(IndexData::U32(v)) => {
                visit(IndexStream::U32(v));
                true
            }
            None => false,
        }
    }
}
