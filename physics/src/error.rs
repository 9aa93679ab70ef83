//! Error types for every stage of node construction.
//!
//! None of these ever escape to the host as a panic: the world logs them and skips the
//! affected node or update.

use thiserror::Error;

use crate::scene::{NodeId, NodeKind, ResourceId};

/// Why an attachment did not yield a [`ShapeDescriptor`](crate::ShapeDescriptor).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttachmentError {
    #[error("attachment markup is not well-formed: {reason}")]
    Markup { reason: String },

    #[error("no <{tag}> element found")]
    MissingAttachment { tag: &'static str },

    #[error("attachment type {found:?} is not handled here")]
    ForeignType { found: String },

    #[error("attachment has no <{tag}> child")]
    MissingShape { tag: &'static str },

    #[error("mass must be a finite, non-negative number, got {mass}")]
    InvalidMass { mass: f32 },
}

/// Why triangles could not be read out of a host geometry resource.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("node {node} of kind {kind:?} carries no triangle geometry")]
    UnsupportedNode { node: NodeId, kind: NodeKind },

    #[error("node {node} has no geometry resource")]
    MissingResource { node: NodeId },

    #[error("mesh node {node} has no vertex/batch range")]
    MissingRange { node: NodeId },

    #[error("geometry resource {resource} reports no vertex/index counts")]
    MissingCounts { resource: ResourceId },

    #[error("geometry resource {resource} has no vertex position stream")]
    MissingPositions { resource: ResourceId },

    #[error("geometry resource {resource} has no index stream")]
    MissingIndices { resource: ResourceId },

    #[error("range {start}..{end} exceeds a stream of length {len}")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },

    #[error("index {index} lies outside vertex range {start}..{end}")]
    IndexOutOfRange { index: u32, start: u32, end: u32 },

    #[error("{count} indices are not enough for a triangle")]
    NoTriangles { count: usize },
}

/// Why no collision shape could be built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    #[error("node {node} has no world transform")]
    MissingTransform { node: NodeId },

    #[error("mass must be a finite, non-negative number, got {mass}")]
    InvalidMass { mass: f32 },

    #[error("node {node} has a degenerate scale {scale:?}")]
    DegenerateScale { node: NodeId, scale: [f32; 3] },

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("convex hull of {points} points is degenerate")]
    DegenerateHull { points: usize },

    #[error("triangle mesh rejected: {reason}")]
    TriangleMesh { reason: String },
}

/// Why settings could not be loaded.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings are not valid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("world half extent must be positive, got {0}")]
    WorldExtent(f32),

    #[error("fixed timestep must be positive, got {0}")]
    FixedTimestep(f32),
}

/// Any failure while turning an attachment into a registered node.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    #[error(transparent)]
    Attachment(#[from] AttachmentError),

    #[error(transparent)]
    Shape(#[from] ShapeError),
}
