pub mod attachment;
pub mod clock;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod node;
pub mod owner;
pub mod scene;
pub mod settings;
pub mod shape;
pub mod transform;
pub mod world;

// Re-export Rapier and nalgebra so hosts can name handles and matrices without
// depending on them directly.
pub use nalgebra;
pub use rapier3d;

pub use attachment::{parse_attachment, parse_leading_float};
pub use constants::{
    ATTACHMENT_TAG, ATTACHMENT_TYPE, DEFAULT_GRAVITY, DEFAULT_TIME_SCALE, MIN_SCALE, SHAPE_TAG,
    WORLD_HALF_EXTENT,
};
pub use error::{AttachmentError, GeometryError, PhysicsError, SettingsError, ShapeError};
pub use geometry::{TriangleBuffer, extract_triangles};
pub use node::{MotionState, NodeHandle, NodeState, PhysicsNode};
pub use owner::{BodyOwner, BodyOwnerKind, pack_body_owner, unpack_body_owner};
pub use scene::{
    GeometryCounts, GeometryData, IndexStream, MemoryScene, MeshRange, NodeId, NodeKind,
    ResourceId, SceneGraph,
};
pub use settings::PhysicsSettings;
pub use shape::{BuiltShape, CollisionShape, ShapeDescriptor, ShapeForm, ShapeKind};
pub use world::PhysicsWorld;
