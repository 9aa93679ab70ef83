//! Per-node physics representation.
//!
//! A [`PhysicsNode`] binds one rigid body (and its collider) to one host scene node. The
//! body and collider live in the world's handle sets; the node keeps their handles, the
//! collision shape, and, for bodies that move, a [`MotionState`].
//!
//! Lifecycle: `Constructing → Active → Removed`. A removed node is never reactivated.

use rapier3d::prelude::{ColliderHandle, RigidBodyHandle, RigidBodySet};

use crate::{
    scene::{NodeId, SceneGraph},
    shape::CollisionShape,
    transform::{Iso, Vec3, parent_relative, scaled_matrix},
};

/// Identifies a [`PhysicsNode`] inside a [`PhysicsWorld`](crate::PhysicsWorld).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeHandle(pub RigidBodyHandle);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeState {
    /// Built but not yet part of the simulation.
    Constructing,
    /// Simulated; in the dynamic registry if it has a motion state.
    Active,
    /// Taken out of the simulation, waiting to be destroyed.
    Removed,
}

/// Pose of a moving body as last reported by the simulation, plus the pose it started at.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MotionState {
    pub start: Iso,
    pub world: Iso,
}

impl MotionState {
    pub fn new(start: Iso) -> Self {
        Self {
            start,
            world: start,
        }
    }
}

#[derive(Debug)]
pub struct PhysicsNode {
    pub(crate) host: NodeId,
    pub(crate) body: RigidBodyHandle,
    pub(crate) collider: ColliderHandle,
    pub(crate) shape: CollisionShape,
    pub(crate) motion_state: Option<MotionState>,
    pub(crate) start_pose: Iso,
    pub(crate) local_inertia: Vec3,
    pub(crate) state: NodeState,
}

impl PhysicsNode {
    #[inline]
    pub fn handle(&self) -> NodeHandle {
        NodeHandle(self.body)
    }

    /// Host scene node this body drives.
    #[inline]
    pub fn host(&self) -> NodeId {
        self.host
    }

    #[inline]
    pub fn body(&self) -> RigidBodyHandle {
        self.body
    }

    #[inline]
    pub fn collider(&self) -> ColliderHandle {
        self.collider
    }

    #[inline]
    pub fn shape(&self) -> &CollisionShape {
        &self.shape
    }

    #[inline]
    pub fn motion_state(&self) -> Option<&MotionState> {
        self.motion_state.as_ref()
    }

    /// Static nodes have no motion state: they collide but are never synchronized.
    #[inline]
    pub fn is_static(&self) -> bool {
        self.motion_state.is_none()
    }

    /// World pose captured when the node was built.
    #[inline]
    pub fn start_pose(&self) -> &Iso {
        &self.start_pose
    }

    #[inline]
    pub fn local_inertia(&self) -> &Vec3 {
        &self.local_inertia
    }

    #[inline]
    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Put the body back where it started and stop it.
    ///
    /// No-op for static nodes.
    pub fn reset(&mut self, bodies: &mut RigidBodySet) {
        let Some(motion) = self.motion_state.as_mut() else {
            return;
        };
        let Some(body) = bodies.get_mut(self.body) else {
            return;
        };

        motion.world = motion.start;
        body.set_translation(motion.start.translation.vector, false);
        body.set_rotation(motion.start.rotation, false);

        if !body.is_fixed() {
            body.set_linvel(Vec3::zeros(), false);
            body.set_angvel(Vec3::zeros(), false);
            body.wake_up(true);
        }
    }

    /// Push the body's simulated pose into the host node.
    ///
    /// The solver works in absolute world space while the host stores transforms relative
    /// to the parent node, so the parent's world matrix is divided out every time.
    /// Returns `false` when nothing was written: static node, or parent transform
    /// unavailable this step.
    pub fn update(&mut self, bodies: &RigidBodySet, scene: &mut dyn SceneGraph) -> bool {
        let Some(motion) = self.motion_state.as_mut() else {
            return false;
        };
        let Some(body) = bodies.get(self.body) else {
            return false;
        };
        motion.world = Iso::from_parts((*body.translation()).into(), *body.rotation());

        let world = scaled_matrix(&motion.world, &self.shape.local_scaling);
        let relative = scene
            .parent(self.host)
            .and_then(|parent| scene.world_transform(parent))
            .and_then(|parent_world| parent_relative(&parent_world, &world));

        match relative {
            Some(relative) => {
                scene.set_relative_transform(self.host, &relative);
                scene.mark_transform_dirty(self.host);
                true
            }
            None => {
                log::trace!("No parent transform for node {}, skipping sync", self.host);
                false
            }
        }
    }
}
