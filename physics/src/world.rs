//! The simulation world.
//!
//! [`PhysicsWorld`] owns every rapier set, the step clock and all [`PhysicsNode`]s. It has
//! no global state: a host that needs a single process-wide instance wraps one itself.
//!
//! Node registration
//! - nodes are built disabled, so they neither collide nor simulate until added
//! - [`PhysicsWorld::add_node`] enables the body and, for nodes with a motion state,
//!   appends it to the dynamic registry that [`PhysicsWorld::step`] synchronizes
//! - [`PhysicsWorld::remove_node`] disables the body again; a removed node stays removed
//! - [`PhysicsWorld::destroy_node`] removes first, then frees body, collider and node
//!
//! Time
//! - [`PhysicsWorld::step`] advances by exactly the `dt` it is given
//! - [`PhysicsWorld::render`] feeds wall-clock time into an accumulator and runs whole
//!   fixed steps, at most `max_substeps` per call; whatever a long frame leaves over is dropped

use std::{collections::HashMap, time::Duration};

use rapier3d::prelude::*;

use crate::{
    attachment::parse_attachment,
    clock::StepClock,
    error::{PhysicsError, ShapeError},
    node::{MotionState, NodeHandle, NodeState, PhysicsNode},
    owner::{pack_body_owner, unpack_body_owner},
    scene::{NodeId, SceneGraph},
    settings::PhysicsSettings,
    shape::{self, ShapeDescriptor},
};

pub struct PhysicsWorld {
    settings: PhysicsSettings,
    gravity: Vector<f32>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    clock: StepClock,
    /// Scaled wall-clock time not yet consumed by a fixed step.
    accumulated: f32,

    nodes: HashMap<NodeHandle, PhysicsNode>,
    /// Every active node, in registration order.
    simulated: Vec<NodeHandle>,
    /// Active nodes with a motion state, in registration order.
    dynamic: Vec<NodeHandle>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(PhysicsSettings::default())
    }
}

impl PhysicsWorld {
    pub fn new(settings: PhysicsSettings) -> Self {
        log::info!(
            "Physics world created (gravity {:?}, half extent {})",
            settings.gravity,
            settings.world_half_extent
        );

        Self {
            gravity: settings.gravity_vector(),
            settings,
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            clock: StepClock::new(),
            accumulated: 0.0,
            nodes: HashMap::new(),
            simulated: Vec::new(),
            dynamic: Vec::new(),
        }
    }

    /// Build a body for `host` without adding it to the simulation.
    ///
    /// The node starts in [`NodeState::Constructing`]; nothing is inserted on failure.
    pub fn build_node(
        &mut self,
        desc: &ShapeDescriptor,
        scene: &dyn SceneGraph,
        host: NodeId,
    ) -> Result<NodeHandle, ShapeError> {
        let built = shape::build(desc, scene, host)?;

        let mut body = RigidBodyBuilder::new(desc.body_type())
            .pose(built.start_pose)
            .enabled(false)
            .user_data(pack_body_owner(host));
        if desc.kinematic && !desc.is_dynamic() {
            body = body.can_sleep(false);
        }
        let body = self.bodies.insert(body.build());

        let mut collider = ColliderBuilder::new(built.shape.shape.clone());
        if desc.is_dynamic() {
            collider = collider.mass(desc.mass);
        }
        let collider =
            self.colliders
                .insert_with_parent(collider.build(), body, &mut self.bodies);

        let node = PhysicsNode {
            host,
            body,
            collider,
            shape: built.shape,
            motion_state: desc
                .has_motion_state()
                .then(|| MotionState::new(built.start_pose)),
            start_pose: built.start_pose,
            local_inertia: built.local_inertia,
            state: NodeState::Constructing,
        };
        let handle = node.handle();
        self.nodes.insert(handle, node);
        Ok(handle)
    }

    /// Put a built node into the simulation. Returns `false` if nothing changed.
    pub fn add_node(&mut self, handle: NodeHandle) -> bool {
        let Some(node) = self.nodes.get_mut(&handle) else {
            return false;
        };
        match node.state {
            NodeState::Active => return false,
            NodeState::Removed => {
                log::warn!("Node for host {} was removed and cannot be re-added", node.host);
                return false;
            }
            NodeState::Constructing => {}
        }

        if let Some(body) = self.bodies.get_mut(node.body) {
            body.set_enabled(true);
        }
        node.state = NodeState::Active;
        self.simulated.push(handle);
        if node.motion_state.is_some() {
            self.dynamic.push(handle);
        }
        true
    }

    /// Take a node out of the simulation without freeing it.
    pub fn remove_node(&mut self, handle: NodeHandle) -> bool {
        let Some(node) = self.nodes.get_mut(&handle) else {
            return false;
        };
        if node.state != NodeState::Active {
            return false;
        }

        if let Some(body) = self.bodies.get_mut(node.body) {
            body.set_enabled(false);
        }
        node.state = NodeState::Removed;
        self.simulated.retain(|h| *h != handle);
        self.dynamic.retain(|h| *h != handle);
        true
    }

    /// Remove the node, then free its body, collider, motion state and shape.
    pub fn destroy_node(&mut self, handle: NodeHandle) -> bool {
        self.remove_node(handle);
        let Some(node) = self.nodes.remove(&handle) else {
            return false;
        };

        self.bodies.remove(
            node.body,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        log::debug!("Destroyed physics node for host {}", node.host);
        true
    }

    /// Step by the wall time elapsed since the previous call. See [`render_elapsed`](Self::render_elapsed).
    pub fn render(&mut self, scene: &mut dyn SceneGraph) -> usize {
        let elapsed = self.clock.restart();
        self.render_elapsed(elapsed, scene)
    }

    /// Add `elapsed` (times the time scale) to the accumulator, run the whole fixed steps it
    /// holds up to `max_substeps`, then synchronize once. Returns the number of host nodes
    /// written.
    pub fn render_elapsed(&mut self, elapsed: Duration, scene: &mut dyn SceneGraph) -> usize {
        let fixed = self.settings.fixed_timestep;
        self.accumulated += elapsed.as_secs_f32() * self.settings.time_scale;

        let whole = (self.accumulated / fixed).floor().max(0.0);
        self.accumulated -= whole * fixed;
        let due = whole as u32;
        let substeps = due.min(self.settings.max_substeps);
        if due > substeps {
            log::debug!("Dropping {} of {due} fixed steps after a long frame", due - substeps);
        }

        for _ in 0..substeps {
            self.advance(fixed);
        }
        let written = self.sync(scene);
        log::trace!("Ran {substeps} fixed steps, synchronized {written} nodes");
        written
    }

    /// Advance the simulation by `dt` seconds and push every dynamic node's pose to the host.
    ///
    /// A non-positive `dt` skips the solver but still synchronizes. Returns the number of
    /// host nodes written.
    pub fn step(&mut self, dt: f32, scene: &mut dyn SceneGraph) -> usize {
        if dt > 0.0 {
            self.advance(dt);
        }
        let written = self.sync(scene);
        log::trace!("Stepped {dt}s, synchronized {written} nodes");
        written
    }

    fn advance(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &(),
        );
    }

    /// Write every dynamic node's pose to the host, in registration order.
    fn sync(&mut self, scene: &mut dyn SceneGraph) -> usize {
        let mut written = 0;
        for handle in &self.dynamic {
            if let Some(node) = self.nodes.get_mut(handle)
                && node.update(&self.bodies, scene)
            {
                written += 1;
            }
        }
        written
    }

    /// Restart the clock and put every simulated body back at its start pose.
    pub fn reset(&mut self) {
        self.clock.reset();
        self.accumulated = 0.0;
        for handle in &self.simulated {
            if let Some(node) = self.nodes.get_mut(handle) {
                node.reset(&mut self.bodies);
            }
        }
        log::info!("Physics world reset ({} nodes)", self.simulated.len());
    }

    /// Parse `markup`, build the node and add it to the simulation.
    pub fn try_create_physics_node(
        &mut self,
        scene: &dyn SceneGraph,
        host: NodeId,
        markup: &str,
    ) -> Result<NodeHandle, PhysicsError> {
        let desc = parse_attachment(markup)?;
        let handle = self.build_node(&desc, scene, host)?;
        self.add_node(handle);

        if let Some(node) = self.nodes.get(&handle) {
            let origin = node.start_pose.translation.vector;
            if !self.settings.contains(&origin) {
                log::warn!(
                    "Host {host} starts at {origin:?}, outside the world half extent {}",
                    self.settings.world_half_extent
                );
            }
        }
        log::debug!("Created {:?} physics node for host {host}", desc.kind);
        Ok(handle)
    }

    /// Like [`try_create_physics_node`](Self::try_create_physics_node), but never fails.
    ///
    /// Attachments meant for someone else are skipped quietly (debug builds log why).
    /// Attachments that parse but cannot be built are logged as warnings.
    pub fn create_physics_node(
        &mut self,
        scene: &dyn SceneGraph,
        host: NodeId,
        markup: &str,
    ) -> Option<NodeHandle> {
        match self.try_create_physics_node(scene, host, markup) {
            Ok(handle) => Some(handle),
            Err(PhysicsError::Attachment(e)) => {
                if cfg!(debug_assertions) {
                    log::debug!("Ignoring attachment of host {host}: {e}");
                }
                None
            }
            Err(PhysicsError::Shape(e)) => {
                log::warn!("Could not create physics node for host {host}: {e}");
                None
            }
        }
    }

    /// Destroy the first simulated node bound to `host`.
    pub fn remove_physics_node(&mut self, host: NodeId) -> bool {
        let found = self.simulated.iter().copied().find(|handle| {
            self.bodies
                .get(handle.0)
                .and_then(|body| unpack_body_owner(body.user_data))
                == Some(host)
        });
        match found {
            Some(handle) => self.destroy_node(handle),
            None => false,
        }
    }

    /// Create nodes for a batch of `(host, attachment)` pairs. Returns how many were created.
    pub fn create_physics_nodes<'a, I>(&mut self, scene: &dyn SceneGraph, nodes: I) -> usize
    where
        I: IntoIterator<Item = (NodeId, &'a str)>,
    {
        let created = nodes
            .into_iter()
            .filter_map(|(host, markup)| self.create_physics_node(scene, host, markup))
            .count();
        log::info!("Created {created} physics nodes");
        created
    }

    #[inline]
    pub fn node(&self, handle: NodeHandle) -> Option<&PhysicsNode> {
        self.nodes.get(&handle)
    }

    /// First simulated node bound to `host`.
    pub fn node_for_host(&self, host: NodeId) -> Option<&PhysicsNode> {
        self.simulated
            .iter()
            .filter_map(|h| self.nodes.get(h))
            .find(|node| node.host == host)
    }

    /// Nodes synchronized every step, in registration order.
    #[inline]
    pub fn dynamic_nodes(&self) -> &[NodeHandle] {
        &self.dynamic
    }

    #[inline]
    pub fn simulated_nodes(&self) -> &[NodeHandle] {
        &self.simulated
    }

    /// All nodes owned by the world, whatever their state.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn body(&self, handle: NodeHandle) -> Option<&RigidBody> {
        self.bodies.get(handle.0)
    }

    #[inline]
    pub fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }
}

impl Drop for PhysicsWorld {
    fn drop(&mut self) {
        log::info!("Physics world released ({} nodes)", self.nodes.len());
    }
}
