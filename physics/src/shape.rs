//! Collision shape construction.
//!
//! A [`ShapeDescriptor`] says *what* collides (box, sphere or the node's own mesh) and how
//! heavy it is. [`build`] turns it into a native shape for the node it is attached to:
//!
//! - the node's world matrix is split into pose and scale
//! - the scale is baked into the shape once (the pose carries none)
//! - dynamic meshes get a convex hull, static meshes the exact triangle mesh
//! - dynamic shapes get their principal inertia for the requested mass

use rapier3d::prelude::{RigidBodyType, SharedShape};

use crate::{
    constants::MIN_SCALE,
    error::ShapeError,
    geometry::extract_triangles,
    scene::{NodeId, SceneGraph},
    transform::{Decomposed, Iso, Vec3},
};

/// Supported collision shapes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShapeKind {
    /// Oriented box with given half-extents.
    Box { half_extents: Vec3 },

    /// Sphere around the node origin.
    Sphere { radius: f32 },

    /// The triangles rendered by the node itself.
    Mesh,
}

/// Declarative description of a node's physics body, usually parsed from an attachment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeDescriptor {
    pub kind: ShapeKind,
    /// Zero means static.
    pub mass: f32,
    /// Lets a massless body be moved by the host and still collide.
    pub kinematic: bool,
}

impl Default for ShapeDescriptor {
    fn default() -> Self {
        Self {
            kind: ShapeKind::Mesh,
            mass: 0.0,
            kinematic: false,
        }
    }
}

impl ShapeDescriptor {
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.mass != 0.0
    }

    /// Nodes with a motion state are reset and synchronized every step.
    #[inline]
    pub fn has_motion_state(&self) -> bool {
        self.is_dynamic() || self.kinematic
    }

    /// Solver body type for this descriptor.
    ///
    /// Mass wins over the kinematic flag: a heavy kinematic body is simply dynamic.
    pub fn body_type(&self) -> RigidBodyType {
        if self.is_dynamic() {
            RigidBodyType::Dynamic
        } else if self.kinematic {
            RigidBodyType::KinematicPositionBased
        } else {
            RigidBodyType::Fixed
        }
    }
}

/// Which native primitive backs a [`CollisionShape`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeForm {
    Cuboid,
    Ball,
    /// Convex approximation of a mesh, usable by dynamic bodies.
    ConvexHull,
    /// Exact triangle mesh with its own BVH. Static and kinematic bodies only.
    TriangleMesh,
}

/// A native shape with the node's scale already applied.
#[derive(Clone)]
pub struct CollisionShape {
    pub shape: SharedShape,
    pub form: ShapeForm,
    /// Scale baked into `shape`; re-applied to the rotation when writing back to the host.
    pub local_scaling: Vec3,
}

impl std::fmt::Debug for CollisionShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionShape")
            .field("form", &self.form)
            .field("local_scaling", &self.local_scaling)
            .finish()
    }
}

/// Everything a node needs from shape construction.
#[derive(Clone, Debug)]
pub struct BuiltShape {
    pub shape: CollisionShape,
    /// Principal inertia for the descriptor's mass; zero for massless bodies.
    pub local_inertia: Vec3,
    /// Unscaled world pose of the host node at build time.
    pub start_pose: Iso,
}

/// Build the collision shape described by `desc` for host node `node`.
pub fn build(
    desc: &ShapeDescriptor,
    scene: &dyn SceneGraph,
    node: NodeId,
) -> Result<BuiltShape, ShapeError> {
    if !desc.mass.is_finite() || desc.mass < 0.0 {
        return Err(ShapeError::InvalidMass { mass: desc.mass });
    }

    let world = scene
        .world_transform(node)
        .ok_or(ShapeError::MissingTransform { node })?;
    let parts = Decomposed::from_matrix(&world, MIN_SCALE).ok_or_else(|| {
        let basis = world.fixed_view::<3, 3>(0, 0);
        ShapeError::DegenerateScale {
            node,
            scale: [
                basis.column(0).norm(),
                basis.column(1).norm(),
                basis.column(2).norm(),
            ],
        }
    })?;
    let scale = parts.scale;

    let (shape, form) = match desc.kind {
        ShapeKind::Box { half_extents } => {
            // Mirroring lives in the write-back scale; extents stay positive.
            let he = half_extents.component_mul(&scale.abs());
            (SharedShape::cuboid(he.x, he.y, he.z), ShapeForm::Cuboid)
        }
        // A ball can only take one scale factor; the X axis drives it.
        ShapeKind::Sphere { radius } => {
            (SharedShape::ball(radius * scale.x.abs()), ShapeForm::Ball)
        }
        ShapeKind::Mesh => mesh_shape(desc, scene, node, &scale)?,
    };

    let local_inertia = if desc.is_dynamic() {
        let unit = shape.mass_properties(1.0);
        if unit.mass() > 0.0 {
            unit.principal_inertia() * (desc.mass / unit.mass())
        } else {
            Vec3::zeros()
        }
    } else {
        Vec3::zeros()
    };

    Ok(BuiltShape {
        shape: CollisionShape {
            shape,
            form,
            local_scaling: scale,
        },
        local_inertia,
        start_pose: parts.pose(),
    })
}

fn mesh_shape(
    desc: &ShapeDescriptor,
    scene: &dyn SceneGraph,
    node: NodeId,
    scale: &Vec3,
) -> Result<(SharedShape, ShapeForm), ShapeError> {
    let triangles = extract_triangles(scene, node)?;
    let (mut points, indices) = triangles.to_indexed();
    for p in points.iter_mut() {
        p.coords.component_mul_assign(scale);
    }

    if desc.mass > 0.0 {
        SharedShape::convex_hull(&points)
            .map(|s| (s, ShapeForm::ConvexHull))
            .ok_or(ShapeError::DegenerateHull {
                points: points.len(),
            })
    } else {
        SharedShape::trimesh(points, indices)
            .map(|s| (s, ShapeForm::TriangleMesh))
            .map_err(|e| ShapeError::TriangleMesh {
                reason: format!("{e:?}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeometryError;
    use crate::scene::{GeometryData, MemoryScene};
    use crate::transform::{Mat4, Quat};
    use nalgebra as na;

    fn node_at(scene: &mut MemoryScene, m: Mat4) -> NodeId {
        scene.add_group(MemoryScene::ROOT, m)
    }

    /// Unit cube corners and its 12 triangles.
    fn cube_geometry() -> GeometryData {
        let mut positions = Vec::new();
        for i in 0..8u32 {
            positions.extend_from_slice(&[
                (i & 1) as f32,
                ((i >> 1) & 1) as f32,
                ((i >> 2) & 1) as f32,
            ]);
        }
        let indices: Vec<u16> = vec![
            0, 2, 1, 1, 2, 3, 4, 5, 6, 5, 7, 6, 0, 1, 4, 1, 5, 4, 2, 6, 3, 3, 6, 7, 0, 4, 2, 2,
            4, 6, 1, 3, 5, 3, 7, 5,
        ];
        GeometryData::with_u16(positions, indices)
    }

    #[test]
    fn box_uses_half_extents_and_gets_inertia() {
        let mut scene = MemoryScene::new();
        let node = node_at(&mut scene, Mat4::identity());
        let desc = ShapeDescriptor {
            kind: ShapeKind::Box {
                half_extents: Vec3::new(1.0, 2.0, 3.0),
            },
            mass: 5.0,
            kinematic: false,
        };

        let built = build(&desc, &scene, node).unwrap();
        assert_eq!(built.shape.form, ShapeForm::Cuboid);
        let cuboid = built.shape.shape.as_cuboid().unwrap();
        assert!((cuboid.half_extents - Vec3::new(1.0, 2.0, 3.0)).norm() < 1.0e-6);
        assert!(built.local_inertia.iter().all(|i| *i > 0.0));

        // Solid box: I_x = m/3 * (hy² + hz²).
        assert!((built.local_inertia.x - 5.0 / 3.0 * (4.0 + 9.0)).abs() < 1.0e-3);
    }

    #[test]
    fn static_sphere_has_no_inertia() {
        let mut scene = MemoryScene::new();
        let node = node_at(&mut scene, Mat4::identity());
        let desc = ShapeDescriptor {
            kind: ShapeKind::Sphere { radius: 2.0 },
            mass: 0.0,
            kinematic: false,
        };

        let built = build(&desc, &scene, node).unwrap();
        assert_eq!(built.shape.form, ShapeForm::Ball);
        assert!((built.shape.shape.as_ball().unwrap().radius - 2.0).abs() < 1.0e-6);
        assert_eq!(built.local_inertia, Vec3::zeros());
        assert_eq!(desc.body_type(), RigidBodyType::Fixed);
    }

    #[test]
    fn scale_is_baked_into_shape_not_pose() {
        let mut scene = MemoryScene::new();
        let rotation = Quat::from_axis_angle(&Vec3::y_axis(), 0.4);
        let world = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0))
            * rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&Vec3::new(2.0, 3.0, 4.0));
        let node = node_at(&mut scene, world);
        let desc = ShapeDescriptor {
            kind: ShapeKind::Box {
                half_extents: Vec3::new(1.0, 1.0, 1.0),
            },
            ..ShapeDescriptor::default()
        };

        let built = build(&desc, &scene, node).unwrap();
        let cuboid = built.shape.shape.as_cuboid().unwrap();
        assert!((cuboid.half_extents - Vec3::new(2.0, 3.0, 4.0)).norm() < 1.0e-5);
        assert!((built.shape.local_scaling - Vec3::new(2.0, 3.0, 4.0)).norm() < 1.0e-5);
        assert!((built.start_pose.translation.vector - Vec3::new(1.0, 2.0, 3.0)).norm() < 1.0e-5);
        assert!(built.start_pose.rotation.angle_to(&rotation) < 1.0e-4);
    }

    #[test]
    fn mirrored_node_keeps_positive_extents() {
        let mut scene = MemoryScene::new();
        let world = Mat4::new_translation(&Vec3::new(1.0, 5.0, 0.0))
            * Mat4::new_nonuniform_scaling(&Vec3::new(-2.0, 1.0, 1.0));
        let node = node_at(&mut scene, world);
        let desc = ShapeDescriptor {
            kind: ShapeKind::Box {
                half_extents: Vec3::new(0.5, 0.5, 0.5),
            },
            mass: 1.0,
            kinematic: false,
        };

        let built = build(&desc, &scene, node).unwrap();
        let cuboid = built.shape.shape.as_cuboid().unwrap();
        assert!((cuboid.half_extents - Vec3::new(1.0, 0.5, 0.5)).norm() < 1.0e-5);
        assert!((built.shape.local_scaling - Vec3::new(-2.0, 1.0, 1.0)).norm() < 1.0e-5);
        assert!(built.start_pose.rotation.angle() < 1.0e-5);
        assert!(built.local_inertia.iter().all(|i| *i > 0.0));
    }

    #[test]
    fn static_mesh_is_exact_triangle_mesh() {
        let mut scene = MemoryScene::new();
        let res = scene.add_geometry(cube_geometry());
        let model = scene.add_model(MemoryScene::ROOT, Mat4::identity(), res);

        let built = build(&ShapeDescriptor::default(), &scene, model).unwrap();
        assert_eq!(built.shape.form, ShapeForm::TriangleMesh);
        assert_eq!(built.shape.shape.as_trimesh().unwrap().indices().len(), 12);
        assert_eq!(built.local_inertia, Vec3::zeros());
    }

    #[test]
    fn dynamic_mesh_is_convex_hull() {
        let mut scene = MemoryScene::new();
        let res = scene.add_geometry(cube_geometry());
        let model = scene.add_model(MemoryScene::ROOT, Mat4::identity(), res);
        let desc = ShapeDescriptor {
            mass: 2.0,
            ..ShapeDescriptor::default()
        };

        let built = build(&desc, &scene, model).unwrap();
        assert_eq!(built.shape.form, ShapeForm::ConvexHull);
        assert!(built.local_inertia.iter().all(|i| *i > 0.0));
    }

    #[test]
    fn mesh_without_geometry_fails() {
        let mut scene = MemoryScene::new();
        let res = scene.add_geometry(GeometryData::default());
        let model = scene.add_model(MemoryScene::ROOT, Mat4::identity(), res);

        let err = build(&ShapeDescriptor::default(), &scene, model).unwrap_err();
        assert!(matches!(
            err,
            ShapeError::Geometry(GeometryError::MissingPositions { .. })
        ));
    }

    #[test]
    fn zero_scale_is_rejected() {
        let mut scene = MemoryScene::new();
        let node = node_at(
            &mut scene,
            Mat4::new_nonuniform_scaling(&na::Vector3::new(1.0, 0.0, 1.0)),
        );
        let desc = ShapeDescriptor {
            kind: ShapeKind::Sphere { radius: 1.0 },
            ..ShapeDescriptor::default()
        };
        assert!(matches!(
            build(&desc, &scene, node),
            Err(ShapeError::DegenerateScale { .. })
        ));
    }

    #[test]
    fn negative_mass_is_rejected() {
        let mut scene = MemoryScene::new();
        let node = node_at(&mut scene, Mat4::identity());
        let desc = ShapeDescriptor {
            kind: ShapeKind::Sphere { radius: 1.0 },
            mass: -1.0,
            kinematic: false,
        };
        assert!(matches!(
            build(&desc, &scene, node),
            Err(ShapeError::InvalidMass { .. })
        ));
    }

    #[test]
    fn body_type_follows_mass_then_kinematic() {
        let mut desc = ShapeDescriptor::default();
        assert_eq!(desc.body_type(), RigidBodyType::Fixed);
        assert!(!desc.has_motion_state());

        desc.kinematic = true;
        assert_eq!(desc.body_type(), RigidBodyType::KinematicPositionBased);
        assert!(desc.has_motion_state());

        desc.mass = 1.0;
        assert_eq!(desc.body_type(), RigidBodyType::Dynamic);
    }
}
