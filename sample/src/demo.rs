//! The demo scene: a floor, a ramp, a stack of crates and a ball.
//!
//! Every physical node carries its attachment markup, exactly as a loaded scene file would.

use nalgebra as na;
use scene_physics::{GeometryData, MemoryScene, NodeId};

type Mat4 = na::Matrix4<f32>;

fn translation(x: f32, y: f32, z: f32) -> Mat4 {
    Mat4::new_translation(&na::Vector3::new(x, y, z))
}

fn box_attachment(half: [f32; 3], mass: f32) -> String {
    format!(
        r#"<Attachment type="GameEngine"><BulletPhysics shape="box" x="{}" y="{}" z="{}" mass="{mass}"/></Attachment>"#,
        half[0], half[1], half[2]
    )
}

/// Wedge rising along +X: 6 vertices, 8 triangles.
fn ramp_geometry() -> GeometryData {
    #[rustfmt::skip]
    let positions = vec![
        0.0, 0.0, -2.0,   4.0, 0.0, -2.0,   4.0, 2.0, -2.0,
        0.0, 0.0,  2.0,   4.0, 0.0,  2.0,   4.0, 2.0,  2.0,
    ];
    #[rustfmt::skip]
    let indices = vec![
        0, 2, 1,
        3, 4, 5,
        0, 3, 5,   0, 5, 2,
        1, 2, 5,   1, 5, 4,
        0, 1, 4,   0, 4, 3,
    ];
    GeometryData::with_u16(positions, indices)
}

pub struct Demo {
    pub scene: MemoryScene,
    /// Nodes expected to move, in creation order.
    pub movers: Vec<NodeId>,
}

pub fn build(crates: usize) -> Demo {
    let mut scene = MemoryScene::new();
    let mut movers = Vec::with_capacity(crates + 1);

    let floor = scene.add_group(MemoryScene::ROOT, translation(0.0, -0.5, 0.0));
    scene.set_attachment(floor, box_attachment([20.0, 0.5, 20.0], 0.0));

    let ramp_res = scene.add_geometry(ramp_geometry());
    let ramp = scene.add_model(MemoryScene::ROOT, translation(-8.0, 0.0, 0.0), ramp_res);
    scene.set_attachment(
        ramp,
        r#"<Attachment type="GameEngine"><BulletPhysics mass="0"/></Attachment>"#,
    );

    // Crates hang off a shared group so writes go through a non-identity parent.
    let stack = scene.add_group(MemoryScene::ROOT, translation(0.0, 1.0, 0.0));
    for i in 0..crates {
        let y = 0.5 + 1.05 * i as f32;
        let node = scene.add_group(stack, translation(0.1 * (i % 2) as f32, y, 0.0));
        scene.set_attachment(node, box_attachment([0.5, 0.5, 0.5], 1.0));
        movers.push(node);
    }

    let ball = scene.add_group(MemoryScene::ROOT, translation(-6.0, 6.0, 0.0));
    scene.set_attachment(
        ball,
        r#"<Attachment type="GameEngine"><BulletPhysics shape="sphere" radius="0.5" mass="2"/></Attachment>"#,
    );
    movers.push(ball);

    // Carries no physics; the scan must skip it.
    let light = scene.add_group(MemoryScene::ROOT, translation(0.0, 90.0, -25.0));
    scene.set_attachment(light, r#"<Attachment type="Sound"/>"#);

    Demo { scene, movers }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene_physics::{PhysicsWorld, SceneGraph};

    #[test]
    fn scan_creates_every_physics_attachment() {
        let demo = build(3);
        let mut world = PhysicsWorld::default();

        let created = world.create_physics_nodes(&demo.scene, demo.scene.attachments());

        // floor + ramp + 3 crates + ball
        assert_eq!(created, 6);
        assert_eq!(world.dynamic_nodes().len(), demo.movers.len());
    }

    #[test]
    fn crates_settle_on_the_floor() {
        let mut demo = build(1);
        let mut world = PhysicsWorld::default();
        world.create_physics_nodes(&demo.scene, demo.scene.attachments());

        for _ in 0..240 {
            world.step(1.0 / 60.0, &mut demo.scene);
        }

        let body = world
            .node_for_host(demo.movers[0])
            .and_then(|n| world.body(n.handle()))
            .unwrap();
        assert!((body.translation().y - 0.5).abs() < 0.1);
    }

    #[test]
    fn reset_then_sync_restores_host_transforms() {
        let mut demo = build(2);
        let start: Vec<_> = demo
            .movers
            .iter()
            .map(|m| demo.scene.world_transform(*m).unwrap())
            .collect();
        let mut world = PhysicsWorld::default();
        world.create_physics_nodes(&demo.scene, demo.scene.attachments());

        for _ in 0..60 {
            world.step(1.0 / 60.0, &mut demo.scene);
        }
        let ball = *demo.movers.last().unwrap();
        assert!(demo.scene.world_transform(ball).unwrap()[(1, 3)] < start[2][(1, 3)]);

        world.reset();
        world.step(0.0, &mut demo.scene);

        for (mover, expected) in demo.movers.iter().zip(&start) {
            let now = demo.scene.world_transform(*mover).unwrap();
            assert!((now - expected).norm() < 1.0e-4, "node {mover} at {now}");
        }
    }
}
