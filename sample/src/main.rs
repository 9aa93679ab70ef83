//! Headless box-drop sample.
//!
//! Builds the demo scene, creates a physics node for every attachment, drops the crates for
//! a few seconds of wall-clock frames, resets the world ("space pressed") and drops them
//! again, logging where everything ended up.
//!
//! Usage: `box-sample [settings.toml]`. Set `RUST_LOG=info` (or `debug`) to see output.

mod demo;

use std::{process::ExitCode, time::Duration};

use scene_physics::{NodeId, PhysicsSettings, PhysicsWorld, SceneGraph};

const FRAME: Duration = Duration::from_micros(16_667);
const FRAMES_PER_DROP: u32 = 180;
const CRATES: usize = 5;

fn load_settings() -> Result<PhysicsSettings, String> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(PhysicsSettings::default());
    };
    let text = std::fs::read_to_string(&path).map_err(|e| format!("{path}: {e}"))?;
    PhysicsSettings::from_toml_str(&text).map_err(|e| format!("{path}: {e}"))
}

fn report(world: &PhysicsWorld, scene: &dyn SceneGraph, movers: &[NodeId], label: &str) {
    for host in movers {
        let Some(node) = world.node_for_host(*host) else {
            continue;
        };
        if let Some(m) = scene.world_transform(*host) {
            log::info!(
                "[{label}] node {host} ({:?}) at ({:.2}, {:.2}, {:.2})",
                node.shape().form,
                m[(0, 3)],
                m[(1, 3)],
                m[(2, 3)]
            );
        }
    }
}

fn main() -> ExitCode {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    }

    let settings = match load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Could not load settings: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut demo = demo::build(CRATES);
    let mut world = PhysicsWorld::new(settings);
    let created = world.create_physics_nodes(&demo.scene, demo.scene.attachments());
    log::info!(
        "{created} physics nodes, {} of them dynamic",
        world.dynamic_nodes().len()
    );

    for round in ["first drop", "after reset"] {
        for _ in 0..FRAMES_PER_DROP {
            std::thread::sleep(FRAME);
            world.render(&mut demo.scene);
        }
        report(&world, &demo.scene, &demo.movers, round);

        world.reset();
        // Push the start poses back to the host before the next frame.
        world.step(0.0, &mut demo.scene);
        report(&world, &demo.scene, &demo.movers, "reset");
    }

    ExitCode::SUCCESS
}
