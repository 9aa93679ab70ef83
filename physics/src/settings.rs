/*!
World configuration.

Defaults reproduce the fixed world every host used so far: earth gravity along -Y and
a ±1000 unit cube. Hosts that want something else can deserialize the settings from
TOML, e.g.

```toml
gravity = [0.0, -3.7, 0.0]
world_half_extent = 250.0
time_scale = 0.5
fixed_timestep = 0.008333
max_substeps = 4
```

Notes
- Distances are world units, time in seconds.
- Missing keys fall back to the defaults.
*/

use nalgebra as na;
use serde::Deserialize;

use crate::{
    constants::{
        DEFAULT_GRAVITY, DEFAULT_TIME_SCALE, FIXED_TIMESTEP, MAX_SUBSTEPS, WORLD_HALF_EXTENT,
    },
    error::SettingsError,
};

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// Gravity acceleration (world units / s²).
    pub gravity: [f32; 3],
    /// Half side length of the world volume.
    pub world_half_extent: f32,
    /// Multiplier applied to wall-clock time in [`PhysicsWorld::render`](crate::PhysicsWorld::render).
    pub time_scale: f32,
    /// Solver step for wall-clock stepping (seconds).
    pub fixed_timestep: f32,
    /// Solver steps allowed per wall-clock frame; the rest of a long frame is dropped.
    pub max_substeps: u32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            world_half_extent: WORLD_HALF_EXTENT,
            time_scale: DEFAULT_TIME_SCALE,
            fixed_timestep: FIXED_TIMESTEP,
            max_substeps: MAX_SUBSTEPS,
        }
    }
}

impl PhysicsSettings {
    /// Parse settings from a TOML document and validate them.
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(text)?;
        if !(settings.world_half_extent > 0.0) {
            return Err(SettingsError::WorldExtent(settings.world_half_extent));
        }
        if !(settings.fixed_timestep > 0.0) {
            return Err(SettingsError::FixedTimestep(settings.fixed_timestep));
        }
        Ok(settings)
    }

    #[inline]
    pub fn gravity_vector(&self) -> na::Vector3<f32> {
        na::Vector3::from(self.gravity)
    }

    /// Is `point` inside the configured world volume?
    #[inline]
    pub fn contains(&self, point: &na::Vector3<f32>) -> bool {
        point.iter().all(|c| c.abs() <= self.world_half_extent)
    }
}
