/// Gravity applied to every dynamic body, in world units per second squared.
///
/// Convention: +Y is up, so gravity points down the Y axis.
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, -9.81, 0.0];

/// Half the side length of the axis-aligned world volume (world units).
///
/// The simulated volume spans `[-WORLD_HALF_EXTENT, WORLD_HALF_EXTENT]` on each axis.
/// Bodies created outside of it still simulate, but are reported at creation time.
pub const WORLD_HALF_EXTENT: f32 = 1000.0;

/// Multiplier applied to measured wall-clock time before stepping.
pub const DEFAULT_TIME_SCALE: f32 = 1.0;

/// Solver step used when advancing by wall-clock time (seconds).
pub const FIXED_TIMESTEP: f32 = 1.0 / 60.0;

/// Most solver steps taken for one wall-clock frame. Time beyond that is dropped.
pub const MAX_SUBSTEPS: u32 = 1;

/// Root tag name of an attachment block.
pub const ATTACHMENT_TAG: &str = "Attachment";

/// Value of the attachment's `type` attribute that marks it as ours (case-insensitive).
pub const ATTACHMENT_TYPE: &str = "GameEngine";

/// Child tag holding the collision shape attributes.
pub const SHAPE_TAG: &str = "BulletPhysics";

/// Smallest scale component accepted when removing scale from a node transform.
pub const MIN_SCALE: f32 = 1.0e-6;
