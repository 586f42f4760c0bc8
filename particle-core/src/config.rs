use glam::Vec3;

/// Settings of a [`crate::group::Group`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Number of particle slots reserved up front.
    pub capacity: usize,
    pub gravity: Vec3,
    /// Velocity damping rate, divided by each particle's mass.
    pub friction: f32,
    /// Sort particles back to front every frame. Implies distance
    /// computation.
    pub sorting: bool,
    /// Keep each particle's squared distance to the camera up to date.
    pub distance_computation: bool,
    /// Track the bounding box of the alive particles.
    pub aabb_computation: bool,
    /// Let renderers and modifiers create their buffers on demand.
    pub buffer_management: bool,
    /// Seed of the group random generator; random from the OS when `None`.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 1000,
            gravity: Vec3::ZERO,
            friction: 0.0,
            sorting: false,
            distance_computation: false,
            aabb_computation: false,
            buffer_management: true,
            seed: None,
        }
    }
}
