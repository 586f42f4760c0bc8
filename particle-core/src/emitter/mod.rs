//! Particle sources.
//!
//! An [`Emitter`] turns its flow and tank into a number of births per
//! frame and gives each newborn a position (sampled from its zone) and a
//! velocity (direction from its [`VelocityStrategy`], speed sampled in
//! `[force_min, force_max]` and divided by the particle mass).

mod velocity;

pub use velocity::VelocityStrategy;

use glam::{Affine3A, Vec3};
use rand::RngCore;

use crate::handle::{Handle, HandleRef};
use crate::math::random_between;
use crate::particle::Particle;
use crate::transform::Transform;
use crate::zone::Zone;

#[derive(Clone, Debug)]
pub struct Emitter {
    zone: Handle<Zone>,
    /// Spawn in the whole zone volume rather than on its border.
    pub full_zone: bool,
    tank: i32,
    flow: f32,
    force_min: f32,
    force_max: f32,
    fraction: f32,
    pub active: bool,
    pub strategy: VelocityStrategy,
    transform: Transform,
}

impl Default for Emitter {
    fn default() -> Self {
        Emitter::new(VelocityStrategy::default())
    }
}

impl Emitter {
    /// Creates an active emitter on a point zone at the origin, with an
    /// infinite tank and no flow.
    pub fn new(strategy: VelocityStrategy) -> Self {
        Self {
            zone: Handle::owned(Zone::default()),
            full_zone: true,
            tank: -1,
            flow: 0.0,
            force_min: 0.0,
            force_max: 0.0,
            fraction: 0.0,
            active: true,
            strategy,
            transform: Transform::default(),
        }
    }

    /// Builder form of [`Emitter::set_zone`].
    pub fn with_zone(mut self, zone: Handle<Zone>, full: bool) -> Self {
        self.set_zone(zone, full);
        self
    }

    /// Builder form of [`Emitter::set_flow`].
    pub fn with_flow(mut self, flow: f32) -> Self {
        self.flow = flow;
        self
    }

    /// Builder form of [`Emitter::set_tank`].
    pub fn with_tank(mut self, tank: i32) -> Self {
        self.tank = tank;
        self
    }

    /// Builder form of [`Emitter::set_force`].
    pub fn with_force(mut self, min: f32, max: f32) -> Self {
        self.set_force(min, max);
        self
    }

    /// Sets where newborns are placed.
    ///
    /// ### Parameters
    /// - `zone` - Spawn zone. Pass a shared handle to let other emitters or
    ///   modifiers follow the same zone.
    /// - `full` - Spawn anywhere in the volume rather than on the border.
    pub fn set_zone(&mut self, zone: Handle<Zone>, full: bool) {
        self.zone = zone;
        self.full_zone = full;
    }

    pub fn zone(&self) -> HandleRef<'_, Zone> {
        self.zone.borrow()
    }

    pub fn zone_handle(&self) -> &Handle<Zone> {
        &self.zone
    }

    /// Particles per second; negative empties the tank at once.
    pub fn flow(&self) -> f32 {
        self.flow
    }

    pub fn set_flow(&mut self, flow: f32) {
        self.flow = flow;
    }

    /// Remaining particles; negative is infinite.
    pub fn tank(&self) -> i32 {
        self.tank
    }

    pub fn set_tank(&mut self, tank: i32) {
        self.tank = tank;
    }

    /// Sets the range the launch force is sampled in. The resulting speed
    /// is the force divided by the particle mass.
    pub fn set_force(&mut self, min: f32, max: f32) {
        self.force_min = min;
        self.force_max = max;
    }

    pub fn force_min(&self) -> f32 {
        self.force_min
    }

    pub fn force_max(&self) -> f32 {
        self.force_max
    }

    /// An emitter with an empty tank or no flow never emits again until
    /// reconfigured.
    pub fn is_sleeping(&self) -> bool {
        self.tank == 0 || self.flow == 0.0
    }

    /// Number of particles to emit for a step of `dt` seconds.
    ///
    /// The fractional part of `flow * dt` is carried over to the next call,
    /// so a flow of 2.5 over steps of 1 second alternates 2 and 3 births.
    pub fn update_number(&mut self, dt: f32) -> u32 {
        let nb = if self.flow < 0.0 {
            let nb = self.tank.max(0);
            self.tank = 0;
            nb
        } else if self.tank != 0 {
            self.fraction += self.flow * dt;
            let mut nb = self.fraction as i32;
            if self.tank >= 0 {
                nb = nb.min(self.tank);
                self.tank -= nb;
            }
            self.fraction -= nb as f32;
            nb
        } else {
            0
        };
        nb.max(0) as u32
    }

    /// Places a newborn particle and gives it its initial velocity.
    pub fn emit(&self, particle: &mut Particle<'_>, rng: &mut dyn RngCore) {
        let position = self.zone.borrow().generate_position(self.full_zone, rng);
        particle.set_position(position);
        self.generate_velocity(particle, rng);
    }

    /// Gives a particle its launch velocity without moving it.
    pub fn generate_velocity(&self, particle: &mut Particle<'_>, rng: &mut dyn RngCore) {
        let speed = random_between(rng, self.force_min, self.force_max) / particle.mass();
        let direction = self.strategy.direction(
            particle.position(),
            &self.zone.borrow(),
            &self.transform,
            rng,
        );
        particle.set_velocity(direction.map_or(Vec3::ZERO, |d| d * speed));
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Sets the transform relative to the owning group. Applied on the next
    /// [`Emitter::update_transform`].
    pub fn set_local_transform(&mut self, local: Affine3A) {
        self.transform.local = local;
    }

    /// Propagates the parent transform to the emitter and its zones.
    pub fn update_transform(&mut self, parent: &Affine3A) {
        self.transform.update(parent);
        let world = *self.transform.world();
        self.zone.borrow_mut().update_transform(&world);
        self.strategy.update_transform(&world);
    }
}
