use std::ops::DerefMut;

use glam::Vec3;
use rand::RngCore;

use crate::model::ModelParam;
use crate::modifier::Modifier;
use crate::pool::{ParticleData, ParticlePool};
use crate::types::SlotIndex;

/// Group-level forces applied to every particle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Physics {
    pub gravity: Vec3,
    /// Velocity damping rate, divided by the particle mass.
    pub friction: f32,
}

/// View on one alive slot of a [`ParticlePool`].
///
/// The view borrows the whole pool, so effects working on pairs of
/// particles (collisions) can reach the other slots through
/// [`Particle::pool_mut`].
pub struct Particle<'a> {
    pool: &'a mut ParticlePool,
    index: SlotIndex,
}

impl<'a> Particle<'a> {
    pub fn new(pool: &'a mut ParticlePool, index: SlotIndex) -> Self {
        Self { pool, index }
    }

    #[inline]
    pub fn index(&self) -> SlotIndex {
        self.index
    }

    pub fn pool(&self) -> &ParticlePool {
        &*self.pool
    }

    pub fn pool_mut(&mut self) -> &mut ParticlePool {
        &mut *self.pool
    }

    #[inline]
    pub fn data(&self) -> &ParticleData {
        self.pool.data(self.index)
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut ParticleData {
        self.pool.data_mut(self.index)
    }

    pub fn position(&self) -> Vec3 {
        self.data().position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.data_mut().position = position;
    }

    pub fn old_position(&self) -> Vec3 {
        self.data().old_position
    }

    pub fn set_old_position(&mut self, position: Vec3) {
        self.data_mut().old_position = position;
    }

    pub fn velocity(&self) -> Vec3 {
        self.data().velocity
    }

    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.data_mut().velocity = velocity;
    }

    pub fn age(&self) -> f32 {
        self.data().age
    }

    pub fn life(&self) -> f32 {
        self.data().life
    }

    pub fn set_life(&mut self, life: f32) {
        self.data_mut().life = life;
    }

    pub fn sqr_dist(&self) -> f32 {
        self.data().sqr_dist
    }

    /// Marks the particle dead. The group reclaims its slot at the end of
    /// the particle's update.
    pub fn kill(&mut self) {
        self.data_mut().life = 0.0;
    }

    pub fn is_dead(&self) -> bool {
        self.data().life <= 0.0
    }

    /// Current value of a parameter; the parameter default when disabled.
    pub fn param_current(&self, param: ModelParam) -> f32 {
        self.pool.param_current(self.index, param)
    }

    pub fn set_param_current(&mut self, param: ModelParam, value: f32) -> bool {
        self.pool.set_param_current(self.index, param, value)
    }

    pub fn change_param_current(&mut self, param: ModelParam, delta: f32) -> bool {
        self.pool.change_param_current(self.index, param, delta)
    }

    pub fn param_final(&self, param: ModelParam) -> f32 {
        self.pool.param_final(self.index, param)
    }

    pub fn set_param_final(&mut self, param: ModelParam, value: f32) -> bool {
        self.pool.set_param_final(self.index, param, value)
    }

    pub fn change_param_final(&mut self, param: ModelParam, delta: f32) -> bool {
        self.pool.change_param_final(self.index, param, delta)
    }

    pub fn mass(&self) -> f32 {
        self.param_current(ModelParam::Mass)
    }

    pub fn interpolate_parameters(&mut self) {
        self.pool.interpolate_parameters(self.index);
    }

    /// Squared distance to `camera`, cached in the particle data.
    pub fn compute_sqr_dist(&mut self, camera: Vec3) {
        let d = self.position().distance_squared(camera);
        self.data_mut().sqr_dist = d;
    }

    /// Advances the particle by one step.
    ///
    /// Aging and parameter blending come first, then the motion is
    /// integrated, then each modifier gets the particle, then friction is
    /// applied. Returns `true` if the particle died during the step.
    pub fn update<M>(
        &mut self,
        dt: f32,
        physics: &Physics,
        modifiers: &mut [M],
        rng: &mut dyn RngCore,
    ) -> bool
    where
        M: DerefMut<Target = Modifier>,
    {
        let immortal = self.pool.model().is_immortal();
        let data = self.data_mut();
        data.age += dt;
        let ratio = if immortal {
            None
        } else {
            let ratio = if data.life > 0.0 { (dt / data.life).min(1.0) } else { 1.0 };
            data.life -= dt;
            Some(ratio)
        };
        if let Some(ratio) = ratio {
            self.pool.blend_mutable(self.index, ratio);
        }
        self.interpolate_parameters();

        let data = self.data_mut();
        data.old_position = data.position;
        data.position += data.velocity * dt;
        data.velocity += physics.gravity * dt;

        for modifier in modifiers.iter_mut() {
            modifier.process(self, dt, rng);
        }

        if physics.friction != 0.0 {
            let mass = self.mass();
            let damping = 1.0 - (physics.friction * dt / mass).min(1.0);
            self.data_mut().velocity *= damping;
        }

        self.is_dead()
    }
}
