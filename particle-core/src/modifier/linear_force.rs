use glam::{Affine3A, Vec3};

use super::{ModifierEffect, ModifyContext, Trigger, TriggerMask};
use crate::buffer::BufferHandler;
use crate::model::ModelParam;
use crate::particle::Particle;

/// Optional scaling of a [`LinearForce`] by a particle parameter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ForceFactor {
    #[default]
    Constant,
    Linear(ModelParam),
    Square(ModelParam),
}

/// Constant acceleration such as wind or a local gravity well.
///
/// Each step adds `force * factor * dt / mass` to the velocity.
#[derive(Clone, Copy, Debug)]
pub struct LinearForce {
    force: Vec3,
    t_force: Vec3,
    pub factor: ForceFactor,
}

impl LinearForce {
    pub fn new(force: Vec3) -> Self {
        Self {
            force,
            t_force: force,
            factor: ForceFactor::Constant,
        }
    }

    pub fn with_factor(mut self, factor: ForceFactor) -> Self {
        self.factor = factor;
        self
    }

    pub fn force(&self) -> Vec3 {
        self.force
    }

    /// Takes effect on the next transform update.
    pub fn set_force(&mut self, force: Vec3) {
        self.force = force;
        self.t_force = force;
    }
}

impl BufferHandler for LinearForce {}

impl ModifierEffect for LinearForce {
    fn modify(&mut self, particle: &mut Particle<'_>, _ctx: &mut ModifyContext<'_>, dt: f32) {
        let mut factor = dt / particle.mass();
        match self.factor {
            ForceFactor::Constant => {}
            ForceFactor::Linear(param) => factor *= particle.param_current(param),
            ForceFactor::Square(param) => {
                let value = particle.param_current(param);
                factor *= value * value;
            }
        }
        let velocity = particle.velocity() + self.t_force * factor;
        particle.set_velocity(velocity);
    }

    fn available_triggers(&self) -> TriggerMask {
        TriggerMask::ALWAYS | TriggerMask::INSIDE_ZONE | TriggerMask::OUTSIDE_ZONE
    }

    fn default_trigger(&self) -> Trigger {
        Trigger::InsideZone
    }

    fn update_transform(&mut self, world: &Affine3A) {
        self.t_force = world.transform_vector3(self.force);
    }
}
