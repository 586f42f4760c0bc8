use super::{ModifierEffect, ModifyContext, Trigger, TriggerMask};
use crate::buffer::BufferHandler;
use crate::model::ModelParam;
use crate::particle::Particle;

/// Advances the angle of particles by their rotation speed.
///
/// Needs `Angle` enabled in the model; `RotationSpeed` falls back to its
/// default of zero when disabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct Rotator;

impl BufferHandler for Rotator {}

impl ModifierEffect for Rotator {
    fn modify(&mut self, particle: &mut Particle<'_>, _ctx: &mut ModifyContext<'_>, dt: f32) {
        let speed = particle.param_current(ModelParam::RotationSpeed);
        particle.change_param_current(ModelParam::Angle, speed * dt);
    }

    fn available_triggers(&self) -> TriggerMask {
        TriggerMask::ALWAYS | TriggerMask::INSIDE_ZONE | TriggerMask::OUTSIDE_ZONE
    }

    fn default_trigger(&self) -> Trigger {
        Trigger::Always
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::model::{Model, ModelFlags};
    use crate::modifier::Modifier;
    use crate::pool::ParticlePool;

    #[test]
    fn angle_grows_with_rotation_speed() {
        let mut model = Model::new(
            ModelFlags::ANGLE | ModelFlags::ROTATION_SPEED,
            ModelFlags::empty(),
            ModelFlags::empty(),
            ModelFlags::empty(),
        );
        model.set_param(ModelParam::RotationSpeed, &[2.0]).unwrap();

        let mut rng = StdRng::seed_from_u64(0);
        let mut pool = ParticlePool::new(Rc::new(model), 1);
        let index = pool.activate().unwrap();
        pool.init_particle(index, &mut rng);

        let mut modifier = Modifier::new(Rotator);
        let mut p = Particle::new(&mut pool, index);
        modifier.process(&mut p, 0.25, &mut rng);
        modifier.process(&mut p, 0.25, &mut rng);

        assert_eq!(p.param_current(ModelParam::Angle), 1.0);
    }
}
