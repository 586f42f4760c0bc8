use super::{ModifierEffect, ModifyContext, Trigger, TriggerMask};
use crate::buffer::BufferHandler;
use crate::particle::Particle;

/// Kills the particles it is triggered on.
///
/// With a crossing trigger the particle is also moved to the crossing point,
/// so it is reported where it hit the zone.
#[derive(Clone, Copy, Debug, Default)]
pub struct Destroyer;

impl BufferHandler for Destroyer {}

impl ModifierEffect for Destroyer {
    fn modify(&mut self, particle: &mut Particle<'_>, ctx: &mut ModifyContext<'_>, _dt: f32) {
        if ctx.trigger.is_crossing() {
            particle.set_position(ctx.intersection);
        }
        particle.kill();
    }

    fn available_triggers(&self) -> TriggerMask {
        TriggerMask::all()
    }

    fn default_trigger(&self) -> Trigger {
        Trigger::InsideZone
    }

    fn needs_intersection(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use glam::Vec3;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use test_case::test_case;

    use crate::handle::Handle;
    use crate::model::Model;
    use crate::modifier::{Modifier, Trigger};
    use crate::particle::Particle;
    use crate::pool::ParticlePool;
    use crate::zone::Zone;

    /// Runs a destroyer on a particle moving from x = 2 to x = 0 through a
    /// unit sphere, returning its final position and whether it died.
    fn destroy_with(trigger: Trigger, old: Vec3, new: Vec3) -> (Vec3, bool) {
        let mut modifier = Modifier::new(super::Destroyer)
            .with_zone(Handle::owned(Zone::sphere(Vec3::ZERO, 1.0)), false)
            .with_trigger(trigger)
            .unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let mut pool = ParticlePool::new(Rc::new(Model::default()), 1);
        let index = pool.activate().unwrap();
        pool.data_mut(index).life = 1.0;

        let mut p = Particle::new(&mut pool, index);
        p.set_old_position(old);
        p.set_position(new);
        modifier.process(&mut p, 0.1, &mut rng);
        (p.position(), p.is_dead())
    }

    #[test_case(Trigger::IntersectZone ; "intersect")]
    #[test_case(Trigger::EnterZone ; "enter")]
    fn crossing_triggers_move_particle_to_the_border(trigger: Trigger) {
        let (position, dead) = destroy_with(trigger, Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO);
        assert!(dead);
        assert!((position.x - 1.01).abs() < 1e-5);
    }

    #[test_case(Trigger::InsideZone ; "inside")]
    #[test_case(Trigger::Always ; "always")]
    fn containment_triggers_leave_position_untouched(trigger: Trigger) {
        let (position, dead) = destroy_with(trigger, Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO);
        assert!(dead);
        assert_eq!(position, Vec3::ZERO);
    }

    #[test]
    fn outside_trigger_spares_particles_inside() {
        let (_, dead) = destroy_with(Trigger::OutsideZone, Vec3::ZERO, Vec3::ZERO);
        assert!(!dead);
    }
}
