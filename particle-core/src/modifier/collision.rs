use super::{ModifierEffect, ModifyContext, Trigger, TriggerMask};
use crate::buffer::BufferHandler;
use crate::model::ModelParam;
use crate::particle::Particle;
use crate::pool::ParticlePool;
use crate::types::SlotIndex;

/// Sphere-sphere collisions between the particles of a group.
///
/// A particle is only tested against the particles stored before it in the
/// pool, so every pair is resolved once per frame. Radii are
/// `size * scale / 2`. `elasticity` is 1 for elastic collisions and 0 for
/// fully inelastic ones; values above 1 add energy.
#[derive(Clone, Copy, Debug)]
pub struct Collision {
    pub scale: f32,
    pub elasticity: f32,
}

impl Default for Collision {
    fn default() -> Self {
        Collision::new(1.0, 1.0)
    }
}

impl Collision {
    pub fn new(scale: f32, elasticity: f32) -> Self {
        Self { scale, elasticity }
    }

    fn radius(&self, pool: &ParticlePool, index: SlotIndex) -> f32 {
        pool.param_current(index, ModelParam::Size) * self.scale * 0.5
    }

    fn resolve(&self, pool: &mut ParticlePool, i: SlotIndex, j: SlotIndex) {
        let r = self.radius(pool, i) + self.radius(pool, j);
        let sqr_radius = r * r;

        let (a, b) = (*pool.data(i), *pool.data(j));
        let mut normal = a.position - b.position;
        let sqr_dist = normal.length_squared();
        if sqr_dist >= sqr_radius {
            return;
        }

        let relative = a.velocity - b.velocity;
        if normal.dot(relative) >= 0.0 {
            return;
        }

        let old_sqr_dist = a.old_position.distance_squared(b.old_position);
        if old_sqr_dist > sqr_dist {
            // Undo this frame's move so the pair does not tunnel.
            pool.data_mut(i).position = a.old_position;
            pool.data_mut(j).position = b.old_position;
            normal = a.old_position - b.old_position;
            if normal.dot(relative) >= 0.0 {
                return;
            }
        }

        let Some(normal) = normal.try_normalize() else {
            return;
        };
        let u1 = normal.dot(a.velocity);
        let u2 = normal.dot(b.velocity);

        let (new_u1, new_u2) = if old_sqr_dist < sqr_radius {
            // Already overlapping last frame: each particle hands its
            // approaching normal component to the other instead of bouncing.
            (u1.max(0.0) + u2.max(0.0), u2.min(0.0) + u1.min(0.0))
        } else {
            let (m1, m2) = match (
                pool.param_current(i, ModelParam::Mass),
                pool.param_current(j, ModelParam::Mass),
            ) {
                (m1, m2) if m1 + m2 > 0.0 => (m1, m2),
                _ => (1.0, 1.0),
            };
            let momentum = m1 * u1 + m2 * u2;
            let inv_mass = 1.0 / (m1 + m2);
            (
                (momentum + m2 * self.elasticity * (u2 - u1)) * inv_mass,
                (momentum + m1 * self.elasticity * (u1 - u2)) * inv_mass,
            )
        };

        pool.data_mut(i).velocity += normal * (new_u1 - u1);
        pool.data_mut(j).velocity += normal * (new_u2 - u2);
    }
}

impl BufferHandler for Collision {}

impl ModifierEffect for Collision {
    fn modify(&mut self, particle: &mut Particle<'_>, _ctx: &mut ModifyContext<'_>, _dt: f32) {
        let i = particle.index();
        let pool = particle.pool_mut();
        for j in 0..i {
            self.resolve(pool, i, j);
        }
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
    use glam::Vec3;

    use super::*;

    /// Two particles of size 1 at x = -0.4 and x = 0.4, coming from
    /// `old_gap` on either side. Returns their velocities after the
    /// collision is resolved.
    fn collide(elasticity: f32, old_gap: f32, velocities: [f32; 2], mass: f32) -> (Vec3, Vec3) {
        use std::rc::Rc;

        use rand::SeedableRng;
        use rand::rngs::StdRng;

        use crate::model::{Model, ModelFlags};
        use crate::modifier::Modifier;

        let mut model = Model::new(
            ModelFlags::SIZE | ModelFlags::MASS,
            ModelFlags::empty(),
            ModelFlags::empty(),
            ModelFlags::empty(),
        );
        model.set_param(ModelParam::Size, &[1.0]).unwrap();
        model.set_param(ModelParam::Mass, &[mass]).unwrap();

        let mut rng = StdRng::seed_from_u64(0);
        let mut pool = ParticlePool::new(Rc::new(model), 2);
        for (sign, v) in [(-1.0, velocities[0]), (1.0, velocities[1])] {
            let index = pool.activate().unwrap();
            pool.init_particle(index, &mut rng);
            let data = pool.data_mut(index);
            data.old_position = Vec3::X * sign * old_gap;
            data.position = Vec3::X * sign * 0.4;
            data.velocity = Vec3::X * v;
        }

        let mut modifier = Modifier::new(Collision::new(1.0, elasticity));
        let mut p = Particle::new(&mut pool, 1);
        modifier.process(&mut p, 0.2, &mut rng);
        (pool.data(0).velocity, pool.data(1).velocity)
    }

    /// Two unit particles approaching at speed 1 each.
    fn head_on(elasticity: f32, overlap_last_frame: bool) -> (Vec3, Vec3) {
        let old_gap = if overlap_last_frame { 0.45 } else { 0.6 };
        collide(elasticity, old_gap, [1.0, -1.0], 1.0)
    }

    #[test]
    fn elastic_collision_exchanges_velocities() {
        let (v0, v1) = head_on(1.0, false);
        assert!((v0 - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-5);
        assert!((v1 - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn inelastic_collision_shares_momentum() {
        let (v0, v1) = head_on(0.0, false);
        assert!(v0.length() < 1e-5);
        assert!(v1.length() < 1e-5);
    }

    #[test]
    fn overlapping_pair_stops_approaching() {
        let (v0, v1) = head_on(1.0, true);
        assert!(v0.x <= 1e-5);
        assert!(v1.x >= -1e-5);
    }

    #[test]
    fn overlapping_pair_keeps_its_momentum() {
        // The left particle rests while the right one runs into it.
        let (v0, v1) = collide(1.0, 0.45, [0.0, -1.0], 1.0);
        assert!((v0 - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-5);
        assert!(v1.length() < 1e-5);
    }

    #[test]
    fn massless_pair_collides_as_unit_masses() {
        let (v0, v1) = collide(1.0, 0.6, [1.0, -1.0], 0.0);
        assert!(v0.is_finite() && v1.is_finite());
        assert!((v0 - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-5);
        assert!((v1 - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5);
    }
}
