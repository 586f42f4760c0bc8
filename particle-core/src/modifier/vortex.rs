use glam::{Affine3A, Quat, Vec3};

use super::{ModifierEffect, ModifyContext, Trigger, TriggerMask};
use crate::buffer::BufferHandler;
use crate::particle::Particle;

/// Spins particles around an axis and draws them toward it.
#[derive(Clone, Copy, Debug)]
pub struct Vortex {
    position: Vec3,
    direction: Vec3,
    t_position: Vec3,
    t_direction: Vec3,
    /// Radians per second when `angular_speed` is set, otherwise units per
    /// second along the circle.
    pub rotation_speed: f32,
    /// Units per second when `linear_attraction` is set, otherwise a
    /// fraction of the distance to the axis per second.
    pub attraction_speed: f32,
    pub angular_speed: bool,
    pub linear_attraction: bool,
    /// Particles closer to the axis than this are killed when
    /// `kill_in_eye` is set.
    pub eye_radius: f32,
    pub kill_in_eye: bool,
}

impl Vortex {
    pub fn new(position: Vec3, direction: Vec3, rotation_speed: f32, attraction_speed: f32) -> Self {
        let direction = direction.try_normalize().unwrap_or(Vec3::Y);
        Self {
            position,
            direction,
            t_position: position,
            t_direction: direction,
            rotation_speed,
            attraction_speed,
            angular_speed: false,
            linear_attraction: true,
            eye_radius: 0.0,
            kill_in_eye: false,
        }
    }

    pub fn with_eye(mut self, radius: f32, kill: bool) -> Self {
        self.eye_radius = radius;
        self.kill_in_eye = kill;
        self
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }
}

impl BufferHandler for Vortex {}

impl ModifierEffect for Vortex {
    fn modify(&mut self, particle: &mut Particle<'_>, _ctx: &mut ModifyContext<'_>, dt: f32) {
        let rel = particle.position() - self.t_position;
        let height = rel.dot(self.t_direction);
        let radial = rel - self.t_direction * height;
        let dist = radial.length();

        if self.kill_in_eye && dist < self.eye_radius {
            particle.kill();
            return;
        }
        if dist == 0.0 {
            return;
        }

        let angle = if self.angular_speed {
            self.rotation_speed * dt
        } else {
            self.rotation_speed * dt / dist
        };
        let end_radius = if self.linear_attraction {
            dist - self.attraction_speed * dt
        } else {
            dist * (1.0 - self.attraction_speed * dt)
        }
        .max(0.0);

        let rotated = Quat::from_axis_angle(self.t_direction, angle) * (radial / dist);
        particle.set_position(self.t_position + self.t_direction * height + rotated * end_radius);
    }

    fn available_triggers(&self) -> TriggerMask {
        TriggerMask::ALWAYS | TriggerMask::INSIDE_ZONE | TriggerMask::OUTSIDE_ZONE
    }

    fn default_trigger(&self) -> Trigger {
        Trigger::InsideZone
    }

    fn update_transform(&mut self, world: &Affine3A) {
        self.t_position = world.transform_point3(self.position);
        self.t_direction = world
            .transform_vector3(self.direction)
            .try_normalize()
            .unwrap_or(Vec3::Y);
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;
    use std::rc::Rc;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::model::Model;
    use crate::modifier::Modifier;
    use crate::pool::ParticlePool;

    fn step(vortex: Vortex, at: Vec3) -> (Vec3, bool) {
        let mut rng = StdRng::seed_from_u64(0);
        let mut pool = ParticlePool::new(Rc::new(Model::default()), 1);
        let index = pool.activate().unwrap();
        pool.data_mut(index).life = 1.0;
        let mut modifier = Modifier::new(vortex);

        let mut p = Particle::new(&mut pool, index);
        p.set_position(at);
        modifier.process(&mut p, 1.0, &mut rng);
        (p.position(), p.is_dead())
    }

    #[test]
    fn rotates_around_the_axis_and_keeps_height() {
        let mut vortex = Vortex::new(Vec3::ZERO, Vec3::Y, FRAC_PI_2, 0.0);
        vortex.angular_speed = true;
        let (p, _) = step(vortex, Vec3::new(1.0, 3.0, 0.0));
        // A quarter turn around +Y takes +X to -Z.
        assert!((p - Vec3::new(0.0, 3.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn attraction_reduces_distance_to_the_axis() {
        let (p, _) = step(Vortex::new(Vec3::ZERO, Vec3::Y, 0.0, 0.5), Vec3::new(2.0, 0.0, 0.0));
        assert!((p - Vec3::new(1.5, 0.0, 0.0)).length() < 1e-5);

        let mut relative = Vortex::new(Vec3::ZERO, Vec3::Y, 0.0, 0.5);
        relative.linear_attraction = false;
        let (p, _) = step(relative, Vec3::new(2.0, 0.0, 0.0));
        assert!((p - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn eye_kills_particles() {
        let vortex = Vortex::new(Vec3::ZERO, Vec3::Y, 1.0, 0.0).with_eye(0.5, true);
        let (_, dead) = step(vortex, Vec3::new(0.2, 1.0, 0.0));
        assert!(dead);
        let (_, dead) = step(vortex, Vec3::new(2.0, 1.0, 0.0));
        assert!(!dead);
    }
}
