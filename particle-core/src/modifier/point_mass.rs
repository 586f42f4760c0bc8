use glam::{Affine3A, Vec3};

use super::{ModifierEffect, ModifyContext, Trigger, TriggerMask};
use crate::buffer::BufferHandler;
use crate::particle::Particle;

/// Attracts particles toward a point (repels them with a negative mass).
///
/// The point is `position`, offset by the position of the modifier zone
/// when there is one. Below `min_distance` the pull no longer grows.
#[derive(Clone, Copy, Debug)]
pub struct PointMass {
    position: Vec3,
    t_position: Vec3,
    pub mass: f32,
    min_distance: f32,
    sqr_min_distance: f32,
}

impl PointMass {
    pub fn new(position: Vec3, mass: f32, min_distance: f32) -> Self {
        Self {
            position,
            t_position: position,
            mass,
            min_distance,
            sqr_min_distance: min_distance * min_distance,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.t_position = position;
    }

    pub fn min_distance(&self) -> f32 {
        self.min_distance
    }

    pub fn set_min_distance(&mut self, min_distance: f32) {
        self.min_distance = min_distance;
        self.sqr_min_distance = min_distance * min_distance;
    }
}

impl BufferHandler for PointMass {}

impl ModifierEffect for PointMass {
    fn modify(&mut self, particle: &mut Particle<'_>, ctx: &mut ModifyContext<'_>, dt: f32) {
        let center = match ctx.zone {
            Some(zone) => self.t_position + zone.position(),
            None => self.t_position,
        };
        let pull = center - particle.position();
        let sqr_dist = pull.length_squared().max(self.sqr_min_distance);
        if sqr_dist <= 0.0 {
            return;
        }
        let velocity = particle.velocity() + pull * (self.mass * dt / sqr_dist);
        particle.set_velocity(velocity);
    }

    fn available_triggers(&self) -> TriggerMask {
        TriggerMask::ALWAYS | TriggerMask::INSIDE_ZONE | TriggerMask::OUTSIDE_ZONE
    }

    fn default_trigger(&self) -> Trigger {
        Trigger::InsideZone
    }

    fn update_transform(&mut self, world: &Affine3A) {
        self.t_position = world.transform_point3(self.position);
    }
}
