use glam::Vec3;
use rand::RngCore;

use super::Intersection;
use crate::math::normalize_or_randomize;
use crate::transform::Transform;

/// A single point. Particles spawned here all start at the same position.
#[derive(Clone, Debug)]
pub struct Point {
    pub position: Vec3,
    t_position: Vec3,
}

impl Point {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            t_position: position,
        }
    }

    pub(super) fn refresh(&mut self, t: &Transform) {
        self.t_position = t.transform_pos(self.position);
    }

    pub(super) fn transformed_position(&self) -> Vec3 {
        self.t_position
    }

    pub(super) fn contains(&self, _p: Vec3) -> bool {
        false
    }

    pub(super) fn intersects(&self, _v0: Vec3, _v1: Vec3) -> Option<Intersection> {
        None
    }

    pub(super) fn generate_position(&self, _full: bool, _rng: &mut dyn RngCore) -> Vec3 {
        self.t_position
    }

    pub(super) fn move_at_border(&self, p: Vec3, _inside: bool) -> Vec3 {
        p
    }

    pub(super) fn compute_normal(&self, p: Vec3, rng: &mut dyn RngCore) -> Vec3 {
        normalize_or_randomize(p - self.t_position, rng)
    }
}
