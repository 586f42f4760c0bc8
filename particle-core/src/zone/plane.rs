use glam::Vec3;
use rand::RngCore;

use super::Intersection;
use crate::transform::Transform;
use crate::types::APPROXIMATION_VALUE;

/// Infinite plane. The half-space behind the normal is the inside.
#[derive(Clone, Debug)]
pub struct Plane {
    pub position: Vec3,
    pub normal: Vec3,
    t_position: Vec3,
    t_normal: Vec3,
}

impl Plane {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        let normal = normal.try_normalize().unwrap_or(Vec3::Y);
        Self {
            position,
            normal,
            t_position: position,
            t_normal: normal,
        }
    }

    pub(super) fn refresh(&mut self, t: &Transform) {
        self.t_position = t.transform_pos(self.position);
        self.t_normal = t
            .transform_dir(self.normal)
            .try_normalize()
            .unwrap_or(Vec3::Y);
    }

    pub(super) fn transformed_position(&self) -> Vec3 {
        self.t_position
    }

    #[inline]
    fn signed_distance(&self, p: Vec3) -> f32 {
        (p - self.t_position).dot(self.t_normal)
    }

    pub(super) fn contains(&self, p: Vec3) -> bool {
        self.signed_distance(p) <= 0.0
    }

    pub(super) fn intersects(&self, v0: Vec3, v1: Vec3) -> Option<Intersection> {
        let d0 = self.signed_distance(v0);
        let d1 = self.signed_distance(v1);
        if (d0 <= 0.0) == (d1 <= 0.0) {
            return None;
        }

        let t = d0 / (d0 - d1);
        let point = v0 + (v1 - v0) * t;
        let normal = if d0 > 0.0 { self.t_normal } else { -self.t_normal };
        Some(Intersection::nudged(point, normal))
    }

    pub(super) fn generate_position(&self, _full: bool, _rng: &mut dyn RngCore) -> Vec3 {
        self.t_position
    }

    pub(super) fn move_at_border(&self, p: Vec3, inside: bool) -> Vec3 {
        let projected = p - self.t_normal * self.signed_distance(p);
        if inside {
            projected + self.t_normal * APPROXIMATION_VALUE
        } else {
            projected - self.t_normal * APPROXIMATION_VALUE
        }
    }

    pub(super) fn compute_normal(&self, _p: Vec3, _rng: &mut dyn RngCore) -> Vec3 {
        self.t_normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground() -> Plane {
        Plane::new(Vec3::ZERO, Vec3::Y)
    }

    #[test]
    fn below_the_plane_is_inside() {
        assert!(ground().contains(Vec3::new(3.0, -0.5, 2.0)));
        assert!(!ground().contains(Vec3::new(3.0, 0.5, 2.0)));
    }

    #[test]
    fn falling_segment_hits_from_above() {
        let hit = ground()
            .intersects(Vec3::new(1.0, 1.0, 0.0), Vec3::new(1.0, -1.0, 0.0))
            .expect("segment crosses the plane");
        assert_eq!(hit.normal, Vec3::Y);
        assert!((hit.point - Vec3::new(1.0, APPROXIMATION_VALUE, 0.0)).length() < 1e-6);
    }

    #[test]
    fn segment_on_one_side_misses() {
        assert!(ground().intersects(Vec3::Y, Vec3::Y * 2.0).is_none());
    }

    #[test]
    fn move_at_border_projects_then_crosses() {
        let p = ground().move_at_border(Vec3::new(2.0, -3.0, 1.0), true);
        assert!((p - Vec3::new(2.0, APPROXIMATION_VALUE, 1.0)).length() < 1e-6);
    }
}
