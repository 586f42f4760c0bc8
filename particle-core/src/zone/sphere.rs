use glam::Vec3;
use rand::RngCore;

use super::Intersection;
use crate::math::{normalize_or_randomize, random_in_unit_ball, random_unit_vector};
use crate::transform::Transform;
use crate::types::APPROXIMATION_VALUE;

#[derive(Clone, Debug)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
    t_center: Vec3,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center,
            radius: radius.abs(),
            t_center: center,
        }
    }

    pub(super) fn refresh(&mut self, t: &Transform) {
        self.t_center = t.transform_pos(self.center);
    }

    pub(super) fn transformed_position(&self) -> Vec3 {
        self.t_center
    }

    pub(super) fn contains(&self, p: Vec3) -> bool {
        (p - self.t_center).length_squared() <= self.radius * self.radius
    }

    pub(super) fn intersects(&self, v0: Vec3, v1: Vec3) -> Option<Intersection> {
        let r2 = self.radius * self.radius;
        let d0 = (v0 - self.t_center).length_squared();
        let inside0 = d0 <= r2;
        let inside1 = (v1 - self.t_center).length_squared() <= r2;
        if inside0 && inside1 {
            return None;
        }

        let delta = v1 - v0;
        let len = delta.length();
        if len == 0.0 {
            return None;
        }
        let dir = delta / len;

        // Distance along the segment to the projection of the center.
        let d = dir.dot(self.t_center - v0);
        let disc = r2 - d0 + d * d;
        if disc < 0.0 {
            return None;
        }
        let s = disc.sqrt();
        let t = if inside0 { d + s } else { d - s };
        if !(0.0..=len).contains(&t) {
            return None;
        }

        let point = v0 + dir * t;
        let outward = (point - self.t_center).try_normalize().unwrap_or(-dir);
        let normal = if inside0 { -outward } else { outward };
        Some(Intersection::nudged(point, normal))
    }

    pub(super) fn generate_position(&self, full: bool, rng: &mut dyn RngCore) -> Vec3 {
        let offset = if full {
            random_in_unit_ball(rng)
        } else {
            random_unit_vector(rng)
        };
        self.t_center + offset * self.radius
    }

    pub(super) fn move_at_border(&self, p: Vec3, inside: bool) -> Vec3 {
        let dir = (p - self.t_center).try_normalize().unwrap_or(Vec3::Y);
        let dist = if inside {
            self.radius + APPROXIMATION_VALUE
        } else {
            (self.radius - APPROXIMATION_VALUE).max(0.0)
        };
        self.t_center + dir * dist
    }

    pub(super) fn compute_normal(&self, p: Vec3, rng: &mut dyn RngCore) -> Vec3 {
        normalize_or_randomize(p - self.t_center, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn unit() -> Sphere {
        Sphere::new(Vec3::ZERO, 1.0)
    }

    #[test]
    fn contains_includes_border() {
        let s = unit();
        assert!(s.contains(Vec3::X));
        assert!(s.contains(Vec3::splat(0.5)));
        assert!(!s.contains(Vec3::new(1.01, 0.0, 0.0)));
    }

    #[test]
    fn entering_segment_hits_outer_surface() {
        let hit = unit()
            .intersects(Vec3::new(-3.0, 0.0, 0.0), Vec3::ZERO)
            .expect("segment enters the sphere");

        assert_eq!(hit.normal, -Vec3::X);
        assert!((hit.point.x - (-1.0 - APPROXIMATION_VALUE)).abs() < 1e-5);
    }

    #[test]
    fn exiting_segment_normal_faces_inside() {
        let hit = unit()
            .intersects(Vec3::ZERO, Vec3::new(0.0, 3.0, 0.0))
            .expect("segment leaves the sphere");

        assert_eq!(hit.normal, -Vec3::Y);
        assert!(hit.point.y < 1.0);
    }

    #[test]
    fn segment_crossing_through_is_detected() {
        let hit = unit().intersects(Vec3::new(-2.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0));
        assert!(hit.is_some_and(|h| h.point.x < -1.0));

        let miss = unit().intersects(Vec3::new(-2.0, 2.0, 0.0), Vec3::new(2.0, 2.0, 0.0));
        assert!(miss.is_none());
    }

    #[test]
    fn segment_fully_inside_does_not_intersect() {
        assert!(unit().intersects(Vec3::ZERO, Vec3::splat(0.1)).is_none());
    }

    #[test]
    fn generated_positions_respect_full_flag() {
        let mut rng = StdRng::seed_from_u64(42);
        let s = Sphere::new(Vec3::ONE, 2.0);
        for _ in 0..100 {
            assert!(s.contains(s.generate_position(true, &mut rng)));
            let border = s.generate_position(false, &mut rng);
            assert!(((border - Vec3::ONE).length() - 2.0).abs() < 1e-4);
        }
    }

    #[test]
    fn move_at_border_crosses_to_the_other_side() {
        let s = unit();
        let out = s.move_at_border(Vec3::new(0.2, 0.0, 0.0), true);
        assert!(!s.contains(out));
        assert!((out.x - (1.0 + APPROXIMATION_VALUE)).abs() < 1e-6);

        let back = s.move_at_border(Vec3::new(5.0, 0.0, 0.0), false);
        assert!(s.contains(back));
    }
}
