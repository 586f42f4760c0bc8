use std::f32::consts::TAU;

use glam::Vec3;
use rand::RngCore;

use super::Intersection;
use crate::math::{face_toward, random_between};
use crate::transform::Transform;
use crate::types::APPROXIMATION_VALUE;

/// Flat annulus (a disk when `min_radius` is zero).
#[derive(Clone, Debug)]
pub struct Ring {
    pub position: Vec3,
    pub normal: Vec3,
    pub min_radius: f32,
    pub max_radius: f32,
    t_position: Vec3,
    t_normal: Vec3,
}

impl Ring {
    pub fn new(position: Vec3, normal: Vec3, min_radius: f32, max_radius: f32) -> Self {
        let normal = normal.try_normalize().unwrap_or(Vec3::Y);
        let (min_radius, max_radius) = if min_radius <= max_radius {
            (min_radius.max(0.0), max_radius.max(0.0))
        } else {
            (max_radius.max(0.0), min_radius.max(0.0))
        };
        Self {
            position,
            normal,
            min_radius,
            max_radius,
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

    pub(super) fn contains(&self, _p: Vec3) -> bool {
        false
    }

    pub(super) fn intersects(&self, v0: Vec3, v1: Vec3) -> Option<Intersection> {
        let d0 = (v0 - self.t_position).dot(self.t_normal);
        let d1 = (v1 - self.t_position).dot(self.t_normal);
        if (d0 <= 0.0) == (d1 <= 0.0) {
            return None;
        }

        let t = d0 / (d0 - d1);
        let point = v0 + (v1 - v0) * t;
        let sqr_dist = (point - self.t_position).length_squared();
        if sqr_dist < self.min_radius * self.min_radius
            || sqr_dist > self.max_radius * self.max_radius
        {
            return None;
        }

        let normal = if d0 > 0.0 { self.t_normal } else { -self.t_normal };
        Some(Intersection::nudged(point, normal))
    }

    pub(super) fn generate_position(&self, _full: bool, rng: &mut dyn RngCore) -> Vec3 {
        let (u, v) = self.t_normal.any_orthonormal_pair();
        let angle = random_between(rng, 0.0, TAU);
        // Square root of a uniform square radius keeps the density even.
        let radius = random_between(
            rng,
            self.min_radius * self.min_radius,
            self.max_radius * self.max_radius,
        )
        .sqrt();
        self.t_position + (u * angle.cos() + v * angle.sin()) * radius
    }

    pub(super) fn move_at_border(&self, p: Vec3, inside: bool) -> Vec3 {
        let d = (p - self.t_position).dot(self.t_normal);
        let on_plane = p - self.t_normal * d;
        let radial = on_plane - self.t_position;
        let len = radial.length();
        let clamped = if len > 0.0 {
            radial * (len.clamp(self.min_radius, self.max_radius) / len)
        } else {
            radial
        };

        // Same sides as a plane: behind the normal is "inside".
        let side = if inside { self.t_normal } else { -self.t_normal };
        self.t_position + clamped + side * APPROXIMATION_VALUE
    }

    pub(super) fn compute_normal(&self, p: Vec3, _rng: &mut dyn RngCore) -> Vec3 {
        face_toward(self.t_normal, p - self.t_position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn annulus() -> Ring {
        Ring::new(Vec3::ZERO, Vec3::Y, 1.0, 2.0)
    }

    #[test]
    fn only_the_annulus_is_hit() {
        let r = annulus();
        assert!(r.intersects(Vec3::new(1.5, 1.0, 0.0), Vec3::new(1.5, -1.0, 0.0)).is_some());
        // Through the hole.
        assert!(r.intersects(Vec3::new(0.5, 1.0, 0.0), Vec3::new(0.5, -1.0, 0.0)).is_none());
        // Outside the rim.
        assert!(r.intersects(Vec3::new(3.0, 1.0, 0.0), Vec3::new(3.0, -1.0, 0.0)).is_none());
    }

    #[test]
    fn generated_positions_lie_in_the_annulus() {
        let mut rng = StdRng::seed_from_u64(11);
        let r = annulus();
        for _ in 0..100 {
            let p = r.generate_position(true, &mut rng);
            assert!(p.y.abs() < 1e-5);
            let dist = p.length();
            assert!((1.0 - 1e-4..=2.0 + 1e-4).contains(&dist));
        }
    }

    #[test]
    fn normal_faces_the_point_side() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(annulus().compute_normal(Vec3::new(0.0, -2.0, 0.0), &mut rng), -Vec3::Y);
    }
}
