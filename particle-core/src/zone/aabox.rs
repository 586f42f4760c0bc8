use glam::Vec3;
use rand::{Rng, RngCore};

use super::Intersection;
use crate::math::{normalize_or_randomize, random_vec3};
use crate::transform::Transform;
use crate::types::APPROXIMATION_VALUE;

/// Axis-aligned box given by its center and its full dimensions.
///
/// Only the center follows the world transform; the box stays aligned
/// with the world axes.
#[derive(Clone, Debug)]
pub struct AaBox {
    pub center: Vec3,
    pub dimension: Vec3,
    t_center: Vec3,
}

impl AaBox {
    pub fn new(center: Vec3, dimension: Vec3) -> Self {
        Self {
            center,
            dimension: dimension.abs(),
            t_center: center,
        }
    }

    #[inline]
    fn half(&self) -> Vec3 {
        self.dimension * 0.5
    }

    pub(super) fn refresh(&mut self, t: &Transform) {
        self.t_center = t.transform_pos(self.center);
    }

    pub(super) fn transformed_position(&self) -> Vec3 {
        self.t_center
    }

    pub(super) fn contains(&self, p: Vec3) -> bool {
        (p - self.t_center).abs().cmple(self.half()).all()
    }

    pub(super) fn intersects(&self, v0: Vec3, v1: Vec3) -> Option<Intersection> {
        let half = self.half();
        let delta = v1 - v0;
        let mut best: Option<(f32, Vec3, Vec3)> = None;

        for axis in 0..3 {
            if delta[axis] == 0.0 {
                continue;
            }
            for side in [-1.0f32, 1.0] {
                let face = self.t_center[axis] + side * half[axis];
                let s0 = v0[axis] - face;
                let s1 = v1[axis] - face;
                if (s0 <= 0.0) == (s1 <= 0.0) {
                    continue;
                }

                let t = s0 / (s0 - s1);
                if best.is_some_and(|(bt, _, _)| bt <= t) {
                    continue;
                }

                let point = v0 + delta * t;
                let local = (point - self.t_center).abs();
                let on_face = (0..3).all(|k| k == axis || local[k] <= half[k]);
                if !on_face {
                    continue;
                }

                let mut normal = Vec3::ZERO;
                normal[axis] = if s0 > 0.0 { 1.0 } else { -1.0 };
                best = Some((t, point, normal));
            }
        }

        best.map(|(_, point, normal)| Intersection::nudged(point, normal))
    }

    pub(super) fn generate_position(&self, full: bool, rng: &mut dyn RngCore) -> Vec3 {
        let half = self.half();
        let mut p = random_vec3(rng, -half, half);
        if !full {
            let face = rng.random_range(0..6usize);
            let axis = face / 2;
            p[axis] = if face % 2 == 0 { -half[axis] } else { half[axis] };
        }
        self.t_center + p
    }

    pub(super) fn move_at_border(&self, p: Vec3, inside: bool) -> Vec3 {
        let half = self.half();
        let mut local = p - self.t_center;

        if inside {
            // Push out through the nearest face.
            let gap = half - local.abs();
            let axis = if gap.x <= gap.y && gap.x <= gap.z {
                0
            } else if gap.y <= gap.z {
                1
            } else {
                2
            };
            local[axis] = local[axis].signum() * (half[axis] + APPROXIMATION_VALUE);
        } else {
            let inner = (half - Vec3::splat(APPROXIMATION_VALUE)).max(Vec3::ZERO);
            local = local.clamp(-inner, inner);
        }

        self.t_center + local
    }

    pub(super) fn compute_normal(&self, p: Vec3, rng: &mut dyn RngCore) -> Vec3 {
        let local = p - self.t_center;
        let ratio = local.abs() / self.half().max(Vec3::splat(f32::EPSILON));
        if ratio.max_element() == 0.0 {
            return normalize_or_randomize(Vec3::ZERO, rng);
        }

        let axis = if ratio.x >= ratio.y && ratio.x >= ratio.z {
            0
        } else if ratio.y >= ratio.z {
            1
        } else {
            2
        };
        let mut normal = Vec3::ZERO;
        normal[axis] = local[axis].signum();
        normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn cube() -> AaBox {
        AaBox::new(Vec3::ZERO, Vec3::splat(2.0))
    }

    #[test]
    fn contains_is_component_wise() {
        let b = cube();
        assert!(b.contains(Vec3::new(1.0, -1.0, 0.5)));
        assert!(!b.contains(Vec3::new(1.0, -1.5, 0.5)));
    }

    #[test]
    fn intersects_reports_first_face() {
        let hit = cube()
            .intersects(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, -5.0, 0.0))
            .expect("segment crosses the box");

        assert_eq!(hit.normal, Vec3::Y);
        assert!((hit.point.y - (1.0 + APPROXIMATION_VALUE)).abs() < 1e-6);
    }

    #[test]
    fn intersects_ignores_plane_crossings_outside_faces() {
        // Crosses the plane x = 1 at y = 3, beside the box.
        let miss = cube().intersects(Vec3::new(0.0, 3.0, 0.0), Vec3::new(2.0, 3.0, 0.0));
        assert!(miss.is_none());
    }

    #[test]
    fn border_positions_lie_on_a_face() {
        let mut rng = StdRng::seed_from_u64(9);
        let b = cube();
        for _ in 0..100 {
            let p = b.generate_position(false, &mut rng);
            assert!(b.contains(p));
            assert!((p.abs().max_element() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn move_at_border_uses_nearest_face() {
        let b = cube();
        let out = b.move_at_border(Vec3::new(0.1, 0.9, 0.0), true);
        assert_eq!(out.x, 0.1);
        assert!((out.y - (1.0 + APPROXIMATION_VALUE)).abs() < 1e-6);

        let back = b.move_at_border(Vec3::new(4.0, 0.0, 0.0), false);
        assert!(b.contains(back));
        assert!((back.x - (1.0 - APPROXIMATION_VALUE)).abs() < 1e-6);
    }

    #[test]
    fn normal_follows_dominant_axis() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(cube().compute_normal(Vec3::new(0.2, -0.9, 0.1), &mut rng), -Vec3::Y);
    }
}
