use glam::Vec3;
use rand::RngCore;

use super::Intersection;
use crate::math::{normalize_or_randomize, random_between};
use crate::transform::Transform;

/// Segment between two points.
#[derive(Clone, Debug)]
pub struct Line {
    pub p0: Vec3,
    pub p1: Vec3,
    t_p0: Vec3,
    t_p1: Vec3,
}

impl Line {
    pub fn new(p0: Vec3, p1: Vec3) -> Self {
        Self {
            p0,
            p1,
            t_p0: p0,
            t_p1: p1,
        }
    }

    pub(super) fn refresh(&mut self, t: &Transform) {
        self.t_p0 = t.transform_pos(self.p0);
        self.t_p1 = t.transform_pos(self.p1);
    }

    /// Middle of the segment.
    pub(super) fn transformed_position(&self) -> Vec3 {
        (self.t_p0 + self.t_p1) * 0.5
    }

    pub(super) fn contains(&self, _p: Vec3) -> bool {
        false
    }

    pub(super) fn intersects(&self, _v0: Vec3, _v1: Vec3) -> Option<Intersection> {
        None
    }

    pub(super) fn generate_position(&self, _full: bool, rng: &mut dyn RngCore) -> Vec3 {
        self.t_p0.lerp(self.t_p1, random_between(rng, 0.0, 1.0))
    }

    pub(super) fn move_at_border(&self, p: Vec3, _inside: bool) -> Vec3 {
        p
    }

    pub(super) fn compute_normal(&self, p: Vec3, rng: &mut dyn RngCore) -> Vec3 {
        let d = self.t_p1 - self.t_p0;
        let sqr_len = d.length_squared();
        let closest = if sqr_len == 0.0 {
            self.t_p0
        } else {
            let t = ((p - self.t_p0).dot(d) / sqr_len).clamp(0.0, 1.0);
            self.t_p0 + d * t
        };
        normalize_or_randomize(p - closest, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn positions_lie_on_the_segment() {
        let mut rng = StdRng::seed_from_u64(5);
        let line = Line::new(Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0));
        for _ in 0..50 {
            let p = line.generate_position(true, &mut rng);
            assert_eq!(p.y, 0.0);
            assert!((0.0..=4.0).contains(&p.x));
        }
    }

    #[test]
    fn normal_is_perpendicular_to_segment() {
        let mut rng = StdRng::seed_from_u64(5);
        let line = Line::new(Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(line.compute_normal(Vec3::new(2.0, 0.0, 3.0), &mut rng), Vec3::Z);
    }
}
