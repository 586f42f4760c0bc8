use std::f32::consts::TAU;

use glam::Vec3;
use rand::RngCore;

use super::Intersection;
use crate::math::{face_toward, normalize_or_randomize, random_between};
use crate::transform::Transform;
use crate::types::APPROXIMATION_VALUE;

/// Closed cylinder centered on `position`, extending `length / 2` on both
/// sides along `direction`.
#[derive(Clone, Debug)]
pub struct Cylinder {
    pub position: Vec3,
    pub direction: Vec3,
    pub radius: f32,
    pub length: f32,
    t_position: Vec3,
    t_direction: Vec3,
}

/// A point expressed relative to the cylinder axis.
struct AxisCoords {
    height: f32,
    radial: Vec3,
}

impl Cylinder {
    pub fn new(position: Vec3, direction: Vec3, radius: f32, length: f32) -> Self {
        let direction = direction.try_normalize().unwrap_or(Vec3::Y);
        Self {
            position,
            direction,
            radius: radius.abs(),
            length: length.abs(),
            t_position: position,
            t_direction: direction,
        }
    }

    pub(super) fn refresh(&mut self, t: &Transform) {
        self.t_position = t.transform_pos(self.position);
        self.t_direction = t
            .transform_dir(self.direction)
            .try_normalize()
            .unwrap_or(Vec3::Y);
    }

    pub(super) fn transformed_position(&self) -> Vec3 {
        self.t_position
    }

    fn coords(&self, p: Vec3) -> AxisCoords {
        let rel = p - self.t_position;
        let height = rel.dot(self.t_direction);
        AxisCoords {
            height,
            radial: rel - self.t_direction * height,
        }
    }

    pub(super) fn contains(&self, p: Vec3) -> bool {
        let c = self.coords(p);
        c.height.abs() <= self.length * 0.5
            && c.radial.length_squared() <= self.radius * self.radius
    }

    pub(super) fn intersects(&self, v0: Vec3, v1: Vec3) -> Option<Intersection> {
        let half = self.length * 0.5;
        let r2 = self.radius * self.radius;
        let delta = v1 - v0;
        let start = self.coords(v0);
        let h_delta = delta.dot(self.t_direction);
        let r_delta = delta - self.t_direction * h_delta;

        let mut best: Option<(f32, Vec3)> = None;
        let mut consider = |t: f32, normal: Vec3| {
            if (0.0..=1.0).contains(&t) && best.is_none_or(|(bt, _)| t < bt) {
                best = Some((t, normal));
            }
        };

        // Lateral surface: |radial(t)|² = r².
        let a = r_delta.length_squared();
        if a > f32::EPSILON {
            let b = 2.0 * start.radial.dot(r_delta);
            let c = start.radial.length_squared() - r2;
            let disc = b * b - 4.0 * a * c;
            if disc >= 0.0 {
                let s = disc.sqrt();
                for t in [(-b - s) / (2.0 * a), (-b + s) / (2.0 * a)] {
                    let height = start.height + h_delta * t;
                    if height.abs() <= half {
                        let radial = start.radial + r_delta * t;
                        consider(t, radial.try_normalize().unwrap_or(Vec3::ZERO));
                    }
                }
            }
        }

        // Caps.
        if h_delta != 0.0 {
            for side in [-1.0f32, 1.0] {
                let t = (side * half - start.height) / h_delta;
                let radial = start.radial + r_delta * t;
                if radial.length_squared() <= r2 {
                    consider(t, self.t_direction * side);
                }
            }
        }

        let (t, normal) = best?;
        let point = v0 + delta * t;
        let normal = if normal == Vec3::ZERO { -delta.normalize() } else { normal };
        Some(Intersection::nudged(point, face_toward(normal, v0 - point)))
    }

    pub(super) fn generate_position(&self, full: bool, rng: &mut dyn RngCore) -> Vec3 {
        let half = self.length * 0.5;
        let (u, v) = self.t_direction.any_orthonormal_pair();
        let angle = random_between(rng, 0.0, TAU);
        let around = u * angle.cos() + v * angle.sin();

        let (height, radius) = if full {
            (
                random_between(rng, -half, half),
                self.radius * random_between(rng, 0.0, 1.0).sqrt(),
            )
        } else {
            // Pick the lateral surface or a cap in proportion to their areas.
            let lateral_share = if self.length + self.radius > 0.0 {
                self.length / (self.length + self.radius)
            } else {
                1.0
            };
            if random_between(rng, 0.0, 1.0) < lateral_share {
                (random_between(rng, -half, half), self.radius)
            } else {
                let side = if random_between(rng, 0.0, 1.0) < 0.5 { -half } else { half };
                (side, self.radius * random_between(rng, 0.0, 1.0).sqrt())
            }
        };

        self.t_position + self.t_direction * height + around * radius
    }

    pub(super) fn move_at_border(&self, p: Vec3, inside: bool) -> Vec3 {
        let half = self.length * 0.5;
        let c = self.coords(p);
        let radial_len = c.radial.length();
        let radial_dir = c
            .radial
            .try_normalize()
            .unwrap_or_else(|| self.t_direction.any_orthonormal_vector());

        let (height, radial_len) = if inside {
            if self.radius - radial_len <= half - c.height.abs() {
                (c.height, self.radius + APPROXIMATION_VALUE)
            } else {
                (c.height.signum() * (half + APPROXIMATION_VALUE), radial_len)
            }
        } else {
            let inner_half = (half - APPROXIMATION_VALUE).max(0.0);
            let inner_radius = (self.radius - APPROXIMATION_VALUE).max(0.0);
            (
                c.height.clamp(-inner_half, inner_half),
                radial_len.min(inner_radius),
            )
        };

        self.t_position + self.t_direction * height + radial_dir * radial_len
    }

    pub(super) fn compute_normal(&self, p: Vec3, rng: &mut dyn RngCore) -> Vec3 {
        let c = self.coords(p);
        let cap_gap = self.length * 0.5 - c.height.abs();
        let side_gap = self.radius - c.radial.length();
        if cap_gap < side_gap {
            self.t_direction * c.height.signum()
        } else {
            normalize_or_randomize(c.radial, rng)
        }
    }
}
