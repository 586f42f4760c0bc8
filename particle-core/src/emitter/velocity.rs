use std::f32::consts::{PI, TAU};

use glam::Vec3;
use rand::RngCore;

use crate::handle::Handle;
use crate::math::{random_between, random_unit_vector};
use crate::transform::Transform;
use crate::zone::Zone;

/// How an emitter picks the direction of a new particle.
///
/// The speed is chosen by the emitter; strategies only return a unit
/// direction (or nothing for [`VelocityStrategy::Static`]).
#[derive(Clone, Debug, Default)]
pub enum VelocityStrategy {
    /// Uniformly distributed direction.
    #[default]
    Random,
    /// Always `direction`, in the emitter's local frame.
    Straight { direction: Vec3 },
    /// Direction inside the cone band between `angle_a` and `angle_b`
    /// (radians, from `direction`). `angle_a == 0` gives a full cone.
    Spheric {
        direction: Vec3,
        angle_a: f32,
        angle_b: f32,
    },
    /// Normal of a zone at the spawn position. Uses the emitter's own zone
    /// when `normal_zone` is `None`; `inverted` flips it.
    Normal {
        normal_zone: Option<Handle<Zone>>,
        inverted: bool,
    },
    /// Particles are born still.
    Static,
}

impl VelocityStrategy {
    pub fn straight(direction: Vec3) -> Self {
        VelocityStrategy::Straight { direction }
    }

    /// Angles are swapped if needed and clamped to `[0, PI]`.
    pub fn spheric(direction: Vec3, angle_a: f32, angle_b: f32) -> Self {
        let (a, b) = if angle_a <= angle_b {
            (angle_a, angle_b)
        } else {
            (angle_b, angle_a)
        };
        VelocityStrategy::Spheric {
            direction,
            angle_a: a.clamp(0.0, PI),
            angle_b: b.clamp(0.0, PI),
        }
    }

    pub fn normal(inverted: bool) -> Self {
        VelocityStrategy::Normal {
            normal_zone: None,
            inverted,
        }
    }

    /// Unit direction for a particle born at `position`, or `None` for a
    /// still particle.
    pub(super) fn direction(
        &self,
        position: Vec3,
        emitter_zone: &Zone,
        transform: &Transform,
        rng: &mut dyn RngCore,
    ) -> Option<Vec3> {
        match self {
            VelocityStrategy::Random => Some(random_unit_vector(rng)),
            VelocityStrategy::Straight { direction } => {
                Some(transform.transform_dir(*direction).normalize_or_zero())
            }
            VelocityStrategy::Spheric {
                direction,
                angle_a,
                angle_b,
            } => {
                let axis = transform
                    .transform_dir(*direction)
                    .try_normalize()
                    .unwrap_or(Vec3::Y);
                let cos_theta = random_between(rng, angle_a.cos(), angle_b.cos());
                let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
                let phi = random_between(rng, 0.0, TAU);
                let (u, v) = axis.any_orthonormal_pair();
                Some(axis * cos_theta + (u * phi.cos() + v * phi.sin()) * sin_theta)
            }
            VelocityStrategy::Normal {
                normal_zone,
                inverted,
            } => {
                let normal = match normal_zone {
                    Some(zone) => zone.borrow().compute_normal(position, rng),
                    None => emitter_zone.compute_normal(position, rng),
                };
                Some(if *inverted { -normal } else { normal })
            }
            VelocityStrategy::Static => None,
        }
    }

    pub(super) fn update_transform(&mut self, world: &glam::Affine3A) {
        if let VelocityStrategy::Normal {
            normal_zone: Some(zone),
            ..
        } = self
        {
            zone.borrow_mut().update_transform(world);
        }
    }
}
