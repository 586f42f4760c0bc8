use super::{ModifierEffect, ModifyContext, Trigger, TriggerMask};
use crate::buffer::BufferHandler;
use crate::particle::Particle;

/// Makes particles bounce on the border of the zone.
///
/// At the crossing point the velocity is split into its normal and
/// tangential parts. The normal part is reversed and scaled by
/// `bouncing_ratio`, the tangential part is scaled by `friction`.
#[derive(Clone, Copy, Debug)]
pub struct Obstacle {
    pub bouncing_ratio: f32,
    pub friction: f32,
}

impl Default for Obstacle {
    fn default() -> Self {
        Obstacle::new(1.0, 1.0)
    }
}

impl Obstacle {
    pub fn new(bouncing_ratio: f32, friction: f32) -> Self {
        Self {
            bouncing_ratio,
            friction,
        }
    }
}

impl BufferHandler for Obstacle {}

impl ModifierEffect for Obstacle {
    fn modify(&mut self, particle: &mut Particle<'_>, ctx: &mut ModifyContext<'_>, dt: f32) {
        // Velocity actually travelled this step, modifiers included.
        let mut velocity = particle.position() - particle.old_position();
        if dt > 0.0 {
            velocity /= dt;
        }

        let normal_part = ctx.normal * velocity.dot(ctx.normal);
        let tangent = (velocity - normal_part) * self.friction;
        particle.set_velocity(tangent - normal_part * self.bouncing_ratio);
        particle.set_position(ctx.intersection);
    }

    /// With a full zone, particles found on the forbidden side are put back
    /// just across the border.
    fn modify_wrong_side(&mut self, particle: &mut Particle<'_>, inside: bool, ctx: &mut ModifyContext<'_>) {
        if !ctx.full_zone {
            return;
        }
        if let Some(zone) = ctx.zone {
            let position = zone.move_at_border(particle.position(), inside);
            particle.set_position(position);
        }
    }

    fn available_triggers(&self) -> TriggerMask {
        TriggerMask::CROSSING
    }

    fn default_trigger(&self) -> Trigger {
        Trigger::IntersectZone
    }

    fn needs_intersection(&self) -> bool {
        true
    }

    fn needs_normal(&self) -> bool {
        true
    }
}
