//! Trigger-gated effects applied to particles during their update.
//!
//! A [`Modifier`] pairs a [`ModifierEffect`] (what happens to a particle)
//! with an optional zone and a [`Trigger`] (when it happens). Each frame the
//! group hands every alive particle to every active modifier, which tests
//! the trigger against the particle's previous and current positions and
//! calls the effect accordingly:
//!
//! | trigger        | `modify` when                         | otherwise                       |
//! |----------------|---------------------------------------|---------------------------------|
//! | `Always`       | always                                |                                 |
//! | `InsideZone`   | no zone, or zone contains position    | `modify_wrong_side(inside)`     |
//! | `OutsideZone`  | zone does not contain position        | `modify_wrong_side(outside)`    |
//! | `IntersectZone`| segment crosses the zone border       |                                 |
//! | `EnterZone`    | old position outside, segment crosses | `modify_wrong_side(inside)` if old position inside |
//! | `ExitZone`     | old position inside, segment crosses  | `modify_wrong_side(outside)` if old position outside |
//!
//! Zone-gated triggers other than `InsideZone` do nothing without a zone.

mod collision;
mod destroyer;
mod linear_force;
mod modifier_group;
mod obstacle;
mod point_mass;
mod rotator;
mod vortex;

pub use collision::Collision;
pub use destroyer::Destroyer;
pub use linear_force::{ForceFactor, LinearForce};
pub use modifier_group::ModifierGroup;
pub use obstacle::Obstacle;
pub use point_mass::PointMass;
pub use rotator::Rotator;
pub use vortex::Vortex;

use std::any::Any;
use std::fmt::Debug;

use bitflags::bitflags;
use glam::{Affine3A, Vec3};
use rand::RngCore;

use crate::buffer::BufferHandler;
use crate::error::{Result, SimError};
use crate::handle::{Handle, HandleRef};
use crate::particle::Particle;
use crate::pool::ParticlePool;
use crate::transform::Transform;
use crate::zone::Zone;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Trigger {
    Always,
    InsideZone,
    OutsideZone,
    IntersectZone,
    EnterZone,
    ExitZone,
}

impl Trigger {
    pub const fn mask(self) -> TriggerMask {
        match self {
            Trigger::Always => TriggerMask::ALWAYS,
            Trigger::InsideZone => TriggerMask::INSIDE_ZONE,
            Trigger::OutsideZone => TriggerMask::OUTSIDE_ZONE,
            Trigger::IntersectZone => TriggerMask::INTERSECT_ZONE,
            Trigger::EnterZone => TriggerMask::ENTER_ZONE,
            Trigger::ExitZone => TriggerMask::EXIT_ZONE,
        }
    }

    /// Triggers that detect a border crossing and provide an intersection.
    pub const fn is_crossing(self) -> bool {
        matches!(
            self,
            Trigger::IntersectZone | Trigger::EnterZone | Trigger::ExitZone
        )
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TriggerMask: u32 {
        const ALWAYS = 1 << 0;
        const INSIDE_ZONE = 1 << 1;
        const OUTSIDE_ZONE = 1 << 2;
        const INTERSECT_ZONE = 1 << 3;
        const ENTER_ZONE = 1 << 4;
        const EXIT_ZONE = 1 << 5;

        const CROSSING = Self::INTERSECT_ZONE.bits()
            | Self::ENTER_ZONE.bits()
            | Self::EXIT_ZONE.bits();
    }
}

/// Per-call data handed to an effect.
pub struct ModifyContext<'a> {
    /// Zone of the modifier (or of the enclosing global modifier group).
    pub zone: Option<&'a Zone>,
    pub trigger: Trigger,
    pub full_zone: bool,
    /// Border crossing point, for crossing triggers when the effect asks
    /// for it.
    pub intersection: Vec3,
    /// Border normal at the crossing (or at the particle position for
    /// containment triggers), when the effect asks for it.
    pub normal: Vec3,
    pub rng: &'a mut dyn RngCore,
}

/// Object-safe helpers implemented for every cloneable effect.
pub trait EffectBase {
    fn clone_box(&self) -> Box<dyn ModifierEffect>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: ModifierEffect + Clone + 'static> EffectBase for T {
    fn clone_box(&self) -> Box<dyn ModifierEffect> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub trait ModifierEffect: BufferHandler + EffectBase + Debug {
    fn modify(&mut self, particle: &mut Particle<'_>, ctx: &mut ModifyContext<'_>, dt: f32);

    /// Called when a particle is found on the side of the zone the trigger
    /// does not act on. `inside` is `true` for the inside-type triggers
    /// (`InsideZone`, `EnterZone`).
    fn modify_wrong_side(
        &mut self,
        _particle: &mut Particle<'_>,
        _inside: bool,
        _ctx: &mut ModifyContext<'_>,
    ) {
    }

    fn available_triggers(&self) -> TriggerMask;

    fn default_trigger(&self) -> Trigger;

    fn needs_intersection(&self) -> bool {
        false
    }

    fn needs_normal(&self) -> bool {
        false
    }

    /// Refreshes transformed geometry owned by the effect.
    fn update_transform(&mut self, _world: &Affine3A) {}
}

impl Clone for Box<dyn ModifierEffect> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[derive(Clone, Debug)]
pub struct Modifier {
    effect: Box<dyn ModifierEffect>,
    zone: Option<Handle<Zone>>,
    trigger: Trigger,
    pub full_zone: bool,
    pub active: bool,
    saved_active: bool,
    /// Whether the modifier follows the transform of its group.
    pub local_to_system: bool,
    transform: Transform,
}

impl Modifier {
    pub fn new(effect: impl ModifierEffect + 'static) -> Self {
        Self::from_box(Box::new(effect))
    }

    pub fn from_box(effect: Box<dyn ModifierEffect>) -> Self {
        let trigger = effect.default_trigger();
        Self {
            effect,
            zone: None,
            trigger,
            full_zone: false,
            active: true,
            saved_active: true,
            local_to_system: true,
            transform: Transform::default(),
        }
    }

    pub fn with_zone(mut self, zone: Handle<Zone>, full: bool) -> Self {
        self.set_zone(Some(zone), full);
        self
    }

    /// Builder form of [`Modifier::set_trigger`].
    pub fn with_trigger(mut self, trigger: Trigger) -> Result<Self> {
        self.set_trigger(trigger)?;
        Ok(self)
    }

    pub fn set_zone(&mut self, zone: Option<Handle<Zone>>, full: bool) {
        self.zone = zone;
        self.full_zone = full;
    }

    pub fn zone(&self) -> Option<HandleRef<'_, Zone>> {
        self.zone.as_ref().map(Handle::borrow)
    }

    pub fn zone_handle(&self) -> Option<&Handle<Zone>> {
        self.zone.as_ref()
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    /// Changes the trigger. The trigger is left unchanged if the effect
    /// does not support the requested one.
    pub fn set_trigger(&mut self, trigger: Trigger) -> Result<()> {
        let available = self.effect.available_triggers();
        if !available.contains(trigger.mask()) {
            return Err(SimError::UnavailableTrigger {
                requested: trigger,
                available,
            });
        }
        self.trigger = trigger;
        Ok(())
    }

    pub fn available_triggers(&self) -> TriggerMask {
        self.effect.available_triggers()
    }

    pub fn needs_intersection(&self) -> bool {
        self.effect.needs_intersection()
    }

    pub fn needs_normal(&self) -> bool {
        self.effect.needs_normal()
    }

    pub fn effect(&self) -> &dyn ModifierEffect {
        self.effect.as_ref()
    }

    pub fn effect_mut(&mut self) -> &mut dyn ModifierEffect {
        self.effect.as_mut()
    }

    /// Typed access to the effect.
    pub fn effect_as<T: 'static>(&self) -> Option<&T> {
        self.effect.as_any().downcast_ref()
    }

    pub fn effect_as_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.effect.as_any_mut().downcast_mut()
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn set_local_transform(&mut self, local: Affine3A) {
        self.transform.local = local;
    }

    pub fn update_transform(&mut self, parent: &Affine3A) {
        self.transform.update(parent);
        let world = *self.transform.world();
        if let Some(zone) = &mut self.zone {
            zone.borrow_mut().update_transform(&world);
        }
        self.effect.update_transform(&world);
    }

    /// Saves the active flag and deactivates the modifier for this frame if
    /// its buffers cannot be made ready.
    pub fn begin_process(&mut self, pool: &mut ParticlePool, buffer_management: bool) {
        self.saved_active = self.active;
        if self.active && !self.effect.prepare_buffers(pool, buffer_management) {
            self.active = false;
        }
    }

    /// Restores the active flag saved by [`Modifier::begin_process`].
    pub fn end_process(&mut self) {
        self.active = self.saved_active;
    }

    pub fn create_buffers(&mut self, pool: &mut ParticlePool) {
        self.effect.create_buffers(pool);
    }

    pub fn destroy_buffers(&mut self, pool: &mut ParticlePool) {
        self.effect.destroy_buffers(pool);
    }

    pub fn check_buffers(&self, pool: &ParticlePool) -> bool {
        self.effect.check_buffers(pool)
    }

    /// Tests the trigger for a particle and applies the effect.
    pub fn process(&mut self, particle: &mut Particle<'_>, dt: f32, rng: &mut dyn RngCore) {
        let zone_guard = self.zone.as_ref().map(Handle::borrow);
        let mut ctx = ModifyContext {
            zone: zone_guard.as_deref(),
            trigger: self.trigger,
            full_zone: self.full_zone,
            intersection: Vec3::ZERO,
            normal: Vec3::ZERO,
            rng,
        };
        dispatch(self.effect.as_mut(), particle, &mut ctx, dt);
    }

    /// Applies the effect unconditionally with a context built by an
    /// enclosing modifier group.
    pub fn apply(&mut self, particle: &mut Particle<'_>, ctx: &mut ModifyContext<'_>, dt: f32) {
        self.effect.modify(particle, ctx, dt);
    }

    pub fn apply_wrong_side(
        &mut self,
        particle: &mut Particle<'_>,
        inside: bool,
        ctx: &mut ModifyContext<'_>,
    ) {
        self.effect.modify_wrong_side(particle, inside, ctx);
    }
}

fn dispatch(
    effect: &mut dyn ModifierEffect,
    particle: &mut Particle<'_>,
    ctx: &mut ModifyContext<'_>,
    dt: f32,
) {
    let position = particle.position();
    let old_position = particle.old_position();

    match ctx.trigger {
        Trigger::Always => effect.modify(particle, ctx, dt),

        Trigger::InsideZone => match ctx.zone {
            None => effect.modify(particle, ctx, dt),
            Some(zone) if zone.contains(position) => {
                if effect.needs_normal() {
                    ctx.normal = zone.compute_normal(position, ctx.rng);
                }
                effect.modify(particle, ctx, dt);
            }
            Some(_) => effect.modify_wrong_side(particle, true, ctx),
        },

        Trigger::OutsideZone => match ctx.zone {
            None => {}
            Some(zone) if !zone.contains(position) => {
                if effect.needs_normal() {
                    ctx.normal = zone.compute_normal(position, ctx.rng);
                }
                effect.modify(particle, ctx, dt);
            }
            Some(_) => effect.modify_wrong_side(particle, false, ctx),
        },

        Trigger::IntersectZone => {
            if let Some(zone) = ctx.zone
                && let Some(hit) = zone.intersects(old_position, position)
            {
                ctx.intersection = hit.point;
                ctx.normal = hit.normal;
                effect.modify(particle, ctx, dt);
            }
        }

        Trigger::EnterZone | Trigger::ExitZone => {
            let Some(zone) = ctx.zone else {
                return;
            };
            let entering = ctx.trigger == Trigger::EnterZone;
            if zone.contains(old_position) == entering {
                effect.modify_wrong_side(particle, entering, ctx);
            } else if let Some(hit) = zone.intersects(old_position, position) {
                ctx.intersection = hit.point;
                ctx.normal = hit.normal;
                effect.modify(particle, ctx, dt);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::model::Model;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use test_case::test_case;

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Call {
        Modify,
        WrongSide(bool),
    }

    /// Records the calls it receives.
    #[derive(Clone, Debug, Default)]
    struct Recorder {
        calls: Rc<RefCell<Vec<Call>>>,
    }

    impl BufferHandler for Recorder {}

    impl ModifierEffect for Recorder {
        fn modify(&mut self, _p: &mut Particle<'_>, _ctx: &mut ModifyContext<'_>, _dt: f32) {
            self.calls.borrow_mut().push(Call::Modify);
        }

        fn modify_wrong_side(&mut self, _p: &mut Particle<'_>, inside: bool, _ctx: &mut ModifyContext<'_>) {
            self.calls.borrow_mut().push(Call::WrongSide(inside));
        }

        fn available_triggers(&self) -> TriggerMask {
            TriggerMask::all()
        }

        fn default_trigger(&self) -> Trigger {
            Trigger::Always
        }
    }

    const IN: Vec3 = Vec3::ZERO;
    const OUT: Vec3 = Vec3::new(5.0, 0.0, 0.0);

    fn run(trigger: Trigger, with_zone: bool, old: Vec3, new: Vec3) -> Vec<Call> {
        let recorder = Recorder::default();
        let calls = Rc::clone(&recorder.calls);
        let mut modifier = Modifier::new(recorder);
        modifier.set_trigger(trigger).unwrap();
        if with_zone {
            modifier.set_zone(Some(Handle::owned(Zone::sphere(Vec3::ZERO, 1.0))), false);
        }

        let mut rng = StdRng::seed_from_u64(0);
        let mut pool = ParticlePool::new(Rc::new(Model::default()), 1);
        let index = pool.activate().unwrap();
        let mut p = Particle::new(&mut pool, index);
        p.set_old_position(old);
        p.set_position(new);
        modifier.process(&mut p, 0.1, &mut rng);

        calls.take()
    }

    #[test_case(Trigger::Always, true, OUT, OUT => vec![Call::Modify] ; "always")]
    #[test_case(Trigger::InsideZone, true, IN, IN => vec![Call::Modify] ; "inside, inside")]
    #[test_case(Trigger::InsideZone, true, IN, OUT => vec![Call::WrongSide(true)] ; "inside, outside")]
    #[test_case(Trigger::InsideZone, false, OUT, OUT => vec![Call::Modify] ; "inside, no zone")]
    #[test_case(Trigger::OutsideZone, true, IN, OUT => vec![Call::Modify] ; "outside, outside")]
    #[test_case(Trigger::OutsideZone, true, OUT, IN => vec![Call::WrongSide(false)] ; "outside, inside")]
    #[test_case(Trigger::OutsideZone, false, OUT, OUT => Vec::<Call>::new() ; "outside, no zone")]
    #[test_case(Trigger::IntersectZone, true, OUT, IN => vec![Call::Modify] ; "intersect, crossing")]
    #[test_case(Trigger::IntersectZone, true, OUT, OUT => Vec::<Call>::new() ; "intersect, no crossing")]
    #[test_case(Trigger::IntersectZone, false, OUT, IN => Vec::<Call>::new() ; "intersect, no zone")]
    #[test_case(Trigger::EnterZone, true, OUT, IN => vec![Call::Modify] ; "enter, entering")]
    #[test_case(Trigger::EnterZone, true, IN, OUT => vec![Call::WrongSide(true)] ; "enter, already inside")]
    #[test_case(Trigger::EnterZone, true, OUT, OUT => Vec::<Call>::new() ; "enter, staying outside")]
    #[test_case(Trigger::ExitZone, true, IN, OUT => vec![Call::Modify] ; "exit, exiting")]
    #[test_case(Trigger::ExitZone, true, OUT, IN => vec![Call::WrongSide(false)] ; "exit, already outside")]
    #[test_case(Trigger::ExitZone, true, IN, IN => Vec::<Call>::new() ; "exit, staying inside")]
    #[test_case(Trigger::ExitZone, false, IN, OUT => Vec::<Call>::new() ; "exit, no zone")]
    fn trigger_dispatch(trigger: Trigger, with_zone: bool, old: Vec3, new: Vec3) -> Vec<Call> {
        run(trigger, with_zone, old, new)
    }

    #[test]
    fn unavailable_trigger_is_rejected_and_kept() {
        let mut modifier = Modifier::new(Obstacle::default());
        assert_eq!(modifier.trigger(), Trigger::IntersectZone);

        let err = modifier.set_trigger(Trigger::Always).unwrap_err();
        assert_eq!(
            err,
            SimError::UnavailableTrigger {
                requested: Trigger::Always,
                available: TriggerMask::CROSSING,
            }
        );
        assert_eq!(modifier.trigger(), Trigger::IntersectZone);
        assert!(modifier.set_trigger(Trigger::ExitZone).is_ok());
    }

    #[test]
    fn effect_downcast() {
        let mut modifier = Modifier::new(Obstacle::default());
        assert!(modifier.effect_as::<Destroyer>().is_none());
        if let Some(obstacle) = modifier.effect_as_mut::<Obstacle>() {
            obstacle.bouncing_ratio = 0.5;
        }
        assert_eq!(modifier.effect_as::<Obstacle>().map(|o| o.bouncing_ratio), Some(0.5));
    }

    #[test]
    fn cloned_modifier_owns_a_copy_of_its_effect() {
        let mut a = Modifier::new(Obstacle::default());
        let b = a.clone();
        if let Some(obstacle) = a.effect_as_mut::<Obstacle>() {
            obstacle.friction = 0.0;
        }
        assert_eq!(b.effect_as::<Obstacle>().map(|o| o.friction), Some(1.0));
    }
}
