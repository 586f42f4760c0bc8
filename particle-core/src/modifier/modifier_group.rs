use glam::Affine3A;
use log::warn;

use super::{Modifier, ModifierEffect, ModifyContext, Trigger, TriggerMask};
use crate::buffer::BufferHandler;
use crate::handle::{Handle, HandleMut};
use crate::particle::Particle;
use crate::pool::ParticlePool;

/// A modifier made of other modifiers.
///
/// In partition mode (the default) the group's own trigger acts as a cheap
/// first test, and each child then runs its own trigger. In global mode the
/// children are applied unconditionally whenever the group triggers, with
/// the group's zone and crossing data.
///
/// A shared child that is already borrowed when the group runs, typically
/// because it is also registered directly on the same [`Group`](crate::group::Group),
/// is skipped for that call.
#[derive(Clone, Debug, Default)]
pub struct ModifierGroup {
    children: Vec<Handle<Modifier>>,
    pub global: bool,
    /// In global mode, forwards wrong-side calls to the children.
    pub handle_wrong_side: bool,
    warned_busy: bool,
}

impl ModifierGroup {
    pub fn new(global: bool) -> Self {
        Self {
            global,
            ..Self::default()
        }
    }

    pub fn add_modifier(&mut self, modifier: Handle<Modifier>) {
        self.children.push(modifier);
    }

    /// Removes a child. Buffers created for it on a pool are left alone.
    pub fn remove_modifier(&mut self, index: usize) -> Option<Handle<Modifier>> {
        (index < self.children.len()).then(|| self.children.remove(index))
    }

    pub fn modifiers(&self) -> &[Handle<Modifier>] {
        &self.children
    }

    pub fn clear(&mut self) {
        self.children.clear();
    }

    /// Children that can be borrowed right now.
    fn available(&mut self) -> impl Iterator<Item = HandleMut<'_, Modifier>> {
        let ModifierGroup {
            children,
            warned_busy,
            ..
        } = self;
        children.iter_mut().filter_map(move |child| {
            let borrowed = child.try_borrow_mut();
            if borrowed.is_none() && !*warned_busy {
                warn!("Modifier group skips a shared child already in use");
                *warned_busy = true;
            }
            borrowed
        })
    }
}

impl BufferHandler for ModifierGroup {
    fn create_buffers(&mut self, pool: &mut ParticlePool) {
        for mut child in self.available() {
            child.create_buffers(pool);
        }
    }

    fn destroy_buffers(&mut self, pool: &mut ParticlePool) {
        for mut child in self.available() {
            child.destroy_buffers(pool);
        }
    }

    fn check_buffers(&self, pool: &ParticlePool) -> bool {
        // A busy child is checked by whoever holds it.
        self.children
            .iter()
            .all(|c| c.try_borrow().is_none_or(|c| c.check_buffers(pool)))
    }
}

impl ModifierEffect for ModifierGroup {
    fn modify(&mut self, particle: &mut Particle<'_>, ctx: &mut ModifyContext<'_>, dt: f32) {
        if self.global {
            for mut child in self.available() {
                child.apply(particle, ctx, dt);
            }
        } else {
            for mut child in self.available() {
                if child.active {
                    child.process(particle, dt, &mut *ctx.rng);
                }
            }
        }
    }

    fn modify_wrong_side(&mut self, particle: &mut Particle<'_>, inside: bool, ctx: &mut ModifyContext<'_>) {
        if !(self.global && self.handle_wrong_side) {
            return;
        }
        for mut child in self.available() {
            child.apply_wrong_side(particle, inside, ctx);
        }
    }

    fn available_triggers(&self) -> TriggerMask {
        TriggerMask::all()
    }

    fn default_trigger(&self) -> Trigger {
        Trigger::InsideZone
    }

    fn needs_intersection(&self) -> bool {
        self.global
            && self
                .children
                .iter()
                .any(|c| c.try_borrow().is_some_and(|c| c.needs_intersection()))
    }

    fn needs_normal(&self) -> bool {
        self.global
            && self
                .children
                .iter()
                .any(|c| c.try_borrow().is_some_and(|c| c.needs_normal()))
    }

    fn update_transform(&mut self, world: &Affine3A) {
        for mut child in self.available() {
            if child.local_to_system {
                child.update_transform(world);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use glam::Vec3;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::model::Model;
    use crate::modifier::{Destroyer, LinearForce, Obstacle};
    use crate::zone::Zone;

    fn unit_sphere() -> Handle<Zone> {
        Handle::owned(Zone::sphere(Vec3::ZERO, 1.0))
    }

    fn run(group: ModifierGroup, zone: Handle<Zone>, at: Vec3) -> (Vec3, bool) {
        let mut modifier = Modifier::new(group).with_zone(zone, false);
        let mut rng = StdRng::seed_from_u64(0);
        let mut pool = ParticlePool::new(Rc::new(Model::default()), 1);
        let index = pool.activate().unwrap();
        pool.data_mut(index).life = 1.0;

        let mut p = Particle::new(&mut pool, index);
        p.set_old_position(at);
        p.set_position(at);
        modifier.process(&mut p, 1.0, &mut rng);
        (p.velocity(), p.is_dead())
    }

    #[test]
    fn partition_mode_runs_child_triggers() {
        let mut group = ModifierGroup::new(false);
        group.add_modifier(Handle::owned(Modifier::new(LinearForce::new(Vec3::X))));
        group.add_modifier(Handle::owned(
            Modifier::new(Destroyer).with_zone(Handle::owned(Zone::sphere(Vec3::ZERO, 0.1)), true),
        ));

        // Inside the group zone but outside the destroyer's.
        let (velocity, dead) = run(group.clone(), unit_sphere(), Vec3::new(0.5, 0.0, 0.0));
        assert_eq!(velocity, Vec3::X);
        assert!(!dead);

        // Outside the group zone nothing runs.
        let (velocity, _) = run(group, unit_sphere(), Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(velocity, Vec3::ZERO);
    }

    #[test]
    fn global_mode_applies_children_with_the_group_zone() {
        let mut group = ModifierGroup::new(true);
        // The child has no zone of its own and would never trigger alone.
        group.add_modifier(Handle::owned(
            Modifier::new(Destroyer).with_trigger(Trigger::OutsideZone).unwrap(),
        ));

        let (_, dead) = run(group, unit_sphere(), Vec3::new(0.5, 0.0, 0.0));
        assert!(dead);
    }

    #[test]
    fn needs_flags_propagate_only_in_global_mode() {
        let mut group = ModifierGroup::new(false);
        group.add_modifier(Handle::owned(Modifier::new(Obstacle::default())));
        assert!(!group.needs_normal());
        group.global = true;
        assert!(group.needs_normal());
        assert!(group.needs_intersection());
    }

    #[test]
    fn removing_out_of_range_child_is_a_no_op() {
        let mut group = ModifierGroup::default();
        group.add_modifier(Handle::owned(Modifier::new(Destroyer)));
        assert!(group.remove_modifier(3).is_none());
        assert!(group.remove_modifier(0).is_some());
        assert!(group.modifiers().is_empty());
    }

    #[test]
    fn busy_shared_child_is_skipped() {
        let shared = Handle::shared(Modifier::new(LinearForce::new(Vec3::X)));
        let mut group = ModifierGroup::new(false);
        group.add_modifier(shared.clone());
        group.add_modifier(Handle::owned(Modifier::new(LinearForce::new(Vec3::Y))));

        let mut holder = shared.clone();
        let _running = holder.borrow_mut();
        let (velocity, _) = run(group, unit_sphere(), Vec3::new(0.5, 0.0, 0.0));
        assert_eq!(velocity, Vec3::Y);
    }

    #[test]
    fn busy_shared_child_does_not_report_needs() {
        let shared = Handle::shared(Modifier::new(Obstacle::default()));
        let mut group = ModifierGroup::new(true);
        group.add_modifier(shared.clone());

        let mut holder = shared.clone();
        let guard = holder.borrow_mut();
        assert!(!group.needs_normal());
        drop(guard);
        assert!(group.needs_normal());
    }
}
