//! The simulation container.
//!
//! A [`Group`] owns the particle pool of one model together with the
//! emitters, modifiers and renderer working on it. [`Group::update`] runs one
//! frame:
//! 1. emitters turn their flow into a number of births;
//! 2. modifiers get their buffers ready for the frame;
//! 3. every alive particle is integrated and handed to the active modifiers;
//!    a dying particle's slot is reused at once for a pending birth, or
//!    freed by moving the last alive particle into it;
//! 4. births left over are launched in free slots, as long as there are;
//! 5. particles are sorted back to front and the bounding box is closed.
//!
//! Requests made through the `add_particles` family are queued and launched
//! before automatic emission on the next update.

use std::rc::Rc;

use glam::{Affine3A, Vec3};
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::buffer::Buffer;
use crate::config::Config;
use crate::creation::{CreationQueue, CreationRequest};
use crate::emitter::Emitter;
use crate::handle::{Handle, HandleMut, HandleRef};
use crate::model::{Model, ModelParam};
use crate::modifier::Modifier;
use crate::particle::{Particle, Physics};
use crate::pool::{ParticleData, ParticlePool};
use crate::renderer::Renderer;
use crate::transform::Transform;
use crate::types::SlotIndex;
use crate::zone::Zone;

/// Called after a particle's own update. Returning `true` kills it.
pub type UpdateCallback = Box<dyn FnMut(&mut Particle<'_>, f32) -> bool>;

/// Called on birth or on death of a particle.
pub type ParticleCallback = Box<dyn FnMut(&mut Particle<'_>)>;

/// Axis-aligned bounds of the alive particles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(-f32::MAX),
    };

    const ZERO: Aabb = Aabb {
        min: Vec3::ZERO,
        max: Vec3::ZERO,
    };

    fn include(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }
}

pub struct Group {
    pool: ParticlePool,
    emitters: Vec<Handle<Emitter>>,
    modifiers: Vec<Handle<Modifier>>,
    renderer: Option<Handle<dyn Renderer>>,
    creation: CreationQueue,

    physics: Physics,
    sorting: bool,
    distance_computation: bool,
    aabb_computation: bool,
    buffer_management: bool,
    aabb: Aabb,
    camera_position: Vec3,

    on_update: Option<UpdateCallback>,
    on_birth: Option<ParticleCallback>,
    on_death: Option<ParticleCallback>,

    transform: Transform,
    rng: StdRng,
}

impl Group {
    /// Creates an empty group.
    ///
    /// ### Parameters
    /// - `model` - Parameter layout and life time of the particles. Several
    ///   groups may share one model.
    /// - `config` - Capacity, physics and per-frame options. Without a seed
    ///   the random generator is seeded from the OS.
    pub fn new(model: Rc<Model>, config: Config) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        debug!(
            "Creating group: capacity {}, {} params per particle",
            config.capacity,
            model.current_stride()
        );
        Self {
            pool: ParticlePool::new(model, config.capacity),
            emitters: Vec::new(),
            modifiers: Vec::new(),
            renderer: None,
            creation: CreationQueue::default(),
            physics: Physics {
                gravity: config.gravity,
                friction: config.friction,
            },
            sorting: config.sorting,
            distance_computation: config.distance_computation || config.sorting,
            aabb_computation: config.aabb_computation,
            buffer_management: config.buffer_management,
            aabb: Aabb::ZERO,
            camera_position: Vec3::ZERO,
            on_update: None,
            on_birth: None,
            on_death: None,
            transform: Transform::default(),
            rng,
        }
    }

    // ---- state -------------------------------------------------------

    pub fn model(&self) -> &Rc<Model> {
        self.pool.model()
    }

    /// Number of alive particles.
    pub fn nb_particles(&self) -> usize {
        self.pool.nb_active()
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// Particles requested through the `add_particles` family and not
    /// launched yet.
    pub fn nb_buffered_particles(&self) -> u32 {
        self.creation.total()
    }

    pub fn pool(&self) -> &ParticlePool {
        &self.pool
    }

    /// Direct access to the slots. Alive particles must stay in
    /// `0..nb_particles`.
    pub fn pool_mut(&mut self) -> &mut ParticlePool {
        &mut self.pool
    }

    /// View on an alive particle, `None` past the alive ones.
    pub fn particle(&mut self, index: SlotIndex) -> Option<Particle<'_>> {
        (index < self.pool.nb_active()).then(|| Particle::new(&mut self.pool, index))
    }

    /// Fixed data of the alive particles, in slot order.
    pub fn particle_data(&self) -> &[ParticleData] {
        self.pool.particle_data()
    }

    /// Current parameters of the alive particles, see
    /// [`Group::param_stride`].
    pub fn current_params(&self) -> &[f32] {
        self.pool.current_params()
    }

    pub fn param_stride(&self) -> usize {
        self.pool.param_stride()
    }

    /// Offset of `param` in each particle's stride of
    /// [`Group::current_params`], `None` if the model does not enable it.
    pub fn param_offset(&self, param: ModelParam) -> Option<usize> {
        self.pool.param_offset(param)
    }

    pub fn gravity(&self) -> Vec3 {
        self.physics.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.physics.gravity = gravity;
    }

    pub fn friction(&self) -> f32 {
        self.physics.friction
    }

    pub fn set_friction(&mut self, friction: f32) {
        self.physics.friction = friction;
    }

    /// Sorting needs distances, so enabling it enables distance
    /// computation too.
    pub fn enable_sorting(&mut self, sorting: bool) {
        self.sorting = sorting;
        self.distance_computation |= sorting;
    }

    pub fn is_sorting_enabled(&self) -> bool {
        self.sorting
    }

    /// Disabling distance computation disables sorting too.
    pub fn enable_distance_computation(&mut self, enabled: bool) {
        self.distance_computation = enabled;
        self.sorting &= enabled;
    }

    pub fn is_distance_computation_enabled(&self) -> bool {
        self.distance_computation
    }

    /// Bounds are computed during [`Group::update`]; while disabled they
    /// read as zero.
    pub fn enable_aabb_computation(&mut self, enabled: bool) {
        self.aabb_computation = enabled;
    }

    pub fn is_aabb_computation_enabled(&self) -> bool {
        self.aabb_computation
    }

    pub fn aabb_min(&self) -> Vec3 {
        self.aabb.min
    }

    pub fn aabb_max(&self) -> Vec3 {
        self.aabb.max
    }

    pub fn camera_position(&self) -> Vec3 {
        self.camera_position
    }

    /// Point the distances used for sorting are measured from.
    pub fn set_camera_position(&mut self, position: Vec3) {
        self.camera_position = position;
    }

    /// When on, the group creates and destroys the buffers of its modifiers
    /// and renderer as they are added and removed. When off, the owners have
    /// to create them and are skipped while their buffers are missing.
    pub fn set_buffer_management(&mut self, enabled: bool) {
        self.buffer_management = enabled;
    }

    pub fn is_buffer_management_enabled(&self) -> bool {
        self.buffer_management
    }

    /// Installs a callback run on every alive particle after its modifiers.
    /// `None` removes it.
    pub fn set_update_callback(&mut self, callback: Option<UpdateCallback>) {
        self.on_update = callback;
    }

    pub fn set_birth_callback(&mut self, callback: Option<ParticleCallback>) {
        self.on_birth = callback;
    }

    pub fn set_death_callback(&mut self, callback: Option<ParticleCallback>) {
        self.on_death = callback;
    }

    // ---- composition -------------------------------------------------

    pub fn emitters(&self) -> &[Handle<Emitter>] {
        &self.emitters
    }

    /// Mutable access to a registered emitter.
    ///
    /// ### Panics
    /// Panics if a shared emitter is borrowed elsewhere.
    pub fn emitter_mut(&mut self, index: usize) -> Option<HandleMut<'_, Emitter>> {
        self.emitters.get_mut(index).map(Handle::borrow_mut)
    }

    /// Adds an emitter. A shared emitter already in the group is not added
    /// twice.
    pub fn add_emitter(&mut self, emitter: Handle<Emitter>) -> bool {
        if self.emitters.iter().any(|e| e.same_object(&emitter)) {
            return false;
        }
        debug!("Adding emitter #{} (shared: {})", self.emitters.len(), emitter.is_shared());
        self.emitters.push(emitter);
        true
    }

    /// Unregisters the emitter at `index` and hands it back.
    pub fn remove_emitter(&mut self, index: usize) -> Option<Handle<Emitter>> {
        if index >= self.emitters.len() {
            return None;
        }
        debug!("Removing emitter #{index}");
        Some(self.emitters.remove(index))
    }

    pub fn modifiers(&self) -> &[Handle<Modifier>] {
        &self.modifiers
    }

    pub fn modifier_mut(&mut self, index: usize) -> Option<HandleMut<'_, Modifier>> {
        self.modifiers.get_mut(index).map(Handle::borrow_mut)
    }

    /// Adds a modifier, creating its buffers when buffer management is on.
    /// A shared modifier already in the group is not added twice.
    pub fn add_modifier(&mut self, mut modifier: Handle<Modifier>) -> bool {
        if self.modifiers.iter().any(|m| m.same_object(&modifier)) {
            return false;
        }
        if self.buffer_management {
            modifier.borrow_mut().create_buffers(&mut self.pool);
        }
        debug!("Adding modifier #{} (shared: {})", self.modifiers.len(), modifier.is_shared());
        self.modifiers.push(modifier);
        true
    }

    /// Removes a modifier, destroying its buffers when buffer management is
    /// on.
    pub fn remove_modifier(&mut self, index: usize) -> Option<Handle<Modifier>> {
        if index >= self.modifiers.len() {
            return None;
        }
        let mut modifier = self.modifiers.remove(index);
        if self.buffer_management {
            modifier.borrow_mut().destroy_buffers(&mut self.pool);
        }
        debug!("Removing modifier #{index}");
        Some(modifier)
    }

    pub fn renderer(&self) -> Option<HandleRef<'_, dyn Renderer>> {
        self.renderer.as_ref().map(Handle::borrow)
    }

    /// Replaces the renderer, moving buffer ownership from the old one to
    /// the new one when buffer management is on.
    pub fn set_renderer(&mut self, renderer: Option<Handle<dyn Renderer>>) {
        if self.buffer_management
            && let Some(old) = &mut self.renderer
        {
            old.borrow_mut().destroy_buffers(&mut self.pool);
        }
        self.renderer = renderer;
        if self.buffer_management
            && let Some(new) = &mut self.renderer
        {
            new.borrow_mut().create_buffers(&mut self.pool);
        }
    }

    /// Hands the group to its renderer, if it has an active one whose
    /// buffers are ready.
    pub fn render(&mut self) {
        let Some(mut renderer) = self.renderer.take() else {
            return;
        };
        {
            let mut r = renderer.borrow_mut();
            if r.is_active() && r.prepare_buffers(&mut self.pool, self.buffer_management) {
                r.render(self);
            }
        }
        self.renderer = Some(renderer);
    }

    /// See [`ParticlePool::create_buffer`].
    pub fn create_buffer(&mut self, name: &str, buffer: Box<dyn Buffer>, flag: u32, swap_enabled: bool) {
        self.pool.create_buffer(name, buffer, flag, swap_enabled);
    }

    pub fn destroy_buffer(&mut self, name: &str) -> bool {
        self.pool.destroy_buffer(name)
    }

    pub fn destroy_all_buffers(&mut self) {
        self.pool.destroy_all_buffers();
    }

    /// Buffer `name`, if it exists with the given flag.
    pub fn buffer(&self, name: &str, flag: u32) -> Option<&dyn Buffer> {
        self.pool.buffer(name, flag)
    }

    pub fn buffer_mut(&mut self, name: &str, flag: u32) -> Option<&mut dyn Buffer> {
        self.pool.buffer_mut(name, flag)
    }

    // ---- simulation --------------------------------------------------

    /// Runs one frame of `dt` seconds.
    ///
    /// Returns `true` while the group still has something to simulate:
    /// an emitter that is not sleeping, or alive particles.
    pub fn update(&mut self, dt: f32) -> bool {
        let Group {
            pool,
            emitters,
            modifiers,
            creation,
            physics,
            sorting,
            distance_computation,
            aabb_computation,
            buffer_management,
            aabb,
            camera_position,
            rng,
            on_update,
            on_birth,
            on_death,
            ..
        } = self;

        let mut births = Vec::new();
        let mut nb_auto = 0u32;
        let mut awake = false;
        for (k, emitter) in emitters.iter_mut().enumerate() {
            let mut emitter = emitter.borrow_mut();
            if emitter.active {
                let nb = emitter.update_number(dt);
                if nb > 0 {
                    births.push((k, nb));
                    nb_auto = nb_auto.saturating_add(nb);
                }
            }
            awake |= !emitter.is_sleeping();
        }
        let nb_manual = creation.total();
        let mut nb_born = nb_auto.saturating_add(nb_manual);

        if *aabb_computation {
            *aabb = Aabb::EMPTY;
        }

        for modifier in modifiers.iter_mut() {
            modifier.borrow_mut().begin_process(pool, *buffer_management);
        }
        let mut active: Vec<HandleMut<'_, Modifier>> = modifiers
            .iter_mut()
            .map(Handle::borrow_mut)
            .filter(|m| m.active)
            .collect();

        let mut launcher = Launcher {
            emitters,
            creation,
            on_birth,
            aabb: aabb_computation.then_some(&mut *aabb),
            camera: distance_computation.then_some(*camera_position),
            births,
            cursor: 0,
            nb_manual,
        };

        let (mut nb_dead, mut nb_reused) = (0u32, 0u32);
        let mut i = 0;
        while i < pool.nb_active() {
            let mut p = Particle::new(pool, i);
            let mut dead = p.update(dt, physics, active.as_mut_slice(), rng);
            if !dead && let Some(callback) = on_update.as_mut() {
                dead = callback(&mut p, dt);
            }

            if !dead {
                launcher.track(&mut p);
                i += 1;
                continue;
            }

            nb_dead += 1;
            if let Some(callback) = on_death.as_mut() {
                callback(&mut p);
            }
            if nb_born > 0 {
                launcher.launch(pool, i, rng);
                nb_born -= 1;
                nb_reused += 1;
                i += 1;
            } else {
                pool.data_mut(i).sqr_dist = 0.0;
                pool.make_inactive(i);
            }
        }

        drop(active);
        for modifier in modifiers.iter_mut() {
            modifier.borrow_mut().end_process();
        }

        let mut nb_dropped = 0u32;
        while nb_born > 0 {
            match pool.activate() {
                Some(index) => launcher.launch(pool, index, rng),
                None if launcher.nb_manual > 0 => {
                    launcher.pop_manual();
                    nb_dropped += 1;
                }
                None => {
                    nb_dropped += nb_born;
                    break;
                }
            }
            nb_born -= 1;
        }

        if *sorting && pool.nb_active() > 1 {
            let last = pool.nb_active() as isize - 1;
            sort_range(pool, 0, last);
        }

        if !*aabb_computation || pool.nb_active() == 0 {
            *aabb = Aabb::ZERO;
        }

        trace!(
            "Group update: {} alive, {} dead ({} slots reused), {} born auto, {} born manual, {} dropped",
            pool.nb_active(),
            nb_dead,
            nb_reused,
            nb_auto,
            nb_manual,
            nb_dropped
        );

        awake || pool.nb_active() > 0
    }

    /// Discards every particle and every pending request.
    pub fn empty(&mut self) {
        self.pool.make_all_inactive();
        self.creation.clear();
    }

    /// Launches the queued requests now instead of on the next update.
    /// Requests that do not fit in the pool are discarded.
    pub fn flush_added_particles(&mut self) {
        let nb_manual = self.creation.total();
        let mut launcher = Launcher {
            emitters: &self.emitters,
            creation: &mut self.creation,
            on_birth: &mut self.on_birth,
            aabb: self.aabb_computation.then_some(&mut self.aabb),
            camera: self.distance_computation.then_some(self.camera_position),
            births: Vec::new(),
            cursor: 0,
            nb_manual,
        };
        while launcher.nb_manual > 0 {
            match self.pool.activate() {
                Some(index) => launcher.launch(&mut self.pool, index, &mut self.rng),
                None => launcher.pop_manual(),
            }
        }
    }

    /// Removes a particle at once. The last alive particle takes its slot.
    pub fn remove_particle(&mut self, index: SlotIndex) {
        if index < self.pool.nb_active() {
            self.pool.data_mut(index).sqr_dist = 0.0;
            self.pool.make_inactive(index);
        }
    }

    /// Refreshes distances and sorts the particles back to front.
    pub fn sort_particles(&mut self) {
        self.compute_distances();
        if self.sorting && self.pool.nb_active() > 1 {
            let last = self.pool.nb_active() as isize - 1;
            sort_range(&mut self.pool, 0, last);
        }
    }

    /// Refreshes the camera distance of every alive particle, when distance
    /// computation is on.
    pub fn compute_distances(&mut self) {
        if !self.distance_computation {
            return;
        }
        for i in 0..self.pool.nb_active() {
            Particle::new(&mut self.pool, i).compute_sqr_dist(self.camera_position);
        }
    }

    /// Recomputes the bounds outside of [`Group::update`].
    pub fn compute_aabb(&mut self) {
        if !self.aabb_computation || self.pool.nb_active() == 0 {
            self.aabb = Aabb::ZERO;
            return;
        }
        self.aabb = Aabb::EMPTY;
        for data in self.pool.particle_data() {
            self.aabb.include(data.position);
        }
    }

    /// Grows the pool. Buffers are dropped and recreated on demand.
    pub fn reallocate(&mut self, capacity: usize) {
        self.pool.reallocate(capacity);
    }

    /// Switches to another model, discarding every particle.
    pub fn set_model(&mut self, model: Rc<Model>) {
        self.empty();
        self.pool.set_model(model);
    }

    // ---- particle requests -------------------------------------------

    fn queue(
        &mut self,
        count: u32,
        position: Vec3,
        velocity: Vec3,
        zone: Option<Handle<Zone>>,
        emitter: Option<Handle<Emitter>>,
        full: bool,
    ) {
        self.creation.push(CreationRequest {
            count,
            position,
            velocity,
            zone,
            emitter,
            full,
        });
    }

    /// Requests `count` particles at `position` moving at `velocity`.
    pub fn add_particles(&mut self, count: u32, position: Vec3, velocity: Vec3) {
        self.queue(count, position, velocity, None, None, false);
    }

    /// Requests particles spread in a zone.
    ///
    /// ### Parameters
    /// - `count` - Number of particles.
    /// - `zone` - Where to place them. A shared zone is read when the
    ///   particles are launched, not when they are requested.
    /// - `emitter` - Gives the velocities; without one the particles are
    ///   still.
    /// - `full` - Place them in the whole volume rather than on the border.
    pub fn add_particles_in_zone(
        &mut self,
        count: u32,
        zone: &Handle<Zone>,
        emitter: Option<&Handle<Emitter>>,
        full: bool,
    ) {
        self.queue(count, Vec3::ZERO, Vec3::ZERO, Some(zone.clone()), emitter.cloned(), full);
    }

    /// Requests `count` particles at `position`, with velocities from
    /// `emitter`.
    pub fn add_particles_at(&mut self, count: u32, position: Vec3, emitter: &Handle<Emitter>) {
        self.queue(count, position, Vec3::ZERO, None, Some(emitter.clone()), false);
    }

    /// Requests `count` particles emitted by `emitter` from its own zone.
    pub fn add_particles_from(&mut self, count: u32, emitter: &Handle<Emitter>) {
        let (zone, full) = {
            let e = emitter.borrow();
            (e.zone_handle().clone(), e.full_zone)
        };
        self.queue(count, Vec3::ZERO, Vec3::ZERO, Some(zone), Some(emitter.clone()), full);
    }

    /// Like [`Group::add_particles_from`], with the count given by the
    /// emitter's flow over `dt`.
    ///
    /// ### Parameters
    /// - `emitter` - Emitter driving the request. Its tank and flow
    ///   remainder advance as if it had run for `dt`, so it should not also
    ///   be registered on the group.
    /// - `dt` - Time step the flow is integrated over.
    pub fn emit_particles(&mut self, emitter: &mut Handle<Emitter>, dt: f32) {
        let count = emitter.borrow_mut().update_number(dt);
        self.add_particles_from(count, emitter);
    }

    /// Like [`Group::add_particles_in_zone`], with the count given by the
    /// emitter's flow over `dt`.
    ///
    /// ### Parameters
    /// - `zone` - Where to place the particles instead of the emitter's zone.
    /// - `emitter` - Gives the count and the velocities.
    /// - `dt` - Time step the flow is integrated over.
    /// - `full` - Place them in the whole volume rather than on the border.
    pub fn emit_particles_in_zone(
        &mut self,
        zone: &Handle<Zone>,
        emitter: &mut Handle<Emitter>,
        dt: f32,
        full: bool,
    ) {
        let count = emitter.borrow_mut().update_number(dt);
        self.add_particles_in_zone(count, zone, Some(emitter), full);
    }

    /// Like [`Group::add_particles_at`], with the count given by the
    /// emitter's flow over `dt`.
    pub fn emit_particles_at(&mut self, position: Vec3, emitter: &mut Handle<Emitter>, dt: f32) {
        let count = emitter.borrow_mut().update_number(dt);
        self.add_particles_at(count, position, emitter);
    }

    /// Requests one particle every `step` along a segment, with velocities
    /// from `emitter`.
    ///
    /// ### Parameters
    /// - `start`, `end` - The segment.
    /// - `emitter` - Gives the velocities.
    /// - `step` - Distance between two particles.
    /// - `offset` - Distance from `start` to the first particle, usually
    ///   the value returned for the previous segment.
    ///
    /// Returns the offset to pass for the next segment of a continuous
    /// path, or 0 when `step` is not positive or `offset` is negative.
    pub fn add_particles_along(
        &mut self,
        start: Vec3,
        end: Vec3,
        emitter: &Handle<Emitter>,
        step: f32,
        offset: f32,
    ) -> f32 {
        self.sweep(start, end, step, offset, |group, position| {
            group.add_particles_at(1, position, emitter);
        })
    }

    /// Same as [`Group::add_particles_along`] with a fixed velocity.
    pub fn add_particles_along_with_velocity(
        &mut self,
        start: Vec3,
        end: Vec3,
        velocity: Vec3,
        step: f32,
        offset: f32,
    ) -> f32 {
        self.sweep(start, end, step, offset, |group, position| {
            group.add_particles(1, position, velocity);
        })
    }

    fn sweep(
        &mut self,
        start: Vec3,
        end: Vec3,
        step: f32,
        mut offset: f32,
        mut add: impl FnMut(&mut Self, Vec3),
    ) -> f32 {
        if step <= 0.0 || offset < 0.0 {
            return 0.0;
        }
        let displacement = end - start;
        let total = displacement.length();
        while offset < total {
            add(self, start + displacement * (offset / total));
            offset += step;
        }
        offset - total
    }

    // ---- transforms --------------------------------------------------

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Sets the group transform relative to its parent. Applied on the next
    /// [`Group::update_transform`].
    pub fn set_local_transform(&mut self, local: Affine3A) {
        self.transform.local = local;
    }

    /// Propagates the parent transform to the group, its emitters and its
    /// modifiers. Modifiers that are not local to the group stay in world
    /// space.
    pub fn update_transform(&mut self, parent: &Affine3A) {
        self.transform.update(parent);
        let world = *self.transform.world();
        for emitter in &mut self.emitters {
            emitter.borrow_mut().update_transform(&world);
        }
        for modifier in &mut self.modifiers {
            let mut modifier = modifier.borrow_mut();
            if modifier.local_to_system {
                modifier.update_transform(&world);
            } else {
                modifier.update_transform(&Affine3A::IDENTITY);
            }
        }
    }
}

/// Births of one frame and the bookkeeping shared by every launched
/// particle.
struct Launcher<'a> {
    emitters: &'a [Handle<Emitter>],
    creation: &'a mut CreationQueue,
    on_birth: &'a mut Option<ParticleCallback>,
    aabb: Option<&'a mut Aabb>,
    camera: Option<Vec3>,
    /// Emitter index and number of particles it still has to emit.
    births: Vec<(usize, u32)>,
    cursor: usize,
    nb_manual: u32,
}

impl Launcher<'_> {
    /// Initializes `index` as a newborn. Queued requests go first, then
    /// emitter births in emitter order.
    fn launch(&mut self, pool: &mut ParticlePool, index: SlotIndex, rng: &mut dyn RngCore) {
        pool.init_particle(index, rng);
        let mut p = Particle::new(pool, index);

        if self.nb_manual > 0 {
            if let Some(request) = self.creation.front() {
                let position = match &request.zone {
                    Some(zone) => zone.borrow().generate_position(request.full, rng),
                    None => request.position,
                };
                p.set_position(position);
                match &request.emitter {
                    Some(emitter) => emitter.borrow().generate_velocity(&mut p, rng),
                    None => p.set_velocity(request.velocity),
                }
            }
            self.pop_manual();
        } else if let Some((emitter, remaining)) = self.births.get_mut(self.cursor) {
            self.emitters[*emitter].borrow().emit(&mut p, rng);
            *remaining -= 1;
            if *remaining == 0 {
                self.cursor += 1;
            }
        }

        let position = p.position();
        p.set_old_position(position);
        p.interpolate_parameters();
        if let Some(callback) = self.on_birth.as_mut() {
            callback(&mut p);
        }
        self.track(&mut p);
    }

    fn pop_manual(&mut self) {
        self.creation.pop_one();
        self.nb_manual = self.nb_manual.saturating_sub(1);
    }

    /// Folds an alive particle into the bounding box and refreshes its
    /// camera distance.
    fn track(&mut self, p: &mut Particle<'_>) {
        if let Some(aabb) = self.aabb.as_deref_mut() {
            aabb.include(p.position());
        }
        if let Some(camera) = self.camera {
            p.compute_sqr_dist(camera);
        }
    }
}

/// Quicksort of the slots `start..=end` by decreasing camera distance.
fn sort_range(pool: &mut ParticlePool, start: isize, end: isize) {
    if start >= end {
        return;
    }
    let dist = |pool: &ParticlePool, k: isize| pool.data(k as usize).sqr_dist;
    let pivot = dist(pool, start + (end - start) / 2);
    let (mut i, mut j) = (start, end);
    while i <= j {
        while dist(pool, i) > pivot {
            i += 1;
        }
        while dist(pool, j) < pivot {
            j -= 1;
        }
        if i <= j {
            pool.swap_particles(i as usize, j as usize);
            i += 1;
            j -= 1;
        }
    }
    if start < j {
        sort_range(pool, start, j);
    }
    if i < end {
        sort_range(pool, i, end);
    }
}
