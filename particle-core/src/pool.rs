//! Slot storage for the particles of one group.
//!
//! The pool keeps three parallel arrays sized to its capacity: the fixed
//! [`ParticleData`], and the model's *current* and *extended* float arrays.
//! Slots `0..nb_active` are alive; the rest is free space. Removing a
//! particle swaps the last alive slot into its place, so the alive prefix
//! stays contiguous and is handed to renderers as is.

use std::collections::HashMap;
use std::rc::Rc;

use glam::Vec3;
use log::debug;
use rand::RngCore;

use crate::buffer::{Buffer, BufferEntry};
use crate::interpolator::InterpolationSource;
use crate::math::random_between;
use crate::model::{Model, ModelParam};
use crate::types::SlotIndex;

/// Fixed per-particle state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ParticleData {
    pub position: Vec3,
    pub old_position: Vec3,
    pub velocity: Vec3,
    /// Seconds since birth.
    pub age: f32,
    /// Remaining seconds to live.
    pub life: f32,
    /// Squared distance to the camera, when distance computation is on.
    pub sqr_dist: f32,
}

#[derive(Debug)]
pub struct ParticlePool {
    model: Rc<Model>,
    capacity: usize,
    nb_active: usize,
    data: Vec<ParticleData>,
    current: Vec<f32>,
    extended: Vec<f32>,
    buffers: HashMap<String, BufferEntry>,
}

impl ParticlePool {
    /// Creates an empty pool with room for `capacity` particles of `model`.
    pub fn new(model: Rc<Model>, capacity: usize) -> Self {
        let current = vec![0.0; capacity * model.current_stride()];
        let extended = vec![0.0; capacity * model.extended_stride()];
        Self {
            model,
            capacity,
            nb_active: 0,
            data: vec![ParticleData::default(); capacity],
            current,
            extended,
            buffers: HashMap::new(),
        }
    }

    pub fn model(&self) -> &Rc<Model> {
        &self.model
    }

    /// Number of slots, alive or free.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of alive particles, which occupy slots `0..nb_active`.
    pub fn nb_active(&self) -> usize {
        self.nb_active
    }

    pub fn is_full(&self) -> bool {
        self.nb_active >= self.capacity
    }

    /// Fixed data of the alive particles.
    pub fn particle_data(&self) -> &[ParticleData] {
        &self.data[..self.nb_active]
    }

    #[inline]
    pub fn data(&self, index: SlotIndex) -> &ParticleData {
        &self.data[index]
    }

    #[inline]
    pub fn data_mut(&mut self, index: SlotIndex) -> &mut ParticleData {
        &mut self.data[index]
    }

    /// Current parameter values of the alive particles, packed with
    /// [`ParticlePool::param_stride`] floats per particle.
    pub fn current_params(&self) -> &[f32] {
        &self.current[..self.nb_active * self.model.current_stride()]
    }

    /// Floats per particle in [`ParticlePool::current_params`].
    pub fn param_stride(&self) -> usize {
        self.model.current_stride()
    }

    /// Offset of a parameter inside each particle's stride.
    pub fn param_offset(&self, param: ModelParam) -> Option<usize> {
        self.model.current_offset(param)
    }

    /// Current parameter values of one slot.
    pub fn current(&self, index: SlotIndex) -> &[f32] {
        let stride = self.model.current_stride();
        &self.current[index * stride..(index + 1) * stride]
    }

    /// Extended values of one slot: end values of the mutable parameters,
    /// then three floats per interpolated parameter.
    pub fn extended(&self, index: SlotIndex) -> &[f32] {
        let stride = self.model.extended_stride();
        &self.extended[index * stride..(index + 1) * stride]
    }

    /// Current value of a parameter.
    ///
    /// ### Parameters
    /// - `index` - Slot of the particle; must be below the capacity.
    /// - `param` - Parameter to read. Parameters the model does not enable
    ///   read as [`ModelParam::default_value`].
    pub fn param_current(&self, index: SlotIndex, param: ModelParam) -> f32 {
        match self.model.current_offset(param) {
            Some(k) => self.current[index * self.model.current_stride() + k],
            None => param.default_value(),
        }
    }

    /// Sets the current value of a parameter.
    ///
    /// ### Parameters
    /// - `index` - Slot of the particle; must be below the capacity.
    /// - `param` - Parameter to write.
    /// - `value` - New value. Nothing clamps it to the model's range.
    ///
    /// Returns `false` when the model does not enable `param`.
    pub fn set_param_current(&mut self, index: SlotIndex, param: ModelParam, value: f32) -> bool {
        match self.model.current_offset(param) {
            Some(k) => {
                self.current[index * self.model.current_stride() + k] = value;
                true
            }
            None => false,
        }
    }

    /// Adds `delta` to the current value of a parameter.
    ///
    /// Returns `false` when the model does not enable `param`.
    pub fn change_param_current(&mut self, index: SlotIndex, param: ModelParam, delta: f32) -> bool {
        match self.model.current_offset(param) {
            Some(k) => {
                self.current[index * self.model.current_stride() + k] += delta;
                true
            }
            None => false,
        }
    }

    /// End value of a mutable parameter, or its current value otherwise.
    pub fn param_final(&self, index: SlotIndex, param: ModelParam) -> f32 {
        match self.model.mutable_offset(param) {
            Some(m) => self.extended[index * self.model.extended_stride() + m],
            None => self.param_current(index, param),
        }
    }

    /// Sets the end value of a mutable parameter. For a parameter that is
    /// enabled but not mutable, the current value is set instead.
    ///
    /// ### Parameters
    /// - `index` - Slot of the particle; must be below the capacity.
    /// - `param` - Parameter to write.
    /// - `value` - New end value.
    ///
    /// Returns `false` when the model does not enable `param`.
    pub fn set_param_final(&mut self, index: SlotIndex, param: ModelParam, value: f32) -> bool {
        match self.model.mutable_offset(param) {
            Some(m) => {
                self.extended[index * self.model.extended_stride() + m] = value;
                true
            }
            None => self.set_param_current(index, param, value),
        }
    }

    /// Adds `delta` to the end value of a mutable parameter, falling back on
    /// the current value like [`ParticlePool::set_param_final`].
    pub fn change_param_final(&mut self, index: SlotIndex, param: ModelParam, delta: f32) -> bool {
        match self.model.mutable_offset(param) {
            Some(m) => {
                self.extended[index * self.model.extended_stride() + m] += delta;
                true
            }
            None => self.change_param_current(index, param, delta),
        }
    }

    /// Gives a slot a fresh life and birth parameters.
    ///
    /// Position and velocity are left to the caller.
    pub fn init_particle(&mut self, index: SlotIndex, rng: &mut dyn RngCore) {
        let model = &self.model;
        let data = &mut self.data[index];
        data.age = 0.0;
        data.life = random_between(rng, model.life_time_min(), model.life_time_max());
        data.sqr_dist = 0.0;

        let cs = model.current_stride();
        let es = model.extended_stride();
        model.init_params(
            &mut self.current[index * cs..(index + 1) * cs],
            &mut self.extended[index * es..(index + 1) * es],
            rng,
        );
    }

    /// Recomputes every interpolated parameter of a slot.
    pub fn interpolate_parameters(&mut self, index: SlotIndex) {
        let model = &self.model;
        let cs = model.current_stride();
        let es = model.extended_stride();
        let data = &self.data[index];

        for &param in model.interpolated_params() {
            let (Some(interpolator), Some(k), Some(base)) = (
                model.interpolator(param),
                model.current_offset(param),
                model.interpolated_offset(param),
            ) else {
                continue;
            };

            let x = match interpolator.source {
                InterpolationSource::LifeRatio => {
                    let total = data.age + data.life;
                    if total > 0.0 { data.age / total } else { 0.0 }
                }
                InterpolationSource::Age => data.age,
                InterpolationSource::SquaredSpeed => data.velocity.length_squared(),
                InterpolationSource::Param(source) => match model.current_offset(source) {
                    Some(s) => self.current[index * cs + s],
                    None => source.default_value(),
                },
            };

            let ext = &self.extended[index * es + base..index * es + base + 3];
            if let Some(y) = interpolator.interpolate(x, ext[0], ext[1], ext[2]) {
                self.current[index * cs + k] = y;
            }
        }
    }

    /// Blends the mutable parameters of a slot toward their end values.
    pub(crate) fn blend_mutable(&mut self, index: SlotIndex, ratio: f32) {
        let model = &self.model;
        let cs = model.current_stride();
        let es = model.extended_stride();
        model.blend_mutable(
            &mut self.current[index * cs..(index + 1) * cs],
            &self.extended[index * es..(index + 1) * es],
            ratio,
        );
    }

    /// Exchanges two slots in every array and in the swap-enabled buffers.
    pub fn swap_particles(&mut self, a: SlotIndex, b: SlotIndex) {
        if a == b {
            return;
        }
        self.data.swap(a, b);
        swap_strided(&mut self.current, self.model.current_stride(), a, b);
        swap_strided(&mut self.extended, self.model.extended_stride(), a, b);
        for entry in self.buffers.values_mut().filter(|e| e.swap_enabled) {
            entry.buffer.swap(a, b);
        }
    }

    /// Claims the first free slot, if any. The slot content is stale until
    /// the caller initializes it.
    pub fn activate(&mut self) -> Option<SlotIndex> {
        if self.is_full() {
            return None;
        }
        let index = self.nb_active;
        self.nb_active += 1;
        Some(index)
    }

    /// Frees a slot by moving the last alive particle into it.
    pub fn make_inactive(&mut self, index: SlotIndex) {
        if index >= self.nb_active {
            return;
        }
        self.nb_active -= 1;
        self.swap_particles(index, self.nb_active);
    }

    /// Frees every slot at once.
    pub fn make_all_inactive(&mut self) {
        for data in &mut self.data[..self.nb_active] {
            data.sqr_dist = 0.0;
        }
        self.nb_active = 0;
    }

    /// Grows the arrays, keeping the alive particles. Buffers are dropped.
    ///
    /// Returns `false` if `capacity` is not larger than the current one.
    pub fn reallocate(&mut self, capacity: usize) -> bool {
        if capacity <= self.capacity {
            return false;
        }
        debug!("Reallocating particle pool: {} -> {}", self.capacity, capacity);
        self.data.resize(capacity, ParticleData::default());
        self.current.resize(capacity * self.model.current_stride(), 0.0);
        self.extended.resize(capacity * self.model.extended_stride(), 0.0);
        self.capacity = capacity;
        self.destroy_all_buffers();
        true
    }

    /// Replaces the model. Every particle is discarded and buffers are dropped.
    pub fn set_model(&mut self, model: Rc<Model>) {
        debug!(
            "Changing model: current stride {} -> {}, extended stride {} -> {}",
            self.model.current_stride(),
            model.current_stride(),
            self.model.extended_stride(),
            model.extended_stride()
        );
        self.nb_active = 0;
        self.current = vec![0.0; self.capacity * model.current_stride()];
        self.extended = vec![0.0; self.capacity * model.extended_stride()];
        self.model = model;
        self.destroy_all_buffers();
    }

    /// Attaches a per-particle buffer, replacing any buffer of the same name.
    ///
    /// ### Parameters
    /// - `name` - Key the buffer is looked up by.
    /// - `buffer` - Storage indexed like the pool slots.
    /// - `flag` - Tag the owner checks on lookup, so a buffer created with
    ///   another layout under the same name is not mistaken for its own.
    /// - `swap_enabled` - Whether the buffer follows its particles when slots
    ///   are swapped (on removal and when sorting).
    pub fn create_buffer(&mut self, name: &str, buffer: Box<dyn Buffer>, flag: u32, swap_enabled: bool) {
        debug!("Creating buffer {name:?} (flag {flag}, swap {swap_enabled})");
        self.buffers.insert(
            name.to_owned(),
            BufferEntry {
                buffer,
                flag,
                swap_enabled,
            },
        );
    }

    /// Detaches a buffer. Returns `false` if there was none with that name.
    pub fn destroy_buffer(&mut self, name: &str) -> bool {
        let removed = self.buffers.remove(name).is_some();
        if removed {
            debug!("Destroying buffer {name:?}");
        }
        removed
    }

    /// Detaches every buffer.
    pub fn destroy_all_buffers(&mut self) {
        if !self.buffers.is_empty() {
            debug!("Destroying {} buffers", self.buffers.len());
        }
        self.buffers.clear();
    }

    /// Looks a buffer up by name, requiring a matching flag.
    pub fn buffer(&self, name: &str, flag: u32) -> Option<&dyn Buffer> {
        self.buffers
            .get(name)
            .filter(|e| e.flag == flag)
            .map(|e| e.buffer.as_ref())
    }

    /// Mutable form of [`ParticlePool::buffer`].
    pub fn buffer_mut(&mut self, name: &str, flag: u32) -> Option<&mut dyn Buffer> {
        self.buffers
            .get_mut(name)
            .filter(|e| e.flag == flag)
            .map(|e| -> &mut dyn Buffer { e.buffer.as_mut() })
    }

    /// Looks a buffer up by name, whatever its flag.
    pub fn buffer_any_flag(&self, name: &str) -> Option<&dyn Buffer> {
        self.buffers.get(name).map(|e| e.buffer.as_ref())
    }

    pub fn buffer_names(&self) -> impl Iterator<Item = &str> {
        self.buffers.keys().map(String::as_str)
    }
}

fn swap_strided(values: &mut [f32], stride: usize, a: SlotIndex, b: SlotIndex) {
    for k in 0..stride {
        values.swap(a * stride + k, b * stride + k);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SlotBuffer;
    use crate::interpolator::Interpolator;
    use crate::model::ModelFlags;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sized_model() -> Rc<Model> {
        let mut model = Model::new(
            ModelFlags::SIZE | ModelFlags::ALPHA,
            ModelFlags::ALPHA,
            ModelFlags::empty(),
            ModelFlags::empty(),
        );
        model.set_param(ModelParam::Alpha, &[1.0, 0.0]).unwrap();
        model.set_life_time(2.0, 2.0);
        Rc::new(model)
    }

    fn filled_pool(n: usize) -> ParticlePool {
        let mut rng = StdRng::seed_from_u64(0);
        let mut pool = ParticlePool::new(sized_model(), 8);
        for i in 0..n {
            let index = pool.activate().unwrap();
            pool.init_particle(index, &mut rng);
            pool.data_mut(index).position = Vec3::splat(i as f32);
            pool.set_param_current(index, ModelParam::Size, i as f32);
        }
        pool
    }

    #[test]
    fn activation_stops_at_capacity() {
        let mut pool = ParticlePool::new(sized_model(), 2);
        assert_eq!(pool.activate(), Some(0));
        assert_eq!(pool.activate(), Some(1));
        assert_eq!(pool.activate(), None);
        assert!(pool.is_full());
    }

    #[test]
    fn param_accessors_fall_back_on_disabled_params() {
        let mut pool = filled_pool(1);
        assert!(pool.set_param_current(0, ModelParam::Size, 3.0));
        assert_eq!(pool.param_current(0, ModelParam::Size), 3.0);

        assert!(!pool.set_param_current(0, ModelParam::Mass, 5.0));
        assert_eq!(pool.param_current(0, ModelParam::Mass), 1.0);
        assert!(!pool.change_param_current(0, ModelParam::Angle, 1.0));
        assert_eq!(pool.param_current(0, ModelParam::Angle), 0.0);

        // Final values read the end value of mutable params only.
        assert_eq!(pool.param_final(0, ModelParam::Alpha), 0.0);
        assert_eq!(pool.param_final(0, ModelParam::Size), 3.0);
    }

    #[test]
    fn swap_moves_all_arrays_and_swappable_buffers() {
        let mut pool = filled_pool(3);
        let mut ids = SlotBuffer::<u32>::new(8, 1);
        ids.slot_mut(0)[0] = 10;
        ids.slot_mut(2)[0] = 12;
        pool.create_buffer("ids", Box::new(ids.clone()), 1, true);
        pool.create_buffer("pinned", Box::new(ids), 1, false);

        pool.swap_particles(0, 2);

        assert_eq!(pool.data(0).position, Vec3::splat(2.0));
        assert_eq!(pool.data(2).position, Vec3::splat(0.0));
        assert_eq!(pool.param_current(0, ModelParam::Size), 2.0);
        assert_eq!(pool.param_current(2, ModelParam::Size), 0.0);

        let slot0 = |name: &str| {
            pool.buffer(name, 1)
                .and_then(|b| b.as_any().downcast_ref::<SlotBuffer<u32>>())
                .map(|b| b.slot(0)[0])
        };
        assert_eq!(slot0("ids"), Some(12));
        assert_eq!(slot0("pinned"), Some(10));
    }

    #[test]
    fn make_inactive_moves_last_particle_into_the_hole() {
        let mut pool = filled_pool(4);
        pool.make_inactive(1);

        assert_eq!(pool.nb_active(), 3);
        assert_eq!(pool.data(1).position, Vec3::splat(3.0));
        assert_eq!(pool.param_current(1, ModelParam::Size), 3.0);
    }

    #[test]
    fn buffer_lookup_checks_flag() {
        let mut pool = filled_pool(0);
        pool.create_buffer("b", Box::new(SlotBuffer::<u8>::new(8, 1)), 7, true);
        assert!(pool.buffer("b", 7).is_some());
        assert!(pool.buffer("b", 8).is_none());
        assert!(pool.buffer_any_flag("b").is_some());
        assert!(pool.destroy_buffer("b"));
        assert!(!pool.destroy_buffer("b"));
    }

    #[test]
    fn reallocate_keeps_particles_and_drops_buffers() {
        let mut pool = filled_pool(3);
        pool.create_buffer("b", Box::new(SlotBuffer::<u8>::new(8, 1)), 0, true);

        assert!(!pool.reallocate(4));
        assert!(pool.reallocate(16));

        assert_eq!(pool.capacity(), 16);
        assert_eq!(pool.nb_active(), 3);
        assert_eq!(pool.data(2).position, Vec3::splat(2.0));
        assert_eq!(pool.param_current(2, ModelParam::Size), 2.0);
        assert!(pool.buffer_any_flag("b").is_none());
    }

    #[test]
    fn set_model_discards_particles() {
        let mut pool = filled_pool(3);
        pool.set_model(Rc::new(Model::default()));
        assert_eq!(pool.nb_active(), 0);
        assert_eq!(pool.param_stride(), 3);
        assert_eq!(pool.current_params().len(), 0);
    }

    #[test]
    fn interpolation_writes_current_value() {
        let mut model = Model::new(
            ModelFlags::SIZE,
            ModelFlags::empty(),
            ModelFlags::empty(),
            ModelFlags::SIZE,
        );
        model.set_life_time(1.0, 1.0);
        if let Some(i) = model.interpolator_mut(ModelParam::Size) {
            *i = Interpolator::new(InterpolationSource::LifeRatio);
            i.add_constant_entry(0.0, 0.0).add_constant_entry(1.0, 8.0);
        }

        let mut rng = StdRng::seed_from_u64(4);
        let mut pool = ParticlePool::new(Rc::new(model), 1);
        let index = pool.activate().unwrap();
        pool.init_particle(index, &mut rng);
        pool.data_mut(index).age = 0.5;
        pool.data_mut(index).life = 0.5;

        pool.interpolate_parameters(index);
        assert_eq!(pool.param_current(index, ModelParam::Size), 4.0);
    }
}
