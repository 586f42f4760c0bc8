//! Auxiliary per-slot storage attached to a particle pool.
//!
//! Renderers and some modifier effects keep data per particle slot (vertex
//! data, previous-frame state, ...). Such data lives in a [`Buffer`] owned by
//! the pool so that it can follow its particle whenever the pool swaps two
//! slots. Buffers are created by a [`BufferHandler`] and are dropped when
//! the pool is reallocated or its model changes.

use std::any::Any;
use std::fmt::Debug;

use crate::pool::ParticlePool;
use crate::types::SlotIndex;

pub trait Buffer: Debug {
    /// Exchanges the contents of two slots.
    fn swap(&mut self, a: SlotIndex, b: SlotIndex);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// `stride` values of `T` per particle slot.
#[derive(Clone, Debug)]
pub struct SlotBuffer<T> {
    data: Vec<T>,
    stride: usize,
}

impl<T: Clone + Default> SlotBuffer<T> {
    pub fn new(capacity: usize, stride: usize) -> Self {
        Self {
            data: vec![T::default(); capacity * stride],
            stride,
        }
    }
}

impl<T> SlotBuffer<T> {
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        if self.stride == 0 { 0 } else { self.data.len() / self.stride }
    }

    pub fn slot(&self, index: SlotIndex) -> &[T] {
        let start = index * self.stride;
        &self.data[start..start + self.stride]
    }

    pub fn slot_mut(&mut self, index: SlotIndex) -> &mut [T] {
        let start = index * self.stride;
        &mut self.data[start..start + self.stride]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl<T: Debug + 'static> Buffer for SlotBuffer<T> {
    fn swap(&mut self, a: SlotIndex, b: SlotIndex) {
        if a == b {
            return;
        }
        for k in 0..self.stride {
            self.data.swap(a * self.stride + k, b * self.stride + k);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A named buffer registered on a pool.
#[derive(Debug)]
pub struct BufferEntry {
    pub buffer: Box<dyn Buffer>,
    /// Opaque tag set by the creator, checked on lookup.
    pub flag: u32,
    /// Whether the buffer follows slot swaps.
    pub swap_enabled: bool,
}

/// Something that needs buffers on the pools it works with.
///
/// All methods have defaults for handlers that need no buffer at all.
pub trait BufferHandler {
    fn create_buffers(&mut self, _pool: &mut ParticlePool) {}

    fn destroy_buffers(&mut self, _pool: &mut ParticlePool) {}

    /// Returns `true` when every buffer this handler needs is present.
    fn check_buffers(&self, _pool: &ParticlePool) -> bool {
        true
    }

    /// Makes the buffers ready for a frame.
    ///
    /// Missing buffers are recreated when `management` is enabled; otherwise
    /// the handler is reported as not ready and should skip the frame.
    fn prepare_buffers(&mut self, pool: &mut ParticlePool, management: bool) -> bool {
        if self.check_buffers(pool) {
            return true;
        }
        if !management {
            return false;
        }
        self.destroy_buffers(pool);
        self.create_buffers(pool);
        self.check_buffers(pool)
    }
}
