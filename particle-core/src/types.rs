/// Identifier for a particle slot in a [`crate::pool::ParticlePool`].
///
/// This is an index into the pool arrays. It is only meaningful for the
/// current frame: swap-removal and sorting move particles between slots.
pub type SlotIndex = usize;

/// Distance used to push points just across a zone border so that they do
/// not trigger the same border crossing again on the next step.
pub const APPROXIMATION_VALUE: f32 = 0.01;
