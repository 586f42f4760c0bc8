//! Core 3-D particle simulation library.
//!
//! Main components:
//! - [`group`]: the simulation container and its per-frame update.
//! - [`pool`]: particle storage, slot recycling and named buffers.
//! - [`model`]: per-particle parameters and their evolution.
//! - [`interpolator`]: keyframed curves driving interpolated parameters.
//! - [`emitter`]: particle sources and velocity strategies.
//! - [`modifier`]: trigger-gated effects (forces, obstacles, destroyers...).
//! - [`zone`]: geometric volumes used for spawning and triggering.
//! - [`renderer`]: the hand-off point to drawing code.
//! - [`config`]: settings of a group.
//! - [`types`]: shared type aliases and constants.

pub mod buffer;
pub mod config;
pub mod creation;
pub mod emitter;
pub mod error;
pub mod group;
pub mod handle;
pub mod interpolator;
pub mod math;
pub mod model;
pub mod modifier;
pub mod particle;
pub mod pool;
pub mod renderer;
pub mod transform;
pub mod types;
pub mod zone;

pub use config::Config;
pub use error::{Result, SimError};
pub use group::Group;
pub use handle::Handle;
pub use model::{Model, ModelFlags, ModelParam};
pub use particle::Particle;
pub use zone::Zone;
