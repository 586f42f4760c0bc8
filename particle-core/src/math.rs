//! Sampling helpers on top of `glam` vectors.
//!
//! All functions take the random generator as an unsized parameter so they
//! can be called with `&mut dyn RngCore` from effect trait objects as well
//! as with a concrete generator.

use glam::Vec3;
use rand::Rng;

/// Returns a value uniformly distributed between `min` and `max`.
///
/// Unlike `Rng::random_range`, this never panics: `min == max` yields `min`
/// and `min > max` samples the reversed interval.
#[inline]
pub fn random_between<R: Rng + ?Sized>(rng: &mut R, min: f32, max: f32) -> f32 {
    min + (max - min) * rng.random::<f32>()
}

/// Returns a vector whose components are sampled independently in `[min, max]`.
#[inline]
pub fn random_vec3<R: Rng + ?Sized>(rng: &mut R, min: Vec3, max: Vec3) -> Vec3 {
    Vec3::new(
        random_between(rng, min.x, max.x),
        random_between(rng, min.y, max.y),
        random_between(rng, min.z, max.z),
    )
}

/// Returns a point uniformly distributed inside the unit ball.
pub fn random_in_unit_ball<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    loop {
        let v = random_vec3(rng, Vec3::NEG_ONE, Vec3::ONE);
        if v.length_squared() <= 1.0 {
            return v;
        }
    }
}

/// Returns a uniformly distributed unit vector.
pub fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    loop {
        let v = random_vec3(rng, Vec3::NEG_ONE, Vec3::ONE);
        let sqr_norm = v.length_squared();
        if sqr_norm > 0.0 && sqr_norm <= 1.0 {
            return v / sqr_norm.sqrt();
        }
    }
}

/// Normalizes `v`, or returns a random unit vector when `v` has no direction.
///
/// Used wherever a normal is geometrically undefined (a point exactly at a
/// sphere center, on a line, ...).
pub fn normalize_or_randomize<R: Rng + ?Sized>(v: Vec3, rng: &mut R) -> Vec3 {
    match v.try_normalize() {
        Some(n) => n,
        None => random_unit_vector(rng),
    }
}

/// Returns `normal` flipped if needed so that it points toward `side`.
#[inline]
pub fn face_toward(normal: Vec3, side: Vec3) -> Vec3 {
    if normal.dot(side) < 0.0 { -normal } else { normal }
}
