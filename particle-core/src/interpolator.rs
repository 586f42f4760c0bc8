//! Curves evaluated each frame for interpolated model parameters.

use crate::model::ModelParam;

/// What the x axis of an [`Interpolator`] measures for a particle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum InterpolationSource {
    /// `age / (age + life)`, from 0 at birth to 1 at death.
    #[default]
    LifeRatio,
    /// Age in seconds.
    Age,
    /// Squared speed.
    SquaredSpeed,
    /// Current value of another parameter.
    Param(ModelParam),
}

/// One control point. Each particle blends between `y0` and `y1` with its
/// own random ratio, so a single curve can produce a family of curves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InterpolatorEntry {
    pub x: f32,
    pub y0: f32,
    pub y1: f32,
}

#[derive(Clone, Debug, Default)]
pub struct Interpolator {
    entries: Vec<InterpolatorEntry>,
    pub source: InterpolationSource,
    pub looping: bool,
    /// Amplitude of the per-particle random offset applied to x.
    pub offset_x_variation: f32,
    /// Amplitude of the per-particle random scale jitter applied to x.
    pub scale_x_variation: f32,
}

impl Interpolator {
    pub fn new(source: InterpolationSource) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }

    /// Adds an entry, replacing any entry with the same x.
    pub fn add_entry(&mut self, x: f32, y0: f32, y1: f32) -> &mut Self {
        let entry = InterpolatorEntry { x, y0, y1 };
        let at = self.entries.partition_point(|e| e.x < x);
        match self.entries.get_mut(at) {
            Some(e) if e.x == x => *e = entry,
            _ => self.entries.insert(at, entry),
        }
        self
    }

    pub fn add_constant_entry(&mut self, x: f32, y: f32) -> &mut Self {
        self.add_entry(x, y, y)
    }

    pub fn entries(&self) -> &[InterpolatorEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Evaluates the curve.
    ///
    /// `ratio_y`, `offset_x` and `scale_x` are the per-particle random
    /// values stored at birth. Returns `None` when the curve is empty.
    pub fn interpolate(&self, x: f32, ratio_y: f32, offset_x: f32, scale_x: f32) -> Option<f32> {
        let first = self.entries.first()?;
        let last = self.entries.last()?;

        let mut x = x * scale_x + offset_x;
        let span = last.x - first.x;
        if self.looping && span > 0.0 {
            x = first.x + (x - first.x).rem_euclid(span);
        }

        let blend = |e: &InterpolatorEntry| e.y0 + (e.y1 - e.y0) * ratio_y;

        if x <= first.x {
            return Some(blend(first));
        }
        if x >= last.x {
            return Some(blend(last));
        }

        let next = self.entries.partition_point(|e| e.x <= x);
        let (a, b) = (&self.entries[next - 1], &self.entries[next]);
        let t = (x - a.x) / (b.x - a.x);
        let ya = blend(a);
        Some(ya + (blend(b) - ya) * t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Interpolator {
        let mut i = Interpolator::new(InterpolationSource::LifeRatio);
        i.add_constant_entry(0.0, 0.0).add_constant_entry(1.0, 10.0);
        i
    }

    #[test]
    fn empty_curve_has_no_value() {
        assert_eq!(Interpolator::default().interpolate(0.5, 0.0, 0.0, 1.0), None);
    }

    #[test]
    fn interpolates_linearly_and_clamps() {
        let i = ramp();
        assert_eq!(i.interpolate(0.25, 0.0, 0.0, 1.0), Some(2.5));
        assert_eq!(i.interpolate(-1.0, 0.0, 0.0, 1.0), Some(0.0));
        assert_eq!(i.interpolate(3.0, 0.0, 0.0, 1.0), Some(10.0));
    }

    #[test]
    fn entries_are_kept_sorted_and_unique() {
        let mut i = ramp();
        i.add_constant_entry(0.5, 1.0).add_constant_entry(1.0, 4.0);
        let xs: Vec<f32> = i.entries().iter().map(|e| e.x).collect();
        assert_eq!(xs, vec![0.0, 0.5, 1.0]);
        assert_eq!(i.interpolate(1.0, 0.0, 0.0, 1.0), Some(4.0));
    }

    #[test]
    fn ratio_blends_between_y0_and_y1() {
        let mut i = Interpolator::new(InterpolationSource::Age);
        i.add_entry(0.0, 2.0, 4.0);
        assert_eq!(i.interpolate(0.0, 0.5, 0.0, 1.0), Some(3.0));
    }

    #[test]
    fn offset_scale_and_looping_shift_x() {
        let mut i = ramp();
        assert_eq!(i.interpolate(0.25, 0.0, 0.25, 1.0), Some(5.0));
        assert_eq!(i.interpolate(0.25, 0.0, 0.0, 2.0), Some(5.0));

        i.looping = true;
        let wrapped = i.interpolate(1.25, 0.0, 0.0, 1.0).unwrap_or_default();
        assert!((wrapped - 2.5).abs() < 1e-5);
    }
}
