//! Per-group description of the particle parameters and of the packed
//! float layout derived from it.
//!
//! Each particle slot owns two float arrays:
//! - the *current* array, one float per enabled parameter, in
//!   [`ModelParam`] order;
//! - the *extended* array, holding first the end value of every mutable
//!   parameter, then three floats per interpolated parameter
//!   (`ratio_y`, `offset_x`, `scale_x`).
//!
//! A model is immutable once a group uses it (groups hold it behind an
//! `Rc`), so the layout never changes under live particles.

use bitflags::bitflags;
use log::debug;
use rand::RngCore;

use crate::error::{Result, SimError};
use crate::interpolator::Interpolator;
use crate::math::random_between;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelParam {
    Red,
    Green,
    Blue,
    Alpha,
    Size,
    Mass,
    Angle,
    TextureIndex,
    RotationSpeed,
    Custom0,
    Custom1,
    Custom2,
}

impl ModelParam {
    pub const COUNT: usize = 12;

    pub const ALL: [ModelParam; Self::COUNT] = [
        ModelParam::Red,
        ModelParam::Green,
        ModelParam::Blue,
        ModelParam::Alpha,
        ModelParam::Size,
        ModelParam::Mass,
        ModelParam::Angle,
        ModelParam::TextureIndex,
        ModelParam::RotationSpeed,
        ModelParam::Custom0,
        ModelParam::Custom1,
        ModelParam::Custom2,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn flag(self) -> ModelFlags {
        ModelFlags::from_bits_retain(1 << self as u32)
    }

    /// Value reported for a parameter the model does not enable.
    pub const fn default_value(self) -> f32 {
        match self {
            ModelParam::Red
            | ModelParam::Green
            | ModelParam::Blue
            | ModelParam::Alpha
            | ModelParam::Size
            | ModelParam::Mass => 1.0,
            _ => 0.0,
        }
    }
}

bitflags! {
    /// One bit per [`ModelParam`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModelFlags: u32 {
        const RED = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE = 1 << 2;
        const ALPHA = 1 << 3;
        const SIZE = 1 << 4;
        const MASS = 1 << 5;
        const ANGLE = 1 << 6;
        const TEXTURE_INDEX = 1 << 7;
        const ROTATION_SPEED = 1 << 8;
        const CUSTOM_0 = 1 << 9;
        const CUSTOM_1 = 1 << 10;
        const CUSTOM_2 = 1 << 11;
    }
}

/// How a parameter gets its value over a particle's life.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamMode {
    Disabled,
    /// One value, identical for every particle.
    Constant,
    /// Sampled once at birth in `[min, max]`.
    Random,
    /// Blended from a start to an end value over the particle's life.
    Mutable,
    /// Start and end values both sampled at birth.
    RandomMutable,
    /// Computed every frame by the parameter's [`Interpolator`].
    Interpolated,
}

#[derive(Clone, Debug)]
pub struct Model {
    enabled: ModelFlags,
    mutable: ModelFlags,
    random: ModelFlags,
    interpolated: ModelFlags,

    values: [[f32; 4]; ModelParam::COUNT],
    interpolators: [Option<Interpolator>; ModelParam::COUNT],

    life_time_min: f32,
    life_time_max: f32,
    immortal: bool,

    enabled_params: Vec<ModelParam>,
    mutable_params: Vec<ModelParam>,
    interpolated_params: Vec<ModelParam>,
    current_offsets: [Option<usize>; ModelParam::COUNT],
    mutable_offsets: [Option<usize>; ModelParam::COUNT],
    interpolated_offsets: [Option<usize>; ModelParam::COUNT],
}

impl Default for Model {
    fn default() -> Self {
        Model::new(
            ModelFlags::RED | ModelFlags::GREEN | ModelFlags::BLUE,
            ModelFlags::empty(),
            ModelFlags::empty(),
            ModelFlags::empty(),
        )
    }
}

impl Model {
    /// Creates a model from its parameter masks.
    ///
    /// Inconsistent masks are corrected rather than rejected: mutable,
    /// random and interpolated bits are restricted to enabled parameters,
    /// and an interpolated parameter is never also mutable or random.
    pub fn new(
        enabled: ModelFlags,
        mutable: ModelFlags,
        random: ModelFlags,
        interpolated: ModelFlags,
    ) -> Self {
        let interpolated_kept = interpolated.intersection(enabled);
        let mutable_kept = mutable.intersection(enabled).difference(interpolated_kept);
        let random_kept = random.intersection(enabled).difference(interpolated_kept);
        if mutable_kept != mutable || random_kept != random || interpolated_kept != interpolated {
            debug!(
                "Model flags corrected: mutable {:?} -> {:?}, random {:?} -> {:?}, interpolated {:?} -> {:?}",
                mutable, mutable_kept, random, random_kept, interpolated, interpolated_kept
            );
        }

        let enabled_params: Vec<ModelParam> = ModelParam::ALL
            .into_iter()
            .filter(|p| enabled.contains(p.flag()))
            .collect();
        let mutable_params: Vec<ModelParam> = enabled_params
            .iter()
            .copied()
            .filter(|p| mutable_kept.contains(p.flag()))
            .collect();
        let interpolated_params: Vec<ModelParam> = enabled_params
            .iter()
            .copied()
            .filter(|p| interpolated_kept.contains(p.flag()))
            .collect();

        let mut current_offsets = [None; ModelParam::COUNT];
        for (k, p) in enabled_params.iter().enumerate() {
            current_offsets[p.index()] = Some(k);
        }
        let mut mutable_offsets = [None; ModelParam::COUNT];
        for (k, p) in mutable_params.iter().enumerate() {
            mutable_offsets[p.index()] = Some(k);
        }
        let mut interpolated_offsets = [None; ModelParam::COUNT];
        for (k, p) in interpolated_params.iter().enumerate() {
            interpolated_offsets[p.index()] = Some(mutable_params.len() + 3 * k);
        }

        let interpolators = std::array::from_fn(|i| {
            interpolated_kept
                .contains(ModelParam::ALL[i].flag())
                .then(Interpolator::default)
        });
        let values = std::array::from_fn(|i| [ModelParam::ALL[i].default_value(); 4]);

        Self {
            enabled,
            mutable: mutable_kept,
            random: random_kept,
            interpolated: interpolated_kept,
            values,
            interpolators,
            life_time_min: 1.0,
            life_time_max: 1.0,
            immortal: false,
            enabled_params,
            mutable_params,
            interpolated_params,
            current_offsets,
            mutable_offsets,
            interpolated_offsets,
        }
    }

    pub fn set_life_time(&mut self, min: f32, max: f32) {
        self.life_time_min = min;
        self.life_time_max = max;
    }

    /// Immortal particles never lose life, so mutable parameters keep
    /// their start value.
    pub fn set_immortal(&mut self, immortal: bool) {
        self.immortal = immortal;
    }

    pub fn life_time_min(&self) -> f32 {
        self.life_time_min
    }

    pub fn life_time_max(&self) -> f32 {
        self.life_time_max
    }

    pub fn is_immortal(&self) -> bool {
        self.immortal
    }

    pub fn mode(&self, param: ModelParam) -> ParamMode {
        let flag = param.flag();
        if !self.enabled.contains(flag) {
            ParamMode::Disabled
        } else if self.interpolated.contains(flag) {
            ParamMode::Interpolated
        } else {
            match (self.mutable.contains(flag), self.random.contains(flag)) {
                (false, false) => ParamMode::Constant,
                (false, true) => ParamMode::Random,
                (true, false) => ParamMode::Mutable,
                (true, true) => ParamMode::RandomMutable,
            }
        }
    }

    pub fn is_enabled(&self, param: ModelParam) -> bool {
        self.enabled.contains(param.flag())
    }

    pub fn is_mutable(&self, param: ModelParam) -> bool {
        self.mutable.contains(param.flag())
    }

    pub fn is_random(&self, param: ModelParam) -> bool {
        self.random.contains(param.flag())
    }

    pub fn is_interpolated(&self, param: ModelParam) -> bool {
        self.interpolated.contains(param.flag())
    }

    /// Number of values [`Model::set_param`] expects for this parameter.
    pub fn value_count(&self, param: ModelParam) -> usize {
        match self.mode(param) {
            ParamMode::Disabled | ParamMode::Interpolated => 0,
            ParamMode::Constant => 1,
            ParamMode::Random | ParamMode::Mutable => 2,
            ParamMode::RandomMutable => 4,
        }
    }

    /// Sets the values of a parameter.
    ///
    /// The expected values depend on the mode:
    /// - constant: `[value]`
    /// - random: `[min, max]`
    /// - mutable: `[start, end]`
    /// - random mutable: `[start_min, start_max, end_min, end_max]`
    ///
    /// A single value is accepted for any mode and used everywhere.
    pub fn set_param(&mut self, param: ModelParam, values: &[f32]) -> Result<()> {
        match self.mode(param) {
            ParamMode::Disabled => return Err(SimError::ParamDisabled(param)),
            ParamMode::Interpolated => return Err(SimError::ParamInterpolated(param)),
            _ => {}
        }

        let expected = self.value_count(param);
        let slot = &mut self.values[param.index()];
        match values {
            [v] => *slot = [*v; 4],
            _ if values.len() == expected => slot[..expected].copy_from_slice(values),
            _ => {
                return Err(SimError::WrongValueCount {
                    param,
                    expected,
                    got: values.len(),
                });
            }
        }
        Ok(())
    }

    /// Returns the `index`-th value set for a parameter, or its default.
    pub fn param_value(&self, param: ModelParam, index: usize) -> f32 {
        if index < self.value_count(param) {
            self.values[param.index()][index]
        } else {
            param.default_value()
        }
    }

    pub fn interpolator(&self, param: ModelParam) -> Option<&Interpolator> {
        self.interpolators[param.index()].as_ref()
    }

    pub fn interpolator_mut(&mut self, param: ModelParam) -> Option<&mut Interpolator> {
        self.interpolators[param.index()].as_mut()
    }

    /// Floats per particle in the current array.
    pub fn current_stride(&self) -> usize {
        self.enabled_params.len()
    }

    /// Floats per particle in the extended array.
    pub fn extended_stride(&self) -> usize {
        self.mutable_params.len() + 3 * self.interpolated_params.len()
    }

    pub fn enabled_params(&self) -> &[ModelParam] {
        &self.enabled_params
    }

    pub fn mutable_params(&self) -> &[ModelParam] {
        &self.mutable_params
    }

    pub fn interpolated_params(&self) -> &[ModelParam] {
        &self.interpolated_params
    }

    /// Offset of a parameter in a particle's current array.
    #[inline]
    pub fn current_offset(&self, param: ModelParam) -> Option<usize> {
        self.current_offsets[param.index()]
    }

    /// Offset of a mutable parameter's end value in the extended array.
    #[inline]
    pub fn mutable_offset(&self, param: ModelParam) -> Option<usize> {
        self.mutable_offsets[param.index()]
    }

    /// Offset of the three random values of an interpolated parameter in
    /// the extended array.
    #[inline]
    pub fn interpolated_offset(&self, param: ModelParam) -> Option<usize> {
        self.interpolated_offsets[param.index()]
    }

    /// Writes the birth values of one particle.
    ///
    /// Interpolated parameters get a placeholder current value; their
    /// real value comes from the first interpolation pass.
    pub(crate) fn init_params(&self, current: &mut [f32], extended: &mut [f32], rng: &mut dyn RngCore) {
        for (k, &param) in self.enabled_params.iter().enumerate() {
            let v = &self.values[param.index()];

            if let Some(base) = self.interpolated_offset(param) {
                current[k] = param.default_value();
                let (offset_var, scale_var) = self
                    .interpolator(param)
                    .map_or((0.0, 0.0), |i| (i.offset_x_variation, i.scale_x_variation));
                extended[base] = random_between(rng, 0.0, 1.0);
                extended[base + 1] = random_between(rng, -offset_var, offset_var);
                extended[base + 2] = 1.0 + random_between(rng, -scale_var, scale_var);
                continue;
            }

            match (self.mutable_offset(param), self.is_random(param)) {
                (None, false) => current[k] = v[0],
                (None, true) => current[k] = random_between(rng, v[0], v[1]),
                (Some(m), false) => {
                    current[k] = v[0];
                    extended[m] = v[1];
                }
                (Some(m), true) => {
                    current[k] = random_between(rng, v[0], v[1]);
                    extended[m] = random_between(rng, v[2], v[3]);
                }
            }
        }
    }

    /// Moves every mutable parameter toward its end value by `ratio`.
    pub(crate) fn blend_mutable(&self, current: &mut [f32], extended: &[f32], ratio: f32) {
        for (m, &param) in self.mutable_params.iter().enumerate() {
            if let Some(k) = self.current_offset(param) {
                current[k] += (extended[m] - current[k]) * ratio;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sample_model() -> Model {
        Model::new(
            ModelFlags::RED | ModelFlags::SIZE | ModelFlags::MASS | ModelFlags::ANGLE,
            ModelFlags::SIZE,
            ModelFlags::MASS | ModelFlags::SIZE,
            ModelFlags::ANGLE,
        )
    }

    #[test]
    fn default_model_enables_colors() {
        let m = Model::default();
        assert_eq!(
            m.enabled_params(),
            &[ModelParam::Red, ModelParam::Green, ModelParam::Blue]
        );
        assert_eq!(m.current_stride(), 3);
        assert_eq!(m.extended_stride(), 0);
    }

    #[test]
    fn layout_follows_enabled_order() {
        let m = sample_model();

        assert_eq!(m.current_stride(), 4);
        assert_eq!(m.current_offset(ModelParam::Red), Some(0));
        assert_eq!(m.current_offset(ModelParam::Size), Some(1));
        assert_eq!(m.current_offset(ModelParam::Mass), Some(2));
        assert_eq!(m.current_offset(ModelParam::Angle), Some(3));
        assert_eq!(m.current_offset(ModelParam::Green), None);

        // One mutable end value, then three floats for the interpolated angle.
        assert_eq!(m.extended_stride(), 4);
        assert_eq!(m.mutable_offset(ModelParam::Size), Some(0));
        assert_eq!(m.interpolated_offset(ModelParam::Angle), Some(1));
    }

    #[test]
    fn modes_are_derived_from_flags() {
        let m = sample_model();
        assert_eq!(m.mode(ModelParam::Red), ParamMode::Constant);
        assert_eq!(m.mode(ModelParam::Mass), ParamMode::Random);
        assert_eq!(m.mode(ModelParam::Size), ParamMode::RandomMutable);
        assert_eq!(m.mode(ModelParam::Angle), ParamMode::Interpolated);
        assert_eq!(m.mode(ModelParam::Custom0), ParamMode::Disabled);
    }

    #[test]
    fn inconsistent_flags_are_masked() {
        let m = Model::new(
            ModelFlags::SIZE,
            ModelFlags::SIZE | ModelFlags::MASS,
            ModelFlags::empty(),
            ModelFlags::SIZE,
        );
        assert!(m.is_interpolated(ModelParam::Size));
        assert!(!m.is_mutable(ModelParam::Size));
        assert!(!m.is_mutable(ModelParam::Mass));
        assert!(m.interpolator(ModelParam::Size).is_some());
        assert!(m.interpolator(ModelParam::Mass).is_none());
    }

    #[test]
    fn set_param_checks_mode_and_arity() {
        let mut m = sample_model();

        assert_eq!(m.set_param(ModelParam::Red, &[0.5]), Ok(()));
        assert_eq!(m.param_value(ModelParam::Red, 0), 0.5);

        assert_eq!(m.set_param(ModelParam::Size, &[1.0, 2.0, 3.0, 4.0]), Ok(()));
        assert_eq!(m.param_value(ModelParam::Size, 3), 4.0);

        assert_eq!(
            m.set_param(ModelParam::Mass, &[1.0, 2.0, 3.0]),
            Err(SimError::WrongValueCount {
                param: ModelParam::Mass,
                expected: 2,
                got: 3
            })
        );
        assert_eq!(
            m.set_param(ModelParam::Green, &[1.0]),
            Err(SimError::ParamDisabled(ModelParam::Green))
        );
        assert_eq!(
            m.set_param(ModelParam::Angle, &[1.0]),
            Err(SimError::ParamInterpolated(ModelParam::Angle))
        );
    }

    #[test]
    fn init_params_samples_inside_ranges() {
        let mut m = sample_model();
        m.set_param(ModelParam::Red, &[0.25]).unwrap();
        m.set_param(ModelParam::Mass, &[2.0, 3.0]).unwrap();
        m.set_param(ModelParam::Size, &[1.0, 1.5, 4.0, 5.0]).unwrap();

        let mut rng = StdRng::seed_from_u64(17);
        let mut current = vec![0.0; m.current_stride()];
        let mut extended = vec![0.0; m.extended_stride()];
        m.init_params(&mut current, &mut extended, &mut rng);

        assert_eq!(current[0], 0.25);
        assert!((1.0..=1.5).contains(&current[1]));
        assert!((2.0..=3.0).contains(&current[2]));
        assert_eq!(current[3], ModelParam::Angle.default_value());
        assert!((4.0..=5.0).contains(&extended[0]));
        // ratio_y in [0, 1], no offset or scale jitter configured.
        assert!((0.0..=1.0).contains(&extended[1]));
        assert_eq!(extended[2], 0.0);
        assert_eq!(extended[3], 1.0);
    }

    #[test]
    fn blend_mutable_moves_toward_end_value() {
        let mut m = Model::new(
            ModelFlags::ALPHA,
            ModelFlags::ALPHA,
            ModelFlags::empty(),
            ModelFlags::empty(),
        );
        m.set_param(ModelParam::Alpha, &[1.0, 0.0]).unwrap();

        let mut current = vec![1.0];
        let extended = vec![0.0];
        m.blend_mutable(&mut current, &extended, 0.25);
        assert_eq!(current[0], 0.75);
    }
}
