use thiserror::Error;

use crate::model::ModelParam;
use crate::modifier::{Trigger, TriggerMask};

/// Errors for configuration calls that the caller is expected to check.
///
/// Nothing on the per-frame path returns these: a running simulation only
/// ever degrades silently.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// The modifier does not support the requested trigger
    #[error("trigger {requested:?} is not available (available: {available:?})")]
    UnavailableTrigger {
        requested: Trigger,
        available: TriggerMask,
    },

    /// The parameter is not enabled in the model
    #[error("parameter {0:?} is not enabled in the model")]
    ParamDisabled(ModelParam),

    /// Interpolated parameters take their values from an interpolator
    #[error("parameter {0:?} is interpolated and has no explicit values")]
    ParamInterpolated(ModelParam),

    /// The number of values does not match the parameter mode
    #[error("parameter {param:?} expects {expected} values, got {got}")]
    WrongValueCount {
        param: ModelParam,
        expected: usize,
        got: usize,
    },
}

/// Result type using [`SimError`]
pub type Result<T> = std::result::Result<T, SimError>;
