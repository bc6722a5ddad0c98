//! Per-parameter write validation
//!
//! Decides whether a single changed value may be written, given the
//! parameter's descriptor. Pure apart from logging.

use hm_core::{ParamValue, ParameterDescriptor, ParameterType, DISABLED_SENTINEL};
use thiserror::Error;
use tracing::{debug, warn};

/// Reason a parameter write was rejected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("parameter is not writable")]
    NotWritable,

    #[error("transform flag set; write forbidden")]
    TransformFlag,

    #[error("value {value} out of range {min} ... {max}")]
    OutOfRange {
        value: String,
        min: String,
        max: String,
    },

    #[error("enum value {value} out of range (valid indices 0..{len})")]
    EnumOutOfRange { value: String, len: usize },

    #[error("no description for parameter")]
    MissingDescriptor,
}

/// Outcome of validating one changed parameter
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Write the new value
    Accept,
    /// Keep the old value; the write would be illegal
    Reject(ValidationError),
    /// Keep the old value silently (undecidable parameter type)
    Ignore,
}

impl Decision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Decision::Accept)
    }

    pub fn is_reject(&self) -> bool {
        matches!(self, Decision::Reject(_))
    }
}

fn bound_to_string(bound: Option<&ParamValue>) -> String {
    bound.map_or_else(|| "-".to_string(), ToString::to_string)
}

fn out_of_range(new: &ParamValue, descriptor: &ParameterDescriptor) -> ValidationError {
    ValidationError::OutOfRange {
        value: new.to_string(),
        min: bound_to_string(descriptor.min.as_ref()),
        max: bound_to_string(descriptor.max.as_ref()),
    }
}

fn check_numeric(new: &ParamValue, descriptor: &ParameterDescriptor) -> Decision {
    let Some(value) = new.as_f64() else {
        return Decision::Reject(out_of_range(new, descriptor));
    };
    let below = descriptor
        .min
        .as_ref()
        .and_then(ParamValue::as_f64)
        .is_some_and(|min| value < min);
    let above = descriptor
        .max
        .as_ref()
        .and_then(ParamValue::as_f64)
        .is_some_and(|max| value > max);

    if !(below || above) {
        return Decision::Accept;
    }
    if descriptor.param_type == ParameterType::Float
        && *new == ParamValue::Float(DISABLED_SENTINEL)
    {
        debug!(
            "Value out of range but identical to special value {:?}",
            DISABLED_SENTINEL
        );
        return Decision::Accept;
    }
    Decision::Reject(out_of_range(new, descriptor))
}

/// Decide whether `key` may change from `old` to `new`
///
/// `descriptor` is `None` when the controller did not describe the key.
pub fn decide(
    key: &str,
    old: &ParamValue,
    new: &ParamValue,
    descriptor: Option<&ParameterDescriptor>,
) -> Decision {
    let Some(descriptor) = descriptor else {
        return reject(key, ValidationError::MissingDescriptor);
    };
    debug!(key, "Checking new value");

    if !descriptor.is_writable() {
        return reject(key, ValidationError::NotWritable);
    }
    if descriptor.has_transform_flag() {
        return reject(key, ValidationError::TransformFlag);
    }

    let decision = match &descriptor.param_type {
        ParameterType::Enum => {
            debug!(key, values = ?descriptor.value_list, "Datatype is enum");
            match new.as_index() {
                Some(idx) if idx < descriptor.value_list.len() => Decision::Accept,
                _ => Decision::Reject(ValidationError::EnumOutOfRange {
                    value: new.to_string(),
                    len: descriptor.value_list.len(),
                }),
            }
        }
        ParameterType::Float | ParameterType::Integer | ParameterType::Bool => {
            debug!(
                key,
                min = %bound_to_string(descriptor.min.as_ref()),
                max = %bound_to_string(descriptor.max.as_ref()),
                new = %new,
                "Range check"
            );
            check_numeric(new, descriptor)
        }
        ParameterType::String => Decision::Accept,
        other => {
            debug!(key, datatype = %other, "Unknown datatype, ignoring parameter");
            return Decision::Ignore;
        }
    };

    match decision {
        Decision::Reject(reason) => reject(key, reason),
        Decision::Accept => {
            let (old_shown, new_shown) = match descriptor.param_type {
                ParameterType::Enum => (
                    descriptor.enum_label(old).unwrap_or("?").to_string(),
                    descriptor.enum_label(new).unwrap_or("?").to_string(),
                ),
                _ => (old.to_string(), new.to_string()),
            };
            debug!(key, from = %old_shown, to = %new_shown, "Changing value");
            Decision::Accept
        }
        Decision::Ignore => Decision::Ignore,
    }
}

fn reject(key: &str, reason: ValidationError) -> Decision {
    warn!(key, reason = %reason, "Rejecting new value");
    Decision::Reject(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hm_core::{Operations, ParameterFlags};

    fn float_param() -> ParameterDescriptor {
        ParameterDescriptor::new(ParameterType::Float).with_range(0.0, 111600.0)
    }

    fn int_param() -> ParameterDescriptor {
        ParameterDescriptor::new(ParameterType::Integer).with_range(0i64, 255i64)
    }

    fn enum_param() -> ParameterDescriptor {
        ParameterDescriptor::new(ParameterType::Enum).with_value_list(["OFF", "ON", "TOGGLE"])
    }

    #[test]
    fn test_numeric_bounds_are_inclusive() {
        let p = int_param();
        let old = ParamValue::Integer(10);
        assert_eq!(decide("K", &old, &ParamValue::Integer(0), Some(&p)), Decision::Accept);
        assert_eq!(decide("K", &old, &ParamValue::Integer(255), Some(&p)), Decision::Accept);
        assert!(decide("K", &old, &ParamValue::Integer(-1), Some(&p)).is_reject());
        assert!(decide("K", &old, &ParamValue::Integer(256), Some(&p)).is_reject());
    }

    #[test]
    fn test_float_bounds() {
        let p = float_param();
        let old = ParamValue::Float(1.0);
        assert!(decide("T", &old, &ParamValue::Float(0.0), Some(&p)).is_accept());
        assert!(decide("T", &old, &ParamValue::Float(111600.0), Some(&p)).is_accept());
        assert!(decide("T", &old, &ParamValue::Float(-1.0), Some(&p)).is_reject());
        match decide("T", &old, &ParamValue::Float(111601.0), Some(&p)) {
            Decision::Reject(ValidationError::OutOfRange { value, min, max }) => {
                assert_eq!(value, "111601.0");
                assert_eq!(min, "0.0");
                assert_eq!(max, "111600.0");
            }
            other => panic!("unexpected decision {:?}", other),
        }
    }

    #[test]
    fn test_disabled_sentinel_accepted_above_max() {
        let p = float_param();
        let decision = decide(
            "SHORT_ON_TIME",
            &ParamValue::Float(10.0),
            &ParamValue::Float(DISABLED_SENTINEL),
            Some(&p),
        );
        assert_eq!(decision, Decision::Accept);
    }

    #[test]
    fn test_sentinel_only_for_float_parameters() {
        let p = ParameterDescriptor::new(ParameterType::Integer).with_range(0.0, 100.0);
        let decision = decide(
            "K",
            &ParamValue::Float(1.0),
            &ParamValue::Float(DISABLED_SENTINEL),
            Some(&p),
        );
        assert!(decision.is_reject());
    }

    #[test]
    fn test_bool_range() {
        let p = ParameterDescriptor::new(ParameterType::Bool).with_range(false, true);
        let decision = decide("B", &ParamValue::Bool(false), &ParamValue::Bool(true), Some(&p));
        assert!(decision.is_accept());
    }

    #[test]
    fn test_enum_index() {
        let p = enum_param();
        let old = ParamValue::Integer(0);
        assert!(decide("E", &old, &ParamValue::Integer(2), Some(&p)).is_accept());
        assert_eq!(
            decide("E", &old, &ParamValue::Integer(3), Some(&p)),
            Decision::Reject(ValidationError::EnumOutOfRange {
                value: "3".to_string(),
                len: 3
            })
        );
        assert!(decide("E", &old, &ParamValue::Integer(-1), Some(&p)).is_reject());
    }

    #[test]
    fn test_not_writable() {
        let p = int_param().with_operations(Operations::READ | Operations::EVENT);
        assert_eq!(
            decide("K", &ParamValue::Integer(1), &ParamValue::Integer(2), Some(&p)),
            Decision::Reject(ValidationError::NotWritable)
        );
    }

    #[test]
    fn test_transform_flag_rejects_valid_value() {
        let p = int_param().with_flags(ParameterFlags::VISIBLE | ParameterFlags::TRANSFORM);
        assert_eq!(
            decide("K", &ParamValue::Integer(1), &ParamValue::Integer(2), Some(&p)),
            Decision::Reject(ValidationError::TransformFlag)
        );
    }

    #[test]
    fn test_string_always_accepted() {
        let p = ParameterDescriptor::new(ParameterType::String);
        let decision = decide(
            "NAME",
            &ParamValue::String("a".into()),
            &ParamValue::String("b".into()),
            Some(&p),
        );
        assert!(decision.is_accept());
    }

    #[test]
    fn test_unknown_type_ignored() {
        let p = ParameterDescriptor::new(ParameterType::Action);
        assert_eq!(
            decide("PRESS", &ParamValue::Bool(false), &ParamValue::Bool(true), Some(&p)),
            Decision::Ignore
        );

        let p = ParameterDescriptor::new(ParameterType::Other("BLOB".into()));
        assert_eq!(
            decide("X", &ParamValue::Integer(0), &ParamValue::Integer(1), Some(&p)),
            Decision::Ignore
        );
    }

    #[test]
    fn test_missing_descriptor_rejected() {
        assert_eq!(
            decide("X", &ParamValue::Integer(0), &ParamValue::Integer(1), None),
            Decision::Reject(ValidationError::MissingDescriptor)
        );
    }
}
