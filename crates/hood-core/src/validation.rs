//! Field constraints checked before a record is saved.

use std::fmt;

use thiserror::Error;

use crate::model::Model;
use crate::value::Value;

/// Built-in error codes start here; custom codes must stay below.
pub const BUILTIN_CODE_BASE: u32 = 1 << 16;

/// A presence constraint found the zero value.
pub const VALUE_NOT_SET: u32 = BUILTIN_CODE_BASE;
/// An integer is below its range.
pub const VALUE_TOO_SMALL: u32 = BUILTIN_CODE_BASE + 1;
/// An integer is above its range.
pub const VALUE_TOO_BIG: u32 = BUILTIN_CODE_BASE + 2;
/// A string is shorter than its minimum length.
pub const VALUE_TOO_SHORT: u32 = BUILTIN_CODE_BASE + 3;
/// A string is longer than its maximum length.
pub const VALUE_TOO_LONG: u32 = BUILTIN_CODE_BASE + 4;

/// A failed validation, carrying a stable numeric code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    code: u32,
    message: String,
}

impl ValidationError {
    /// Creates a validation error. Custom codes should stay below
    /// [`BUILTIN_CODE_BASE`].
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn code(&self) -> u32 {
        self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    fn not_set() -> Self {
        Self::new(VALUE_NOT_SET, "value not set")
    }

    fn too_small() -> Self {
        Self::new(VALUE_TOO_SMALL, "value too small")
    }

    fn too_big() -> Self {
        Self::new(VALUE_TOO_BIG, "value too big")
    }

    fn too_short() -> Self {
        Self::new(VALUE_TOO_SHORT, "value too short")
    }

    fn too_long() -> Self {
        Self::new(VALUE_TOO_LONG, "value too long")
    }
}

/// A declared constraint on a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// Byte length bounds for text fields.
    Len {
        min: Option<usize>,
        max: Option<usize>,
    },
    /// Bounds for integer fields.
    Range { min: Option<i64>, max: Option<i64> },
    /// The value must not be the zero value of its kind.
    Presence,
}

impl Constraint {
    /// Checks a value. Constraints that do not apply to the value's kind
    /// pass.
    ///
    /// # Errors
    ///
    /// Returns the validation error for the first violated bound.
    pub fn check(&self, value: &Value) -> Result<(), ValidationError> {
        match *self {
            Self::Len { min, max } => {
                let Some(s) = value.as_str() else {
                    return Ok(());
                };
                if min.is_some_and(|min| s.len() < min) {
                    return Err(ValidationError::too_short());
                }
                if max.is_some_and(|max| s.len() > max) {
                    return Err(ValidationError::too_long());
                }
                Ok(())
            }
            Self::Range { min, max } => {
                if !value.kind().is_integer() || value.is_null() {
                    return Ok(());
                }
                // unsigned values above i64::MAX are above any declared max
                let Some(i) = value.as_i64() else {
                    return if max.is_some() {
                        Err(ValidationError::too_big())
                    } else {
                        Ok(())
                    };
                };
                if min.is_some_and(|min| i < min) {
                    return Err(ValidationError::too_small());
                }
                if max.is_some_and(|max| i > max) {
                    return Err(ValidationError::too_big());
                }
                Ok(())
            }
            Self::Presence => {
                if value.is_zero() {
                    Err(ValidationError::not_set())
                } else {
                    Ok(())
                }
            }
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn bounds<T: fmt::Display>(
            f: &mut fmt::Formatter<'_>,
            name: &str,
            min: Option<T>,
            max: Option<T>,
        ) -> fmt::Result {
            let parts: Vec<String> = [("min", min), ("max", max)]
                .into_iter()
                .filter_map(|(key, v)| v.map(|v| format!("{key} = {v}")))
                .collect();
            write!(f, "{name}({})", parts.join(", "))
        }
        match *self {
            Self::Len { min, max } => bounds(f, "len", min, max),
            Self::Range { min, max } => bounds(f, "range", min, max),
            Self::Presence => f.write_str("presence"),
        }
    }
}

impl Model {
    /// Checks every field's constraints in field order.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for field in &self.fields {
            for constraint in &field.constraints {
                constraint.check(&field.value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Field;
    use crate::value::Kind;

    const LEN_3_6: Constraint = Constraint::Len {
        min: Some(3),
        max: Some(6),
    };
    const RANGE_10_20: Constraint = Constraint::Range {
        min: Some(10),
        max: Some(20),
    };

    #[test]
    fn test_len() {
        assert_eq!(LEN_3_6.check(&"ab".into()).unwrap_err().code(), VALUE_TOO_SHORT);
        assert!(LEN_3_6.check(&"abc".into()).is_ok());
        assert!(LEN_3_6.check(&"abcdef".into()).is_ok());
        let err = LEN_3_6.check(&"abcdefg".into()).unwrap_err();
        assert_eq!(err.code(), VALUE_TOO_LONG);
        assert_eq!(err.to_string(), "value too long");
    }

    #[test]
    fn test_len_with_open_bound() {
        let at_most_two = Constraint::Len {
            min: None,
            max: Some(2),
        };
        assert!(at_most_two.check(&"".into()).is_ok());
        assert!(at_most_two.check(&"abc".into()).is_err());
    }

    #[test]
    fn test_range() {
        assert_eq!(RANGE_10_20.check(&9_i32.into()).unwrap_err().code(), VALUE_TOO_SMALL);
        assert!(RANGE_10_20.check(&10_i64.into()).is_ok());
        assert!(RANGE_10_20.check(&20_u8.into()).is_ok());
        assert_eq!(RANGE_10_20.check(&21_i16.into()).unwrap_err().code(), VALUE_TOO_BIG);
        assert_eq!(
            RANGE_10_20.check(&u64::MAX.into()).unwrap_err().code(),
            VALUE_TOO_BIG
        );
    }

    #[test]
    fn test_presence() {
        let err = Constraint::Presence.check(&"".into()).unwrap_err();
        assert_eq!(err.code(), VALUE_NOT_SET);
        assert_eq!(err.message(), "value not set");
        assert!(Constraint::Presence.check(&Value::Null(Kind::I32)).is_err());
        assert!(Constraint::Presence.check(&1_i32.into()).is_ok());
    }

    #[test]
    fn test_constraint_on_other_kind_is_skipped() {
        assert!(LEN_3_6.check(&1_i32.into()).is_ok());
        assert!(RANGE_10_20.check(&"x".into()).is_ok());
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(VALUE_NOT_SET, 65536);
        assert_eq!(VALUE_TOO_LONG, 65540);
    }

    #[test]
    fn test_model_validate_reports_first_failure() {
        let model = Model::new("t")
            .field(Field::new("name", "ab").constraint(LEN_3_6))
            .field(Field::new("age", 99_i32).constraint(RANGE_10_20));
        assert_eq!(model.validate().unwrap_err().code(), VALUE_TOO_SHORT);
    }

    #[test]
    fn test_display() {
        assert_eq!(LEN_3_6.to_string(), "len(min = 3, max = 6)");
        assert_eq!(
            Constraint::Range {
                min: None,
                max: Some(5)
            }
            .to_string(),
            "range(max = 5)"
        );
        assert_eq!(Constraint::Presence.to_string(), "presence");
    }
}
