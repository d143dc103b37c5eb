//! Runtime values and the column categories they map to.
//!
//! [`Value`] is the closed set of things that can be bound to a statement or
//! read back from a row. Every value belongs to a [`Kind`], which is what the
//! dialects switch on when choosing a column type.

use std::fmt;

use chrono::{DateTime, NaiveDateTime};
use thiserror::Error;

/// The category of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// Unbounded text.
    Text,
    /// Text with a declared maximum size.
    VarChar,
    Bytes,
    /// A timestamp without time zone.
    Time,
    /// The auto-incrementing primary key type.
    Id,
}

impl Kind {
    /// Returns the Rust type that holds values of this kind.
    #[must_use]
    pub const fn rust_type(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Text => "String",
            Self::VarChar => "VarChar",
            Self::Bytes => "Vec<u8>",
            Self::Time => "NaiveDateTime",
            Self::Id => "Id",
        }
    }

    /// Returns true for the signed and unsigned integer kinds, `Id` included.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::I8
                | Self::I16
                | Self::I32
                | Self::I64
                | Self::U8
                | Self::U16
                | Self::U32
                | Self::U64
                | Self::Id
        )
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rust_type())
    }
}

/// An auto-incrementing integer primary key.
///
/// A field of this type is always treated as the table's primary key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(pub i64);

impl Id {
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// A string stored in a sized `VARCHAR` column.
///
/// The size comes from the field's `size` attribute, defaulting to 255.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarChar(pub String);

impl VarChar {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VarChar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VarChar {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for VarChar {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A value bound to a statement or read from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL, still carrying the column category.
    Null(Kind),
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Text(String),
    VarChar(String),
    Bytes(Vec<u8>),
    Time(NaiveDateTime),
    Id(i64),
}

impl Value {
    #[must_use]
    pub const fn kind(&self) -> Kind {
        match self {
            Self::Null(kind) => *kind,
            Self::Bool(_) => Kind::Bool,
            Self::I8(_) => Kind::I8,
            Self::I16(_) => Kind::I16,
            Self::I32(_) => Kind::I32,
            Self::I64(_) => Kind::I64,
            Self::U8(_) => Kind::U8,
            Self::U16(_) => Kind::U16,
            Self::U32(_) => Kind::U32,
            Self::U64(_) => Kind::U64,
            Self::F32(_) => Kind::F32,
            Self::F64(_) => Kind::F64,
            Self::Text(_) => Kind::Text,
            Self::VarChar(_) => Kind::VarChar,
            Self::Bytes(_) => Kind::Bytes,
            Self::Time(_) => Kind::Time,
            Self::Id(_) => Kind::Id,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }

    /// Returns true if the value equals the zero value of its kind.
    ///
    /// NULL counts as zero. This decides between INSERT and UPDATE on save
    /// and backs the `presence` constraint.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Null(_) => true,
            Self::Bool(v) => !v,
            Self::I8(v) => *v == 0,
            Self::I16(v) => *v == 0,
            Self::I32(v) => *v == 0,
            Self::I64(v) | Self::Id(v) => *v == 0,
            Self::U8(v) => *v == 0,
            Self::U16(v) => *v == 0,
            Self::U32(v) => *v == 0,
            Self::U64(v) => *v == 0,
            Self::F32(v) => *v == 0.0,
            Self::F64(v) => *v == 0.0,
            Self::Text(v) | Self::VarChar(v) => v.is_empty(),
            Self::Bytes(v) => v.is_empty(),
            Self::Time(v) => *v == NaiveDateTime::default(),
        }
    }

    /// Returns the value as an `i64` if it is an integer that fits.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        widen(self, Kind::I64)
            .ok()
            .and_then(|v| i64::try_from(v).ok())
    }

    /// Returns the value as a string slice if it is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) | Self::VarChar(v) => Some(v),
            _ => None,
        }
    }
}

/// Errors raised while converting a [`Value`] into a Rust type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("cannot read a {found} value into {expected}")]
    Mismatch { expected: Kind, found: Kind },

    #[error("{value} is out of range for {expected}")]
    OutOfRange { expected: Kind, value: String },

    #[error("cannot parse {text:?} as {expected}")]
    Parse { expected: Kind, text: String },
}

/// Types that can be written to a column.
pub trait ToValue {
    /// The column category, also used when the value is NULL.
    const KIND: Kind;

    fn to_value(&self) -> Value;
}

/// Types that can be read back from a column.
///
/// This is the per-kind switch used when scanning rows. A NULL read into a
/// non-optional type yields that type's zero value.
pub trait FromValue: Sized {
    /// # Errors
    ///
    /// Returns an error if the value's kind cannot be represented by `Self`.
    fn from_value(value: &Value) -> Result<Self, ValueError>;
}

fn widen(value: &Value, expected: Kind) -> Result<i128, ValueError> {
    Ok(match *value {
        Value::Bool(v) => i128::from(v),
        Value::I8(v) => i128::from(v),
        Value::I16(v) => i128::from(v),
        Value::I32(v) => i128::from(v),
        Value::I64(v) | Value::Id(v) => i128::from(v),
        Value::U8(v) => i128::from(v),
        Value::U16(v) => i128::from(v),
        Value::U32(v) => i128::from(v),
        Value::U64(v) => i128::from(v),
        ref other => {
            return Err(ValueError::Mismatch {
                expected,
                found: other.kind(),
            })
        }
    })
}

fn narrow<T: TryFrom<i128>>(value: &Value, expected: Kind) -> Result<T, ValueError> {
    let wide = widen(value, expected)?;
    T::try_from(wide).map_err(|_| ValueError::OutOfRange {
        expected,
        value: wide.to_string(),
    })
}

macro_rules! integer_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl ToValue for $ty {
            const KIND: Kind = Kind::$variant;

            fn to_value(&self) -> Value {
                Value::$variant(*self)
            }
        }

        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Self::$variant(value)
            }
        }

        impl FromValue for $ty {
            fn from_value(value: &Value) -> Result<Self, ValueError> {
                if value.is_null() {
                    return Ok(0);
                }
                narrow(value, Kind::$variant)
            }
        }
    )*};
}

integer_value!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
);

impl ToValue for u64 {
    const KIND: Kind = Kind::U64;

    fn to_value(&self) -> Value {
        Value::U64(*self)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::U64(value)
    }
}

impl FromValue for u64 {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match *value {
            Value::Null(_) => Ok(0),
            // Drivers report 64-bit unsigned columns as signed integers.
            // The bit pattern is kept so values above i64::MAX survive.
            Value::I64(v) | Value::Id(v) => Ok(Self::from_ne_bytes(v.to_ne_bytes())),
            ref other => narrow(other, Kind::U64),
        }
    }
}

impl ToValue for bool {
    const KIND: Kind = Kind::Bool;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match *value {
            Value::Null(_) => Ok(false),
            Value::Bool(v) => Ok(v),
            // sqlite stores booleans as 0 / 1
            ref other => widen(other, Kind::Bool).map(|v| v != 0),
        }
    }
}

impl ToValue for f64 {
    const KIND: Kind = Kind::F64;

    fn to_value(&self) -> Value {
        Value::F64(*self)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match *value {
            Value::Null(_) => Ok(0.0),
            Value::F64(v) => Ok(v),
            Value::F32(v) => Ok(Self::from(v)),
            Value::I8(v) => Ok(Self::from(v)),
            Value::I16(v) => Ok(Self::from(v)),
            Value::I32(v) => Ok(Self::from(v)),
            Value::U8(v) => Ok(Self::from(v)),
            Value::U16(v) => Ok(Self::from(v)),
            Value::U32(v) => Ok(Self::from(v)),
            ref other => Err(ValueError::Mismatch {
                expected: Kind::F64,
                found: other.kind(),
            }),
        }
    }
}

impl ToValue for f32 {
    const KIND: Kind = Kind::F32;

    fn to_value(&self) -> Value {
        Value::F32(*self)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::F32(value)
    }
}

impl FromValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match *value {
            Value::Null(_) => Ok(0.0),
            Value::F32(v) => Ok(v),
            // both dialects store f32 in a double precision column
            Value::F64(v) => Ok(v as Self),
            Value::I8(v) => Ok(Self::from(v)),
            Value::I16(v) => Ok(Self::from(v)),
            Value::U8(v) => Ok(Self::from(v)),
            Value::U16(v) => Ok(Self::from(v)),
            ref other => Err(ValueError::Mismatch {
                expected: Kind::F32,
                found: other.kind(),
            }),
        }
    }
}

fn text(value: &Value, expected: Kind) -> Result<String, ValueError> {
    match value {
        Value::Null(_) => Ok(String::new()),
        Value::Text(v) | Value::VarChar(v) => Ok(v.clone()),
        Value::Bytes(v) => String::from_utf8(v.clone()).map_err(|_| ValueError::Parse {
            expected,
            text: String::from_utf8_lossy(v).into_owned(),
        }),
        other => Err(ValueError::Mismatch {
            expected,
            found: other.kind(),
        }),
    }
}

impl ToValue for String {
    const KIND: Kind = Kind::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        text(value, Kind::Text)
    }
}

impl ToValue for VarChar {
    const KIND: Kind = Kind::VarChar;

    fn to_value(&self) -> Value {
        Value::VarChar(self.0.clone())
    }
}

impl From<VarChar> for Value {
    fn from(value: VarChar) -> Self {
        Self::VarChar(value.0)
    }
}

impl FromValue for VarChar {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        text(value, Kind::VarChar).map(VarChar)
    }
}

impl ToValue for Vec<u8> {
    const KIND: Kind = Kind::Bytes;

    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Null(_) => Ok(Self::new()),
            Value::Bytes(v) => Ok(v.clone()),
            Value::Text(v) | Value::VarChar(v) => Ok(v.clone().into_bytes()),
            other => Err(ValueError::Mismatch {
                expected: Kind::Bytes,
                found: other.kind(),
            }),
        }
    }
}

const TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

fn parse_time(text: &str) -> Result<NaiveDateTime, ValueError> {
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|t| t.naive_utc())
        })
        .ok_or_else(|| ValueError::Parse {
            expected: Kind::Time,
            text: text.to_string(),
        })
}

impl ToValue for NaiveDateTime {
    const KIND: Kind = Kind::Time;

    fn to_value(&self) -> Value {
        Value::Time(*self)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Self::Time(value)
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Null(_) => Ok(Self::default()),
            Value::Time(v) => Ok(*v),
            // sqlite keeps timestamps as text
            Value::Text(v) | Value::VarChar(v) => parse_time(v),
            other => Err(ValueError::Mismatch {
                expected: Kind::Time,
                found: other.kind(),
            }),
        }
    }
}

impl ToValue for Id {
    const KIND: Kind = Kind::Id;

    fn to_value(&self) -> Value {
        Value::Id(self.0)
    }
}

impl From<Id> for Value {
    fn from(value: Id) -> Self {
        Self::Id(value.0)
    }
}

impl FromValue for Id {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        if value.is_null() {
            return Ok(Self(0));
        }
        narrow(value, Kind::Id).map(Id)
    }
}

impl<T: ToValue> ToValue for Option<T> {
    const KIND: Kind = T::KIND;

    fn to_value(&self) -> Value {
        self.as_ref()
            .map_or(Value::Null(T::KIND), ToValue::to_value)
    }
}

impl<T: ToValue> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.to_value()
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        if value.is_null() {
            return Ok(None);
        }
        T::from_value(value).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap()
    }

    #[test]
    fn test_to_value_conversions() {
        assert_eq!(42_i32.to_value(), Value::I32(42));
        assert_eq!(7_u16.to_value(), Value::U16(7));
        assert_eq!(String::from("a").to_value(), Value::Text("a".into()));
        assert_eq!(VarChar::from("b").to_value(), Value::VarChar("b".into()));
        assert_eq!(Id(3).to_value(), Value::Id(3));
        assert_eq!(None::<i64>.to_value(), Value::Null(Kind::I64));
        assert_eq!(Some(true).to_value(), Value::Bool(true));
    }

    #[test]
    fn test_kind_of_typed_null() {
        assert_eq!(Value::Null(Kind::VarChar).kind(), Kind::VarChar);
        assert_eq!(<Option<Vec<u8>> as ToValue>::KIND, Kind::Bytes);
    }

    #[test]
    fn test_is_zero() {
        assert!(Value::Id(0).is_zero());
        assert!(!Value::Id(5).is_zero());
        assert!(Value::Text(String::new()).is_zero());
        assert!(Value::Null(Kind::I32).is_zero());
        assert!(Value::Time(NaiveDateTime::default()).is_zero());
        assert!(!Value::Time(noon()).is_zero());
        assert!(Value::F64(0.0).is_zero());
    }

    #[test]
    fn test_signed_source_into_unsigned_target() {
        assert_eq!(u32::from_value(&Value::I64(12)).unwrap(), 12);
        assert_eq!(u8::from_value(&Value::I32(255)).unwrap(), 255);
        assert!(matches!(
            u8::from_value(&Value::I64(-1)),
            Err(ValueError::OutOfRange { expected: Kind::U8, .. })
        ));
    }

    #[test]
    fn test_u64_keeps_bit_pattern() {
        assert_eq!(u64::from_value(&Value::I64(-1)).unwrap(), u64::MAX);
        assert_eq!(u64::from_value(&Value::U64(9)).unwrap(), 9);
    }

    #[test]
    fn test_integer_out_of_range() {
        let err = i8::from_value(&Value::I64(300)).unwrap_err();
        assert_eq!(err.to_string(), "300 is out of range for i8");
    }

    #[test]
    fn test_bool_from_integer() {
        assert!(bool::from_value(&Value::I64(1)).unwrap());
        assert!(!bool::from_value(&Value::I64(0)).unwrap());
        assert!(bool::from_value(&Value::Bool(true)).unwrap());
    }

    #[test]
    fn test_text_conversions() {
        assert_eq!(
            String::from_value(&Value::Bytes(b"abc".to_vec())).unwrap(),
            "abc"
        );
        assert_eq!(
            Vec::<u8>::from_value(&Value::Text("xy".into())).unwrap(),
            b"xy".to_vec()
        );
        assert!(matches!(
            String::from_value(&Value::I64(1)),
            Err(ValueError::Mismatch { expected: Kind::Text, found: Kind::I64 })
        ));
    }

    #[test]
    fn test_time_from_text() {
        let t = noon();
        assert_eq!(
            NaiveDateTime::from_value(&Value::Text("2024-03-09 12:00:00".into())).unwrap(),
            t
        );
        assert_eq!(
            NaiveDateTime::from_value(&Value::Text("2024-03-09T12:00:00.000".into())).unwrap(),
            t
        );
        assert_eq!(
            NaiveDateTime::from_value(&Value::Text("2024-03-09T12:00:00+00:00".into())).unwrap(),
            t
        );
        assert!(NaiveDateTime::from_value(&Value::Text("yesterday".into())).is_err());
    }

    #[test]
    fn test_null_reads_zero_or_none() {
        assert_eq!(i32::from_value(&Value::Null(Kind::I32)).unwrap(), 0);
        assert_eq!(String::from_value(&Value::Null(Kind::Text)).unwrap(), "");
        assert_eq!(Option::<i32>::from_value(&Value::Null(Kind::I32)).unwrap(), None);
        assert_eq!(Option::<i32>::from_value(&Value::I64(4)).unwrap(), Some(4));
    }

    #[test]
    fn test_float_conversions() {
        assert!((f64::from_value(&Value::F32(1.5)).unwrap() - 1.5).abs() < f64::EPSILON);
        assert!((f32::from_value(&Value::F64(2.25)).unwrap() - 2.25).abs() < f32::EPSILON);
        assert!(f64::from_value(&Value::Text("1".into())).is_err());
    }

    #[test]
    fn test_as_i64() {
        assert_eq!(Value::Id(9).as_i64(), Some(9));
        assert_eq!(Value::U32(9).as_i64(), Some(9));
        assert_eq!(Value::U64(u64::MAX).as_i64(), None);
        assert_eq!(Value::Text("9".into()).as_i64(), None);
    }
}
