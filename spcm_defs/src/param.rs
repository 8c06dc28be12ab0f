//! Typed parameter values.
//!
//! The DLL moves single parameters as `float` regardless of the field they address
//! (`SPC_get_parameter`/`SPC_set_parameter`). Which fields are really integers is fixed by
//! the parameter table in [`crate::data`], not by looking at values at runtime.

use std::fmt;

/// Storage type of a parameter in the on-wire record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParType {
    Int,
    Float,
}

impl fmt::Display for ParType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ParType::Int => "integer",
                ParType::Float => "float",
            }
        )
    }
}

/// A parameter value tagged with its type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParValue {
    Int(i64),
    Float(f32),
}

impl ParValue {
    pub fn par_type(&self) -> ParType {
        match self {
            ParValue::Int(_) => ParType::Int,
            ParValue::Float(_) => ParType::Float,
        }
    }

    /// The value as the DLL's single-parameter calls carry it.
    pub fn as_f32(&self) -> f32 {
        match *self {
            ParValue::Int(v) => v as f32,
            ParValue::Float(v) => v,
        }
    }

    /// The value as a `float`, or `None` for integers a `float` cannot hold exactly
    /// (magnitudes above 2^24 that are not multiples of a power of two).
    pub fn exact_f32(&self) -> Option<f32> {
        match *self {
            ParValue::Int(v) => {
                let f = v as f32;
                (f as i64 == v).then_some(f)
            }
            ParValue::Float(v) => Some(v),
        }
    }

    /// Converts an integer to a float when `par_type` is `Float`, as Python and the INI file
    /// accept whole numbers for float fields. Every other combination is returned unchanged,
    /// so a float given for an integer field still fails the type check.
    pub fn widen_to(self, par_type: ParType) -> ParValue {
        match (self, par_type) {
            (ParValue::Int(v), ParType::Float) => ParValue::Float(v as f32),
            (value, _) => value,
        }
    }

    /// Interprets a `float` from `SPC_get_parameter` according to `par_type`.
    /// Integer parameters are truncated toward zero.
    pub fn from_f32(par_type: ParType, value: f32) -> Self {
        match par_type {
            ParType::Int => ParValue::Int(value as i64),
            ParType::Float => ParValue::Float(value),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match *self {
            ParValue::Int(v) => Some(v),
            ParValue::Float(_) => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match *self {
            ParValue::Float(v) => Some(v),
            ParValue::Int(_) => None,
        }
    }
}

impl From<i64> for ParValue {
    fn from(v: i64) -> Self {
        ParValue::Int(v)
    }
}

impl From<i32> for ParValue {
    fn from(v: i32) -> Self {
        ParValue::Int(v as i64)
    }
}

impl From<f32> for ParValue {
    fn from(v: f32) -> Self {
        ParValue::Float(v)
    }
}

impl fmt::Display for ParValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParValue::Int(v) => write!(f, "{}", v),
            ParValue::Float(v) => write!(f, "{:?}", v),
        }
    }
}

/// Conversion between an on-wire field and a [`ParValue`].
pub(crate) trait ParField: Sized + Copy {
    const TYPE: ParType;

    fn to_value(self) -> ParValue;

    /// `None` when the value has the wrong type or does not fit the field.
    fn from_value(value: ParValue) -> Option<Self>;
}

impl ParField for f32 {
    const TYPE: ParType = ParType::Float;

    fn to_value(self) -> ParValue {
        ParValue::Float(self)
    }

    fn from_value(value: ParValue) -> Option<Self> {
        value.as_float()
    }
}

macro_rules! impl_int_par_field {
    ($($t:ty),*) => {
        $(
            impl ParField for $t {
                const TYPE: ParType = ParType::Int;

                fn to_value(self) -> ParValue {
                    ParValue::Int(self as i64)
                }

                fn from_value(value: ParValue) -> Option<Self> {
                    value.as_int().and_then(|v| <$t>::try_from(v).ok())
                }
            }
        )*
    };
}

impl_int_par_field!(i16, u16, u32);
