//! Cell values crossing the automation boundary.

use std::fmt;

use crate::error::{AutomationError, Result};

/// A single cell value.
///
/// The application reports an empty cell as a missing value rather than an
/// empty string, so `Empty` is distinct from `Text(String::new())`. All
/// numbers travel as floats because that is how the application stores
/// them.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// An empty cell.
    #[default]
    Empty,
    /// A boolean cell.
    Bool(bool),
    /// A numeric cell.
    Number(f64),
    /// A text cell.
    Text(String),
}

impl Value {
    /// True for [`Value::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Strict typed conversion; fails with [`AutomationError::Conversion`]
    /// when the value does not represent a `T`.
    pub fn convert<T: FromValue>(&self) -> Result<T> {
        T::from_value(self)
    }

    /// Lenient conversion: any conversion failure falls back to
    /// `T::default()`.
    ///
    /// This is the tolerant read path reporting flows tend to want. It
    /// masks data-quality problems; use [`Value::convert`] to surface them
    /// instead.
    pub fn convert_or_default<T: FromValue + Default>(&self) -> T {
        self.convert().unwrap_or_default()
    }

    fn no_fit(&self, target: &'static str) -> AutomationError {
        AutomationError::Conversion {
            value: self.to_string(),
            target,
        }
    }
}

impl fmt::Display for Value {
    /// Formats the way the application displays values: empty cells as
    /// `""`, booleans upper-case, whole numbers without a decimal point.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Bool(true) => f.write_str("TRUE"),
            Value::Bool(false) => f.write_str("FALSE"),
            Value::Number(number) => {
                if number.fract() == 0.0 && number.abs() < 1e15 {
                    write!(f, "{}", *number as i64)
                } else {
                    write!(f, "{number}")
                }
            }
            Value::Text(text) => f.write_str(text),
        }
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Value::Bool(flag)
    }
}

impl From<f64> for Value {
    fn from(number: f64) -> Self {
        Value::Number(number)
    }
}

impl From<i32> for Value {
    fn from(number: i32) -> Self {
        Value::Number(f64::from(number))
    }
}

impl From<i64> for Value {
    fn from(number: i64) -> Self {
        Value::Number(number as f64)
    }
}

impl From<u32> for Value {
    fn from(number: u32) -> Self {
        Value::Number(f64::from(number))
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

/// Conversion out of a [`Value`], used by the typed read helpers.
pub trait FromValue: Sized {
    /// Converts from a borrowed value.
    fn from_value(value: &Value) -> Result<Self>;
}

impl FromValue for String {
    /// Never fails; an empty cell converts to `""`.
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.to_string())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(flag) => Ok(*flag),
            Value::Text(text) if text.trim().eq_ignore_ascii_case("true") => Ok(true),
            Value::Text(text) if text.trim().eq_ignore_ascii_case("false") => Ok(false),
            _ => Err(value.no_fit("bool")),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Number(number) => Ok(*number),
            Value::Bool(flag) => Ok(if *flag { 1.0 } else { 0.0 }),
            Value::Text(text) => text.trim().parse().map_err(|_| value.no_fit("f64")),
            Value::Empty => Err(value.no_fit("f64")),
        }
    }
}

macro_rules! integer_from_value {
    ($($ty:ty),*) => {$(
        impl FromValue for $ty {
            fn from_value(value: &Value) -> Result<Self> {
                let number = f64::from_value(value)
                    .map_err(|_| value.no_fit(stringify!($ty)))?;
                let fits = number.fract() == 0.0
                    && number >= <$ty>::MIN as f64
                    && number <= <$ty>::MAX as f64;
                if !fits {
                    return Err(value.no_fit(stringify!($ty)));
                }
                Ok(number as $ty)
            }
        }
    )*};
}

integer_from_value!(i32, i64, u32, u64);

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn displays_like_the_application() {
        assert_eq!(Value::Empty.to_string(), "");
        assert_eq!(Value::Bool(true).to_string(), "TRUE");
        assert_eq!(Value::Number(500.0).to_string(), "500");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Text("ok".into()).to_string(), "ok");
    }

    #[test]
    fn strict_conversions_succeed_on_matching_shapes() {
        assert_eq!(Value::Number(42.0).convert::<i32>().unwrap(), 42);
        assert_eq!(Value::Text(" 3.5 ".into()).convert::<f64>().unwrap(), 3.5);
        assert!(Value::Text("True".into()).convert::<bool>().unwrap());
        assert_eq!(Value::Bool(true).convert::<f64>().unwrap(), 1.0);
        assert_eq!(Value::Empty.convert::<String>().unwrap(), "");
    }

    #[test]
    fn strict_conversions_reject_mismatches() {
        assert!(Value::Text("abc".into()).convert::<f64>().is_err());
        assert!(Value::Number(2.5).convert::<i64>().is_err());
        assert!(Value::Number(1.0).convert::<bool>().is_err());
        assert!(Value::Empty.convert::<f64>().is_err());
        assert!(Value::Number(-1.0).convert::<u32>().is_err());
    }

    #[test]
    fn lenient_conversions_fall_back_to_default() {
        assert_eq!(Value::Text("abc".into()).convert_or_default::<f64>(), 0.0);
        assert_eq!(Value::Empty.convert_or_default::<i32>(), 0);
        assert_eq!(Value::Number(7.0).convert_or_default::<i32>(), 7);
        assert!(!Value::Number(1.0).convert_or_default::<bool>());
        assert_eq!(Value::Empty.convert_or_default::<String>(), "");
    }
}
