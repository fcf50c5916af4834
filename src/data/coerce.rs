//! Integer Coercion Module
//! Turns numbers and numeric-looking strings into integer years and state codes.

use super::loader::LoaderError;

/// A value that can be read as an integer, truncating any fractional part.
///
/// Years and state codes arrive as plain numbers or as text (for example from
/// the command line), so both are accepted. `2013.9` and `"2013.9"` both
/// become `2013`.
pub trait IntegerLike {
    fn to_integer(&self) -> Result<i64, LoaderError>;
}

macro_rules! impl_integer_like {
    ($($t:ty),*) => {
        $(
            impl IntegerLike for $t {
                fn to_integer(&self) -> Result<i64, LoaderError> {
                    Ok(i64::from(*self))
                }
            }
        )*
    };
}

impl_integer_like!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! impl_checked_integer_like {
    ($($t:ty),*) => {
        $(
            impl IntegerLike for $t {
                fn to_integer(&self) -> Result<i64, LoaderError> {
                    i64::try_from(*self).map_err(|_| LoaderError::NotAnInteger(self.to_string()))
                }
            }
        )*
    };
}

// Wider than i64, or platform sized.
impl_checked_integer_like!(u64, usize, isize, i128, u128);

impl IntegerLike for f64 {
    fn to_integer(&self) -> Result<i64, LoaderError> {
        if !self.is_finite() {
            return Err(LoaderError::NotAnInteger(self.to_string()));
        }
        Ok(self.trunc() as i64)
    }
}

impl IntegerLike for f32 {
    fn to_integer(&self) -> Result<i64, LoaderError> {
        f64::from(*self).to_integer()
    }
}

impl IntegerLike for str {
    fn to_integer(&self) -> Result<i64, LoaderError> {
        let text = self.trim();
        if let Ok(value) = text.parse::<i64>() {
            return Ok(value);
        }
        text.parse::<f64>()
            .map_err(|_| LoaderError::NotAnInteger(self.to_string()))
            .and_then(|value| value.to_integer())
            .map_err(|_| LoaderError::NotAnInteger(self.to_string()))
    }
}

impl IntegerLike for String {
    fn to_integer(&self) -> Result<i64, LoaderError> {
        self.as_str().to_integer()
    }
}

impl<T: IntegerLike + ?Sized> IntegerLike for &T {
    fn to_integer(&self) -> Result<i64, LoaderError> {
        (**self).to_integer()
    }
}
