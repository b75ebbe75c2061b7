//! Native values packed into and unpacked from record fields.

use std::fmt;

/// A native value for one record field.
///
/// Each variant corresponds to one packable [`TypeId`](super::TypeId).
/// STRING values are raw bytes: unpacked strings carry the column's full
/// declared width, including any zero padding.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// Signed 8-bit character.
    Char(i8),
    /// Unsigned 8-bit character.
    UChar(u8),
    /// Signed 16-bit integer.
    Short(i16),
    /// Unsigned 16-bit integer.
    UShort(u16),
    /// Signed 32-bit integer.
    Int(i32),
    /// Unsigned 32-bit integer.
    UInt(u32),
    /// Signed 64-bit integer.
    Long(i64),
    /// Unsigned 64-bit integer.
    ULong(u64),
    /// Single precision float.
    Float(f32),
    /// Double precision float.
    Double(f64),
    /// Fixed-width byte string.
    String(Vec<u8>),
}

impl Value {
    /// Returns the value widened to `i128` if it is an integer variant.
    pub(crate) fn as_integer(&self) -> Option<i128> {
        match *self {
            Self::Char(v) => Some(v as i128),
            Self::UChar(v) => Some(v as i128),
            Self::Short(v) => Some(v as i128),
            Self::UShort(v) => Some(v as i128),
            Self::Int(v) => Some(v as i128),
            Self::UInt(v) => Some(v as i128),
            Self::Long(v) => Some(v as i128),
            Self::ULong(v) => Some(v as i128),
            _ => None,
        }
    }

    /// Returns the value as `f64` if it is numeric (integer or float).
    pub(crate) fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Float(v) => Some(v as f64),
            Self::Double(v) => Some(v),
            _ => self.as_integer().map(|v| v as f64),
        }
    }

    /// Returns the bytes of a STRING value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::String(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns a STRING value as UTF-8 text, if it is valid UTF-8.
    ///
    /// Padding bytes are not removed.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Returns a short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Char(_) => "char",
            Self::UChar(_) => "uchar",
            Self::Short(_) => "short",
            Self::UShort(_) => "ushort",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Long(_) => "long",
            Self::ULong(_) => "ulong",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::String(_) => "string",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Char(v) => write!(f, "{}", v),
            Self::UChar(v) => write!(f, "{}", v),
            Self::Short(v) => write!(f, "{}", v),
            Self::UShort(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::UInt(v) => write!(f, "{}", v),
            Self::Long(v) => write!(f, "{}", v),
            Self::ULong(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", String::from_utf8_lossy(v)),
        }
    }
}

macro_rules! impl_from_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from_primitive!(
    bool => Bool,
    i8 => Char,
    u8 => UChar,
    i16 => Short,
    u16 => UShort,
    i32 => Int,
    u32 => UInt,
    i64 => Long,
    u64 => ULong,
    f32 => Float,
    f64 => Double,
    Vec<u8> => String,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v.into_bytes())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Self::String(v.to_vec())
    }
}
